//! End-to-end resolution run.
//!
//! A [`Resolver`] owns a validated [`ResolverConfig`] and turns a raw
//! entity table plus trial table into a [`Resolution`]. The run is a pure
//! function of its inputs and their iteration order: identical input yields
//! identical ids, variants and derived tables.

use tracing::{debug, info, warn};

use crate::config::ResolverConfig;
use crate::derived::{find_transitions, identify_super_witnesses, SuperWitness, Transition};
use crate::entity::{CanonicalEntity, EntityMapping, RawEntityTable};
use crate::error::ResolveResult;
use crate::resolution::{
    attach_surname_references, build_initial_clusters, CanonicalEntityBuilder, FuzzyMerger,
    ResolutionAction, ResolutionLog,
};
use crate::stats::{ResolutionStatistics, RunSummary};
use crate::trial::TrialTable;

/// Everything a run produces.
#[derive(Debug, Clone)]
pub struct Resolution {
    /// Canonical entities in id order.
    pub entities: Vec<CanonicalEntity>,
    pub mapping: EntityMapping,
    pub log: ResolutionLog,
    pub transitions: Vec<Transition>,
    pub super_witnesses: Vec<SuperWitness>,
    pub statistics: ResolutionStatistics,
    pub summary: RunSummary,
    /// Raw names left out of clustering because their key is empty.
    pub manual_review: Vec<String>,
}

impl Resolution {
    /// Looks up the canonical entity a raw name resolved to.
    #[must_use]
    pub fn entity_for(&self, raw_name: &str) -> Option<&CanonicalEntity> {
        let id = self.mapping.get(raw_name)?;
        self.entities.iter().find(|e| &e.canonical_id == id)
    }
}

/// Runs the linkage pipeline with a fixed configuration.
#[derive(Debug, Clone)]
pub struct Resolver {
    config: ResolverConfig,
    merger: FuzzyMerger,
}

impl Resolver {
    /// Creates a resolver.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the configuration is out of range.
    pub fn new(config: ResolverConfig) -> ResolveResult<Self> {
        let config = config.validate()?;
        let merger = FuzzyMerger::new(&config);
        Ok(Self { config, merger })
    }

    #[must_use]
    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Resolves `entities` against `trials`.
    #[must_use]
    pub fn resolve(&self, entities: &RawEntityTable, trials: &TrialTable) -> Resolution {
        info!(
            raw_entities = entities.len(),
            trials = trials.len(),
            strategy = %self.config.merge_strategy,
            "Starting entity resolution"
        );

        let initial = build_initial_clusters(entities);
        for raw_name in &initial.unclusterable {
            warn!(raw_name = %raw_name, "Empty normalization key, flagged for manual review");
        }
        let initial_clusters = initial.clusters.len();
        info!(clusters = initial_clusters, "Built initial clusters");

        let merged = self.merger.merge(initial.clusters);
        let mut log = merged.log;
        info!(
            clusters = merged.clusters.len(),
            merges = log.count(ResolutionAction::FuzzyMerge),
            "Fuzzy merge complete"
        );

        let clusters = if self.config.attach_surname_references {
            let attached = attach_surname_references(merged.clusters, self.config.merge_threshold);
            log.extend(attached.log);
            debug!(clusters = attached.clusters.len(), "Surname references attached");
            attached.clusters
        } else {
            merged.clusters
        };

        let canonical = CanonicalEntityBuilder::new(entities, trials)
            .with_id_format(&self.config.id_prefix, self.config.id_width)
            .build(&clusters);
        info!(entities = canonical.entities.len(), "Created canonical entities");

        let transitions = find_transitions(&canonical.entities);
        let super_witnesses =
            identify_super_witnesses(&canonical.entities, self.config.super_witness_min_trials);
        info!(
            transitions = transitions.len(),
            super_witnesses = super_witnesses.len(),
            "Derived tables built"
        );

        let statistics = ResolutionStatistics::compute(&canonical.entities, &canonical.mapping);
        let summary = RunSummary {
            manual_review: initial.unclusterable.len(),
            initial_clusters,
            merged_clusters: clusters.len(),
            fuzzy_merges: log.count(ResolutionAction::FuzzyMerge),
            surname_attachments: log.count(ResolutionAction::SurnameAttach),
            unresolved_trial_refs: canonical.unresolved_trial_refs,
            ..RunSummary::default()
        };

        Resolution {
            entities: canonical.entities,
            mapping: canonical.mapping,
            log,
            transitions,
            super_witnesses,
            statistics,
            summary,
            manual_review: initial.unclusterable,
        }
    }
}
