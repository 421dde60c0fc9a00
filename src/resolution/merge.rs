//! Conservative fuzzy merging of near-duplicate clusters.
//!
//! A pair of clusters is merged only when all of the following hold:
//! - both keys are at least `min_key_length` chars long and differ
//! - the token-set similarity of the keys reaches `merge_threshold`
//! - the given names (first tokens) reach `given_name_threshold`
//! - the recorded locations are compatible
//!
//! Under-merging is preferred to over-merging: two distinct people folded
//! into one record cannot be told apart again downstream.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::cluster::{locations_compatible, Cluster};
use super::log::{ResolutionAction, ResolutionLog};
use crate::config::ResolverConfig;
use crate::normalize::given_name;
use crate::similarity::{ratio, token_set_ratio};

/// How accepted pairwise merges are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeStrategy {
    /// Single left-to-right pass. An absorbed cluster is never used as a
    /// merge source itself, so chains of near-duplicates may stay apart.
    #[default]
    Greedy,
    /// Every accepted pair becomes a union-find edge; connected components
    /// become the final clusters.
    Transitive,
}

impl MergeStrategy {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Greedy => "greedy",
            Self::Transitive => "transitive",
        }
    }
}

impl FromStr for MergeStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "greedy" => Ok(Self::Greedy),
            "transitive" => Ok(Self::Transitive),
            other => Err(format!("unknown merge strategy: {other}. Use greedy or transitive")),
        }
    }
}

impl fmt::Display for MergeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Clusters left after merging, with the decisions that produced them.
#[derive(Debug, Clone, Default)]
pub struct MergeOutcome {
    /// Surviving clusters in the order of their first source cluster.
    pub clusters: Vec<Cluster>,
    pub log: ResolutionLog,
}

/// Pairwise merge policy plus the strategy combining its decisions.
#[derive(Debug, Clone, PartialEq)]
pub struct FuzzyMerger {
    merge_threshold: f64,
    given_name_threshold: f64,
    min_key_length: usize,
    strategy: MergeStrategy,
}

impl FuzzyMerger {
    #[must_use]
    pub fn new(config: &ResolverConfig) -> Self {
        Self {
            merge_threshold: config.merge_threshold,
            given_name_threshold: config.given_name_threshold,
            min_key_length: config.min_key_length,
            strategy: config.merge_strategy,
        }
    }

    #[must_use]
    pub const fn strategy(&self) -> MergeStrategy {
        self.strategy
    }

    fn is_candidate(&self, key: &str) -> bool {
        key.chars().count() >= self.min_key_length
    }

    /// Name-only part of the policy. Returns the key similarity when the
    /// pair passes both name thresholds.
    fn name_score(&self, a: &str, b: &str) -> Option<f64> {
        if a == b || !self.is_candidate(a) || !self.is_candidate(b) {
            return None;
        }

        let score = token_set_ratio(a, b);
        if score < self.merge_threshold {
            return None;
        }

        let (given_a, given_b) = (given_name(a), given_name(b));
        if given_a.is_empty() || given_b.is_empty() || ratio(given_a, given_b) < self.given_name_threshold {
            debug!(key1 = a, key2 = b, score, "Given names differ, not merging");
            return None;
        }

        Some(score)
    }

    /// Full pairwise policy: name thresholds plus location compatibility.
    #[must_use]
    pub fn accepts(&self, a: &Cluster, b: &Cluster) -> Option<f64> {
        let score = self.name_score(&a.key, &b.key)?;
        if !a.is_location_compatible(b) {
            debug!(key1 = %a.key, key2 = %b.key, score, "Disjoint locations veto merge");
            return None;
        }
        Some(score)
    }

    /// Merges `clusters` according to the configured strategy.
    #[must_use]
    pub fn merge(&self, clusters: Vec<Cluster>) -> MergeOutcome {
        match self.strategy {
            MergeStrategy::Greedy => self.merge_greedy(clusters),
            MergeStrategy::Transitive => self.merge_transitive(clusters),
        }
    }

    fn merge_greedy(&self, clusters: Vec<Cluster>) -> MergeOutcome {
        let mut slots: Vec<Option<Cluster>> = clusters.into_iter().map(Some).collect();
        let mut log = ResolutionLog::new();
        let mut survivors = Vec::new();

        for i in 0..slots.len() {
            let Some(mut target) = slots[i].take() else {
                continue;
            };

            if self.is_candidate(&target.key) {
                for slot in slots.iter_mut().skip(i + 1) {
                    let Some(candidate) = slot.as_ref() else {
                        continue;
                    };
                    // The target's locations grow as it absorbs clusters.
                    let Some(score) = self.accepts(&target, candidate) else {
                        continue;
                    };
                    if let Some(absorbed) = slot.take() {
                        debug!(into = %target.key, from = %absorbed.key, score, "Fuzzy merge");
                        log.record(ResolutionAction::FuzzyMerge, &target.key, &absorbed.key, score);
                        target.absorb(absorbed);
                    }
                }
            }

            survivors.push(target);
        }

        MergeOutcome {
            clusters: survivors,
            log,
        }
    }

    fn merge_transitive(&self, clusters: Vec<Cluster>) -> MergeOutcome {
        let mut sets = DisjointSets::new(&clusters);
        let mut log = ResolutionLog::new();

        for i in 0..clusters.len() {
            for j in (i + 1)..clusters.len() {
                let Some(score) = self.name_score(&clusters[i].key, &clusters[j].key) else {
                    continue;
                };
                if sets.union(i, j) {
                    debug!(key1 = %clusters[i].key, key2 = %clusters[j].key, score, "Fuzzy merge");
                    log.record(ResolutionAction::FuzzyMerge, &clusters[i].key, &clusters[j].key, score);
                } else {
                    debug!(key1 = %clusters[i].key, key2 = %clusters[j].key, score, "Union refused");
                }
            }
        }

        // Components in order of their lowest-index cluster.
        let mut components: Vec<Option<Cluster>> = vec![None; clusters.len()];
        let mut order = Vec::new();
        for (i, cluster) in clusters.into_iter().enumerate() {
            let root = sets.find(i);
            match components[root].as_mut() {
                Some(component) => component.absorb(cluster),
                None => {
                    order.push(root);
                    components[root] = Some(cluster);
                }
            }
        }

        MergeOutcome {
            clusters: order.into_iter().filter_map(|root| components[root].take()).collect(),
            log,
        }
    }
}

/// Union-find over cluster indices, tracking each component's locations.
struct DisjointSets {
    parent: Vec<usize>,
    locations: Vec<std::collections::BTreeSet<String>>,
}

impl DisjointSets {
    fn new(clusters: &[Cluster]) -> Self {
        Self {
            parent: (0..clusters.len()).collect(),
            locations: clusters.iter().map(|c| c.locations.clone()).collect(),
        }
    }

    fn find(&mut self, i: usize) -> usize {
        if self.parent[i] != i {
            let root = self.find(self.parent[i]);
            self.parent[i] = root;
        }
        self.parent[i]
    }

    /// Joins the components of `i` and `j`. Returns false when they are
    /// already joined or their locations are disjoint.
    fn union(&mut self, i: usize, j: usize) -> bool {
        let (ri, rj) = (self.find(i), self.find(j));
        if ri == rj || !locations_compatible(&self.locations[ri], &self.locations[rj]) {
            return false;
        }

        // The lower index stays root so component order follows input order.
        let (root, child) = if ri < rj { (ri, rj) } else { (rj, ri) };
        let moved = std::mem::take(&mut self.locations[child]);
        self.locations[root].extend(moved);
        self.parent[child] = root;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cluster(key: &str, members: &[(&str, Option<&str>)]) -> Cluster {
        let mut c = Cluster::new(key);
        for (name, loc) in members {
            c.push(*name, *loc);
        }
        c
    }

    fn merger(strategy: MergeStrategy) -> FuzzyMerger {
        FuzzyMerger::new(&ResolverConfig {
            merge_strategy: strategy,
            ..ResolverConfig::default()
        })
    }

    fn keys(outcome: &MergeOutcome) -> Vec<&str> {
        outcome.clusters.iter().map(|c| c.key.as_str()).collect()
    }

    #[test]
    fn merges_subset_names_in_same_place() {
        let outcome = merger(MergeStrategy::Greedy).merge(vec![
            cluster("odille claudin thieriat", &[("Odille femme Claudin Thieriat", Some("Thieriat"))]),
            cluster("odille thieriat", &[("Odille Thieriat", Some("Thieriat"))]),
        ]);

        assert_eq!(keys(&outcome), vec!["odille claudin thieriat"]);
        assert_eq!(outcome.clusters[0].members.len(), 2);
        assert_eq!(outcome.log.len(), 1);
        let entry = &outcome.log.entries()[0];
        assert_eq!(entry.action, ResolutionAction::FuzzyMerge);
        assert_eq!(entry.name1, "odille claudin thieriat");
        assert_eq!(entry.name2, "odille thieriat");
        assert!((entry.similarity - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn disjoint_locations_veto_identical_tokens() {
        let outcome = merger(MergeStrategy::Greedy).merge(vec![
            cluster("jean claude petit", &[("Jean Claude Petit", Some("Nancy"))]),
            cluster("jean petit", &[("Jean Petit", Some("Metz"))]),
        ]);
        assert_eq!(outcome.clusters.len(), 2);
        assert!(outcome.log.is_empty());
    }

    #[test]
    fn given_name_guard_blocks_shared_surname() {
        // Token-set similarity is 100 (subset), but the given names differ.
        let outcome = merger(MergeStrategy::Greedy).merge(vec![
            cluster("claude mengeon didier", &[("Claude Mengeon Didier", None)]),
            cluster("mengeon didier", &[("Mengeon Didier", None)]),
        ]);
        assert_eq!(outcome.clusters.len(), 2);
    }

    #[test]
    fn short_keys_never_merge() {
        let outcome = merger(MergeStrategy::Greedy).merge(vec![
            cluster("jean", &[("Jean", None)]),
            cluster("jean x", &[("Jean X", None)]),
        ]);
        assert_eq!(outcome.clusters.len(), 2);
    }

    #[test]
    fn identical_keys_split_by_location_stay_apart() {
        let outcome = merger(MergeStrategy::Greedy).merge(vec![
            cluster("jean petit", &[("Jean Petit, de Nancy", Some("Nancy"))]),
            cluster("jean petit", &[("Jean Petit", None)]),
        ]);
        assert_eq!(outcome.clusters.len(), 2);
    }

    #[test]
    fn accumulated_locations_block_bridges() {
        // The location-less "marie colin" absorbs the Nancy cluster first;
        // the Metz cluster is then compared against {nancy} and vetoed.
        let outcome = merger(MergeStrategy::Greedy).merge(vec![
            cluster("marie colin", &[("Marie Colin", None)]),
            cluster("marie anne colin", &[("Marie Anne Colin", Some("Nancy"))]),
            cluster("marie colin jeanne", &[("Marie Colin Jeanne", Some("Metz"))]),
        ]);
        assert_eq!(keys(&outcome), vec!["marie colin", "marie colin jeanne"]);
        assert_eq!(outcome.clusters[0].members, vec!["Marie Colin", "Marie Anne Colin"]);
    }

    #[test]
    fn greedy_does_not_chain_through_absorbed_clusters() {
        // a ~ b and b ~ c, but a !~ c: greedy absorbs b into a and leaves c.
        let a = cluster("marie anne colin", &[("A", None)]);
        let b = cluster("marie colin", &[("B", None)]);
        let c = cluster("marie colin jeanne", &[("C", None)]);

        let greedy = merger(MergeStrategy::Greedy).merge(vec![a.clone(), b.clone(), c.clone()]);
        assert_eq!(keys(&greedy), vec!["marie anne colin", "marie colin jeanne"]);

        let transitive = merger(MergeStrategy::Transitive).merge(vec![a, b, c]);
        assert_eq!(keys(&transitive), vec!["marie anne colin"]);
        assert_eq!(transitive.clusters[0].members, vec!["A", "B", "C"]);
        assert_eq!(transitive.log.len(), 2);
    }

    #[test]
    fn transitive_refuses_location_conflicting_unions() {
        let outcome = merger(MergeStrategy::Transitive).merge(vec![
            cluster("marie anne colin", &[("A", Some("Nancy"))]),
            cluster("marie colin", &[("B", None)]),
            cluster("marie colin jeanne", &[("C", Some("Metz"))]),
        ]);
        assert_eq!(keys(&outcome), vec!["marie anne colin", "marie colin jeanne"]);
        assert_eq!(outcome.clusters[0].members, vec!["A", "B"]);
    }

    #[test]
    fn strategy_serde_names() {
        assert_eq!(serde_json::to_value(MergeStrategy::Transitive).unwrap(), "transitive");
        let parsed: MergeStrategy = serde_json::from_str("\"greedy\"").unwrap();
        assert_eq!(parsed, MergeStrategy::Greedy);
        assert_eq!("Transitive".parse::<MergeStrategy>(), Ok(MergeStrategy::Transitive));
        assert!("closure".parse::<MergeStrategy>().is_err());
    }
}
