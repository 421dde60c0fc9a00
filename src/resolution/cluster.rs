//! Exact-match clustering by normalization key.
//!
//! Every raw name with a non-empty key lands in exactly one cluster. Names
//! that share a key but were recorded at different places are kept apart:
//! the key groups surface forms, the location separates people.

use std::collections::{BTreeSet, HashMap};

use tracing::debug;

use crate::entity::{RawEntity, RawEntityTable};
use crate::normalize::normalize;

/// A group of raw names believed to denote one person.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cluster {
    /// Normalization key of the cluster's first member.
    pub key: String,
    /// Raw names, in first-seen order.
    pub members: Vec<String>,
    /// Lowercased non-empty locations recorded by the members.
    pub locations: BTreeSet<String>,
}

impl Cluster {
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            members: Vec::new(),
            locations: BTreeSet::new(),
        }
    }

    /// Adds a member and its recorded location.
    pub fn push(&mut self, raw_name: impl Into<String>, location: Option<&str>) {
        self.members.push(raw_name.into());
        if let Some(loc) = location.map(str::trim).filter(|l| !l.is_empty()) {
            self.locations.insert(loc.to_lowercase());
        }
    }

    /// Moves every member of `other` into this cluster.
    pub fn absorb(&mut self, other: Self) {
        self.members.extend(other.members);
        self.locations.extend(other.locations);
    }

    /// Location compatibility: one side has no recorded location, or the
    /// two location sets intersect.
    #[must_use]
    pub fn is_location_compatible(&self, other: &Self) -> bool {
        locations_compatible(&self.locations, &other.locations)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Returns true if either set is empty or the sets share an element.
#[must_use]
pub fn locations_compatible(a: &BTreeSet<String>, b: &BTreeSet<String>) -> bool {
    a.is_empty() || b.is_empty() || !a.is_disjoint(b)
}

/// Result of the exact-match pass.
#[derive(Debug, Clone, Default)]
pub struct InitialClustering {
    /// Clusters in the first-seen order of their first member.
    pub clusters: Vec<Cluster>,
    /// Raw names whose key is empty; they are flagged for manual review.
    pub unclusterable: Vec<String>,
}

/// Members sharing one key, split by location.
struct KeyGroup<'a> {
    key: String,
    /// `(lowercased location, members)` in first-seen order.
    located: Vec<(String, Vec<(usize, &'a RawEntity)>)>,
    unlocated: Vec<(usize, &'a RawEntity)>,
}

impl<'a> KeyGroup<'a> {
    fn add(&mut self, position: usize, entity: &'a RawEntity) {
        match entity.recorded_location() {
            Some(loc) => {
                let loc = loc.to_lowercase();
                if let Some((_, members)) = self.located.iter_mut().find(|(l, _)| *l == loc) {
                    members.push((position, entity));
                } else {
                    self.located.push((loc, vec![(position, entity)]));
                }
            }
            None => self.unlocated.push((position, entity)),
        }
    }

    /// Splits the group into `(first member position, cluster)` pairs.
    fn into_clusters(self) -> Vec<(usize, Cluster)> {
        let build = |key: &str, mut members: Vec<(usize, &RawEntity)>| {
            members.sort_by_key(|(pos, _)| *pos);
            let first = members.first().map_or(usize::MAX, |(pos, _)| *pos);
            let mut cluster = Cluster::new(key);
            for (_, entity) in members {
                cluster.push(entity.raw_name.clone(), entity.recorded_location());
            }
            (first, cluster)
        };

        if self.located.len() <= 1 {
            let mut members = self.unlocated;
            for (_, located) in self.located {
                members.extend(located);
            }
            return vec![build(&self.key, members)];
        }

        debug!(
            key = %self.key,
            locations = self.located.len(),
            "Splitting same-key names recorded at different places"
        );

        let mut clusters: Vec<(usize, Cluster)> = self
            .located
            .into_iter()
            .map(|(_, members)| build(&self.key, members))
            .collect();
        if !self.unlocated.is_empty() {
            clusters.push(build(&self.key, self.unlocated));
        }
        clusters
    }
}

/// Groups raw entities by normalization key.
///
/// Within a key, members recorded at different non-empty locations
/// (compared case-insensitively) form separate clusters. Members without a
/// location join the located cluster when there is exactly one; otherwise
/// they form a cluster of their own.
#[must_use]
pub fn build_initial_clusters(entities: &RawEntityTable) -> InitialClustering {
    let mut groups: Vec<KeyGroup<'_>> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut unclusterable = Vec::new();

    for (position, entity) in entities.iter().enumerate() {
        let key = normalize(&entity.raw_name);
        if key.is_empty() {
            unclusterable.push(entity.raw_name.clone());
            continue;
        }

        let slot = *index.entry(key.clone()).or_insert_with(|| {
            groups.push(KeyGroup {
                key,
                located: Vec::new(),
                unlocated: Vec::new(),
            });
            groups.len() - 1
        });
        groups[slot].add(position, entity);
    }

    let mut positioned: Vec<(usize, Cluster)> =
        groups.into_iter().flat_map(KeyGroup::into_clusters).collect();
    positioned.sort_by_key(|(first, _)| *first);

    InitialClustering {
        clusters: positioned.into_iter().map(|(_, cluster)| cluster).collect(),
        unclusterable,
    }
}
