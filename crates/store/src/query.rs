use core_types::{Observation, SourceId, TimeWindow};
use std::collections::{BTreeMap, HashSet};

/// Which class of source a query admits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceFilter {
    #[default]
    All,
    OwnStore,
    ActiveCompetitors,
}

/// The latest observation of one source in a window, with the one before it.
#[derive(Debug, Clone, PartialEq)]
pub struct LatestPair {
    pub latest: Observation,
    pub previous: Option<Observation>,
}

/// The result of a windowed query.
///
/// Holds a snapshot of the product's observations inside the window, copied under
/// the store's read lock, and filters it by source class lazily on every pass.
/// Iterating twice yields the same sequence, in ascending timestamp order.
#[derive(Debug, Clone)]
pub struct ObservationQuery {
    window: TimeWindow,
    filter: SourceFilter,
    snapshot: Vec<Observation>,
    active_competitors: HashSet<SourceId>,
}

impl ObservationQuery {
    pub(crate) fn new(
        window: TimeWindow,
        filter: SourceFilter,
        snapshot: Vec<Observation>,
        active_competitors: HashSet<SourceId>,
    ) -> Self {
        Self {
            window,
            filter,
            snapshot,
            active_competitors,
        }
    }

    pub fn window(&self) -> TimeWindow {
        self.window
    }

    pub fn filter(&self) -> SourceFilter {
        self.filter
    }

    /// Starts a fresh pass over the admitted observations.
    pub fn iter(&self) -> QueryIter<'_> {
        QueryIter {
            query: self,
            inner: self.snapshot.iter(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    /// At most one observation per source: the one with the greatest timestamp.
    ///
    /// The snapshot is ordered by timestamp with equal timestamps kept in insertion
    /// order, so the last one seen for a source is also the most recently inserted.
    /// The result is ordered by source id.
    pub fn latest_per_source(&self) -> Vec<Observation> {
        let mut latest: BTreeMap<&SourceId, &Observation> = BTreeMap::new();
        for obs in self.iter() {
            latest.insert(&obs.source_id, obs);
        }
        latest.into_values().cloned().collect()
    }

    /// Like `latest_per_source`, but also returns the observation that preceded each
    /// latest one within the window.
    pub fn latest_pairs(&self) -> Vec<LatestPair> {
        let mut pairs: BTreeMap<&SourceId, (&Observation, Option<&Observation>)> = BTreeMap::new();
        for obs in self.iter() {
            pairs
                .entry(&obs.source_id)
                .and_modify(|(latest, previous)| {
                    *previous = Some(*latest);
                    *latest = obs;
                })
                .or_insert((obs, None));
        }
        pairs
            .into_values()
            .map(|(latest, previous)| LatestPair {
                latest: latest.clone(),
                previous: previous.cloned(),
            })
            .collect()
    }

    fn admits(&self, obs: &Observation) -> bool {
        match self.filter {
            SourceFilter::All => true,
            SourceFilter::OwnStore => obs.source_id.is_own_store(),
            SourceFilter::ActiveCompetitors => self.active_competitors.contains(&obs.source_id),
        }
    }
}

/// Iterator over the observations an `ObservationQuery` admits.
pub struct QueryIter<'a> {
    query: &'a ObservationQuery,
    inner: std::slice::Iter<'a, Observation>,
}

impl<'a> Iterator for QueryIter<'a> {
    type Item = &'a Observation;

    fn next(&mut self) -> Option<Self::Item> {
        let query = self.query;
        self.inner.by_ref().find(|obs| query.admits(obs))
    }
}

impl<'a> IntoIterator for &'a ObservationQuery {
    type Item = &'a Observation;
    type IntoIter = QueryIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
