//! Worklist of pending fix candidates.

use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::candidate::{CandidateId, FixCandidate};

/// Exploration order of the search tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStrategy {
    /// Last in, first out.
    #[default]
    #[serde(alias = "dfs")]
    DepthFirst,
    /// First in, first out.
    #[serde(alias = "bfs")]
    BreadthFirst,
}

impl SearchStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            SearchStrategy::DepthFirst => "dfs",
            SearchStrategy::BreadthFirst => "bfs",
        }
    }
}

impl fmt::Display for SearchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchStrategy {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "dfs" | "depth-first" | "depth_first" => Ok(SearchStrategy::DepthFirst),
            "bfs" | "breadth-first" | "breadth_first" => Ok(SearchStrategy::BreadthFirst),
            other => Err(format!("unknown search strategy '{other}' (expected dfs or bfs)")),
        }
    }
}

/// Pending candidates, ordered by [`SearchStrategy`] and optionally
/// partitioned into priority buckets keyed by repaired-property count.
///
/// Without priority mode every candidate lands in bucket 0.
#[derive(Debug, Clone)]
pub struct CandidateSpace {
    strategy: SearchStrategy,
    prioritize: bool,
    buckets: BTreeMap<usize, VecDeque<CandidateId>>,
    len: usize,
}

impl CandidateSpace {
    pub fn new(strategy: SearchStrategy, prioritize: bool) -> Self {
        Self {
            strategy,
            prioritize,
            buckets: BTreeMap::new(),
            len: 0,
        }
    }

    pub fn push(&mut self, candidate: &FixCandidate) {
        let key = if self.prioritize {
            candidate.repaired_properties()
        } else {
            0
        };
        self.buckets.entry(key).or_default().push_back(candidate.id());
        self.len += 1;
    }

    /// Remove the next candidate.
    ///
    /// # Panics
    ///
    /// Panics if the space is empty; callers check [`Self::is_empty`] first.
    pub fn pop(&mut self) -> CandidateId {
        let (&key, bucket) = self
            .buckets
            .iter_mut()
            .next_back()
            .unwrap_or_else(|| panic!("pop on empty candidate space"));
        let id = match self.strategy {
            SearchStrategy::DepthFirst => bucket.pop_back(),
            SearchStrategy::BreadthFirst => bucket.pop_front(),
        };
        if bucket.is_empty() {
            self.buckets.remove(&key);
        }
        let id = id.unwrap_or_else(|| panic!("empty priority bucket {key} left in space"));
        self.len -= 1;
        id
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn len(&self) -> usize {
        self.len
    }
}
