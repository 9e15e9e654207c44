//! Fix candidates and the lineage ledger.
//!
//! Candidates live in a [`CandidateArena`] and refer to their parent by
//! index, so ancestor lookups are iterative walks over indices. Each node
//! records the content hashes of the tests it introduced; a new test whose
//! hash appears anywhere on the path back to the root is filtered out, which
//! keeps the search from re-deriving the same counterexample in a cycle.

use std::collections::HashSet;
use std::fmt;
use std::ops::Index;

use thiserror::Error;

use crate::model::ModelVariant;
use crate::test_case::{PropertyTest, TestHash, TestKind, TestPool};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CandidateId(usize);

impl fmt::Display for CandidateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CandidateError {
    #[error("{kind} test {hash} cannot be placed in an untrusted pool")]
    TrustedInUntrustedPool { kind: TestKind, hash: TestHash },
}

/// A node of the search tree.
#[derive(Debug, Clone)]
pub struct FixCandidate {
    id: CandidateId,
    parent: Option<CandidateId>,
    model: ModelVariant,
    depth: usize,
    untrusted: TestPool,
    trusted: TestPool,
    repaired_properties: usize,
    hashes: HashSet<TestHash>,
}

impl FixCandidate {
    pub fn id(&self) -> CandidateId {
        self.id
    }

    pub fn parent(&self) -> Option<CandidateId> {
        self.parent
    }

    pub fn model(&self) -> &ModelVariant {
        &self.model
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn untrusted(&self) -> &TestPool {
        &self.untrusted
    }

    pub fn trusted(&self) -> &TestPool {
        &self.trusted
    }

    /// Number of oracle properties the last verified repair of this candidate
    /// satisfied. Drives priority scheduling.
    pub fn repaired_properties(&self) -> usize {
        self.repaired_properties
    }

    pub fn has_local_tests(&self) -> bool {
        !self.untrusted.is_empty() || !self.trusted.is_empty()
    }

    /// Hashes of the tests this candidate introduced.
    pub fn introduced(&self) -> &HashSet<TestHash> {
        &self.hashes
    }
}

/// Everything needed to build a child candidate from a parent.
///
/// `trusted` and `untrusted` are the inherited pools and are copied as-is.
/// The `new_*` tests are filtered against the lineage ledger; `new_global`
/// tests are recorded in the child's ledger but stored in the caller's global
/// pool rather than locally.
#[derive(Debug, Clone)]
pub struct ChildSpec {
    pub model: ModelVariant,
    pub trusted: TestPool,
    pub untrusted: TestPool,
    pub new_trusted: Vec<PropertyTest>,
    pub new_untrusted: Vec<PropertyTest>,
    pub new_global: Vec<PropertyTest>,
    pub repaired_properties: usize,
}

impl ChildSpec {
    /// Start from the parent's model and local pools with no additions.
    pub fn from_parent(parent: &FixCandidate) -> Self {
        Self {
            model: parent.model.clone(),
            trusted: parent.trusted.clone(),
            untrusted: parent.untrusted.clone(),
            new_trusted: Vec::new(),
            new_untrusted: Vec::new(),
            new_global: Vec::new(),
            repaired_properties: parent.repaired_properties,
        }
    }

    pub fn with_new_trusted(mut self, tests: impl IntoIterator<Item = PropertyTest>) -> Self {
        self.new_trusted.extend(tests);
        self
    }

    pub fn with_new_untrusted(mut self, tests: impl IntoIterator<Item = PropertyTest>) -> Self {
        self.new_untrusted.extend(tests);
        self
    }

    pub fn with_new_global(mut self, tests: impl IntoIterator<Item = PropertyTest>) -> Self {
        self.new_global.extend(tests);
        self
    }

    pub fn with_repaired_properties(mut self, repaired_properties: usize) -> Self {
        self.repaired_properties = repaired_properties;
        self
    }
}

/// A child that made it into the arena, with the new tests that survived
/// lineage filtering.
#[derive(Debug, Clone)]
pub struct Branch {
    pub id: CandidateId,
    pub accepted: Vec<PropertyTest>,
    pub dropped: usize,
}

/// Owner of every candidate created during a run.
#[derive(Debug, Clone)]
pub struct CandidateArena {
    nodes: Vec<FixCandidate>,
    dedup: bool,
}

impl CandidateArena {
    /// `dedup` enables lineage filtering of new tests.
    pub fn new(dedup: bool) -> Self {
        Self {
            nodes: Vec::new(),
            dedup,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Create a depth-0 candidate. The seeded tests are held by the caller
    /// (they are global) but are entered into the root's ledger.
    pub fn root<'a>(
        &mut self,
        model: ModelVariant,
        seeded: impl IntoIterator<Item = &'a PropertyTest>,
    ) -> CandidateId {
        let id = CandidateId(self.nodes.len());
        self.nodes.push(FixCandidate {
            id,
            parent: None,
            model,
            depth: 0,
            untrusted: TestPool::new(),
            trusted: TestPool::new(),
            repaired_properties: 0,
            hashes: seeded.into_iter().map(|t| t.hash().clone()).collect(),
        });
        id
    }

    /// Build a child of `parent`.
    ///
    /// Returns `Ok(None)` when no new test survives filtering: such a child
    /// would not advance the search and must never be scheduled.
    pub fn branch(
        &mut self,
        parent: CandidateId,
        spec: ChildSpec,
    ) -> Result<Option<Branch>, CandidateError> {
        if let Some(bad) = spec
            .untrusted
            .iter()
            .chain(spec.new_untrusted.iter())
            .find(|t| t.kind().is_trusted())
        {
            return Err(CandidateError::TrustedInUntrustedPool {
                kind: bad.kind(),
                hash: bad.hash().clone(),
            });
        }

        let ChildSpec {
            model,
            mut trusted,
            mut untrusted,
            new_trusted,
            new_untrusted,
            new_global,
            repaired_properties,
        } = spec;

        let mut hashes = HashSet::new();
        let mut accepted = Vec::new();
        let mut dropped = 0usize;

        enum Target {
            Trusted,
            Untrusted,
            Global,
        }
        let additions = new_trusted
            .into_iter()
            .map(|t| (Target::Trusted, t))
            .chain(new_untrusted.into_iter().map(|t| (Target::Untrusted, t)))
            .chain(new_global.into_iter().map(|t| (Target::Global, t)));

        for (target, test) in additions {
            if self.dedup {
                let hash = test.hash();
                if hashes.contains(hash)
                    || trusted.contains(hash)
                    || untrusted.contains(hash)
                    || self.seen_in_lineage(parent, hash)
                {
                    tracing::warn!(test = %hash, parent = %parent, "filtered duplicate test");
                    dropped += 1;
                    continue;
                }
            }
            hashes.insert(test.hash().clone());
            match target {
                Target::Trusted => {
                    trusted.insert(test.clone());
                }
                Target::Untrusted => {
                    untrusted.insert(test.clone());
                }
                Target::Global => {}
            }
            accepted.push(test);
        }

        if accepted.is_empty() {
            return Ok(None);
        }

        let depth = self[parent].depth + 1;
        let id = CandidateId(self.nodes.len());
        self.nodes.push(FixCandidate {
            id,
            parent: Some(parent),
            model,
            depth,
            untrusted,
            trusted,
            repaired_properties,
            hashes,
        });
        Ok(Some(Branch {
            id,
            accepted,
            dropped,
        }))
    }

    /// True if `hash` was introduced by `from` or any of its ancestors.
    pub fn seen_in_lineage(&self, from: CandidateId, hash: &TestHash) -> bool {
        self.lineage(from).any(|node| node.hashes.contains(hash))
    }

    /// Walk from `from` back to the root, `from` included.
    pub fn lineage(&self, from: CandidateId) -> Lineage<'_> {
        Lineage {
            arena: self,
            cursor: Some(from),
            steps: 0,
        }
    }

    pub fn set_repaired_properties(&mut self, id: CandidateId, repaired_properties: usize) {
        self.nodes[id.0].repaired_properties = repaired_properties;
    }

    pub fn max_depth(&self) -> usize {
        self.nodes.iter().map(|n| n.depth).max().unwrap_or(0)
    }
}

impl Index<CandidateId> for CandidateArena {
    type Output = FixCandidate;

    fn index(&self, id: CandidateId) -> &FixCandidate {
        &self.nodes[id.0]
    }
}

pub struct Lineage<'a> {
    arena: &'a CandidateArena,
    cursor: Option<CandidateId>,
    steps: usize,
}

impl<'a> Iterator for Lineage<'a> {
    type Item = &'a FixCandidate;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.cursor?;
        self.steps += 1;
        assert!(
            self.steps <= self.arena.nodes.len(),
            "cycle in candidate lineage at {id}"
        );
        let node = &self.arena.nodes[id.0];
        self.cursor = node.parent;
        Some(node)
    }
}
