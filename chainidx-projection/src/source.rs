//! The consensus engine's contract, modeled as a trait rather than an
//! implementation: the real engine is an external collaborator this crate
//! only consumes. The two implementations here are test/replay utilities,
//! not production consensus engines.

use std::collections::VecDeque;
use std::path::PathBuf;

use anyhow::anyhow;
use async_trait::async_trait;
use chainidx_core::{ChangeId, ConsensusChange, ProjectionError};

/// What the Projection Engine needs from a consensus subscription: a
/// resumable, linearly-ordered stream of [`ConsensusChange`]s.
#[async_trait]
pub trait ConsensusSource: Send {
    /// Begin (or resume) the subscription. `resume_from` is the identifier
    /// of the last change the caller has durably applied, or `None` to
    /// start from genesis.
    async fn subscribe(&mut self, resume_from: Option<ChangeId>) -> Result<(), ProjectionError>;

    /// The next change in order, or `None` once the source is exhausted.
    async fn next_change(&mut self) -> Result<Option<ConsensusChange>, ProjectionError>;
}

/// Reads newline-delimited JSON `ConsensusChange` records from a file.
///
/// Exists for local replay and integration testing against a fixture of
/// recorded changes; a live deployment subscribes to a real consensus
/// engine instead.
pub struct FileReplaySource {
    path: PathBuf,
    queue: VecDeque<ConsensusChange>,
}

impl FileReplaySource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            queue: VecDeque::new(),
        }
    }
}

#[async_trait]
impl ConsensusSource for FileReplaySource {
    async fn subscribe(&mut self, resume_from: Option<ChangeId>) -> Result<(), ProjectionError> {
        let contents = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| ProjectionError::SubscriptionSetup(e.into()))?;

        let mut skipping = resume_from.is_some();
        let mut queue = VecDeque::new();
        for line in contents.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let change: ConsensusChange = serde_json::from_str(line)
                .map_err(|e| ProjectionError::SubscriptionSetup(e.into()))?;

            if skipping {
                if Some(&change.id) == resume_from.as_ref() {
                    skipping = false;
                }
                continue;
            }
            queue.push_back(change);
        }

        if skipping {
            return Err(ProjectionError::SubscriptionSetup(anyhow!(
                "resume point not found in replay file"
            )));
        }

        self.queue = queue;
        Ok(())
    }

    async fn next_change(&mut self) -> Result<Option<ConsensusChange>, ProjectionError> {
        Ok(self.queue.pop_front())
    }
}

/// An in-memory [`ConsensusSource`] backed by a fixed list of changes,
/// honoring `resume_from` the same way [`FileReplaySource`] does. Used by
/// the property tests in this crate and available to integration tests
/// upstream.
pub struct MemoryConsensusSource {
    all: Vec<ConsensusChange>,
    queue: VecDeque<ConsensusChange>,
}

impl MemoryConsensusSource {
    pub fn new(changes: Vec<ConsensusChange>) -> Self {
        Self {
            all: changes,
            queue: VecDeque::new(),
        }
    }
}

#[async_trait]
impl ConsensusSource for MemoryConsensusSource {
    async fn subscribe(&mut self, resume_from: Option<ChangeId>) -> Result<(), ProjectionError> {
        let mut skipping = resume_from.is_some();
        let mut queue = VecDeque::new();
        for change in &self.all {
            if skipping {
                if Some(&change.id) == resume_from.as_ref() {
                    skipping = false;
                }
                continue;
            }
            queue.push_back(change.clone());
        }
        if skipping {
            return Err(ProjectionError::SubscriptionSetup(anyhow!(
                "resume point not found in change list"
            )));
        }
        self.queue = queue;
        Ok(())
    }

    async fn next_change(&mut self) -> Result<Option<ConsensusChange>, ProjectionError> {
        Ok(self.queue.pop_front())
    }
}
