//! Per-node storage layout detection

use dashmap::DashMap;
use std::future::Future;
use std::time::Duration;
use strand_config::PathConfig;
use strand_events::{AcquisitionEvent, EventEmitter, EventSender};
use strand_types::{ConsensusNode, NodeId, PathType};
use tokio::time::Instant;
use tracing::info;

/// Cached layout of one node and when it was last checked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathObservation {
    pub path_type: PathType,
    pub last_checked: Instant,
}

/// Resolves which layout each node currently publishes under
///
/// In `Auto` mode every node starts at `Legacy`. Once an observation is
/// older than the refresh interval the current layout is checked again; as
/// soon as files show up there the node is pinned to `Current` and never
/// falls back unless [`PathResolver::reset`] is called.
#[derive(Debug)]
pub struct PathResolver {
    mode: PathType,
    refresh_interval: Duration,
    observations: DashMap<NodeId, PathObservation>,
    events: Option<EventSender>,
}

impl PathResolver {
    #[must_use]
    pub fn new(mode: PathType, refresh_interval: Duration) -> Self {
        Self {
            mode,
            refresh_interval,
            observations: DashMap::new(),
            events: None,
        }
    }

    #[must_use]
    pub fn from_config(config: &PathConfig) -> Self {
        Self::new(config.path_type, config.refresh_interval())
    }

    #[must_use]
    pub fn with_events(mut self, events: EventSender) -> Self {
        self.events = Some(events);
        self
    }

    #[must_use]
    pub fn mode(&self) -> PathType {
        self.mode
    }

    /// Resolve the layout for `node`, calling `check_current` when the
    /// current layout needs checking
    ///
    /// `check_current` resolves to `true` if the node has files under the
    /// current layout. It is never called outside `Auto` mode or once the
    /// node is pinned.
    pub async fn resolve<F, Fut>(&self, node: &ConsensusNode, check_current: F) -> PathType
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = bool>,
    {
        if self.mode != PathType::Auto {
            return self.mode;
        }

        let now = Instant::now();
        let cached = self.observations.get(&node.node_id).map(|entry| *entry);
        let observation = match cached {
            Some(observation) => observation,
            None => {
                let initial = PathObservation {
                    path_type: PathType::Legacy,
                    last_checked: now,
                };
                // a concurrent caller may have inserted first
                *self.observations.entry(node.node_id).or_insert(initial)
            }
        };

        if observation.path_type == PathType::Current
            || now.duration_since(observation.last_checked) < self.refresh_interval
        {
            return observation.path_type;
        }

        let found = check_current().await;
        let observed = if found {
            PathType::Current
        } else {
            PathType::Legacy
        };

        let mut switched = false;
        let resolved = {
            let mut entry = self
                .observations
                .entry(node.node_id)
                .or_insert(observation);
            if entry.path_type != PathType::Current {
                switched = observed == PathType::Current;
                *entry = PathObservation {
                    path_type: observed,
                    last_checked: Instant::now(),
                };
            }
            entry.path_type
        };

        if switched {
            info!(node = %node, "node switched to current storage layout");
            self.events.emit_acquisition(AcquisitionEvent::PathSwitched {
                node: node.to_string(),
                from: PathType::Legacy,
                to: PathType::Current,
            });
        }
        resolved
    }

    #[must_use]
    pub fn observation(&self, node: NodeId) -> Option<PathObservation> {
        self.observations.get(&node).map(|entry| *entry)
    }

    /// Forget a node's observation so it starts over at `Legacy`
    pub fn reset(&self, node: NodeId) {
        self.observations.remove(&node);
    }

    pub fn reset_all(&self) {
        self.observations.clear();
    }
}
