//! Lifecycle requests and the queue that holds them until the pool is ready.

use crate::member::MemberId;

/// A change reported by a member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleRequest {
    Added(MemberId),
    Modified(MemberId),
    Removed(MemberId),
}

impl LifecycleRequest {
    pub fn member(self) -> MemberId {
        match self {
            Self::Added(m) | Self::Modified(m) | Self::Removed(m) => m,
        }
    }

    pub fn kind(self) -> &'static str {
        match self {
            Self::Added(_) => "added",
            Self::Modified(_) => "modified",
            Self::Removed(_) => "removed",
        }
    }
}

/// Requests received before the pool became ready, in arrival order.
///
/// The queue is drained exactly once. After that it is retired and refuses
/// further requests, since a ready pool handles them directly.
#[derive(Debug, Clone, Default)]
pub struct BootstrapQueue {
    requests: Vec<LifecycleRequest>,
    drained: bool,
}

impl BootstrapQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a request. Returns `false` if the queue was already drained.
    pub fn enqueue(&mut self, request: LifecycleRequest) -> bool {
        if self.drained {
            log::warn!(
                "Bootstrap queue already drained, dropping {} request for {}",
                request.kind(),
                request.member()
            );
            return false;
        }
        self.requests.push(request);
        true
    }

    /// Takes every queued request and retires the queue.
    pub fn drain(&mut self) -> Vec<LifecycleRequest> {
        self.drained = true;
        std::mem::take(&mut self.requests)
    }

    pub fn is_drained(&self) -> bool {
        self.drained
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }
}
