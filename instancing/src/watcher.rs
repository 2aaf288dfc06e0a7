//! Turns member state changes into lifecycle requests.

use std::collections::BTreeMap;

use crate::bootstrap::LifecycleRequest;
use crate::host::SceneMembers;
use crate::math::{Mat4, Transform};
use crate::member::MemberId;

#[derive(Debug, Clone)]
struct Observed {
    visible: bool,
    transform: Transform,
    parent_world: Mat4,
}

/// Mirrors [`SceneMembers`] into the requests a pool expects.
///
/// A member is in the pool exactly while it exists and is visible:
/// appearing or becoming visible adds it, becoming hidden or despawning
/// removes it, and a transform change while visible modifies it.
#[derive(Debug, Clone, Default)]
pub struct MemberWatcher {
    observed: BTreeMap<MemberId, Observed>,
}

impl MemberWatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Members currently reported as added.
    pub fn added_count(&self) -> usize {
        self.observed.values().filter(|o| o.visible).count()
    }

    /// Compares `scene` with the previous observation.
    ///
    /// Requests for existing members come first in id order, followed by
    /// removals of despawned members.
    pub fn sync(&mut self, scene: &SceneMembers) -> Vec<LifecycleRequest> {
        let mut requests = Vec::new();

        for id in scene.ids() {
            let (Some(transform), Some(parent_world)) =
                (scene.transform(id), scene.parent_world(id))
            else {
                continue;
            };
            let current = Observed {
                visible: scene.is_visible(id),
                transform,
                parent_world,
            };

            match self.observed.get(&id) {
                None if current.visible => requests.push(LifecycleRequest::Added(id)),
                None => {}
                Some(previous) => match (previous.visible, current.visible) {
                    (true, false) => requests.push(LifecycleRequest::Removed(id)),
                    (false, true) => requests.push(LifecycleRequest::Added(id)),
                    (true, true)
                        if previous.transform != current.transform
                            || previous.parent_world != current.parent_world =>
                    {
                        requests.push(LifecycleRequest::Modified(id))
                    }
                    _ => {}
                },
            }
            self.observed.insert(id, current);
        }

        let despawned: Vec<MemberId> = self
            .observed
            .keys()
            .copied()
            .filter(|id| !scene.contains(*id))
            .collect();
        for id in despawned {
            if let Some(previous) = self.observed.remove(&id)
                && previous.visible
            {
                requests.push(LifecycleRequest::Removed(id));
            }
        }

        requests
    }
}
