//! Access to member transforms and colors.
//!
//! The pool does not own member state. It reads transforms and colors
//! through a [`MemberHost`], which is usually the scene graph of the
//! application. [`SceneMembers`] is a small in-memory host for tools, tests
//! and headless demos.

use std::collections::BTreeMap;

use crate::color::Color;
use crate::math::{Mat4, Transform};
use crate::member::MemberId;

/// Source of member transforms.
///
/// Matrices are cached by the host. When `refresh` is set the host must
/// recompute the cached value before returning it; otherwise it may return
/// whatever it computed last.
pub trait MemberHost {
    /// Member transform relative to its parent. `None` for unknown members.
    fn local_matrix(&mut self, member: MemberId, refresh: bool) -> Option<Mat4>;

    /// Member transform in world space. `None` for unknown members.
    fn world_matrix(&mut self, member: MemberId, refresh: bool) -> Option<Mat4>;

    /// World transform of the node that contains the pool's channels.
    fn container_world_matrix(&mut self, refresh: bool) -> Mat4;

    /// Explicit per-member colors, empty when the member has none.
    fn member_colors(&self, member: MemberId) -> &[Color];
}

#[derive(Debug, Clone)]
struct MemberNode {
    transform: Transform,
    parent_world: Mat4,
    colors: Vec<Color>,
    visible: bool,
    cached_local: Mat4,
    cached_world: Mat4,
}

impl MemberNode {
    fn refresh(&mut self) {
        self.cached_local = self.transform.to_matrix();
        self.cached_world = self.parent_world * self.cached_local;
    }
}

/// In-memory [`MemberHost`] with explicit matrix caching.
///
/// Setters only change the source state. Cached matrices follow on a
/// refreshing read or on [`update_world_matrices`](Self::update_world_matrices),
/// which plays the role of the renderer's per-frame matrix pass.
#[derive(Debug, Clone)]
pub struct SceneMembers {
    members: BTreeMap<MemberId, MemberNode>,
    container: Mat4,
    cached_container: Mat4,
    next_id: u64,
}

impl SceneMembers {
    pub fn new() -> Self {
        Self {
            members: BTreeMap::new(),
            container: Mat4::identity(),
            cached_container: Mat4::identity(),
            next_id: 1,
        }
    }

    /// Creates a visible member with fresh caches.
    pub fn spawn(&mut self, transform: Transform) -> MemberId {
        let id = MemberId(self.next_id);
        self.next_id += 1;
        let mut node = MemberNode {
            transform,
            parent_world: Mat4::identity(),
            colors: Vec::new(),
            visible: true,
            cached_local: Mat4::identity(),
            cached_world: Mat4::identity(),
        };
        node.refresh();
        self.members.insert(id, node);
        id
    }

    pub fn despawn(&mut self, member: MemberId) -> bool {
        self.members.remove(&member).is_some()
    }

    pub fn contains(&self, member: MemberId) -> bool {
        self.members.contains_key(&member)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Member ids in ascending order.
    pub fn ids(&self) -> impl Iterator<Item = MemberId> + '_ {
        self.members.keys().copied()
    }

    pub fn transform(&self, member: MemberId) -> Option<Transform> {
        self.members.get(&member).map(|n| n.transform)
    }

    pub fn set_transform(&mut self, member: MemberId, transform: Transform) -> bool {
        self.with_node(member, |n| n.transform = transform)
    }

    pub fn parent_world(&self, member: MemberId) -> Option<Mat4> {
        self.members.get(&member).map(|n| n.parent_world)
    }

    pub fn set_parent_world(&mut self, member: MemberId, parent_world: Mat4) -> bool {
        self.with_node(member, |n| n.parent_world = parent_world)
    }

    pub fn set_colors(&mut self, member: MemberId, colors: Vec<Color>) -> bool {
        self.with_node(member, |n| n.colors = colors)
    }

    pub fn is_visible(&self, member: MemberId) -> bool {
        self.members.get(&member).is_some_and(|n| n.visible)
    }

    pub fn set_visible(&mut self, member: MemberId, visible: bool) -> bool {
        self.with_node(member, |n| n.visible = visible)
    }

    /// Sets the container transform. The cached copy follows on refresh.
    pub fn set_container_world(&mut self, world: Mat4) {
        self.container = world;
    }

    /// Recomputes every cached matrix.
    pub fn update_world_matrices(&mut self) {
        self.cached_container = self.container;
        for node in self.members.values_mut() {
            node.refresh();
        }
    }

    fn with_node(&mut self, member: MemberId, f: impl FnOnce(&mut MemberNode)) -> bool {
        match self.members.get_mut(&member) {
            Some(node) => {
                f(node);
                true
            }
            None => false,
        }
    }
}

impl Default for SceneMembers {
    fn default() -> Self {
        Self::new()
    }
}

impl MemberHost for SceneMembers {
    fn local_matrix(&mut self, member: MemberId, refresh: bool) -> Option<Mat4> {
        let node = self.members.get_mut(&member)?;
        if refresh {
            node.refresh();
        }
        Some(node.cached_local)
    }

    fn world_matrix(&mut self, member: MemberId, refresh: bool) -> Option<Mat4> {
        let node = self.members.get_mut(&member)?;
        if refresh {
            node.refresh();
        }
        Some(node.cached_world)
    }

    fn container_world_matrix(&mut self, refresh: bool) -> Mat4 {
        if refresh {
            self.cached_container = self.container;
        }
        self.cached_container
    }

    fn member_colors(&self, member: MemberId) -> &[Color] {
        self.members
            .get(&member)
            .map(|n| n.colors.as_slice())
            .unwrap_or(&[])
    }
}
