//! Shared helpers for instancing integration tests.

#![allow(dead_code)]

use redlilium_instancing::math::{Mat4, Transform, Vec3};
use redlilium_instancing::{
    Color, GeometryGroup, GeometryHandle, InstancedPool, MemberHost, MemberId, PoolConfig,
    SceneMembers, TemplateMesh, TemplateNode,
};

/// A ship made of a two-material hull and a turret raised by one unit.
pub fn ship_template() -> TemplateMesh {
    let hull = TemplateNode::new("hull", GeometryHandle(1))
        .with_group(GeometryGroup::new(0..36, 0))
        .with_group(GeometryGroup::new(36..72, 1))
        .with_materials(vec![Color::RED, Color::BLUE]);
    let turret = TemplateNode::new("turret", GeometryHandle(2))
        .with_world(translation(0.0, 1.0, 0.0))
        .with_materials(vec![Color::GREEN]);
    TemplateMesh::new("ship").with_node(hull).with_node(turret)
}

pub fn translation(x: f32, y: f32, z: f32) -> Mat4 {
    Transform::from_translation(Vec3::new(x, y, z)).to_matrix()
}

/// A ready pool with the ship template and an empty scene.
pub struct Harness {
    pub pool: InstancedPool,
    pub scene: SceneMembers,
}

impl Harness {
    pub fn new(config: PoolConfig) -> Self {
        let mut scene = SceneMembers::new();
        let mut pool = InstancedPool::new(config);
        pool.attach_template(&ship_template());
        assert!(pool.try_become_ready(&mut scene));
        Self { pool, scene }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self::new(PoolConfig::default().with_capacity(capacity))
    }

    /// Spawns a member whose x translation identifies it.
    pub fn spawn(&mut self, x: f32) -> MemberId {
        self.scene
            .spawn(Transform::from_translation(Vec3::new(x, 0.0, 0.0)))
    }

    pub fn spawn_and_add(&mut self, x: f32) -> MemberId {
        let id = self.spawn(x);
        self.pool.notify_added(&mut self.scene, id);
        id
    }

    pub fn remove(&mut self, member: MemberId) {
        self.pool.notify_removed(&mut self.scene, member);
    }

    pub fn tick(&mut self) -> redlilium_instancing::TickReport {
        self.pool.advance(&mut self.scene)
    }

    /// x translation written in `slot` of channel `channel`.
    pub fn slot_x(&self, channel: usize, slot: usize) -> f32 {
        self.pool.channels()[channel].transform(slot)[(0, 3)]
    }
}

/// Checks that every channel agrees with the member list and that each
/// active slot holds its own member's transform.
pub fn assert_consistent(pool: &InstancedPool, scene: &mut SceneMembers) {
    let members = pool.members().to_vec();
    for channel in pool.channels() {
        assert_eq!(channel.active_count(), members.len());
    }
    for (slot, member) in members.iter().enumerate() {
        assert_eq!(pool.slot_of(*member), Some(slot));
        let local = scene.local_matrix(*member, false).expect("member in scene");
        for channel in pool.channels() {
            let expected = local * channel.static_offset();
            assert!(
                (channel.transform(slot) - expected).norm() < 1e-5,
                "slot {slot} of '{}' does not hold member {member}",
                channel.label()
            );
        }
    }
}
