//! # RedLilium Engine Demos
//!
//! Demo scenes showcasing RedLilium instancing.
//!
//! ## Available Demos
//!
//! - `instancing_demo` - Headless swarm of instanced ships churning through a pool

use redlilium_instancing::math::{Transform, Vec3, quat_from_rotation_y};
use redlilium_instancing::{
    Color, GeometryGroup, GeometryHandle, InstancedPool, MemberId, MemberWatcher, PoolConfig,
    SceneMembers, TemplateMesh, TemplateNode, TickReport,
};

/// Demos library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// A two-material hull with a raised turret.
pub fn ship_template() -> TemplateMesh {
    let hull = TemplateNode::new("hull", GeometryHandle(0))
        .with_group(GeometryGroup::new(0..36, 0))
        .with_group(GeometryGroup::new(36..60, 1))
        .with_materials(vec![Color::rgb(0.6, 0.6, 0.65), Color::rgb(0.9, 0.2, 0.1)]);
    let turret = TemplateNode::new("turret", GeometryHandle(1))
        .with_world(Transform::from_translation(Vec3::new(0.0, 0.5, 0.0)).to_matrix());
    TemplateMesh::new("ship").with_node(hull).with_node(turret)
}

/// Ships circling the origin. Every few frames one ship is hidden, shown
/// again, or replaced, so the pool sees a steady mix of all requests.
pub struct Swarm {
    pub pool: InstancedPool,
    pub scene: SceneMembers,
    watcher: MemberWatcher,
    ships: Vec<MemberId>,
    palette: Vec<Color>,
    frame: u64,
}

/// Hull and stripe colors given to every third ship.
pub const DEFAULT_PALETTE: &str = "#3366e6, #ffcc1a";

impl Swarm {
    pub fn new(config: PoolConfig, ships: usize) -> Self {
        Self::with_palette(config, ships, Color::parse_list(DEFAULT_PALETTE))
    }

    /// Like [`new`](Self::new), with explicit member colors for every third
    /// ship. An empty palette leaves all ships in template colors.
    pub fn with_palette(config: PoolConfig, ships: usize, palette: Vec<Color>) -> Self {
        let mut swarm = Self {
            pool: InstancedPool::new(config),
            scene: SceneMembers::new(),
            watcher: MemberWatcher::new(),
            ships: Vec::new(),
            palette,
            frame: 0,
        };
        for i in 0..ships {
            swarm.spawn_ship(i);
        }
        swarm
    }

    /// Attaches the template. Requests seen before this are replayed on the
    /// next step.
    pub fn load_template(&mut self) {
        let channels = self.pool.attach_template(&ship_template());
        log::info!("Template loaded into {channels} channel(s)");
    }

    fn spawn_ship(&mut self, seed: usize) {
        let id = self.scene.spawn(Self::orbit(seed, 0));
        if seed % 3 == 0 && !self.palette.is_empty() {
            self.scene.set_colors(id, self.palette.clone());
        }
        self.ships.push(id);
    }

    fn orbit(seed: usize, frame: u64) -> Transform {
        let radius = 5.0 + (seed % 7) as f32;
        let angle = seed as f32 * 0.37 + frame as f32 * 0.02;
        Transform::from_translation(Vec3::new(
            radius * angle.cos(),
            (seed % 4) as f32,
            radius * angle.sin(),
        ))
        .with_rotation(quat_from_rotation_y(-angle))
    }

    /// Runs one frame: moves ships, feeds changes to the pool, then ticks.
    pub fn step(&mut self) -> TickReport {
        self.frame += 1;
        let frame = self.frame;

        for (seed, id) in self.ships.iter().enumerate() {
            self.scene.set_transform(*id, Self::orbit(seed, frame));
        }

        if !self.ships.is_empty() {
            let pick = (frame as usize * 7) % self.ships.len();
            let id = self.ships[pick];
            match frame % 5 {
                1 => {
                    self.scene.set_visible(id, false);
                }
                3 => {
                    self.scene.set_visible(id, true);
                }
                4 => {
                    self.scene.despawn(id);
                    self.ships.remove(pick);
                    self.spawn_ship(frame as usize);
                }
                _ => {}
            }
        }

        for request in self.watcher.sync(&self.scene) {
            self.pool.notify(&mut self.scene, request);
        }
        self.scene.update_world_matrices();
        self.pool.advance(&mut self.scene)
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use redlilium_instancing::UpdateMode;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn swarm_pool_matches_visible_ships() {
        let mut swarm = Swarm::new(PoolConfig::default().with_capacity(64), 20);
        swarm.step();
        swarm.load_template();
        for _ in 0..50 {
            swarm.step();
        }

        let visible = swarm
            .scene
            .ids()
            .filter(|id| swarm.scene.is_visible(*id))
            .count();
        // Removals reported this frame are compacted by the same step
        assert_eq!(swarm.pool.pending_removals().count(), 0);
        assert_eq!(swarm.pool.active_count(), visible);
        assert_eq!(swarm.pool.channels().len(), 3);
    }

    #[test]
    fn auto_mode_refreshes_every_ship() {
        let config = PoolConfig::default()
            .with_capacity(32)
            .with_update_mode(UpdateMode::Auto);
        let mut swarm = Swarm::new(config, 10);
        swarm.load_template();
        let report = swarm.step();
        assert!(swarm.pool.is_ready());
        assert_eq!(report.refreshed, swarm.pool.active_count());
    }

    #[test]
    fn palette_colors_reach_channels() {
        let palette = Color::parse_list("#ff0000");
        // The first ship gets the palette; the second is hidden on frame 1
        let mut swarm = Swarm::with_palette(PoolConfig::default(), 2, palette);
        swarm.load_template();
        swarm.step();

        assert_eq!(swarm.pool.active_count(), 1);
        for channel in swarm.pool.channels() {
            assert_eq!(channel.color(0), Color::RED);
        }
    }
}
