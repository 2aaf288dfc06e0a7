//! # RedLilium Instancing
//!
//! Draws many copies of one template model through a few shared instance
//! buffers. Each template part gets a fixed-capacity [`Channel`]; every
//! member owns the same slot index in all channels.
//!
//! The [`InstancedPool`] assigns and reuses slots, defers removals to a
//! single stable compaction per tick, composes member transforms in the
//! local or world frame, and queues requests that arrive before its
//! template is loaded.
//!
//! ```ignore
//! let mut pool = InstancedPool::new(PoolConfig::default().with_capacity(500));
//! pool.attach_template(&template);
//!
//! // Each frame
//! for request in watcher.sync(&scene) {
//!     pool.notify(&mut scene, request);
//! }
//! pool.advance(&mut scene);
//! ```

pub mod bootstrap;
pub mod channel;
pub mod color;
pub mod composer;
pub mod config;
pub mod error;
pub mod host;
pub mod math;
pub mod member;
pub mod pool;
pub mod readiness;
pub mod slots;
pub mod template;
pub mod watcher;

pub use bootstrap::{BootstrapQueue, LifecycleRequest};
pub use channel::{Channel, CullingSphere, InstanceRaw, RenderLayers};
pub use color::Color;
pub use composer::{Fidelity, TransformComposer, resolve_color};
pub use config::{CoordinateFrame, PoolConfig, UpdateMode};
pub use error::{ConfigError, PoolError};
pub use host::{MemberHost, SceneMembers};
pub use member::MemberId;
pub use pool::{InstancedPool, PoolDiagnostics, PoolState, TickReport};
pub use readiness::ReadinessGate;
pub use slots::{SlotAssignment, SlotKind, SlotPool};
pub use template::{GeometryGroup, GeometryHandle, TemplateMesh, TemplateNode, TemplatePart};
pub use watcher::MemberWatcher;

/// Instancing library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn init() {
    log::info!("RedLilium Instancing v{} initialized", VERSION);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
