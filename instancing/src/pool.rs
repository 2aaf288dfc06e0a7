//! The instanced pool: lifecycle entry points and per-tick scheduling.
//!
//! An [`InstancedPool`] starts [`PoolState::Uninitialized`]. Requests that
//! arrive before it is ready are queued and replayed in arrival order on
//! the single transition to [`PoolState::Ready`], which happens once a
//! template is attached and every expected texture has loaded.
//!
//! After that, adds and modifications write channel slots immediately while
//! removals are only marked. [`InstancedPool::advance`] compacts all marked
//! members in one pass per tick and, in [`UpdateMode::Auto`], rewrites every
//! active member's transform from the host's cached matrices.

use crate::bootstrap::{BootstrapQueue, LifecycleRequest};
use crate::channel::{Channel, CullingSphere, RenderLayers};
use crate::composer::{Fidelity, TransformComposer};
use crate::config::{PoolConfig, UpdateMode};
use crate::error::PoolError;
use crate::host::MemberHost;
use crate::member::MemberId;
use crate::readiness::ReadinessGate;
use crate::slots::{SlotAssignment, SlotKind, SlotPool};
use crate::template::{TemplateMesh, TemplatePart};

/// Lifecycle state of a pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolState {
    /// Waiting for a template and its resources. Requests are queued.
    Uninitialized,
    /// Channels exist and requests are applied directly.
    Ready,
}

/// What a call to [`InstancedPool::advance`] did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// The pool became ready during this tick.
    pub became_ready: bool,
    /// Members evicted by compaction.
    pub removed: usize,
    /// Members rewritten by the auto update.
    pub refreshed: usize,
}

/// Running counters of pool activity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolDiagnostics {
    pub added: u64,
    pub reused_slots: u64,
    pub capacity_rejections: u64,
    pub not_found: u64,
    pub modified: u64,
    pub marked: u64,
    pub compactions: u64,
    pub compacted_members: u64,
    pub auto_refreshes: u64,
    pub replayed_requests: u64,
    pub growths: u64,
}

/// A pool of members drawn through shared fixed-capacity channels.
#[derive(Debug, Clone)]
pub struct InstancedPool {
    config: PoolConfig,
    state: PoolState,
    channels: Vec<Channel>,
    slots: SlotPool,
    composer: TransformComposer,
    bootstrap: BootstrapQueue,
    readiness: ReadinessGate,
    diagnostics: PoolDiagnostics,
}

impl InstancedPool {
    pub fn new(config: PoolConfig) -> Self {
        Self {
            state: PoolState::Uninitialized,
            channels: Vec::new(),
            slots: SlotPool::new(config.capacity),
            composer: TransformComposer::new(config.coordinate_frame),
            bootstrap: BootstrapQueue::new(),
            readiness: ReadinessGate::new(),
            diagnostics: PoolDiagnostics::default(),
            config,
        }
    }

    // ===== Accessors =====

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    pub fn state(&self) -> PoolState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == PoolState::Ready
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    /// The channel registered as the pool's renderable.
    pub fn primary_channel(&self) -> Option<&Channel> {
        self.channels.first()
    }

    /// Members in slot order.
    pub fn members(&self) -> &[MemberId] {
        self.slots.members()
    }

    pub fn active_count(&self) -> usize {
        self.slots.active_count()
    }

    pub fn capacity(&self) -> usize {
        self.slots.capacity()
    }

    pub fn slot_of(&self, member: MemberId) -> Option<usize> {
        self.slots.slot_of(member).ok()
    }

    pub fn is_pending_removal(&self, member: MemberId) -> bool {
        self.slots.is_pending(member)
    }

    pub fn pending_removals(&self) -> impl Iterator<Item = MemberId> + '_ {
        self.slots.pending_removals()
    }

    /// Requests waiting for the pool to become ready.
    pub fn queued_requests(&self) -> usize {
        self.bootstrap.len()
    }

    pub fn readiness(&self) -> &ReadinessGate {
        &self.readiness
    }

    pub fn diagnostics(&self) -> &PoolDiagnostics {
        &self.diagnostics
    }

    // ===== Template and readiness =====

    /// Splits `template` into parts and creates one channel per part.
    ///
    /// Returns the number of channels created.
    pub fn attach_template(&mut self, template: &TemplateMesh) -> usize {
        let parts = template.parts(self.config.decompose_by_material);
        self.attach_parts(&parts)
    }

    /// Creates one channel per part and marks the template as loaded.
    ///
    /// Ignored once the pool is ready, since member slots already refer to
    /// the existing channels.
    pub fn attach_parts(&mut self, parts: &[TemplatePart]) -> usize {
        if self.is_ready() {
            log::warn!("Pool is already ready, ignoring new template parts");
            return 0;
        }
        if parts.is_empty() {
            log::warn!("Template has no renderable parts");
            return 0;
        }

        let capacity = self.capacity();
        self.channels = parts
            .iter()
            .map(|part| {
                let mut channel = Channel::new(part, capacity);
                channel.set_culling(self.config.culling);
                channel.set_layers(self.config.layers);
                channel
            })
            .collect();
        self.readiness.mark_mesh_loaded();

        log::info!(
            "Created {} channel(s) with capacity {}",
            self.channels.len(),
            capacity
        );
        self.channels.len()
    }

    /// Adds `count` textures the pool must wait for.
    pub fn expect_textures(&mut self, count: usize) {
        self.readiness.expect_textures(count);
    }

    pub fn texture_loaded(&mut self) {
        self.readiness.texture_loaded();
    }

    /// Transitions to ready if channels exist and every resource has
    /// loaded, replaying queued requests in arrival order.
    ///
    /// Called by every request entry point and by [`advance`](Self::advance),
    /// so a request arriving after the last resource loaded is applied
    /// directly rather than queued.
    ///
    /// Returns whether the pool is ready.
    pub fn try_become_ready<H: MemberHost + ?Sized>(&mut self, host: &mut H) -> bool {
        if self.is_ready() {
            return true;
        }
        if self.channels.is_empty() || !self.readiness.is_open() {
            return false;
        }

        self.state = PoolState::Ready;
        self.composer.refresh_parent_inverse(host);
        let queued = self.bootstrap.drain();
        log::info!("Pool ready, replaying {} queued request(s)", queued.len());
        for request in queued {
            self.diagnostics.replayed_requests += 1;
            self.apply(host, request);
        }
        true
    }

    // ===== Lifecycle requests =====

    /// Handles a member request. Queued until ready, applied after.
    ///
    /// Failures are logged and counted in [`diagnostics`](Self::diagnostics).
    pub fn notify<H: MemberHost + ?Sized>(&mut self, host: &mut H, request: LifecycleRequest) {
        if !self.try_become_ready(host) {
            if self.config.debug_logging {
                log::debug!(
                    "Queueing {} request for {} until ready",
                    request.kind(),
                    request.member()
                );
            }
            self.bootstrap.enqueue(request);
            return;
        }
        self.apply(host, request);
    }

    pub fn notify_added<H: MemberHost + ?Sized>(&mut self, host: &mut H, member: MemberId) {
        self.notify(host, LifecycleRequest::Added(member));
    }

    pub fn notify_modified<H: MemberHost + ?Sized>(&mut self, host: &mut H, member: MemberId) {
        self.notify(host, LifecycleRequest::Modified(member));
    }

    pub fn notify_removed<H: MemberHost + ?Sized>(&mut self, host: &mut H, member: MemberId) {
        self.notify(host, LifecycleRequest::Removed(member));
    }

    fn apply<H: MemberHost + ?Sized>(&mut self, host: &mut H, request: LifecycleRequest) {
        // Errors are already logged and counted by the operations.
        let _ = match request {
            LifecycleRequest::Added(member) => self.add(host, member).map(|_| ()),
            LifecycleRequest::Modified(member) => self.modify(host, member).map(|_| ()),
            LifecycleRequest::Removed(member) => self.mark_for_removal(member).map(|_| ()),
        };
    }

    /// Assigns `member` a slot and writes its transform and color.
    pub fn add<H: MemberHost + ?Sized>(
        &mut self,
        host: &mut H,
        member: MemberId,
    ) -> Result<SlotAssignment, PoolError> {
        if !self.try_become_ready(host) {
            return Err(PoolError::NotReady);
        }

        let assignment = match self.slots.add(member) {
            Ok(assignment) => assignment,
            Err(e) => {
                self.diagnostics.capacity_rejections += 1;
                log::warn!("Cannot add member {member}: {e}");
                return Err(e);
            }
        };

        match assignment.kind {
            SlotKind::Appended => self.diagnostics.added += 1,
            SlotKind::Reused => {
                self.diagnostics.added += 1;
                self.diagnostics.reused_slots += 1;
            }
            SlotKind::Existing => {
                log::warn!(
                    "Member {member} is already in the pool at slot {}, rewriting it",
                    assignment.slot
                );
            }
        }

        self.write_member(host, member, assignment.slot);
        let active = self.slots.active_count();
        for channel in &mut self.channels {
            channel.set_active_count(active);
        }

        if self.config.debug_logging {
            log::debug!(
                "Added member {member} at slot {} ({:?}), {active} active",
                assignment.slot,
                assignment.kind
            );
        }
        Ok(assignment)
    }

    /// Rewrites the slot of an active member from its current state.
    pub fn modify<H: MemberHost + ?Sized>(
        &mut self,
        host: &mut H,
        member: MemberId,
    ) -> Result<usize, PoolError> {
        if !self.try_become_ready(host) {
            return Err(PoolError::NotReady);
        }

        let slot = match self.slots.slot_of(member) {
            Ok(slot) => slot,
            Err(e) => {
                self.diagnostics.not_found += 1;
                log::error!("Cannot modify member {member}: {e}");
                return Err(e);
            }
        };

        self.write_member(host, member, slot);
        self.diagnostics.modified += 1;
        if self.config.debug_logging {
            log::debug!("Modified member {member} at slot {slot}");
        }
        Ok(slot)
    }

    /// Marks an active member for removal at the next tick.
    ///
    /// Returns `Ok(false)` if the member was already marked.
    pub fn mark_for_removal(&mut self, member: MemberId) -> Result<bool, PoolError> {
        self.ensure_ready()?;

        let marked = match self.slots.mark_for_removal(member) {
            Ok(marked) => marked,
            Err(e) => {
                self.diagnostics.not_found += 1;
                log::warn!("Cannot remove member {member}: {e}");
                return Err(e);
            }
        };

        if marked {
            self.diagnostics.marked += 1;
        }
        if self.config.debug_logging {
            log::debug!("Member {member} marked for removal (new mark: {marked})");
        }
        Ok(marked)
    }

    fn ensure_ready(&self) -> Result<(), PoolError> {
        match self.state {
            PoolState::Ready => Ok(()),
            PoolState::Uninitialized => Err(PoolError::NotReady),
        }
    }

    /// In auto mode the next tick rewrites every slot anyway, so one-off
    /// writes read cached matrices like the tick does.
    fn write_member<H: MemberHost + ?Sized>(&mut self, host: &mut H, member: MemberId, slot: usize) {
        let fidelity = match self.config.update_mode {
            UpdateMode::Manual => Fidelity::Manual,
            UpdateMode::Auto => Fidelity::Auto,
        };
        self.composer
            .write_transforms(host, member, slot, &mut self.channels, fidelity);
        self.composer
            .write_colors(&*host, member, slot, &mut self.channels);
    }

    // ===== Per-tick update =====

    /// Runs once per frame: becomes ready if possible, compacts pending
    /// removals, then rewrites every active member in auto mode.
    pub fn advance<H: MemberHost + ?Sized>(&mut self, host: &mut H) -> TickReport {
        let mut report = TickReport::default();
        if !self.is_ready() {
            report.became_ready = self.try_become_ready(host);
            if !report.became_ready {
                return report;
            }
        }

        if self.slots.has_pending_removals() {
            let removed = self.slots.compact(&mut self.channels);
            self.diagnostics.compactions += 1;
            self.diagnostics.compacted_members += removed as u64;
            log::info!(
                "Removed {removed} member(s), {} active",
                self.slots.active_count()
            );
            report.removed = removed;
        }

        if self.config.update_mode == UpdateMode::Auto {
            self.composer.refresh_parent_inverse(host);
            let active = self.slots.active_count();
            for slot in 0..active {
                let member = self.slots.members()[slot];
                self.composer.write_transforms(
                    host,
                    member,
                    slot,
                    &mut self.channels,
                    Fidelity::Auto,
                );
            }
            self.diagnostics.auto_refreshes += 1;
            report.refreshed = active;
        }

        report
    }

    // ===== Capacity =====

    /// Reallocates every channel with `new_capacity` slots.
    ///
    /// Slot assignments, the active count and pending removals are kept.
    /// Fails without changes if `new_capacity` is below the active count.
    pub fn grow(&mut self, new_capacity: usize) -> Result<(), PoolError> {
        if let Err(e) = self.slots.set_capacity(new_capacity) {
            log::warn!("Cannot resize pool: {e}");
            return Err(e);
        }
        self.channels = self
            .channels
            .iter()
            .map(|channel| channel.grown(new_capacity))
            .collect();
        self.config.capacity = new_capacity;
        self.diagnostics.growths += 1;
        log::info!(
            "Pool resized to capacity {new_capacity} ({} active)",
            self.slots.active_count()
        );
        Ok(())
    }

    /// Applies a reconfigured capacity. Only growth reallocates; an equal or
    /// smaller value keeps the current channels.
    ///
    /// Returns whether the channels were reallocated.
    pub fn reconfigure_capacity(&mut self, capacity: usize) -> Result<bool, PoolError> {
        if capacity <= self.capacity() {
            log::info!(
                "Keeping capacity {} (requested {capacity})",
                self.capacity()
            );
            return Ok(false);
        }
        self.grow(capacity)?;
        Ok(true)
    }

    // ===== Render properties =====

    pub fn apply_culling(&mut self, culling: Option<CullingSphere>) {
        self.config.culling = culling;
        for channel in &mut self.channels {
            channel.set_culling(culling);
        }
    }

    pub fn apply_layers(&mut self, layers: RenderLayers) {
        self.config.layers = layers;
        for channel in &mut self.channels {
            channel.set_layers(layers);
        }
    }

    /// Clears the upload flag of every channel after the renderer has
    /// consumed their data.
    pub fn mark_uploaded(&mut self) {
        for channel in &mut self.channels {
            channel.mark_uploaded();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Color;
    use crate::host::SceneMembers;
    use crate::math::{Transform, Vec3};
    use crate::template::GeometryHandle;

    fn ready_pool(capacity: usize) -> (InstancedPool, SceneMembers) {
        let mut scene = SceneMembers::new();
        let mut pool = InstancedPool::new(PoolConfig::default().with_capacity(capacity));
        pool.attach_parts(&[TemplatePart::new("body", GeometryHandle(0))]);
        assert!(pool.try_become_ready(&mut scene));
        (pool, scene)
    }

    fn spawn(scene: &mut SceneMembers, x: f32) -> MemberId {
        scene.spawn(Transform::from_translation(Vec3::new(x, 0.0, 0.0)))
    }

    #[test]
    fn starts_uninitialized() {
        let pool = InstancedPool::new(PoolConfig::default());
        assert_eq!(pool.state(), PoolState::Uninitialized);
        assert!(pool.primary_channel().is_none());
        assert_eq!(pool.capacity(), 100);
    }

    #[test]
    fn direct_api_requires_ready() {
        let mut scene = SceneMembers::new();
        let mut pool = InstancedPool::new(PoolConfig::default());
        let id = spawn(&mut scene, 0.0);
        assert_eq!(pool.add(&mut scene, id), Err(PoolError::NotReady));
        assert_eq!(pool.mark_for_removal(id), Err(PoolError::NotReady));
    }

    #[test]
    fn waits_for_textures() {
        let mut scene = SceneMembers::new();
        let mut pool = InstancedPool::new(PoolConfig::default());
        pool.expect_textures(1);
        pool.attach_parts(&[TemplatePart::new("body", GeometryHandle(0))]);

        assert!(!pool.advance(&mut scene).became_ready);
        pool.texture_loaded();
        assert!(pool.advance(&mut scene).became_ready);
        assert!(pool.is_ready());
    }

    #[test]
    fn request_after_template_load_applies_immediately() {
        let mut scene = SceneMembers::new();
        let mut pool = InstancedPool::new(PoolConfig::default());
        pool.attach_parts(&[TemplatePart::new("body", GeometryHandle(0))]);
        let id = spawn(&mut scene, 1.0);

        pool.notify_added(&mut scene, id);
        assert!(pool.is_ready());
        assert_eq!(pool.queued_requests(), 0);
        assert_eq!(pool.members(), &[id]);
    }

    #[test]
    fn last_texture_lets_next_request_replay_queue_first() {
        let mut scene = SceneMembers::new();
        let mut pool = InstancedPool::new(PoolConfig::default());
        pool.expect_textures(1);
        pool.attach_parts(&[TemplatePart::new("body", GeometryHandle(0))]);
        let a = spawn(&mut scene, 1.0);
        let b = spawn(&mut scene, 2.0);

        pool.notify_added(&mut scene, a);
        assert_eq!(pool.queued_requests(), 1);
        pool.texture_loaded();
        pool.notify_added(&mut scene, b);

        assert!(pool.is_ready());
        assert_eq!(pool.members(), &[a, b]);
        assert_eq!(pool.diagnostics().replayed_requests, 1);
    }

    #[test]
    fn direct_add_becomes_ready_when_gate_is_open() {
        let mut scene = SceneMembers::new();
        let mut pool = InstancedPool::new(PoolConfig::default());
        pool.attach_parts(&[TemplatePart::new("body", GeometryHandle(0))]);
        let id = spawn(&mut scene, 1.0);

        assert_eq!(pool.add(&mut scene, id).map(|a| a.slot), Ok(0));
        assert!(pool.is_ready());
    }

    #[test]
    fn add_writes_transform_and_color() {
        let (mut pool, mut scene) = ready_pool(4);
        let id = spawn(&mut scene, 3.0);
        scene.set_colors(id, vec![Color::RED]);

        pool.notify_added(&mut scene, id);
        let channel = pool.primary_channel().unwrap();
        assert_eq!(channel.active_count(), 1);
        assert_eq!(channel.transform(0)[(0, 3)], 3.0);
        assert_eq!(channel.color(0), Color::RED);
        assert_eq!(pool.diagnostics().added, 1);
    }

    #[test]
    fn modify_unknown_member_is_counted() {
        let (mut pool, mut scene) = ready_pool(4);
        pool.notify_modified(&mut scene, MemberId(42));
        assert_eq!(pool.diagnostics().not_found, 1);
        assert_eq!(pool.active_count(), 0);
    }

    #[test]
    fn capacity_rejection_is_counted() {
        let (mut pool, mut scene) = ready_pool(1);
        let a = spawn(&mut scene, 0.0);
        let b = spawn(&mut scene, 1.0);
        pool.notify_added(&mut scene, a);
        pool.notify_added(&mut scene, b);
        assert_eq!(pool.members(), &[a]);
        assert_eq!(pool.diagnostics().capacity_rejections, 1);
    }

    #[test]
    fn removal_is_deferred_to_tick() {
        let (mut pool, mut scene) = ready_pool(4);
        let a = spawn(&mut scene, 0.0);
        pool.notify_added(&mut scene, a);
        pool.notify_removed(&mut scene, a);

        assert_eq!(pool.active_count(), 1);
        assert!(pool.is_pending_removal(a));
        let report = pool.advance(&mut scene);
        assert_eq!(report.removed, 1);
        assert_eq!(pool.active_count(), 0);
        assert_eq!(pool.primary_channel().unwrap().active_count(), 0);
    }

    #[test]
    fn manual_mode_does_not_refresh() {
        let (mut pool, mut scene) = ready_pool(4);
        let a = spawn(&mut scene, 0.0);
        pool.notify_added(&mut scene, a);
        assert_eq!(pool.advance(&mut scene).refreshed, 0);
    }

    #[test]
    fn attach_after_ready_is_ignored() {
        let (mut pool, _scene) = ready_pool(4);
        let created = pool.attach_parts(&[
            TemplatePart::new("a", GeometryHandle(1)),
            TemplatePart::new("b", GeometryHandle(2)),
        ]);
        assert_eq!(created, 0);
        assert_eq!(pool.channels().len(), 1);
    }

    #[test]
    fn reconfigure_only_grows() {
        let (mut pool, _scene) = ready_pool(4);
        assert_eq!(pool.reconfigure_capacity(2), Ok(false));
        assert_eq!(pool.capacity(), 4);
        assert_eq!(pool.reconfigure_capacity(10), Ok(true));
        assert_eq!(pool.capacity(), 10);
        assert_eq!(pool.primary_channel().unwrap().capacity(), 10);
        assert_eq!(pool.config().capacity, 10);
    }

    #[test]
    fn render_properties_reach_every_channel() {
        let (mut pool, _scene) = ready_pool(4);
        pool.apply_layers(RenderLayers::NONE.with_layer(2));
        pool.apply_culling(CullingSphere::new(Vec3::zeros(), 3.0));
        let channel = pool.primary_channel().unwrap();
        assert!(channel.layers().contains(2));
        assert_eq!(channel.culling().map(|c| c.radius), Some(3.0));

        pool.mark_uploaded();
        assert!(!pool.primary_channel().unwrap().needs_upload());
    }
}
