//! Composition of member transforms and colors into channel slots.

use crate::channel::Channel;
use crate::color::Color;
use crate::config::CoordinateFrame;
use crate::host::MemberHost;
use crate::math::{Mat4, inverse_or_identity};
use crate::member::MemberId;

/// Freshness of the matrices read from the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fidelity {
    /// Recompute member matrices and the container inverse before reading.
    /// Used for one-off adds and modifications.
    Manual,
    /// Read cached matrices and the inverse refreshed at the start of the
    /// tick. Used when every member is rewritten each frame.
    Auto,
}

impl Fidelity {
    fn refresh(self) -> bool {
        matches!(self, Self::Manual)
    }
}

/// Computes slot transforms and colors for one pool.
///
/// Local frame: `local * static_offset`.
/// World frame: `parent_inverse * world * static_offset`, where
/// `parent_inverse` is the inverse of the container's world transform.
#[derive(Debug, Clone)]
pub struct TransformComposer {
    frame: CoordinateFrame,
    parent_inverse: Mat4,
}

impl TransformComposer {
    pub fn new(frame: CoordinateFrame) -> Self {
        Self {
            frame,
            parent_inverse: Mat4::identity(),
        }
    }

    pub fn frame(&self) -> CoordinateFrame {
        self.frame
    }

    /// The cached container inverse. Only meaningful in the world frame.
    pub fn parent_inverse(&self) -> &Mat4 {
        &self.parent_inverse
    }

    /// Recomputes the container inverse. Does nothing in the local frame.
    pub fn refresh_parent_inverse<H: MemberHost + ?Sized>(&mut self, host: &mut H) {
        if self.frame != CoordinateFrame::World {
            return;
        }
        let container = host.container_world_matrix(true);
        let (inverse, invertible) = inverse_or_identity(&container);
        if !invertible {
            log::warn!("Container world transform is not invertible, using identity");
        }
        self.parent_inverse = inverse;
    }

    /// Member transform in the pool's frame, before the per-channel offset.
    ///
    /// Unknown members yield identity with a warning.
    pub fn member_matrix<H: MemberHost + ?Sized>(
        &mut self,
        host: &mut H,
        member: MemberId,
        fidelity: Fidelity,
    ) -> Mat4 {
        let refresh = fidelity.refresh();
        let matrix = match self.frame {
            CoordinateFrame::Local => host.local_matrix(member, refresh),
            CoordinateFrame::World => {
                if refresh {
                    self.refresh_parent_inverse(host);
                }
                host.world_matrix(member, refresh)
                    .map(|world| self.parent_inverse * world)
            }
        };
        matrix.unwrap_or_else(|| {
            log::warn!("Member {member} is unknown to the host, writing identity");
            Mat4::identity()
        })
    }

    /// Writes the member's transform into `slot` of every channel.
    pub fn write_transforms<H: MemberHost + ?Sized>(
        &mut self,
        host: &mut H,
        member: MemberId,
        slot: usize,
        channels: &mut [Channel],
        fidelity: Fidelity,
    ) {
        let matrix = self.member_matrix(host, member, fidelity);
        for channel in channels.iter_mut() {
            let composed = matrix * channel.static_offset();
            channel.set_transform(slot, composed);
        }
    }

    /// Writes the member's resolved color into `slot` of every channel.
    pub fn write_colors<H: MemberHost + ?Sized>(
        &self,
        host: &H,
        member: MemberId,
        slot: usize,
        channels: &mut [Channel],
    ) {
        let colors = host.member_colors(member);
        for channel in channels.iter_mut() {
            let color = resolve_color(colors, channel);
            channel.set_color(slot, color);
        }
    }
}

/// Picks the slot color for a channel.
///
/// Explicit member colors win. A single member color applies to every
/// channel; with several, the channel's material index selects one (index 0
/// for undecomposed channels). Without member colors, or when a multi-color
/// list is too short for the index, the part's own color is used.
pub fn resolve_color(member_colors: &[Color], channel: &Channel) -> Color {
    match member_colors {
        [] => channel.base_color(),
        [single] => *single,
        many => many
            .get(channel.material_index())
            .copied()
            .unwrap_or_else(|| channel.base_color()),
    }
}
