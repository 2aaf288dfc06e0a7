//! Fixed-capacity per-part instance storage.
//!
//! A [`Channel`] holds one transform slot and one color slot per instance
//! for a single template part. Slot `i` of every channel of a pool belongs
//! to the same member; only the pool mutates channels.

use std::ops::Range;

use bytemuck::{Pod, Zeroable};

use crate::color::Color;
use crate::math::{Mat4, Vec3, mat4_to_cols_array_2d};
use crate::template::{GeometryHandle, TemplatePart};

// ===== Render properties =====

/// Bounding sphere used for frustum culling of the whole instanced draw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CullingSphere {
    pub center: Vec3,
    pub radius: f32,
}

impl CullingSphere {
    /// Returns `None` for a non-positive radius, which disables culling.
    pub fn new(center: Vec3, radius: f32) -> Option<Self> {
        (radius > 0.0).then_some(Self { center, radius })
    }
}

/// Bitmask of render layers a channel is drawn on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderLayers(pub u32);

impl RenderLayers {
    pub const ALL: Self = Self(u32::MAX);
    pub const NONE: Self = Self(0);
    pub const MAX_LAYER: u32 = 31;

    #[must_use]
    pub fn with_layer(self, layer: u32) -> Self {
        if layer > Self::MAX_LAYER {
            return self;
        }
        Self(self.0 | (1 << layer))
    }

    pub fn contains(self, layer: u32) -> bool {
        layer <= Self::MAX_LAYER && self.0 & (1 << layer) != 0
    }

    /// Parses a comma-separated layer list such as `"0, 3,5"`.
    ///
    /// An empty list means every layer. Entries that are not a number in
    /// `0..=31` are skipped with a warning.
    pub fn parse(list: &str) -> Self {
        if list.trim().is_empty() {
            return Self::ALL;
        }
        let mut layers = Self::NONE;
        for entry in list.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            match entry.parse::<u32>() {
                Ok(layer) if layer <= Self::MAX_LAYER => layers = layers.with_layer(layer),
                _ => log::warn!("Ignoring invalid render layer '{entry}'"),
            }
        }
        layers
    }
}

impl Default for RenderLayers {
    fn default() -> Self {
        Self::ALL
    }
}

// ===== GPU layout =====

/// Per-instance data as laid out in the GPU instance buffer.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct InstanceRaw {
    /// Column-major model matrix.
    pub model: [[f32; 4]; 4],
    /// Linear RGBA color.
    pub color: [f32; 4],
}

impl InstanceRaw {
    pub const SIZE: usize = std::mem::size_of::<Self>();
}

// ===== Channel =====

/// Instance storage for one template part.
#[derive(Debug, Clone)]
pub struct Channel {
    label: String,
    geometry: GeometryHandle,
    draw_range: Option<Range<u32>>,
    material_index: usize,
    base_color: Color,
    static_offset: Mat4,
    transforms: Vec<Mat4>,
    colors: Vec<Color>,
    active_count: usize,
    culling: Option<CullingSphere>,
    layers: RenderLayers,
    needs_upload: bool,
}

impl Channel {
    /// Creates an empty channel for `part` with `capacity` slots.
    pub fn new(part: &TemplatePart, capacity: usize) -> Self {
        Self {
            label: part.label.clone(),
            geometry: part.geometry,
            draw_range: part.draw_range.clone(),
            material_index: part.material_index,
            base_color: part.color,
            static_offset: part.offset,
            transforms: vec![Mat4::identity(); capacity],
            colors: vec![part.color; capacity],
            active_count: 0,
            culling: None,
            layers: RenderLayers::ALL,
            needs_upload: true,
        }
    }

    /// Returns a channel of `new_capacity` slots carrying this channel's
    /// part description, render properties, active count and the slot data
    /// of `[0, min(active_count, new_capacity))`.
    pub fn grown(&self, new_capacity: usize) -> Self {
        let mut grown = Self {
            transforms: vec![Mat4::identity(); new_capacity],
            colors: vec![self.base_color; new_capacity],
            needs_upload: true,
            ..self.clone_description()
        };
        let keep = self.active_count.min(new_capacity);
        grown.transforms[..keep].copy_from_slice(&self.transforms[..keep]);
        grown.colors[..keep].copy_from_slice(&self.colors[..keep]);
        grown.active_count = keep;
        grown
    }

    fn clone_description(&self) -> Self {
        Self {
            label: self.label.clone(),
            geometry: self.geometry,
            draw_range: self.draw_range.clone(),
            material_index: self.material_index,
            base_color: self.base_color,
            static_offset: self.static_offset,
            transforms: Vec::new(),
            colors: Vec::new(),
            active_count: 0,
            culling: self.culling,
            layers: self.layers,
            needs_upload: true,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn geometry(&self) -> GeometryHandle {
        self.geometry
    }

    pub fn draw_range(&self) -> Option<Range<u32>> {
        self.draw_range.clone()
    }

    pub fn material_index(&self) -> usize {
        self.material_index
    }

    pub fn base_color(&self) -> Color {
        self.base_color
    }

    pub fn static_offset(&self) -> &Mat4 {
        &self.static_offset
    }

    pub fn capacity(&self) -> usize {
        self.transforms.len()
    }

    pub fn active_count(&self) -> usize {
        self.active_count
    }

    /// Sets the number of instances drawn.
    ///
    /// # Panics
    ///
    /// Panics if `count` exceeds the capacity.
    pub fn set_active_count(&mut self, count: usize) {
        assert!(
            count <= self.capacity(),
            "active count {count} exceeds channel capacity {}",
            self.capacity()
        );
        if self.active_count != count {
            self.active_count = count;
            self.needs_upload = true;
        }
    }

    pub fn transform(&self, slot: usize) -> &Mat4 {
        &self.transforms[slot]
    }

    pub fn color(&self, slot: usize) -> Color {
        self.colors[slot]
    }

    pub fn set_transform(&mut self, slot: usize, transform: Mat4) {
        self.transforms[slot] = transform;
        self.needs_upload = true;
    }

    pub fn set_color(&mut self, slot: usize, color: Color) {
        self.colors[slot] = color;
        self.needs_upload = true;
    }

    /// Copies the transform and color of slot `from` into slot `to`.
    pub fn copy_slot(&mut self, from: usize, to: usize) {
        if from == to {
            return;
        }
        self.transforms[to] = self.transforms[from];
        self.colors[to] = self.colors[from];
        self.needs_upload = true;
    }

    pub fn culling(&self) -> Option<CullingSphere> {
        self.culling
    }

    pub fn set_culling(&mut self, culling: Option<CullingSphere>) {
        self.culling = culling;
    }

    pub fn layers(&self) -> RenderLayers {
        self.layers
    }

    pub fn set_layers(&mut self, layers: RenderLayers) {
        self.layers = layers;
    }

    /// Whether slot data changed since the last [`mark_uploaded`](Self::mark_uploaded).
    pub fn needs_upload(&self) -> bool {
        self.needs_upload
    }

    pub fn mark_uploaded(&mut self) {
        self.needs_upload = false;
    }

    /// Packs the active range for upload.
    pub fn instance_data(&self) -> Vec<InstanceRaw> {
        self.transforms[..self.active_count]
            .iter()
            .zip(&self.colors[..self.active_count])
            .map(|(m, c)| InstanceRaw {
                model: mat4_to_cols_array_2d(m),
                color: c.to_array(),
            })
            .collect()
    }

    /// Appends the active range as raw bytes to `out`.
    pub fn write_instance_bytes(&self, out: &mut Vec<u8>) {
        let data = self.instance_data();
        out.extend_from_slice(bytemuck::cast_slice(&data));
    }
}
