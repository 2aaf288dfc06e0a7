//! Template mesh description and its decomposition into parts.
//!
//! The pool never touches vertex data. A template is described by the
//! geometry handles, material groups and node transforms a loader already
//! produced; [`TemplateMesh::parts`] only decides how many channels are
//! needed and what each one draws.

use std::ops::Range;

use crate::color::Color;
use crate::math::{Mat4, inverse_or_identity};

/// Opaque reference to geometry owned by the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GeometryHandle(pub u32);

/// Index range of a geometry drawn with one material.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeometryGroup {
    pub range: Range<u32>,
    pub material_index: usize,
}

impl GeometryGroup {
    pub fn new(range: Range<u32>, material_index: usize) -> Self {
        Self {
            range,
            material_index,
        }
    }
}

/// A mesh node of the loaded template model.
#[derive(Debug, Clone)]
pub struct TemplateNode {
    pub label: String,
    pub geometry: GeometryHandle,
    pub groups: Vec<GeometryGroup>,
    /// Base colors of the node's materials, indexed by material index.
    pub materials: Vec<Color>,
    /// World transform of the node inside the loaded model.
    pub world: Mat4,
}

impl TemplateNode {
    pub fn new(label: impl Into<String>, geometry: GeometryHandle) -> Self {
        Self {
            label: label.into(),
            geometry,
            groups: Vec::new(),
            materials: vec![Color::WHITE],
            world: Mat4::identity(),
        }
    }

    #[must_use]
    pub fn with_group(mut self, group: GeometryGroup) -> Self {
        self.groups.push(group);
        self
    }

    #[must_use]
    pub fn with_materials(mut self, materials: Vec<Color>) -> Self {
        self.materials = materials;
        self
    }

    #[must_use]
    pub fn with_world(mut self, world: Mat4) -> Self {
        self.world = world;
        self
    }

    fn material_color(&self, index: usize) -> Color {
        self.materials
            .get(index)
            .or_else(|| self.materials.first())
            .copied()
            .unwrap_or(Color::WHITE)
    }
}

/// A loaded model used as the instancing template.
#[derive(Debug, Clone)]
pub struct TemplateMesh {
    pub name: String,
    /// World transform of the model root.
    pub root: Mat4,
    pub nodes: Vec<TemplateNode>,
}

/// One renderable part of a template. Each part gets its own channel.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplatePart {
    pub label: String,
    pub geometry: GeometryHandle,
    /// Index range to draw, `None` for the whole geometry.
    pub draw_range: Option<Range<u32>>,
    pub material_index: usize,
    /// Transform of the part relative to the template root.
    pub offset: Mat4,
    pub color: Color,
}

impl TemplatePart {
    /// A single undecomposed part with identity offset.
    pub fn new(label: impl Into<String>, geometry: GeometryHandle) -> Self {
        Self {
            label: label.into(),
            geometry,
            draw_range: None,
            material_index: 0,
            offset: Mat4::identity(),
            color: Color::WHITE,
        }
    }

    #[must_use]
    pub fn with_offset(mut self, offset: Mat4) -> Self {
        self.offset = offset;
        self
    }

    #[must_use]
    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    #[must_use]
    pub fn with_material_index(mut self, index: usize) -> Self {
        self.material_index = index;
        self
    }
}

impl TemplateMesh {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            root: Mat4::identity(),
            nodes: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_root(mut self, root: Mat4) -> Self {
        self.root = root;
        self
    }

    #[must_use]
    pub fn with_node(mut self, node: TemplateNode) -> Self {
        self.nodes.push(node);
        self
    }

    /// Splits the template into renderable parts in node order.
    ///
    /// With `decompose` set, a node with more than one material group yields
    /// one part per group, ordered by the first appearance of each material
    /// index. Otherwise every node yields a single part drawn with material 0.
    pub fn parts(&self, decompose: bool) -> Vec<TemplatePart> {
        let (root_inverse, invertible) = inverse_or_identity(&self.root);
        if !invertible {
            log::warn!(
                "Template '{}' root transform is not invertible, using identity",
                self.name
            );
        }

        let mut parts = Vec::new();
        for node in &self.nodes {
            let offset = root_inverse * node.world;

            if decompose && node.groups.len() > 1 {
                let mut order: Vec<usize> = Vec::new();
                for group in &node.groups {
                    if !order.contains(&group.material_index) {
                        order.push(group.material_index);
                    }
                }
                for index in order {
                    for group in node.groups.iter().filter(|g| g.material_index == index) {
                        parts.push(TemplatePart {
                            label: format!("{}:{}", node.label, index),
                            geometry: node.geometry,
                            draw_range: Some(group.range.clone()),
                            material_index: index,
                            offset,
                            color: node.material_color(index),
                        });
                    }
                }
            } else {
                parts.push(TemplatePart {
                    label: node.label.clone(),
                    geometry: node.geometry,
                    draw_range: None,
                    material_index: 0,
                    offset,
                    color: node.material_color(0),
                });
            }
        }

        log::debug!(
            "Template '{}' split into {} part(s) (decompose: {})",
            self.name,
            parts.len(),
            decompose
        );
        parts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{Transform, Vec3, mat4_approx_eq};

    fn two_material_node() -> TemplateNode {
        TemplateNode::new("hull", GeometryHandle(1))
            .with_group(GeometryGroup::new(0..30, 1))
            .with_group(GeometryGroup::new(30..60, 0))
            .with_group(GeometryGroup::new(60..90, 1))
            .with_materials(vec![Color::RED, Color::BLUE])
    }

    #[test]
    fn decompose_groups_by_material_in_first_seen_order() {
        let mesh = TemplateMesh::new("ship").with_node(two_material_node());
        let parts = mesh.parts(true);

        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0].material_index, 1);
        assert_eq!(parts[0].draw_range, Some(0..30));
        assert_eq!(parts[1].material_index, 1);
        assert_eq!(parts[1].draw_range, Some(60..90));
        assert_eq!(parts[2].material_index, 0);
        assert_eq!(parts[2].color, Color::RED);
        assert_eq!(parts[0].color, Color::BLUE);
    }

    #[test]
    fn no_decompose_yields_single_part() {
        let mesh = TemplateMesh::new("ship").with_node(two_material_node());
        let parts = mesh.parts(false);

        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].material_index, 0);
        assert_eq!(parts[0].draw_range, None);
        assert_eq!(parts[0].color, Color::RED);
    }

    #[test]
    fn single_group_is_not_split() {
        let node = TemplateNode::new("rock", GeometryHandle(2))
            .with_group(GeometryGroup::new(0..12, 0));
        let parts = TemplateMesh::new("rock").with_node(node).parts(true);
        assert_eq!(parts.len(), 1);
    }

    #[test]
    fn part_offset_is_relative_to_root() {
        let root = Transform::from_translation(Vec3::new(10.0, 0.0, 0.0)).to_matrix();
        let world = Transform::from_translation(Vec3::new(12.0, 1.0, 0.0)).to_matrix();
        let node = TemplateNode::new("turret", GeometryHandle(3)).with_world(world);
        let parts = TemplateMesh::new("ship")
            .with_root(root)
            .with_node(node)
            .parts(true);

        let expected = Transform::from_translation(Vec3::new(2.0, 1.0, 0.0)).to_matrix();
        assert!(mat4_approx_eq(&parts[0].offset, &expected, 1e-5));
    }

    #[test]
    fn missing_material_color_falls_back_to_first() {
        let node = TemplateNode::new("hull", GeometryHandle(1))
            .with_group(GeometryGroup::new(0..3, 0))
            .with_group(GeometryGroup::new(3..6, 5))
            .with_materials(vec![Color::GREEN]);
        let parts = TemplateMesh::new("m").with_node(node).parts(true);
        assert_eq!(parts[1].material_index, 5);
        assert_eq!(parts[1].color, Color::GREEN);
    }
}
