//! Math type aliases and the transform helpers used by the composer.
//!
//! All rendering math is f32 and column-major, matching what the GPU
//! consumes from an instance buffer.

pub use nalgebra;

// ===== Type aliases =====

/// 3D vector (f32).
pub type Vec3 = nalgebra::Vector3<f32>;

/// 4x4 matrix (f32).
pub type Mat4 = nalgebra::Matrix4<f32>;

/// Quaternion (f32). Stored as `[x, y, z, w]` in memory.
pub type Quat = nalgebra::Quaternion<f32>;

// ===== Transform =====

/// Translation, rotation and scale of a single node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Transform {
    /// Transform that leaves points unchanged.
    pub fn identity() -> Self {
        Self {
            translation: Vec3::zeros(),
            rotation: Quat::identity(),
            scale: Vec3::new(1.0, 1.0, 1.0),
        }
    }

    /// Pure translation.
    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Self::identity()
        }
    }

    #[must_use]
    pub fn with_translation(mut self, translation: Vec3) -> Self {
        self.translation = translation;
        self
    }

    #[must_use]
    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    #[must_use]
    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    /// Homogeneous matrix applying scale, then rotation, then translation.
    pub fn to_matrix(&self) -> Mat4 {
        compose_trs(self.translation, self.rotation, self.scale)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

// ===== Helper functions =====

/// Build a TRS matrix. The rotation is normalized first so that slightly
/// drifted quaternions from animation do not shear the result.
pub fn compose_trs(translation: Vec3, rotation: Quat, scale: Vec3) -> Mat4 {
    let rotation = nalgebra::UnitQuaternion::from_quaternion(rotation);
    let mut m = rotation.to_homogeneous();
    for (col, s) in [scale.x, scale.y, scale.z].into_iter().enumerate() {
        for row in 0..3 {
            m[(row, col)] *= s;
        }
    }
    m[(0, 3)] = translation.x;
    m[(1, 3)] = translation.y;
    m[(2, 3)] = translation.z;
    m
}

/// Quaternion rotating `angle` radians around the Y axis.
pub fn quat_from_rotation_y(angle: f32) -> Quat {
    *nalgebra::UnitQuaternion::from_axis_angle(&Vec3::y_axis(), angle).quaternion()
}

/// Inverse of `m`, or identity when `m` is singular.
///
/// The flag is `false` when the fallback was taken so the caller can
/// report it.
pub fn inverse_or_identity(m: &Mat4) -> (Mat4, bool) {
    match m.try_inverse() {
        Some(inv) => (inv, true),
        None => (Mat4::identity(), false),
    }
}

/// Column-major `[[f32; 4]; 4]` for GPU upload.
pub fn mat4_to_cols_array_2d(m: &Mat4) -> [[f32; 4]; 4] {
    let mut cols = [[0.0; 4]; 4];
    for (c, col) in cols.iter_mut().enumerate() {
        for (r, v) in col.iter_mut().enumerate() {
            *v = m[(r, c)];
        }
    }
    cols
}

/// Element-wise comparison with an absolute tolerance.
pub fn mat4_approx_eq(a: &Mat4, b: &Mat4, epsilon: f32) -> bool {
    (a - b).norm() < epsilon
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_transform_is_identity_matrix() {
        assert!(mat4_approx_eq(
            &Transform::identity().to_matrix(),
            &Mat4::identity(),
            1e-6
        ));
    }

    #[test]
    fn trs_applies_scale_then_rotation_then_translation() {
        let t = Transform::from_translation(Vec3::new(1.0, 2.0, 3.0))
            .with_rotation(quat_from_rotation_y(std::f32::consts::FRAC_PI_2))
            .with_scale(Vec3::new(2.0, 2.0, 2.0));
        let p = t.to_matrix().transform_point(&nalgebra::Point3::new(1.0, 0.0, 0.0));
        // x scaled to 2, rotated onto -z, then translated
        assert!((p.x - 1.0).abs() < 1e-5);
        assert!((p.y - 2.0).abs() < 1e-5);
        assert!((p.z - 1.0).abs() < 1e-5);
    }

    #[test]
    fn singular_inverse_falls_back_to_identity() {
        let (inv, ok) = inverse_or_identity(&Mat4::zeros());
        assert!(!ok);
        assert_eq!(inv, Mat4::identity());

        let m = Transform::from_translation(Vec3::new(4.0, 0.0, 0.0)).to_matrix();
        let (inv, ok) = inverse_or_identity(&m);
        assert!(ok);
        assert!(mat4_approx_eq(&(m * inv), &Mat4::identity(), 1e-6));
    }

    #[test]
    fn cols_array_is_column_major() {
        let m = Transform::from_translation(Vec3::new(5.0, 6.0, 7.0)).to_matrix();
        let cols = mat4_to_cols_array_2d(&m);
        assert_eq!(cols[3], [5.0, 6.0, 7.0, 1.0]);
        assert_eq!(cols[0], [1.0, 0.0, 0.0, 0.0]);
    }
}
