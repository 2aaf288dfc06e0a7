//! Tracks the resources a pool waits for before it can become ready.

/// Open once the template mesh is loaded and every expected texture has
/// arrived.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadinessGate {
    mesh_loaded: bool,
    textures_expected: usize,
    textures_loaded: usize,
}

impl ReadinessGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_mesh_loaded(&mut self) {
        self.mesh_loaded = true;
    }

    /// Adds `count` textures to wait for.
    pub fn expect_textures(&mut self, count: usize) {
        self.textures_expected += count;
    }

    pub fn texture_loaded(&mut self) {
        self.textures_loaded += 1;
        if self.textures_loaded > self.textures_expected {
            log::warn!(
                "Texture loaded beyond expectation ({} of {})",
                self.textures_loaded,
                self.textures_expected
            );
        }
    }

    pub fn textures_outstanding(&self) -> usize {
        self.textures_expected.saturating_sub(self.textures_loaded)
    }

    pub fn is_open(&self) -> bool {
        self.mesh_loaded && self.textures_outstanding() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opens_after_mesh_and_textures() {
        let mut gate = ReadinessGate::new();
        assert!(!gate.is_open());

        gate.expect_textures(2);
        gate.mark_mesh_loaded();
        assert!(!gate.is_open());
        assert_eq!(gate.textures_outstanding(), 2);

        gate.texture_loaded();
        gate.texture_loaded();
        assert!(gate.is_open());
    }

    #[test]
    fn no_textures_needed() {
        let mut gate = ReadinessGate::new();
        gate.mark_mesh_loaded();
        assert!(gate.is_open());
    }
}
