//! Pool configuration.
//!
//! A [`PoolConfig`] is normally built in code with the `with_*` methods, or
//! loaded from a TOML file such as:
//!
//! ```toml
//! capacity = 250
//! positioning = "world"
//! update_mode = "auto"
//! decompose = true
//! debug = false
//! culling_radius = 20.0
//! culling_center = [0.0, 1.0, 0.0]
//! layers = "0, 2"
//! ```
//!
//! Unknown enum values never fail the load: they are reported with a
//! warning and replaced by the default.

use std::path::Path;

use serde::Deserialize;

use crate::channel::{CullingSphere, RenderLayers};
use crate::error::ConfigError;
use crate::math::Vec3;

/// Frame in which member transforms are written into the channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CoordinateFrame {
    /// Member local transforms, for members parented under the pool.
    #[default]
    Local,
    /// Member world transforms re-expressed relative to the pool container.
    World,
}

impl CoordinateFrame {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "local" => Some(Self::Local),
            "world" => Some(Self::World),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::World => "world",
        }
    }
}

/// How often active members are rewritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpdateMode {
    /// Slots are written only when a member reports a change.
    #[default]
    Manual,
    /// Every active member is recomposed on every tick.
    Auto,
}

impl UpdateMode {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "manual" => Some(Self::Manual),
            "auto" => Some(Self::Auto),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Auto => "auto",
        }
    }
}

/// Configuration of an [`InstancedPool`](crate::InstancedPool).
#[derive(Debug, Clone, PartialEq)]
pub struct PoolConfig {
    /// Slots per channel.
    pub capacity: usize,
    pub coordinate_frame: CoordinateFrame,
    pub update_mode: UpdateMode,
    /// Split multi-material template nodes into one channel per material.
    pub decompose_by_material: bool,
    /// Trace every request at debug level.
    pub debug_logging: bool,
    pub culling: Option<CullingSphere>,
    pub layers: RenderLayers,
}

impl PoolConfig {
    pub const DEFAULT_CAPACITY: usize = 100;

    #[must_use]
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    #[must_use]
    pub fn with_coordinate_frame(mut self, frame: CoordinateFrame) -> Self {
        self.coordinate_frame = frame;
        self
    }

    #[must_use]
    pub fn with_update_mode(mut self, mode: UpdateMode) -> Self {
        self.update_mode = mode;
        self
    }

    #[must_use]
    pub fn with_decompose_by_material(mut self, decompose: bool) -> Self {
        self.decompose_by_material = decompose;
        self
    }

    #[must_use]
    pub fn with_debug_logging(mut self, debug: bool) -> Self {
        self.debug_logging = debug;
        self
    }

    #[must_use]
    pub fn with_culling(mut self, culling: Option<CullingSphere>) -> Self {
        self.culling = culling;
        self
    }

    #[must_use]
    pub fn with_layers(mut self, layers: RenderLayers) -> Self {
        self.layers = layers;
        self
    }

    /// Parses a configuration from TOML text.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let file: PoolConfigFile = toml::from_str(text)?;
        Ok(file.resolve())
    }

    /// Loads a configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    /// Loads a configuration, falling back to defaults if the file is
    /// missing or malformed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => {
                log::info!(
                    "Loaded pool config {}: capacity {}, {} frame, {} updates",
                    path.display(),
                    config.capacity,
                    config.coordinate_frame.as_str(),
                    config.update_mode.as_str()
                );
                config
            }
            Err(e) => {
                log::warn!("No usable pool config at {} ({e}), using defaults", path.display());
                Self::default()
            }
        }
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            capacity: Self::DEFAULT_CAPACITY,
            coordinate_frame: CoordinateFrame::Local,
            update_mode: UpdateMode::Manual,
            decompose_by_material: true,
            debug_logging: false,
            culling: None,
            layers: RenderLayers::ALL,
        }
    }
}

/// On-disk form of [`PoolConfig`]. Enum-like values stay strings here so a
/// typo degrades to a default instead of rejecting the whole file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct PoolConfigFile {
    capacity: usize,
    positioning: String,
    update_mode: String,
    decompose: bool,
    debug: bool,
    culling_radius: f32,
    culling_center: [f32; 3],
    layers: String,
}

impl Default for PoolConfigFile {
    fn default() -> Self {
        Self {
            capacity: PoolConfig::DEFAULT_CAPACITY,
            positioning: "local".into(),
            update_mode: "manual".into(),
            decompose: true,
            debug: false,
            culling_radius: 0.0,
            culling_center: [0.0; 3],
            layers: String::new(),
        }
    }
}

impl PoolConfigFile {
    fn resolve(self) -> PoolConfig {
        let coordinate_frame = CoordinateFrame::from_name(&self.positioning).unwrap_or_else(|| {
            log::warn!(
                "Unknown positioning '{}', falling back to local",
                self.positioning
            );
            CoordinateFrame::Local
        });
        let update_mode = UpdateMode::from_name(&self.update_mode).unwrap_or_else(|| {
            log::warn!(
                "Unknown update mode '{}', falling back to manual",
                self.update_mode
            );
            UpdateMode::Manual
        });
        let [x, y, z] = self.culling_center;

        PoolConfig {
            capacity: self.capacity,
            coordinate_frame,
            update_mode,
            decompose_by_material: self.decompose,
            debug_logging: self.debug,
            culling: CullingSphere::new(Vec3::new(x, y, z), self.culling_radius),
            layers: RenderLayers::parse(&self.layers),
        }
    }
}
