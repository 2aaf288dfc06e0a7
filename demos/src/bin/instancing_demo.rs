//! # Instancing Demo
//!
//! Headless swarm of ships drawn through an instanced pool. Ships orbit the
//! origin while the demo hides, shows and replaces a few of them every
//! frame, logging what each pool tick did.
//!
//! ```text
//! cargo run --bin instancing_demo -- --members 500 --update-mode auto
//! RUST_LOG=debug cargo run --bin instancing_demo -- --config demos/instancing.toml
//! ```

use std::path::PathBuf;

use clap::Parser;
use redlilium_demos::Swarm;
use redlilium_instancing::{Color, CoordinateFrame, PoolConfig, UpdateMode};

/// Coordinate frame selection for CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum CliFrame {
    Local,
    World,
}

impl From<CliFrame> for CoordinateFrame {
    fn from(cli: CliFrame) -> Self {
        match cli {
            CliFrame::Local => CoordinateFrame::Local,
            CliFrame::World => CoordinateFrame::World,
        }
    }
}

/// Update mode selection for CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum CliUpdateMode {
    Manual,
    Auto,
}

impl From<CliUpdateMode> for UpdateMode {
    fn from(cli: CliUpdateMode) -> Self {
        match cli {
            CliUpdateMode::Manual => UpdateMode::Manual,
            CliUpdateMode::Auto => UpdateMode::Auto,
        }
    }
}

/// RedLilium instancing demo arguments.
#[derive(Parser, Debug)]
#[command(
    name = "RedLilium Instancing Demo",
    about = "Headless instanced swarm driven through a slot pool",
    version
)]
struct Args {
    /// Pool configuration file (TOML). Command line options override it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of ships to spawn.
    #[arg(long, default_value = "200")]
    members: usize,

    /// Number of frames to simulate.
    #[arg(long, default_value = "120")]
    frames: u64,

    /// Frame at which the template finishes loading.
    #[arg(long, default_value = "3")]
    load_frame: u64,

    /// Slots per channel.
    #[arg(long)]
    capacity: Option<usize>,

    /// Coordinate frame for instance transforms.
    #[arg(long, value_enum)]
    positioning: Option<CliFrame>,

    /// How often active ships are rewritten.
    #[arg(long, value_enum)]
    update_mode: Option<CliUpdateMode>,

    /// Comma-separated hex colors for every third ship, e.g. "#ff0000,#00f".
    #[arg(long, default_value = redlilium_demos::DEFAULT_PALETTE)]
    palette: String,

    /// Trace every pool request at debug level.
    #[arg(long)]
    debug: bool,
}

impl Args {
    fn pool_config(&self) -> PoolConfig {
        let mut config = match &self.config {
            Some(path) => PoolConfig::load_or_default(path),
            None => PoolConfig::default(),
        };
        if let Some(capacity) = self.capacity {
            config = config.with_capacity(capacity);
        }
        if let Some(frame) = self.positioning {
            config = config.with_coordinate_frame(frame.into());
        }
        if let Some(mode) = self.update_mode {
            config = config.with_update_mode(mode.into());
        }
        if self.debug {
            config = config.with_debug_logging(true);
        }
        config
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    log::info!("Starting RedLilium Instancing Demo");
    log::info!("Demos version: {}", redlilium_demos::VERSION);
    redlilium_instancing::init();

    let config = args.pool_config();
    if args.members > config.capacity {
        log::warn!(
            "{} ships requested but capacity is {}, the rest will be rejected",
            args.members,
            config.capacity
        );
    }

    let palette = Color::parse_list(&args.palette);
    let mut swarm = Swarm::with_palette(config, args.members, palette);
    let mut total_removed = 0;
    for _ in 0..args.frames {
        if swarm.frame() == args.load_frame {
            swarm.load_template();
        }
        let was_ready = swarm.pool.is_ready();
        let report = swarm.step();
        total_removed += report.removed;
        if !was_ready && swarm.pool.is_ready() {
            log::info!(
                "Frame {}: pool ready with {} ship(s)",
                swarm.frame(),
                swarm.pool.active_count()
            );
        }
        if report.removed > 0 {
            log::debug!(
                "Frame {}: removed {}, refreshed {}, active {}",
                swarm.frame(),
                report.removed,
                report.refreshed,
                swarm.pool.active_count()
            );
        }
    }

    let bytes: usize = swarm
        .pool
        .channels()
        .iter()
        .map(|channel| channel.instance_data().len() * redlilium_instancing::InstanceRaw::SIZE)
        .sum();
    let diagnostics = swarm.pool.diagnostics();
    log::info!(
        "Done after {} frames: {} active, {} removed, {} bytes of instance data",
        swarm.frame(),
        swarm.pool.active_count(),
        total_removed,
        bytes
    );
    log::info!("Diagnostics: {diagnostics:?}");
}
