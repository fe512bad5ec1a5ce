//! Command-line surface.

use crate::app::BackendKind;
use clap::{Parser, Subcommand};
use shaker_config::{ConfigResult, PlaybackMode, ShakerConfig, ShakerMode};
use shaker_synth::ToneSide;
use std::net::IpAddr;
use std::path::PathBuf;

/// Config file used when `--config` is not given.
pub const DEFAULT_CONFIG_PATH: &str = "shaker.json";

/// `shakerd` arguments. Flags override values from the config file.
#[derive(Parser, Debug)]
#[command(name = "shakerd")]
#[command(about = "Drive a dual shaker rig from Gran Turismo 7 telemetry")]
#[command(version)]
pub struct Cli {
    /// JSON configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Console IP address to send heartbeats to
    #[arg(long, global = true)]
    pub console_ip: Option<IpAddr>,

    /// Replay mode: keep playing while paused or off track
    #[arg(long, global = true)]
    pub replay: bool,

    /// Downmix both layers to a single shaker
    #[arg(long, global = true)]
    pub mono: bool,

    /// Output device name
    #[arg(long, global = true)]
    pub device: Option<String>,

    /// Output sample rate (Hz)
    #[arg(long, global = true)]
    pub sample_rate: Option<u32>,

    /// Frames per audio buffer
    #[arg(long, global = true)]
    pub buffer_size: Option<u32>,

    /// Audio backend
    #[arg(long, global = true, value_enum, default_value_t = BackendKind::default())]
    pub backend: BackendKind,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Subcommands.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run the shaker pipeline until interrupted (default)
    Run,
    /// Play a short tone to check which shaker each channel drives
    TestTone {
        /// Channel to play on: rear, front or both
        #[arg(long, default_value = "both")]
        side: ToneSide,
    },
}

impl Cli {
    /// Selected subcommand, defaulting to [`Command::Run`].
    #[must_use]
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Run)
    }

    /// Load the config file (or defaults when it does not exist), apply
    /// flag overrides and validate the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or the final
    /// configuration is invalid.
    pub fn resolve_config(&self) -> ConfigResult<ShakerConfig> {
        let path = self
            .config
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
        let mut config = ShakerConfig::load_or_default(&path)?;
        self.apply_overrides(&mut config);
        config.validate()?;
        Ok(config)
    }

    /// Apply flag overrides to `config`.
    pub fn apply_overrides(&self, config: &mut ShakerConfig) {
        if let Some(ip) = self.console_ip {
            config.network.console_ip = ip;
        }
        if self.replay {
            config.playback_mode = PlaybackMode::Replay;
        }
        if self.mono {
            config.shaker_mode = ShakerMode::Single;
        }
        if let Some(device) = &self.device {
            config.audio.device = Some(device.clone());
        }
        if let Some(rate) = self.sample_rate {
            config.audio.sample_rate = rate;
        }
        if let Some(size) = self.buffer_size {
            config.audio.buffer_size = size;
        }
    }
}
