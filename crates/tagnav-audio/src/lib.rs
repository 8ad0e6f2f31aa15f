pub mod doctor;
pub mod player;

use anyhow::Result;
use serde::Deserialize;
use tagnav_proto::Command;
use tracing::info;

pub use player::PlayerDispatcher;

/// Sink for guidance commands.
///
/// Fire-and-forget: a new command may cut off the one still playing, and
/// nothing is queued.
pub trait CommandDispatcher: Send {
    fn dispatch(&mut self, cmd: Command) -> Result<()>;
}

#[derive(Debug, Clone, Deserialize)]
pub struct AudioConfig {
    /// "player" | "log"
    #[serde(default = "default_backend")]
    pub backend: String,

    /// External program invoked as `<player> <player_args..> <clip>`.
    #[serde(default = "default_player")]
    pub player: String,
    #[serde(default = "default_player_args")]
    pub player_args: Vec<String>,

    /// Directory holding one pre-rendered clip per command (`<clip>.<extension>`).
    #[serde(default = "default_assets_dir")]
    pub assets_dir: String,
    #[serde(default = "default_extension")]
    pub extension: String,
}

fn default_backend() -> String { "player".into() }
fn default_player() -> String { "mpg123".into() }
fn default_player_args() -> Vec<String> { vec!["-q".into()] }
fn default_assets_dir() -> String { "audio_assets".into() }
fn default_extension() -> String { "mp3".into() }

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            player: default_player(),
            player_args: default_player_args(),
            assets_dir: default_assets_dir(),
            extension: default_extension(),
        }
    }
}

/// Speaks nothing; logs the phrase. Handy on a bench without speakers.
#[derive(Debug, Default)]
pub struct LogDispatcher;

impl CommandDispatcher for LogDispatcher {
    fn dispatch(&mut self, cmd: Command) -> Result<()> {
        info!("say: {} ({:?})", cmd, cmd.phrase());
        Ok(())
    }
}

pub fn from_config(cfg: &AudioConfig) -> Result<Box<dyn CommandDispatcher>> {
    match cfg.backend.as_str() {
        "player" => Ok(Box::new(PlayerDispatcher::new(cfg))),
        "log" => Ok(Box::new(LogDispatcher)),
        other => anyhow::bail!("unknown audio.backend: {}", other),
    }
}
