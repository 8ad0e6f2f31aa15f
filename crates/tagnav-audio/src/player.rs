use anyhow::{Context, Result};
use std::path::PathBuf;
use std::process::Stdio;
use tagnav_proto::Command;
use tokio::process::{Child, Command as Process};
use tracing::debug;

use crate::{AudioConfig, CommandDispatcher};

/// Plays pre-rendered clips through an external player process.
///
/// Only one clip plays at a time; dispatching kills whatever is still
/// running. Must be used inside a tokio runtime.
pub struct PlayerDispatcher {
    player: String,
    args: Vec<String>,
    assets_dir: PathBuf,
    extension: String,
    current: Option<Child>,
}

impl PlayerDispatcher {
    pub fn new(cfg: &AudioConfig) -> Self {
        Self {
            player: cfg.player.clone(),
            args: cfg.player_args.clone(),
            assets_dir: PathBuf::from(&cfg.assets_dir),
            extension: cfg.extension.clone(),
            current: None,
        }
    }

    pub fn clip_path(&self, cmd: Command) -> PathBuf {
        self.assets_dir.join(format!("{}.{}", cmd.clip(), self.extension))
    }

    fn preempt(&mut self) {
        if let Some(mut child) = self.current.take() {
            if let Ok(None) = child.try_wait() {
                debug!("audio: cutting off previous clip");
                // Reaped by the runtime after the kill lands.
                let _ = child.start_kill();
            }
        }
    }
}

impl CommandDispatcher for PlayerDispatcher {
    fn dispatch(&mut self, cmd: Command) -> Result<()> {
        self.preempt();
        let clip = self.clip_path(cmd);
        debug!("audio: {} -> {}", cmd, clip.display());

        let child = Process::new(&self.player)
            .args(&self.args)
            .arg(&clip)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("spawn {} for {}", self.player, clip.display()))?;
        self.current = Some(child);
        Ok(())
    }
}
