use anyhow::Result;
use std::path::Path;
use tagnav_proto::Command;

use crate::{AudioConfig, PlayerDispatcher};

/// Every command must have a clip on disk before the player backend is used.
pub fn check_assets(cfg: &AudioConfig) -> Result<()> {
    if cfg.backend != "player" {
        return Ok(());
    }
    anyhow::ensure!(
        Path::new(&cfg.assets_dir).is_dir(),
        "audio.assets_dir {} not found",
        cfg.assets_dir
    );

    let player = PlayerDispatcher::new(cfg);
    let missing: Vec<String> = Command::ALL
        .iter()
        .map(|c| player.clip_path(*c))
        .filter(|p| !p.is_file())
        .map(|p| p.display().to_string())
        .collect();
    anyhow::ensure!(missing.is_empty(), "missing audio clips: {}", missing.join(", "));
    Ok(())
}
