use anyhow::{Context, Result};
use clap::Parser;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

#[derive(Parser, Debug, Clone)]
#[command(name = "snakebit")]
#[command(about = "Terminal multiplayer snake with roaming bits and exploding bites")]
pub(crate) struct Cli {
    /// Number of players sharing the keyboard (1 or 2)
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=2))]
    pub(crate) players: Option<u8>,

    /// Player name; repeat once per player. Unknown names get a fresh profile.
    #[arg(long = "name")]
    pub(crate) names: Vec<String>,

    /// RNG seed (0 picks one from entropy)
    #[arg(long)]
    pub(crate) seed: Option<u64>,

    /// Map width in cells
    #[arg(long)]
    pub(crate) width: Option<i32>,

    /// Map height in cells
    #[arg(long)]
    pub(crate) height: Option<i32>,

    /// Log file (defaults to the data directory)
    #[arg(long)]
    pub(crate) log: Option<PathBuf>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub(crate) struct Settings {
    pub(crate) map_width: i32,
    pub(crate) map_height: i32,
    pub(crate) seed: u64,
    pub(crate) player_names: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            map_width: 100,
            map_height: 35,
            seed: 0,
            player_names: vec!["Player 1".to_string(), "Player 2".to_string()],
        }
    }
}

impl Settings {
    /// Folds command-line overrides in; returns the roster for this run.
    pub(crate) fn apply_cli(&mut self, cli: &Cli) -> Vec<String> {
        if let Some(seed) = cli.seed {
            self.seed = seed;
        }
        if let Some(w) = cli.width {
            self.map_width = w.clamp(20, 400);
        }
        if let Some(h) = cli.height {
            self.map_height = h.clamp(12, 200);
        }
        for (i, name) in cli.names.iter().enumerate() {
            let name = name.trim();
            if name.is_empty() {
                continue;
            }
            if i < self.player_names.len() {
                self.player_names[i] = name.to_string();
            } else {
                self.player_names.push(name.to_string());
            }
        }
        let count = cli
            .players
            .map(usize::from)
            .unwrap_or_else(|| cli.names.len().clamp(1, 2));
        while self.player_names.len() < count {
            self.player_names
                .push(format!("Player {}", self.player_names.len() + 1));
        }
        self.player_names.iter().take(count).cloned().collect()
    }
}

/// Timing and scoring constants for a round.
#[derive(Clone, Debug)]
pub(crate) struct Rules {
    pub(crate) tick_horizontal: Duration,
    pub(crate) tick_vertical: Duration,
    pub(crate) bit_points: u32,
    pub(crate) dropped_bit_points: u32,
    pub(crate) bite_points: u32,
    pub(crate) bite_growth: usize,
    pub(crate) initial_bits: usize,
    pub(crate) top_up_per_wave: usize,
    pub(crate) top_up_max: usize,
    pub(crate) top_up_every: Duration,
    pub(crate) line_every: Duration,
    pub(crate) line_len: (usize, usize),
    pub(crate) line_h_spacing: i32,
    pub(crate) roam_every: Duration,
    pub(crate) hazard_per_wave: usize,
    pub(crate) hazard_max: usize,
    pub(crate) hazard_every: Duration,
    pub(crate) arming: Duration,
    pub(crate) walker_step: Duration,
    pub(crate) blast_hold: Duration,
    pub(crate) wall_pass: Duration,
    pub(crate) level_thresholds: Vec<u32>,
    pub(crate) max_high_scores: usize,
}

impl Default for Rules {
    fn default() -> Self {
        Self {
            tick_horizontal: Duration::from_millis(80),
            tick_vertical: Duration::from_millis(140),
            bit_points: 10,
            dropped_bit_points: 10,
            bite_points: 50,
            bite_growth: 4,
            initial_bits: 5,
            top_up_per_wave: 2,
            top_up_max: 10,
            top_up_every: Duration::from_secs(3),
            line_every: Duration::from_secs(15),
            line_len: (2, 7),
            line_h_spacing: 2,
            roam_every: Duration::from_millis(500),
            hazard_per_wave: 1,
            hazard_max: 3,
            hazard_every: Duration::from_secs(20),
            arming: Duration::from_millis(500),
            walker_step: Duration::from_millis(30),
            blast_hold: Duration::from_secs(10),
            wall_pass: Duration::from_secs(3),
            level_thresholds: vec![20, 40, 60, 80, 100],
            max_high_scores: 5,
        }
    }
}

impl Rules {
    /// Vertical steps wait longer: terminal cells are taller than wide.
    /// Higher speeds divide the wait.
    pub(crate) fn move_interval(&self, vertical: bool, speed: u32) -> Duration {
        let base = if vertical {
            self.tick_vertical
        } else {
            self.tick_horizontal
        };
        base / speed.max(1)
    }
}

pub(crate) struct Paths {
    pub(crate) settings_path: PathBuf,
    pub(crate) scores_path: PathBuf,
    pub(crate) profiles_path: PathBuf,
    pub(crate) log_path: PathBuf,
}

pub(crate) fn project_paths() -> Result<Paths> {
    let proj = ProjectDirs::from("com", "snakebit", "Snakebit")
        .context("could not resolve project directories")?;
    let dir = proj.data_local_dir().to_path_buf();
    fs::create_dir_all(&dir)
        .with_context(|| format!("creating data directory {}", dir.display()))?;
    Ok(Paths {
        settings_path: dir.join("settings.json"),
        scores_path: dir.join("scores.json"),
        profiles_path: dir.join("profiles.json"),
        log_path: dir.join("snakebit.log"),
    })
}

pub(crate) fn load_settings(path: &Path) -> Settings {
    if let Ok(s) = fs::read_to_string(path) {
        match serde_json::from_str::<Settings>(&s) {
            Ok(v) => return v,
            Err(e) => tracing::warn!(path = %path.display(), "ignoring unreadable settings: {e}"),
        }
    }
    Settings::default()
}

pub(crate) fn save_settings_atomic(path: &Path, s: &Settings) -> Result<()> {
    write_json_atomic(path, s)
}

pub(crate) fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let tmp = path.with_extension("json.tmp");
    let data = serde_json::to_vec_pretty(value)?;
    fs::write(&tmp, data).with_context(|| format!("writing {}", tmp.display()))?;
    atomic_rename(&tmp, path)?;
    Ok(())
}

pub(crate) fn atomic_rename(from: &Path, to: &Path) -> Result<()> {
    // rename-over-existing is not atomic on every platform
    if to.exists() {
        let _ = fs::remove_file(to);
    }
    fs::rename(from, to).with_context(|| format!("replacing {}", to.display()))?;
    Ok(())
}
