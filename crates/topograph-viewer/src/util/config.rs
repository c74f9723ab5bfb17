use anyhow::Context;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use topograph_core::EdgeFilters;

use crate::graph::colors::Color;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("invalid palette color {0:?} (expected #rrggbb)")]
    InvalidColor(String),
    #[error("palette must contain at least one color")]
    EmptyPalette,
    #[error("placement offset range {min}..={max} is empty or negative")]
    InvalidPlacementRange { min: f64, max: f64 },
    #[error("layout needs at least one iteration")]
    NoIterations,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutMode {
    /// Run the force layout to completion inside the update cycle.
    Blocking,
    /// Advance the force layout from `tick()`; commit when finished.
    Sliced,
}

impl Default for LayoutMode {
    fn default() -> Self {
        Self::Blocking
    }
}

pub const DEFAULT_PALETTE: [&str; 10] = [
    "#3b82f6", "#10b981", "#f59e0b", "#ef4444", "#8b5cf6", "#ec4899", "#14b8a6", "#f97316",
    "#6366f1", "#84cc16",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub layout_mode: LayoutMode,
    pub layout_iterations: usize,
    pub layout_iterations_per_tick: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layout_seed: Option<u64>,
    pub repulsion: f64,
    pub ideal_edge_length: f64,
    pub edge_elasticity: f64,
    pub gravity: f64,
    pub damping: f64,
    pub max_step: f64,

    pub placement_offset_min: f64,
    pub placement_offset_max: f64,
    pub ring_margin: f64,

    pub search_dim_opacity: f32,
    pub search_fit_max: usize,

    pub palette: Vec<String>,
    pub default_host_key: String,
    pub edge_filters: EdgeFilters,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            layout_mode: LayoutMode::Blocking,
            layout_iterations: 300,
            layout_iterations_per_tick: 25,
            layout_seed: None,
            repulsion: 40_000.0,
            ideal_edge_length: 100.0,
            edge_elasticity: 0.45,
            gravity: 0.02,
            damping: 0.9,
            max_step: 30.0,
            placement_offset_min: 80.0,
            placement_offset_max: 120.0,
            ring_margin: 150.0,
            search_dim_opacity: 0.2,
            search_fit_max: 5,
            palette: DEFAULT_PALETTE.iter().map(|c| c.to_string()).collect(),
            default_host_key: "unknown".to_string(),
            edge_filters: EdgeFilters::default(),
        }
    }
}

impl ViewerConfig {
    pub fn palette_colors(&self) -> Result<Vec<Color>, ConfigError> {
        if self.palette.is_empty() {
            return Err(ConfigError::EmptyPalette);
        }
        self.palette.iter().map(|c| c.parse()).collect()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.palette_colors()?;
        let (min, max) = (self.placement_offset_min, self.placement_offset_max);
        if !(min >= 0.0 && max >= min && max.is_finite()) {
            return Err(ConfigError::InvalidPlacementRange { min, max });
        }
        if self.layout_iterations == 0 {
            return Err(ConfigError::NoIterations);
        }
        Ok(())
    }
}

fn config_file_path() -> Option<PathBuf> {
    let proj = ProjectDirs::from("", "", "topograph")?;
    Some(proj.config_dir().join("viewer.toml"))
}

pub fn load_or_default() -> ViewerConfig {
    let Some(path) = config_file_path() else {
        return ViewerConfig::default();
    };
    load_or_default_from_path(&path)
}

pub fn load_or_default_from_path(path: &Path) -> ViewerConfig {
    let Ok(contents) = fs::read_to_string(path) else {
        return ViewerConfig::default();
    };
    let cfg: ViewerConfig = match toml::from_str(&contents) {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "unreadable viewer config, using defaults"
            );
            return ViewerConfig::default();
        }
    };
    if let Err(e) = cfg.validate() {
        tracing::warn!(path = %path.display(), error = %e, "invalid viewer config, using defaults");
        return ViewerConfig::default();
    }
    cfg
}

pub fn save(cfg: &ViewerConfig) -> anyhow::Result<()> {
    let Some(path) = config_file_path() else {
        return Err(anyhow::anyhow!("no config directory available"));
    };
    save_to_path(cfg, &path)
}

pub fn save_to_path(cfg: &ViewerConfig, path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create config directory {}", parent.display()))?;
    }
    let data = toml::to_string_pretty(cfg).context("failed to serialize viewer config")?;
    fs::write(path, data)
        .with_context(|| format!("failed to write viewer config {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn viewer_config_roundtrip_save_load() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("viewer.toml");
        let mut cfg = ViewerConfig::default();
        cfg.layout_mode = LayoutMode::Sliced;
        cfg.layout_seed = Some(7);
        cfg.edge_filters.show_tcpdump = false;

        save_to_path(&cfg, &path).expect("save config");
        let loaded = load_or_default_from_path(&path);

        assert_eq!(cfg, loaded);
    }

    #[test]
    fn partial_file_keeps_defaults_for_missing_keys() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("viewer.toml");
        fs::write(&path, "ring_margin = 200.0\n[edge_filters]\nshow_external = false\n")
            .expect("write");

        let loaded = load_or_default_from_path(&path);

        assert_eq!(loaded.ring_margin, 200.0);
        assert_eq!(loaded.placement_offset_max, 120.0);
        assert!(!loaded.edge_filters.show_external);
        assert!(loaded.edge_filters.show_internal);
    }

    #[test]
    fn invalid_palette_falls_back_to_defaults() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("viewer.toml");
        fs::write(&path, "palette = [\"#12345\"]\nring_margin = 10.0\n").expect("write");

        let loaded = load_or_default_from_path(&path);

        assert_eq!(loaded, ViewerConfig::default());
    }

    #[test]
    fn validate_rejects_inverted_placement_range() {
        let cfg = ViewerConfig {
            placement_offset_min: 130.0,
            placement_offset_max: 120.0,
            ..ViewerConfig::default()
        };
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::InvalidPlacementRange {
                min: 130.0,
                max: 120.0
            })
        );
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempdir().expect("tempdir");
        let loaded = load_or_default_from_path(&dir.path().join("nope.toml"));
        assert_eq!(loaded, ViewerConfig::default());
    }
}
