use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{EngineError, EngineResult};

#[derive(Debug, Clone, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub render: RenderConfig,
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct RenderConfig {
    pub default_scale: f32,
    pub thumbnail_scale: f32,
    pub max_render_scale: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            default_scale: 1.5,
            thumbnail_scale: 0.3,
            max_render_scale: 4.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CacheConfig {
    pub page_max_entries: usize,
    pub thumbnail_max_entries: usize,
    pub trim_keep_recent: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            page_max_entries: 128,
            thumbnail_max_entries: 96,
            trim_keep_recent: 10,
        }
    }
}

impl Config {
    pub fn load() -> EngineResult<Self> {
        let Some(path) = default_config_path() else {
            return Ok(Self::default());
        };
        Self::load_from_path(path)
    }

    pub fn load_from_path(path: impl AsRef<Path>) -> EngineResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        if !path.is_file() {
            return Err(EngineError::invalid_argument(format!(
                "config path is not a regular file: {}",
                path.display()
            )));
        }

        let raw = fs::read_to_string(path).map_err(|source| {
            EngineError::io_with_context(
                source,
                format!("failed to read config: {}", path.display()),
            )
        })?;
        let parsed = toml::from_str::<Self>(&raw).map_err(|source| {
            EngineError::invalid_argument(format!(
                "failed to parse config {}: {source}",
                path.display()
            ))
        })?;
        Ok(parsed.sanitized())
    }

    fn sanitized(mut self) -> Self {
        let defaults = RenderConfig::default();
        if !positive_finite(self.render.default_scale) {
            self.render.default_scale = defaults.default_scale;
        }
        if !positive_finite(self.render.thumbnail_scale) {
            self.render.thumbnail_scale = defaults.thumbnail_scale;
        }
        if !positive_finite(self.render.max_render_scale)
            || self.render.max_render_scale < self.render.default_scale
        {
            self.render.max_render_scale = defaults.max_render_scale;
        }
        self.cache.page_max_entries = self.cache.page_max_entries.max(1);
        self.cache.thumbnail_max_entries = self.cache.thumbnail_max_entries.max(1);
        self.cache.trim_keep_recent = self.cache.trim_keep_recent.max(1);
        self
    }
}

fn positive_finite(value: f32) -> bool {
    value.is_finite() && value > 0.0
}

pub fn default_config_path() -> Option<PathBuf> {
    if let Some(explicit) = std::env::var_os("DOCRASTER_CONFIG_PATH")
        && !explicit.is_empty()
    {
        return Some(PathBuf::from(explicit));
    }

    if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME")
        && !xdg.is_empty()
    {
        return Some(PathBuf::from(xdg).join("docraster").join("config.toml"));
    }
    if let Some(home) = std::env::var_os("HOME")
        && !home.is_empty()
    {
        return Some(
            PathBuf::from(home)
                .join(".config")
                .join("docraster")
                .join("config.toml"),
        );
    }
    if let Some(appdata) = std::env::var_os("APPDATA")
        && !appdata.is_empty()
    {
        return Some(PathBuf::from(appdata).join("docraster").join("config.toml"));
    }
    None
}
