//! Renderer settings, persisted as JSON

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::types::Result;
use crate::core::Error;

use super::bsp::DrawOrder;

/// Capacities and toggles read when the renderer is created
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    /// Frustum arena size per frame
    pub max_frustums: usize,
    pub max_bsp_nodes: usize,
    pub max_bsp_polygons: usize,
    /// Render list entries beyond the room count
    pub render_list_slack: usize,
    /// Cull and report static meshes flagged hidden as well
    pub draw_dummy_statics: bool,
    /// Order of the transparent draw sequence
    pub transparent_order: DrawOrder,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            max_frustums: 8192,
            max_bsp_nodes: 16384,
            max_bsp_polygons: 32768,
            render_list_slack: 128,
            draw_dummy_statics: false,
            transparent_order: DrawOrder::BackToFront,
        }
    }
}

impl RenderSettings {
    /// Reject settings the renderer cannot run with
    pub fn validate(&self) -> Result<()> {
        let capacities = [
            ("max_frustums", self.max_frustums),
            ("max_bsp_nodes", self.max_bsp_nodes),
            ("max_bsp_polygons", self.max_bsp_polygons),
        ];
        for (name, value) in capacities {
            if value == 0 {
                return Err(Error::Config(format!("{name} must be greater than zero")));
            }
        }
        Ok(())
    }

    /// Write settings as pretty JSON, creating parent directories
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Read and validate settings. Missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let settings: Self = serde_json::from_str(&json)?;
        settings.validate()?;
        log::info!("Loaded render settings from {}", path.display());
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_valid() {
        let settings = RenderSettings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.render_list_slack, 128);
        assert_eq!(settings.transparent_order, DrawOrder::BackToFront);
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let settings = RenderSettings {
            max_bsp_nodes: 0,
            ..Default::default()
        };
        let err = settings.validate().unwrap_err();
        assert!(matches!(err, Error::Config(ref msg) if msg.contains("max_bsp_nodes")));
    }

    #[test]
    fn test_save_load_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config").join("render.json");
        let settings = RenderSettings {
            max_frustums: 64,
            draw_dummy_statics: true,
            transparent_order: DrawOrder::FrontToBack,
            ..Default::default()
        };
        settings.save(&path).unwrap();
        assert_eq!(RenderSettings::load(&path).unwrap(), settings);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("render.json");
        std::fs::write(&path, r#"{ "max_frustums": 10 }"#).unwrap();
        let settings = RenderSettings::load(&path).unwrap();
        assert_eq!(settings.max_frustums, 10);
        assert_eq!(settings.max_bsp_polygons, RenderSettings::default().max_bsp_polygons);

        std::fs::write(&path, r#"{ "max_frustums": 0 }"#).unwrap();
        assert!(matches!(RenderSettings::load(&path), Err(Error::Config(_))));
        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(RenderSettings::load(&path), Err(Error::Json(_))));
    }
}
