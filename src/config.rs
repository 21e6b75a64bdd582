//! Widget configuration: an optional JSON file merged with command-line flags.

use anyhow::{anyhow, Context, Result};
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::model::{Category, CategoryRegistry, Color4};

/// Where a click on the canvas puts the new marker.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PlacementMode {
    /// At the pointer.
    #[default]
    Pointer,
    /// Anywhere inside the canvas.
    Random,
}

#[derive(Parser, Debug, Default)]
#[command(name = "marker-plot", about = "Place category markers on an image")]
pub struct CliArgs {
    /// Background image to open on startup.
    pub image: Option<PathBuf>,
    /// JSON file with categories and marker defaults.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
    /// Override the placement mode from the config file.
    #[arg(long, value_enum)]
    pub placement: Option<PlacementMode>,
    /// Allow a custom color to replace the category color.
    #[arg(long = "color-override", action = clap::ArgAction::SetTrue)]
    pub color_override: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CategoryConfig {
    pub name: String,
    /// `#rrggbb`, `#rgb` or a CSS color name.
    pub color: String,
    #[serde(default = "default_size")]
    pub size: f32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WidgetConfig {
    pub categories: Vec<CategoryConfig>,
    pub default_size: f32,
    pub min_size: f32,
    pub max_size: f32,
    pub allow_color_override: bool,
    pub placement: PlacementMode,
}

fn default_size() -> f32 {
    20.0
}

impl Default for WidgetConfig {
    fn default() -> Self {
        let categories = [("waypoints", "green", 20.0), ("ships", "yellow", 25.0), ("danger", "red", 30.0)]
            .into_iter()
            .map(|(name, color, size)| CategoryConfig {
                name: name.to_string(),
                color: color.to_string(),
                size,
            })
            .collect();
        Self {
            categories,
            default_size: default_size(),
            min_size: 5.0,
            max_size: 100.0,
            allow_color_override: false,
            placement: PlacementMode::Pointer,
        }
    }
}

impl WidgetConfig {
    /// Reads the config file when one is given, otherwise the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            log::info!("no config file given, using defaults");
            return Ok(Self::default());
        };
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config = Self::from_json(&data)
            .with_context(|| format!("invalid config {}", path.display()))?;
        log::info!(
            "loaded {} categories from {}",
            config.categories.len(),
            path.display()
        );
        Ok(config)
    }

    pub fn from_json(data: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(data)?;
        if config.min_size <= 0.0 || config.min_size > config.max_size {
            return Err(anyhow!(
                "size range {}..={} is empty",
                config.min_size,
                config.max_size
            ));
        }
        config.registry()?;
        Ok(config)
    }

    pub fn apply_cli(&mut self, args: &CliArgs) {
        if let Some(placement) = args.placement {
            self.placement = placement;
        }
        if args.color_override {
            self.allow_color_override = true;
        }
    }

    pub fn registry(&self) -> Result<CategoryRegistry> {
        let mut registry = CategoryRegistry::new();
        for cat in &self.categories {
            let color = Color4::parse(&cat.color)
                .ok_or_else(|| anyhow!("category '{}' has invalid color '{}'", cat.name, cat.color))?;
            registry.insert(
                &cat.name,
                Category {
                    color,
                    size: cat.size,
                },
            )?;
        }
        Ok(registry)
    }

    pub fn clamp_size(&self, size: f32) -> f32 {
        size.clamp(self.min_size, self.max_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_builtin_registry() {
        let registry = WidgetConfig::default().registry().unwrap();
        let builtin = CategoryRegistry::builtin();
        assert!(registry.iter().eq(builtin.iter()));
    }

    #[test]
    fn empty_object_uses_defaults() {
        assert_eq!(WidgetConfig::from_json("{}").unwrap(), WidgetConfig::default());
    }

    #[test]
    fn parses_categories_and_placement() {
        let config = WidgetConfig::from_json(
            r##"{
                "categories": [
                    {"name": "reef", "color": "#00ffff"},
                    {"name": "buoy", "color": "orange", "size": 12}
                ],
                "placement": "random",
                "allow_color_override": true
            }"##,
        )
        .unwrap();
        assert_eq!(config.placement, PlacementMode::Random);
        assert!(config.allow_color_override);
        let registry = config.registry().unwrap();
        assert_eq!(registry.get("reef").map(|c| c.size), Some(20.0));
        assert_eq!(registry.get("buoy").map(|c| c.color), Color4::parse("orange"));
    }

    #[test]
    fn rejects_bad_color_and_duplicates() {
        let bad_color = r#"{"categories": [{"name": "reef", "color": "sea-ish"}]}"#;
        assert!(WidgetConfig::from_json(bad_color).is_err());

        let dup = r#"{"categories": [
            {"name": "reef", "color": "red"},
            {"name": "reef", "color": "blue"}
        ]}"#;
        let err = WidgetConfig::from_json(dup).unwrap_err();
        assert!(format!("{err}").contains("already exists"));
    }

    #[test]
    fn rejects_inverted_size_range() {
        assert!(WidgetConfig::from_json(r#"{"min_size": 50, "max_size": 10}"#).is_err());
    }

    #[test]
    fn cli_flags_override_file() {
        let mut config = WidgetConfig::default();
        let args = CliArgs::parse_from(["marker-plot", "--placement", "random", "--color-override"]);
        config.apply_cli(&args);
        assert_eq!(config.placement, PlacementMode::Random);
        assert!(config.allow_color_override);
        assert_eq!(config.clamp_size(1000.0), 100.0);
    }

    #[test]
    fn missing_config_file_is_an_error() {
        assert!(WidgetConfig::load(Some(Path::new("/nonexistent/marker-plot.json"))).is_err());
        assert!(WidgetConfig::load(None).is_ok());
    }
}
