//! Build configuration.
//!
//! Handles loading, validating, and merging `layoutsmith.toml`. Stock
//! defaults are the base layer; the project's config file only needs the
//! keys it wants to change.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! source = "src"                    # Directory read into the file map
//! destination = "dist"              # Directory the file map is written to
//! clean = true                      # Empty destination before writing
//!
//! pages = ["**/*.twig"]             # Glob(s) selecting pages
//! layouts = ["layouts/*.twig"]      # Glob(s) selecting layouts (never pages)
//! default_layout = "default-layout" # Layout name, "default-layout" or "none"
//! static_layout = "static-layout"   # Layout name or "static-layout"
//!
//! [metadata]                        # Site-wide values visible to every template
//! title = "My site"
//!
//! [engine]
//! paths = ["."]                     # Template roots, in search order
//! remove_source_from_path = false   # Don't append `source` to the roots
//! autoescape = true
//! trim_blocks = true
//! lstrip_blocks = true
//!
//! [engine.custom_filters]           # New filter name = catalog filter name
//! md = "markdown"
//!
//! [engine.loader]
//! modules_dir = "node_modules"      # Package directory searched after the roots
//! workspace_manifest = "lerna.json" # Marks a workspace root two levels up
//! extensions = [".twig", ".html"]   # Suffixes tried during package resolution
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::classify::{DEFAULT_LAYOUT, STATIC_LAYOUT};
use crate::pattern::Patterns;
use crate::types::Metadata;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name looked up in the project root.
pub const CONFIG_FILENAME: &str = "layoutsmith.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Top-level build configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ComposeConfig {
    /// Directory read into the file map, relative to the project root.
    pub source: PathBuf,
    /// Output directory, relative to the project root.
    pub destination: PathBuf,
    /// Remove everything in `destination` before writing.
    pub clean: bool,
    /// Patterns selecting pages.
    pub pages: Patterns,
    /// Patterns selecting layouts. Layouts are never rendered as pages.
    pub layouts: Patterns,
    /// Layout every page extends unless it says otherwise.
    pub default_layout: String,
    /// Wrapper used for pages marked `static`.
    pub static_layout: String,
    /// Site-wide template values.
    pub metadata: Metadata,
    /// Templating environment settings.
    pub engine: EngineConfig,
}

impl Default for ComposeConfig {
    fn default() -> Self {
        Self {
            source: PathBuf::from("src"),
            destination: PathBuf::from("dist"),
            clean: true,
            pages: Patterns::from(vec!["**/*.twig"]),
            layouts: Patterns::from(vec!["layouts/*.twig"]),
            default_layout: DEFAULT_LAYOUT.to_string(),
            static_layout: STATIC_LAYOUT.to_string(),
            metadata: Metadata::new(),
            engine: EngineConfig::default(),
        }
    }
}

impl ComposeConfig {
    /// Validate values serde can't check on its own.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pages.is_empty() {
            return Err(ConfigError::Validation("pages must not be empty".into()));
        }
        if self.layouts.is_empty() {
            return Err(ConfigError::Validation("layouts must not be empty".into()));
        }
        if self.default_layout.trim().is_empty() {
            return Err(ConfigError::Validation(
                "default_layout must not be empty".into(),
            ));
        }
        if self.static_layout.trim().is_empty() {
            return Err(ConfigError::Validation(
                "static_layout must not be empty".into(),
            ));
        }
        for (name, target) in &self.engine.custom_filters {
            if name.trim().is_empty() || target.trim().is_empty() {
                return Err(ConfigError::Validation(
                    "engine.custom_filters entries must have non-empty names".into(),
                ));
            }
        }
        if self.engine.loader.modules_dir.trim().is_empty() {
            return Err(ConfigError::Validation(
                "engine.loader.modules_dir must not be empty".into(),
            ));
        }
        Ok(())
    }
}

/// Templating environment settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Template roots searched in order, relative to the project root.
    pub paths: Vec<PathBuf>,
    /// Leave the `source` directory out of the template roots.
    pub remove_source_from_path: bool,
    /// HTML-escape every `{{ }}` output unless marked safe.
    pub autoescape: bool,
    /// Drop the first newline after a block tag.
    pub trim_blocks: bool,
    /// Strip whitespace before a block tag on its line.
    pub lstrip_blocks: bool,
    /// Extra filter names mapped to catalog filters.
    pub custom_filters: BTreeMap<String, String>,
    /// Package fallback settings.
    pub loader: LoaderConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            paths: vec![PathBuf::from(".")],
            remove_source_from_path: false,
            autoescape: true,
            trim_blocks: true,
            lstrip_blocks: true,
            custom_filters: BTreeMap::new(),
            loader: LoaderConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Template roots for one build: `paths`, then `source` unless removed.
    pub fn search_paths(&self, source: &Path) -> Vec<PathBuf> {
        let mut roots = self.paths.clone();
        if !self.remove_source_from_path {
            roots.push(source.to_path_buf());
        }
        roots
    }
}

/// Package fallback settings for the template loader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoaderConfig {
    /// Package directory name, searched under the working directory and
    /// under the workspace root.
    pub modules_dir: String,
    /// File whose presence two directories up marks a workspace root.
    pub workspace_manifest: String,
    /// Suffixes tried when a package name has no exact match.
    pub extensions: Vec<String>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            modules_dir: "node_modules".to_string(),
            workspace_manifest: "lerna.json".to_string(),
            extensions: vec![".twig".to_string(), ".html".to_string()],
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// [`ComposeConfig::default`] as TOML, the base layer of every load.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    toml::Value::try_from(ComposeConfig::default())
        .map_err(|e| ConfigError::Validation(format!("default config must serialize: {e}")))
}

/// Overlay the project's keys onto the stock defaults. Tables such as
/// `[engine]` merge key by key; any other value replaces the default whole,
/// so `pages = "index.twig"` drops the default pattern list.
pub fn merge_toml(defaults: toml::Value, project: toml::Value) -> toml::Value {
    match (defaults, project) {
        (toml::Value::Table(defaults), toml::Value::Table(project)) => {
            let merged = project.into_iter().fold(defaults, |mut table, (key, value)| {
                let value = match table.remove(&key) {
                    Some(default) => merge_toml(default, value),
                    None => value,
                };
                table.insert(key, value);
                table
            });
            toml::Value::Table(merged)
        }
        (_, project) => project,
    }
}

/// The project's `layoutsmith.toml` as raw TOML, or `None` when the project
/// has none.
fn read_project_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(toml::from_str(&content)?)),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err.into()),
    }
}

/// Load `layoutsmith.toml` at `path` over the stock defaults and validate
/// the result. A project without the file builds with the defaults.
pub fn load_config(path: &Path) -> Result<ComposeConfig, ConfigError> {
    let defaults = stock_defaults_value()?;
    let merged = match read_project_config(path)? {
        Some(project) => merge_toml(defaults, project),
        None => defaults,
    };
    let config: ComposeConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Returns a fully-commented stock `layoutsmith.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# layoutsmith configuration
# ========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys cause an error.

# Directory read into the file map, relative to this file.
source = "src"

# Directory the rendered file map is written to.
destination = "dist"

# Empty the destination before writing.
clean = true

# ---------------------------------------------------------------------------
# Classification
# ---------------------------------------------------------------------------
# Pages: rendered and renamed to .html. A single string or a list.
pages = ["**/*.twig"]

# Layouts: registered by file stem (or `layoutName` front matter) and removed
# from the output. Files matching these patterns are never pages.
layouts = ["layouts/*.twig"]

# Layout extended by pages without a `layout` of their own.
# "default-layout" uses layouts/default-layout.*; "none" disables wrapping.
default_layout = "default-layout"

# Wrapper for pages with `static: true` in their front matter. The wrapper
# receives the rendered page as `contents` and the page context as `context`.
static_layout = "static-layout"

# ---------------------------------------------------------------------------
# Site-wide metadata, merged into every page's template context
# ---------------------------------------------------------------------------
[metadata]

# ---------------------------------------------------------------------------
# Templating environment
# ---------------------------------------------------------------------------
[engine]
# Template roots searched in order by extends/include/import.
paths = ["."]

# Leave `source` out of the template roots.
remove_source_from_path = false

autoescape = true
trim_blocks = true
lstrip_blocks = true

# Extra filter names mapped to built-in filters
# (markdown, slugify, basename, strip_front_matter).
[engine.custom_filters]
# md = "markdown"

# ---------------------------------------------------------------------------
# Package fallback for templates not found under the roots
# ---------------------------------------------------------------------------
[engine.loader]
modules_dir = "node_modules"
workspace_manifest = "lerna.json"
extensions = [".twig", ".html"]
"##
}
