//! Page/layout classification and the layout registry.
//!
//! Every build starts by splitting the file map in two:
//!
//! - **Layouts**: paths matching the `layouts` patterns. Each registers under
//!   its `layoutName` metadata, or its file stem when that is unset
//!   (`layouts/post.twig` → `post`).
//! - **Pages**: paths matching the `pages` patterns, minus every path that is
//!   also a layout. The layout patterns act as a blacklist, so the broad
//!   default `**/*.twig` never renders a layout as a page.
//!
//! ## Sentinel names
//!
//! Three layout names have special meaning in configuration:
//!
//! | Name | Meaning |
//! |------|---------|
//! | `default-layout` | "the layout registered as `default-layout`" (the stock default) |
//! | `static-layout` | "the layout registered as `static-layout`" (the stock static wrapper) |
//! | `none` | no default layout: pages render without wrapping |
//!
//! When `default_layout` names a real layout, that entry is also aliased under
//! `default-layout`. [`validate`] checks the configured names against the
//! registry once per build, before anything renders.

use crate::pattern::{self, Matcher, PatternError, Patterns};
use crate::types::{File, FileMap};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

/// Stock name of the default layout.
pub const DEFAULT_LAYOUT: &str = "default-layout";
/// Stock name of the static wrapper layout.
pub const STATIC_LAYOUT: &str = "static-layout";
/// Disables layout wrapping (per page via `layout`, or globally via `default_layout`).
pub const NO_LAYOUT: &str = "none";

#[derive(Error, Debug)]
pub enum LayoutError {
    #[error("Configuration error: {option} names layout `{name}`, which does not exist")]
    UnknownLayout { option: &'static str, name: String },
    #[error("Page {page} needs layout `{name}`, but no layout registers under that name")]
    MissingLayout { page: String, name: String },
    #[error("Pattern error: {0}")]
    Pattern(#[from] PatternError),
}

/// A layout as seen by the composer: its logical name, original path and file.
#[derive(Debug, Clone, Copy)]
pub struct LayoutEntry<'a> {
    pub name: &'a str,
    pub file_name: &'a str,
    pub file: &'a File,
}

/// Logical layout name → entry.
#[derive(Debug, Default)]
pub struct LayoutRegistry<'a> {
    entries: BTreeMap<String, LayoutEntry<'a>>,
}

impl<'a> LayoutRegistry<'a> {
    pub fn get(&self, name: &str) -> Option<&LayoutEntry<'a>> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Registered names, aliases included.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn insert(&mut self, key: &str, entry: LayoutEntry<'a>) {
        self.entries.insert(key.to_string(), entry);
    }
}

/// Result of classifying one file map.
#[derive(Debug)]
pub struct Classification<'a> {
    pub registry: LayoutRegistry<'a>,
    /// Every path matched by the layout patterns, in file map order.
    pub layout_paths: Vec<&'a str>,
    /// Pages to render, in file map order.
    pub pages: Vec<(&'a str, &'a File)>,
}

/// The name a layout file registers under: `layoutName`, else its file stem.
pub fn layout_name<'a>(path: &'a str, file: &'a File) -> &'a str {
    file.layout_name().unwrap_or_else(|| {
        Path::new(path)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(path)
    })
}

/// Build the layout registry from the paths matching `layout_patterns`.
///
/// Two layouts claiming the same name resolve last-writer-wins in file map
/// order.
pub fn build_registry<'a>(
    files: &'a FileMap,
    layout_paths: &[&'a str],
    default_layout: &str,
) -> LayoutRegistry<'a> {
    let mut registry = LayoutRegistry::default();
    for &path in layout_paths {
        let Some((file_name, file)) = files.get_key_value(path) else {
            continue;
        };
        let name = layout_name(file_name, file);
        let entry = LayoutEntry {
            name,
            file_name,
            file,
        };
        if registry.contains(name) {
            tracing::debug!(layout = name, path = file_name, "layout name reused; later file wins");
        }
        registry.insert(name, entry);
        if name == default_layout && default_layout != DEFAULT_LAYOUT {
            registry.insert(DEFAULT_LAYOUT, entry);
        }
    }
    registry
}

/// Split `files` into the layout registry and the page set.
pub fn classify<'a>(
    files: &'a FileMap,
    layout_patterns: &Patterns,
    page_patterns: &Patterns,
    default_layout: &str,
) -> Result<Classification<'a>, LayoutError> {
    let layout_matcher = Matcher::new(layout_patterns)?;
    let page_matcher = Matcher::new(page_patterns)?;

    let all_paths = || files.keys().map(String::as_str);
    let layout_paths = layout_matcher.filter(all_paths());
    let matched_pages = page_matcher.filter(all_paths());

    let registry = build_registry(files, &layout_paths, default_layout);
    let pages = pattern::difference(&matched_pages, &layout_paths)
        .into_iter()
        .filter_map(|path| files.get_key_value(path))
        .map(|(path, file)| (path.as_str(), file))
        .collect();

    Ok(Classification {
        registry,
        layout_paths,
        pages,
    })
}

/// Check the configured layout names against the registry.
///
/// `default_layout` must be a registered name, `default-layout` or `none`;
/// `static_layout` must be a registered name or `static-layout`.
pub fn validate(
    registry: &LayoutRegistry<'_>,
    default_layout: &str,
    static_layout: &str,
) -> Result<(), LayoutError> {
    if !registry.contains(default_layout)
        && default_layout != DEFAULT_LAYOUT
        && default_layout != NO_LAYOUT
    {
        return Err(LayoutError::UnknownLayout {
            option: "default_layout",
            name: default_layout.to_string(),
        });
    }
    if !registry.contains(static_layout) && static_layout != STATIC_LAYOUT {
        return Err(LayoutError::UnknownLayout {
            option: "static_layout",
            name: static_layout.to_string(),
        });
    }
    Ok(())
}
