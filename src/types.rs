//! Shared types for one build pass.
//!
//! The host pipeline owns a [`FileMap`]: path keys mapped to [`File`]s. Each
//! file carries raw bytes plus an open metadata table. The handful of metadata
//! keys the composer understands (`layout`, `layoutName`, `static`) are read
//! through typed accessors; everything else passes through to templates
//! untouched.

use serde_json::Value;
use std::borrow::Cow;
use std::collections::BTreeMap;

/// Arbitrary per-file or pipeline-wide metadata.
pub type Metadata = serde_json::Map<String, Value>;

/// The pipeline's file table, keyed by path relative to the source root.
pub type FileMap = BTreeMap<String, File>;

/// Metadata key selecting an explicit layout (or `"none"`).
pub const LAYOUT_KEY: &str = "layout";
/// Metadata key overriding the name a layout file registers under.
pub const LAYOUT_NAME_KEY: &str = "layoutName";
/// Metadata key marking a page for two-phase static rendering.
pub const STATIC_KEY: &str = "static";
/// Key under which a file's text is exposed to templates.
pub const CONTENTS_KEY: &str = "contents";

/// A single file in the pipeline.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct File {
    /// Raw bytes. Templates are expected to be UTF-8; invalid sequences are
    /// replaced when the file is read as text.
    pub contents: Vec<u8>,
    /// Everything else the pipeline knows about the file.
    pub metadata: Metadata,
}

impl File {
    pub fn new(contents: impl Into<Vec<u8>>) -> Self {
        Self {
            contents: contents.into(),
            metadata: Metadata::new(),
        }
    }

    /// Builder-style metadata insert.
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    /// Contents decoded as text.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.contents)
    }

    /// Explicit layout name from `layout`, if it is a non-empty string.
    pub fn layout(&self) -> Option<&str> {
        self.str_field(LAYOUT_KEY)
    }

    /// Registry name override from `layoutName`.
    pub fn layout_name(&self) -> Option<&str> {
        self.str_field(LAYOUT_NAME_KEY)
    }

    /// Whether the page asked for static (two-phase) rendering.
    ///
    /// Only a boolean `true` counts; strings like `"yes"` do not.
    pub fn is_static(&self) -> bool {
        matches!(self.metadata.get(STATIC_KEY), Some(Value::Bool(true)))
    }

    /// The file as a template-facing object: metadata plus `contents` as text.
    pub fn attributes(&self) -> Metadata {
        let mut attrs = self.metadata.clone();
        attrs.insert(
            CONTENTS_KEY.to_string(),
            Value::String(self.text().into_owned()),
        );
        attrs
    }

    fn str_field(&self, key: &str) -> Option<&str> {
        self.metadata
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }
}
