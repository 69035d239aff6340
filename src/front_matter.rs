//! Front matter handling.
//!
//! Templates may open with a YAML block fenced by `---` (or the older
//! `= yaml =` fence), closed by the same fence or by `...`:
//!
//! ```text
//! ---
//! layout: post
//! static: true
//! ---
//! <h1>{{ title }}</h1>
//! ```
//!
//! [`strip`] removes that block before a template reaches the engine. The
//! source reader additionally uses [`parse`] to lift the block into file
//! metadata.

use crate::types::Metadata;
use regex::Regex;
use std::borrow::Cow;
use std::sync::LazyLock;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FrontMatterError {
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("front matter must be a mapping, found {0}")]
    NotAMapping(&'static str),
}

static DASH_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?ms)\A\x{FEFF}?---\r?$(.*?)^(?:---|\.\.\.)\r?$\n?")
        .expect("dash fence pattern is valid")
});

static YAML_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?ms)\A\x{FEFF}?= yaml =\r?$(.*?)^(?:= yaml =|\.\.\.)\r?$\n?")
        .expect("yaml fence pattern is valid")
});

/// Split `text` into its front matter body (without fences) and the rest.
pub fn split(text: &str) -> (Option<&str>, &str) {
    for fence in [&*DASH_FENCE, &*YAML_FENCE] {
        if let Some(caps) = fence.captures(text) {
            let whole = caps.get(0).map(|m| m.end()).unwrap_or(0);
            let body = caps.get(1).map(|m| m.as_str()).unwrap_or("");
            return (Some(body), &text[whole..]);
        }
    }
    (None, text)
}

/// Remove a leading front matter block. Text without one is returned as-is.
pub fn strip(text: &str) -> Cow<'_, str> {
    match split(text) {
        (Some(_), rest) => Cow::Owned(rest.to_string()),
        (None, _) => Cow::Borrowed(text),
    }
}

/// Parse the front matter into metadata and return it with the stripped body.
///
/// An empty block yields empty metadata.
pub fn parse(text: &str) -> Result<(Metadata, &str), FrontMatterError> {
    let (block, rest) = split(text);
    let Some(block) = block else {
        return Ok((Metadata::new(), rest));
    };
    if block.trim().is_empty() {
        return Ok((Metadata::new(), rest));
    }
    match serde_yaml::from_str::<serde_json::Value>(block)? {
        serde_json::Value::Object(map) => Ok((map, rest)),
        serde_json::Value::Null => Ok((Metadata::new(), rest)),
        serde_json::Value::Array(_) => Err(FrontMatterError::NotAMapping("a sequence")),
        _ => Err(FrontMatterError::NotAMapping("a scalar")),
    }
}
