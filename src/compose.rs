//! Layout composition.
//!
//! Pages never name their layout in template syntax. Instead the composer
//! decides, per page, what source text to hand the engine. First match wins:
//!
//! 1. `layout: none` → the page's own (front-matter stripped) source.
//! 2. `layout: <name>` naming a registered layout → the source prefixed with
//!    `{% extends '<layout path>' %}`.
//! 3. `default_layout = "none"` → the page's own source.
//! 4. Otherwise the page extends the default layout:
//!    - a page that declares `{% block body %}` is prefixed only;
//!    - a flat page is also wrapped in `{% block body %}...{% endblock %}`,
//!      so its whole content lands wherever the layout put its `body` block.
//!
//! An explicit `layout` naming nothing registered falls through to the
//! default path rather than failing the build.

use crate::classify::{DEFAULT_LAYOUT, LayoutEntry, LayoutError, LayoutRegistry, NO_LAYOUT};
use crate::front_matter;
use crate::scanner;
use crate::types::File;
use serde::Serialize;
use std::fmt;

/// Name of the block flat pages are wrapped in.
pub const BODY_BLOCK: &str = "body";

/// The configured layout names a build runs with.
#[derive(Debug, Clone, Copy)]
pub struct LayoutSettings<'c> {
    pub default_layout: &'c str,
    pub static_layout: &'c str,
}

/// Which composition rule applied to a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "layout", rename_all = "snake_case")]
pub enum LayoutChoice {
    /// Rendered as-is.
    None,
    /// Extends a layout named in the page's metadata.
    Explicit(String),
    /// Extends the default layout and supplies its own `body` block.
    DefaultWithBlock(String),
    /// Extends the default layout, wrapped in a generated `body` block.
    DefaultWrapped(String),
    /// Two-phase render into the static wrapper.
    Static(String),
}

impl fmt::Display for LayoutChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayoutChoice::None => write!(f, "no layout"),
            LayoutChoice::Explicit(name) => write!(f, "layout {name}"),
            LayoutChoice::DefaultWithBlock(name) => write!(f, "default layout {name}"),
            LayoutChoice::DefaultWrapped(name) => write!(f, "default layout {name} (wrapped)"),
            LayoutChoice::Static(name) => write!(f, "static layout {name}"),
        }
    }
}

/// Source text ready for the engine, plus the rule that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Composition {
    pub source: String,
    pub choice: LayoutChoice,
}

/// `{% extends '<path>' %}` followed by a newline.
pub fn extends_directive(path: &str) -> String {
    let quoted = path.replace('\\', "\\\\").replace('\'', "\\'");
    format!("{{% extends '{quoted}' %}}\n")
}

/// Wrap `content` in the generated `body` block.
pub fn wrap_in_body_block(content: &str) -> String {
    format!("{{% block {BODY_BLOCK} %}}{content}{{% endblock %}}")
}

/// Compose the source for `page` (at `path`) against the registry.
///
/// Fails only when the page needs the default layout and nothing is
/// registered under it.
pub fn compose(
    path: &str,
    page: &File,
    registry: &LayoutRegistry<'_>,
    settings: LayoutSettings<'_>,
) -> Result<Composition, LayoutError> {
    let text = page.text();
    let content = front_matter::strip(&text);

    match page.layout() {
        Some(NO_LAYOUT) => {
            return Ok(Composition {
                source: content.into_owned(),
                choice: LayoutChoice::None,
            });
        }
        Some(name) => {
            if let Some(entry) = registry.get(name) {
                return Ok(Composition {
                    source: extends_directive(entry.file_name) + &content,
                    choice: LayoutChoice::Explicit(entry.name.to_string()),
                });
            }
            tracing::debug!(page = path, layout = name, "unknown layout; using default");
        }
        None => {}
    }

    if settings.default_layout == NO_LAYOUT {
        return Ok(Composition {
            source: content.into_owned(),
            choice: LayoutChoice::None,
        });
    }

    let default = default_entry(path, registry, settings)?;
    let directive = extends_directive(default.file_name);
    let name = default.name.to_string();
    let composition = if scanner::contains_block(&content, BODY_BLOCK) {
        Composition {
            source: directive + &content,
            choice: LayoutChoice::DefaultWithBlock(name),
        }
    } else {
        Composition {
            source: directive + &wrap_in_body_block(&content),
            choice: LayoutChoice::DefaultWrapped(name),
        }
    };
    tracing::trace!(page = path, choice = %composition.choice, "composed");
    Ok(composition)
}

fn default_entry<'r, 'a>(
    path: &str,
    registry: &'r LayoutRegistry<'a>,
    settings: LayoutSettings<'_>,
) -> Result<&'r LayoutEntry<'a>, LayoutError> {
    registry
        .get(settings.default_layout)
        .or_else(|| registry.get(DEFAULT_LAYOUT))
        .ok_or_else(|| LayoutError::MissingLayout {
            page: path.to_string(),
            name: settings.default_layout.to_string(),
        })
}

/// The static wrapper entry for a page marked `static`.
pub fn static_entry<'r, 'a>(
    path: &str,
    registry: &'r LayoutRegistry<'a>,
    settings: LayoutSettings<'_>,
) -> Result<&'r LayoutEntry<'a>, LayoutError> {
    registry
        .get(settings.static_layout)
        .ok_or_else(|| LayoutError::MissingLayout {
            page: path.to_string(),
            name: settings.static_layout.to_string(),
        })
}
