//! # layoutsmith
//!
//! Layout resolution and template composition for static-site builds.
//!
//! A host pipeline hands over a [`types::FileMap`]: paths mapped to bytes plus
//! metadata. One build pass splits it into pages and layouts, decides for
//! every page which layout it extends, renders the result through a Jinja
//! family template engine and rewrites the map: pages become `.html`, layout
//! files disappear, everything else is left alone.
//!
//! # Build Pass
//!
//! ```text
//! 1. Classify   file map  →  layout registry + page set    (glob patterns)
//! 2. Validate   registry  →  ok | configuration error      (before any render)
//! 3. Compose    page      →  source with `extends` prefix  (per page)
//! 4. Render     source    →  HTML                          (file map untouched)
//! 5. Apply      HTML      →  renamed, rewritten file map   (all at once)
//! ```
//!
//! Pages never mention their layout in template syntax. A page either names
//! one in front matter (`layout: post`), opts out (`layout: none`), or gets
//! the default layout. A page without its own `{% block body %}` is wrapped
//! in one, so flat pages drop into the layout's `body` slot unchanged. Pages
//! marked `static: true` skip inheritance entirely: their rendered output is
//! passed to the static wrapper layout as `contents`.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`types`] | `File`, `FileMap`, metadata keys |
//! | [`front_matter`] | Front matter splitting, stripping and parsing |
//! | [`pattern`] | Order-preserving glob matching with `!` negation |
//! | [`classify`] | Page/layout split, layout registry, name validation |
//! | [`scanner`] | Token walk that answers "does this template declare block X?" |
//! | [`compose`] | Per-page layout decision and composed source |
//! | [`loader`] | Template lookup: memory, roots, packages, workspace packages |
//! | [`filters`] | Built-in filter catalog and custom filter registration |
//! | [`engine`] | `minijinja` environment setup behind the `Renderer` trait |
//! | [`render`] | Render context, composed render, two-phase static render |
//! | [`pipeline`] | The build pass and its staged mutations |
//! | [`source`] | Reading a source directory into a file map and writing it out |
//! | [`config`] | `layoutsmith.toml` loading, defaults and validation |
//! | [`output`] | CLI output formatting |
//!
//! # Embedding
//!
//! ```no_run
//! use layoutsmith::{config::ComposeConfig, pipeline, source};
//!
//! let config = ComposeConfig::default();
//! let mut files = source::read_source(&config.source)?;
//! let options = pipeline::BuildOptions::new(config, ".");
//! let report = pipeline::run(&mut files, &options)?;
//! println!("rendered {} pages", report.pages.len());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod classify;
pub mod compose;
pub mod config;
pub mod engine;
pub mod filters;
pub mod front_matter;
pub mod loader;
pub mod output;
pub mod pattern;
pub mod pipeline;
pub mod render;
pub mod scanner;
pub mod source;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
