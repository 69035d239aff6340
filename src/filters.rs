//! Template filters registered on every build's environment.
//!
//! Filters come from two places: a small built-in catalog addressable by name
//! (so `[engine.custom_filters]` can alias them from config), and arbitrary
//! callables supplied programmatically through build hooks.
//!
//! | Catalog name | Effect |
//! |--------------|--------|
//! | `markdown` | CommonMark → HTML, output marked safe |
//! | `slugify` | lowercase, runs of non-alphanumerics become `-` |
//! | `basename` | last `/`-separated component |
//! | `strip_front_matter` | drop a leading front-matter fence |

use crate::front_matter;
use minijinja::value::{Rest, Value};
use minijinja::{Environment, Error};
use std::fmt;
use std::sync::Arc;
use thiserror::Error as ThisError;

/// A programmatic filter: the piped value plus any call arguments.
pub type FilterFn = Arc<dyn Fn(Value, Rest<Value>) -> Result<Value, Error> + Send + Sync>;

/// Names available to [`FilterSource::Catalog`].
pub const CATALOG: &[&str] = &["markdown", "slugify", "basename", "strip_front_matter"];

#[derive(ThisError, Debug)]
pub enum FilterError {
    #[error("Filter `{name}` refers to unknown built-in `{target}` (available: {})", CATALOG.join(", "))]
    UnknownCatalogFilter { name: String, target: String },
}

/// Where a custom filter's implementation comes from.
#[derive(Clone)]
pub enum FilterSource {
    /// A built-in filter, by catalog name.
    Catalog(String),
    Callable(FilterFn),
}

impl FilterSource {
    /// Wrap a closure as a callable filter.
    pub fn callable<F>(f: F) -> Self
    where
        F: Fn(Value, Rest<Value>) -> Result<Value, Error> + Send + Sync + 'static,
    {
        FilterSource::Callable(Arc::new(f))
    }
}

impl fmt::Debug for FilterSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterSource::Catalog(name) => f.debug_tuple("Catalog").field(name).finish(),
            FilterSource::Callable(_) => f.write_str("Callable(..)"),
        }
    }
}

/// Register `source` on `env` under `name`.
pub fn register(
    env: &mut Environment<'static>,
    name: &str,
    source: &FilterSource,
) -> Result<(), FilterError> {
    match source {
        FilterSource::Catalog(target) => register_catalog(env, name, target),
        FilterSource::Callable(f) => {
            let f = Arc::clone(f);
            env.add_filter(name.to_string(), move |value: Value, rest: Rest<Value>| {
                f(value, rest)
            });
            tracing::debug!(filter = name, "registered callable filter");
            Ok(())
        }
    }
}

/// Register every catalog filter under its own name.
pub fn register_catalog_defaults(env: &mut Environment<'static>) -> Result<(), FilterError> {
    for &name in CATALOG {
        register_catalog(env, name, name)?;
    }
    Ok(())
}

fn register_catalog(
    env: &mut Environment<'static>,
    name: &str,
    target: &str,
) -> Result<(), FilterError> {
    let name = name.to_string();
    match target {
        "markdown" => env.add_filter(name, markdown),
        "slugify" => env.add_filter(name, slugify),
        "basename" => env.add_filter(name, basename),
        "strip_front_matter" => env.add_filter(name, strip_front_matter),
        _ => {
            return Err(FilterError::UnknownCatalogFilter {
                name,
                target: target.to_string(),
            });
        }
    }
    Ok(())
}

/// Render CommonMark to HTML. The result is safe for autoescaping.
pub fn markdown(value: &str) -> Value {
    use pulldown_cmark::{Options, Parser, html};

    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    let parser = Parser::new_ext(value, options);
    let mut out = String::with_capacity(value.len() * 3 / 2);
    html::push_html(&mut out, parser);
    Value::from_safe_string(out)
}

/// `"Hello, World!"` → `"hello-world"`.
pub fn slugify(value: &str) -> String {
    let mut slug = String::with_capacity(value.len());
    let mut pending_dash = false;
    for c in value.chars().flat_map(char::to_lowercase) {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else {
            pending_dash = true;
        }
    }
    slug
}

pub fn basename(value: &str) -> String {
    value
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_string()
}

pub fn strip_front_matter(value: &str) -> String {
    front_matter::strip(value).into_owned()
}
