//! Templating environment construction.
//!
//! The composer produces plain source text; something still has to turn it
//! into HTML. That capability is the [`Renderer`] trait, implemented here by
//! [`TemplateEngine`] over a `minijinja` environment. Tests and embedders can
//! supply their own renderer.
//!
//! Environment setup order:
//!
//! 1. `custom_environment` hook, or [`default_environment`] (loader, path
//!    join, autoescape and whitespace settings).
//! 2. Catalog filters under their own names.
//! 3. `[engine.custom_filters]` aliases, then hook filters.
//! 4. `raw` as an alias of `safe`.
//! 5. `custom` hook, last.

use crate::config::EngineConfig;
use crate::filters::{self, FilterError, FilterSource};
use crate::loader::TemplateLoader;
use minijinja::value::Value;
use minijinja::{AutoEscape, Environment, Error, ErrorKind};
use std::borrow::Cow;
use std::fmt;
use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum EngineError {
    #[error("Template not found while rendering {page}: {source}")]
    TemplateNotFound {
        page: String,
        #[source]
        source: Error,
    },
    #[error("Failed to render {page}: {source}")]
    Render {
        page: String,
        #[source]
        source: Error,
    },
    #[error("Filter error: {0}")]
    Filter(#[from] FilterError),
}

impl EngineError {
    fn from_render(page: &str, source: Error) -> Self {
        let page = page.to_string();
        if source.kind() == ErrorKind::TemplateNotFound {
            EngineError::TemplateNotFound { page, source }
        } else {
            EngineError::Render { page, source }
        }
    }
}

/// Renders template source under a name, with a context.
pub trait Renderer {
    /// `name` is the template's logical name; relative `extends`/`include`
    /// targets resolve against it.
    fn render_string(&self, name: &str, source: &str, context: &Value)
    -> Result<String, EngineError>;
}

/// Builds the environment in place of [`default_environment`].
pub type EnvironmentFactory =
    Box<dyn Fn(TemplateLoader, &EngineConfig) -> Environment<'static> + Send + Sync>;

/// Adjusts the finished environment.
pub type EnvironmentCustomizer = Box<dyn Fn(&mut Environment<'static>) + Send + Sync>;

/// Programmatic extension points for environment setup.
#[derive(Default)]
pub struct Hooks {
    pub custom_environment: Option<EnvironmentFactory>,
    pub custom: Option<EnvironmentCustomizer>,
    /// Registered after `[engine.custom_filters]`; same names override.
    pub filters: Vec<(String, FilterSource)>,
}

impl Hooks {
    pub fn with_filter(mut self, name: &str, source: FilterSource) -> Self {
        self.filters.push((name.to_string(), source));
        self
    }
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("custom_environment", &self.custom_environment.is_some())
            .field("custom", &self.custom.is_some())
            .field("filters", &self.filters)
            .finish()
    }
}

/// The stock environment: `loader` serves templates and relative names.
pub fn default_environment(loader: TemplateLoader, config: &EngineConfig) -> Environment<'static> {
    let mut env = Environment::new();

    let source_loader = loader.clone();
    env.set_loader(move |name| {
        source_loader.load(name).map_err(|err| {
            Error::new(
                ErrorKind::InvalidOperation,
                format!("could not read template `{name}`"),
            )
            .with_source(err)
        })
    });
    env.set_path_join_callback(move |name, parent| Cow::Owned(loader.join(name, parent)));

    let escape = if config.autoescape {
        AutoEscape::Html
    } else {
        AutoEscape::None
    };
    env.set_auto_escape_callback(move |_| escape.clone());
    env.set_trim_blocks(config.trim_blocks);
    env.set_lstrip_blocks(config.lstrip_blocks);
    env.set_keep_trailing_newline(true);
    env
}

/// A configured environment plus the loader feeding it.
pub struct TemplateEngine {
    env: Environment<'static>,
    loader: TemplateLoader,
}

impl TemplateEngine {
    pub fn new(
        loader: TemplateLoader,
        config: &EngineConfig,
        hooks: &Hooks,
    ) -> Result<Self, EngineError> {
        let mut env = match &hooks.custom_environment {
            Some(factory) => factory(loader.clone(), config),
            None => default_environment(loader.clone(), config),
        };

        filters::register_catalog_defaults(&mut env)?;
        for (name, target) in &config.custom_filters {
            filters::register(&mut env, name, &FilterSource::Catalog(target.clone()))?;
        }
        for (name, source) in &hooks.filters {
            filters::register(&mut env, name, source)?;
        }
        env.add_filter("raw", minijinja::filters::safe);

        if let Some(custom) = &hooks.custom {
            custom(&mut env);
        }
        tracing::debug!(roots = ?loader.roots(), "template environment ready");
        Ok(Self { env, loader })
    }

    pub fn loader(&self) -> &TemplateLoader {
        &self.loader
    }

    pub fn environment(&self) -> &Environment<'static> {
        &self.env
    }
}

impl Renderer for TemplateEngine {
    fn render_string(
        &self,
        name: &str,
        source: &str,
        context: &Value,
    ) -> Result<String, EngineError> {
        self.env
            .render_named_str(name, source, context)
            .map_err(|err| EngineError::from_render(name, err))
    }
}

impl fmt::Debug for TemplateEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateEngine")
            .field("loader", &self.loader)
            .finish_non_exhaustive()
    }
}
