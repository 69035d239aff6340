//! One build pass over a file map.
//!
//! ```text
//! classify ──▶ validate ──▶ plan every page ──▶ render every page ──▶ apply
//!                                                                      │
//!                                    remove layout-only files ◀────────┘
//! ```
//!
//! Everything that can fail on configuration (bad patterns, unknown layout
//! names, a page needing a layout nothing registers) fails during planning,
//! before the first render. Rendering reads an untouched file map and only
//! produces [`Mutation`]s; they are applied once every page has rendered. A
//! failed build leaves the file map exactly as it was.

use crate::classify::{self, Classification, LayoutEntry, LayoutError};
use crate::compose::{self, Composition, LayoutChoice, LayoutSettings};
use crate::config::ComposeConfig;
use crate::engine::{EngineError, Hooks, Renderer, TemplateEngine};
use crate::loader::{TemplateLoader, detect_workspace_root};
use crate::render;
use crate::types::{File, FileMap};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BuildError {
    #[error(transparent)]
    Layout(#[from] LayoutError),
    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Inputs to one build pass besides the file map.
#[derive(Debug)]
pub struct BuildOptions {
    pub config: ComposeConfig,
    /// Source root added to the template roots (unless configured away).
    pub source_root: PathBuf,
    /// Base for relative roots and local package resolution.
    pub working_dir: PathBuf,
    /// Workspace root for the shared-package fallback, if any.
    pub workspace_root: Option<PathBuf>,
    pub hooks: Hooks,
}

impl BuildOptions {
    /// Options for a project at `working_dir`, with the workspace root
    /// detected from the configured manifest.
    pub fn new(config: ComposeConfig, working_dir: impl Into<PathBuf>) -> Self {
        let working_dir = working_dir.into();
        let workspace_root =
            detect_workspace_root(&working_dir, &config.engine.loader.workspace_manifest);
        Self {
            source_root: config.source.clone(),
            config,
            working_dir,
            workspace_root,
            hooks: Hooks::default(),
        }
    }

    pub fn with_hooks(mut self, hooks: Hooks) -> Self {
        self.hooks = hooks;
        self
    }

    /// A fresh loader for one build, serving `templates` from memory.
    fn loader(&self, templates: BTreeMap<String, String>) -> TemplateLoader {
        TemplateLoader::new(
            self.config.engine.search_paths(&self.source_root),
            &self.working_dir,
            self.workspace_root.clone(),
            self.config.engine.loader.clone(),
        )
        .with_templates(templates)
    }
}

/// A staged rename plus content replacement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mutation {
    pub from: String,
    pub to: String,
    pub contents: Vec<u8>,
}

/// Apply staged mutations. Every source is taken out before any target is
/// written, so one page's new name never clobbers another page mid-batch.
pub fn apply(files: &mut FileMap, mutations: Vec<Mutation>) {
    let taken: Vec<(Mutation, File)> = mutations
        .into_iter()
        .filter_map(|m| {
            let file = files.remove(&m.from)?;
            Some((m, file))
        })
        .collect();
    for (mutation, mut file) in taken {
        file.contents = mutation.contents;
        files.insert(mutation.to, file);
    }
}

/// `pages/about.twig` → `pages/about.html`.
pub fn html_path(path: &str) -> String {
    Path::new(path)
        .with_extension("html")
        .to_string_lossy()
        .into_owned()
}

/// What happened to one page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageReport {
    pub source: String,
    pub output: String,
    pub choice: LayoutChoice,
}

/// Summary of a finished build pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BuildReport {
    pub pages: Vec<PageReport>,
    /// Layout registry names, aliases included.
    pub layouts: Vec<String>,
    pub removed_layouts: Vec<String>,
    /// Template files the loader read from disk, with the name they were
    /// requested as.
    pub resolved_templates: BTreeMap<PathBuf, String>,
    /// Names that needed package resolution.
    pub packages: BTreeMap<String, PathBuf>,
}

#[derive(Debug)]
enum Plan<'a> {
    Composed(Composition),
    Static(LayoutEntry<'a>),
}

#[derive(Debug)]
struct PlannedPage<'a> {
    path: &'a str,
    file: &'a File,
    plan: Plan<'a>,
}

impl PlannedPage<'_> {
    fn choice(&self) -> LayoutChoice {
        match &self.plan {
            Plan::Composed(c) => c.choice.clone(),
            Plan::Static(entry) => LayoutChoice::Static(entry.name.to_string()),
        }
    }
}

fn layout_settings(config: &ComposeConfig) -> LayoutSettings<'_> {
    LayoutSettings {
        default_layout: &config.default_layout,
        static_layout: &config.static_layout,
    }
}

/// Classify `files` and validate the configured layout names.
pub fn check<'a>(
    files: &'a FileMap,
    config: &ComposeConfig,
) -> Result<Classification<'a>, LayoutError> {
    let classification = classify::classify(
        files,
        &config.layouts,
        &config.pages,
        &config.default_layout,
    )?;
    if classification.registry.is_empty() {
        tracing::debug!("no layouts matched the layout patterns");
    }
    classify::validate(
        &classification.registry,
        &config.default_layout,
        &config.static_layout,
    )?;
    Ok(classification)
}

fn plan<'a>(
    classification: &Classification<'a>,
    settings: LayoutSettings<'_>,
) -> Result<Vec<PlannedPage<'a>>, LayoutError> {
    classification
        .pages
        .iter()
        .map(|&(path, file)| {
            let plan = if file.is_static() {
                Plan::Static(*compose::static_entry(path, &classification.registry, settings)?)
            } else {
                Plan::Composed(compose::compose(path, file, &classification.registry, settings)?)
            };
            Ok(PlannedPage { path, file, plan })
        })
        .collect()
}

/// Layouts and per-page decisions for a file map, without rendering.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CheckReport {
    /// (registry name, original path), aliases included.
    pub layouts: Vec<(String, String)>,
    pub pages: Vec<PageReport>,
}

/// Classify, validate and plan every page. Nothing is rendered.
pub fn check_plan(files: &FileMap, config: &ComposeConfig) -> Result<CheckReport, LayoutError> {
    let classification = check(files, config)?;
    let planned = plan(&classification, layout_settings(config))?;
    let registry = &classification.registry;
    let layouts = registry
        .names()
        .filter_map(|name| registry.get(name).map(|e| (name.to_string(), e.file_name.to_string())))
        .collect();
    let pages = planned
        .iter()
        .map(|page| PageReport {
            source: page.path.to_string(),
            output: html_path(page.path),
            choice: page.choice(),
        })
        .collect();
    Ok(CheckReport { layouts, pages })
}

fn render_planned<R: Renderer + ?Sized>(
    renderer: &R,
    page: &PlannedPage<'_>,
    files: &FileMap,
    options: &BuildOptions,
) -> Result<String, EngineError> {
    let context = render::build_context(&options.config.metadata, page.file, files);
    match &page.plan {
        Plan::Composed(c) => render::render_page(renderer, page.path, &c.source, &context),
        Plan::Static(wrapper) => {
            render::render_static(renderer, page.path, page.file, wrapper, &context)
        }
    }
}

/// Run one build pass with the stock engine.
pub fn run(files: &mut FileMap, options: &BuildOptions) -> Result<BuildReport, BuildError> {
    run_with(files, options, |templates| {
        TemplateEngine::new(options.loader(templates), &options.config.engine, &options.hooks)
    })
}

/// Run one build pass with an engine built by `make_engine` from the layout
/// sources (original path → text).
pub fn run_with<E, F>(
    files: &mut FileMap,
    options: &BuildOptions,
    make_engine: F,
) -> Result<BuildReport, BuildError>
where
    E: Renderer + Diagnose,
    F: FnOnce(BTreeMap<String, String>) -> Result<E, EngineError>,
{
    let (mutations, layout_paths, mut report) = {
        let classification = check(files, &options.config)?;
        let planned = plan(&classification, layout_settings(&options.config))?;
        tracing::debug!(
            pages = planned.len(),
            layouts = classification.layout_paths.len(),
            "planned build"
        );

        let templates = classification
            .layout_paths
            .iter()
            .filter_map(|&path| files.get(path).map(|f| (path.to_string(), f.text().into_owned())))
            .collect();
        let engine = make_engine(templates)?;

        let mut mutations = Vec::with_capacity(planned.len());
        let mut pages = Vec::with_capacity(planned.len());
        for page in &planned {
            let rendered = render_planned(&engine, page, files, options)?;
            let output = html_path(page.path);
            tracing::debug!(page = page.path, output = %output, choice = %page.choice(), "rendered");
            pages.push(PageReport {
                source: page.path.to_string(),
                output: output.clone(),
                choice: page.choice(),
            });
            mutations.push(Mutation {
                from: page.path.to_string(),
                to: output,
                contents: rendered.into_bytes(),
            });
        }

        let layout_paths: Vec<String> =
            classification.layout_paths.iter().map(|p| p.to_string()).collect();
        let (resolved_templates, packages) = engine.diagnostics();
        let report = BuildReport {
            pages,
            layouts: classification.registry.names().map(String::from).collect(),
            removed_layouts: Vec::new(),
            resolved_templates,
            packages,
        };
        (mutations, layout_paths, report)
    };

    apply(files, mutations);
    for path in layout_paths {
        if files.remove(&path).is_some() {
            report.removed_layouts.push(path);
        }
    }
    Ok(report)
}

/// Loader diagnostics an engine can report after a build.
pub trait Diagnose {
    /// (resolved file → requested name, package name → resolved file)
    fn diagnostics(&self) -> (BTreeMap<PathBuf, String>, BTreeMap<String, PathBuf>) {
        (BTreeMap::new(), BTreeMap::new())
    }
}

impl Diagnose for TemplateEngine {
    fn diagnostics(&self) -> (BTreeMap<PathBuf, String>, BTreeMap<String, PathBuf>) {
        (self.loader().paths_to_names(), self.loader().packages())
    }
}
