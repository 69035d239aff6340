//! Template loading for `extends`, `include` and `import`.
//!
//! The engine asks the loader for templates by name. Resolution order, first
//! hit wins:
//!
//! 0. Templates handed over by the pipeline itself (the layouts of the
//!    current file map), keyed by their original path.
//! 1. `root/name` for each configured root, in order.
//! 2. Package resolution under `<working dir>/<modules dir>` (`node_modules`
//!    by default), so themes installed as packages can be extended by name.
//! 3. Package resolution under the workspace root's modules dir, when the
//!    working directory belongs to a multi-package workspace.
//!
//! Whatever step hits, the source is returned with front matter stripped.
//!
//! Names starting with `./` or `../` are first joined against the template
//! that referenced them (see [`TemplateLoader::join`]). Every other name goes
//! through the order above unchanged, so a configured root always beats a
//! same-named file next to the referencing template.
//!
//! ## Package resolution
//!
//! For a name `theme/base.twig` under a modules dir `M`:
//!
//! ```text
//! M/theme/base.twig               exact file
//! M/theme/base.twig<ext>          for each configured extension
//! M/theme/base.twig/package.json  "main" entry, if the name is a directory
//! M/theme/base.twig/index<ext>    for each configured extension
//! ```
//!
//! Read or parse failures at these steps count as "not found here" and the
//! next step runs.
//!
//! ## Diagnostics
//!
//! Every resolved file is recorded as path → logical name, and names that
//! needed package resolution are additionally recorded as name → path. Both
//! maps live as long as the loader, and the pipeline builds a fresh loader
//! per build.

use crate::config::LoaderConfig;
use crate::front_matter;
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Where a template was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    /// Supplied in memory by the pipeline.
    Memory,
    /// Under one of the configured roots.
    Root(PathBuf),
    /// Through package resolution (working dir or workspace root).
    Package(PathBuf),
}

#[derive(Debug, Default)]
struct Diagnostics {
    paths_to_names: BTreeMap<PathBuf, String>,
    packages: BTreeMap<String, PathBuf>,
}

/// Resolves template names to source. Cheap to clone; clones share
/// diagnostics.
#[derive(Debug, Clone)]
pub struct TemplateLoader {
    roots: Vec<PathBuf>,
    working_dir: PathBuf,
    workspace_root: Option<PathBuf>,
    options: LoaderConfig,
    memory: Arc<BTreeMap<String, String>>,
    diagnostics: Arc<Mutex<Diagnostics>>,
}

/// The workspace root for `working_dir`: two directories up, if a workspace
/// manifest lives there.
pub fn detect_workspace_root(working_dir: &Path, manifest: &str) -> Option<PathBuf> {
    let candidate = working_dir.join("..").join("..");
    candidate.join(manifest).is_file().then_some(candidate)
}

impl TemplateLoader {
    /// `roots` are searched in order; relative roots resolve against
    /// `working_dir`. Pass `workspace_root` to enable the workspace fallback.
    pub fn new(
        roots: Vec<PathBuf>,
        working_dir: impl Into<PathBuf>,
        workspace_root: Option<PathBuf>,
        options: LoaderConfig,
    ) -> Self {
        let working_dir = working_dir.into();
        let roots = roots.into_iter().map(|r| working_dir.join(r)).collect();
        Self {
            roots,
            working_dir,
            workspace_root,
            options,
            memory: Arc::new(BTreeMap::new()),
            diagnostics: Arc::new(Mutex::new(Diagnostics::default())),
        }
    }

    /// Serve these `name → source` pairs before touching disk.
    pub fn with_templates(mut self, templates: BTreeMap<String, String>) -> Self {
        self.memory = Arc::new(templates);
        self
    }

    /// Configured roots, resolved against the working directory.
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Find `name` without reading it.
    pub fn resolve(&self, name: &str) -> Option<Origin> {
        if self.memory.contains_key(name) {
            return Some(Origin::Memory);
        }
        if let Some(path) = self.roots.iter().map(|r| r.join(name)).find(|p| p.is_file()) {
            return Some(Origin::Root(path));
        }

        let local = self.working_dir.join(&self.options.modules_dir);
        if let Some(path) = self.resolve_package(&local, name) {
            return Some(Origin::Package(path));
        }
        tracing::trace!(name, dir = %local.display(), "not found in local packages");

        let workspace = self.workspace_root.as_ref()?;
        let shared = workspace.join(&self.options.modules_dir);
        let found = self.resolve_package(&shared, name);
        if found.is_none() {
            tracing::trace!(name, dir = %shared.display(), "not found in workspace packages");
        }
        found.map(Origin::Package)
    }

    /// Resolve and read `name`. `Ok(None)` means no step found it.
    pub fn load(&self, name: &str) -> io::Result<Option<String>> {
        let Some(origin) = self.resolve(name) else {
            tracing::debug!(name, "template not found");
            return Ok(None);
        };
        let source = match &origin {
            Origin::Memory => match self.memory.get(name) {
                Some(source) => source.clone(),
                None => return Ok(None),
            },
            Origin::Root(path) => fs::read_to_string(path)?,
            Origin::Package(path) => match fs::read_to_string(path) {
                Ok(source) => source,
                Err(err) => {
                    tracing::debug!(name, path = %path.display(), %err, "package template unreadable");
                    return Ok(None);
                }
            },
        };
        self.record(name, &origin);
        tracing::debug!(name, origin = ?origin, "template resolved");
        Ok(Some(front_matter::strip(&source).into_owned()))
    }

    /// Resolve `to` relative to the template at `from`.
    ///
    /// Tries the working directory first, then each root. Under each base,
    /// `to` is looked up next to `from` (in `from`'s directory), then with
    /// `from` itself used as a directory.
    pub fn resolve_relative(&self, from: &str, to: &str) -> Option<PathBuf> {
        let from_path = Path::new(from);
        let from_dir = from_path.parent().unwrap_or(Path::new(""));
        std::iter::once(&self.working_dir)
            .chain(self.roots.iter())
            .flat_map(|base| {
                [
                    base.join(from_dir).join(to),
                    base.join(from_path).join(to),
                ]
            })
            .find(|candidate| candidate.is_file())
    }

    /// Name-join rule for the engine: pipeline templates and bare names
    /// pass through for root/package resolution; a `./` or `../` name found
    /// relative to `parent` becomes an absolute path.
    pub fn join(&self, name: &str, parent: &str) -> String {
        if self.memory.contains_key(name) || !is_relative(name) {
            return name.to_string();
        }
        match self.resolve_relative(parent, name) {
            Some(path) => path.to_string_lossy().into_owned(),
            None => name.to_string(),
        }
    }

    /// Every resolved file path with the name it was requested as.
    pub fn paths_to_names(&self) -> BTreeMap<PathBuf, String> {
        self.diagnostics
            .lock()
            .map(|d| d.paths_to_names.clone())
            .unwrap_or_default()
    }

    /// Names that needed package resolution, with the file they resolved to.
    pub fn packages(&self) -> BTreeMap<String, PathBuf> {
        self.diagnostics
            .lock()
            .map(|d| d.packages.clone())
            .unwrap_or_default()
    }

    fn record(&self, name: &str, origin: &Origin) {
        let Ok(mut diagnostics) = self.diagnostics.lock() else {
            return;
        };
        match origin {
            Origin::Memory => {}
            Origin::Root(path) => {
                diagnostics.paths_to_names.insert(path.clone(), name.to_string());
            }
            Origin::Package(path) => {
                diagnostics.paths_to_names.insert(path.clone(), name.to_string());
                diagnostics.packages.insert(name.to_string(), path.clone());
            }
        }
    }

    fn with_extensions(&self, base: &Path) -> impl Iterator<Item = PathBuf> {
        let base = base.as_os_str().to_owned();
        self.options.extensions.clone().into_iter().map(move |ext| {
            let mut candidate: OsString = base.clone();
            candidate.push(ext);
            PathBuf::from(candidate)
        })
    }

    fn resolve_file(&self, base: &Path) -> Option<PathBuf> {
        if base.is_file() {
            return Some(base.to_path_buf());
        }
        self.with_extensions(base).find(|p| p.is_file())
    }

    fn resolve_package(&self, modules_dir: &Path, name: &str) -> Option<PathBuf> {
        let base = modules_dir.join(name);
        if let Some(found) = self.resolve_file(&base) {
            return Some(found);
        }
        if !base.is_dir() {
            return None;
        }
        if let Some(main) = package_main(&base) {
            if let Some(found) = self.resolve_file(&base.join(main)) {
                return Some(found);
            }
        }
        self.with_extensions(&base.join("index")).find(|p| p.is_file())
    }
}

/// `./x` and `../x` are relative to the referencing template.
fn is_relative(name: &str) -> bool {
    name.starts_with("./") || name.starts_with("../")
}

/// The `main` entry of `dir/package.json`, if readable.
fn package_main(dir: &Path) -> Option<String> {
    let manifest = fs::read_to_string(dir.join("package.json")).ok()?;
    let value: serde_json::Value = serde_json::from_str(&manifest).ok()?;
    value.get("main")?.as_str().map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, contents: &str) -> PathBuf {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, contents).unwrap();
        path
    }

    fn loader(cwd: &Path, roots: &[&str]) -> TemplateLoader {
        TemplateLoader::new(
            roots.iter().map(PathBuf::from).collect(),
            cwd,
            None,
            LoaderConfig::default(),
        )
    }

    // =========================================================================
    // Roots
    // =========================================================================

    #[test]
    fn first_root_wins() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "a/base.twig", "from a");
        write(tmp.path(), "b/base.twig", "from b");
        let l = loader(tmp.path(), &["a", "b"]);
        assert_eq!(l.load("base.twig").unwrap().as_deref(), Some("from a"));
    }

    #[test]
    fn roots_resolve_against_working_dir() {
        let tmp = TempDir::new().unwrap();
        let l = loader(tmp.path(), &["a", "b"]);
        assert_eq!(l.roots(), [tmp.path().join("a"), tmp.path().join("b")]);
    }

    #[test]
    fn later_root_found_without_package_fallback() {
        let tmp = TempDir::new().unwrap();
        let in_b = write(tmp.path(), "b/only.twig", "from b");
        write(tmp.path(), "node_modules/only.twig", "from package");
        let l = loader(tmp.path(), &["a", "b"]);
        assert_eq!(l.load("only.twig").unwrap().as_deref(), Some("from b"));
        assert!(l.packages().is_empty());
        assert_eq!(l.paths_to_names().get(&in_b).map(String::as_str), Some("only.twig"));
    }

    #[test]
    fn directories_are_not_templates() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("a/partials")).unwrap();
        let l = loader(tmp.path(), &["a"]);
        assert_eq!(l.resolve("partials"), None);
    }

    #[test]
    fn loaded_source_has_front_matter_stripped() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "a/base.twig", "---\ntitle: x\n---\n<main></main>");
        let l = loader(tmp.path(), &["a"]);
        assert_eq!(l.load("base.twig").unwrap().as_deref(), Some("<main></main>"));
    }

    #[test]
    fn missing_everywhere_is_none() {
        let tmp = TempDir::new().unwrap();
        let l = loader(tmp.path(), &["a"]);
        assert_eq!(l.load("nope.twig").unwrap(), None);
        assert!(l.paths_to_names().is_empty());
    }

    // =========================================================================
    // Memory
    // =========================================================================

    #[test]
    fn memory_templates_shadow_disk() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "a/layouts/base.twig", "disk");
        let memory = BTreeMap::from([("layouts/base.twig".to_string(), "memory".to_string())]);
        let l = loader(tmp.path(), &["a"]).with_templates(memory);
        assert_eq!(l.resolve("layouts/base.twig"), Some(Origin::Memory));
        assert_eq!(l.load("layouts/base.twig").unwrap().as_deref(), Some("memory"));
        assert!(l.paths_to_names().is_empty());
    }

    // =========================================================================
    // Package resolution
    // =========================================================================

    #[test]
    fn package_exact_file() {
        let tmp = TempDir::new().unwrap();
        let path = write(tmp.path(), "node_modules/theme/base.twig", "themed");
        let l = loader(tmp.path(), &["a"]);
        assert_eq!(l.load("theme/base.twig").unwrap().as_deref(), Some("themed"));
        assert_eq!(l.packages().get("theme/base.twig"), Some(&path));
        assert!(l.paths_to_names().contains_key(&path));
    }

    #[test]
    fn package_extension_appended() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "node_modules/theme/base.twig", "themed");
        let l = loader(tmp.path(), &[]);
        assert!(matches!(l.resolve("theme/base"), Some(Origin::Package(_))));
    }

    #[test]
    fn package_main_entry() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "node_modules/theme/package.json", r#"{"main": "layout/site.twig"}"#);
        write(tmp.path(), "node_modules/theme/layout/site.twig", "site");
        let l = loader(tmp.path(), &[]);
        assert_eq!(l.load("theme").unwrap().as_deref(), Some("site"));
    }

    #[test]
    fn package_index_fallback() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "node_modules/theme/package.json", "not json");
        write(tmp.path(), "node_modules/theme/index.html", "index");
        let l = loader(tmp.path(), &[]);
        assert_eq!(l.load("theme").unwrap().as_deref(), Some("index"));
    }

    // =========================================================================
    // Workspace fallback
    // =========================================================================

    #[test]
    fn detects_workspace_two_levels_up() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "lerna.json", "{}");
        let pkg = tmp.path().join("packages/site");
        fs::create_dir_all(&pkg).unwrap();
        let root = detect_workspace_root(&pkg, "lerna.json").unwrap();
        assert!(root.join("lerna.json").is_file());
        assert_eq!(detect_workspace_root(tmp.path(), "lerna.json"), None);
    }

    #[test]
    fn workspace_packages_searched_last() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "lerna.json", "{}");
        write(tmp.path(), "node_modules/shared/base.twig", "shared");
        let pkg = tmp.path().join("packages/site");
        fs::create_dir_all(&pkg).unwrap();
        let workspace = detect_workspace_root(&pkg, "lerna.json");

        let without = TemplateLoader::new(vec![], &pkg, None, LoaderConfig::default());
        assert_eq!(without.load("shared/base.twig").unwrap(), None);

        let with = TemplateLoader::new(vec![], &pkg, workspace, LoaderConfig::default());
        assert_eq!(with.load("shared/base.twig").unwrap().as_deref(), Some("shared"));
        assert!(with.packages().contains_key("shared/base.twig"));
    }

    #[test]
    fn local_packages_beat_workspace() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "lerna.json", "{}");
        write(tmp.path(), "node_modules/theme/base.twig", "shared");
        write(tmp.path(), "packages/site/node_modules/theme/base.twig", "local");
        let pkg = tmp.path().join("packages/site");
        let workspace = detect_workspace_root(&pkg, "lerna.json");
        let l = TemplateLoader::new(vec![], &pkg, workspace, LoaderConfig::default());
        assert_eq!(l.load("theme/base.twig").unwrap().as_deref(), Some("local"));
    }

    // =========================================================================
    // Relative resolution
    // =========================================================================

    #[test]
    fn relative_sibling_of_from() {
        let tmp = TempDir::new().unwrap();
        let target = write(tmp.path(), "src/pages/partial.twig", "p");
        let l = loader(tmp.path(), &["src"]);
        assert_eq!(l.resolve_relative("pages/about.twig", "./partial.twig"), Some(target));
    }

    #[test]
    fn relative_parent_directory() {
        let tmp = TempDir::new().unwrap();
        let target = write(tmp.path(), "src/partial.twig", "p");
        write(tmp.path(), "src/pages/about.twig", "a");
        let l = loader(tmp.path(), &["src"]);
        let found = l.resolve_relative("pages/about.twig", "../partial.twig").unwrap();
        assert_eq!(found.canonicalize().unwrap(), target.canonicalize().unwrap());
    }

    #[test]
    fn relative_from_as_directory() {
        let tmp = TempDir::new().unwrap();
        let target = write(tmp.path(), "src/pages/partial.twig", "p");
        let l = loader(tmp.path(), &["src"]);
        assert_eq!(l.resolve_relative("pages", "./partial.twig"), Some(target));
    }

    #[test]
    fn relative_prefers_working_dir() {
        let tmp = TempDir::new().unwrap();
        let top = write(tmp.path(), "pages/partial.twig", "top");
        write(tmp.path(), "src/pages/partial.twig", "src");
        let l = loader(tmp.path(), &["src"]);
        assert_eq!(l.resolve_relative("pages/about.twig", "./partial.twig"), Some(top));
    }

    #[test]
    fn relative_miss_is_none() {
        let tmp = TempDir::new().unwrap();
        let l = loader(tmp.path(), &["src"]);
        assert_eq!(l.resolve_relative("pages/about.twig", "./partial.twig"), None);
    }

    #[test]
    fn join_keeps_memory_names() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "layouts/layouts/base.twig", "decoy");
        let memory = BTreeMap::from([("layouts/base.twig".to_string(), String::new())]);
        let l = loader(tmp.path(), &[]).with_templates(memory);
        assert_eq!(l.join("layouts/base.twig", "layouts/x.twig"), "layouts/base.twig");
        assert_eq!(l.join("other.twig", "index.twig"), "other.twig");
    }

    #[test]
    fn join_leaves_bare_names_to_roots() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "nav.twig", "from working dir");
        write(tmp.path(), "src/pages/partials/nav.twig", "next to page");
        write(tmp.path(), "src/partials/nav.twig", "from root");
        let l = loader(tmp.path(), &["src"]);
        assert_eq!(l.join("nav.twig", "index.twig"), "nav.twig");
        assert_eq!(l.join("partials/nav.twig", "pages/about.twig"), "partials/nav.twig");
        assert_eq!(l.load("partials/nav.twig").unwrap().as_deref(), Some("from root"));
    }

    #[test]
    fn join_resolves_dot_names_against_parent() {
        let tmp = TempDir::new().unwrap();
        let target = write(tmp.path(), "src/pages/partials/nav.twig", "next to page");
        let l = loader(tmp.path(), &["src"]);
        let joined = l.join("./partials/nav.twig", "pages/about.twig");
        assert_eq!(PathBuf::from(&joined), target);
        assert_eq!(l.load(&joined).unwrap().as_deref(), Some("next to page"));
    }

    #[test]
    fn join_keeps_unresolved_dot_names() {
        let tmp = TempDir::new().unwrap();
        let l = loader(tmp.path(), &["src"]);
        assert_eq!(l.join("./missing.twig", "index.twig"), "./missing.twig");
    }
}
