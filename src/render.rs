//! Per-page rendering.
//!
//! Two paths lead from a page to HTML:
//!
//! - **Composed**: the composer's source (possibly prefixed with `extends`)
//!   is rendered once under the page's path.
//! - **Static**: the page's own content is rendered first, in isolation.
//!   The result is then handed to the static wrapper layout as `contents`,
//!   next to the original page context as `context`. The wrapper is a plain
//!   second render, not template inheritance.
//!
//! Both paths share one [`build_context`].

use crate::classify::LayoutEntry;
use crate::engine::{EngineError, Renderer};
use crate::front_matter;
use crate::types::{File, FileMap, Metadata};
use minijinja::{Value, context};

/// Shallow merge of build metadata, the page's own attributes and the whole
/// file map (path → file attributes). Later sources win key by key.
pub fn build_context(metadata: &Metadata, page: &File, files: &FileMap) -> Value {
    let mut merged = metadata.clone();
    merged.extend(page.attributes());
    for (path, file) in files {
        merged.insert(path.clone(), serde_json::Value::Object(file.attributes()));
    }
    Value::from_serialize(&merged)
}

/// Render composed page source.
pub fn render_page<R: Renderer + ?Sized>(
    renderer: &R,
    path: &str,
    source: &str,
    context: &Value,
) -> Result<String, EngineError> {
    renderer.render_string(path, source, context)
}

/// Two-phase render of a static page into `wrapper`.
pub fn render_static<R: Renderer + ?Sized>(
    renderer: &R,
    path: &str,
    page: &File,
    wrapper: &LayoutEntry<'_>,
    context: &Value,
) -> Result<String, EngineError> {
    let text = page.text();
    let inner = renderer.render_string(path, &front_matter::strip(&text), context)?;

    let wrapper_text = wrapper.file.text();
    let wrapper_source = front_matter::strip(&wrapper_text);
    let outer = context! {
        context => context.clone(),
        contents => Value::from_safe_string(inner),
    };
    tracing::trace!(page = path, wrapper = wrapper.file_name, "rendering static wrapper");
    renderer.render_string(wrapper.file_name, &wrapper_source, &outer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::file_map;
    use serde_json::json;
    use std::cell::RefCell;

    /// Records calls and renders through a bare environment.
    #[derive(Default)]
    struct Recording {
        calls: RefCell<Vec<String>>,
    }

    impl Renderer for Recording {
        fn render_string(
            &self,
            name: &str,
            source: &str,
            context: &Value,
        ) -> Result<String, EngineError> {
            self.calls.borrow_mut().push(name.to_string());
            let mut env = minijinja::Environment::new();
            env.set_auto_escape_callback(|_| minijinja::AutoEscape::Html);
            env.render_named_str(name, source, context)
                .map_err(|err| EngineError::Render {
                    page: name.to_string(),
                    source: err,
                })
        }
    }

    fn entry<'a>(file_name: &'a str, file: &'a File) -> LayoutEntry<'a> {
        LayoutEntry {
            name: "static-layout",
            file_name,
            file,
        }
    }

    // =========================================================================
    // build_context
    // =========================================================================

    #[test]
    fn context_merges_metadata_then_page() {
        let mut metadata = Metadata::new();
        metadata.insert("title".into(), json!("Site"));
        metadata.insert("lang".into(), json!("en"));
        let page = File::new("body").with("title", "Page");
        let ctx = build_context(&metadata, &page, &FileMap::new());
        assert_eq!(ctx.get_attr("title").unwrap().as_str(), Some("Page"));
        assert_eq!(ctx.get_attr("lang").unwrap().as_str(), Some("en"));
        assert_eq!(ctx.get_attr("contents").unwrap().as_str(), Some("body"));
    }

    #[test]
    fn context_exposes_file_map_by_path() {
        let files = file_map(&[("about.twig", "About us")]);
        let ctx = build_context(&Metadata::new(), &File::new(""), &files);
        let about = ctx.get_attr("about.twig").unwrap();
        assert_eq!(about.get_attr("contents").unwrap().as_str(), Some("About us"));
    }

    #[test]
    fn file_map_entries_override_same_named_fields() {
        let mut metadata = Metadata::new();
        metadata.insert("index.twig".into(), json!("meta"));
        let files = file_map(&[("index.twig", "file")]);
        let ctx = build_context(&metadata, &File::new(""), &files);
        assert!(ctx.get_attr("index.twig").unwrap().as_str().is_none());
    }

    // =========================================================================
    // Static pipeline
    // =========================================================================

    #[test]
    fn static_page_wrapped_in_contents() {
        let page = File::new("Welcome");
        let wrapper = File::new("<div>{{ contents }}</div>");
        let r = Recording::default();
        let ctx = build_context(&Metadata::new(), &page, &FileMap::new());
        let wrapper = entry("layouts/static-layout.twig", &wrapper);
        let out = render_static(&r, "index.twig", &page, &wrapper, &ctx).unwrap();
        assert_eq!(out, "<div>Welcome</div>");
    }

    #[test]
    fn static_renders_inner_first_then_wrapper() {
        let page = File::new("{{ title }}").with("title", "T");
        let wrapper = File::new("[{{ contents }}]");
        let r = Recording::default();
        let ctx = build_context(&Metadata::new(), &page, &FileMap::new());
        let out = render_static(&r, "a.twig", &page, &entry("layouts/s.twig", &wrapper), &ctx).unwrap();
        assert_eq!(out, "[T]");
        assert_eq!(*r.calls.borrow(), vec!["a.twig", "layouts/s.twig"]);
    }

    #[test]
    fn static_inner_html_not_escaped_twice() {
        let page = File::new("<p>{{ x }}</p>").with("x", "<&>");
        let wrapper = File::new("<div>{{ contents }}</div>");
        let r = Recording::default();
        let ctx = build_context(&Metadata::new(), &page, &FileMap::new());
        let out = render_static(&r, "a.twig", &page, &entry("w.twig", &wrapper), &ctx).unwrap();
        assert_eq!(out, "<div><p>&lt;&amp;&gt;</p></div>");
    }

    #[test]
    fn static_wrapper_sees_original_context() {
        let page = File::new("---\ntitle: x\n---\nbody").with("title", "Hello");
        let wrapper = File::new("---\nlayoutName: w\n---\n<h1>{{ context.title }}</h1>{{ contents }}");
        let r = Recording::default();
        let ctx = build_context(&Metadata::new(), &page, &FileMap::new());
        let out = render_static(&r, "a.twig", &page, &entry("w.twig", &wrapper), &ctx).unwrap();
        assert_eq!(out, "<h1>Hello</h1>body");
    }

    #[test]
    fn render_page_uses_page_name() {
        let r = Recording::default();
        let out = render_page(&r, "pages/a.twig", "{{ 1 + 1 }}", &context! {}).unwrap();
        assert_eq!(out, "2");
        assert_eq!(*r.calls.borrow(), vec!["pages/a.twig"]);
    }
}
