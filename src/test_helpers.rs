//! Shared test utilities for the layoutsmith test suite.
//!
//! File map builders plus lookups that panic with the available keys on a
//! miss, so a failing assertion says what the build actually produced.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let mut files = file_map(&[
//!     ("index.twig", "<h1>Hi</h1>"),
//!     ("layouts/default-layout.twig", "{% block body %}{% endblock %}"),
//! ]);
//! pipeline::run(&mut files, &options).unwrap();
//! assert_eq!(text_of(&files, "index.html"), "<h1>Hi</h1>");
//! ```

use crate::types::{File, FileMap};

// =========================================================================
// Builders
// =========================================================================

/// A file map of text files without metadata.
pub fn file_map(entries: &[(&str, &str)]) -> FileMap {
    entries
        .iter()
        .map(|(path, contents)| (path.to_string(), File::new(*contents)))
        .collect()
}

// =========================================================================
// Lookups: panic with a clear message on miss
// =========================================================================

/// The file at `path`. Panics if absent.
pub fn file_at<'a>(files: &'a FileMap, path: &str) -> &'a File {
    files.get(path).unwrap_or_else(|| {
        let keys: Vec<&str> = files.keys().map(String::as_str).collect();
        panic!("file '{path}' not found. Available: {keys:?}")
    })
}

/// Contents of the file at `path` as text. Panics if absent.
pub fn text_of(files: &FileMap, path: &str) -> String {
    file_at(files, path).text().into_owned()
}
