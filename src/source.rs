//! Filesystem glue for the CLI: source directory → [`FileMap`] → destination.
//!
//! Keys are paths relative to the source directory with `/` separators,
//! regardless of platform. Text files have their front matter lifted into
//! metadata and stripped from the contents; anything that is not UTF-8 is
//! carried through as raw bytes.

use crate::front_matter::{self, FrontMatterError};
use crate::types::{File, FileMap};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("Source directory not found: {0}")]
    NotFound(PathBuf),
    #[error("Invalid front matter in {path}: {source}")]
    FrontMatter {
        path: PathBuf,
        #[source]
        source: FrontMatterError,
    },
}

/// Read every file under `dir` into a file map.
pub fn read_source(dir: &Path) -> Result<FileMap, SourceError> {
    if !dir.is_dir() {
        return Err(SourceError::NotFound(dir.to_path_buf()));
    }

    let mut files = FileMap::new();
    for entry in WalkDir::new(dir).follow_links(true).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let Ok(rel) = path.strip_prefix(dir) else {
            continue;
        };
        let key = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        let file = read_file(path)?;
        files.insert(key, file);
    }
    tracing::debug!(dir = %dir.display(), files = files.len(), "read source");
    Ok(files)
}

fn read_file(path: &Path) -> Result<File, SourceError> {
    let bytes = fs::read(path)?;
    let text = match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(err) => return Ok(File::new(err.into_bytes())),
    };
    let (metadata, body) =
        front_matter::parse(&text).map_err(|source| SourceError::FrontMatter {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(File {
        contents: body.as_bytes().to_vec(),
        metadata,
    })
}

/// Write every file in `files` under `dest`. With `clean`, `dest` is emptied
/// first.
pub fn write_output(files: &FileMap, dest: &Path, clean: bool) -> Result<(), SourceError> {
    if clean && dest.exists() {
        fs::remove_dir_all(dest)?;
    }
    fs::create_dir_all(dest)?;
    for (key, file) in files {
        let target = dest.join(key);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&target, &file.contents)?;
    }
    tracing::debug!(dest = %dest.display(), files = files.len(), "wrote output");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LAYOUT_KEY;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, contents: &[u8]) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    // =========================================================================
    // read_source
    // =========================================================================

    #[test]
    fn keys_are_slash_separated_relative_paths() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "index.twig", b"hi");
        write(tmp.path(), "layouts/base.twig", b"base");
        let files = read_source(tmp.path()).unwrap();
        let keys: Vec<&str> = files.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["index.twig", "layouts/base.twig"]);
    }

    #[test]
    fn front_matter_lifted_into_metadata() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "index.twig", b"---\nlayout: none\nstatic: true\n---\n<h1>Hi</h1>");
        let files = read_source(tmp.path()).unwrap();
        let file = &files["index.twig"];
        assert_eq!(file.text(), "<h1>Hi</h1>");
        assert_eq!(file.metadata[LAYOUT_KEY], "none");
        assert!(file.is_static());
    }

    #[test]
    fn binary_files_kept_raw() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "logo.png", &[0x89, b'P', b'N', b'G', 0xff]);
        let files = read_source(tmp.path()).unwrap();
        assert_eq!(files["logo.png"].contents, vec![0x89, b'P', b'N', b'G', 0xff]);
        assert!(files["logo.png"].metadata.is_empty());
    }

    #[test]
    fn invalid_front_matter_names_file() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "bad.twig", b"---\n- a\n- b\n---\nx");
        let err = read_source(tmp.path()).unwrap_err();
        assert!(matches!(err, SourceError::FrontMatter { .. }));
        assert!(err.to_string().contains("bad.twig"));
    }

    #[test]
    fn missing_source_dir() {
        let tmp = TempDir::new().unwrap();
        let err = read_source(&tmp.path().join("nope")).unwrap_err();
        assert!(matches!(err, SourceError::NotFound(_)));
    }

    // =========================================================================
    // write_output
    // =========================================================================

    #[test]
    fn writes_nested_files() {
        let tmp = TempDir::new().unwrap();
        let mut files = FileMap::new();
        files.insert("pages/about.html".into(), File::new("about"));
        let dest = tmp.path().join("dist");
        write_output(&files, &dest, true).unwrap();
        assert_eq!(fs::read_to_string(dest.join("pages/about.html")).unwrap(), "about");
    }

    #[test]
    fn clean_removes_stale_output() {
        let tmp = TempDir::new().unwrap();
        let dest = tmp.path().join("dist");
        write(&dest, "stale.html", b"old");
        write_output(&FileMap::new(), &dest, true).unwrap();
        assert!(!dest.join("stale.html").exists());
        assert!(dest.is_dir());
    }

    #[test]
    fn no_clean_keeps_existing_output() {
        let tmp = TempDir::new().unwrap();
        let dest = tmp.path().join("dist");
        write(&dest, "keep.html", b"old");
        write_output(&FileMap::new(), &dest, false).unwrap();
        assert!(dest.join("keep.html").exists());
    }
}
