//! Corpus discovery. Every `.md` file under the root, read up front and
//! returned in path order so that compiler runs diff cleanly.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{CompileError, Result};

const MARKDOWN_EXT: &str = "md";

#[derive(Debug, Clone)]
pub struct SourceDocument {
    /// Path relative to the corpus root's parent, `/`-separated
    /// (e.g. `murphys-laws/technology.md`).
    pub path: String,
    pub text: String,
}

impl SourceDocument {
    pub fn new(path: impl Into<String>, text: impl Into<String>) -> Self {
        SourceDocument {
            path: path.into(),
            text: text.into(),
        }
    }

    /// File name without the extension.
    pub fn basename(&self) -> &str {
        let name = self.path.rsplit('/').next().unwrap_or(&self.path);
        name.strip_suffix(".md").unwrap_or(name)
    }
}

/// Recursively list markdown files under `root`, sorted.
pub fn list_markdown_files(root: &Path) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        return Err(CompileError::NotADirectory(root.to_path_buf()));
    }
    let mut out = Vec::new();
    walk(root, &mut out)?;
    // Whole-path string order, so `a-b.md` sorts before `a/x.md`.
    out.sort_by_cached_key(|p| p.to_string_lossy().into_owned());
    Ok(out)
}

fn walk(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    let unreadable = |source| CompileError::UnreadableDir {
        path: dir.to_path_buf(),
        source,
    };
    for entry in fs::read_dir(dir).map_err(unreadable)? {
        let path = entry.map_err(unreadable)?.path();
        if path.is_dir() {
            walk(&path, out)?;
        } else if path.extension().and_then(|s| s.to_str()) == Some(MARKDOWN_EXT) {
            out.push(path);
        }
    }
    Ok(())
}

/// Discover and read the whole corpus. Any unreadable directory or file
/// aborts the run before a destination is touched.
pub fn load_corpus(root: &Path) -> Result<Vec<SourceDocument>> {
    let root = root
        .canonicalize()
        .map_err(|source| CompileError::UnreadableDir {
            path: root.to_path_buf(),
            source,
        })?;
    let base = root.parent().unwrap_or(&root).to_path_buf();

    let paths = list_markdown_files(&root)?;
    let mut docs = Vec::with_capacity(paths.len());
    for path in paths {
        let text = fs::read_to_string(&path).map_err(|source| CompileError::UnreadableFile {
            path: path.clone(),
            source,
        })?;
        let rel = relative_path(&path, &base);
        debug!(path = %rel, bytes = text.len(), "loaded document");
        docs.push(SourceDocument::new(rel, text));
    }
    Ok(docs)
}

fn relative_path(path: &Path, base: &Path) -> String {
    let rel = path.strip_prefix(base).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
