//! Directory-backed template source.
//!
//! Templates live under `{root}/{consumer}/templates/`, possibly nested.
//! A named template is found by walking that tree; the entry point is
//! the `main.md` next to wherever the name was found, falling back to
//! the directory-level `main.md` when the name is absent.

use std::fs;
use std::path::{Path, PathBuf};

use colloquy_core::template::{ResolvedTemplate, TemplateSource};
use colloquy_types::error::TemplateError;

const ENTRY_NAME: &str = "main.md";

#[derive(Debug, Clone)]
pub struct DirTemplateSource {
    root: PathBuf,
}

impl DirTemplateSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl TemplateSource for DirTemplateSource {
    fn resolve(&self, consumer: &str, name: &str) -> Result<ResolvedTemplate, TemplateError> {
        let dir = self.root.join(consumer).join("templates");
        let file_name = if name.is_empty() || name.ends_with(".md") {
            name.to_string()
        } else {
            format!("{name}.md")
        };

        let sub_path = if file_name.is_empty() {
            None
        } else {
            find_file(&dir, &file_name)
        };
        let entry_dir = sub_path
            .as_deref()
            .and_then(Path::parent)
            .unwrap_or(dir.as_path());
        let entry = read_optional(&entry_dir.join(ENTRY_NAME));
        let sub = sub_path.as_deref().and_then(read_optional);

        if entry.is_none() && sub.is_none() {
            return Err(TemplateError::NotFound {
                consumer: consumer.to_string(),
                name: name.to_string(),
            });
        }
        Ok(ResolvedTemplate { entry, sub })
    }
}

/// Depth-first search for `file_name` under `dir`. Directories are
/// visited in name order so the match is deterministic.
fn find_file(dir: &Path, file_name: &str) -> Option<PathBuf> {
    let mut entries: Vec<PathBuf> = fs::read_dir(dir)
        .ok()?
        .flatten()
        .map(|entry| entry.path())
        .collect();
    entries.sort();

    for path in &entries {
        if path.is_file() && path.file_name().is_some_and(|n| n == file_name) {
            return Some(path.clone());
        }
    }
    for path in &entries {
        if path.is_dir() {
            if let Some(found) = find_file(path, file_name) {
                return Some(found);
            }
        }
    }
    None
}

fn read_optional(path: &Path) -> Option<String> {
    match fs::read_to_string(path) {
        Ok(text) => Some(text),
        Err(err) => {
            if err.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %path.display(), %err, "template unreadable, skipping");
            }
            None
        }
    }
}
