//! Template Sources - Where View and Layout Text Comes From
//!
//! The renderer only asks two things of a source: does this path exist,
//! and what text does it hold.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub trait TemplateSource {
    fn exists(&self, path: &Path) -> bool;
    fn load(&self, path: &Path) -> Result<String, io::Error>;
}

/// Reads templates straight from disk. Paths handed in by the renderer
/// already include the views root.
#[derive(Debug, Clone, Default)]
pub struct FsTemplateSource;

impl FsTemplateSource {
    pub fn new() -> Self {
        Self
    }
}

impl TemplateSource for FsTemplateSource {
    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn load(&self, path: &Path) -> Result<String, io::Error> {
        fs::read_to_string(path)
    }
}

/// In-memory template registry, keyed by full template path.
#[derive(Debug, Clone, Default)]
pub struct MemoryTemplateSource {
    templates: HashMap<PathBuf, String>,
}

impl MemoryTemplateSource {
    pub fn new() -> Self {
        Self { templates: HashMap::new() }
    }

    /// Load every file under `dir` recursively, keyed by its path.
    pub fn load_from_dir(dir: &Path) -> Result<Self, io::Error> {
        let mut registry = Self::new();
        if dir.exists() {
            registry.load_tree(dir)?;
        }
        Ok(registry)
    }

    fn load_tree(&mut self, dir: &Path) -> Result<(), io::Error> {
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_dir() {
                self.load_tree(&path)?;
            } else {
                let content = fs::read_to_string(&path)?;
                self.templates.insert(path, content);
            }
        }
        Ok(())
    }

    pub fn register(&mut self, path: impl Into<PathBuf>, source: impl Into<String>) {
        self.templates.insert(path.into(), source.into());
    }

    pub fn list(&self) -> Vec<&Path> {
        let mut paths: Vec<_> = self.templates.keys().map(PathBuf::as_path).collect();
        paths.sort();
        paths
    }
}

impl TemplateSource for MemoryTemplateSource {
    fn exists(&self, path: &Path) -> bool {
        self.templates.contains_key(path)
    }

    fn load(&self, path: &Path) -> Result<String, io::Error> {
        self.templates.get(path).cloned().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("{} is not registered", path.display()))
        })
    }
}
