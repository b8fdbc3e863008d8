use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

pub const DEFAULT_SOURCE_NAME: &str = "test.c";
pub const DEFAULT_OBJECT_NAME: &str = "test.o";
pub const DEFAULT_EXE_NAME: &str = "test";

/// Fixed names of the generated source and build outputs inside the work
/// directory. One working set per directory; concurrent runs against the same
/// directory are not supported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactLayout {
    pub work_dir: PathBuf,
    pub source_name: String,
    pub object_name: String,
    pub exe_name: String,
}

impl ArtifactLayout {
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
            source_name: DEFAULT_SOURCE_NAME.to_string(),
            object_name: DEFAULT_OBJECT_NAME.to_string(),
            exe_name: DEFAULT_EXE_NAME.to_string(),
        }
    }

    pub fn source_path(&self) -> PathBuf {
        self.work_dir.join(&self.source_name)
    }

    pub fn object_path(&self) -> PathBuf {
        self.work_dir.join(&self.object_name)
    }

    pub fn exe_path(&self) -> PathBuf {
        self.work_dir.join(&self.exe_name)
    }

    /// Overwrites the generated source file.
    pub fn write_source(&self, text: &str) -> Result<PathBuf> {
        let path = self.source_path();
        std::fs::write(&path, text.as_bytes())
            .with_context(|| format!("write generated source: {}", path.display()))?;
        tracing::debug!(path = %path.display(), bytes = text.len(), "wrote generated source");
        Ok(path)
    }

    /// Removes the object file and the executable so the build tool has to
    /// regenerate both, whatever its timestamp resolution. Missing files are
    /// fine. Returns the paths that were actually removed.
    pub fn invalidate(&self) -> Result<Vec<PathBuf>> {
        let mut removed = Vec::new();
        for path in [self.object_path(), self.exe_path()] {
            if remove_if_exists(&path)? {
                removed.push(path);
            }
        }
        Ok(removed)
    }
}

pub fn remove_if_exists(path: &Path) -> Result<bool> {
    match std::fs::remove_file(path) {
        Ok(()) => {
            tracing::debug!(path = %path.display(), "removed stale artifact");
            Ok(true)
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err).with_context(|| format!("remove artifact: {}", path.display())),
    }
}
