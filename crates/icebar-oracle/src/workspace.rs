//! Working files handed to oracle processes.
//!
//! Every artifact is deleted and fully rewritten before the oracle call that
//! depends on it, so an oracle never starts against a partially written or
//! stale input.

use std::fs;
use std::path::{Path, PathBuf};

use icebar_ir::model::ModelVariant;
use icebar_ir::test_case::PropertyTest;
use thiserror::Error;

pub const TESTS_FILE_NAME: &str = "tests.als";

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("{action} `{path}`: {source}")]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("decoding `{path}`: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("`{path}`: {source}")]
    MalformedTest {
        path: PathBuf,
        #[source]
        source: icebar_ir::test_case::TestError,
    },
}

impl ArtifactError {
    pub(crate) fn io(action: &'static str, path: &Path, source: std::io::Error) -> Self {
        ArtifactError::Io {
            action,
            path: path.to_path_buf(),
            source,
        }
    }
}

/// A directory owned by one search run.
#[derive(Debug, Clone)]
pub struct OracleWorkspace {
    root: PathBuf,
    fixes: usize,
}

impl OracleWorkspace {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, ArtifactError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| ArtifactError::io("creating", &root, e))?;
        Ok(Self { root, fixes: 0 })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn tests_file(&self) -> PathBuf {
        self.root.join(TESTS_FILE_NAME)
    }

    /// Rewrite the tests file with `tests`, in order.
    pub fn write_tests_file(&self, tests: &[PropertyTest]) -> Result<PathBuf, ArtifactError> {
        let mut contents = String::new();
        for test in tests {
            contents.push_str(&test.render());
            contents.push('\n');
        }
        let path = self.tests_file();
        replace_file(&path, &contents)?;
        Ok(path)
    }

    pub fn merged_model_file(&self, model: &ModelVariant) -> PathBuf {
        self.root.join(format!("{}_with_oracle.als", model.name()))
    }

    /// Rewrite the merged model+oracle file checked by the verification oracle.
    pub fn write_merged_model(&self, model: &ModelVariant) -> Result<PathBuf, ArtifactError> {
        let model_text = read_text(model.path())?;
        let oracle_text = read_text(model.oracle_path())?;
        let mut contents = model_text;
        if !contents.ends_with('\n') {
            contents.push('\n');
        }
        contents.push('\n');
        contents.push_str(&oracle_text);
        let path = self.merged_model_file(model);
        replace_file(&path, &contents)?;
        Ok(path)
    }

    /// Empty (or create) a subdirectory used as an oracle output directory.
    pub fn fresh_dir(&self, name: &str) -> Result<PathBuf, ArtifactError> {
        let dir = self.root.join(name);
        if dir.exists() {
            fs::remove_dir_all(&dir).map_err(|e| ArtifactError::io("removing", &dir, e))?;
        }
        fs::create_dir_all(&dir).map_err(|e| ArtifactError::io("creating", &dir, e))?;
        Ok(dir)
    }

    /// Copy a repaired model out of a transient output directory so later
    /// oracle calls cannot clobber it.
    pub fn persist_fix(&mut self, repaired: &Path, name: &str) -> Result<PathBuf, ArtifactError> {
        let dir = self.root.join("fixes");
        fs::create_dir_all(&dir).map_err(|e| ArtifactError::io("creating", &dir, e))?;
        self.fixes += 1;
        let target = dir.join(format!("{name}_fix_{}.als", self.fixes));
        fs::copy(repaired, &target).map_err(|e| ArtifactError::io("copying", repaired, e))?;
        Ok(target)
    }
}

pub(crate) fn read_text(path: &Path) -> Result<String, ArtifactError> {
    fs::read_to_string(path).map_err(|e| ArtifactError::io("reading", path, e))
}

/// Delete `path` if present, then write `contents` through a sibling
/// temporary file and rename it into place.
pub(crate) fn replace_file(path: &Path, contents: &str) -> Result<(), ArtifactError> {
    if path.exists() {
        fs::remove_file(path).map_err(|e| ArtifactError::io("removing", path, e))?;
    }
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, contents).map_err(|e| ArtifactError::io("writing", &tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| ArtifactError::io("renaming", &tmp, e))?;
    Ok(())
}
