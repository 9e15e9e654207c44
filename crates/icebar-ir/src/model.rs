use std::path::{Path, PathBuf};

use serde::Serialize;

/// A model under repair together with the fixed property-based oracle it is
/// checked against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelVariant {
    path: PathBuf,
    name: String,
    oracle_path: PathBuf,
}

impl ModelVariant {
    pub fn new(path: impl Into<PathBuf>, oracle_path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = derive_model_name(&path);
        Self {
            path,
            name,
            oracle_path: oracle_path.into(),
        }
    }

    /// A variant produced by the repair oracle; it keeps the original oracle.
    pub fn repaired(&self, path: impl Into<PathBuf>) -> Self {
        Self::new(path, self.oracle_path.clone())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn oracle_path(&self) -> &Path {
        &self.oracle_path
    }
}

fn derive_model_name(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("model")
        .to_string()
}
