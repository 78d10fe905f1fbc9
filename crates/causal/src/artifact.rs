//! On-disk model artifacts.
//!
//! Every call to [`persist`] creates a fresh directory named
//! `intervention-XXXXXX` inside the model directory and writes the model
//! there as JSON. Directories are never reused, so concurrent writers need
//! no locking.

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::info;

use crate::error::CausalError;

pub const ARTIFACT_PREFIX: &str = "intervention-";
pub const ESTIMATOR_FILE: &str = "estimator.json";

fn artifact_error(path: &Path, reason: impl ToString) -> CausalError {
    CausalError::Artifact {
        path: path.display().to_string(),
        reason: reason.to_string(),
    }
}

/// Write `model` under a new directory in `model_directory`, creating the
/// latter if needed. Returns the new directory.
pub fn persist<M: Serialize>(model_directory: &Path, model: &M) -> Result<PathBuf, CausalError> {
    fs::create_dir_all(model_directory).map_err(|e| artifact_error(model_directory, e))?;
    let dir = tempfile::Builder::new()
        .prefix(ARTIFACT_PREFIX)
        .tempdir_in(model_directory)
        .map_err(|e| artifact_error(model_directory, e))?
        .keep();
    let file = dir.join(ESTIMATOR_FILE);
    let json = serde_json::to_vec(model).map_err(|e| artifact_error(&file, e))?;
    fs::write(&file, json).map_err(|e| artifact_error(&file, e))?;
    info!(path = %dir.display(), "model artifact written");
    Ok(dir)
}

/// Read back a model written by [`persist`].
pub fn load<M: DeserializeOwned>(artifact_dir: &Path) -> Result<M, CausalError> {
    let file = artifact_dir.join(ESTIMATOR_FILE);
    let bytes = fs::read(&file).map_err(|e| artifact_error(&file, e))?;
    serde_json::from_slice(&bytes).map_err(|e| artifact_error(&file, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_each_persist_gets_a_new_directory() {
        let root = tempfile::tempdir().unwrap();
        let model = BTreeMap::from([("theta".to_string(), 1.5)]);
        let a = persist(root.path(), &model).unwrap();
        let b = persist(root.path(), &model).unwrap();
        assert_ne!(a, b);
        for dir in [&a, &b] {
            let name = dir.file_name().unwrap().to_string_lossy().to_string();
            assert!(name.starts_with(ARTIFACT_PREFIX));
            assert_eq!(load::<BTreeMap<String, f64>>(dir).unwrap(), model);
        }
    }

    #[test]
    fn test_creates_missing_model_directory() {
        let root = tempfile::tempdir().unwrap();
        let nested = root.path().join("a").join("b");
        let dir = persist(&nested, &vec![1, 2, 3]).unwrap();
        assert!(dir.starts_with(&nested));
    }

    #[test]
    fn test_load_missing_file() {
        let root = tempfile::tempdir().unwrap();
        assert!(matches!(
            load::<Vec<u8>>(root.path()),
            Err(CausalError::Artifact { .. })
        ));
    }
}
