//! On-disk model artifacts: network weights, scaler state and a manifest
//! binding the two.
//!
//! Files are written to temporaries and renamed into place, manifest last.
//! The manifest records a SHA-256 digest of each companion file, so a
//! reader that races a writer sees a digest mismatch instead of pairing
//! new weights with an old scaler. The store treats the weights as opaque
//! safetensors bytes.

use crate::domain::errors::ForecastError;
use crate::domain::ml::{Architecture, MinMaxScaler, ModelManifest};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const MODEL_FILE: &str = "lstm_model.safetensors";
pub const SCALER_FILE: &str = "scaler.json";
pub const MANIFEST_FILE: &str = "manifest.json";

/// A verified artifact set as read from disk
#[derive(Debug, Clone)]
pub struct StoredArtifacts {
    pub weights: Vec<u8>,
    pub scaler: MinMaxScaler,
    pub manifest: ModelManifest,
}

/// Reads and writes the artifact set of the most recent training run.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn model_path(&self) -> PathBuf {
        self.dir.join(MODEL_FILE)
    }

    pub fn scaler_path(&self) -> PathBuf {
        self.dir.join(SCALER_FILE)
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.dir.join(MANIFEST_FILE)
    }

    /// True when all three artifacts are present.
    pub fn exists(&self) -> bool {
        self.model_path().exists() && self.scaler_path().exists() && self.manifest_path().exists()
    }

    /// Persists one training run and returns the manifest with digests filled in.
    ///
    /// `write_weights` receives the temporary path the weights must be
    /// written to. On failure no temporary file is left in the directory.
    pub fn save<F>(
        &self,
        scaler: &MinMaxScaler,
        manifest: &ModelManifest,
        write_weights: F,
    ) -> Result<ModelManifest, ForecastError>
    where
        F: FnOnce(&Path) -> Result<(), ForecastError>,
    {
        fs::create_dir_all(&self.dir).map_err(ForecastError::persistence)?;

        let temporaries = [
            temp_path(&self.model_path()),
            temp_path(&self.scaler_path()),
            temp_path(&self.manifest_path()),
        ];
        let result = self.write_and_commit(&temporaries, scaler, manifest, write_weights);

        if let Err(e) = &result {
            warn!("ArtifactStore: save to {:?} failed: {}", self.dir, e);
            for tmp in &temporaries {
                fs::remove_file(tmp).ok();
            }
        }
        result
    }

    fn write_and_commit<F>(
        &self,
        [model_tmp, scaler_tmp, manifest_tmp]: &[PathBuf; 3],
        scaler: &MinMaxScaler,
        manifest: &ModelManifest,
        write_weights: F,
    ) -> Result<ModelManifest, ForecastError>
    where
        F: FnOnce(&Path) -> Result<(), ForecastError>,
    {
        write_weights(model_tmp)?;
        let model_bytes = fs::read(model_tmp).map_err(ForecastError::persistence)?;

        let scaler_json =
            serde_json::to_vec_pretty(scaler).map_err(ForecastError::persistence)?;
        fs::write(scaler_tmp, &scaler_json).map_err(ForecastError::persistence)?;

        let manifest = ModelManifest {
            model_sha256: sha256_hex(&model_bytes),
            scaler_sha256: sha256_hex(&scaler_json),
            ..manifest.clone()
        };
        let manifest_json =
            serde_json::to_vec_pretty(&manifest).map_err(ForecastError::persistence)?;
        fs::write(manifest_tmp, manifest_json).map_err(ForecastError::persistence)?;

        fs::rename(model_tmp, self.model_path()).map_err(ForecastError::persistence)?;
        fs::rename(scaler_tmp, self.scaler_path()).map_err(ForecastError::persistence)?;
        fs::rename(manifest_tmp, self.manifest_path()).map_err(ForecastError::persistence)?;

        info!(
            "ArtifactStore: saved run {} for {} to {:?}",
            manifest.run_id, manifest.ticker, self.dir
        );
        Ok(manifest)
    }

    /// Loads and cross-checks the artifact set.
    ///
    /// No artifacts at all is `ModelMissing`; anything partial, tampered or
    /// built for another layout is `ArtifactMismatch`.
    pub fn load(&self) -> Result<StoredArtifacts, ForecastError> {
        let present = [
            self.model_path(),
            self.scaler_path(),
            self.manifest_path(),
        ]
        .map(|path| path.exists());

        if present.iter().all(|p| !p) {
            return Err(ForecastError::ModelMissing {
                dir: self.dir.display().to_string(),
            });
        }
        if let Some(missing) = [MODEL_FILE, SCALER_FILE, MANIFEST_FILE]
            .iter()
            .zip(present)
            .find_map(|(name, found)| (!found).then_some(*name))
        {
            warn!("ArtifactStore: incomplete artifact set in {:?}", self.dir);
            return Err(ForecastError::ArtifactMismatch(format!(
                "{missing} is missing from {}",
                self.dir.display()
            )));
        }

        let manifest_bytes = fs::read(self.manifest_path()).map_err(ForecastError::persistence)?;
        let manifest: ModelManifest =
            serde_json::from_slice(&manifest_bytes).map_err(ForecastError::mismatch)?;

        if manifest.architecture != Architecture::default() {
            return Err(ForecastError::ArtifactMismatch(format!(
                "run {} was trained with layout {:?}",
                manifest.run_id, manifest.architecture
            )));
        }

        let weights = fs::read(self.model_path()).map_err(ForecastError::persistence)?;
        verify_digest(MODEL_FILE, &manifest.model_sha256, &weights)?;

        let scaler_bytes = fs::read(self.scaler_path()).map_err(ForecastError::persistence)?;
        verify_digest(SCALER_FILE, &manifest.scaler_sha256, &scaler_bytes)?;

        let scaler: MinMaxScaler =
            serde_json::from_slice(&scaler_bytes).map_err(ForecastError::mismatch)?;

        info!(
            "ArtifactStore: loaded run {} ({}, trained {})",
            manifest.run_id, manifest.ticker, manifest.trained_at
        );
        Ok(StoredArtifacts {
            weights,
            scaler,
            manifest,
        })
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

fn verify_digest(name: &str, expected: &str, bytes: &[u8]) -> Result<(), ForecastError> {
    // Manifests without digests predate integrity checks.
    if expected.is_empty() {
        return Ok(());
    }
    let actual = sha256_hex(bytes);
    if actual != expected {
        return Err(ForecastError::ArtifactMismatch(format!(
            "{name} digest {actual} does not match manifest {expected}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::sync::atomic::{AtomicU64, Ordering};
    use uuid::Uuid;

    static TEST_COUNTER: AtomicU64 = AtomicU64::new(0);

    const WEIGHTS: &[u8] = b"safetensors bytes";

    fn temp_store() -> (ArtifactStore, PathBuf) {
        let unique_id = TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
        let dir = std::env::temp_dir().join(format!(
            "stockcast_test_{}_{}_artifacts",
            std::process::id(),
            unique_id
        ));
        fs::remove_dir_all(&dir).ok();
        (ArtifactStore::new(dir.join("models")), dir)
    }

    fn run() -> (MinMaxScaler, ModelManifest) {
        let scaler = MinMaxScaler::fit(&[10.0, 12.5, 11.0, 9.5]).unwrap();
        let manifest = ModelManifest {
            run_id: Uuid::new_v4(),
            ticker: "AAPL".to_string(),
            time_step: 5,
            epochs: 1,
            training_pairs: 25,
            final_loss: Some(0.02),
            final_val_loss: None,
            trained_at: Utc::now(),
            architecture: Architecture::default(),
            model_sha256: String::new(),
            scaler_sha256: String::new(),
        };
        (scaler, manifest)
    }

    fn write_weights(path: &Path) -> Result<(), ForecastError> {
        fs::write(path, WEIGHTS).map_err(ForecastError::persistence)
    }

    fn temporaries(store: &ArtifactStore) -> Vec<String> {
        fs::read_dir(store.dir())
            .unwrap()
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .filter(|name| name.ends_with(".tmp"))
            .collect()
    }

    #[test]
    fn test_empty_directory_is_model_missing() {
        let (store, root) = temp_store();
        assert!(!store.exists());
        assert!(matches!(
            store.load(),
            Err(ForecastError::ModelMissing { .. })
        ));
        fs::remove_dir_all(root).ok();
    }

    #[test]
    fn test_save_then_load_restores_the_run() {
        let (store, root) = temp_store();
        let (scaler, manifest) = run();

        let saved = store.save(&scaler, &manifest, write_weights).unwrap();
        assert_eq!(saved.run_id, manifest.run_id);
        assert_eq!(saved.model_sha256, sha256_hex(WEIGHTS));
        assert!(store.exists());

        let loaded = store.load().unwrap();
        assert_eq!(loaded.manifest, saved);
        assert_eq!(loaded.scaler, scaler);
        assert_eq!(loaded.weights, WEIGHTS);
        assert!(temporaries(&store).is_empty());
        fs::remove_dir_all(root).ok();
    }

    #[test]
    fn test_failed_weight_write_cleans_up() {
        let (store, root) = temp_store();
        let (scaler, manifest) = run();

        let result = store.save(&scaler, &manifest, |path| {
            fs::write(path, b"partial").map_err(ForecastError::persistence)?;
            Err(ForecastError::Persistence("disk full".to_string()))
        });

        assert!(matches!(result, Err(ForecastError::Persistence(_))));
        assert!(temporaries(&store).is_empty());
        assert!(!store.exists());
        fs::remove_dir_all(root).ok();
    }

    #[test]
    fn test_failed_commit_cleans_up() {
        let (store, root) = temp_store();
        let (scaler, manifest) = run();
        // A directory in the manifest's place makes the final rename fail.
        fs::create_dir_all(store.manifest_path().join("blocker")).unwrap();

        let result = store.save(&scaler, &manifest, write_weights);

        assert!(matches!(result, Err(ForecastError::Persistence(_))));
        assert!(temporaries(&store).is_empty());
        fs::remove_dir_all(root).ok();
    }

    #[test]
    fn test_missing_companion_is_a_mismatch() {
        let (store, root) = temp_store();
        let (scaler, manifest) = run();
        store.save(&scaler, &manifest, write_weights).unwrap();

        fs::remove_file(store.scaler_path()).unwrap();
        match store.load() {
            Err(ForecastError::ArtifactMismatch(msg)) => assert!(msg.contains(SCALER_FILE)),
            other => panic!("expected mismatch, got {:?}", other.err()),
        }
        fs::remove_dir_all(root).ok();
    }

    #[test]
    fn test_swapped_scaler_is_detected() {
        let (store, root) = temp_store();
        let (scaler, manifest) = run();
        store.save(&scaler, &manifest, write_weights).unwrap();

        let other = MinMaxScaler::fit(&[1.0, 500.0]).unwrap();
        fs::write(store.scaler_path(), serde_json::to_vec(&other).unwrap()).unwrap();

        assert!(matches!(
            store.load(),
            Err(ForecastError::ArtifactMismatch(_))
        ));
        fs::remove_dir_all(root).ok();
    }

    #[test]
    fn test_foreign_layout_is_refused() {
        let (store, root) = temp_store();
        let (scaler, manifest) = run();
        let saved = store.save(&scaler, &manifest, write_weights).unwrap();

        let foreign = ModelManifest {
            architecture: Architecture {
                lstm_units: [64, 32],
                ..Architecture::default()
            },
            ..saved
        };
        fs::write(
            store.manifest_path(),
            serde_json::to_vec(&foreign).unwrap(),
        )
        .unwrap();

        assert!(matches!(
            store.load(),
            Err(ForecastError::ArtifactMismatch(_))
        ));
        fs::remove_dir_all(root).ok();
    }
}
