// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Persists one snapshot per epoch under {working_dir}/ckpt/:
//
//   weights_{epoch:03}.mpk.gz   — model record (full-precision
//                                 named-mpk-gz recorder)
//   optimizer_{epoch:03}.mpk.gz — optimizer record
//   state_{epoch:03}.json       — {schema_version, epoch, batch}
//   latest.json                 — last COMPLETE epoch
//
// Epoch numbers are dense and monotonic from 0; a file is never
// mutated after it is written. `latest.json` is updated only
// after all three files of an epoch exist, so a process killed
// mid-write leaves the previous epoch as the recovery point.
//
// The run configuration is saved separately as
// {working_dir}/config.json so evaluation can rebuild the exact
// model architecture before loading weights into it.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use burn::{
    module::AutodiffModule,
    optim::Optimizer,
    prelude::*,
    record::{FullPrecisionSettings, NamedMpkGzFileRecorder, Recorder},
    tensor::backend::AutodiffBackend,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

// full precision so a restored model scores exactly like the
// one that was saved; the gz framing keeps files small anyway
type CheckpointRecorder = NamedMpkGzFileRecorder<FullPrecisionSettings>;

/// Versioned sidecar describing one checkpoint. Kept separate
/// from the weight records so the on-disk layout is not bound to
/// one framework's state representation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointState {
    pub schema_version: u32,
    pub epoch: usize,
    /// Index of the last batch processed in this epoch
    pub batch: usize,
}

pub const CHECKPOINT_SCHEMA_VERSION: u32 = 1;

/// Manages saving and loading of per-epoch training snapshots.
pub struct CheckpointManager {
    working_dir: PathBuf,
    ckpt_dir: PathBuf,
}

impl CheckpointManager {
    /// Create the `ckpt` directory under the working directory.
    pub fn new(working_dir: impl AsRef<Path>) -> Result<Self> {
        let working_dir = working_dir.as_ref().to_path_buf();
        let ckpt_dir = working_dir.join("ckpt");
        fs::create_dir_all(&ckpt_dir)
            .with_context(|| format!("cannot create '{}'", ckpt_dir.display()))?;
        Ok(Self {
            working_dir,
            ckpt_dir,
        })
    }

    // base paths without extension — the recorder appends its own
    fn weights_base(&self, epoch: usize) -> PathBuf {
        self.ckpt_dir.join(format!("weights_{epoch:03}"))
    }

    fn optimizer_base(&self, epoch: usize) -> PathBuf {
        self.ckpt_dir.join(format!("optimizer_{epoch:03}"))
    }

    fn state_path(&self, epoch: usize) -> PathBuf {
        self.ckpt_dir.join(format!("state_{epoch:03}.json"))
    }

    /// Persist the snapshot of one completed epoch.
    pub fn save_epoch<B, M, O>(
        &self,
        model: &M,
        optim: &O,
        epoch: usize,
        batch: usize,
    ) -> Result<()>
    where
        B: AutodiffBackend,
        M: AutodiffModule<B>,
        O: Optimizer<M, B>,
    {
        let weights = self.weights_base(epoch);
        CheckpointRecorder::new()
            .record(model.clone().into_record(), weights.clone())
            .with_context(|| format!("failed to save weights '{}'", weights.display()))?;

        let optimizer = self.optimizer_base(epoch);
        CheckpointRecorder::new()
            .record(optim.to_record(), optimizer.clone())
            .with_context(|| format!("failed to save optimizer '{}'", optimizer.display()))?;

        let state = CheckpointState {
            schema_version: CHECKPOINT_SCHEMA_VERSION,
            epoch,
            batch,
        };
        fs::write(self.state_path(epoch), serde_json::to_string_pretty(&state)?)
            .with_context(|| "failed to write checkpoint state")?;

        // the epoch is complete only once all three files exist
        fs::write(
            self.ckpt_dir.join("latest.json"),
            serde_json::to_string(&epoch)?,
        )
        .with_context(|| "failed to update latest.json")?;

        tracing::info!("saved checkpoint for epoch {epoch}");
        Ok(())
    }

    /// Last complete epoch — the recovery point.
    pub fn latest_epoch(&self) -> Result<usize> {
        let path = self.ckpt_dir.join("latest.json");
        let s = fs::read_to_string(&path).with_context(|| {
            format!(
                "cannot read '{}' — has training been run?",
                path.display()
            )
        })?;
        Ok(serde_json::from_str(&s)?)
    }

    /// Load the weights of a given epoch into `model`.
    pub fn load_model<B: Backend, M: Module<B>>(
        &self,
        model: M,
        epoch: usize,
        device: &B::Device,
    ) -> Result<M> {
        let path = self.weights_base(epoch);
        let record = CheckpointRecorder::new()
            .load(path.clone(), device)
            .with_context(|| format!("cannot load checkpoint '{}'", path.display()))?;
        tracing::info!("loaded checkpoint from epoch {epoch}");
        Ok(model.load_record(record))
    }

    /// Read the versioned state sidecar of a given epoch.
    pub fn load_state(&self, epoch: usize) -> Result<CheckpointState> {
        let path = self.state_path(epoch);
        let json = fs::read_to_string(&path)
            .with_context(|| format!("cannot read '{}'", path.display()))?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Save the run configuration to {working_dir}/config.json.
    pub fn save_config<T: Serialize>(&self, config: &T) -> Result<()> {
        let path = self.working_dir.join("config.json");
        fs::write(&path, serde_json::to_string_pretty(config)?)
            .with_context(|| format!("cannot write config to '{}'", path.display()))?;
        Ok(())
    }

    /// Load the run configuration saved by `train`.
    pub fn load_config<T: DeserializeOwned>(&self) -> Result<T> {
        let path = self.working_dir.join("config.json");
        let json = fs::read_to_string(&path).with_context(|| {
            format!(
                "cannot read '{}' — run 'train' before 'evaluate'",
                path.display()
            )
        })?;
        Ok(serde_json::from_str(&json)?)
    }
}
