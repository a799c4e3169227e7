// ============================================================
// Layer 6 — Run Logging
// ============================================================
// CSV records of a training run inside the working directory:
//
//   train.csv — header `epoch,loss`, one row appended per epoch
//   args.csv  — one (argument_name, value) row per config field,
//               written once at run start
//
// Both files are plain CSV so runs can be compared and plotted
// without any tooling. Write failures propagate to the caller;
// there is no retry — the operator restarts the run.

use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::Serialize;

/// Appends per-epoch training loss to `{working_dir}/train.csv`.
pub struct TrainLogger {
    csv_path: PathBuf,
}

impl TrainLogger {
    /// Create the logger and write the CSV header.
    /// An existing file from a previous run is truncated.
    pub fn new(working_dir: impl AsRef<Path>) -> Result<Self> {
        let dir = working_dir.as_ref();
        fs::create_dir_all(dir)
            .with_context(|| format!("cannot create working dir '{}'", dir.display()))?;

        let csv_path = dir.join("train.csv");
        let mut f = fs::File::create(&csv_path)
            .with_context(|| format!("cannot create '{}'", csv_path.display()))?;
        writeln!(f, "epoch,loss")?;

        Ok(Self { csv_path })
    }

    /// Append one epoch's mean loss.
    pub fn log(&self, epoch: usize, loss: f64) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .with_context(|| format!("cannot open '{}'", self.csv_path.display()))?;
        writeln!(f, "{},{:.6}", epoch, loss)?;
        tracing::debug!("logged epoch {} loss {:.6}", epoch, loss);
        Ok(())
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}

/// Write every field of a config struct as a `(name, value)` row
/// in `{working_dir}/args.csv`.
///
/// The config is serialized through serde so the CSV always
/// matches the actual run configuration, field for field.
pub fn save_args<T: Serialize>(working_dir: impl AsRef<Path>, config: &T) -> Result<PathBuf> {
    let dir = working_dir.as_ref();
    fs::create_dir_all(dir)
        .with_context(|| format!("cannot create working dir '{}'", dir.display()))?;

    let path = dir.join("args.csv");
    let value = serde_json::to_value(config).context("config is not serializable")?;
    let map = value
        .as_object()
        .context("config did not serialize to an object")?;

    let mut f = fs::File::create(&path)
        .with_context(|| format!("cannot create '{}'", path.display()))?;
    for (name, v) in map {
        // strip the JSON quotes from plain strings
        let rendered = match v.as_str() {
            Some(s) => s.to_string(),
            None => v.to_string(),
        };
        writeln!(f, "{},{}", name, rendered)?;
    }

    tracing::debug!("saved run arguments to '{}'", path.display());
    Ok(path)
}
