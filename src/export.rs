use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use serde::Serialize;
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::debug;

use crate::aggregate::RunLedger;
use crate::render::render_review_markdown;

/// File-name stamp, e.g. "2026-10-18_14-05".
pub fn run_stamp(now: &DateTime<Local>) -> String {
    now.format("%Y-%m-%d_%H-%M").to_string()
}

#[derive(Debug, Clone)]
pub struct OutputPaths {
    pub dir: PathBuf,
    pub stamp: String,
    pub import_json: PathBuf,
    pub review_md: PathBuf,
}

impl OutputPaths {
    pub fn new(dir: &Path, stamp: &str) -> Self {
        Self {
            dir: dir.to_path_buf(),
            stamp: stamp.to_string(),
            import_json: dir.join(format!("God_Roll_Import_{}.json", stamp)),
            review_md: dir.join(format!("God_Roll_Review_{}.md", stamp)),
        }
    }
}

fn write_json<P: AsRef<Path>, T: ?Sized + Serialize>(path: P, value: &T) -> Result<()> {
    fs::write(path, serde_json::to_vec_pretty(value)?)
        .map(|_| ())
        .map_err(|e| e.into())
}

/// Persist the import document and the review document for the run so far.
pub fn write_snapshot(paths: &OutputPaths, ledger: &RunLedger, source: &str) -> Result<()> {
    fs::create_dir_all(&paths.dir).with_context(|| format!("create {:?}", paths.dir))?;

    let doc = ledger.to_export(&Local::now().to_rfc3339());
    write_json(&paths.import_json, &doc)
        .with_context(|| format!("writing {}", paths.import_json.display()))?;

    let review = render_review_markdown(ledger, &paths.stamp, source);
    fs::write(&paths.review_md, review.as_bytes())
        .with_context(|| format!("writing {}", paths.review_md.display()))?;

    debug!(
        "Snapshot written - weapons={}, review_items={}, dir={}",
        ledger.god_rolls.len(),
        ledger.uncertain.len(),
        paths.dir.display()
    );
    Ok(())
}
