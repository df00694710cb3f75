//! Local artifact naming and removal

use crate::domain::context::ResultExt;
use crate::domain::{ExportRequest, Result, RunId};
use std::path::{Path, PathBuf};

/// Path of the artifact one run writes
///
/// `{work_dir}/campaign_export_{org}_{campaign}_{kind}_{run}.csv`. The run
/// suffix keeps concurrent runs for the same campaign apart.
pub fn artifact_path(work_dir: &Path, request: &ExportRequest, run_id: &RunId) -> PathBuf {
    work_dir.join(format!("{}_{}.csv", request.artifact_stem(), run_id.short()))
}

/// Deletes an artifact
///
/// A file that is already gone counts as removed.
pub async fn remove_artifact(path: &Path) -> Result<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).with_context(|| format!("Failed to remove artifact {}", path.display())),
    }
}
