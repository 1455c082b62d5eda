//! Extraction cascade: direct unzip, then `zip -FF` once, then `zip -FF` on
//! the already repaired archive.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use super::FixerSession;
use crate::error::{Error, Result};
use crate::fs::rmall;

/// States of the extraction cascade, in the order they can be visited
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractState {
    Unattempted,
    DirectExtractFailed,
    RecoveredExtractFailed,
    ForceRecoveredExtractFailed,
    Extracted,
    Failed,
}

/// `Ok(false)` for the failures that drive the fallback, `Err` for anything
/// else (a tool that cannot even be started, an I/O error).
fn fallback_on_failure(result: Result<()>) -> Result<bool> {
    match result {
        Ok(()) => Ok(true),
        Err(e @ (Error::ToolFailed { .. } | Error::ToolTimedOut { .. })) => {
            warn!("{}", e);
            Ok(false)
        }
        Err(e) => Err(e),
    }
}

/// Empty `target_dir` after an attempt that did not extract.
///
/// A cleanup failure is returned for a plain failed attempt, but never hides
/// the error of an attempt that aborted.
fn discard_failed_attempt(extracted: Result<bool>, target_dir: &Path) -> Result<bool> {
    match extracted {
        Ok(true) => Ok(true),
        Ok(false) => {
            rmall(target_dir)?;
            Ok(false)
        }
        Err(e) => {
            if let Err(cleanup) = rmall(target_dir) {
                warn!(path = %target_dir.display(), "Failed to delete: {}", cleanup);
            }
            Err(e)
        }
    }
}

impl FixerSession {
    /// Run the cascade and return the extracted directory.
    pub(super) async fn unzip(&mut self) -> Result<PathBuf> {
        let staging_dir = self.staging_path("");
        self.extracted_dir = Some(staging_dir.clone());
        let source = self.source_path.clone();

        if self.extract_into(&source, &staging_dir).await? {
            return self.extracted(staging_dir);
        }
        self.transition(ExtractState::DirectExtractFailed);

        info!("Recovering ZIP file: {}", source.display());
        let recovered = self.staging_path("_recovered.zip");
        self.recovered_path = Some(recovered.clone());
        if !fallback_on_failure(self.tools.repair(&source, &recovered).await)? {
            return self.extraction_impossible();
        }
        info!("ZIP file recovered: {}", recovered.display());

        if self.extract_into(&recovered, &staging_dir).await? {
            return self.extracted(staging_dir);
        }
        self.transition(ExtractState::RecoveredExtractFailed);

        // Some damage only goes away when the repaired stream is repaired again
        info!("Force recovering ZIP file: {}", recovered.display());
        let force_recovered = self.staging_path("_force_recovered.zip");
        self.force_recovered_path = Some(force_recovered.clone());
        if !fallback_on_failure(self.tools.repair(&recovered, &force_recovered).await)? {
            return self.extraction_impossible();
        }
        info!("ZIP file force recovered: {}", force_recovered.display());

        if self.extract_into(&force_recovered, &staging_dir).await? {
            return self.extracted(staging_dir);
        }
        self.transition(ExtractState::ForceRecoveredExtractFailed);
        self.extraction_impossible()
    }

    /// Extract `archive` into a freshly emptied `target_dir`.
    ///
    /// A failed attempt leaves nothing behind in `target_dir`.
    async fn extract_into(&self, archive: &Path, target_dir: &Path) -> Result<bool> {
        rmall(target_dir)?;
        info!(
            "Unzipping file: {} -> {}",
            archive.display(),
            target_dir.display()
        );

        let extracted = fallback_on_failure(self.tools.extract(archive, target_dir).await);
        discard_failed_attempt(extracted, target_dir)
    }

    fn extracted(&mut self, dir: PathBuf) -> Result<PathBuf> {
        self.transition(ExtractState::Extracted);
        Ok(dir)
    }

    fn extraction_impossible<T>(&mut self) -> Result<T> {
        self.transition(ExtractState::Failed);
        Err(Error::ExtractionImpossible(self.source_path.clone()))
    }

    fn transition(&mut self, state: ExtractState) {
        self.extract_history.push(state);
    }
}
