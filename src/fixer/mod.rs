//! The repair pipeline.
//!
//! A [`FixerSession`] repairs one input file:
//!
//! 1. extract it, falling back to `zip -FF` repairs ([`extract`])
//! 2. rebuild `content.xml` from revision history if it is missing or empty ([`content`])
//! 3. rebuild `META-INF/manifest.xml` if it is missing ([`manifest`])
//! 4. re-pack the tree and move it to `<stem>_fixed.xmind` ([`finalize`])
//!
//! All staging artifacts live next to the input and are named after its stem
//! (`xmfix_<stem>`, `xmfix_<stem>_recovered.zip`, ...). They are removed when
//! the session finishes, whatever the outcome. Two sessions on the same input
//! at the same time would share those names; callers must not do that.

pub mod content;
pub mod extract;
pub mod finalize;
pub mod manifest;

use std::path::{Path, PathBuf};

use tracing::{Instrument, Span, error, info, info_span, warn};

use crate::config::FixerConfig;
use crate::error::Result;
use crate::fs::rmall;
use crate::tools::Tools;

pub use content::{ContentOutcome, Revision, rebuild_content};
pub use extract::ExtractState;
pub use finalize::{build_target, rebuild_archive, unique_target_path};
pub use manifest::{ManifestOutcome, rebuild_manifest};

/// Prefix of every staging artifact.
pub const STAGING_PREFIX: &str = "xmfix_";

/// One repair attempt over one input path
pub struct FixerSession {
    source_path: PathBuf,
    source_dir: PathBuf,
    source_stem: String,
    input_is_dir: bool,
    config: FixerConfig,
    tools: Tools,
    span: Span,

    extract_history: Vec<ExtractState>,
    extracted_dir: Option<PathBuf>,
    recovered_path: Option<PathBuf>,
    force_recovered_path: Option<PathBuf>,
    rebuilt_path: Option<PathBuf>,
    target_path: Option<PathBuf>,
}

impl FixerSession {
    pub fn new(path: impl Into<PathBuf>, config: FixerConfig) -> Self {
        let source_path = path.into();
        let source_dir = source_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let source_stem = source_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let input_is_dir = source_path.is_dir();
        let span = info_span!("xmfix", source = %source_path.display());

        Self {
            tools: Tools::new(config.tools.clone()),
            source_path,
            source_dir,
            source_stem,
            input_is_dir,
            config,
            span,
            extract_history: Vec::new(),
            extracted_dir: None,
            recovered_path: None,
            force_recovered_path: None,
            rebuilt_path: None,
            target_path: None,
        }
    }

    /// Log under `span` instead of the session's own `xmfix` span.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Final output, once [`fix`](Self::fix) has succeeded
    pub fn target_path(&self) -> Option<&Path> {
        self.target_path.as_deref()
    }

    /// Every state the extraction cascade went through, in order
    pub fn extract_history(&self) -> &[ExtractState] {
        &self.extract_history
    }

    pub fn extract_state(&self) -> ExtractState {
        self.extract_history
            .last()
            .copied()
            .unwrap_or(ExtractState::Unattempted)
    }

    /// `<dir>/xmfix_<stem><suffix>`
    fn staging_path(&self, suffix: &str) -> PathBuf {
        self.source_dir
            .join(format!("{}{}{}", STAGING_PREFIX, self.source_stem, suffix))
    }

    /// Repair the input. Failures are logged and reported as `None`.
    pub async fn fix(&mut self) -> Option<PathBuf> {
        match self.try_fix().await {
            Ok(path) => Some(path),
            Err(e) => {
                let _enter = self.span.enter();
                error!(error = %e, "Failed to fix XMind file: {}", self.source_path.display());
                None
            }
        }
    }

    /// Like [`fix`](Self::fix) but hands the error back. Staging artifacts are
    /// removed either way.
    pub async fn try_fix(&mut self) -> Result<PathBuf> {
        let span = self.span.clone();
        let result = self.run().instrument(span.clone()).await;
        span.in_scope(|| self.clear());
        result
    }

    async fn run(&mut self) -> Result<PathBuf> {
        let dir = if self.input_is_dir {
            info!("Fixing XMind file from directory: {}", self.source_path.display());
            self.source_path.clone()
        } else {
            self.unzip().await?
        };

        rebuild_content(&dir).await?;
        rebuild_manifest(&dir).await?;

        let zip_path = self.staging_path(".zip");
        self.rebuilt_path = Some(zip_path.clone());
        rebuild_archive(&dir, &zip_path, self.config.compression).await?;

        let target = build_target(&zip_path, &self.source_dir, &self.source_stem).await?;
        self.rebuilt_path = None;
        self.target_path = Some(target.clone());
        Ok(target)
    }

    /// Remove every staging artifact created so far. Safe to call twice.
    fn clear(&mut self) {
        let artifacts: Vec<PathBuf> = [
            self.extracted_dir.take(),
            self.recovered_path.take(),
            self.force_recovered_path.take(),
            self.rebuilt_path.take(),
        ]
        .into_iter()
        .flatten()
        .filter(|path| !(self.input_is_dir && *path == self.source_path))
        .collect();
        if artifacts.is_empty() {
            return;
        }

        info!("Clearing temporary files/dirs");
        for path in artifacts {
            if let Err(e) = rmall(&path) {
                warn!(path = %path.display(), "Failed to delete: {}", e);
            }
        }
    }
}

impl Drop for FixerSession {
    fn drop(&mut self) {
        // Only does anything if a fix was abandoned mid-way
        let span = self.span.clone();
        span.in_scope(|| self.clear());
    }
}
