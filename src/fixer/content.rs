//! Rebuilds `content.xml` from the per-sheet revision history.
//!
//! XMind keeps snapshots of every sheet under `Revisions/<sheet-id>/` named
//! `rev-<number>-<timestamp>.xml`. For each sheet the newest snapshot that
//! still contains a `<sheet>` fragment is used.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::store::{DirectoryTarget, Target};

pub const CONTENT_FILE: &str = "content.xml";
pub const REVISIONS_DIR: &str = "Revisions";

const CONTENT_HEADER: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="no"?>"#,
    r#"<xmap-content xmlns="urn:xmind:xmap:xmlns:content:2.0" "#,
    r#"xmlns:fo="http://www.w3.org/1999/XSL/Format" "#,
    r#"xmlns:svg="http://www.w3.org/2000/svg" "#,
    r#"xmlns:xhtml="http://www.w3.org/1999/xhtml" "#,
    r#"xmlns:xlink="http://www.w3.org/1999/xlink" "#,
    r#"version="2.0">"#,
);
const CONTENT_FOOTER: &str = "</xmap-content>";

static REVISION_FILE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^rev-(\d+)-\d+\.xml").expect("valid regex"));

// `.` does not cross newlines, so the fragment has to sit on one line
static REVISION_CONTENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"<xmap-revision-content[^>]+>(<sheet[^>]+>.*</sheet>)</xmap-revision-content>",
    )
    .expect("valid regex")
});

/// What [`rebuild_content`] did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentOutcome {
    /// A non-empty `content.xml` was already there
    AlreadyPresent,
    Rebuilt { sheets: usize },
}

/// One snapshot file of a sheet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Revision {
    pub number: u64,
    pub path: PathBuf,
}

impl Revision {
    /// Recognize `rev-<number>-<digits>.xml` inside `dir`.
    pub fn parse(dir: &Path, file_name: &str) -> Option<Self> {
        let caps = REVISION_FILE.captures(file_name)?;
        let number = caps[1].parse().ok()?;
        Some(Self {
            number,
            path: dir.join(file_name),
        })
    }
}

/// Pull the `<sheet>` fragment out of a revision document.
pub fn extract_sheet(revision: &str) -> Option<&str> {
    REVISION_CONTENT
        .captures(revision)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Wrap sheet fragments in the `xmap-content` envelope.
pub fn content_document<S: AsRef<str>>(sheets: &[S]) -> String {
    let body_len: usize = sheets.iter().map(|s| s.as_ref().len()).sum();
    let mut doc = String::with_capacity(CONTENT_HEADER.len() + body_len + CONTENT_FOOTER.len());
    doc.push_str(CONTENT_HEADER);
    for sheet in sheets {
        doc.push_str(sheet.as_ref());
    }
    doc.push_str(CONTENT_FOOTER);
    doc
}

/// Sorted names of the entries of `dir` that satisfy `keep`.
async fn list_dir(dir: &Path, keep: fn(&std::fs::FileType) -> bool) -> Result<Vec<String>> {
    let mut names = Vec::new();
    let mut read_dir = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = read_dir.next_entry().await? {
        if keep(&entry.file_type().await?) {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();
    Ok(names)
}

/// Newest parseable sheet fragment in one sheet's revision directory.
///
/// Candidates are tried from the highest revision number down; an unreadable
/// or fragment-less file just moves on to the next lower one.
async fn recover_sheet(revision_dir: &Path) -> Result<Option<(Revision, String)>> {
    let mut revisions: Vec<Revision> = list_dir(revision_dir, |t| t.is_file())
        .await?
        .iter()
        .filter_map(|name| Revision::parse(revision_dir, name))
        .collect();
    revisions.sort_by(|a, b| b.number.cmp(&a.number));

    for revision in revisions {
        let text = match tokio::fs::read(&revision.path).await {
            Ok(bytes) => String::from_utf8(bytes).map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };
        let text = match text {
            Ok(text) => text,
            Err(e) => {
                warn!(path = %revision.path.display(), "Failed to load revision: {}", e);
                continue;
            }
        };

        match extract_sheet(&text) {
            Some(sheet) => {
                let sheet = sheet.to_string();
                return Ok(Some((revision, sheet)));
            }
            None => debug!(path = %revision.path.display(), "no sheet in revision"),
        }
    }

    Ok(None)
}

/// Recreate `content.xml` in `dir` unless a non-empty one exists.
///
/// Fails with [`Error::UnrecoverableContent`] when no sheet at all can be
/// recovered.
pub async fn rebuild_content(dir: &Path) -> Result<ContentOutcome> {
    let content_file = dir.join(CONTENT_FILE);
    if let Ok(metadata) = tokio::fs::metadata(&content_file).await {
        if metadata.len() > 0 {
            debug!("Content file already exists.");
            return Ok(ContentOutcome::AlreadyPresent);
        }
    }

    let revisions_dir = dir.join(REVISIONS_DIR);
    let sheet_ids = if tokio::fs::metadata(&revisions_dir)
        .await
        .is_ok_and(|m| m.is_dir())
    {
        list_dir(&revisions_dir, |t| t.is_dir()).await?
    } else {
        warn!("No revision history at {}", revisions_dir.display());
        Vec::new()
    };

    let mut sheets = Vec::new();
    for sheet_id in &sheet_ids {
        if let Some((revision, sheet)) = recover_sheet(&revisions_dir.join(sheet_id)).await? {
            info!(
                sheet = %sheet_id,
                revision = revision.number,
                "Sheet recovered: {}",
                revision.path.display()
            );
            sheets.push(sheet);
        }
    }

    if sheets.is_empty() {
        return Err(Error::UnrecoverableContent(dir.to_path_buf()));
    }

    let mut target = DirectoryTarget::create(dir)?;
    target
        .write(CONTENT_FILE, content_document(&sheets).as_bytes())
        .await?;
    target.finish().await?;

    warn!(
        "Content rebuilt from editing history ({} sheets).",
        sheets.len()
    );
    Ok(ContentOutcome::Rebuilt {
        sheets: sheets.len(),
    })
}
