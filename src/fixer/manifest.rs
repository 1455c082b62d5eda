//! Rebuilds `META-INF/manifest.xml` by listing the extracted tree.

use std::path::Path;

use tracing::{debug, info, warn};

use crate::error::Result;
use crate::fs::rmall;
use crate::store::{DirectorySource, DirectoryTarget, Source, Target};

pub const MANIFEST_DIR: &str = "META-INF/";
pub const MANIFEST_FILE: &str = "META-INF/manifest.xml";

const MANIFEST_HEADER: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="no"?>"#,
    r#"<manifest xmlns="urn:xmind:xmap:xmlns:manifest:1.0">"#,
);
const MANIFEST_FOOTER: &str = concat!(
    r#"<file-entry full-path="META-INF/" media-type=""/>"#,
    r#"<file-entry full-path="META-INF/manifest.xml" media-type="text/xml"/>"#,
    "</manifest>",
);

/// What [`rebuild_manifest`] did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestOutcome {
    AlreadyPresent,
    Rebuilt {
        /// Entries listed, not counting the two fixed `META-INF` records
        entries: usize,
        /// Empty XML files deleted from the tree
        pruned: Vec<String>,
    },
}

fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// An empty `.xml` part makes XMind's parser fail outright, so such files
/// are dropped rather than listed.
fn is_empty_xml(name: &str, size: u64) -> bool {
    size == 0 && name.to_lowercase().ends_with(".xml")
}

/// Write a manifest for `dir` unless one already exists.
///
/// Every entry of the tree is listed except empty XML files, which are
/// deleted from `dir` as a side effect.
pub async fn rebuild_manifest(dir: &Path) -> Result<ManifestOutcome> {
    let manifest_file = dir.join(MANIFEST_FILE);
    if tokio::fs::try_exists(&manifest_file).await? {
        debug!("Manifest file already exists.");
        return Ok(ManifestOutcome::AlreadyPresent);
    }

    info!("Rebuilding manifest from {} ....", dir.display());
    debug!("Manifest file path: {}", manifest_file.display());

    let mut body = String::new();
    let mut entries = 0;
    let mut pruned = Vec::new();

    let mut source = DirectorySource::open(dir);
    for name in source.entries()? {
        let name = name?;
        debug!(entry = %name, "Reading entry");

        if is_empty_xml(&name, source.entry_size(&name).await?) {
            warn!("Empty XML removed: {}", name);
            rmall(&dir.join(&name))?;
            pruned.push(name);
            continue;
        }

        body.push_str(&format!(
            r#"<file-entry full-path="{}" media-type=""/>"#,
            escape_attr(&name)
        ));
        entries += 1;
    }
    source.close();

    let manifest = format!("{}{}{}", MANIFEST_HEADER, body, MANIFEST_FOOTER);
    let mut target = DirectoryTarget::create(dir)?;
    target.write(MANIFEST_DIR, b"").await?;
    target.write(MANIFEST_FILE, manifest.as_bytes()).await?;
    target.finish().await?;

    info!("Manifest rebuilt: {}", manifest_file.display());
    Ok(ManifestOutcome::Rebuilt { entries, pruned })
}
