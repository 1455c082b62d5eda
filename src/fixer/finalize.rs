//! Re-packs the repaired directory and moves the archive to its final name.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::Compression;
use crate::error::{Result, invalid};
use crate::fs::lexists;
use crate::store::{ArchiveSource, ArchiveTarget, DirectorySource, Source, Target, copy_all};

/// Suffix appended to the input's stem for the output file.
pub const FIXED_SUFFIX: &str = "_fixed";
pub const OUTPUT_EXTENSION: &str = "xmind";

fn entry_names(source: &dyn Source) -> Result<BTreeSet<String>> {
    source.entries()?.collect()
}

/// Write every entry of `dir` into a new archive at `zip_path`.
///
/// The archive is reopened afterwards and its entry set compared with the
/// directory's. Returns the number of entries written.
pub async fn rebuild_archive(
    dir: &Path,
    zip_path: &Path,
    compression: Compression,
) -> Result<usize> {
    info!("Rebuilding ZIP archive from {} ....", dir.display());
    debug!("ZIP archive target file: {}", zip_path.display());

    let mut source = DirectorySource::open(dir);
    let mut target = ArchiveTarget::create(zip_path, compression);
    let count = copy_all(&source, &mut target).await?;
    target.finish().await?;

    let expected = entry_names(&source)?;
    source.close();

    let mut rebuilt = ArchiveSource::open(zip_path).await?;
    let actual = entry_names(&rebuilt)?;
    rebuilt.close();

    if actual != expected {
        invalid!(
            "rebuilt archive lists {} entries, directory has {}",
            actual.len(),
            expected.len()
        );
    }

    info!(entries = count, "ZIP archive rebuilt: {}", zip_path.display());
    Ok(count)
}

/// First free path among `<stem>_fixed.xmind`, `<stem>_fixed (2).xmind`,
/// `<stem>_fixed (3).xmind`, ... inside `dir`.
pub fn unique_target_path(dir: &Path, stem: &str) -> PathBuf {
    let mut path = dir.join(format!("{}{}.{}", stem, FIXED_SUFFIX, OUTPUT_EXTENSION));
    let mut index = 1;
    while lexists(&path) {
        index += 1;
        path = dir.join(format!(
            "{}{} ({}).{}",
            stem, FIXED_SUFFIX, index, OUTPUT_EXTENSION
        ));
    }
    path
}

/// Move the rebuilt archive to a fresh `_fixed` path next to the input.
pub async fn build_target(rebuilt: &Path, dir: &Path, stem: &str) -> Result<PathBuf> {
    let target = unique_target_path(dir, stem);
    info!(
        "Building target: {} -> {}",
        rebuilt.display(),
        target.display()
    );
    tokio::fs::rename(rebuilt, &target).await?;
    info!("Target built: {}", target.display());
    Ok(target)
}
