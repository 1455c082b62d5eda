//! # xmfix
//!
//! Repairs broken XMind files.
//!
//! An `.xmind` document is a ZIP archive of XML parts. When the container is
//! damaged, or `content.xml` has gone missing or empty, this crate recovers
//! what it can and writes a loadable copy next to the original as
//! `<name>_fixed.xmind`.
//!
//! ## Pipeline
//!
//! - Extract with `unzip`; on failure repair with `zip -FF` and retry, then
//!   repair the repaired archive once more and retry again
//! - Rebuild `content.xml` from the newest readable snapshot of every sheet
//!   under `Revisions/`
//! - Rebuild `META-INF/manifest.xml`, dropping empty XML parts
//! - Re-pack everything and move it to a collision-free output path
//!
//! Staging files are always cleaned up.
//!
//! ## Example
//!
//! ```no_run
//! use xmfix::{FixerConfig, FixerSession};
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut session = FixerSession::new("broken.xmind", FixerConfig::default());
//!     match session.fix().await {
//!         Some(fixed) => println!("{}", fixed.display()),
//!         None => eprintln!("could not repair broken.xmind"),
//!     }
//! }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod fixer;
pub mod fs;
pub mod io;
pub mod store;
pub mod tools;
pub mod zip;

pub use cli::Cli;
pub use config::{Compression, FixerConfig, ToolConfig};
pub use error::{Error, Result};
pub use fixer::{ExtractState, FixerSession};
pub use io::{LocalFileReader, ReadAt};
pub use store::{ArchiveSource, ArchiveTarget, DirectorySource, DirectoryTarget, Entry, Source, Target};
