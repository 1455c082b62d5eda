use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use crate::config::{Compression, FixerConfig, ToolConfig};

#[derive(Parser, Debug)]
#[command(name = "xmfix")]
#[command(version)]
#[command(about = "Repair broken XMind files", long_about = None)]
#[command(after_help = "Examples:\n  \
  xmfix broken.xmind             writes broken_fixed.xmind next to the input\n  \
  xmfix -v a.xmind b.xmind       fix several files, with debug logging\n  \
  xmfix --zip /opt/zip/bin/zip x.xmind   use a specific zip binary for repairs")]
pub struct Cli {
    /// XMind files (or already extracted directories) to repair
    #[arg(value_name = "FILES", required = true)]
    pub files: Vec<PathBuf>,

    /// Program used to extract archives
    #[arg(long = "unzip", value_name = "PROG", env = "XMFIX_UNZIP", default_value = "unzip")]
    pub unzip_program: String,

    /// Program used to repair archives (`zip -FF`)
    #[arg(long = "zip", value_name = "PROG", env = "XMFIX_ZIP", default_value = "zip")]
    pub zip_program: String,

    /// Seconds to wait for each external program, 0 waits forever
    #[arg(long, value_name = "SECS", env = "XMFIX_TIMEOUT", default_value_t = 120)]
    pub timeout: u64,

    /// Deflate entries of the rebuilt archive instead of storing them
    #[arg(long)]
    pub deflate: bool,

    /// More logging (-vv => trace)
    #[arg(short = 'v', action = clap::ArgAction::Count, conflicts_with = "quiet")]
    pub verbose: u8,

    /// Only log errors
    #[arg(short = 'q', long)]
    pub quiet: bool,
}

impl Cli {
    pub fn fixer_config(&self) -> FixerConfig {
        FixerConfig {
            tools: ToolConfig {
                unzip_program: self.unzip_program.clone(),
                zip_program: self.zip_program.clone(),
                timeout: (self.timeout > 0).then(|| Duration::from_secs(self.timeout)),
            },
            compression: if self.deflate {
                Compression::Deflated
            } else {
                Compression::Stored
            },
        }
    }

    /// Default filter directive when `RUST_LOG` is not set
    pub fn log_level(&self) -> &'static str {
        match (self.quiet, self.verbose) {
            (true, _) => "error",
            (false, 0) => "info",
            (false, 1) => "debug",
            (false, _) => "trace",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["xmfix", "a.xmind"]).unwrap();
        let config = cli.fixer_config();
        assert_eq!(config.compression, Compression::Stored);
        assert_eq!(config.tools.timeout, Some(Duration::from_secs(120)));
        assert_eq!(cli.log_level(), "info");
    }

    #[test]
    fn test_flags() {
        let cli = Cli::try_parse_from([
            "xmfix", "--deflate", "--timeout", "0", "--zip", "/bin/zip", "-vv", "a.xmind",
            "b.xmind",
        ])
        .unwrap();
        let config = cli.fixer_config();
        assert_eq!(cli.files.len(), 2);
        assert_eq!(config.compression, Compression::Deflated);
        assert_eq!(config.tools.timeout, None);
        assert_eq!(config.tools.zip_program, "/bin/zip");
        assert_eq!(cli.log_level(), "trace");
    }

    #[test]
    fn test_requires_a_file() {
        assert!(Cli::try_parse_from(["xmfix"]).is_err());
    }
}
