use std::time::Duration;

/// Default upper bound for a single external tool invocation.
pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(120);

/// How entries are stored in a rebuilt archive
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Compression {
    /// No compression, the usual layout of XMind documents
    #[default]
    Stored,
    Deflated,
}

/// External programs used by the extraction cascade
#[derive(Debug, Clone)]
pub struct ToolConfig {
    /// Invoked as `<unzip> <archive> -d <dir>`
    pub unzip_program: String,
    /// Invoked as `<zip> -FF <archive> --out <output>`
    pub zip_program: String,
    /// `None` waits forever
    pub timeout: Option<Duration>,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            unzip_program: "unzip".to_string(),
            zip_program: "zip".to_string(),
            timeout: Some(DEFAULT_TOOL_TIMEOUT),
        }
    }
}

/// Settings for one [`FixerSession`](crate::FixerSession)
#[derive(Debug, Clone, Default)]
pub struct FixerConfig {
    pub tools: ToolConfig,
    pub compression: Compression,
}
