/// Log tags identify the subsystem a message comes from
///
/// Each tag maps to a `--debug-<key>` command-line flag.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LogTag {
    System,
    Config,
    Source,
    Decoder,
    Classifier,
    Window,
    Hub,
    Webserver,
    Storage,
    Test,
    Other(String),
}

impl LogTag {
    /// Key used in `--debug-<key>` / `--verbose-<key>` flags
    pub fn to_debug_key(&self) -> String {
        match self {
            LogTag::System => "system".to_string(),
            LogTag::Config => "config".to_string(),
            LogTag::Source => "source".to_string(),
            LogTag::Decoder => "decoder".to_string(),
            LogTag::Classifier => "classifier".to_string(),
            LogTag::Window => "window".to_string(),
            LogTag::Hub => "hub".to_string(),
            LogTag::Webserver => "webserver".to_string(),
            LogTag::Storage => "storage".to_string(),
            LogTag::Test => "test".to_string(),
            LogTag::Other(name) => name.to_lowercase(),
        }
    }

    /// Uncolored label used in the log file
    pub fn to_plain_string(&self) -> String {
        match self {
            LogTag::Other(name) => name.to_uppercase(),
            other => other.to_debug_key().to_uppercase(),
        }
    }
}

impl std::fmt::Display for LogTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_plain_string())
    }
}
