use thiserror::Error;

/// Failure while decoding or resampling a sample file
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: hound::Error,
    },
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: hound::Error,
    },
    #[error("sample file is empty: {0}")]
    Empty(String),
    #[error("{path} has {channels} channels, only mono and stereo are supported")]
    UnsupportedChannels { path: String, channels: u16 },
    #[error("resampling {path} failed: {reason}")]
    Resample { path: String, reason: String },
}

/// Failure while bringing up a send-effect plugin
#[derive(Debug, Error)]
pub enum PluginError {
    #[error("plugin {lib}/{label} not found")]
    NotFound { lib: String, label: String },
    #[error("plugin {0} failed to instantiate")]
    Instantiate(String),
    #[error("plugin {0} failed to start")]
    Start(String),
}

/// Malformed sysex or state blob
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("message truncated at byte {0}")]
    Truncated(usize),
    #[error("unterminated string at byte {0}")]
    Unterminated(usize),
    #[error("string of {0} bytes does not fit a length byte")]
    StringTooLong(usize),
    #[error("expected init data, got command {0}")]
    NotInitData(u8),
    #[error("state control byte mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u8, found: u8 },
    #[error("unknown sysex command {0}")]
    UnknownCommand(u8),
    #[error("empty sysex message")]
    Empty,
}
