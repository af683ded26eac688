use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Failed to read input file: {0}")]
    InputReadError(String),

    #[error("Failed to write output file: {0}")]
    OutputWriteError(String),

    #[error("Failed to decode RAW image: {0}")]
    DecodeError(String),

    #[error("Failed to encode TIFF image: {0}")]
    EncodeError(String),

    #[error("Invalid image dimensions: width={0}, height={1}")]
    InvalidDimensions(usize, usize),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Image has no color filter array, only shrink mode is possible")]
    NoColorFilterArray,

    #[error("Can not downsize from {from} to {to}")]
    UpscaleNotSupported { from: usize, to: usize },

    #[error("Cannot use camera white balance")]
    NoCameraWb,

    #[error("No white balance preset '{name}' for {make} {model}")]
    PresetNotFound {
        make: String,
        model: String,
        name: String,
    },

    #[error("Darkframe '{0}' is incompatible with main image")]
    DarkframeMismatch(String),

    #[error("Phase '{0}' has no buffer to read")]
    MissingBuffer(&'static str),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// How the orchestrator reacts to an error kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The session can not be opened or continued.
    Fatal,
    /// A documented fallback exists; the caller retries once and warns.
    Recoverable,
}

impl PipelineError {
    pub fn severity(&self) -> Severity {
        match self {
            PipelineError::NoCameraWb
            | PipelineError::PresetNotFound { .. }
            | PipelineError::UpscaleNotSupported { .. } => Severity::Recoverable,
            _ => Severity::Fatal,
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
