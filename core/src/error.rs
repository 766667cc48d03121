use thiserror::Error;

/// Stable error category, so callers can branch without matching on text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Envelope/key mismatch or undecodable driver response.
    Protocol,
    /// A well-formed response omitted a mandatory value.
    MissingValue,
    /// The device control call (or the device itself) failed.
    DeviceIo,
    /// Filesystem failure during a report session.
    Session,
    /// The session generation counter moved unexpectedly.
    GenerationMismatch,
    /// A report was produced by an unexpected backend.
    ProviderMismatch,
    /// Caller input rejected before reaching the backend.
    InvalidInput,
    InvalidSignature,
    Measurement,
    Timestamp,
    Nonce,
    Debug,
    /// Report could not be decoded or the external verifier rejected it.
    Verifier,
    Unsupported,
    Config,
    Io,
    Serialization,
}

/// Attestation error types.
#[derive(Error, Debug)]
pub enum AttestError {
    /// Driver response framing did not match the request
    #[error("Driver protocol error: {0}")]
    Protocol(String),

    /// Mandatory response field was empty
    #[error("Missing value in {operation} response: {field}")]
    MissingValue { operation: String, field: String },

    /// Device control call failed
    #[error("Device I/O error during {operation}: {message}")]
    DeviceIo { operation: String, message: String },

    /// Report session filesystem failure
    #[error("Report session error: {0}")]
    Session(String),

    /// Writing a session attribute failed
    #[error("Failed to write report attribute {attribute}: {source}")]
    AttributeWrite {
        attribute: String,
        #[source]
        source: std::io::Error,
    },

    /// Session state was mutated concurrently
    #[error("Generation mismatch: expected {expected}, observed {observed}")]
    GenerationMismatch { expected: u64, observed: u64 },

    /// Report produced by the wrong backend
    #[error("Provider mismatch: expected {expected}, got {actual}")]
    ProviderMismatch { expected: String, actual: String },

    /// Input exceeds the backend's size ceiling
    #[error("Input too large: {len} bytes exceeds limit of {max}")]
    InputTooLarge { len: usize, max: usize },

    /// Requested privilege level outside the permitted range
    #[error("Privilege level {level} out of range [{floor}, {ceiling}]")]
    PrivilegeOutOfRange { level: u32, floor: u32, ceiling: u32 },

    /// Report signature did not verify
    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    /// Measurement did not match the expected value
    #[error("Measurement mismatch: expected {expected}, got {actual}")]
    Measurement { expected: String, actual: String },

    /// Verification time outside the report validity window
    #[error("Timestamp {timestamp} outside validity window [{not_before}, {not_after}]")]
    Timestamp {
        timestamp: i64,
        not_before: i64,
        not_after: i64,
    },

    /// Nonce did not match
    #[error("Nonce mismatch")]
    Nonce,

    /// Report came from an environment in debug mode
    #[error("Debug mode not permitted: {0}")]
    Debug(String),

    /// Report decoding or external verification failed
    #[error("Verifier error: {0}")]
    Verifier(String),

    /// Backend not available on this platform
    #[error("Backend not supported: {0}")]
    Unsupported(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl AttestError {
    /// Category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            AttestError::Protocol(_) => ErrorKind::Protocol,
            AttestError::MissingValue { .. } => ErrorKind::MissingValue,
            AttestError::DeviceIo { .. } => ErrorKind::DeviceIo,
            AttestError::Session(_) | AttestError::AttributeWrite { .. } => ErrorKind::Session,
            AttestError::GenerationMismatch { .. } => ErrorKind::GenerationMismatch,
            AttestError::ProviderMismatch { .. } => ErrorKind::ProviderMismatch,
            AttestError::InputTooLarge { .. } | AttestError::PrivilegeOutOfRange { .. } => {
                ErrorKind::InvalidInput
            }
            AttestError::InvalidSignature(_) => ErrorKind::InvalidSignature,
            AttestError::Measurement { .. } => ErrorKind::Measurement,
            AttestError::Timestamp { .. } => ErrorKind::Timestamp,
            AttestError::Nonce => ErrorKind::Nonce,
            AttestError::Debug(_) => ErrorKind::Debug,
            AttestError::Verifier(_) => ErrorKind::Verifier,
            AttestError::Unsupported(_) => ErrorKind::Unsupported,
            AttestError::Config(_) => ErrorKind::Config,
            AttestError::Io(_) => ErrorKind::Io,
            AttestError::Serialization(_) => ErrorKind::Serialization,
        }
    }
}

impl From<serde_json::Error> for AttestError {
    fn from(err: serde_json::Error) -> Self {
        AttestError::Serialization(err.to_string())
    }
}

/// Result type alias for attestation operations
pub type Result<T> = std::result::Result<T, AttestError>;
