use thiserror::Error;

/// Errors raised by the binary cursor when a command buffer is too short
/// for a requested read.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReadError {
    /// The requested span extends past the end of the buffer
    #[error("stream read error: needed {needed} bytes, {remaining} remaining")]
    Underrun { needed: usize, remaining: usize },

    /// A length-prefixed string declared a negative length
    #[error("stream read error: negative string length {0}")]
    NegativeLength(i32),

    /// String bytes were not valid UTF-8
    #[error("stream read error: string is not valid utf-8")]
    InvalidUtf8,
}

/// Errors for operands that decode cleanly but violate a protocol bound or
/// precondition. These are unrecoverable: the stream has desynchronized.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("unrecognized stream command: {0}")]
    UnknownCommand(u8),

    #[error("unrecognized session message kind: {0} (size {1})")]
    UnknownMessageKind(u8, usize),

    #[error("received an empty command buffer")]
    EmptyCommand,

    #[error("invalid {kind} id {id}: out of bounds (max {max})")]
    IdOutOfBounds { kind: &'static str, id: i64, max: u32 },

    #[error("invalid {kind} id {id}: empty slot")]
    EmptySlot { kind: &'static str, id: u32 },

    #[error("invalid {kind} id {id}: slot already occupied")]
    OccupiedSlot { kind: &'static str, id: u32 },

    #[error("invalid node type id: {0}")]
    UnknownNodeType(i32),

    #[error("invalid effect kind: {0}")]
    UnknownEffectKind(i32),

    #[error("invalid array size ({0})")]
    InvalidArraySize(i32),

    #[error("invalid {kind} blob size ({size})")]
    InvalidBlobSize { kind: &'static str, size: i32 },
}

/// Errors indicating that declared and actual lengths disagree, or that a
/// decoded quantity is implausible. Always treated as stream corruption.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CorruptionError {
    #[error("got non-positive stepsize {0}; corrupt stream")]
    NonPositiveStep(i32),

    #[error("got abnormally large stepsize {0}; probably a corrupt stream")]
    StepSizeTooLarge(i32),

    #[error("buffered base time went negative; corrupt stream")]
    BufferedTimeUnderflow,

    #[error("invalid body correction data: declared {declared} bytes, consumed {consumed}")]
    BodyStateLengthMismatch { declared: u16, consumed: usize },

    #[error("invalid correction data: {trailing} trailing bytes")]
    CorrectionTrailingBytes { trailing: usize },

    #[error("invalid commands envelope: sub-record overruns buffer")]
    EnvelopeTruncated,

    #[error("replay frame declared zero length")]
    EmptyReplayFrame,
}

/// Errors validating a replay file's header.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("incorrect replay file id: {found:#010x}")]
    BadFileId { found: u32 },

    #[error("unsupported replay protocol version {version} (supported {min}..={max})")]
    UnsupportedVersion { version: u16, min: u16, max: u16 },

    #[error("replay file truncated while reading header")]
    TruncatedHeader,
}

/// Top-level error for a session. Any of these raised inside the dispatch
/// loop terminates the session; there is no mid-stream recovery.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Read(#[from] ReadError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Corruption(#[from] CorruptionError),

    #[error(transparent)]
    Format(#[from] FormatError),

    #[error("replay io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to decompress replay frame of {payload_size} bytes; frame may be malformed")]
    DecompressionFailed { payload_size: usize },

    #[error("failed to compress message of {payload_size} bytes")]
    CompressionFailed { payload_size: usize },
}

impl SessionError {
    /// Whether this error came from replay header validation.
    pub fn is_format(&self) -> bool {
        matches!(self, SessionError::Format(_))
    }
}
