//! Error taxonomy for the social span engine.

use super::registry::{RecognizerHandle, RecognizerKind};

/// Why a recognizer's output was rejected by the scanner
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OffsetFault {
    /// Span is empty or reversed
    Empty { start: usize, end: usize },
    /// Span extends past the end of the text
    OutOfBounds { end: usize, len: usize },
    /// Offset falls inside a UTF-8 sequence
    SplitsCharacter(usize),
    /// Offset falls inside a grapheme cluster
    SplitsGrapheme(usize),
    /// Span starts before the end of the recognizer's previous span
    Unordered { start: usize, previous_end: usize },
}

impl std::fmt::Display for OffsetFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OffsetFault::Empty { start, end } => write!(f, "empty span {}..{}", start, end),
            OffsetFault::OutOfBounds { end, len } => {
                write!(f, "span end {} past text length {}", end, len)
            }
            OffsetFault::SplitsCharacter(at) => write!(f, "offset {} splits a character", at),
            OffsetFault::SplitsGrapheme(at) => write!(f, "offset {} splits a grapheme cluster", at),
            OffsetFault::Unordered { start, previous_end } => write!(
                f,
                "span at {} overlaps previous span ending at {}",
                start, previous_end
            ),
        }
    }
}

/// Engine errors
#[derive(Debug, Clone, PartialEq)]
pub enum SocialError {
    DuplicateCustomId(String),
    MalformedMatchOffset {
        recognizer: RecognizerHandle,
        kind: RecognizerKind,
        fault: OffsetFault,
    },
    ConcurrentRegistryMutation { in_flight: usize },
    ListenerFailure { kind: RecognizerKind, message: String },
    InvalidPattern { id: String, message: String },
    UnknownRecognizer(String),
    BuiltinNotRemovable(RecognizerKind),
    InvalidConfig(String),
}

impl std::fmt::Display for SocialError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SocialError::DuplicateCustomId(id) => write!(f, "Duplicate custom recognizer id: {}", id),
            SocialError::MalformedMatchOffset { recognizer, kind, fault } => write!(
                f,
                "Malformed match offset from recognizer {} ({}): {}",
                recognizer.0, kind, fault
            ),
            SocialError::ConcurrentRegistryMutation { in_flight } => write!(
                f,
                "Registry mutated while {} scan(s) in flight",
                in_flight
            ),
            SocialError::ListenerFailure { kind, message } => {
                write!(f, "Listener for {} failed: {}", kind, message)
            }
            SocialError::InvalidPattern { id, message } => {
                write!(f, "Invalid pattern for {}: {}", id, message)
            }
            SocialError::UnknownRecognizer(what) => write!(f, "Unknown recognizer: {}", what),
            SocialError::BuiltinNotRemovable(kind) => {
                write!(f, "Built-in recognizer {} can only be disabled", kind)
            }
            SocialError::InvalidConfig(msg) => write!(f, "Invalid config: {}", msg),
        }
    }
}

impl std::error::Error for SocialError {}

pub type Result<T> = std::result::Result<T, SocialError>;
