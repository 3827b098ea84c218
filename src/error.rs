use std::fmt;

/// Errors raised by engine, bank, and timeline operations.
///
/// Public `AudioSystem` calls never surface these directly: a failing call
/// degrades to a no-op and the message becomes retrievable through
/// `AudioSystem::last_error`.
#[derive(Debug, Clone, PartialEq)]
pub enum AudioError {
    /// Voice index outside the fixed pool.
    InvalidVoice(usize),
    /// LFO index outside the fixed pool.
    InvalidLfo(usize),
    /// Sound id not present in the bank (never loaded, or deleted).
    UnknownSound(u32),
    /// Note-name string that does not parse (`"C4"`, `"A#3"`, `"Bb5"`...).
    BadNoteName(String),
    /// Timeline operation issued without an active recording session.
    NoSession,
    /// A parameter outside its documented range, e.g. a non-positive
    /// frequency or tempo.
    BadParameter(String),
    /// A voice naming itself as its own ring-mod or sync source.
    SelfReference(usize),
    /// Unknown direct-routing destination name.
    UnknownDestination(String),
    /// File I/O failure while saving or loading audio.
    Io(String),
}

impl fmt::Display for AudioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AudioError::InvalidVoice(i) => write!(f, "invalid voice index {i}"),
            AudioError::InvalidLfo(i) => write!(f, "invalid LFO index {i}"),
            AudioError::UnknownSound(id) => write!(f, "unknown sound id {id}"),
            AudioError::BadNoteName(name) => write!(f, "malformed note name '{name}'"),
            AudioError::NoSession => write!(f, "no active timeline session"),
            AudioError::BadParameter(what) => write!(f, "bad parameter: {what}"),
            AudioError::SelfReference(i) => {
                write!(f, "voice {i} cannot use itself as a modulation source")
            }
            AudioError::UnknownDestination(name) => {
                write!(f, "unknown output destination '{name}'")
            }
            AudioError::Io(msg) => write!(f, "audio I/O error: {msg}"),
        }
    }
}

impl std::error::Error for AudioError {}

impl From<hound::Error> for AudioError {
    fn from(e: hound::Error) -> Self {
        AudioError::Io(e.to_string())
    }
}

impl From<std::io::Error> for AudioError {
    fn from(e: std::io::Error) -> Self {
        AudioError::Io(e.to_string())
    }
}
