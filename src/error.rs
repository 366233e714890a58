//! Error handling for VGM loading, playback and chip encoding.

use thiserror::Error;

/// Result type for driver operations
pub type Result<T> = std::result::Result<T, Sn76489Error>;

/// Errors raised while validating and parsing a VGM file.
#[derive(Debug, Error)]
pub enum LoadError {
    /// File does not start with the expected `Vgm ` ident.
    #[error("VGM file must start with 'Vgm ' ident")]
    InvalidHeader,
    /// Header declares a VGM version other than 1.50.
    #[error("unsupported VGM version 0x{found:08x} (only 0x00000150 is supported)")]
    UnsupportedVersion {
        /// Raw version word read from offset 0x08.
        found: u32,
    },
    /// Header declares a PSG clock this driver cannot represent.
    #[error("unsupported PSG clock {found} Hz (expected 3579545)")]
    UnsupportedClock {
        /// Clock value read from offset 0x0C.
        found: u32,
    },
    /// File is shorter than its header claims.
    #[error("truncated file: {len} bytes present, header requires {needed}")]
    TruncatedFile {
        /// Number of bytes the header layout requires.
        needed: usize,
        /// Number of bytes actually available.
        len: usize,
    },
    /// IO error from the byte source.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while interpreting a loaded command stream.
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// `tick` was called after the track already ended.
    #[error("end of song")]
    EndOfSong,
    /// An opcode outside the supported command set was encountered.
    #[error("unknown command 0x{opcode:02x} at offset 0x{offset:04x}")]
    UnknownCommand {
        /// Offset of the opcode inside the command stream.
        offset: usize,
        /// The unrecognized opcode byte.
        opcode: u8,
    },
    /// The stream ran out before an end-of-stream marker was consumed.
    #[error("command stream ends unexpectedly at offset 0x{offset:04x}")]
    TruncatedStream {
        /// Offset at which the next byte was expected.
        offset: usize,
    },
    /// IO error from the register sink.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while encoding register frames.
#[derive(Debug, Error)]
pub enum EncodingError {
    /// A parameter does not fit the register field it targets.
    #[error("{param} out of range: got {value}, max {max}")]
    OutOfRange {
        /// Name of the offending parameter.
        param: &'static str,
        /// Value passed by the caller.
        value: u8,
        /// Largest accepted value.
        max: u8,
    },
}

/// Errors raised while tokenizing a note script.
#[derive(Debug, Error)]
pub enum SequencerError {
    /// A character outside the note mini-language was encountered.
    #[error("unknown token '{found}' at position {position}")]
    UnknownToken {
        /// Character index into the script.
        position: usize,
        /// The offending character.
        found: char,
    },
}

/// Top-level error type unifying the driver's components.
#[derive(Debug, Error)]
pub enum Sn76489Error {
    /// Error while loading a VGM file.
    #[error("load error: {0}")]
    Load(#[from] LoadError),
    /// Error while interpreting a command stream.
    #[error("playback error: {0}")]
    Playback(#[from] PlaybackError),
    /// Error while encoding a register frame.
    #[error("encoding error: {0}")]
    Encoding(#[from] EncodingError),
    /// Error while tokenizing a note script.
    #[error("sequencer error: {0}")]
    Sequencer(#[from] SequencerError),
    /// IO error from the register sink or byte source.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Generic error.
    #[error("{0}")]
    Other(String),
}

impl From<String> for Sn76489Error {
    fn from(s: String) -> Self {
        Sn76489Error::Other(s)
    }
}

impl From<&str> for Sn76489Error {
    fn from(s: &str) -> Self {
        Sn76489Error::Other(s.to_string())
    }
}
