//! VGM 1.50 file loading.
//!
//! Only the narrow profile produced for this driver is accepted: version
//! 1.50 exactly, a single SN76489 at 3 579 545 Hz, command data starting at
//! 0x40. The fields actually interpreted sit at fixed offsets: ident (0x00),
//! end-of-file offset (0x04), version (0x08), PSG clock (0x0C) and loop
//! offset (0x1C). Everything else in the header is ignored, and any trailing
//! data past the declared end (GD3 tags and the like) is never read.

use std::fs;
use std::path::Path;

use log::debug;
use nom::bytes::complete::tag;
use nom::number::complete::le_u32;
use nom::IResult;

use crate::chip::MASTER_CLOCK_HZ;
use crate::error::LoadError;

/// File ident, the first four bytes of every VGM file.
pub const IDENT: [u8; 4] = *b"Vgm ";
/// The only version word this loader accepts.
pub const SUPPORTED_VERSION: u32 = 0x0000_0150;
/// Offset where the command stream begins; also the v1.50 header length.
pub const DATA_START: usize = 0x40;

const EOF_FIELD: usize = 0x04;
const VERSION_FIELD: usize = 0x08;
const CLOCK_FIELD: usize = 0x0C;
const LOOP_FIELD: usize = 0x1C;

fn ident(input: &[u8]) -> IResult<&[u8], &[u8]> {
    tag(&IDENT[..])(input)
}

fn word(input: &[u8]) -> IResult<&[u8], u32> {
    le_u32(input)
}

fn header_u32(bytes: &[u8], offset: usize) -> Result<u32, LoadError> {
    let truncated = LoadError::TruncatedFile {
        needed: offset + 4,
        len: bytes.len(),
    };
    let field = bytes.get(offset..).ok_or(truncated)?;
    match word(field) {
        Ok((_, value)) => Ok(value),
        Err(_) => Err(LoadError::TruncatedFile {
            needed: offset + 4,
            len: bytes.len(),
        }),
    }
}

/// A validated, immutable VGM command stream.
#[derive(Debug, Clone)]
pub struct Track {
    data: Vec<u8>,
    loop_offset: Option<usize>,
}

impl Track {
    /// Validate a raw VGM image and extract its command stream.
    ///
    /// Checks run in a fixed order and the first violation is reported:
    /// ident, version, PSG clock, declared length. A file too short to
    /// hold the ident fails the ident check itself. The loop offset is
    /// rebased onto the command stream but deliberately not range-checked;
    /// a loop pointing outside the stream surfaces as a
    /// [`TruncatedStream`](crate::PlaybackError::TruncatedStream) error when
    /// playback takes it.
    pub fn parse(bytes: &[u8]) -> Result<Track, LoadError> {
        ident(bytes).map_err(|_| LoadError::InvalidHeader)?;

        let version = header_u32(bytes, VERSION_FIELD)?;
        if version != SUPPORTED_VERSION {
            return Err(LoadError::UnsupportedVersion { found: version });
        }

        let clock = header_u32(bytes, CLOCK_FIELD)?;
        if clock != MASTER_CLOCK_HZ {
            return Err(LoadError::UnsupportedClock { found: clock });
        }

        // The EOF field counts from its own offset: total size = field + 4.
        let declared = u64::from(header_u32(bytes, EOF_FIELD)?) + 4;
        if (bytes.len() as u64) < declared {
            return Err(LoadError::TruncatedFile {
                needed: declared as usize,
                len: bytes.len(),
            });
        }
        let end = declared as usize;
        if end < DATA_START {
            return Err(LoadError::TruncatedFile {
                needed: DATA_START,
                len: end,
            });
        }
        let data = bytes[DATA_START..end].to_vec();

        let loop_raw = header_u32(bytes, LOOP_FIELD)?;
        // The loop field also counts from its own offset; rebase it onto the
        // command stream. Kept even when out of range (see above).
        let loop_offset = if loop_raw == 0 {
            None
        } else {
            Some((loop_raw as usize).wrapping_add(LOOP_FIELD).wrapping_sub(DATA_START))
        };

        debug!(
            "loaded VGM track: {} command bytes, loop offset {:?}",
            data.len(),
            loop_offset
        );
        Ok(Track { data, loop_offset })
    }

    /// Read a VGM file from disk and parse it.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Track, LoadError> {
        let bytes = fs::read(path)?;
        Track::parse(&bytes)
    }

    /// Assemble a track from an already-extracted command stream.
    ///
    /// Bypasses header validation, for programmatically generated streams.
    /// The loop offset is taken on trust exactly like a parsed one and
    /// surfaces as a playback error if it points outside the stream.
    pub fn from_parts(data: Vec<u8>, loop_offset: Option<usize>) -> Track {
        Track { data, loop_offset }
    }

    /// The command stream, starting at what the file calls offset 0x40.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Length of the command stream in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True when the file declared an empty command stream.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Index into the command stream to resume at after the end marker.
    pub fn loop_offset(&self) -> Option<usize> {
        self.loop_offset
    }
}
