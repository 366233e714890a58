//! SN76489 register protocol.
//!
//! The chip is programmed through single-byte writes on its parallel bus. A
//! byte with the top bit set is a *latch* byte selecting channel and register
//! and carrying the low payload bits; a byte with the top bit clear is a
//! *data* byte carrying the remaining high-order bits of the latched
//! register. Tone updates take a latch/data pair, volume and noise updates a
//! single latch byte.
//!
//! [`encode_tone`], [`encode_volume`] and [`encode_noise`] are pure and
//! return the exact byte sequence as a [`RegisterFrame`]; [`Sn76489`] pushes
//! frames into a [`RegisterSink`], which is the injected transport to the
//! physical bus (or a capture buffer such as [`MemorySink`]).

use std::io;

use log::trace;

use crate::error::{EncodingError, Sn76489Error};

/// Master clock the chip is driven at, in Hz.
pub const MASTER_CLOCK_HZ: u32 = 3_579_545;

/// Largest tone register value this driver emits.
///
/// Values 1022 and 1023 are reserved for sample playback and must never
/// reach the chip.
pub const MAX_TONE_REG: u32 = 1021;

/// Volume-silence latch bytes for channels 0-3, the chip's power-on state.
pub const SILENCE_SEQUENCE: [u8; 4] = [0x9F, 0xBF, 0xDF, 0xFF];

// Latch byte bases: bit 7 set, bits 6-5 channel, bit 4 register select.
const LATCH_TONE: u8 = 0b1000_0000;
const LATCH_VOLUME: u8 = 0b1001_0000;
const LATCH_NOISE: u8 = 0b1111_0000;

/// One logical chip update: a single latch byte, or a latch/data pair.
///
/// Frames are produced by the encoders and written out immediately; they are
/// never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterFrame {
    bytes: [u8; 2],
    len: u8,
}

impl RegisterFrame {
    const fn single(latch: u8) -> Self {
        RegisterFrame {
            bytes: [latch, 0],
            len: 1,
        }
    }

    const fn pair(latch: u8, data: u8) -> Self {
        RegisterFrame {
            bytes: [latch, data],
            len: 2,
        }
    }

    /// The frame's bytes in bus order.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }
}

/// Encode a tone update for channels 0-2.
///
/// The register value is `floor(MASTER_CLOCK_HZ / (frequency_hz * 32))`,
/// clamped to [`MAX_TONE_REG`]. The frequency itself is not range-checked:
/// the chip resolves roughly 110.35 Hz to 55930.4 Hz, and values outside
/// that band only saturate through the register clamp. Staying in range is
/// the caller's responsibility.
pub fn encode_tone(channel: u8, frequency_hz: f32) -> Result<RegisterFrame, EncodingError> {
    if channel > 2 {
        return Err(EncodingError::OutOfRange {
            param: "tone channel",
            value: channel,
            max: 2,
        });
    }
    let reg = (MASTER_CLOCK_HZ as f32 / (frequency_hz * 32.0)) as u32;
    let reg = reg.min(MAX_TONE_REG);
    // Latch carries the low nibble, the data byte the remaining six bits.
    let latch = LATCH_TONE | (channel << 5) | (reg & 0x0F) as u8;
    let data = (reg >> 4) as u8;
    Ok(RegisterFrame::pair(latch, data))
}

/// Encode a volume update for channels 0-3 (3 is the noise channel).
///
/// `volume` is the intuitive scale, 0 = silent to 15 = loudest; the chip
/// wants attenuation, so the value is inverted here.
pub fn encode_volume(channel: u8, volume: u8) -> Result<RegisterFrame, EncodingError> {
    if channel > 3 {
        return Err(EncodingError::OutOfRange {
            param: "volume channel",
            value: channel,
            max: 3,
        });
    }
    if volume > 15 {
        return Err(EncodingError::OutOfRange {
            param: "volume",
            value: volume,
            max: 15,
        });
    }
    Ok(RegisterFrame::single(
        LATCH_VOLUME | (channel << 5) | (15 - volume),
    ))
}

/// Encode a noise control update.
///
/// `mode` 0 is periodic noise, 1 is white noise; `shift_rate` selects one of
/// the four clock divider taps (0-3).
pub fn encode_noise(mode: u8, shift_rate: u8) -> Result<RegisterFrame, EncodingError> {
    if mode > 1 {
        return Err(EncodingError::OutOfRange {
            param: "noise mode",
            value: mode,
            max: 1,
        });
    }
    if shift_rate > 3 {
        return Err(EncodingError::OutOfRange {
            param: "noise shift rate",
            value: shift_rate,
            max: 3,
        });
    }
    Ok(RegisterFrame::single(LATCH_NOISE | (mode << 2) | shift_rate))
}

/// Transport that shifts bytes onto the chip's parallel bus.
///
/// Implementors own the write-enable pulse framing around each byte; the
/// driver only sequences byte values.
pub trait RegisterSink {
    /// Write one byte to the chip.
    fn write(&mut self, byte: u8) -> io::Result<()>;
}

/// Sink that records every byte instead of touching hardware.
///
/// Useful as a test double and for dry-run inspection of the byte traffic a
/// track or note script produces.
#[derive(Debug, Default)]
pub struct MemorySink {
    written: Vec<u8>,
}

impl MemorySink {
    /// Create an empty capture sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// All bytes written so far, in write order.
    pub fn bytes(&self) -> &[u8] {
        &self.written
    }

    /// Remove and return the captured bytes, leaving the sink empty.
    pub fn take(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.written)
    }
}

impl RegisterSink for MemorySink {
    fn write(&mut self, byte: u8) -> io::Result<()> {
        self.written.push(byte);
        Ok(())
    }
}

/// SN76489 driver over an injected [`RegisterSink`].
///
/// Construction issues the power-on [`SILENCE_SEQUENCE`] so the chip starts
/// from a known all-silent state.
pub struct Sn76489<S: RegisterSink> {
    sink: S,
}

impl<S: RegisterSink> Sn76489<S> {
    /// Create a driver and silence all four channels.
    pub fn new(sink: S) -> io::Result<Self> {
        let mut chip = Sn76489 { sink };
        chip.reset()?;
        Ok(chip)
    }

    /// Re-issue the power-on silence sequence.
    pub fn reset(&mut self) -> io::Result<()> {
        for byte in SILENCE_SEQUENCE {
            self.sink.write(byte)?;
        }
        trace!("chip reset: all channels silenced");
        Ok(())
    }

    /// Raw passthrough for already-encoded bytes (the VGM `0x50` path).
    pub fn write(&mut self, byte: u8) -> io::Result<()> {
        self.sink.write(byte)
    }

    /// Set the tone frequency of channels 0-2. See [`encode_tone`].
    pub fn set_tone(&mut self, channel: u8, frequency_hz: f32) -> Result<(), Sn76489Error> {
        let frame = encode_tone(channel, frequency_hz)?;
        self.emit(frame)?;
        Ok(())
    }

    /// Set the volume of channels 0-3 (0 = silent, 15 = loudest).
    pub fn set_volume(&mut self, channel: u8, volume: u8) -> Result<(), Sn76489Error> {
        let frame = encode_volume(channel, volume)?;
        self.emit(frame)?;
        Ok(())
    }

    /// Configure the noise channel. See [`encode_noise`].
    pub fn set_noise(&mut self, mode: u8, shift_rate: u8) -> Result<(), Sn76489Error> {
        let frame = encode_noise(mode, shift_rate)?;
        self.emit(frame)?;
        Ok(())
    }

    /// Shared reference to the injected sink.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Mutable reference to the injected sink.
    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Consume the driver and return the sink.
    pub fn into_inner(self) -> S {
        self.sink
    }

    fn emit(&mut self, frame: RegisterFrame) -> io::Result<()> {
        for &byte in frame.as_bytes() {
            self.sink.write(byte)?;
        }
        Ok(())
    }
}
