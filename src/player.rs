//! Tick-driven VGM playback.
//!
//! This module is the resumable interpreter over a loaded command stream:
//! - one [`VgmPlayer::tick`] per 1/60 s, driven by the host's scheduler
//! - a signed pending-tick ledger for the wait commands
//! - instantaneous looping via the end-of-stream marker
//! - end-of-song detection, terminal until the next [`VgmPlayer::load`]
//!
//! The engine keeps no notion of wall-clock time; only the blocking
//! [`VgmPlayer::play`] convenience sleeps between ticks.

use std::path::Path;
use std::thread;
use std::time::Duration;

use log::{debug, trace};

use crate::chip::{RegisterSink, Sn76489};
use crate::error::{PlaybackError, Result};
use crate::vgm::Track;

/// Nominal cadence `tick` is designed to be called at.
pub const TICK_RATE_HZ: u32 = 60;
/// Rate at which VGM wait commands count samples.
pub const SAMPLE_RATE_HZ: u32 = 44_100;
/// Samples per tick at the nominal cadence; fixed by the format.
pub const SAMPLES_PER_TICK: u16 = 735;
/// Wall-clock length of one tick, used by the blocking play loop.
pub const TICK_PERIOD: Duration = Duration::from_micros(16_666);

// Supported command opcodes.
const CMD_PSG_WRITE: u8 = 0x50;
const CMD_WAIT_SAMPLES: u8 = 0x61;
const CMD_WAIT_TICK: u8 = 0x62;
const CMD_END: u8 = 0x66;

/// What a single [`VgmPlayer::tick`] call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickResult {
    /// A pending wait consumed the tick; no commands were interpreted.
    Waited,
    /// Commands were interpreted up to the next wait.
    Advanced,
    /// The end marker was taken as a jump back to the loop offset.
    Looped,
    /// The end marker was reached with no loop set; the track is over.
    Finished,
    /// A stop request was honored and the chip silenced.
    Stopped,
}

/// Resumable interpreter over a loaded [`Track`].
///
/// The player owns plain state only (cursor, wait ledger, flags); the chip
/// is borrowed per call, so one driver can serve several players over time.
pub struct VgmPlayer {
    track: Option<Track>,
    cursor: usize,
    pending_ticks: i64,
    ended: bool,
    stop_requested: bool,
}

impl VgmPlayer {
    /// Create a player with no track loaded.
    pub fn new() -> Self {
        VgmPlayer {
            track: None,
            cursor: 0,
            pending_ticks: 0,
            ended: false,
            stop_requested: false,
        }
    }

    /// Install a track and reset all playback state.
    pub fn load(&mut self, track: Track) {
        debug!(
            "track loaded: {} command bytes, loop offset {:?}",
            track.len(),
            track.loop_offset()
        );
        self.track = Some(track);
        self.cursor = 0;
        self.pending_ticks = 0;
        self.ended = false;
        self.stop_requested = false;
    }

    /// True once the end marker was consumed with no loop set.
    pub fn ended(&self) -> bool {
        self.ended
    }

    /// Index of the next command byte to interpret.
    pub fn position(&self) -> usize {
        self.cursor
    }

    /// Request a stop; honored by the next [`tick`](Self::tick), which
    /// silences the chip and ends playback. A no-op once the track ended.
    pub fn stop(&mut self) {
        self.stop_requested = true;
    }

    /// Advance playback by one tick.
    ///
    /// Interprets zero or more commands: raw PSG writes pass straight to
    /// the chip, a wait command pauses interpretation until enough later
    /// ticks have elapsed, and the end marker either jumps to the loop
    /// offset (continuing within this same tick) or ends the track. The
    /// wait ledger is decremented before the check on every call and wait
    /// credits are added onto the decremented value, so it dips below zero
    /// between waits; this matches the register dumps this driver was
    /// built against and must not be reordered.
    ///
    /// A loop whose body contains no wait command never yields and will
    /// spin inside this call; every real track waits between loop passes.
    ///
    /// # Errors
    ///
    /// [`PlaybackError::EndOfSong`] once the track ended (idempotent, no
    /// writes), [`PlaybackError::UnknownCommand`] on an unsupported opcode,
    /// [`PlaybackError::TruncatedStream`] when the stream or an operand
    /// runs out, and [`PlaybackError::Io`] from the register sink. All are
    /// fatal for the current track; `load` a fresh one to recover.
    pub fn tick<S: RegisterSink>(
        &mut self,
        chip: &mut Sn76489<S>,
    ) -> std::result::Result<TickResult, PlaybackError> {
        if self.ended {
            return Err(PlaybackError::EndOfSong);
        }
        if self.stop_requested {
            chip.reset()?;
            self.stop_requested = false;
            self.ended = true;
            debug!("stop request honored; playback ended");
            return Ok(TickResult::Stopped);
        }

        self.pending_ticks -= 1;
        if self.pending_ticks > 0 {
            return Ok(TickResult::Waited);
        }

        let data: &[u8] = self.track.as_ref().map(Track::data).unwrap_or(&[]);
        let loop_offset = self.track.as_ref().and_then(Track::loop_offset);

        let mut cursor = self.cursor;
        let mut looped = false;
        let result = loop {
            let opcode = match data.get(cursor) {
                Some(&byte) => byte,
                None => return Err(PlaybackError::TruncatedStream { offset: cursor }),
            };
            match opcode {
                CMD_PSG_WRITE => {
                    let value = operand(data, cursor + 1)?;
                    chip.write(value)?;
                    cursor += 2;
                }
                CMD_WAIT_SAMPLES => {
                    let lo = operand(data, cursor + 1)?;
                    let hi = operand(data, cursor + 2)?;
                    let samples = u16::from_le_bytes([lo, hi]);
                    self.pending_ticks += i64::from(samples / SAMPLES_PER_TICK);
                    cursor += 3;
                    break TickResult::Advanced;
                }
                CMD_WAIT_TICK => {
                    self.pending_ticks += 1;
                    cursor += 1;
                    break TickResult::Advanced;
                }
                CMD_END => match loop_offset {
                    Some(offset) => {
                        trace!("loop taken: cursor 0x{:04x} -> 0x{:04x}", cursor, offset);
                        cursor = offset;
                        looped = true;
                    }
                    None => {
                        trace!("end of song at offset 0x{:04x}", cursor);
                        self.ended = true;
                        break TickResult::Finished;
                    }
                },
                opcode => {
                    return Err(PlaybackError::UnknownCommand {
                        offset: cursor,
                        opcode,
                    });
                }
            }
        };
        self.cursor = cursor;

        if looped && result == TickResult::Advanced {
            Ok(TickResult::Looped)
        } else {
            Ok(result)
        }
    }

    /// Tick the loaded track to completion, sleeping one [`TICK_PERIOD`]
    /// between ticks. Returns immediately when the track already ended.
    pub fn play<S: RegisterSink>(
        &mut self,
        chip: &mut Sn76489<S>,
    ) -> std::result::Result<(), PlaybackError> {
        if self.ended {
            return Ok(());
        }
        loop {
            match self.tick(chip)? {
                TickResult::Finished | TickResult::Stopped => return Ok(()),
                _ => thread::sleep(TICK_PERIOD),
            }
        }
    }

    /// Load a VGM file from disk and play it to completion.
    pub fn play_file<S: RegisterSink, P: AsRef<Path>>(
        &mut self,
        chip: &mut Sn76489<S>,
        path: P,
    ) -> Result<()> {
        self.load(Track::load(path)?);
        self.play(chip)?;
        Ok(())
    }

    /// Silence the chip, drop the track and clear the cursor.
    ///
    /// Emits exactly the four silence latch bytes. Deliberately leaves the
    /// end-of-song flag and the wait ledger alone; `load` is the operation
    /// that resets the whole state.
    pub fn reset<S: RegisterSink>(
        &mut self,
        chip: &mut Sn76489<S>,
    ) -> std::result::Result<(), PlaybackError> {
        chip.reset()?;
        self.track = None;
        self.cursor = 0;
        Ok(())
    }
}

impl Default for VgmPlayer {
    fn default() -> Self {
        Self::new()
    }
}

fn operand(data: &[u8], offset: usize) -> std::result::Result<u8, PlaybackError> {
    data.get(offset)
        .copied()
        .ok_or(PlaybackError::TruncatedStream { offset })
}
