//! SN76489 PSG driver and VGM 1.50 replayer.
//!
//! Decodes the VGM register-dump format (the narrow 1.50 profile emitted by
//! trackers such as Deflemask) and drives a three-tone-plus-noise SN76489
//! sound generator one playback tick at a time. The crate performs no audio
//! synthesis of its own: the chip synthesizes, this library sequences
//! register writes. The transport to the physical data bus is injected as a
//! [`RegisterSink`], so the same code runs against hardware, a capture
//! buffer or anything in between.
//!
//! # Modules
//! - [`chip`]: latch/data byte encoding, the [`RegisterSink`] transport
//!   trait and the [`Sn76489`] driver
//! - [`vgm`]: VGM 1.50 header validation and [`Track`] extraction
//! - [`player`]: the tick-driven command interpreter [`VgmPlayer`]
//! - [`sequencer`]: the compact note-script language and its blocking
//!   [`NoteSequencer`]
//! - [`error`]: the error taxonomy, unified under [`Sn76489Error`]
//!
//! # Quick start
//! ## Tick-driven VGM playback
//! ```no_run
//! use sn76489::{MemorySink, Sn76489, Track, VgmPlayer};
//!
//! # fn main() -> sn76489::Result<()> {
//! let mut chip = Sn76489::new(MemorySink::new())?;
//! let mut player = VgmPlayer::new();
//! player.load(Track::load("song.vgm")?);
//! while !player.ended() {
//!     player.tick(&mut chip)?;
//!     // the host scheduler sleeps 1/60 s between ticks
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Note scripts
//! ```no_run
//! use sn76489::{MemorySink, NoteSequencer, Sn76489};
//!
//! # fn main() -> sn76489::Result<()> {
//! let mut chip = Sn76489::new(MemorySink::new())?;
//! let mut sequencer = NoteSequencer::new();
//! sequencer.play(&mut chip, "O4 Q C D E F G A B")?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

// Domain modules
pub mod chip; // Register protocol & chip driver
pub mod error; // Error taxonomy
pub mod player; // Tick-driven VGM interpreter
pub mod sequencer; // Note mini-language
pub mod vgm; // VGM 1.50 loading

// Public API exports
pub use chip::{
    encode_noise, encode_tone, encode_volume, MemorySink, RegisterFrame, RegisterSink, Sn76489,
    MASTER_CLOCK_HZ, SILENCE_SEQUENCE,
};
pub use error::{EncodingError, LoadError, PlaybackError, Result, SequencerError, Sn76489Error};
pub use player::{TickResult, VgmPlayer, SAMPLES_PER_TICK, TICK_PERIOD, TICK_RATE_HZ};
pub use sequencer::{note_frequency, tokenize, NoteSequencer, Token};
pub use vgm::Track;
