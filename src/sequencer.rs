//! Note-script playback.
//!
//! A compact text mini-language for melodies, in the spirit of the C128
//! BASIC `PLAY` command: note letters `C`-`B` with an optional `#`, `V<n>`
//! selects the voice, `O<n>` the octave, `U<n>` a direct volume and
//! `W H Q I S` the note duration from whole down to sixteenth. Spaces and
//! commas separate tokens.
//!
//! Scripts are tokenized up front, so a malformed script fails with
//! [`SequencerError::UnknownToken`] before a single byte reaches the chip.
//! Playback itself is blocking: [`NoteSequencer::play`] owns the thread and
//! sleeps through every note, which is why it must not be interleaved with
//! [`VgmPlayer::tick`](crate::VgmPlayer::tick) on a shared register sink.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use log::debug;

use crate::chip::{RegisterSink, Sn76489};
use crate::error::{Result, SequencerError};
use crate::player::TICK_PERIOD;

/// C0 reference frequency for equal temperament, in Hz.
pub const NOTE_C0_HZ: f32 = 16.35;

/// Volume a note letter plays at; `U<n>` changes volume without a note.
const NOTE_VOLUME: u8 = 9;

/// Sentinel the tokenizer appends, standing in for end-of-script.
const TERMINATOR: char = ' ';

/// Chromatic indices of the seven natural notes.
const NATURALS: [(char, u8); 7] = [
    ('C', 0),
    ('D', 2),
    ('E', 4),
    ('F', 5),
    ('G', 7),
    ('A', 9),
    ('B', 11),
];

/// Note lengths in ticks: whole, half, quarter, eighth, sixteenth.
const DURATIONS: [(char, u8); 5] = [('W', 64), ('H', 32), ('Q', 16), ('I', 8), ('S', 4)];

fn natural_index(letter: char) -> Option<u8> {
    NATURALS
        .iter()
        .find(|&&(l, _)| l == letter)
        .map(|&(_, index)| index)
}

fn duration_ticks(code: char) -> Option<u8> {
    DURATIONS
        .iter()
        .find(|&&(c, _)| c == code)
        .map(|&(_, ticks)| ticks)
}

/// One parsed element of a note script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    /// `V<n>`: select the voice (channel) the following notes play on.
    Voice(u8),
    /// `O<n>`: select the octave, 0-9.
    Octave(u8),
    /// `U<n>`: set the current voice's volume immediately, no note.
    Volume(u8),
    /// A note letter, resolved to its chromatic-scale index 0-11.
    Note(u8),
    /// `W H Q I S`: set the note duration, in ticks.
    Duration(u8),
    /// End of script; playback forces voice 0 silent here.
    End,
}

/// Tokenize a note script left to right.
///
/// An explicit [`Token::End`] is appended in place of the trailing separator
/// the language implies. A `#` only binds to a note letter where the raised
/// semitone exists, so `E#` and `B#` leave the `#` to be re-examined, where
/// it fails like any other character outside the language.
///
/// # Errors
///
/// [`SequencerError::UnknownToken`] with the character and its position; a
/// `V`/`O`/`U` prefix whose argument is not a digit reports the argument
/// position.
pub fn tokenize(script: &str) -> std::result::Result<Vec<Token>, SequencerError> {
    let chars: Vec<char> = script.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];

        if let Some(natural) = natural_index(c) {
            let sharp = chars.get(i + 1) == Some(&'#') && c != 'E' && c != 'B';
            if sharp {
                tokens.push(Token::Note(natural + 1));
                i += 2;
            } else {
                tokens.push(Token::Note(natural));
                i += 1;
            }
            continue;
        }
        if let Some(ticks) = duration_ticks(c) {
            tokens.push(Token::Duration(ticks));
            i += 1;
            continue;
        }
        match c {
            'V' | 'O' | 'U' => {
                let arg = chars.get(i + 1).copied().unwrap_or(TERMINATOR);
                let digit = match arg.to_digit(10) {
                    Some(digit) => digit as u8,
                    None => {
                        return Err(SequencerError::UnknownToken {
                            position: i + 1,
                            found: arg,
                        })
                    }
                };
                tokens.push(match c {
                    'V' => Token::Voice(digit),
                    'O' => Token::Octave(digit),
                    _ => Token::Volume(digit),
                });
                i += 2;
            }
            ' ' | ',' => i += 1,
            found => return Err(SequencerError::UnknownToken { position: i, found }),
        }
    }
    tokens.push(Token::End);
    Ok(tokens)
}

/// Equal-temperament frequency of a note, in Hz.
///
/// `index` is the chromatic-scale position 0-11 within the octave; the
/// reference is C0 at [`NOTE_C0_HZ`].
pub fn note_frequency(octave: u8, index: u8) -> f32 {
    let distance = f32::from(octave) * 12.0 + f32::from(index);
    NOTE_C0_HZ * (distance / 12.0).exp2()
}

/// Blocking interpreter for note scripts.
///
/// Each note plays at a fixed volume for `duration * 2` ticks, then the
/// voice is silenced for a one-tick gap. The tick length defaults to
/// [`TICK_PERIOD`] (1/60 s) and is tunable for tests and dry runs, where a
/// zero tick removes all sleeping.
///
/// The sequencer owns the thread for the whole script and issues raw
/// register writes, so it is a single-owner music source: never run it
/// concurrently with VGM playback against the same sink.
pub struct NoteSequencer {
    tick: Duration,
}

impl NoteSequencer {
    /// Create a sequencer with the nominal 1/60 s tick.
    pub fn new() -> Self {
        NoteSequencer { tick: TICK_PERIOD }
    }

    /// Create a sequencer with a custom tick length.
    pub fn with_tick(tick: Duration) -> Self {
        NoteSequencer { tick }
    }

    /// Tokenize and play a script against the chip, blocking until done.
    ///
    /// State defaults per call: voice 0, octave 4, quarter-note duration.
    /// The end of the script forces voice 0 silent, whichever voice was
    /// active.
    ///
    /// # Errors
    ///
    /// [`SequencerError`](crate::SequencerError) before any write when the
    /// script does not tokenize; encoding or sink errors from the chip once
    /// playback is underway. Writes already issued stay issued when an
    /// error surfaces mid-script.
    pub fn play<S: RegisterSink>(&mut self, chip: &mut Sn76489<S>, script: &str) -> Result<()> {
        self.run(chip, script, None)
    }

    /// Like [`play`](Self::play), but checks `cancel` at every note
    /// boundary. On cancellation the current voice ends naturally, voice 0
    /// is forced silent and the call returns `Ok`.
    pub fn play_with_cancel<S: RegisterSink>(
        &mut self,
        chip: &mut Sn76489<S>,
        script: &str,
        cancel: &AtomicBool,
    ) -> Result<()> {
        self.run(chip, script, Some(cancel))
    }

    fn run<S: RegisterSink>(
        &mut self,
        chip: &mut Sn76489<S>,
        script: &str,
        cancel: Option<&AtomicBool>,
    ) -> Result<()> {
        let tokens = tokenize(script)?;
        debug!("playing note script: {} tokens", tokens.len());

        let mut voice: u8 = 0;
        let mut octave: u8 = 4;
        let mut duration: u8 = 16;

        for token in tokens {
            match token {
                Token::Voice(n) => voice = n,
                Token::Octave(n) => octave = n,
                Token::Duration(ticks) => duration = ticks,
                Token::Volume(volume) => chip.set_volume(voice, volume)?,
                Token::Note(index) => {
                    if cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
                        debug!("note script cancelled");
                        chip.set_volume(0, 0)?;
                        return Ok(());
                    }
                    chip.set_volume(voice, NOTE_VOLUME)?;
                    chip.set_tone(voice, note_frequency(octave, index))?;
                    self.hold(u32::from(duration) * 2);
                    chip.set_volume(voice, 0)?;
                    self.hold(1);
                }
                Token::End => chip.set_volume(0, 0)?,
            }
        }
        Ok(())
    }

    fn hold(&self, ticks: u32) {
        thread::sleep(self.tick * ticks);
    }
}

impl Default for NoteSequencer {
    fn default() -> Self {
        Self::new()
    }
}
