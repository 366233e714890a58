//! Note-script playback against a capture sink, with the tick length set to
//! zero so scripts run without real-time delays.

use std::sync::atomic::AtomicBool;
use std::time::Duration;

use sn76489::{tokenize, MemorySink, NoteSequencer, Sn76489, Sn76489Error, Token};

fn capture_chip() -> Sn76489<MemorySink> {
    let mut chip = Sn76489::new(MemorySink::new()).unwrap();
    chip.sink_mut().take();
    chip
}

fn sequencer() -> NoteSequencer {
    NoteSequencer::with_tick(Duration::ZERO)
}

#[test]
fn test_script_end_to_end() {
    let mut chip = capture_chip();
    sequencer().play(&mut chip, "V1 O5 U7 S C").unwrap();
    assert_eq!(
        chip.sink().bytes(),
        &[
            0xB8, // U7 on voice 1, applied immediately
            0xB6, // note volume 9 on voice 1
            0xA5, 0x0D, // C5 (523.2 Hz -> register 213) latch/data
            0xBF, // voice 1 silenced after the hold
            0x9F, // end of script always silences voice 0
        ]
    );
}

#[test]
fn test_octave_setting_is_sticky() {
    let mut chip = capture_chip();
    sequencer().play(&mut chip, "O3 H A A").unwrap();
    // A3 is 219.98 Hz -> register 508: latch 0x8C, data 0x1F. Both notes
    // ride the changed octave.
    let note: &[u8] = &[0x96, 0x8C, 0x1F, 0x9F];
    let expected: Vec<u8> = [note, note, &[0x9F][..]].concat();
    assert_eq!(chip.sink().bytes(), expected.as_slice());
}

#[test]
fn test_sharp_raises_a_semitone() {
    let mut chip = capture_chip();
    sequencer().play(&mut chip, "C C#").unwrap();
    assert_eq!(
        chip.sink().bytes(),
        &[
            0x96, 0x8B, 0x1A, 0x9F, // C4 -> register 427
            0x96, 0x83, 0x19, 0x9F, // C#4 -> register 403
            0x9F,
        ]
    );
}

#[test]
fn test_tokenizer_through_public_api() {
    assert_eq!(
        tokenize("Q C, H D").unwrap(),
        vec![
            Token::Duration(16),
            Token::Note(0),
            Token::Duration(32),
            Token::Note(2),
            Token::End,
        ]
    );
}

#[test]
fn test_malformed_script_rejected_before_any_write() {
    let mut chip = capture_chip();
    let err = sequencer().play(&mut chip, "C D E ?").unwrap_err();
    match err {
        Sn76489Error::Sequencer(inner) => {
            assert_eq!(inner.to_string(), "unknown token '?' at position 6");
        }
        other => panic!("expected sequencer error, got {:?}", other),
    }
    assert!(chip.sink().bytes().is_empty());
}

#[test]
fn test_clear_cancel_flag_plays_whole_script() {
    let mut with_cancel = capture_chip();
    let cancel = AtomicBool::new(false);
    sequencer()
        .play_with_cancel(&mut with_cancel, "V2 I E G", &cancel)
        .unwrap();

    let mut without = capture_chip();
    sequencer().play(&mut without, "V2 I E G").unwrap();

    assert_eq!(with_cancel.sink().bytes(), without.sink().bytes());
}
