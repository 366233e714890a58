//! End-to-end playback over synthetic VGM 1.50 images: build a complete
//! file, load it through the public API and assert on the byte traffic a
//! capture sink observes tick by tick.

use std::io::Write;

use sn76489::vgm::{DATA_START, IDENT, SUPPORTED_VERSION};
use sn76489::{
    MemorySink, PlaybackError, Sn76489, TickResult, Track, VgmPlayer, MASTER_CLOCK_HZ,
    SILENCE_SEQUENCE,
};

/// Assemble a complete VGM 1.50 image around the given command bytes.
fn build_vgm(commands: &[u8], loop_raw: u32) -> Vec<u8> {
    let mut bytes = vec![0u8; DATA_START];
    bytes[0..4].copy_from_slice(&IDENT);
    let eof = (DATA_START + commands.len()) as u32 - 4;
    bytes[0x04..0x08].copy_from_slice(&eof.to_le_bytes());
    bytes[0x08..0x0C].copy_from_slice(&SUPPORTED_VERSION.to_le_bytes());
    bytes[0x0C..0x10].copy_from_slice(&MASTER_CLOCK_HZ.to_le_bytes());
    bytes[0x1C..0x20].copy_from_slice(&loop_raw.to_le_bytes());
    bytes.extend_from_slice(commands);
    bytes
}

fn player_for(image: &[u8]) -> (VgmPlayer, Sn76489<MemorySink>) {
    let mut chip = Sn76489::new(MemorySink::new()).unwrap();
    chip.sink_mut().take();
    let mut player = VgmPlayer::new();
    player.load(Track::parse(image).unwrap());
    (player, chip)
}

#[test]
fn test_per_tick_byte_traffic() {
    // Tone latch/data and a volume write, one tick of wait, volume off, end.
    let image = build_vgm(
        &[
            0x50, 0x8E, 0x50, 0x0F, 0x50, 0x96, 0x62, 0x50, 0x9F, 0x66,
        ],
        0,
    );
    let (mut player, mut chip) = player_for(&image);

    assert_eq!(player.tick(&mut chip).unwrap(), TickResult::Advanced);
    assert_eq!(chip.sink_mut().take(), vec![0x8E, 0x0F, 0x96]);

    assert_eq!(player.tick(&mut chip).unwrap(), TickResult::Finished);
    assert_eq!(chip.sink_mut().take(), vec![0x9F]);
    assert!(player.ended());
}

#[test]
fn test_loop_offset_rebased_from_header() {
    // Stream: write, wait, end. Loop lands on the wait at stream index 2;
    // the header field counts from 0x1C, so raw = 2 + 0x40 - 0x1C.
    let image = build_vgm(&[0x50, 0xAA, 0x62, 0x66], 0x26);
    let track = Track::parse(&image).unwrap();
    assert_eq!(track.loop_offset(), Some(2));

    let (mut player, mut chip) = player_for(&image);
    assert_eq!(player.tick(&mut chip).unwrap(), TickResult::Advanced);
    assert_eq!(chip.sink_mut().take(), vec![0xAA]);

    // From here every tick takes the jump and re-consumes the wait.
    for _ in 0..3 {
        assert_eq!(player.tick(&mut chip).unwrap(), TickResult::Looped);
        assert!(chip.sink().bytes().is_empty());
    }
    assert!(!player.ended());
}

#[test]
fn test_ticking_after_end_is_idempotent_failure() {
    let image = build_vgm(&[0x66], 0);
    let (mut player, mut chip) = player_for(&image);

    assert_eq!(player.tick(&mut chip).unwrap(), TickResult::Finished);
    for _ in 0..3 {
        assert!(matches!(
            player.tick(&mut chip),
            Err(PlaybackError::EndOfSong)
        ));
    }
    assert!(chip.sink().bytes().is_empty());
}

#[test]
fn test_unknown_opcode_is_fatal() {
    // 0x4F (Game Gear stereo) is a real VGM opcode this driver rejects.
    let image = build_vgm(&[0x4F, 0x00, 0x66], 0);
    let (mut player, mut chip) = player_for(&image);
    assert!(matches!(
        player.tick(&mut chip),
        Err(PlaybackError::UnknownCommand {
            offset: 0,
            opcode: 0x4F
        })
    ));
}

#[test]
fn test_stream_without_terminator() {
    let image = build_vgm(&[0x50, 0x01], 0);
    let (mut player, mut chip) = player_for(&image);
    assert!(matches!(
        player.tick(&mut chip),
        Err(PlaybackError::TruncatedStream { offset: 2 })
    ));
    // The write preceding the error already reached the chip.
    assert_eq!(chip.sink().bytes(), &[0x01]);
}

#[test]
fn test_loop_pointing_past_stream_surfaces_when_taken() {
    // raw 0x2E rebases to stream offset 10, past the single end marker.
    let image = build_vgm(&[0x66], 0x2E);
    let (mut player, mut chip) = player_for(&image);
    assert!(matches!(
        player.tick(&mut chip),
        Err(PlaybackError::TruncatedStream { offset: 10 })
    ));
}

#[test]
fn test_stop_silences_and_ends() {
    // Endless looping track; stop between ticks.
    let image = build_vgm(&[0x50, 0x33, 0x62, 0x66], 0x24);
    let (mut player, mut chip) = player_for(&image);
    player.tick(&mut chip).unwrap();
    player.tick(&mut chip).unwrap();

    player.stop();
    chip.sink_mut().take();
    assert_eq!(player.tick(&mut chip).unwrap(), TickResult::Stopped);
    assert_eq!(chip.sink().bytes(), &SILENCE_SEQUENCE);
    assert!(player.ended());
    assert!(matches!(
        player.tick(&mut chip),
        Err(PlaybackError::EndOfSong)
    ));
}

#[test]
fn test_reset_emits_silence_and_clears_cursor() {
    let image = build_vgm(&[0x50, 0x8E, 0x62, 0x62, 0x66], 0);
    let (mut player, mut chip) = player_for(&image);
    player.tick(&mut chip).unwrap();
    assert_ne!(player.position(), 0);

    chip.sink_mut().take();
    player.reset(&mut chip).unwrap();
    assert_eq!(chip.sink().bytes(), &SILENCE_SEQUENCE);
    assert_eq!(player.position(), 0);

    // A fresh load starts over cleanly.
    player.load(Track::parse(&build_vgm(&[0x50, 0x07, 0x66], 0)).unwrap());
    chip.sink_mut().take();
    assert_eq!(player.tick(&mut chip).unwrap(), TickResult::Finished);
    assert_eq!(chip.sink().bytes(), &[0x07]);
}

#[test]
fn test_play_file_round_trip() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&build_vgm(&[0x50, 0x11, 0x66], 0)).unwrap();

    let mut chip = Sn76489::new(MemorySink::new()).unwrap();
    chip.sink_mut().take();
    let mut player = VgmPlayer::new();
    player.play_file(&mut chip, file.path()).unwrap();

    assert!(player.ended());
    assert_eq!(chip.sink().bytes(), &[0x11]);
}
