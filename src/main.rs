use std::env;
use std::time::Duration;

use sn76489::{tokenize, MemorySink, NoteSequencer, Sn76489, TickResult, Track, VgmPlayer};

/// Ticks traced when no `--ticks` limit is given (one minute at 60 Hz).
const DEFAULT_TICK_CAP: usize = 3600;

fn hex_bytes(bytes: &[u8]) -> String {
    if bytes.is_empty() {
        return "-".to_string();
    }
    bytes
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}

fn dump_track(path: &str, tick_cap: usize) -> sn76489::Result<()> {
    let track = Track::load(path)?;
    println!("File: {}", path);
    println!("Command stream: {} bytes", track.len());
    match track.loop_offset() {
        Some(offset) => println!("Loop offset: 0x{:04x}", offset),
        None => println!("Loop offset: none"),
    }
    println!();

    let mut chip = Sn76489::new(MemorySink::new())?;
    println!("power-on  {}", hex_bytes(&chip.sink_mut().take()));

    let mut player = VgmPlayer::new();
    player.load(track);

    let mut ticks = 0;
    while ticks < tick_cap {
        let result = player.tick(&mut chip)?;
        let bytes = chip.sink_mut().take();
        let label = format!("{:?}", result);
        println!(
            "tick {:>5}  {:<8}  cursor 0x{:04x}  {}",
            ticks,
            label,
            player.position(),
            hex_bytes(&bytes)
        );
        ticks += 1;
        if matches!(result, TickResult::Finished | TickResult::Stopped) {
            break;
        }
    }
    if !player.ended() {
        println!(
            "\nTrace stopped after {} ticks; raise --ticks to see more.",
            ticks
        );
    }
    Ok(())
}

fn dump_notes(script: &str) -> sn76489::Result<()> {
    println!("Script: {}", script);
    let tokens = tokenize(script)?;
    println!("Tokens: {:?}", tokens);

    let mut chip = Sn76489::new(MemorySink::new())?;
    println!("power-on  {}", hex_bytes(&chip.sink_mut().take()));

    // Zero tick: all holds collapse, only the register writes remain.
    let mut sequencer = NoteSequencer::with_tick(Duration::ZERO);
    sequencer.play(&mut chip, script)?;
    println!("writes    {}", hex_bytes(&chip.sink_mut().take()));
    Ok(())
}

fn print_usage() {
    eprintln!(
        "Usage:\n  sn76489 [--ticks <n>] <file.vgm>\n  sn76489 --notes \"<script>\"\n\nFlags:\n  --ticks <n>       Maximum number of ticks to trace (default {})\n  --notes <script>  Dump the register writes of a note script\n  -h, --help        Show this help\n\nExamples:\n  sn76489 --ticks 16 song.vgm\n  sn76489 --notes \"O4 Q C D E F G A B\"\n",
        DEFAULT_TICK_CAP
    );
}

fn main() -> sn76489::Result<()> {
    println!("SN76489 VGM Replayer - Register Write Tracer");
    println!("=============================================\n");

    let mut file_arg: Option<String> = None;
    let mut notes_arg: Option<String> = None;
    let mut tick_cap = DEFAULT_TICK_CAP;
    let mut show_help = false;

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--help" | "-h" => {
                show_help = true;
            }
            "--ticks" => match args.next().and_then(|value| value.parse().ok()) {
                Some(n) => tick_cap = n,
                None => {
                    eprintln!("--ticks requires a numeric argument");
                    show_help = true;
                }
            },
            "--notes" => match args.next() {
                Some(script) => notes_arg = Some(script),
                None => {
                    eprintln!("--notes requires a script argument");
                    show_help = true;
                }
            },
            _ if arg.starts_with("--ticks=") => match arg[8..].parse() {
                Ok(n) => tick_cap = n,
                Err(_) => {
                    eprintln!("--ticks requires a numeric argument");
                    show_help = true;
                }
            },
            _ if arg.starts_with("--notes=") => {
                notes_arg = Some(arg[8..].to_string());
            }
            _ if arg.starts_with('-') => {
                eprintln!("Unknown flag: {}", arg);
                show_help = true;
            }
            _ => {
                file_arg = Some(arg);
            }
        }
    }

    if show_help || (file_arg.is_none() && notes_arg.is_none()) {
        print_usage();
        return Ok(());
    }

    if let Some(script) = notes_arg {
        dump_notes(&script)?;
        return Ok(());
    }
    if let Some(path) = file_arg {
        dump_track(&path, tick_cap)?;
    }
    Ok(())
}
