//! stepbox CLI: play the demo groove through the host harness.
//!
//! Usage:
//!   cargo run --bin sb-cli -- [--bars N] [--bpm N] [--arp] [--repeat] [--record] [--realtime SECS]
//!
//! Without `--realtime` the engine is stepped offline and the final screen is
//! printed. `RUST_LOG=debug` shows the note traffic.

use std::env;
use std::time::Duration;

use sb_core::config::{PREROLL_TICKS, TICKS_PER_BAR};
use sb_engine::{RecordMode, Settings};
use sb_host::Controller;

struct Args {
    bars: u8,
    bpm: f32,
    arp: bool,
    repeat: bool,
    record: bool,
    realtime: Option<f64>,
}

fn parse_args() -> Result<Args, String> {
    let mut args = Args {
        bars: 2,
        bpm: 120.0,
        arp: false,
        repeat: false,
        record: false,
        realtime: None,
    };
    let mut it = env::args().skip(1);
    while let Some(arg) = it.next() {
        let mut value = |name: &str| it.next().ok_or_else(|| format!("{} needs a value", name));
        match arg.as_str() {
            "--bars" => args.bars = value("--bars")?.parse().map_err(|e| format!("--bars: {}", e))?,
            "--bpm" => args.bpm = value("--bpm")?.parse().map_err(|e| format!("--bpm: {}", e))?,
            "--realtime" => {
                args.realtime = Some(value("--realtime")?.parse().map_err(|e| format!("--realtime: {}", e))?)
            }
            "--arp" => args.arp = true,
            "--repeat" => args.repeat = true,
            "--record" => args.record = true,
            other => return Err(format!("unknown argument {}", other)),
        }
    }
    Ok(args)
}

fn main() {
    env_logger::init();

    let args = parse_args().unwrap_or_else(|e| {
        eprintln!("{}", e);
        eprintln!("Usage: sb-cli [--bars N] [--bpm N] [--arp] [--repeat] [--record] [--realtime SECS]");
        std::process::exit(1);
    });

    let mut ctrl = Controller::new(Settings::default());
    {
        let (engine, backend) = ctrl.split_mut();
        let bars = engine.set_length(args.bars);
        let bpm = engine.set_bpm(args.bpm);
        engine.load_demo_pattern();
        println!("Length:   {} bars", bars);
        println!("Tempo:    {} BPM", bpm);

        if args.record {
            // Record generated notes onto a second track.
            engine.select_track(1);
            engine.record(RecordMode::Overdub, backend);
        }
        if args.arp {
            engine.toggle_arp(backend);
            engine.arp_start(60);
            engine.arp_start(64);
        }
        if args.repeat {
            engine.repeat_start(36);
        }
        engine.play_from_start();
    }

    match args.realtime {
        Some(secs) => {
            if let Err(e) = ctrl.run_for(Duration::from_secs_f64(secs.max(0.0))) {
                eprintln!("{}", e);
                std::process::exit(1);
            }
        }
        None => {
            let preroll = if args.record { PREROLL_TICKS } else { 0 };
            ctrl.run_ticks(preroll + args.bars as u32 * TICKS_PER_BAR);
        }
    }

    println!();
    print!("{}", ctrl.display().render());
    println!();
    println!("Notes:    {}", ctrl.backend().notes_on().count());
    println!("Clicks:   {}", ctrl.backend().clicks());
    let store = ctrl.engine().store();
    println!(
        "Recorded: {} events on track {}",
        store.events(ctrl.engine().track()).map_or(0, |e| e.len()),
        ctrl.engine().track().index() + 1
    );
    if store.saturated() > 0 {
        println!("Dropped:  {} events (pattern full)", store.saturated());
    }
}
