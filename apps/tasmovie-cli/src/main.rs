use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{Level, debug, info};
use tracing_subscriber::FmtSubscriber;

use tasmovie_core::port::MAX_PORTS;
use tasmovie_core::{
    ControllerState, FrameLayout, FrameView, MovieLogic, PortType, PortTypeRegistry, SystemClock,
    generate_project_id,
};
use tasmovie_support::{MovieDocument, read_track, write_track};

/// Input track tool
#[derive(Parser, Debug)]
#[command(name = "tasmovie")]
#[command(about = "Inspect, replay and rerecord controller input tracks", long_about = None)]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: Level,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the header and size of a track
    Info { track: PathBuf },

    /// Print frames and their subframes
    Dump {
        track: PathBuf,

        /// First frame to print (counted from 1)
        #[arg(long, default_value_t = 1)]
        from: u64,

        /// Number of frames to print (defaults to the rest of the track)
        #[arg(long)]
        count: Option<u64>,
    },

    /// Play a track back, polling every control once per frame
    Replay {
        track: PathBuf,

        /// Frames to run (defaults to the length of the track)
        #[arg(long)]
        frames: Option<u64>,

        /// Switch to recording with released controls from this frame on
        #[arg(long)]
        rerecord_at: Option<u64>,

        /// Write the resulting track here
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Write an empty track with a fresh project id
    New {
        out: PathBuf,

        #[arg(long, default_value = "gamepad")]
        port0: String,

        #[arg(long, default_value = "none")]
        port1: String,
    },
}

fn load_track(registry: &PortTypeRegistry, path: &Path) -> anyhow::Result<MovieDocument> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    read_track(registry, BufReader::new(file))
        .with_context(|| format!("failed to read {}", path.display()))
}

fn save_track(document: &MovieDocument, path: &Path) -> anyhow::Result<()> {
    let file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    write_track(document, BufWriter::new(file))
        .with_context(|| format!("failed to write {}", path.display()))
}

/// Every `(port, controller, control)` the layout populates.
fn populated_controls(layout: &FrameLayout) -> anyhow::Result<Vec<(usize, usize, usize)>> {
    let mut controls = Vec::new();
    for port in 0..MAX_PORTS {
        let port_type = layout.port(port)?;
        for controller in 0..port_type.controllers() {
            for control in 0..port_type.controls() {
                controls.push((port, controller, control));
            }
        }
    }
    Ok(controls)
}

fn print_info(registry: &PortTypeRegistry, track: &Path) -> anyhow::Result<()> {
    let document = load_track(registry, track)?;
    let layout = document.layout();
    for port in 0..MAX_PORTS {
        println!("port{port}: {}", layout.port(port)?.name());
    }
    if document.project_id.is_empty() {
        println!("project: (none)");
    } else {
        println!("project: {}", document.project_id);
    }
    println!("rerecords: {}", document.rerecords);
    println!("frames: {}", document.frames.count_frames());
    println!("subframes: {}", document.frames.len());
    println!(
        "storage: {} page(s) of {} frames",
        document.frames.page_count(),
        document.frames.frames_per_page()
    );
    Ok(())
}

fn dump(
    registry: &PortTypeRegistry,
    track: &Path,
    from: u64,
    count: Option<u64>,
) -> anyhow::Result<()> {
    let movie = load_track(registry, track)?.into_movie()?;
    let first = from.max(1);
    let last = match count {
        Some(count) => movie.frame_count().min(first.saturating_add(count).saturating_sub(1)),
        None => movie.frame_count(),
    };
    for frame in first..=last {
        for subframe in 0..movie.frame_subframes(frame) {
            let controls = movie.read_subframe(frame, subframe);
            if subframe == 0 {
                println!("{frame:>8} {}", controls.serialize_text());
            } else {
                println!("{:>8} {}", "", controls.serialize_text());
            }
        }
    }
    Ok(())
}

fn replay(
    registry: &PortTypeRegistry,
    track: &Path,
    frames: Option<u64>,
    rerecord_at: Option<u64>,
    out: Option<&Path>,
) -> anyhow::Result<()> {
    let movie = load_track(registry, track)?.into_movie()?;
    let layout = Arc::clone(movie.layout());
    let controls = populated_controls(&layout)?;
    let total = frames.unwrap_or(movie.frame_count());
    let mut logic = MovieLogic::new(movie, ControllerState::new(layout));

    for frame in 1..=total {
        if rerecord_at == Some(frame) {
            let movie = logic.movie_mut();
            movie.set_readonly(false)?;
            movie.bump_rerecord_count();
            info!(frame, rerecords = movie.rerecord_count(), "recording");
        }
        let reset = logic.new_frame_starting(false)?;
        if reset >= 0 {
            info!(frame, delay = reset, "reset");
        }
        for &(port, controller, control) in &controls {
            logic.input_poll(port, controller, control)?;
        }
        debug!(frame, subframes = logic.movie().data().len(), "frame done");
    }

    let movie = logic.movie();
    println!("frames run: {}", movie.current_frame());
    println!("lag frames: {}", movie.lag_frames());
    println!("track frames: {}", movie.frame_count());
    println!("rerecords: {}", movie.rerecord_count());
    if let Some(out) = out {
        save_track(&MovieDocument::from_movie(movie), out)?;
        info!(path = %out.display(), "track written");
    }
    Ok(())
}

fn new_track(registry: &PortTypeRegistry, out: &Path, port0: &str, port1: &str) -> anyhow::Result<()> {
    let kinds = [
        registry.lookup_name(port0)?.kind(),
        registry.lookup_name(port1)?.kind(),
    ];
    let mut document = MovieDocument::new(registry, kinds)?;
    document.project_id = generate_project_id(&SystemClock, out.to_string_lossy().as_bytes());
    save_track(&document, out)?;
    info!(project = %document.project_id, "new track");
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(args.log_level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let registry = PortTypeRegistry::with_standard_types();
    match args.command {
        Command::Info { track } => print_info(&registry, &track),
        Command::Dump { track, from, count } => dump(&registry, &track, from, count),
        Command::Replay {
            track,
            frames,
            rerecord_at,
            out,
        } => replay(&registry, &track, frames, rerecord_at, out.as_deref()),
        Command::New { out, port0, port1 } => new_track(&registry, &out, &port0, &port1),
    }
}
