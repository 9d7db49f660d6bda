mod audio;
mod commands;
mod library;
mod settings;

use anyhow::{Context, Result};
use clap::Parser;
use commands::Command;
use glam::Vec2;
use instant::Instant;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::time::Duration;
use tsne_core::{
    FrameOutput, PlotViewport, SchedulerParams, SearchStrategy, Session, SessionParams, Trigger,
    DEFAULT_VIEWPORT_PX,
};

use audio::NativeAudio;
use library::Library;
use settings::Settings;

/// Explore t-SNE maps of a sample library: hover to hear, type to filter.
///
/// Reads driver commands from stdin, one per line: `move <x> <y>`,
/// `query <text>`, `clear`, `next`, `prev`, `open`, `wait <ms>`, `status`, `quit`.
#[derive(Parser, Debug)]
#[command(name = "tsne-search", version)]
struct Args {
    /// Settings file with `key: value` lines.
    #[arg(short, long, default_value = "settings.yml")]
    settings: PathBuf,
    /// Override the dataset root from the settings file.
    #[arg(long)]
    source: Option<PathBuf>,
    /// Index of the first 2D/3D pair to show.
    #[arg(long, default_value_t = 0)]
    dataset: usize,
    #[arg(long, default_value_t = DEFAULT_VIEWPORT_PX[0])]
    width: f32,
    #[arg(long, default_value_t = DEFAULT_VIEWPORT_PX[1])]
    height: f32,
    #[arg(long)]
    max_sounds: Option<usize>,
    #[arg(long)]
    grace_ms: Option<u64>,
    /// Selection radius in window pixels.
    #[arg(long)]
    select_radius: Option<f32>,
    /// Use the bucket-grid spatial index instead of a linear scan.
    #[arg(long)]
    grid: bool,
    /// Never open an audio device.
    #[arg(long)]
    silent: bool,
}

fn load_settings(args: &Args) -> Result<Settings> {
    let mut settings = if args.settings.exists() {
        Settings::load(&args.settings)?
    } else {
        log::warn!(
            "[settings] {} not found; using defaults",
            args.settings.display()
        );
        Settings::default()
    };
    if let Some(source) = &args.source {
        settings.source = source.clone();
    }
    if let Some(v) = args.max_sounds {
        settings.max_sounds = v;
    }
    if let Some(v) = args.grace_ms {
        settings.grace_ms = v;
    }
    if let Some(v) = args.select_radius {
        settings.select_radius_px = v;
    }
    settings.spatial_index |= args.grid;
    Ok(settings)
}

struct Explorer {
    session: Session<NativeAudio>,
    library: Library,
    viewport: PlotViewport,
    select_radius_px: f32,
    cursor_px: Vec2,
    offset: usize,
    dataset_name: String,
}

impl Explorer {
    fn switch_dataset(&mut self, offset: usize) {
        match self.library.load(offset) {
            Ok((name, points)) => {
                self.session.load(points);
                log::info!("[dataset] showing {} (#{})", name, offset);
                self.offset = offset;
                self.dataset_name = name;
            }
            Err(e) => log::error!("[dataset] keeping {}: {:#}", self.dataset_name, e),
        }
    }

    /// Returns false when the driver should stop.
    fn apply(&mut self, cmd: Command, out: &mut impl Write) -> Result<bool> {
        match cmd {
            Command::Move(px) => self.cursor_px = px,
            Command::Query(text) => self.session.notify_query(text),
            Command::Clear => self.session.notify_query(""),
            Command::Next => self.switch_dataset(self.offset.saturating_add(1)),
            Command::Prev => self.switch_dataset(self.offset.saturating_sub(1)),
            Command::Open => match self.session.recent_media() {
                Some(media) => writeln!(out, "open {media}")?,
                None => writeln!(out, "open: nothing played yet")?,
            },
            Command::Wait(d) => std::thread::sleep(d),
            Command::Status => {
                let sched = self.session.scheduler();
                writeln!(
                    out,
                    "dataset={} points={} query={:?} visible={} sounds={}/{}",
                    self.dataset_name,
                    self.session.points().len(),
                    self.session.query(),
                    self.session.mask().visible_count(),
                    sched.active(),
                    sched.capacity()
                )?;
            }
            Command::Quit => return Ok(false),
        }
        Ok(true)
    }

    fn resize(&mut self, width: f32, height: f32) {
        self.viewport = PlotViewport::new(width, height);
        let threshold = self.viewport.select_threshold_sq(self.select_radius_px);
        self.session.selector_mut().set_max_distance_sq(threshold);
    }

    fn frame(&mut self, out: &mut impl Write) -> Result<FrameOutput> {
        let cursor = self.viewport.to_plot(self.cursor_px);
        let frame = self.session.frame(cursor, Instant::now());
        if frame.edge {
            match frame.selected {
                Some(i) => {
                    let lines = self.session.label_lines(i).join(" > ");
                    writeln!(out, "[{}] #{} {}", self.dataset_name, i, lines)?;
                }
                None => writeln!(out, "[{}] -", self.dataset_name)?,
            }
        }
        if let Trigger::Dropped(i) = frame.trigger {
            log::debug!("[sound] point {} not played; pool full", i);
        }
        Ok(frame)
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let settings = load_settings(&args)?;

    let library = Library::open(&settings)
        .with_context(|| format!("Failed to open dataset source {}", settings.source.display()))?;

    let grace = Duration::from_millis(settings.grace_ms);
    let audio = if args.silent {
        NativeAudio::silent(grace.as_secs_f32())
    } else {
        NativeAudio::new(grace.as_secs_f32())
    };
    if audio.is_silent() {
        log::info!("[audio] silent mode; clips are tracked but not heard");
    }
    let params = SessionParams {
        scheduler: SchedulerParams {
            capacity: settings.max_sounds,
            grace,
        },
        strategy: if settings.spatial_index {
            SearchStrategy::Grid
        } else {
            SearchStrategy::Linear
        },
        split_string: settings.split_string.clone(),
        ..SessionParams::default()
    };

    let mut explorer = Explorer {
        session: Session::new(audio, params),
        library,
        viewport: PlotViewport::new(args.width, args.height),
        select_radius_px: settings.select_radius_px,
        cursor_px: Vec2::new(-1.0e6, -1.0e6),
        offset: 0,
        dataset_name: String::from("-"),
    };
    explorer.resize(args.width, args.height);
    explorer.switch_dataset(args.dataset);
    if explorer.session.points().is_empty() {
        anyhow::bail!("dataset {} could not be loaded", args.dataset);
    }

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for line in std::io::stdin().lock().lines() {
        let line = line.context("Failed to read stdin")?;
        let cmd = match commands::parse(&line) {
            Ok(Some(cmd)) => cmd,
            Ok(None) => continue,
            Err(e) => {
                log::warn!("[input] {:#}", e);
                continue;
            }
        };
        if !explorer.apply(cmd, &mut out)? {
            break;
        }
        explorer.frame(&mut out)?;
        out.flush()?;
    }
    log::info!("[input] bye");
    Ok(())
}
