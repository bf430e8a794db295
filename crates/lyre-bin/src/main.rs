// lyre: plays a score on a game lyre by injecting keystrokes.

mod logging;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use lyre_config::Config;
use lyre_input::{LogBackend, NoteMirror, NullMirror, SystemClock, open_mirror};
use lyre_model::Score;
use lyre_plan::{EventKind, Plan, PlanSettings, Planner};
use lyre_player::{
    ChannelObserver, PerformanceReport, PlayerBuilder, PlayerEvent, PlayerOptions, PlayerState,
};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "lyre", about = "Real-time MIDI-to-keystroke player for the game lyre")]
struct Args {
    /// Show debug logs.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Also write logs to a daily-rotated file in this directory.
    #[arg(long, global = true, env = "LYRE_LOG_DIR")]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Plan a score and perform it.
    Play {
        score: PathBuf,

        /// Configuration JSON file. Defaults apply when absent.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Log key events instead of injecting them.
        #[arg(long)]
        dry_run: bool,

        /// Performance seed; overrides the configured one.
        #[arg(long)]
        seed: Option<u64>,

        /// Mirror presses to a MIDI output port.
        #[arg(long)]
        midi_mirror: bool,

        /// Substring of the MIDI port name to mirror to.
        #[arg(long, requires = "midi_mirror")]
        midi_port: Option<String>,
    },
    /// Print the planned event stream and plan report.
    Plan {
        score: PathBuf,

        #[arg(long)]
        config: Option<PathBuf>,

        #[arg(long)]
        seed: Option<u64>,
    },
    /// List the input styles known to the configuration.
    Styles {
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Write a default configuration file.
    InitConfig { path: PathBuf },
}

fn main() -> Result<()> {
    let args = Args::parse();
    logging::init_logging(args.log_dir.as_deref(), args.verbose)?;

    match args.command {
        Command::Play {
            score,
            config,
            dry_run,
            seed,
            midi_mirror,
            midi_port,
        } => {
            let config = load_config(config.as_deref())?;
            let mirror: Box<dyn NoteMirror> = if midi_mirror {
                open_mirror(midi_port.as_deref())
            } else {
                Box::new(NullMirror)
            };
            let plan = plan_score(&score, &config, seed)?;
            let report = perform(plan, &config, dry_run, mirror)?;
            print_report(&report);
        }
        Command::Plan {
            score,
            config,
            seed,
        } => {
            let config = load_config(config.as_deref())?;
            let plan = plan_score(&score, &config, seed)?;
            print_plan(&plan);
        }
        Command::Styles { config } => {
            let config = load_config(config.as_deref())?;
            for style in config.style_registry().iter() {
                let marker = if style.name == config.input_style { "*" } else { " " };
                let origin = if style.builtin { "" } else { " (custom)" };
                println!(
                    "{marker} {:<12} offset {:>4.0}..{:<4.0} ms  stagger {:>3.0} ms  duration {:+.2}{origin}  {}",
                    style.name,
                    style.timing_offset_range.0,
                    style.timing_offset_range.1,
                    style.stagger_ms,
                    style.duration_variation,
                    style.description,
                );
            }
        }
        Command::InitConfig { path } => {
            Config::default()
                .write(&path)
                .with_context(|| format!("writing {}", path.display()))?;
            info!(path = %path.display(), "Wrote default config");
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let config = Config::read(path).with_context(|| format!("reading {}", path.display()))?;
    info!(path = %path.display(), "Loaded config");
    Ok(config)
}

fn plan_score(path: &Path, config: &Config, seed: Option<u64>) -> Result<Plan> {
    let score = Score::read(path).with_context(|| format!("reading score {}", path.display()))?;
    let seed = seed.or(config.seed).unwrap_or_else(rand::random);
    info!(seed, notes = score.notes.len(), "Planning performance");

    let planner = Planner::new(PlanSettings::from_config(config))?;
    Ok(planner.plan(&score, seed))
}

fn perform(
    plan: Plan,
    config: &Config,
    dry_run: bool,
    mirror: Box<dyn NoteMirror>,
) -> Result<PerformanceReport> {
    let mut options = PlayerOptions::from_config(config);
    let builder = if dry_run {
        PlayerBuilder::new(plan, Box::new(LogBackend::new()))
    } else {
        // The countdown is spent here so the user can focus the game first.
        let builder = live_builder(plan, config.countdown_seconds)?;
        options = options.with_countdown_us(0);
        builder
    };

    // Ctrl-C stops the worker, which lifts every held key before exiting.
    let control = builder.control();
    ctrlc::set_handler(move || control.stop()).context("installing Ctrl-C handler")?;

    let (observer, events) = ChannelObserver::channel();
    let player = builder
        .options(options)
        .clock(Arc::new(SystemClock::new()))
        .mirror(mirror)
        .observer(Box::new(observer))
        .start()
        .context("starting playback")?;

    // The worker drops its observers on exit, which ends this loop.
    for event in events {
        match event {
            PlayerEvent::Log(message) => println!("{message}"),
            PlayerEvent::Bar(bar) => info!(bar = bar + 1, "bar"),
            PlayerEvent::State(PlayerState::Stopped) => warn!("playback stopped"),
            PlayerEvent::Progress { .. } | PlayerEvent::State(_) => {}
        }
    }

    Ok(player.join()?)
}

#[cfg(target_os = "windows")]
fn live_builder(plan: Plan, countdown_seconds: u32) -> Result<PlayerBuilder> {
    use lyre_input::{ForegroundFocus, KeyBackend, SendInputBackend, foreground_window};

    for remaining in (1..=countdown_seconds.max(1)).rev() {
        println!("switch to the game window, starting in {remaining}...");
        std::thread::sleep(std::time::Duration::from_secs(1));
    }
    let target = foreground_window().context("no foreground window to play into")?;
    info!(window = %target, "Binding to foreground window");
    let backend: Box<dyn KeyBackend> = Box::new(SendInputBackend::new());
    Ok(PlayerBuilder::new(plan, backend)
        .target(Some(target))
        .focus(Box::new(ForegroundFocus::new(target))))
}

#[cfg(not(target_os = "windows"))]
fn live_builder(_plan: Plan, _countdown_seconds: u32) -> Result<PlayerBuilder> {
    anyhow::bail!("key injection is only available on Windows; use --dry-run")
}

fn print_plan(plan: &Plan) {
    for event in plan.events() {
        match (event.kind, event.key) {
            (EventKind::PauseMarker, _) => println!("{:>10.4}  bar {}", event.time, event.bar + 1),
            (kind, Some(key)) => println!(
                "{:>10.4}  {:<7} {key}  pitch {:>3}  bar {}",
                event.time,
                if kind == EventKind::Press { "press" } else { "release" },
                event.pitch,
                event.bar + 1
            ),
            (_, None) => {}
        }
    }
    let r = &plan.report;
    println!();
    println!("seed            {}", plan.seed);
    println!("duration        {:.3} s", plan.total_duration);
    println!("input notes     {}", r.input_notes);
    println!("scheduled       {}", r.scheduled);
    println!("rejected        {}", r.rejected);
    println!("dropped         {} ({} suppressed)", r.dropped, r.suppressed);
    println!("beat filtered   {}", r.beat_filtered);
    println!("octave shifted  {}", r.octave_shifted);
    println!("delayed chords  {} (max {:.1} ms)", r.delayed_chords, r.max_chord_delay * 1000.0);
    println!("planned errors  {}", plan.errors.total());
    if r.range_swapped {
        println!("octave range bounds were swapped");
    }
}

fn print_report(report: &PerformanceReport) {
    let d = &report.diagnostics;
    println!();
    println!("outcome         {:?}", report.outcome);
    println!("elapsed         {:.2} s ({:.2} s paused)", report.elapsed, report.paused);
    println!("presses         {} ({} missed)", report.presses, report.missed);
    println!("releases        {} ({} skipped)", report.releases, report.skipped_releases);
    println!("failed calls    {} press, {} release", d.failed_press, d.failed_release);
    println!("latency         avg {:.3} ms, max {:.3} ms", d.latency.avg_ms, d.latency.max_ms);
    println!("histogram       {:?}", d.latency.histogram);
    println!("focus releases  {}", d.focus_lost_releases);
    println!("stuck releases  {}", d.stuck_recoveries);
    println!(
        "errors          {} fired, {} displaced",
        report.errors.fired(),
        report.errors.displaced
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parses_play_flags() {
        let args = Args::parse_from([
            "lyre", "-v", "play", "song.json", "--dry-run", "--seed", "9", "--midi-mirror",
        ]);
        assert!(args.verbose);
        match args.command {
            Command::Play {
                score,
                dry_run,
                seed,
                midi_mirror,
                midi_port,
                ..
            } => {
                assert_eq!(score, PathBuf::from("song.json"));
                assert!(dry_run);
                assert_eq!(seed, Some(9));
                assert!(midi_mirror);
                assert_eq!(midi_port, None);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_plan_score_uses_explicit_seed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("score.json");
        Score::new(vec![lyre_model::NoteEvent::new(0.0, 60, 0.5)])
            .write(&path)
            .unwrap();
        let config = Config {
            seed: Some(1),
            ..Default::default()
        };
        let plan = plan_score(&path, &config, Some(5)).unwrap();
        assert_eq!(plan.seed, 5);
        assert_eq!(plan.press_count(), 1);
        assert_eq!(plan_score(&path, &config, None).unwrap().seed, 1);
    }

    #[test]
    fn test_missing_config_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config(Some(&dir.path().join("absent.json"))).is_err());
        assert_eq!(load_config(None).unwrap(), Config::default());
    }
}
