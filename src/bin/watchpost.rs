//! watchpost - single-camera motion and face monitor
//!
//! This binary:
//! 1. Loads configuration (WATCHPOST_CONFIG file, env overrides, flags)
//! 2. Logs the operator in
//! 3. Checks the camera and writes the status page
//! 4. Runs detection until the source ends, `q`/Ctrl-C, or --max-ticks
//! 5. Prints a bar chart of the logged events
//!
//! With the `preview-window` feature and `--window`, annotated frames are
//! shown live and `q` in the window stops the session.

use anyhow::{Context, Result};
use clap::Parser;
use std::io::BufReader;
use std::path::PathBuf;
use std::sync::Arc;

use watchpost::detect::build_face_detector;
use watchpost::monitor::{
    install_ctrlc, spawn_key_watcher, FeedPreview, JpegPreview, LiveFeed, NoPreview, Preview,
    Previews,
};
use watchpost::sink::{render_bar_chart, tally_file};
use watchpost::{
    open_source, prompt_login, EventLogs, Identity, Monitor, MonitorConfig, MonitorParts,
    SessionReport, StopToken,
};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// JSON config file (overrides WATCHPOST_CONFIG).
    #[arg(long)]
    config: Option<PathBuf>,
    /// Frame source: stub://<name>, dir://<path>, a directory, or /dev/videoN.
    #[arg(long)]
    source: Option<String>,
    /// Stop after this many frames.
    #[arg(long)]
    max_ticks: Option<u64>,
    /// Log in as this user instead of prompting (needs WATCHPOST_PASSWORD).
    #[arg(long)]
    user: Option<String>,
    #[arg(long, env = "WATCHPOST_PASSWORD", hide_env_values = true)]
    password: Option<String>,
    /// Do not write preview snapshots.
    #[arg(long)]
    no_preview: bool,
    /// Show annotated frames live in a window (preview-window builds).
    #[arg(long)]
    window: bool,
    /// Print the event chart for the existing log and exit.
    #[arg(long)]
    summary_only: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut cfg = match &args.config {
        Some(path) => MonitorConfig::load_from(Some(path.as_path()))?,
        None => MonitorConfig::load()?,
    };
    if let Some(source) = args.source {
        cfg.source.url = source;
    }
    if args.max_ticks.is_some() {
        cfg.max_ticks = args.max_ticks;
    }
    if args.no_preview {
        cfg.preview.path = None;
    }
    if args.window {
        cfg.preview.window = true;
    }

    let event_log = cfg.logs.event_log_path();
    if args.summary_only {
        let tally = tally_file(&event_log)?;
        println!("\n{}", render_bar_chart(&tally));
        return Ok(());
    }

    let credentials = cfg.credentials();
    let identity = match (args.user, args.password) {
        (Some(user), Some(password)) => {
            let identity = credentials.verify(&user, &password)?;
            println!("Login successful!\n");
            identity
        }
        _ => {
            let stdin = std::io::stdin();
            let mut input = stdin.lock();
            let mut output = std::io::stdout();
            prompt_login(&credentials, &mut input, &mut output)?
        }
    };
    log::info!("operator {} logged in", identity);

    let stop = StopToken::new();
    install_ctrlc(&stop)?;
    let _key_watcher = spawn_key_watcher(&stop, BufReader::new(std::io::stdin()), 'q');

    if let Some(notice) = cfg.face.disabled_notice() {
        println!("{}", notice);
    }
    println!("Starting detection. Type 'q' and Enter, or press Ctrl-C, to quit.");
    let report = if cfg.preview.window {
        run_with_window(&cfg, identity.clone(), stop)
    } else {
        run_session(&cfg, identity.clone(), stop, None)
    };
    print_summary(&identity, &event_log);
    let report = report?;
    log::info!(
        "stopped: {} after {} frames (camera: {})",
        report.stop_reason,
        report.ticks,
        report.health
    );
    Ok(())
}

fn run_session(
    cfg: &MonitorConfig,
    identity: Identity,
    stop: StopToken,
    feed: Option<Arc<LiveFeed>>,
) -> Result<SessionReport> {
    let parts = build_parts(cfg, feed)?;
    let mut monitor = Monitor::new(cfg.monitor_settings(), identity, parts, stop);
    monitor.run()
}

#[cfg(feature = "preview-window")]
fn run_with_window(
    cfg: &MonitorConfig,
    identity: Identity,
    stop: StopToken,
) -> Result<SessionReport> {
    let feed = LiveFeed::new();
    let worker = {
        let (cfg, feed, stop) = (cfg.clone(), feed.clone(), stop.clone());
        std::thread::spawn(move || {
            let report = run_session(&cfg, identity, stop, Some(feed.clone()));
            feed.finish();
            report
        })
    };
    if let Err(e) = watchpost::monitor::run_preview_window(feed, stop, "watchpost") {
        log::warn!("{:#}; continuing without a window", e);
    }
    worker
        .join()
        .map_err(|_| anyhow::anyhow!("monitor thread panicked"))?
}

#[cfg(not(feature = "preview-window"))]
fn run_with_window(
    cfg: &MonitorConfig,
    identity: Identity,
    stop: StopToken,
) -> Result<SessionReport> {
    log::warn!("built without the preview-window feature; running without a window");
    run_session(cfg, identity, stop, None)
}

fn build_parts(cfg: &MonitorConfig, feed: Option<Arc<LiveFeed>>) -> Result<MonitorParts> {
    let source = open_source(cfg.source.clone())
        .with_context(|| format!("opening frame source {}", cfg.source.url))?;
    let faces = build_face_detector(&cfg.face)?;
    let sink = EventLogs::open(&cfg.logs)?;

    let mut previews: Vec<Box<dyn Preview>> = Vec::new();
    if let Some(path) = &cfg.preview.path {
        log::info!("preview snapshots: {}", path.display());
        previews.push(Box::new(JpegPreview::new(path, cfg.preview.every_n_ticks)));
    }
    if let Some(feed) = feed {
        previews.push(Box::new(FeedPreview::new(feed)));
    }
    let preview: Box<dyn Preview> = match previews.len() {
        0 => Box::new(NoPreview),
        1 => previews.remove(0),
        _ => Box::new(Previews(previews)),
    };

    Ok(MonitorParts {
        source,
        faces,
        sink: Box::new(sink),
        preview,
    })
}

fn print_summary(identity: &Identity, event_log: &std::path::Path) {
    println!("\nSurveillance ended for {}. Log saved.", identity);
    match tally_file(event_log) {
        Ok(tally) => println!("\n{}", render_bar_chart(&tally)),
        Err(e) => log::warn!("event summary unavailable: {:#}", e),
    }
}
