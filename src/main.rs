use std::fs::{self, File};
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::info;
use tracing_subscriber::EnvFilter;

use feedwatch::config::Settings;
use feedwatch::data::duration::parse_duration;
use feedwatch::data::{write_csv, DashboardData, Report, DEFAULT_INTERVAL_HOURS};
use feedwatch::source::{
    parse_body, FeedClient, FeedFetcher, FeedRequest, FeedSource, FileSource, HttpSource,
    RawFeedBatch, RefreshSchedule, ALLOWED_RESULTS, DEFAULT_HOST, DEFAULT_RESULTS,
    DEFAULT_TIMEOUT,
};
use feedwatch::ui::Theme;
use feedwatch::{events, ui, App};

const DEFAULT_CONFIG: &str = "feedwatch.toml";

#[derive(Parser, Debug)]
#[command(name = "feedwatch", version)]
#[command(about = "Terminal dashboard for sensor feeds from a telemetry REST API")]
struct Args {
    /// Channel id to monitor
    #[arg(short, long, conflicts_with = "file")]
    channel: Option<String>,

    /// Read API key for private channels
    #[arg(long, env = "FEEDWATCH_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Named channel preset from the configuration file
    #[arg(short, long, conflicts_with_all = ["channel", "file"])]
    preset: Option<String>,

    /// Configuration file (TOML) [default: feedwatch.toml, optional]
    #[arg(long)]
    config: Option<PathBuf>,

    /// API host
    #[arg(long)]
    host: Option<String>,

    /// Number of entries to fetch (10, 20, 50, 100 or 200)
    #[arg(long, value_parser = parse_results)]
    results: Option<u32>,

    /// Expected hours between sensor updates [default: 3]
    #[arg(long, value_parser = parse_interval)]
    interval_hours: Option<f64>,

    /// Fetch again on a timer (see --refresh)
    #[arg(long)]
    auto_refresh: bool,

    /// Auto-refresh interval (e.g., "30s", "5m")
    #[arg(long, default_value = "30s", value_parser = parse_positive_duration)]
    refresh: Duration,

    /// Request timeout (e.g., "10s") [default: 10s]
    #[arg(long, value_parser = parse_positive_duration)]
    timeout: Option<Duration>,

    /// Read a saved feeds.json response instead of calling the API
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Fetch once, write the readings as CSV and exit
    #[arg(short, long)]
    export: Option<PathBuf>,

    /// Fetch once, write a JSON report and exit
    #[arg(long)]
    report: Option<PathBuf>,

    /// Write logs to this file
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,
}

fn parse_results(s: &str) -> Result<u32, String> {
    let n: u32 = s.parse().map_err(|e| format!("{}", e))?;
    if ALLOWED_RESULTS.contains(&n) {
        Ok(n)
    } else {
        Err(format!("must be one of {:?}", ALLOWED_RESULTS))
    }
}

fn parse_interval(s: &str) -> Result<f64, String> {
    let hours: f64 = s.parse().map_err(|e| format!("{}", e))?;
    if hours.is_finite() && hours > 0.0 {
        Ok(hours)
    } else {
        Err("must be a positive number of hours".to_string())
    }
}

fn parse_positive_duration(s: &str) -> Result<Duration, String> {
    match parse_duration(s) {
        Ok(d) if !d.is_zero() => Ok(d),
        Ok(_) => Err("must be greater than zero".to_string()),
        Err(e) => Err(e.to_string()),
    }
}

/// Where the feed comes from.
enum Target {
    File(PathBuf),
    Api {
        client: FeedClient,
        request: FeedRequest,
    },
}

impl Target {
    /// Label used in export file names.
    fn label(&self) -> String {
        match self {
            Target::File(path) => path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "file".to_string()),
            Target::Api { request, .. } => request.channel_id().to_string(),
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    let one_shot = args.export.is_some() || args.report.is_some();

    init_logging(&args, one_shot)?;

    let config_path = args.config.clone().unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG));
    let settings = Settings::load(&config_path, args.config.is_some())?;

    let interval = match args.interval_hours.or(settings.interval_hours) {
        Some(hours) if hours.is_finite() && hours > 0.0 => hours,
        Some(hours) => bail!("interval_hours must be positive, got {}", hours),
        None => DEFAULT_INTERVAL_HOURS,
    };

    let target = resolve_target(&args, &settings)?;

    // Handle export/report mode (non-interactive)
    if one_shot {
        return run_once(&args, target, interval);
    }

    let auto_refresh = args.auto_refresh.then_some(args.refresh);
    run_tui(target, interval, auto_refresh)
}

/// Install the tracing subscriber.
///
/// The TUI owns the terminal, so it only logs when a log file is given.
fn init_logging(args: &Args, one_shot: bool) -> Result<()> {
    let level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_env("FEEDWATCH_LOG")
        .unwrap_or_else(|_| EnvFilter::new(format!("feedwatch={}", level)));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    if let Some(ref path) = args.log_file {
        let file = File::create(path)
            .with_context(|| format!("Failed to create log file {}", path.display()))?;
        builder.with_ansi(false).with_writer(Mutex::new(file)).init();
    } else if one_shot {
        builder.with_writer(io::stderr).init();
    }
    Ok(())
}

/// Combine CLI flags, presets and settings into a feed target.
fn resolve_target(args: &Args, settings: &Settings) -> Result<Target> {
    if let Some(ref path) = args.file {
        return Ok(Target::File(path.clone()));
    }

    let (channel_id, preset_key) = if let Some(ref name) = args.preset {
        let Some(preset) = settings.preset(name) else {
            let names = settings.preset_names();
            if names.is_empty() {
                bail!("Unknown preset '{}': no presets configured", name);
            }
            bail!("Unknown preset '{}' (available: {})", name, names.join(", "));
        };
        (preset.channel_id.clone(), preset.api_key.clone())
    } else if let Some(ref channel) = args.channel {
        (channel.clone(), None)
    } else {
        bail!("No channel given: use --channel, --preset or --file");
    };

    let api_key = args.api_key.clone().or(preset_key);
    let results = args.results.or(settings.results).unwrap_or(DEFAULT_RESULTS);
    let request = FeedRequest::new(channel_id, api_key, results)?;

    let timeout = match (args.timeout, settings.timeout.as_deref()) {
        (Some(timeout), _) => timeout,
        (None, Some(s)) => parse_positive_duration(s)
            .map_err(anyhow::Error::msg)
            .with_context(|| format!("Invalid timeout in configuration: {}", s))?,
        (None, None) => DEFAULT_TIMEOUT,
    };
    let host = args
        .host
        .clone()
        .or_else(|| settings.host.clone())
        .unwrap_or_else(|| DEFAULT_HOST.to_string());

    let client = FeedClient::builder().host(host).timeout(timeout).build()?;
    Ok(Target::Api { client, request })
}

/// Load the feed a single time, without the TUI.
fn load_once(target: &Target) -> Result<RawFeedBatch> {
    match target {
        Target::File(path) => {
            let content =
                fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
            Ok(parse_body(&content)?)
        }
        Target::Api { client, request } => {
            let rt = tokio::runtime::Runtime::new()?;
            info!(source = %client.describe(request), "fetching feed");
            Ok(rt.block_on(client.fetch(request))?)
        }
    }
}

/// Fetch once and write the requested outputs.
fn run_once(args: &Args, target: Target, interval: f64) -> Result<()> {
    let batch = load_once(&target)?;
    let data = DashboardData::from_batch(batch, interval);

    if let Some(ref path) = args.export {
        export_csv(&data, path)?;
        println!("Exported {} readings to: {}", data.records.len(), path.display());
    }

    if let Some(ref path) = args.report {
        let json = Report::new(&data).to_json()?;
        fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
        println!("Wrote report to: {}", path.display());
    }

    println!("{}", data.freshness().message);
    Ok(())
}

fn export_csv(data: &DashboardData, path: &Path) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    write_csv(&data.records, BufWriter::new(file))?;
    Ok(())
}

/// Run the TUI with the given feed target
fn run_tui(target: Target, interval: f64, auto_refresh: Option<Duration>) -> Result<()> {
    // The poller task lives on this runtime while the TUI owns the main thread
    let rt = tokio::runtime::Runtime::new()?;
    let _guard = rt.enter();

    let label = target.label();
    let (source, poll_interval): (Box<dyn FeedSource>, Duration) = match target {
        Target::File(path) => (Box::new(FileSource::new(path)), Duration::from_secs(1)),
        Target::Api { client, request } => {
            let schedule = match auto_refresh {
                Some(every) => RefreshSchedule::Every(every),
                None => RefreshSchedule::Manual,
            };
            let source = HttpSource::spawn(client, request, schedule);
            (Box::new(source), Duration::from_millis(100))
        }
    };

    let theme = Theme::auto_detect();

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Setup panic hook to restore terminal
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen, DisableMouseCapture);
        original_hook(panic);
    }));

    let mut app = App::new(source, interval, label)
        .with_auto_refresh(auto_refresh)
        .with_theme(theme);
    app.reload_data();

    let result = run_app(&mut terminal, &mut app, poll_interval);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    poll_interval: Duration,
) -> Result<()> {
    let mut last_poll = Instant::now();

    // Minimum terminal size for usable display
    const MIN_WIDTH: u16 = 60;
    const MIN_HEIGHT: u16 = 16;

    while app.running {
        terminal.draw(|frame| {
            let area = frame.area();

            if area.width < MIN_WIDTH || area.height < MIN_HEIGHT {
                let msg = format!(
                    "Terminal too small: {}x{}\nMinimum: {}x{}\n\nResize to continue",
                    area.width, area.height, MIN_WIDTH, MIN_HEIGHT
                );
                let paragraph = ratatui::widgets::Paragraph::new(msg)
                    .alignment(ratatui::layout::Alignment::Center)
                    .style(ratatui::style::Style::default().fg(ratatui::style::Color::Yellow));
                let height = area.height.min(5);
                let centered = ratatui::layout::Rect::new(
                    0,
                    (area.height / 2).saturating_sub(2),
                    area.width,
                    height,
                );
                frame.render_widget(paragraph, centered);
                return;
            }

            ui::draw(frame, app, area);
        })?;

        // Poll for events with a short timeout
        if let Some(event) = events::poll_event(Duration::from_millis(100))? {
            match event {
                Event::Key(key) => events::handle_key_event(app, key),
                Event::Mouse(mouse) => events::handle_mouse_event(app, mouse),
                _ => {}
            }
        }

        if last_poll.elapsed() >= poll_interval {
            app.reload_data();
            last_poll = Instant::now();
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_results_allow_list() {
        assert_eq!(parse_results("50"), Ok(50));
        assert!(parse_results("30").is_err());
        assert!(parse_results("abc").is_err());
    }

    #[test]
    fn test_parse_interval() {
        assert_eq!(parse_interval("2.5"), Ok(2.5));
        assert!(parse_interval("0").is_err());
        assert!(parse_interval("-1").is_err());
        assert!(parse_interval("NaN").is_err());
    }

    #[test]
    fn test_parse_positive_duration() {
        assert_eq!(parse_positive_duration("30s"), Ok(Duration::from_secs(30)));
        assert!(parse_positive_duration("0s").is_err());
        assert!(parse_positive_duration("soon").is_err());
    }

    #[test]
    fn test_preset_resolution() {
        let settings = Settings::from_toml(
            r#"
            [presets.garden]
            channel_id = "123456"
            api_key = "PRESETKEY"
            "#,
        )
        .unwrap();

        let args = Args::parse_from(["feedwatch", "--preset", "garden", "--results", "50"]);
        let Target::Api { client, request } = resolve_target(&args, &settings).unwrap() else {
            panic!("expected an API target");
        };
        assert_eq!(request.channel_id(), "123456");
        assert!(request.has_api_key());
        assert_eq!(request.results(), 50);
        assert_eq!(client.host(), DEFAULT_HOST);

        let args = Args::parse_from(["feedwatch", "--preset", "missing"]);
        let err = resolve_target(&args, &settings).err().unwrap();
        assert!(err.to_string().contains("available: garden"));
    }

    #[test]
    fn test_requires_a_channel() {
        let args = Args::parse_from(["feedwatch"]);
        assert!(resolve_target(&args, &Settings::default()).is_err());
    }

    #[test]
    fn test_file_conflicts_with_channel() {
        assert!(Args::try_parse_from(["feedwatch", "--file", "f.json", "--channel", "1"]).is_err());
    }

    #[test]
    fn test_file_target_label() {
        let args = Args::parse_from(["feedwatch", "--file", "/tmp/garden_feed.json"]);
        let target = resolve_target(&args, &Settings::default()).unwrap();
        assert_eq!(target.label(), "garden_feed");
    }
}
