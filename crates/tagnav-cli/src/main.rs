mod scheduler;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{info, warn};

use tagnav_audio::{doctor as audio_doctor, AudioConfig};
use tagnav_nav::feed::{self, TransformFeed};
use tagnav_nav::nav::{
    DEFAULT_ALIGN_TOLERANCE_M, DEFAULT_ASCEND_THRESHOLD_M, DEFAULT_DESCEND_DWELL,
};
use tagnav_nav::pose::default_marker_table;
use tagnav_nav::waypoints::{default_destinations, default_waypoint_table};
use tagnav_nav::{
    doctor as nav_doctor, MarkerCalibration, NavEngine, NavParams, TransformObserver,
    WaypointTable,
};
use tagnav_proto::Command as Say;

#[derive(Debug, Parser)]
#[command(
    name = "tagnav",
    version,
    about = "tagnav - spoken waypoint guidance from fiducial tags"
)]
struct Cli {
    #[arg(long, default_value = "tagnav.toml")]
    config: String,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Validate config, route and audio clips.
    Doctor,
    /// Guide the pilot live from the configured feed.
    Run,
    /// Feed a recorded JSONL file one batch per tick and print the commands.
    Replay {
        #[arg(long)]
        input: String,
        #[arg(long, default_value_t = 1000)]
        max_ticks: usize,
    },
    /// Print the command -> clip -> phrase table used to render clips.
    Phrases,
}

#[derive(Debug, serde::Deserialize)]
struct Config {
    #[serde(default)]
    nav: NavCfg,
    /// marker id -> [offset_x, offset_y]
    #[serde(default = "default_marker_table")]
    markers: BTreeMap<String, [f64; 2]>,
    /// label -> [x, y]
    #[serde(default = "default_waypoint_table")]
    waypoints: BTreeMap<String, [f64; 2]>,
    #[serde(default)]
    feed: FeedCfg,
    #[serde(default)]
    audio: AudioConfig,
}

#[derive(Debug, serde::Deserialize)]
#[serde(default)]
struct NavCfg {
    ascend_threshold_m: f64,
    align_tolerance_m: f64,
    descend_dwell_s: f64,
    tick_interval_s: f64,
    destinations: Vec<String>,
}

impl Default for NavCfg {
    fn default() -> Self {
        Self {
            ascend_threshold_m: DEFAULT_ASCEND_THRESHOLD_M,
            align_tolerance_m: DEFAULT_ALIGN_TOLERANCE_M,
            descend_dwell_s: DEFAULT_DESCEND_DWELL.as_secs_f64(),
            tick_interval_s: 2.0,
            destinations: default_destinations(),
        }
    }
}

impl NavCfg {
    fn params(&self) -> Result<NavParams> {
        let params = NavParams {
            ascend_threshold_m: self.ascend_threshold_m,
            align_tolerance_m: self.align_tolerance_m,
            descend_dwell: Duration::try_from_secs_f64(self.descend_dwell_s)
                .context("nav.descend_dwell_s")?,
        };
        params.validate()?;
        Ok(params)
    }

    fn tick_interval(&self) -> Result<Duration> {
        let tick =
            Duration::try_from_secs_f64(self.tick_interval_s).context("nav.tick_interval_s")?;
        anyhow::ensure!(!tick.is_zero(), "nav.tick_interval_s must be > 0");
        Ok(tick)
    }
}

#[derive(Debug, serde::Deserialize)]
#[serde(default)]
struct FeedCfg {
    source: String,
    path: Option<String>,
    device: Option<String>,
    baud: Option<u32>,
    bind: Option<String>,
}

impl Default for FeedCfg {
    fn default() -> Self {
        Self { source: "stdin".into(), path: None, device: None, baud: None, bind: None }
    }
}

fn load_config(path: &str) -> Result<Config> {
    let s = std::fs::read_to_string(path).with_context(|| format!("read config {}", path))?;
    toml::from_str(&s).context("parse config toml")
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.cmd {
        Command::Phrases => phrases(),
        Command::Doctor => doctor(&load_config(&cli.config)?)?,
        Command::Run => run(&load_config(&cli.config)?).await?,
        Command::Replay { input, max_ticks } => {
            replay(&load_config(&cli.config)?, &input, max_ticks).await?
        }
    }
    Ok(())
}

fn phrases() {
    for cmd in Say::ALL {
        println!("{}\t{}\t{}", cmd.keyword(), cmd.clip(), cmd.phrase());
    }
}

fn doctor(cfg: &Config) -> Result<()> {
    info!("doctor: starting");

    nav_doctor::check_params(&cfg.nav.params()?, cfg.nav.tick_interval()?)?;
    nav_doctor::check_calibration(&MarkerCalibration::from_table(&cfg.markers)?)?;
    nav_doctor::check_route(&WaypointTable::from_table(&cfg.waypoints), &cfg.nav.destinations)?;
    open_feed_check(&cfg.feed)?;
    audio_doctor::check_assets(&cfg.audio)?;

    info!("doctor: OK");
    Ok(())
}

fn build_engine(cfg: &Config) -> Result<NavEngine> {
    let calibration = MarkerCalibration::from_table(&cfg.markers).context("markers")?;
    let route = WaypointTable::from_table(&cfg.waypoints)
        .resolve(&cfg.nav.destinations)
        .context("nav.destinations")?;
    let params = cfg.nav.params()?;
    info!(
        "nav: {} markers, route {:?}, ascend>{}m, tol<{}m, dwell {:?}",
        calibration.len(),
        cfg.nav.destinations,
        params.ascend_threshold_m,
        params.align_tolerance_m,
        params.descend_dwell
    );
    Ok(NavEngine::new(calibration, route, params))
}

fn open_feed_check(cfg: &FeedCfg) -> Result<()> {
    match cfg.source.as_str() {
        "stdin" => {}
        "file" => anyhow::ensure!(cfg.path.is_some(), "feed.path missing"),
        "serial" => anyhow::ensure!(cfg.device.is_some(), "feed.device missing"),
        "udp" => {}
        other => anyhow::bail!("unknown feed.source: {}", other),
    }
    Ok(())
}

async fn open_feed(cfg: &FeedCfg) -> Result<TransformFeed> {
    open_feed_check(cfg)?;
    match cfg.source.as_str() {
        "file" => TransformFeed::file(cfg.path.as_deref().context("feed.path missing")?),
        "serial" => TransformFeed::serial(
            cfg.device.as_deref().context("feed.device missing")?,
            cfg.baud.unwrap_or(115_200),
        ),
        "udp" => TransformFeed::udp(cfg.bind.as_deref().unwrap_or("0.0.0.0:5005")).await,
        _ => Ok(TransformFeed::stdin()),
    }
}

async fn run(cfg: &Config) -> Result<()> {
    info!("run: starting");

    let mut nav = build_engine(cfg)?;
    let mut dispatcher = tagnav_audio::from_config(&cfg.audio)?;

    let observer = TransformObserver::new();
    let source = open_feed(&cfg.feed).await?;
    let feed_observer = observer.clone();
    let feed_task = tokio::spawn(async move {
        if let Err(e) = feed::pump(source, feed_observer).await {
            warn!("feed: stopped: {:#}", e);
        }
    });

    // One handler for the whole run, so a Ctrl-C during a dwell is not lost.
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("run: cannot listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    let finish = scheduler::drive(
        &mut nav,
        || observer.current(),
        dispatcher.as_mut(),
        cfg.nav.tick_interval()?,
        shutdown,
    )
    .await;

    feed_task.abort();
    finish.map(|_| ())
}

async fn replay(cfg: &Config, input: &str, max_ticks: usize) -> Result<()> {
    let mut nav = build_engine(cfg)?;
    let source = TransformFeed::file(input)?;

    let outcome = scheduler::replay(&mut nav, Some(source), max_ticks).await?;
    for cmd in &outcome.commands {
        println!("{}", cmd);
    }
    Ok(())
}
