//! Operator CLI for the gridlight telemetry and command subsystem.
//!
//! `watch` is the long-running mode: it opens a channel per roster unit and
//! streams status changes and notifications until interrupted. `toggle` and
//! `schedule` are one-shot command calls.

use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tokio::sync::broadcast::error::RecvError;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use gridlight_core::{SchedulePayload, UnitId, UnitStatus};
use gridlight_fleet::{
    CommandDispatcher, ConnectionManager, ControlPlane, FleetConfig, FleetSupervisor,
    NotificationStream, RestControlPlane, StatusRegistry,
};

/// How long `toggle` waits for the unit's first status frame.
const FIRST_REPORT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Parser)]
#[command(name = "gridlight", version, about = "Fleet telemetry and command console")]
struct Cli {
    /// Configuration file (TOML). Defaults to ./gridlight.toml when present.
    #[arg(long)]
    config: Option<String>,

    /// Control-plane username.
    #[arg(long, env = "GRIDLIGHT_USERNAME")]
    username: String,

    /// Control-plane password.
    #[arg(long, env = "GRIDLIGHT_PASSWORD", hide_env_values = true)]
    password: String,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand)]
enum CliCommand {
    /// Print the cluster roster.
    Clusters,
    /// Open a channel per roster unit and stream status changes.
    Watch,
    /// Flip one unit's relay.
    Toggle {
        /// Unit id.
        unit: u64,
    },
    /// Program a unit's daily on/off schedule.
    Schedule {
        /// Unit id.
        unit: u64,
        /// Switch-on time, HH:MM.
        #[arg(long, value_parser = parse_hhmm)]
        on: (u8, u8),
        /// Switch-off time, HH:MM.
        #[arg(long, value_parser = parse_hhmm)]
        off: (u8, u8),
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = FleetConfig::load(cli.config.as_deref()).context("loading configuration")?;
    let control = RestControlPlane::login(&config.api_url, &cli.username, &cli.password)
        .await
        .context("control-plane login")?;

    match cli.command {
        CliCommand::Clusters => run_clusters(&control).await,
        CliCommand::Watch => run_watch(&config, control).await,
        CliCommand::Toggle { unit } => run_toggle(&config, control, UnitId(unit)).await,
        CliCommand::Schedule { unit, on, off } => {
            run_schedule(control, UnitId(unit), on, off).await
        }
    }
}

async fn run_clusters(control: &RestControlPlane) -> anyhow::Result<()> {
    let clusters = control.fetch_roster().await?;
    for cluster in &clusters {
        println!("{} (cluster {})", cluster.name, cluster.id);
        for unit in &cluster.units {
            println!("  unit {}  {}", unit.id, unit.name);
        }
    }
    Ok(())
}

async fn run_watch(config: &FleetConfig, control: RestControlPlane) -> anyhow::Result<()> {
    let registry = StatusRegistry::new();
    let manager =
        ConnectionManager::new(&config.ws_url, config.channel_config(), registry.clone());
    let mut supervisor = FleetSupervisor::new(manager, registry.clone());

    let notifications = NotificationStream::spawn(
        &config.ws_url,
        control.token(),
        config.reconnect.clone(),
    );
    let mut notes = notifications.subscribe();
    let mut changes = registry.subscribe();

    let clusters = control.fetch_roster().await?;
    supervisor.sync_roster(&clusters);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = changes.recv() => match changed {
                Ok(unit_id) => {
                    if let Some(status) = registry.read(unit_id) {
                        println!("{}", render_status(&status));
                    }
                }
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "status feed lagged"),
                Err(RecvError::Closed) => break,
            },
            note = notes.recv() => match note {
                Ok(note) => println!("[{:?}] {}", note.severity, note.message),
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "notification feed lagged"),
                Err(RecvError::Closed) => break,
            },
        }
    }

    notifications.shutdown();
    supervisor.shutdown();
    Ok(())
}

async fn run_toggle(
    config: &FleetConfig,
    control: RestControlPlane,
    unit_id: UnitId,
) -> anyhow::Result<()> {
    let registry = StatusRegistry::new();
    let mut manager =
        ConnectionManager::new(&config.ws_url, config.channel_config(), registry.clone());
    manager.open(unit_id);

    wait_for_report(&registry, unit_id, FIRST_REPORT_TIMEOUT).await?;

    let dispatcher = CommandDispatcher::new(control, registry);
    let now_on = dispatcher.toggle(unit_id).await?;
    println!(
        "unit {unit_id} switched {}",
        if now_on { "on" } else { "off" }
    );
    manager.close(unit_id);
    Ok(())
}

async fn run_schedule(
    control: RestControlPlane,
    unit_id: UnitId,
    on: (u8, u8),
    off: (u8, u8),
) -> anyhow::Result<()> {
    let dispatcher = CommandDispatcher::new(control, StatusRegistry::new());
    dispatcher
        .schedule(
            unit_id,
            SchedulePayload {
                hour_on: on.0,
                minute_on: on.1,
                hour_off: off.0,
                minute_off: off.1,
            },
        )
        .await?;
    println!("schedule programmed for unit {unit_id}");
    Ok(())
}

/// Block until the unit's channel delivers a first status, or time out.
async fn wait_for_report(
    registry: &StatusRegistry,
    unit_id: UnitId,
    deadline: Duration,
) -> anyhow::Result<()> {
    let mut changes = registry.subscribe();
    let reported = tokio::time::timeout(deadline, async {
        loop {
            if registry.read(unit_id).is_some_and(|s| s.is_connected) {
                return;
            }
            match changes.recv().await {
                Ok(_) | Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => return,
            }
        }
    })
    .await;

    if reported.is_err() {
        bail!("unit {unit_id} did not report within {deadline:?}");
    }
    Ok(())
}

fn render_status(status: &UnitStatus) -> String {
    let connection = if status.is_connected { "up" } else { "down" };
    let relay = if status.is_on { "on" } else { "off" };
    format!(
        "unit {}  {}  relay {}  power {}  current {}  voltage {}",
        status.unit_id,
        connection,
        relay,
        render_reading(status.power, "W"),
        render_reading(status.current, "A"),
        render_reading(status.voltage, "V"),
    )
}

fn render_reading(value: Option<f64>, suffix: &str) -> String {
    value.map_or_else(|| "?".to_string(), |v| format!("{v:.1}{suffix}"))
}

fn parse_hhmm(raw: &str) -> Result<(u8, u8), String> {
    let (hour, minute) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected HH:MM, got {raw:?}"))?;
    let hour = hour
        .parse::<u8>()
        .map_err(|_| format!("bad hour in {raw:?}"))?;
    let minute = minute
        .parse::<u8>()
        .map_err(|_| format!("bad minute in {raw:?}"))?;
    Ok((hour, minute))
}
