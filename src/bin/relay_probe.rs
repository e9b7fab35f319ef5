//! relay-probe: exercise a running relay from the command line.
//!
//! ```text
//! relay-probe push                 # push one sample snapshot
//! relay-probe push --interval 1    # push a sample every second
//! relay-probe command set_throttle 75
//! relay-probe poll                 # consume the pending command
//! relay-probe status
//! relay-probe watch                # print telemetry as it arrives
//! ```

use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::{Map, Value, json};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use skyblue_relay::client::{DEFAULT_RECONNECT_DELAY, RelayClient, SubscriberClient};
use skyblue_relay::domain::{CommandValue, now_millis};

#[derive(Debug, Parser)]
#[command(name = "relay-probe")]
#[command(about = "Push, poll and watch a skyblue-relay instance")]
struct Cli {
    /// Relay base URL including the route prefix.
    #[arg(
        long,
        env = "RELAY_URL",
        default_value = "http://127.0.0.1:3000/api/websocket-relay"
    )]
    url: String,

    #[command(subcommand)]
    mode: Mode,
}

#[derive(Debug, Subcommand)]
enum Mode {
    /// Push a sample telemetry snapshot.
    Push {
        /// Keep pushing every N seconds until interrupted.
        #[arg(long)]
        interval: Option<u64>,
    },
    /// Submit a command for the producer.
    Command {
        /// Command type, e.g. `set_throttle`.
        kind: String,
        /// Optional value; numeric if it parses as a number.
        value: Option<String>,
    },
    /// Consume the pending command.
    Poll,
    /// Print the relay status.
    Status,
    /// Print the stored telemetry snapshot.
    Latest,
    /// Print telemetry snapshots as they arrive.
    Watch {
        /// Seconds to wait before reconnecting.
        #[arg(long, default_value_t = DEFAULT_RECONNECT_DELAY.as_secs())]
        reconnect_secs: u64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let client = RelayClient::new(cli.url);

    match cli.mode {
        Mode::Push { interval: None } => push_once(&client).await?,
        Mode::Push {
            interval: Some(secs),
        } => {
            let mut ticker = tokio::time::interval(Duration::from_secs(secs.max(1)));
            loop {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => break,
                    _ = ticker.tick() => {
                        if let Err(e) = push_once(&client).await {
                            tracing::warn!(error = %e, "push failed");
                        }
                    }
                }
            }
        }
        Mode::Command { kind, value } => {
            let value = value.map(|raw| match raw.parse::<serde_json::Number>() {
                Ok(n) => CommandValue::Number(n),
                Err(_) => CommandValue::Text(raw),
            });
            let accepted = client
                .submit_command(&kind, value)
                .await
                .context("command rejected")?;
            println!("{}", serde_json::to_string_pretty(&accepted)?);
        }
        Mode::Poll => {
            let poll = client.poll_command().await.context("poll failed")?;
            println!("{}", serde_json::to_string_pretty(&poll)?);
        }
        Mode::Status => {
            let status = client.status().await.context("status failed")?;
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
        Mode::Latest => match client.latest_telemetry().await.context("read failed")? {
            Some(snapshot) => println!("{}", serde_json::to_string_pretty(&snapshot)?),
            None => println!("{{}}"),
        },
        Mode::Watch { reconnect_secs } => {
            let subscriber = SubscriberClient::new(client)
                .with_reconnect_delay(Duration::from_secs(reconnect_secs));
            let cancel = CancellationToken::new();
            let on_interrupt = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    on_interrupt.cancel();
                }
            });
            subscriber
                .run(cancel, |snapshot| {
                    let age = snapshot.age_ms(now_millis());
                    match serde_json::to_string(&snapshot) {
                        Ok(line) => println!("{line}  (age {age} ms)"),
                        Err(e) => tracing::warn!(error = %e, "failed to print snapshot"),
                    }
                })
                .await;
        }
    }
    Ok(())
}

async fn push_once(client: &RelayClient) -> anyhow::Result<()> {
    let response = client
        .push_telemetry(&sample_snapshot())
        .await
        .context("push rejected")?;
    println!("pushed; {} local subscriber(s)", response.clients);
    Ok(())
}

/// A representative producer payload.
fn sample_snapshot() -> Map<String, Value> {
    let sample = json!({
        "mas": 1, "ice": 1, "mot": 1, "eme": 0, "mod": 1,
        "bat": 88.8, "fue": 99.9, "thr": 50, "sol": 4.5,
        "tst": 2500, "spd": 150, "alt": 3000,
        "flt_time": 120, "dist_km": 10, "range_km": 500,
        "elec_wh": 100, "ice_wh": 200, "solar_wh": 50,
        "elec_pct": 33, "co2_g": 500, "co2_saved_g": 100
    });
    match sample {
        Value::Object(fields) => fields,
        _ => Map::new(),
    }
}
