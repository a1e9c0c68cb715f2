//! Example: Scheduler Loop
//!
//! This example demonstrates:
//! - Driving the device-driver facade from a small state machine
//! - Connecting, homing, running a fixed plan and aborting, every cycle
//! - The facade's rejection messages: `home` is not a schedulable
//!   operation, and `pick`/`place` receive one parameter too many
//!
//! Environment:
//! - `ROBODRIVER_ADDRESS`: robot IP (default `127.0.0.30`)
//! - `ROBODRIVER_CYCLES`: how many cycles to run (default 1)
//! - `ROBODRIVER_*`: engine settings, see `EngineConfig::from_env`
//! - `RUST_LOG`: log filter (default `info`)
//!
//! Run with: cargo run --example scheduler

use anyhow::Context;
use robodriver::{DeviceDriver, EngineConfig};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

const PLAN: [&str; 11] = [
    "pick", "home", "transfer", "pick", "home", "place", "transfer", "transfer", "transfer",
    "transfer", "pick",
];

// Every operation gets the same fixed sample parameters
const PARAMETER_NAMES: [&str; 2] = ["Destination Location", "Source Location"];
const PARAMETER_VALUES: [&str; 2] = ["5", "12"];

const STEP_DELAY: Duration = Duration::from_millis(500);

/// Scheduler program states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    ConnectionToRobot,
    Initialise,
    ExecuteOperation(usize),
    Abort,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let address = std::env::var("ROBODRIVER_ADDRESS").unwrap_or_else(|_| "127.0.0.30".to_string());
    let cycles: u32 = match std::env::var("ROBODRIVER_CYCLES") {
        Ok(raw) => raw.parse().context("ROBODRIVER_CYCLES must be a number")?,
        Err(_) => 1,
    };
    let config = EngineConfig::from_env()?;

    let mut driver = DeviceDriver::with_config(config);
    let mut step = Step::ConnectionToRobot;
    let mut cycle = 1;

    while cycle <= cycles {
        step = match step {
            Step::ConnectionToRobot => {
                println!("\nCycle {cycle}/{cycles}: connecting to {address}...");
                let response = driver.open_connection(&address).await;
                tokio::time::sleep(STEP_DELAY).await;
                if response.is_empty() {
                    Step::Initialise
                } else {
                    println!("  {response}");
                    Step::ConnectionToRobot
                }
            }
            Step::Initialise => {
                let process_id = driver.initialise().await;
                if !process_id.trim().is_empty() {
                    println!("  Process ID: {process_id}");
                }
                tokio::time::sleep(STEP_DELAY).await;
                Step::ExecuteOperation(0)
            }
            Step::ExecuteOperation(index) => {
                let operation = PLAN[index];
                let result = driver
                    .execute_operation(operation, &PARAMETER_NAMES, &PARAMETER_VALUES)
                    .await;
                println!("  {operation:<8} -> {result}");
                tokio::time::sleep(STEP_DELAY).await;
                if index + 1 < PLAN.len() {
                    Step::ExecuteOperation(index + 1)
                } else {
                    Step::Abort
                }
            }
            Step::Abort => {
                driver.abort();
                cycle += 1;
                Step::ConnectionToRobot
            }
        };
    }

    println!("\nDone");
    Ok(())
}
