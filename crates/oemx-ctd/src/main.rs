//! oemx-ctd - OEMX CTD driver host
//!
//! Opens the instrument's serial port (or a simulated instrument), runs the
//! driver task and recreates it after the backoff whenever it asks for a
//! restart, until interrupted.

use anyhow::{bail, Context};
use clap::Parser;
use oemx_core::config::CtdConfig;
use oemx_core::driver::RestartNeeded;
use oemx_core::protocol::{
    configure_port, list_ports, open_port, SerialTransport, SimulatedCtd, Transport,
};
use oemx_core::supervisor::Supervisor;
use oemx_core::task::CtdTask;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

mod host;

use host::HostSupervisor;

/// Backoff after the serial port could not be opened
const PORT_OPEN_BACKOFF: Duration = Duration::from_secs(10);

/// OEMX CTD driver
#[derive(Parser, Debug)]
#[command(name = "oemx-ctd", version, about = "Driver for OEMX CTD instruments", long_about = None)]
struct Cli {
    /// JSON configuration file
    #[arg(short, long, env = "OEMX_CTD_CONFIG")]
    config: Option<PathBuf>,

    /// Serial port device, overrides the configuration
    #[arg(short, long)]
    device: Option<String>,

    /// Baud rate, overrides the configuration
    #[arg(short, long)]
    baud: Option<u32>,

    /// Talk to a simulated instrument instead of a serial port
    #[arg(long)]
    simulate: bool,

    /// Print device info, states and samples as JSON lines
    #[arg(long)]
    json: bool,

    /// List available serial ports and exit
    #[arg(long)]
    list_ports: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if cli.list_ports {
        for port in list_ports() {
            match (&port.product, port.vid, port.pid) {
                (Some(product), Some(vid), Some(pid)) => {
                    println!("{}  {:04x}:{:04x}  {}", port.name, vid, pid, product)
                }
                _ => println!("{}", port.name),
            }
        }
        return Ok(());
    }

    let config = load_config(&cli)?;

    let stop = Arc::new(AtomicBool::new(false));
    let s = stop.clone();
    ctrlc::set_handler(move || {
        s.store(true, Ordering::SeqCst);
    })
    .context("failed to install Ctrl-C handler")?;

    tracing::info!("Starting oemx-ctd v{}", env!("CARGO_PKG_VERSION"));
    supervise(&cli, &config, &stop);
    tracing::info!("stopped");
    Ok(())
}

fn load_config(cli: &Cli) -> anyhow::Result<CtdConfig> {
    let mut config = match &cli.config {
        Some(path) => CtdConfig::load(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => CtdConfig::default(),
    };

    if let Some(device) = &cli.device {
        config.serial.device = device.clone();
    }
    if let Some(baud) = cli.baud {
        config.serial.baud_rate = baud;
    }
    if cli.simulate && config.mounts().is_err() {
        // A full CT plus pressure, the most common fit
        config.primary_mount = vec!["conductivity".into(), "temperature".into()];
        config.secondary_mount = vec!["pressure".into()];
    }

    config.validate()?;
    if !cli.simulate && config.serial.device.is_empty() {
        bail!("no serial device configured, use --device or --simulate");
    }
    Ok(config)
}

/// Run the task until stopped, recreating it after every restart request
fn supervise(cli: &Cli, config: &CtdConfig, stop: &Arc<AtomicBool>) {
    while !stop.load(Ordering::SeqCst) {
        let host = HostSupervisor::new(stop.clone(), cli.json);
        let outcome = if cli.simulate {
            match config.mounts() {
                Ok(mounts) => run_task(SimulatedCtd::new(mounts), config, host),
                Err(e) => Err(RestartNeeded::new(e.to_string(), PORT_OPEN_BACKOFF)),
            }
        } else {
            match open_transport(config) {
                Ok(transport) => run_task(transport, config, host),
                Err(e) => Err(RestartNeeded::new(format!("{e:#}"), PORT_OPEN_BACKOFF)),
            }
        };

        match outcome {
            Ok(()) => break,
            Err(restart) => {
                tracing::warn!("{restart}");
                sleep_unless_stopped(restart.backoff, stop);
            }
        }
    }
}

fn open_transport(config: &CtdConfig) -> anyhow::Result<SerialTransport> {
    let device = &config.serial.device;
    let mut port = open_port(device, Some(config.serial.baud_rate))
        .with_context(|| format!("unable to open {device}"))?;
    configure_port(port.as_mut()).with_context(|| format!("unable to configure {device}"))?;
    tracing::info!("opened {} at {} baud", device, config.serial.baud_rate);
    Ok(SerialTransport::new(port))
}

fn run_task<T: Transport, S: Supervisor>(
    transport: T,
    config: &CtdConfig,
    supervisor: S,
) -> Result<(), RestartNeeded> {
    let mut task = CtdTask::new(transport, config, supervisor)
        .map_err(|e| RestartNeeded::new(e.to_string(), PORT_OPEN_BACKOFF))?;
    task.execute()
}

fn sleep_unless_stopped(duration: Duration, stop: &AtomicBool) {
    let deadline = Instant::now() + duration;
    while !stop.load(Ordering::SeqCst) {
        let now = Instant::now();
        if now >= deadline {
            break;
        }
        std::thread::sleep(Duration::from_millis(100).min(deadline - now));
    }
}
