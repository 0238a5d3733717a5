//! Host monitor for the GPIO sensor bridge.
//!
//! Usage:
//!   cargo run --bin sensor-monitor              # interactive menu
//!   cargo run --bin sensor-monitor -- monitor   # one acquisition run
//!   cargo run --bin sensor-monitor -- compare
//!   cargo run --bin sensor-monitor -- pump
//!   cargo run --bin sensor-monitor -- reset

use clap::{Parser, Subcommand};
use gpio_sensor_bridge::config::{self, Config};
use gpio_sensor_bridge::error::Result;
use gpio_sensor_bridge::monitor::{Device, MonitorSettings, monitor_all};
use gpio_sensor_bridge::outputs::reset_outputs;
use gpio_sensor_bridge::similarity::compare_files;
use gpio_sensor_bridge::transport::{CommandClient, reference_path, save_reference_payload};
use log::{error, info, warn};
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Parser)]
#[command(name = "sensor-monitor")]
#[command(about = "Monitor GPIO sensor attributes and compare them with device reference data")]
struct Cli {
    /// JSON configuration file (environment variables still override it)
    #[arg(long, env = "SENSOR_BRIDGE_CONFIG")]
    config: Option<PathBuf>,

    /// Device command address, overriding the configuration
    #[arg(long)]
    server: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Clone, Copy)]
enum Commands {
    /// Start acquisition on the device and monitor every sensor
    Monitor,
    /// Fetch reference data from the device and score each sensor log
    Compare,
    /// Fire the pump toggle and print its state
    Pump,
    /// Delete logs and received reference files
    Reset,
}

fn init_logger() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();
}

/// Host state kept across menu commands; device histories persist between runs.
struct Host {
    config: Config,
    client: CommandClient,
    devices: Vec<Device>,
}

impl Host {
    async fn new(config: Config) -> Result<Self> {
        let client = CommandClient::from_config(&config.transport).await?;
        let devices = Device::all_from_config(&config);
        Ok(Self {
            config,
            client,
            devices,
        })
    }

    async fn run(&mut self, command: Commands) -> Result<()> {
        match command {
            Commands::Monitor => self.acquire().await,
            Commands::Compare => self.compare().await,
            Commands::Pump => self.pump().await,
            Commands::Reset => {
                reset_outputs(&self.config.output_files());
                Ok(())
            }
        }
    }

    async fn acquire(&mut self) -> Result<()> {
        reset_outputs(&self.config.output_files());
        self.client.start_acquisition().await?;

        let settings = MonitorSettings::from_config(&self.config);
        info!(
            "Monitoring {} devices for {} ms",
            self.devices.len(),
            settings.duration.as_millis()
        );

        let mut devices = std::mem::take(&mut self.devices);
        let (devices, reports) = tokio::task::spawn_blocking(move || {
            let reports = monitor_all(&mut devices, &settings);
            (devices, reports)
        })
        .await
        .map_err(std::io::Error::other)?;
        self.devices = devices;

        for report in &reports {
            info!(
                "{}: {} changes over {} iterations (started {})",
                report.sensor_name,
                report.changes,
                report.iterations,
                report.started_at.format("%H:%M:%S")
            );
        }
        info!("Monitoring complete. Logs updated.");
        Ok(())
    }

    async fn compare(&self) -> Result<()> {
        let data = self.client.request_reference_data().await?;
        let dir = &self.config.monitor.output_dir;

        for (index, payload) in data.payloads.iter().enumerate() {
            if let Err(e) = save_reference_payload(dir, index, payload) {
                warn!("Failed to save reference payload {}: {}", index + 1, e);
            }
        }

        for (index, device) in self.devices.iter().enumerate() {
            let result = compare_files(device.log_path(), &reference_path(dir, index));
            println!(
                "Similarity percentage for {}: {:.2}% ({}/{} lines)",
                device.log_path().display(),
                result.percentage,
                result.matches,
                result.reference_lines
            );
        }
        Ok(())
    }

    async fn pump(&self) -> Result<()> {
        let state = self.client.pump_status().await?;
        println!("Pump state: {}", state);
        Ok(())
    }
}

fn menu_command(input: &str) -> Option<Commands> {
    match input.trim() {
        "1" => Some(Commands::Monitor),
        "2" => Some(Commands::Compare),
        "3" => Some(Commands::Pump),
        _ => None,
    }
}

async fn run_menu(host: &mut Host) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        println!("- press 1 to start acquisition and monitor the sensors");
        println!("- press 2 to compare received data");
        println!("- press 3 to read the PUMP state");
        println!("- press any other key to exit...");

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let Some(command) = menu_command(&line) else {
            println!("Exiting...");
            break;
        };
        if let Err(e) = host.run(command).await {
            error!("Command failed: {}", e);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    config::load_dotenv();
    init_logger();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::from_env(),
    };
    if let Some(server) = cli.server {
        config.transport.server_addr = server;
    }
    config.validate()?;

    info!("Device server: {}", config.transport.server_addr);
    info!("Output directory: {}", config.monitor.output_dir.display());

    let mut host = Host::new(config).await?;
    match cli.command {
        Some(command) => host.run(command).await?,
        None => run_menu(&mut host).await?,
    }
    Ok(())
}
