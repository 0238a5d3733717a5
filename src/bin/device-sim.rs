//! Simulated sensor device.
//!
//! Runs the device-side pipeline for every configured sensor on scripted
//! lines, mirrors each attribute store into `<attribute_root>/<sensor>/`, and
//! answers the host's command protocol.
//!
//! Usage:
//!   cargo run --bin device-sim -- --listen 127.0.0.1:50007 --attribute-root sim-attributes
//!
//! Point the host at it with `DEVICE_SERVER_ADDR=127.0.0.1:50007` and
//! `ATTRIBUTE_ROOT=sim-attributes`.

use clap::Parser;
use gpio_sensor_bridge::config::{self, Config};
use gpio_sensor_bridge::sensors::{
    AttributeExport, AttributeStore, EdgeOutcome, SamplingEngine, ScriptedLine, SimulatedLine,
    ToggleController,
};
use gpio_sensor_bridge::transport::protocol::{ACQUISITION_ACCEPTED, REFERENCE_PAYLOADS};
use gpio_sensor_bridge::transport::{Command, CommandHandler, serve};
use log::{debug, info, warn};
use parking_lot::Mutex;
use rand::Rng;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tokio::net::UdpSocket;

/// Interval between attribute file syncs.
const SYNC_INTERVAL: Duration = Duration::from_millis(20);

#[derive(Parser)]
#[command(name = "device-sim")]
#[command(about = "Simulated GPIO sensor device answering the bridge command protocol")]
struct Cli {
    /// Address to answer commands on
    #[arg(long, env = "DEVICE_SERVER_ADDR", default_value = "127.0.0.1:50007")]
    listen: String,

    /// Directory receiving the exported sensor attributes
    #[arg(long, env = "ATTRIBUTE_ROOT")]
    attribute_root: Option<PathBuf>,
}

struct SimSensor {
    name: String,
    line: Arc<ScriptedLine>,
    engine: SamplingEngine,
    export: AttributeExport,
    emitted: Mutex<Vec<u8>>,
}

struct SimDevice {
    sensors: Vec<Arc<SimSensor>>,
    pump: ToggleController,
    acquiring: Arc<AtomicBool>,
    duration: Duration,
    edge_spacing: Duration,
}

impl SimDevice {
    fn start_acquisition(&self) -> Vec<u8> {
        if self.acquiring.swap(true, Ordering::SeqCst) {
            warn!("Acquisition already running");
            return b"0".to_vec();
        }
        info!("Starting acquisition for {} ms", self.duration.as_millis());

        let tasks: Vec<_> = self
            .sensors
            .iter()
            .map(|sensor| {
                sensor.emitted.lock().clear();
                tokio::spawn(emit_values(sensor.clone(), self.duration, self.edge_spacing))
            })
            .collect();

        let acquiring = self.acquiring.clone();
        tokio::spawn(async move {
            for task in tasks {
                if let Err(e) = task.await {
                    warn!("Acquisition task failed: {}", e);
                }
            }
            acquiring.store(false, Ordering::SeqCst);
            info!("Acquisition finished");
        });

        ACQUISITION_ACCEPTED.as_bytes().to_vec()
    }

    fn reference_payloads(&self) -> Vec<Vec<u8>> {
        let mut replies = vec![b"ok".to_vec()];
        replies.extend((0..REFERENCE_PAYLOADS).map(|i| {
            self.sensors
                .get(i)
                .map(|sensor| sensor.emitted.lock().clone())
                .unwrap_or_default()
        }));
        replies
    }
}

impl CommandHandler for SimDevice {
    fn handle(&self, command: Command) -> Vec<Vec<u8>> {
        info!("Command: {}", command);
        match command {
            Command::StartAcquisition => vec![self.start_acquisition()],
            Command::RequestData => self.reference_payloads(),
            Command::PumpStatus => {
                if self.pump.on_edge().is_none() {
                    debug!("Pump edge debounced");
                }
                let state = if self.pump.get() { b"1" } else { b"0" };
                vec![state.to_vec(), state.to_vec()]
            }
        }
    }
}

/// Encode random values on one sensor line for `duration`.
async fn emit_values(sensor: Arc<SimSensor>, duration: Duration, spacing: Duration) {
    let start = Instant::now();
    while start.elapsed() < duration {
        let value: u8 = rand::thread_rng().gen_range(0..16);
        sensor.line.push_value(value);

        match sensor.engine.on_edge() {
            EdgeOutcome::Queued => {
                debug!("[{}] emitting {}", sensor.name, value);
                sensor.emitted.lock().push(value);
            }
            outcome => {
                debug!("[{}] edge not sampled: {:?}", sensor.name, outcome);
                sensor.line.clear();
            }
        }
        tokio::time::sleep(spacing).await;
    }
}

async fn sync_exports(sensors: Vec<Arc<SimSensor>>) {
    let mut interval = tokio::time::interval(SYNC_INTERVAL);
    loop {
        interval.tick().await;
        for sensor in &sensors {
            if let Err(e) = sensor.export.sync() {
                warn!("[{}] attribute sync failed: {}", sensor.name, e);
            }
        }
    }
}

fn init_logger() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    config::load_dotenv();
    init_logger();

    let cli = Cli::parse();
    let mut config = Config::from_env();
    if let Some(root) = cli.attribute_root {
        config.simulator.attribute_root = root;
    }
    config.validate()?;

    let mut sensors = Vec::with_capacity(config.devices.len());
    for device in &config.devices {
        let line = Arc::new(ScriptedLine::new());
        let store = Arc::new(AttributeStore::new());
        let engine = SamplingEngine::from_config(
            &device.sensor_name,
            line.clone(),
            store.clone(),
            &config.sampling,
        );
        let dir = config
            .simulator
            .attribute_root
            .join(device.sensor_name.to_lowercase());
        let export = AttributeExport::create(&dir, store)?;
        info!("{} attributes exported to {}", device.sensor_name, dir.display());

        sensors.push(Arc::new(SimSensor {
            name: device.sensor_name.clone(),
            line,
            engine,
            export,
            emitted: Mutex::new(Vec::new()),
        }));
    }

    let pump_line = Arc::new(SimulatedLine::new(false));
    let pump = ToggleController::from_config("Pump", pump_line, &config.toggle);

    tokio::spawn(sync_exports(sensors.clone()));

    let device = Arc::new(SimDevice {
        sensors,
        pump,
        acquiring: Arc::new(AtomicBool::new(false)),
        duration: config.monitor_duration(),
        edge_spacing: Duration::from_millis(config.simulator.edge_spacing_ms),
    });

    let socket = UdpSocket::bind(&cli.listen).await?;
    info!("Device simulator listening on {}", socket.local_addr()?);

    tokio::select! {
        _ = serve(socket, device) => {
            warn!("Command server stopped");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down...");
        }
    }
    Ok(())
}
