//! Motion Board Firmware — Main Entry Point
//!
//! Hexagonal architecture driven by a cooperative, period-based scheduler.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  HardwareAdapter   UartLink       NvsAdapter   Esp32Time       │
//! │  (Motor+IMU+Init)  (SerialPort)   (Config+Cal) (SystemPort)    │
//! │  LogEventSink                                                  │
//! │  (EventSink)                                                   │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │           ControllerService (pure logic)               │    │
//! │  │  Scheduler · CommandEngine · Odometry · Safety         │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  Encoder ISRs ──▶ ENCODERS (critical-section counters)         │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use std::time::Duration;

use anyhow::{anyhow, Result};
use log::{info, warn};

use motionboard::adapters::hardware::{build_motor_bank, HardwareAdapter, NoImu};
use motionboard::adapters::log_sink::LogEventSink;
use motionboard::adapters::nvs::NvsAdapter;
use motionboard::adapters::serial::UartLink;
use motionboard::adapters::time::Esp32TimeAdapter;
use motionboard::app::ports::{ConfigPort, SystemPort};
use motionboard::app::service::ControllerService;
use motionboard::config::ControllerConfig;
use motionboard::drivers::watchdog::{Watchdog, LOOP_STALL_TIMEOUT_MS};
use motionboard::sensors::encoder::ENCODERS;

/// Yield between loop passes so the idle task can run.
const LOOP_YIELD_MS: u64 = 1;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    #[cfg(target_os = "espidf")]
    {
        esp_idf_svc::sys::link_patches();
        esp_idf_logger::init()?;
    }

    info!("╔══════════════════════════════════════╗");
    info!("║  Motion Board v{}                  ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    let watchdog = Watchdog::new(LOOP_STALL_TIMEOUT_MS);

    // ── 2. Load config from NVS (or defaults) ─────────────────
    let mut nvs = NvsAdapter::new().map_err(|e| anyhow!("NVS init failed: {}", e))?;
    let config = match nvs.load() {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!("NVS config load failed ({}), using defaults", e);
            ControllerConfig::default()
        }
    };

    // ── 3. Construct adapters ─────────────────────────────────
    let sys = Esp32TimeAdapter::new();
    let mut hw = HardwareAdapter::new(build_motor_bank(&config), None::<NoImu>);
    let mut link = UartLink::new().map_err(|e| anyhow!("bridge link: {}", e))?;
    let mut sink = LogEventSink::new();

    // ── 4. Construct and boot the controller ──────────────────
    let mut controller = ControllerService::new(config, &ENCODERS, sys.now_ms());
    controller.boot(sys.now_ms(), &mut hw, &mut nvs, &mut sink);

    info!("System ready. Entering control loop.");

    // ── 5. Control loop ───────────────────────────────────────
    loop {
        controller.run_once(&sys, &mut hw, &mut link, &mut nvs, &mut sink);
        watchdog.feed();
        std::thread::sleep(Duration::from_millis(LOOP_YIELD_MS));
    }
}
