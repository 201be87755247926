//! End-to-end tests of `ControllerService` driven through `run_once`.

use motionboard::app::events::ControllerEvent;
use motionboard::app::ports::MotorPort;
use motionboard::app::service::ControllerService;
use motionboard::config::ControllerConfig;
use motionboard::motors::WHEEL_COUNT;
use motionboard::protocol::command::Subsystem;
use motionboard::sensors::encoder::EncoderBank;

use crate::mock_hw::{MemStore, MockBoard, MockClock, MockLink, MotorCall, RecordingSink};

// ── Test rig ──────────────────────────────────────────────────

struct Rig {
    clock: MockClock,
    board: MockBoard,
    link: MockLink,
    store: MemStore,
    sink: RecordingSink,
    svc: ControllerService,
    now: u32,
}

impl Rig {
    /// Booted service at t = 0 with the default config.
    fn new(encoders: &'static EncoderBank) -> Self {
        let mut rig = Self {
            clock: MockClock::new(),
            board: MockBoard::new(),
            link: MockLink::default(),
            store: MemStore::default(),
            sink: RecordingSink::default(),
            svc: ControllerService::new(ControllerConfig::default(), encoders, 0),
            now: 0,
        };
        rig.svc
            .boot(0, &mut rig.board, &mut rig.store, &mut rig.sink);
        rig
    }

    fn step(&mut self, ms: u32) {
        self.now += ms;
        self.clock.set(self.now);
        self.svc.run_once(
            &self.clock,
            &mut self.board,
            &mut self.link,
            &mut self.store,
            &mut self.sink,
        );
    }

    fn advance_to(&mut self, until: u32) {
        while self.now < until {
            self.step(5);
        }
    }

    /// Send `text` and run one communication period.
    fn exchange(&mut self, text: &str) -> Vec<String> {
        self.link.send(text);
        self.step(10);
        self.link.take()
    }

    fn status_motors(&mut self) -> u64 {
        let out = self.exchange("{\"cmd\":\"STATUS\"}\n");
        let line = out
            .iter()
            .find(|l| l.contains("\"resp\":\"STATUS\""))
            .expect("STATUS reply");
        let v: serde_json::Value = serde_json::from_str(line).unwrap();
        v["motors"].as_u64().unwrap()
    }
}

// ── Boot ──────────────────────────────────────────────────────

#[test]
fn boot_leaves_motors_safe_and_system_ready() {
    static ENC: EncoderBank = EncoderBank::new();
    let rig = Rig::new(&ENC);

    assert!(rig.svc.context().ready);
    assert!(!rig.svc.context().motors_enabled);
    assert!(rig.board.all_stopped());
    assert_eq!(rig.board.last_call(), Some(&MotorCall::Disable));
    assert_eq!(rig.board.inits, vec![Subsystem::System]);
    assert_eq!(rig.store.saves, 1, "fresh calibration persisted");
    assert_eq!(
        rig.sink.events,
        vec![
            ControllerEvent::SubsystemInit {
                target: Subsystem::System,
                ok: true
            },
            ControllerEvent::Started { ready: true },
        ]
    );
}

#[test]
fn stored_calibration_is_reused() {
    static ENC: EncoderBank = EncoderBank::new();
    let mut first = Rig::new(&ENC);
    let stored = first.store.record.expect("calibrated at boot");

    // Second boot against the same store keeps the record.
    let mut store = MemStore {
        record: Some(stored),
        saves: 0,
    };
    let mut svc = ControllerService::new(ControllerConfig::default(), &ENC, 0);
    svc.boot(0, &mut first.board, &mut store, &mut first.sink);
    assert_eq!(store.saves, 0);
    assert_eq!(svc.context().calibration, stored);
}

// ── Motor enable and status ───────────────────────────────────

#[test]
fn motor_enable_state_visible_in_status() {
    static ENC: EncoderBank = EncoderBank::new();
    let mut rig = Rig::new(&ENC);

    let out = rig.exchange("{\"cmd\":\"M\",\"args\":[120,-120,80,-80,1]}\n");
    assert_eq!(out, vec![r#"{"resp":"ACK","type":"MOTOR"}"#]);
    assert_eq!(rig.board.commands(), [120, -120, 80, -80]);
    assert_eq!(rig.status_motors(), 1);

    rig.exchange("{\"cmd\":\"M\",\"args\":[120,120,120,120,0]}\n");
    assert!(rig.board.all_stopped());
    assert_eq!(rig.status_motors(), 0);
}

#[test]
fn arity_error_leaves_wheels_unchanged() {
    static ENC: EncoderBank = EncoderBank::new();
    let mut rig = Rig::new(&ENC);

    rig.exchange("MALL 10 20 30 40\n");
    let before = rig.board.commands();
    let calls = rig.board.calls.len();

    let out = rig.exchange("{\"cmd\":\"M\",\"args\":[1,2,3]}\n");
    assert_eq!(out, vec![r#"{"resp":"ERROR","type":"M","msg":"BAD_ARITY"}"#]);
    assert_eq!(rig.board.commands(), before);
    assert_eq!(rig.board.calls.len(), calls);
    assert_eq!(rig.svc.engine().rejected_count(), 1);
}

#[test]
fn legacy_commands_answer_in_plain_text() {
    static ENC: EncoderBank = EncoderBank::new();
    let mut rig = Rig::new(&ENC);

    assert_eq!(rig.exchange("FWD 200\n"), vec!["OK FWD"]);
    assert_eq!(rig.board.commands(), [200; WHEEL_COUNT]);
    assert_eq!(rig.exchange("M2 -60\n"), vec!["OK M2"]);
    assert_eq!(rig.board.commands()[1], -60);
    assert_eq!(rig.exchange("SET_V fast slow\n"), vec!["ERR SET_V params"]);
    assert_eq!(rig.exchange("WARP 9\n"), vec!["ERR UNKNOWN_CMD WARP"]);
    assert_eq!(rig.exchange("STOP\n"), vec!["OK STOP"]);
    assert!(rig.board.all_stopped());
}

// ── Command timeout ───────────────────────────────────────────

#[test]
fn silence_past_timeout_stops_and_disables() {
    static ENC: EncoderBank = EncoderBank::new();
    let mut rig = Rig::new(&ENC);

    rig.exchange("{\"cmd\":\"M\",\"args\":[100,100,100,100,1]}\n");
    assert_eq!(rig.now, 10);

    rig.advance_to(2000);
    assert!(rig.board.is_enabled(), "silence of 1990 ms is within limit");
    assert_eq!(rig.sink.timeouts(), 0);

    rig.advance_to(2040);
    assert!(!rig.svc.context().motors_enabled);
    assert!(rig.board.all_stopped());
    assert_eq!(rig.board.last_call(), Some(&MotorCall::Disable));
    assert_eq!(rig.sink.timeouts(), 1);
    assert_eq!(rig.svc.timeout_count(), 1);

    // Already safe: no repeat trips while the link stays quiet.
    rig.advance_to(6000);
    assert_eq!(rig.svc.timeout_count(), 1);
}

#[test]
fn rejected_lines_do_not_feed_the_timeout() {
    static ENC: EncoderBank = EncoderBank::new();
    let mut rig = Rig::new(&ENC);

    rig.exchange("MALL 50 50 50 50\n");
    rig.advance_to(1500);
    rig.exchange("{\"cmd\":\"TELEPORT\"}\n");
    rig.exchange("{not json\n");

    rig.advance_to(2040);
    assert_eq!(rig.svc.timeout_count(), 1);
    assert_eq!(rig.svc.context().last_command_ms, 10);
}

#[test]
fn steady_commands_keep_motors_running() {
    static ENC: EncoderBank = EncoderBank::new();
    let mut rig = Rig::new(&ENC);

    for _ in 0..10 {
        rig.exchange("MALL 30 30 30 30\n");
        let target = rig.now + 1000;
        rig.advance_to(target);
    }
    assert!(rig.svc.context().motors_enabled);
    assert_eq!(rig.svc.timeout_count(), 0);
}

#[test]
fn timeout_forwarded_upstream_in_debug_mode() {
    static ENC: EncoderBank = EncoderBank::new();
    let mut rig = Rig::new(&ENC);

    rig.exchange("{\"cmd\":\"DEBUG\",\"args\":\"ON\"}\n");
    rig.exchange("MALL 10 10 10 10\n");
    rig.advance_to(2100);

    let upstream = rig.link.take();
    assert!(
        upstream
            .iter()
            .any(|l| l.starts_with(r#"{"resp":"DEBUG","msg":"TIMEOUT | silent"#)),
        "got {:?}",
        upstream
    );
}

// ── Periodic output ───────────────────────────────────────────

#[test]
fn periodic_status_and_health() {
    static ENC: EncoderBank = EncoderBank::new();
    let mut rig = Rig::new(&ENC);

    rig.advance_to(5000);
    let lines = rig.link.take();
    let statuses = lines
        .iter()
        .filter(|l| l.starts_with(r#"{"resp":"STATUS""#))
        .count();
    assert_eq!(statuses, 5);
    assert!(lines
        .iter()
        .any(|l| l.contains(r#""uptime":5,"motors":0,"system":"ready","ram":150000,"mode":"manual""#)));

    let health = rig
        .sink
        .events
        .iter()
        .find_map(|e| match e {
            ControllerEvent::Health(h) => Some(h.to_string()),
            _ => None,
        })
        .expect("health report at 5 s");
    assert_eq!(health, "uptime=5s motors=OFF free=150000B");
}

#[test]
fn imu_samples_cached_by_sensor_task() {
    static ENC: EncoderBank = EncoderBank::new();
    let mut rig = Rig::new(&ENC);
    assert!(rig.svc.context().imu.is_none());

    rig.board.sample = Some(motionboard::sensors::ImuSample {
        yaw: 12.5,
        ..Default::default()
    });
    rig.advance_to(50);
    assert_eq!(rig.svc.context().imu.map(|s| s.yaw), Some(12.5));

    // A failed read keeps the last good sample.
    rig.board.sample = None;
    rig.advance_to(100);
    assert_eq!(rig.svc.context().imu.map(|s| s.yaw), Some(12.5));
}

// ── Odometry ──────────────────────────────────────────────────

#[test]
fn encoder_edges_become_odometry_lines() {
    static ENC: EncoderBank = EncoderBank::new();
    let mut rig = Rig::new(&ENC);

    for _ in 0..22 {
        ENC.on_edge(0, true);
        ENC.on_edge(2, true);
    }
    for _ in 0..11 {
        ENC.on_edge(1, false);
    }

    rig.advance_to(200);
    let lines = rig.link.take();
    let odom = lines
        .iter()
        .find(|l| l.starts_with(r#"{"resp":"ODOM""#))
        .expect("odometry line at 200 ms");
    let v: serde_json::Value = serde_json::from_str(odom).unwrap();
    assert_eq!(v["t"], 200);
    assert_eq!(v["dt"], 200);
    assert_eq!(v["c"], serde_json::json!([22, -11, 22, 0]));

    let per_pulse = ControllerConfig::default().distance_per_pulse() as f64;
    let dist_l = v["distL"].as_f64().unwrap();
    assert!((dist_l - 22.0 * per_pulse).abs() < 1e-4);
    assert!(v["vR"].as_f64().unwrap() < 0.0);

    // Counters were drained.
    assert_eq!(ENC.count(0), 0);
    assert_eq!(ENC.count(1), 0);
}

#[test]
fn odometry_never_runs_early() {
    static ENC: EncoderBank = EncoderBank::new();
    let mut rig = Rig::new(&ENC);

    ENC.on_edge(3, true);
    rig.advance_to(195);
    assert!(!rig.link.take().iter().any(|l| l.contains("ODOM")));
    assert_eq!(ENC.count(3), 1);
}

// ── Line overflow ─────────────────────────────────────────────

#[test]
fn overlong_line_is_dropped_and_stream_recovers() {
    static ENC: EncoderBank = EncoderBank::new();
    let mut rig = Rig::new(&ENC);

    // One byte past the limit: the buffer is discarded and the byte dropped.
    let junk = "X".repeat(201);
    rig.link.send(&junk);
    rig.link.send("\nPING\n");
    rig.advance_to(100);

    assert_eq!(rig.svc.engine().overflow_count(), 1);
    let replies = rig.link.take();
    assert_eq!(replies, vec![r#"{"resp":"PONG"}"#]);
}
