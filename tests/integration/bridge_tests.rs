//! Bridge status model fed with real controller output.

use motionboard::app::service::ControllerService;
use motionboard::bridge::{BridgeStatus, LINK_TIMEOUT_MS};
use motionboard::config::ControllerConfig;
use motionboard::sensors::encoder::EncoderBank;

use crate::mock_hw::{MemStore, MockBoard, MockClock, MockLink, RecordingSink};

/// Forward `command` through the bridge to a live controller and fold the
/// controller's replies back into the bridge.
struct Loopback {
    clock: MockClock,
    board: MockBoard,
    link: MockLink,
    store: MemStore,
    sink: RecordingSink,
    svc: ControllerService,
    bridge: BridgeStatus,
    now: u32,
}

impl Loopback {
    fn new(encoders: &'static EncoderBank) -> Self {
        let mut lb = Self {
            clock: MockClock::new(),
            board: MockBoard::new(),
            link: MockLink::default(),
            store: MemStore::default(),
            sink: RecordingSink::default(),
            svc: ControllerService::new(ControllerConfig::default(), encoders, 0),
            bridge: BridgeStatus::new(),
            now: 0,
        };
        lb.svc.boot(0, &mut lb.board, &mut lb.store, &mut lb.sink);
        lb
    }

    fn forward(&mut self, command: &str) {
        self.bridge.on_command_forwarded(command);
        self.link.send(command);
        self.link.send("\n");
        self.run_for(10);
    }

    fn run_for(&mut self, ms: u32) {
        let until = self.now + ms;
        while self.now < until {
            self.now += 5;
            self.clock.set(self.now);
            self.svc.run_once(
                &self.clock,
                &mut self.board,
                &mut self.link,
                &mut self.store,
                &mut self.sink,
            );
            let mut bytes = Vec::new();
            for line in self.link.take() {
                bytes.extend_from_slice(line.as_bytes());
                bytes.push(b'\n');
            }
            self.bridge.on_bytes(&bytes, self.now);
        }
    }
}

#[test]
fn bridge_tracks_controller_state() {
    static ENC: EncoderBank = EncoderBank::new();
    let mut lb = Loopback::new(&ENC);

    lb.forward("FWD 180");
    let snap = lb.bridge.snapshot(lb.now);
    assert!(snap.connected);
    assert_eq!(snap.current_speed, 180);

    lb.forward("DISABLE");
    assert!(!lb.bridge.snapshot(lb.now).motors_enabled);

    lb.forward("{\"cmd\":\"ENABLE\"}");
    assert!(lb.bridge.snapshot(lb.now).motors_enabled);

    lb.forward("STOP");
    assert_eq!(lb.bridge.snapshot(lb.now).current_speed, 0);
}

#[test]
fn bridge_keeps_latest_odometry_verbatim() {
    static ENC: EncoderBank = EncoderBank::new();
    let mut lb = Loopback::new(&ENC);

    ENC.on_edge(0, true);
    lb.run_for(200);
    let snap = lb.bridge.snapshot(lb.now);
    assert!(snap.odometry.starts_with(r#"{"resp":"ODOM","t":200"#));
    assert!(snap.odometry.contains(r#""c":[1,0,0,0]"#));
}

#[test]
fn status_lines_refresh_enable_flag() {
    static ENC: EncoderBank = EncoderBank::new();
    let mut lb = Loopback::new(&ENC);

    // Assumed on until the first STATUS says otherwise.
    assert!(lb.bridge.snapshot(0).motors_enabled);
    lb.run_for(1000);
    assert!(!lb.bridge.snapshot(lb.now).motors_enabled);
}

#[test]
fn silent_robot_marks_bridge_disconnected() {
    static ENC: EncoderBank = EncoderBank::new();
    let mut lb = Loopback::new(&ENC);

    lb.forward("PING");
    let last = lb.bridge.snapshot(lb.now).last_response;
    assert!(lb.bridge.snapshot(lb.now).connected);

    lb.bridge.tick(last + LINK_TIMEOUT_MS);
    assert!(lb.bridge.snapshot(last + LINK_TIMEOUT_MS).connected);
    lb.bridge.tick(last + LINK_TIMEOUT_MS + 1);
    let json = lb.bridge.status_json(last + LINK_TIMEOUT_MS + 1);
    assert!(json.starts_with(r#"{"connected":false,"#), "got {}", json);
}
