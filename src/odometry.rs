//! Encoder → odometry engine.
//!
//! Drains the encoder bank on its own minimum period and turns the four
//! pulse counts into a differential-drive delta.  The delta is transient:
//! it is serialised into an `ODOM` line and dropped.  Pose integration
//! happens upstream.
//!
//! Wheel layout (zero-based): 0 = front left, 1 = front right,
//! 2 = rear left, 3 = rear right.

use serde::Serialize;

use crate::config::ControllerConfig;
use crate::motors::WHEEL_COUNT;
use crate::sensors::encoder::EncoderBank;

/// One odometry cycle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OdometryDelta {
    /// Timestamp of the drain (ms since boot).
    pub t: u32,
    /// Interval covered by the counts (ms).
    pub dt: u32,
    /// Raw pulse counts, wheel order.
    pub c: [i32; WHEEL_COUNT],
    #[serde(rename = "distL")]
    pub dist_l: f32,
    #[serde(rename = "distR")]
    pub dist_r: f32,
    #[serde(rename = "vL")]
    pub v_l: f32,
    #[serde(rename = "vR")]
    pub v_r: f32,
}

/// Pure arithmetic: counts over `interval_ms` → distances and velocities.
///
/// Left side averages wheels 0 and 2, right side wheels 1 and 3.  A zero
/// interval reports zero velocity.
pub fn compute(
    t: u32,
    counts: [i32; WHEEL_COUNT],
    interval_ms: u32,
    distance_per_pulse: f32,
) -> OdometryDelta {
    let dist_l = (counts[0] as f32 + counts[2] as f32) * 0.5 * distance_per_pulse;
    let dist_r = (counts[1] as f32 + counts[3] as f32) * 0.5 * distance_per_pulse;

    let (v_l, v_r) = if interval_ms == 0 {
        (0.0, 0.0)
    } else {
        let secs = interval_ms as f32 / 1000.0;
        (dist_l / secs, dist_r / secs)
    };

    OdometryDelta {
        t,
        dt: interval_ms,
        c: counts,
        dist_l,
        dist_r,
        v_l,
        v_r,
    }
}

/// Runs [`compute`] on the encoder bank whenever its period has elapsed.
pub struct OdometryEngine {
    period_ms: u32,
    distance_per_pulse: f32,
    last_run_ms: u32,
}

impl OdometryEngine {
    pub fn new(config: &ControllerConfig, now_ms: u32) -> Self {
        Self {
            period_ms: config.odometry_period_ms,
            distance_per_pulse: config.distance_per_pulse(),
            last_run_ms: now_ms,
        }
    }

    /// Whether a cycle is due at `now_ms` (wraparound-safe).
    pub fn is_due(&self, now_ms: u32) -> bool {
        now_ms.wrapping_sub(self.last_run_ms) >= self.period_ms
    }

    /// Drain and compute if due; otherwise leave the counters alone.
    pub fn poll(&mut self, now_ms: u32, encoders: &EncoderBank) -> Option<OdometryDelta> {
        if !self.is_due(now_ms) {
            return None;
        }
        let interval = now_ms.wrapping_sub(self.last_run_ms);
        self.last_run_ms = now_ms;
        let counts = encoders.drain_and_reset();
        Some(compute(now_ms, counts, interval, self.distance_per_pulse))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const K: f32 = 0.024_275;

    #[test]
    fn arithmetic_matches_geometry() {
        let d = compute(1000, [100, 80, 100, 80], 200, K);
        assert!((d.dist_l - 100.0 * K).abs() < 1e-6);
        assert!((d.dist_r - 80.0 * K).abs() < 1e-6);
        assert!((d.v_l - 100.0 * K / 0.2).abs() < 1e-4);
        assert!((d.v_r - 80.0 * K / 0.2).abs() < 1e-4);
        assert_eq!(d.dt, 200);
        assert_eq!(d.c, [100, 80, 100, 80]);
    }

    #[test]
    fn zero_interval_reports_zero_velocity() {
        let d = compute(0, [10, 10, 10, 10], 0, K);
        assert!(d.dist_l > 0.0);
        assert_eq!(d.v_l, 0.0);
        assert_eq!(d.v_r, 0.0);
    }

    #[test]
    fn opposite_sides_cancel_when_spinning() {
        let d = compute(0, [-50, 50, -50, 50], 100, K);
        assert!((d.dist_l + d.dist_r).abs() < 1e-6);
    }

    #[test]
    fn engine_runs_only_when_due() {
        let bank = EncoderBank::new();
        let config = ControllerConfig::default();
        let mut engine = OdometryEngine::new(&config, 0);

        for _ in 0..12 {
            bank.on_edge(0, true);
        }
        assert!(engine.poll(199, &bank).is_none());
        // Counters untouched by a poll that was not due.
        assert_eq!(bank.count(0), 12);

        let d = engine.poll(200, &bank).unwrap();
        assert_eq!(d.c[0], 12);
        assert_eq!(d.dt, 200);
        assert_eq!(bank.count(0), 0);

        assert!(engine.poll(250, &bank).is_none());
        let d = engine.poll(430, &bank).unwrap();
        assert_eq!(d.dt, 230);
        assert_eq!(d.c, [0; WHEEL_COUNT]);
    }

    #[test]
    fn engine_survives_clock_wrap() {
        let bank = EncoderBank::new();
        let config = ControllerConfig::default();
        let mut engine = OdometryEngine::new(&config, u32::MAX - 50);
        assert!(!engine.is_due(100));
        let d = engine.poll(150, &bank).unwrap();
        assert_eq!(d.dt, 201);
    }

    #[test]
    fn serialises_with_wire_field_names() {
        let d = compute(5, [1, 2, 3, 4], 200, 1.0);
        let json = serde_json::to_string(&d).unwrap();
        assert!(json.contains("\"distL\":2.0"));
        assert!(json.contains("\"c\":[1,2,3,4]"));
        assert!(json.contains("\"vR\":15.0"));
    }
}
