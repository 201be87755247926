//! GPIO / peripheral pin assignments for the motion board (ESP32-S3).
//!
//! Single source of truth — every driver references this module rather than
//! hard-coding pin numbers.  Change a pin here and it propagates everywhere.
//!
//! Wheel order everywhere: 1 = front left, 2 = front right, 3 = rear left,
//! 4 = rear right.

use crate::motors::WHEEL_COUNT;

// ---------------------------------------------------------------------------
// Front axle: TB6612FNG dual driver (wheels 1 and 2)
// ---------------------------------------------------------------------------

/// PWMA: wheel 1 speed (LEDC channel 0).
pub const M1_PWM_GPIO: i32 = 4;
pub const M1_IN1_GPIO: i32 = 5;
pub const M1_IN2_GPIO: i32 = 6;

/// PWMB: wheel 2 speed (LEDC channel 1).
pub const M2_PWM_GPIO: i32 = 7;
pub const M2_IN1_GPIO: i32 = 15;
pub const M2_IN2_GPIO: i32 = 16;

/// TB6612 STBY.  LOW puts the whole front stage in standby.
pub const STBY_GPIO: i32 = 8;

// ---------------------------------------------------------------------------
// Rear axle: L298N dual driver (wheels 3 and 4)
// ---------------------------------------------------------------------------

/// ENA: wheel 3 speed (LEDC channel 2).
pub const M3_EN_GPIO: i32 = 9;
pub const M3_IN1_GPIO: i32 = 10;
pub const M3_IN2_GPIO: i32 = 11;

/// ENB: wheel 4 speed (LEDC channel 3).
pub const M4_EN_GPIO: i32 = 12;
pub const M4_IN1_GPIO: i32 = 13;
pub const M4_IN2_GPIO: i32 = 14;

/// Speed pin per wheel.
pub const MOTOR_PWM_GPIOS: [i32; WHEEL_COUNT] = [M1_PWM_GPIO, M2_PWM_GPIO, M3_EN_GPIO, M4_EN_GPIO];

/// Direction pins per wheel, `(IN1, IN2)`.
pub const MOTOR_DIR_GPIOS: [(i32, i32); WHEEL_COUNT] = [
    (M1_IN1_GPIO, M1_IN2_GPIO),
    (M2_IN1_GPIO, M2_IN2_GPIO),
    (M3_IN1_GPIO, M3_IN2_GPIO),
    (M4_IN1_GPIO, M4_IN2_GPIO),
];

// ---------------------------------------------------------------------------
// Wheel encoders
// ---------------------------------------------------------------------------

/// Channel A: interrupt on rising edge.
pub const ENCODER_A_GPIOS: [i32; WHEEL_COUNT] = [1, 2, 42, 41];
/// Channel B: sampled in the ISR.  HIGH = forward.
pub const ENCODER_B_GPIOS: [i32; WHEEL_COUNT] = [40, 39, 38, 47];

// ---------------------------------------------------------------------------
// Bridge link (UART1)
// ---------------------------------------------------------------------------

pub const BRIDGE_UART_PORT: i32 = 1;
pub const BRIDGE_UART_TX_GPIO: i32 = 17;
pub const BRIDGE_UART_RX_GPIO: i32 = 18;
pub const BRIDGE_UART_BAUD: i32 = 115_200;

// ---------------------------------------------------------------------------
// PWM configuration
// ---------------------------------------------------------------------------

/// LEDC timer resolution (bits).  8-bit gives 0 – 255 duty levels.
pub const PWM_RESOLUTION_BITS: u32 = 8;
/// TB6612 PWM frequency.
pub const TB6612_PWM_FREQ_HZ: u32 = 20_000;
/// L298N PWM frequency.
pub const L298N_PWM_FREQ_HZ: u32 = 1_000;
