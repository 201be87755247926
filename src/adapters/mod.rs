//! Adapters — concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements        | Connects to                  |
//! |------------|-------------------|------------------------------|
//! | `hardware` | MotorPort         | LEDC PWM + GPIO, H-bridges   |
//! |            | ImuPort           | IMU collaborator (optional)  |
//! |            | SubsystemInit     | hw_init routines             |
//! | `log_sink` | EventSink         | Serial log output            |
//! | `nvs`      | ConfigPort        | NVS / in-memory store        |
//! |            | CalibrationStore  |                              |
//! | `serial`   | SerialPort        | UART1 to the bridge board    |
//! | `time`     | SystemPort        | ESP32 system timer, heap     |

pub mod hardware;
pub mod log_sink;
pub mod nvs;
pub mod serial;
pub mod time;
