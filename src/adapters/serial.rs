//! UART link to the bridge board.
//!
//! Implements [`SerialPort`] over UART1 at 115200 8N1.  Reads never block:
//! the communication task pulls whatever the driver's RX ring holds.
//!
//! On non-espidf targets, an in-memory backend stands in: tests push bytes
//! into `rx` and inspect the lines written to `sent`.

#[cfg(not(target_os = "espidf"))]
use std::collections::VecDeque;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;
use log::info;

use crate::app::ports::SerialPort;
use crate::drivers::hw_init::HwInitError;

/// RX/TX ring buffer size handed to the UART driver.
pub const UART_BUFFER_LEN: i32 = 512;

pub struct UartLink {
    #[cfg(target_os = "espidf")]
    port: uart_port_t,
    #[cfg(not(target_os = "espidf"))]
    rx: VecDeque<u8>,
    #[cfg(not(target_os = "espidf"))]
    sent: Vec<String>,
}

impl UartLink {
    /// Install the UART driver on the bridge port.
    #[cfg(target_os = "espidf")]
    pub fn new() -> Result<Self, HwInitError> {
        use crate::pins;

        let port = pins::BRIDGE_UART_PORT;
        let cfg = uart_config_t {
            baud_rate: pins::BRIDGE_UART_BAUD,
            data_bits: uart_word_length_t_UART_DATA_8_BITS,
            parity: uart_parity_t_UART_PARITY_DISABLE,
            stop_bits: uart_stop_bits_t_UART_STOP_BITS_1,
            flow_ctrl: uart_hw_flowcontrol_t_UART_HW_FLOWCTRL_DISABLE,
            ..Default::default()
        };
        // SAFETY: one-time driver install from the main task; the port
        // number and pins come from the board map.
        unsafe {
            let ret = uart_driver_install(
                port,
                UART_BUFFER_LEN * 2,
                UART_BUFFER_LEN * 2,
                0,
                core::ptr::null_mut(),
                0,
            );
            if ret != ESP_OK {
                return Err(HwInitError::UartInitFailed(ret));
            }
            let ret = uart_param_config(port, &cfg);
            if ret != ESP_OK {
                return Err(HwInitError::UartInitFailed(ret));
            }
            let ret = uart_set_pin(
                port,
                pins::BRIDGE_UART_TX_GPIO,
                pins::BRIDGE_UART_RX_GPIO,
                UART_PIN_NO_CHANGE,
                UART_PIN_NO_CHANGE,
            );
            if ret != ESP_OK {
                return Err(HwInitError::UartInitFailed(ret));
            }
        }
        info!("Serial: UART{} up at {} baud", port, pins::BRIDGE_UART_BAUD);
        Ok(Self { port })
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new() -> Result<Self, HwInitError> {
        info!("Serial(sim): in-memory link");
        Ok(Self {
            rx: VecDeque::new(),
            sent: Vec::new(),
        })
    }

    /// Queue bytes as if they had arrived from the bridge.
    #[cfg(not(target_os = "espidf"))]
    pub fn inject(&mut self, bytes: &[u8]) {
        self.rx.extend(bytes);
    }

    /// Drain the lines written so far.
    #[cfg(not(target_os = "espidf"))]
    pub fn take_sent(&mut self) -> Vec<String> {
        core::mem::take(&mut self.sent)
    }
}

impl SerialPort for UartLink {
    #[cfg(target_os = "espidf")]
    fn read_byte(&mut self) -> Option<u8> {
        let mut byte = 0u8;
        // SAFETY: driver installed in new(); zero-tick timeout never blocks.
        let n = unsafe { uart_read_bytes(self.port, (&raw mut byte).cast(), 1, 0) };
        (n == 1).then_some(byte)
    }

    #[cfg(not(target_os = "espidf"))]
    fn read_byte(&mut self) -> Option<u8> {
        self.rx.pop_front()
    }

    #[cfg(target_os = "espidf")]
    fn write_line(&mut self, line: &str) {
        // SAFETY: driver installed in new(); the TX ring copies the bytes.
        unsafe {
            uart_write_bytes(self.port, line.as_ptr().cast(), line.len());
            uart_write_bytes(self.port, b"\n".as_ptr().cast(), 1);
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn write_line(&mut self, line: &str) {
        self.sent.push(line.to_string());
    }
}

#[cfg(all(test, not(target_os = "espidf")))]
mod tests {
    use super::*;

    #[test]
    fn sim_link_round_trips_bytes_and_lines() {
        let mut link = UartLink::new().unwrap();
        link.inject(b"OK");
        assert_eq!(link.read_byte(), Some(b'O'));
        assert_eq!(link.read_byte(), Some(b'K'));
        assert_eq!(link.read_byte(), None);

        link.write_line("PING");
        assert_eq!(link.take_sent(), vec!["PING"]);
        assert!(link.take_sent().is_empty());
    }
}
