//! One-shot hardware peripheral initialization.
//!
//! Configures motor GPIO directions, the two LEDC timers and four PWM
//! channels, the encoder inputs and their edge interrupts, using raw
//! ESP-IDF sys calls.  Called once from `main()` before the control loop
//! starts, and again by `INIT MOTORS` / `INIT SYSTEM`.
//!
//! Also provides the `embedded-hal` pin types ([`GpioOutput`],
//! [`LedcPwm`]) that the motor layer drives.

use core::convert::Infallible;

use embedded_hal::digital::{ErrorType as PinErrorType, OutputPin};
use embedded_hal::pwm::{ErrorType as PwmErrorType, SetDutyCycle};

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use log::info;

#[cfg(target_os = "espidf")]
use crate::pins;

// ── Error type ────────────────────────────────────────────────

/// Errors during one-shot peripheral initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    GpioConfigFailed(i32),
    LedcInitFailed(i32),
    IsrInstallFailed(i32),
    UartInitFailed(i32),
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::GpioConfigFailed(rc) => write!(f, "GPIO config failed (rc={})", rc),
            Self::LedcInitFailed(rc) => write!(f, "LEDC timer/channel config failed (rc={})", rc),
            Self::IsrInstallFailed(rc) => write!(f, "GPIO ISR service install failed (rc={})", rc),
            Self::UartInitFailed(rc) => write!(f, "UART driver install failed (rc={})", rc),
        }
    }
}

impl From<HwInitError> for crate::error::Error {
    fn from(e: HwInitError) -> Self {
        match e {
            HwInitError::GpioConfigFailed(_) => Self::Init("gpio"),
            HwInitError::LedcInitFailed(_) => Self::Init("ledc"),
            HwInitError::IsrInstallFailed(_) => Self::Init("gpio isr"),
            HwInitError::UartInitFailed(_) => Self::Init("uart"),
        }
    }
}

/// LEDC channel per wheel.
pub const LEDC_CH_MOTORS: [u32; 4] = [0, 1, 2, 3];

// ── Motor outputs ─────────────────────────────────────────────

#[cfg(target_os = "espidf")]
pub fn init_motor_outputs() -> Result<(), HwInitError> {
    // SAFETY: Called from the single main task, before or between loop
    // iterations; no concurrent register access.
    unsafe {
        init_gpio_outputs()?;
        init_ledc()?;
    }
    info!("hw_init: motor outputs configured");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_motor_outputs() -> Result<(), HwInitError> {
    log::info!("hw_init(sim): motor output init skipped");
    Ok(())
}

#[cfg(target_os = "espidf")]
unsafe fn init_gpio_outputs() -> Result<(), HwInitError> {
    let mut mask = 1u64 << pins::STBY_GPIO;
    for (in1, in2) in pins::MOTOR_DIR_GPIOS {
        mask |= (1u64 << in1) | (1u64 << in2);
    }
    let cfg = gpio_config_t {
        pin_bit_mask: mask,
        mode: gpio_mode_t_GPIO_MODE_OUTPUT,
        pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
        pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
        intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
    };
    let ret = unsafe { gpio_config(&cfg) };
    if ret != ESP_OK as i32 {
        return Err(HwInitError::GpioConfigFailed(ret));
    }
    // Standby first, so the front stage is off before anything else moves.
    unsafe { gpio_set_level(pins::STBY_GPIO, 0) };
    for (in1, in2) in pins::MOTOR_DIR_GPIOS {
        unsafe {
            gpio_set_level(in1, 0);
            gpio_set_level(in2, 0);
        }
    }
    Ok(())
}

#[cfg(target_os = "espidf")]
unsafe fn init_ledc() -> Result<(), HwInitError> {
    // Timer 0: TB6612 (front), timer 1: L298N (rear).  Both 8-bit.
    let timers = [
        (ledc_timer_t_LEDC_TIMER_0, pins::TB6612_PWM_FREQ_HZ),
        (ledc_timer_t_LEDC_TIMER_1, pins::L298N_PWM_FREQ_HZ),
    ];
    for (timer_num, freq_hz) in timers {
        let cfg = ledc_timer_config_t {
            speed_mode: ledc_mode_t_LEDC_LOW_SPEED_MODE,
            timer_num,
            duty_resolution: ledc_timer_bit_t_LEDC_TIMER_8_BIT,
            freq_hz,
            clk_cfg: soc_periph_ledc_clk_src_legacy_t_LEDC_AUTO_CLK,
            ..Default::default()
        };
        let ret = unsafe { ledc_timer_config(&cfg) };
        if ret != ESP_OK as i32 {
            return Err(HwInitError::LedcInitFailed(ret));
        }
    }

    for (wheel, &gpio) in pins::MOTOR_PWM_GPIOS.iter().enumerate() {
        let timer_sel = if wheel < 2 {
            ledc_timer_t_LEDC_TIMER_0
        } else {
            ledc_timer_t_LEDC_TIMER_1
        };
        let ret = unsafe {
            ledc_channel_config(&ledc_channel_config_t {
                speed_mode: ledc_mode_t_LEDC_LOW_SPEED_MODE,
                channel: LEDC_CH_MOTORS[wheel],
                timer_sel,
                gpio_num: gpio,
                duty: 0,
                hpoint: 0,
                ..Default::default()
            })
        };
        if ret != ESP_OK as i32 {
            return Err(HwInitError::LedcInitFailed(ret));
        }
    }
    info!("hw_init: LEDC configured (front=T0 20kHz, rear=T1 1kHz)");
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn gpio_write(pin: i32, high: bool) {
    // SAFETY: gpio_set_level writes to an already-configured output pin.
    // Main-loop only.
    unsafe {
        gpio_set_level(pin, u32::from(high));
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_write(_pin: i32, _high: bool) {}

#[cfg(target_os = "espidf")]
pub fn ledc_set(channel: u32, duty: u8) {
    // SAFETY: LEDC channels were configured in init_ledc(); duty register
    // writes are race-free since only the main loop calls this function.
    unsafe {
        ledc_set_duty(ledc_mode_t_LEDC_LOW_SPEED_MODE, channel, u32::from(duty));
        ledc_update_duty(ledc_mode_t_LEDC_LOW_SPEED_MODE, channel);
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn ledc_set(_channel: u32, _duty: u8) {}

// ── embedded-hal pin types ────────────────────────────────────

/// Push-pull output on a raw GPIO number.
pub struct GpioOutput(pub i32);

impl PinErrorType for GpioOutput {
    type Error = Infallible;
}

impl OutputPin for GpioOutput {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        gpio_write(self.0, false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        gpio_write(self.0, true);
        Ok(())
    }
}

/// One 8-bit LEDC channel.
pub struct LedcPwm(pub u32);

impl PwmErrorType for LedcPwm {
    type Error = Infallible;
}

impl SetDutyCycle for LedcPwm {
    fn max_duty_cycle(&self) -> u16 {
        255
    }

    fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Self::Error> {
        ledc_set(self.0, duty.min(255) as u8);
        Ok(())
    }
}

// ── Encoder inputs + ISR service ──────────────────────────────

#[cfg(target_os = "espidf")]
unsafe extern "C" fn encoder_gpio_isr(arg: *mut core::ffi::c_void) {
    let wheel = arg as usize;
    // SAFETY: gpio_get_level is a register read; safe in ISR context.
    let forward = unsafe { gpio_get_level(pins::ENCODER_B_GPIOS[wheel]) } != 0;
    crate::sensors::encoder::encoder_isr_handler(wheel, forward);
}

/// Configure encoder inputs, install the per-pin GPIO ISR service and
/// register one handler per wheel (channel A rising edge).
#[cfg(target_os = "espidf")]
pub fn init_encoders() -> Result<(), HwInitError> {
    // SAFETY: gpio_install_isr_service is idempotent; ESP_ERR_INVALID_STATE
    // means it was already installed (acceptable).  The handler only touches
    // the atomic encoder bank.
    unsafe {
        let mut mask = 0u64;
        for (a, b) in pins::ENCODER_A_GPIOS.iter().zip(pins::ENCODER_B_GPIOS) {
            mask |= (1u64 << a) | (1u64 << b);
        }
        let cfg = gpio_config_t {
            pin_bit_mask: mask,
            mode: gpio_mode_t_GPIO_MODE_INPUT,
            pull_up_en: gpio_pullup_t_GPIO_PULLUP_ENABLE,
            pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
            intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
        };
        let ret = gpio_config(&cfg);
        if ret != ESP_OK as i32 {
            return Err(HwInitError::GpioConfigFailed(ret));
        }

        let ret = gpio_install_isr_service(0);
        if ret != ESP_OK && ret != ESP_ERR_INVALID_STATE {
            return Err(HwInitError::IsrInstallFailed(ret));
        }

        for (wheel, &pin) in pins::ENCODER_A_GPIOS.iter().enumerate() {
            gpio_set_intr_type(pin, gpio_int_type_t_GPIO_INTR_POSEDGE);
            // Re-running INIT re-registers; drop any previous handler first.
            gpio_isr_handler_remove(pin);
            gpio_isr_handler_add(pin, Some(encoder_gpio_isr), wheel as *mut core::ffi::c_void);
            gpio_intr_enable(pin);
        }

        info!("hw_init: encoder ISRs installed (4 wheels, A rising edge)");
    }
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_encoders() -> Result<(), HwInitError> {
    log::info!("hw_init(sim): encoder ISR service skipped");
    Ok(())
}
