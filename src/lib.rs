//! This Rust `embedded-hal`-based library drives a 16x2 [HD44780](https://en.wikipedia.org/wiki/Hitachi_HD44780_LCD_controller)
//! compatible character display (commonly sold as "LCD1602") through a PCF8574 or PCF8574A "I2C backpack" in an embedded, `no_std`
//! environment.
//!
//! The backpack exposes eight GPIO lines through a single I2C register. Four of them carry the HD44780 data nibble, the others
//! drive the register select, enable and backlight pins. The driver emulates the parallel 4-bit interface by writing that register
//! once per pin change, strobing the enable line to latch each nibble. Timing is open loop; the busy flag is never read.
//!
//! Key features include:
//! - Automatic detection of the backpack I2C address
//! - Positioned string and number output with wrap from the first to the second row
//! - Backlight control
//! - `core::fmt::Write` implementation for easy use with the `write!` macro
//! - Compatible with the `embedded-hal` traits v1.0 and later
//! - Optional support for the `defmt` and `ufmt` logging frameworks
//!
//! ## Usage
//! Add this to your `Cargo.toml`:
//! ```toml
//! [dependencies]
//! lcd1602-backpack = { version = "0.1", features = ["defmt"] }
//! ```
//! The `features = ["defmt"]` line is optional and enables the `defmt` feature, which allows the library's types to be used with
//! the `defmt` logging framework and emits debug logs during initialization and address probing. Another optional feature is
//! `features = ["ufmt"]`, which enables the `uwriteln!` and `uwrite!` macros to be used.
//!
//! Create the display and either initialize it at a known address or let it find the backpack:
//! ```rust
//! use lcd1602_backpack::{Lcd1602, ProbeResult};
//!
//! let i2c = ...; // I2C peripheral
//! let delay = ...; // DelayNs implementation
//!
//! let mut lcd = Lcd1602::new(i2c, delay);
//! match lcd.auto_detect_address()? {
//!     ProbeResult::Found(_) => {}
//!     // fall back to a known address
//!     ProbeResult::DeviceNotFound => {
//!         lcd.set_address(0x27)?;
//!     }
//! }
//! ```
//! Use the display:
//! ```rust
//! lcd.set_backlight(true)?.clear()?;
//! lcd.put_string("Hello, world!", 0, 0)?.put_number(42, 0, 1)?;
//! // can also use the `core::fmt::write!` macro at the current cursor position
//! use core::fmt::Write;
//!
//! write!(lcd, "Hello, world!")?;
//! ```
//! The display is a plain value that owns the bus. It is not reentrant; if it must be used from more than one execution
//! context, wrap the whole `Lcd1602` in a single mutex.
//!
#![no_std]
#![allow(non_upper_case_globals)]
use core::fmt::{Debug, Display, Write};

use embedded_hal::{delay::DelayNs, i2c};

mod bit_configurations;
mod driver;
pub mod layout;
pub mod probe;

pub use layout::compute_address;
pub use probe::{probe_address, ProbeResult};

/// I2C address used until one is set or detected. The usual address of PCF8574A backpacks.
pub const DEFAULT_I2C_ADDRESS: u8 = 0x3F;

/// Errors that can occur when using the LCD backpack
pub enum LcdError<I2C>
where
    I2C: i2c::I2c,
{
    /// I2C error returned from the underlying I2C implementation
    I2cError(I2C::Error),
    /// Formatting error
    FormattingError(core::fmt::Error),
}

impl<I2C> From<core::fmt::Error> for LcdError<I2C>
where
    I2C: i2c::I2c,
{
    fn from(err: core::fmt::Error) -> Self {
        LcdError::FormattingError(err)
    }
}

impl<I2C> From<&LcdError<I2C>> for &'static str
where
    I2C: i2c::I2c,
{
    fn from(err: &LcdError<I2C>) -> Self {
        match err {
            LcdError::I2cError(_) => "I2C error",
            LcdError::FormattingError(_) => "Formatting error",
        }
    }
}

impl<I2C> Debug for LcdError<I2C>
where
    I2C: i2c::I2c,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            LcdError::I2cError(e) => f.debug_tuple("I2cError").field(e).finish(),
            LcdError::FormattingError(e) => f.debug_tuple("FormattingError").field(e).finish(),
        }
    }
}

impl<I2C> PartialEq for LcdError<I2C>
where
    I2C: i2c::I2c,
    I2C::Error: PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (LcdError::I2cError(a), LcdError::I2cError(b)) => a == b,
            (LcdError::FormattingError(a), LcdError::FormattingError(b)) => a == b,
            _ => false,
        }
    }
}

#[cfg(feature = "defmt")]
impl<I2C> defmt::Format for LcdError<I2C>
where
    I2C: i2c::I2c,
{
    fn format(&self, fmt: defmt::Formatter) {
        let msg: &'static str = From::from(self);
        defmt::write!(fmt, "{}", msg);
    }
}

#[cfg(feature = "ufmt")]
impl<I2C> ufmt::uDisplay for LcdError<I2C>
where
    I2C: i2c::I2c,
{
    fn fmt<W>(&self, w: &mut ufmt::Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: ufmt::uWrite + ?Sized,
    {
        let msg: &'static str = From::from(self);
        ufmt::uwrite!(w, "{}", msg)
    }
}

impl<I2C> Display for LcdError<I2C>
where
    I2C: i2c::I2c,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let msg: &'static str = From::from(self);
        write!(f, "{}", msg)
    }
}

/// Settle times applied by the driver. The defaults are slow but work with every
/// backpack and controller clone tried so far.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Timing {
    /// Pause after every write to the backpack register, in microseconds. Covers the
    /// enable pulse width and the execution time of the slowest command (clear display).
    pub register_settle_us: u32,
    /// Pause between the steps of the 4-bit reset sequence, in milliseconds.
    pub reset_settle_ms: u32,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            register_settle_us: 1000,
            reset_settle_ms: 5,
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Timing {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(
            fmt,
            "Timing {{ register_settle_us: {}, reset_settle_ms: {} }}",
            self.register_settle_us,
            self.reset_settle_ms
        );
    }
}

pub struct DeviceSetupConfig<I2C, DELAY>
where
    I2C: i2c::I2c,
    DELAY: DelayNs,
{
    i2c: I2C,
    address: u8,
    delay: DELAY,
    timing: Timing,
}

/// HD44780 16x2 character display behind a PCF8574 I2C backpack.
pub struct Lcd1602<I2C, DELAY>
where
    I2C: i2c::I2c,
    DELAY: DelayNs,
{
    config: DeviceSetupConfig<I2C, DELAY>,
    encoder: driver::Hd44780Encoder,
}

impl<I2C, DELAY> Lcd1602<I2C, DELAY>
where
    I2C: i2c::I2c,
    DELAY: DelayNs,
{
    /// Create a new display object with the default I2C address. Nothing is sent to the
    /// bus until the display is initialized.
    pub fn new(i2c: I2C, delay: DELAY) -> Self {
        Self::new_with_address(i2c, DEFAULT_I2C_ADDRESS, delay)
    }

    /// Create a new display object with a specific I2C address for the backpack.
    pub fn new_with_address(i2c: I2C, address: u8, delay: DELAY) -> Self {
        Self {
            config: DeviceSetupConfig {
                i2c,
                address,
                delay,
                timing: Timing::default(),
            },
            encoder: driver::Hd44780Encoder::default(),
        }
    }

    /// Replace the default settle times.
    pub fn with_timing(mut self, timing: Timing) -> Self {
        self.config.timing = timing;
        self
    }

    /// Initialize the display at the configured address. This, `set_address` or a
    /// successful `auto_detect_address` must happen before using the display.
    pub fn init(&mut self) -> Result<&mut Self, LcdError<I2C>> {
        let address = self.config.address;
        self.encoder.initialize(&mut self.config, address)?;
        Ok(self)
    }

    /// Set the backpack I2C address and initialize the display there.
    pub fn set_address(&mut self, address: u8) -> Result<&mut Self, LcdError<I2C>> {
        self.encoder.initialize(&mut self.config, address)?;
        Ok(self)
    }

    /// Probe the known backpack address ranges. When a backpack is found its address is
    /// adopted and the display initialized there. When none is found the configured
    /// address is left as is and nothing else is sent, so the caller can fall back to
    /// `set_address`.
    pub fn auto_detect_address(&mut self) -> Result<ProbeResult, LcdError<I2C>> {
        let result = probe_address(&mut self.config.i2c)?;
        if let ProbeResult::Found(address) = result {
            self.encoder.initialize(&mut self.config, address)?;
        }
        Ok(result)
    }

    /// returns the configured I2C address
    pub fn address(&self) -> u8 {
        self.config.address
    }

    /// returns whether the backlight is on
    pub fn backlight(&self) -> bool {
        self.encoder.backlight()
    }

    /// Returns the I2C peripheral and the delay, consuming the display.
    pub fn release(self) -> (I2C, DELAY) {
        (self.config.i2c, self.config.delay)
    }

    /// returns a reference to the I2C peripheral. mostly needed for testing
    #[cfg(test)]
    fn i2c(&mut self) -> &mut I2C {
        &mut self.config.i2c
    }

    //--------------------------------------------------------------------------------------------------
    // high level commands, for the user!
    //--------------------------------------------------------------------------------------------------

    /// Clear the display
    pub fn clear(&mut self) -> Result<&mut Self, LcdError<I2C>> {
        self.encoder.clear(&mut self.config)?;
        Ok(self)
    }

    /// Turn the backlight on or off
    pub fn set_backlight(&mut self, on: bool) -> Result<&mut Self, LcdError<I2C>> {
        self.encoder.set_backlight(&mut self.config, on)?;
        Ok(self)
    }

    /// Turn the whole display on or off. Text written while the display is off appears
    /// once it is turned back on.
    pub fn set_visibility(&mut self, visible: bool) -> Result<&mut Self, LcdError<I2C>> {
        self.encoder.set_visibility(&mut self.config, visible)?;
        Ok(self)
    }

    /// Set the cursor position at specified column and row. Columns and rows are zero-indexed
    /// and are not range checked.
    pub fn set_cursor(&mut self, col: u8, row: u8) -> Result<&mut Self, LcdError<I2C>> {
        self.encoder.set_cursor(&mut self.config, col, row)?;
        Ok(self)
    }

    /// Write a string starting at the given column and row. A string starting on row 0
    /// continues at the start of row 1 once it runs past the last column; strings starting
    /// on other rows are not wrapped.
    pub fn put_string(&mut self, text: &str, col: u8, row: u8) -> Result<&mut Self, LcdError<I2C>> {
        self.encoder.put_string(&mut self.config, text, col, row)?;
        Ok(self)
    }

    /// Write a number in decimal starting at the given column and row, with the same
    /// placement rules as `put_string`.
    pub fn put_number(&mut self, n: i32, col: u8, row: u8) -> Result<&mut Self, LcdError<I2C>> {
        let mut text: heapless::String<11> = heapless::String::new();
        write!(text, "{}", n)?;
        self.put_string(&text, col, row)
    }

    /// Prints a string to the LCD at the current cursor position.
    pub fn print(&mut self, text: &str) -> Result<&mut Self, LcdError<I2C>> {
        self.encoder.print(&mut self.config, text)?;
        Ok(self)
    }

    /// Shift the display content one cell to the left. DDRAM is not changed.
    pub fn shift_left(&mut self) -> Result<&mut Self, LcdError<I2C>> {
        self.encoder.shift_left(&mut self.config)?;
        Ok(self)
    }

    /// Shift the display content one cell to the right. DDRAM is not changed.
    pub fn shift_right(&mut self) -> Result<&mut Self, LcdError<I2C>> {
        self.encoder.shift_right(&mut self.config)?;
        Ok(self)
    }
}

/// Implement the `core::fmt::Write` trait for the display, allowing it to be used with the `write!` macro.
/// Text is written at the current cursor position.
impl<I2C, DELAY> core::fmt::Write for Lcd1602<I2C, DELAY>
where
    I2C: i2c::I2c,
    DELAY: DelayNs,
{
    fn write_str(&mut self, s: &str) -> Result<(), core::fmt::Error> {
        if let Err(_e) = self.print(s) {
            return Err(core::fmt::Error);
        }
        Ok(())
    }
}

#[cfg(feature = "ufmt")]
/// Implement the `ufmt::uWrite` trait for the display, allowing it to be used with the `uwriteln!` and `uwrite!` macros.
/// Text is written at the current cursor position.
impl<I2C, DELAY> ufmt::uWrite for Lcd1602<I2C, DELAY>
where
    I2C: i2c::I2c,
    DELAY: DelayNs,
{
    fn write_str(&mut self, s: &str) -> Result<(), LcdError<I2C>> {
        self.print(s)?;
        Ok(())
    }

    type Error = LcdError<I2C>;
}
