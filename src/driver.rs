// HD44780 protocol encoder for the PCF8574 backpack.
// The backpack has no notion of a command or a data byte, only a single output register
// whose 8 bits drive the HD44780 pins directly. Every logical operation is turned into
// 4-bit transfers, and each nibble is latched by pulsing the enable line through three
// consecutive register writes. Timing is open loop: the busy flag is never read, and a
// fixed settle delay follows every register write instead.

use embedded_hal::{delay::DelayNs, i2c};

use crate::{
    bit_configurations::BackpackBits,
    layout::{compute_address, TextLayout},
    DeviceSetupConfig, LcdError,
};

// commands
const LCD_CMD_NOOP: u8 = 0x00; //  Does nothing, used to refresh the backpack register
const LCD_CMD_CLEARDISPLAY: u8 = 0x01; //  Clear display, set cursor position to zero
const LCD_CMD_ENTRYMODESET: u8 = 0x04; //  Sets the entry mode
const LCD_CMD_DISPLAYCONTROL: u8 = 0x08; //  Controls the display; does stuff like turning it off and on
const LCD_CMD_CURSORSHIFT: u8 = 0x10; //  Lets you move the cursor
const LCD_CMD_FUNCTIONSET: u8 = 0x20; //  Used to send the function to set to the display

// flags for display entry mode
const LCD_FLAG_ENTRYLEFT: u8 = 0x02; //  Uset to set text to flow from left to right
const LCD_FLAG_ENTRYSHIFTDECREMENT: u8 = 0x00; //  Used to 'left justify' text from the cursor

// flags for display on/off control
const LCD_FLAG_DISPLAYON: u8 = 0x04; //  Turns the display on
const LCD_FLAG_DISPLAYOFF: u8 = 0x00; //  Turns the display off
const LCD_FLAG_CURSOROFF: u8 = 0x00; //  Turns the cursor off
const LCD_FLAG_BLINKOFF: u8 = 0x00; //  Turns off the blinking cursor

// flags for display/cursor shift
const LCD_FLAG_DISPLAYMOVE: u8 = 0x08; //  Flag for moving the display
const LCD_FLAG_MOVERIGHT: u8 = 0x04; //  Flag for moving right
const LCD_FLAG_MOVELEFT: u8 = 0x00; //  Flag for moving left

// flags for function set
const LCD_FLAG_4BITMODE: u8 = 0x00; //  LCD 4 bit mode
const LCD_FLAG_2LINE: u8 = 0x08; //  LCD 2 line mode
const LCD_FLAG_5x8_DOTS: u8 = 0x00; //  8 pixel high font mode

// nibbles of the 4-bit reset sequence
const RESET_NIBBLE_8BIT: u8 = 0x03;
const RESET_NIBBLE_4BIT: u8 = 0x02;

pub(crate) const FUNCTION_SET_4BIT_2LINE: u8 =
    LCD_CMD_FUNCTIONSET | LCD_FLAG_4BITMODE | LCD_FLAG_2LINE | LCD_FLAG_5x8_DOTS;
pub(crate) const DISPLAY_ON: u8 =
    LCD_CMD_DISPLAYCONTROL | LCD_FLAG_DISPLAYON | LCD_FLAG_CURSOROFF | LCD_FLAG_BLINKOFF;
pub(crate) const DISPLAY_OFF: u8 =
    LCD_CMD_DISPLAYCONTROL | LCD_FLAG_DISPLAYOFF | LCD_FLAG_CURSOROFF | LCD_FLAG_BLINKOFF;
pub(crate) const ENTRY_MODE_INCREMENT: u8 =
    LCD_CMD_ENTRYMODESET | LCD_FLAG_ENTRYLEFT | LCD_FLAG_ENTRYSHIFTDECREMENT;
pub(crate) const SHIFT_DISPLAY_LEFT: u8 =
    LCD_CMD_CURSORSHIFT | LCD_FLAG_DISPLAYMOVE | LCD_FLAG_MOVELEFT;
pub(crate) const SHIFT_DISPLAY_RIGHT: u8 =
    LCD_CMD_CURSORSHIFT | LCD_FLAG_DISPLAYMOVE | LCD_FLAG_MOVERIGHT;

/// Translates display operations into backpack register writes. Holds the backlight and
/// register select state that must be carried in every byte sent to the backpack.
#[derive(Debug, Default, Clone, Copy)]
pub struct Hd44780Encoder {
    bits: BackpackBits,
}

impl Hd44780Encoder {
    /// Returns whether the backlight bit is currently set.
    pub fn backlight(&self) -> bool {
        self.bits.backlight() != 0
    }

    /// Sets the device address and runs the HD44780 reset sequence, which forces the
    /// controller into 4-bit mode from whatever state it is in, then configures it for
    /// two lines with the 5x8 font, display on without a cursor, left-to-right entry,
    /// and finally clears the display.
    pub fn initialize<I2C, DELAY>(
        &mut self,
        config: &mut DeviceSetupConfig<I2C, DELAY>,
        address: u8,
    ) -> Result<(), LcdError<I2C>>
    where
        I2C: i2c::I2c,
        DELAY: DelayNs,
    {
        config.address = address;
        #[cfg(feature = "defmt")]
        defmt::debug!("initializing HD44780 at {=u8:#x}", address);

        self.bits.set_rs(0);
        self.write_nibble(config, RESET_NIBBLE_8BIT)?;
        self.write_nibble(config, RESET_NIBBLE_8BIT)?;
        config.delay.delay_ms(config.timing.reset_settle_ms);
        self.write_nibble(config, RESET_NIBBLE_8BIT)?;
        config.delay.delay_ms(config.timing.reset_settle_ms);
        self.write_nibble(config, RESET_NIBBLE_4BIT)?;
        config.delay.delay_ms(config.timing.reset_settle_ms);

        self.write_command(config, FUNCTION_SET_4BIT_2LINE)?;
        self.write_command(config, DISPLAY_ON)?;
        self.write_command(config, ENTRY_MODE_INCREMENT)?;
        self.write_command(config, LCD_CMD_CLEARDISPLAY)?;
        Ok(())
    }

    /// Clears the display and returns the cursor home.
    pub fn clear<I2C, DELAY>(
        &mut self,
        config: &mut DeviceSetupConfig<I2C, DELAY>,
    ) -> Result<(), LcdError<I2C>>
    where
        I2C: i2c::I2c,
        DELAY: DelayNs,
    {
        self.write_command(config, LCD_CMD_CLEARDISPLAY)
    }

    /// Updates the backlight bit and sends a no-op command so the new state reaches the
    /// backpack immediately.
    pub fn set_backlight<I2C, DELAY>(
        &mut self,
        config: &mut DeviceSetupConfig<I2C, DELAY>,
        on: bool,
    ) -> Result<(), LcdError<I2C>>
    where
        I2C: i2c::I2c,
        DELAY: DelayNs,
    {
        self.bits.set_backlight(on as u8);
        self.write_command(config, LCD_CMD_NOOP)
    }

    /// Turns the display on or off with the display control command. The DDRAM content is
    /// kept while the display is off.
    pub fn set_visibility<I2C, DELAY>(
        &mut self,
        config: &mut DeviceSetupConfig<I2C, DELAY>,
        visible: bool,
    ) -> Result<(), LcdError<I2C>>
    where
        I2C: i2c::I2c,
        DELAY: DelayNs,
    {
        let command = if visible { DISPLAY_ON } else { DISPLAY_OFF };
        self.write_command(config, command)
    }

    pub fn shift_left<I2C, DELAY>(
        &mut self,
        config: &mut DeviceSetupConfig<I2C, DELAY>,
    ) -> Result<(), LcdError<I2C>>
    where
        I2C: i2c::I2c,
        DELAY: DelayNs,
    {
        self.write_command(config, SHIFT_DISPLAY_LEFT)
    }

    pub fn shift_right<I2C, DELAY>(
        &mut self,
        config: &mut DeviceSetupConfig<I2C, DELAY>,
    ) -> Result<(), LcdError<I2C>>
    where
        I2C: i2c::I2c,
        DELAY: DelayNs,
    {
        self.write_command(config, SHIFT_DISPLAY_RIGHT)
    }

    /// Moves the cursor to `col`, `row`. See [`compute_address`] for the addressing rules.
    pub fn set_cursor<I2C, DELAY>(
        &mut self,
        config: &mut DeviceSetupConfig<I2C, DELAY>,
        col: u8,
        row: u8,
    ) -> Result<(), LcdError<I2C>>
    where
        I2C: i2c::I2c,
        DELAY: DelayNs,
    {
        self.write_command(config, compute_address(col, row))
    }

    /// Writes `text` starting at `col`, `row` following the [`TextLayout`] wrap rule.
    pub fn put_string<I2C, DELAY>(
        &mut self,
        config: &mut DeviceSetupConfig<I2C, DELAY>,
        text: &str,
        col: u8,
        row: u8,
    ) -> Result<(), LcdError<I2C>>
    where
        I2C: i2c::I2c,
        DELAY: DelayNs,
    {
        for step in TextLayout::new(text, col, row) {
            if let Some(cursor) = step.cursor {
                self.write_command(config, cursor)?;
            }
            self.write_data(config, step.byte)?;
        }
        Ok(())
    }

    /// Writes `text` at the current cursor position.
    pub fn print<I2C, DELAY>(
        &mut self,
        config: &mut DeviceSetupConfig<I2C, DELAY>,
        text: &str,
    ) -> Result<(), LcdError<I2C>>
    where
        I2C: i2c::I2c,
        DELAY: DelayNs,
    {
        for c in text.chars() {
            self.write_data(config, c as u8)?;
        }
        Ok(())
    }

    /// Writes a byte to the instruction register.
    pub fn write_command<I2C, DELAY>(
        &mut self,
        config: &mut DeviceSetupConfig<I2C, DELAY>,
        command: u8,
    ) -> Result<(), LcdError<I2C>>
    where
        I2C: i2c::I2c,
        DELAY: DelayNs,
    {
        self.write_byte(config, false, command)
    }

    /// Writes a byte to the data register, either the CGRAM or DDRAM, depending on the
    /// prior command sent.
    pub fn write_data<I2C, DELAY>(
        &mut self,
        config: &mut DeviceSetupConfig<I2C, DELAY>,
        data: u8,
    ) -> Result<(), LcdError<I2C>>
    where
        I2C: i2c::I2c,
        DELAY: DelayNs,
    {
        self.write_byte(config, true, data)
    }

    /// Writes a full byte, high nibble first. If `rs_setting` is `true` the byte goes to
    /// the data register, otherwise to the instruction register.
    fn write_byte<I2C, DELAY>(
        &mut self,
        config: &mut DeviceSetupConfig<I2C, DELAY>,
        rs_setting: bool,
        value: u8,
    ) -> Result<(), LcdError<I2C>>
    where
        I2C: i2c::I2c,
        DELAY: DelayNs,
    {
        self.bits.set_rs(rs_setting as u8);
        self.write_nibble(config, value >> 4)?;
        self.write_nibble(config, value & 0x0F)
    }

    /// Latches the low nibble of `value` with the current register select setting: the
    /// nibble is presented with enable low, enable is raised, then dropped again.
    fn write_nibble<I2C, DELAY>(
        &mut self,
        config: &mut DeviceSetupConfig<I2C, DELAY>,
        value: u8,
    ) -> Result<(), LcdError<I2C>>
    where
        I2C: i2c::I2c,
        DELAY: DelayNs,
    {
        write_register(config, self.bits.with_nibble(value, false))?;
        write_register(config, self.bits.with_nibble(value, true))?;
        write_register(config, self.bits.with_nibble(value, false))
    }
}

/// Writes one byte to the backpack output register and waits for the controller to settle.
fn write_register<I2C, DELAY>(
    config: &mut DeviceSetupConfig<I2C, DELAY>,
    bits: u8,
) -> Result<(), LcdError<I2C>>
where
    I2C: i2c::I2c,
    DELAY: DelayNs,
{
    config
        .i2c
        .write(config.address, &[bits])
        .map_err(LcdError::I2cError)?;
    config.delay.delay_us(config.timing.register_settle_us);
    Ok(())
}
