use bitfield::bitfield;

// Register layout of the PCF8574 backpack wired to a 16x2 module:
// P0 = RS, P1 = RW, P2 = E, P3 = backlight, P4-P7 = D4-D7
bitfield! {
    #[derive(Clone, Copy, PartialEq, Eq)]
    pub struct BackpackBits(u8);
    impl Debug;
    pub rs, set_rs: 0, 0;
    pub rw, set_rw: 1, 1;
    pub enable, set_enable: 2, 2;
    pub backlight, set_backlight: 3, 3;
    pub data, set_data: 7, 4;
}

impl Default for BackpackBits {
    /// Backlight on, command register, enable low.
    fn default() -> Self {
        let mut bits = BackpackBits(0);
        bits.set_backlight(1);
        bits
    }
}

impl BackpackBits {
    /// Returns the register byte for `nibble` (the low 4 bits of the argument) with the
    /// current backlight and register-select settings and the given enable level.
    /// The read/write line is always driven low.
    pub fn with_nibble(&self, nibble: u8, enable: bool) -> u8 {
        let mut bits = *self;
        bits.set_rw(0);
        bits.set_data(nibble & 0x0F);
        bits.set_enable(enable as u8);
        bits.0
    }
}
