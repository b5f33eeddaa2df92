//! Backpack address auto-detection.
//!
//! PCF8574 backpacks answer at `0x20..=0x27` and PCF8574A backpacks at `0x38..=0x3F`. Each
//! candidate is driven all high and all low and its input port is read back after each.
//! A backpack wired to an idle HD44780 module reads back `7` in the low nibble when driven
//! high and `0` when driven low; the first candidate showing that signature is taken.
//!
//! This is a presence heuristic, not a bus scan. It relies on the readback pattern rather
//! than on the address being acknowledged, so a backpack with non-standard wiring can go
//! undetected.

use core::ops::RangeInclusive;

use embedded_hal::i2c::{self, Error as _, ErrorKind};

use crate::LcdError;

/// Addresses of PCF8574 based backpacks, probed first.
pub const PCF8574_ADDRESS_RANGE: RangeInclusive<u8> = 0x20..=0x27;
/// Addresses of PCF8574A based backpacks, probed second.
pub const PCF8574A_ADDRESS_RANGE: RangeInclusive<u8> = 0x38..=0x3F;

const PROBE_PATTERN_HIGH: u8 = 0xFF;
const PROBE_PATTERN_LOW: u8 = 0x00;

const SIGNATURE_HIGH: i8 = 7;
const SIGNATURE_LOW: i8 = 0;

/// Outcome of an address probe.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ProbeResult {
    /// A backpack with the expected readback signature answered at this address.
    Found(u8),
    /// No candidate in either range showed the signature.
    DeviceNotFound,
}

impl ProbeResult {
    /// The detected address, or `0` when no device was found. `0` is never a valid
    /// backpack address.
    pub fn address(&self) -> u8 {
        match self {
            ProbeResult::Found(address) => *address,
            ProbeResult::DeviceNotFound => 0,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, ProbeResult::Found(_))
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for ProbeResult {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            ProbeResult::Found(address) => defmt::write!(fmt, "Found({=u8:#x})", address),
            ProbeResult::DeviceNotFound => defmt::write!(fmt, "DeviceNotFound"),
        }
    }
}

/// Sweeps the PCF8574 range and then the PCF8574A range in ascending order, stopping at
/// the first address with the idle readback signature.
///
/// A candidate that does not acknowledge its address is skipped. Any other bus error
/// aborts the sweep and is returned.
pub fn probe_address<I2C>(i2c: &mut I2C) -> Result<ProbeResult, LcdError<I2C>>
where
    I2C: i2c::I2c,
{
    for address in PCF8574_ADDRESS_RANGE.chain(PCF8574A_ADDRESS_RANGE) {
        #[cfg(feature = "defmt")]
        defmt::trace!("probing backpack address {=u8:#x}", address);

        let matched = match read_signature(i2c, address) {
            Ok(matched) => matched,
            Err(e) if matches!(e.kind(), ErrorKind::NoAcknowledge(_)) => false,
            Err(e) => return Err(LcdError::I2cError(e)),
        };
        if matched {
            #[cfg(feature = "defmt")]
            defmt::debug!("backpack detected at {=u8:#x}", address);
            return Ok(ProbeResult::Found(address));
        }
    }

    #[cfg(feature = "defmt")]
    defmt::debug!("no backpack detected");
    Ok(ProbeResult::DeviceNotFound)
}

fn read_signature<I2C>(i2c: &mut I2C, address: u8) -> Result<bool, I2C::Error>
where
    I2C: i2c::I2c,
{
    let mut buffer = [0];

    i2c.write(address, &[PROBE_PATTERN_HIGH])?;
    i2c.read(address, &mut buffer)?;
    // the port is read as a signed byte, so readbacks with P7 high never match
    let high = (buffer[0] as i8) % 16;

    i2c.write(address, &[PROBE_PATTERN_LOW])?;
    i2c.read(address, &mut buffer)?;
    let low = buffer[0] as i8;

    Ok(high == SIGNATURE_HIGH && low == SIGNATURE_LOW)
}

#[cfg(test)]
mod tests {
    extern crate std;
    use super::*;
    use embedded_hal::i2c::NoAcknowledgeSource;
    use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction as I2cTransaction};
    use std::vec::Vec;

    fn candidate(address: u8, high_readback: u8, low_readback: u8) -> [I2cTransaction; 4] {
        [
            I2cTransaction::write(address, std::vec![0xFF]),
            I2cTransaction::read(address, std::vec![high_readback]),
            I2cTransaction::write(address, std::vec![0x00]),
            I2cTransaction::read(address, std::vec![low_readback]),
        ]
    }

    #[test]
    fn test_probe_finds_0x27_and_stops() {
        let mut expected_transactions = Vec::new();
        for address in 0x20..0x27 {
            expected_transactions.extend(candidate(address, 0xFF, 0xFF));
        }
        // 0x27 answers with the idle signature; nothing after it is touched
        expected_transactions.extend(candidate(0x27, 0x07, 0x00));

        let mut i2c = I2cMock::new(&expected_transactions);
        let result = probe_address(&mut i2c).unwrap();
        assert_eq!(result, ProbeResult::Found(0x27));
        assert_eq!(result.address(), 0x27);
        i2c.done();
    }

    #[test]
    fn test_probe_falls_through_to_pcf8574a_range() {
        let mut expected_transactions = Vec::new();
        for address in 0x20..=0x27 {
            expected_transactions.extend(candidate(address, 0x00, 0x00));
        }
        for address in 0x38..0x3F {
            expected_transactions.extend(candidate(address, 0x06, 0x00));
        }
        // 0x77 % 16 == 7 with the top bit clear
        expected_transactions.extend(candidate(0x3F, 0x77, 0x00));

        let mut i2c = I2cMock::new(&expected_transactions);
        assert_eq!(probe_address(&mut i2c), Ok(ProbeResult::Found(0x3F)));
        i2c.done();
    }

    #[test]
    fn test_probe_not_found() {
        let mut expected_transactions = Vec::new();
        for address in 0x20..=0x27 {
            // correct low nibble but the device does not read back zero
            expected_transactions.extend(candidate(address, 0x07, 0x01));
        }
        for address in 0x38..=0x3F {
            expected_transactions.extend(candidate(address, 0x07, 0x10));
        }

        let mut i2c = I2cMock::new(&expected_transactions);
        let result = probe_address(&mut i2c).unwrap();
        assert_eq!(result, ProbeResult::DeviceNotFound);
        assert_eq!(result.address(), 0);
        assert!(!result.is_found());
        i2c.done();
    }

    #[test]
    fn test_probe_rejects_readback_with_top_bit_set() {
        let mut expected_transactions = Vec::new();
        // 0x87 % 16 == 7 unsigned, but the signed readback never matches
        expected_transactions.extend(candidate(0x20, 0x87, 0x00));
        expected_transactions.extend(candidate(0x21, 0xF7, 0x00));
        expected_transactions.extend(candidate(0x22, 0x17, 0x00));

        let mut i2c = I2cMock::new(&expected_transactions);
        assert_eq!(probe_address(&mut i2c), Ok(ProbeResult::Found(0x22)));
        i2c.done();
    }

    #[test]
    fn test_probe_skips_unacknowledged_addresses() {
        let mut expected_transactions = Vec::new();
        for address in 0x20..0x24 {
            expected_transactions.push(
                I2cTransaction::write(address, std::vec![0xFF])
                    .with_error(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address)),
            );
        }
        expected_transactions.extend(candidate(0x24, 0x47, 0x00));

        let mut i2c = I2cMock::new(&expected_transactions);
        assert_eq!(probe_address(&mut i2c), Ok(ProbeResult::Found(0x24)));
        i2c.done();
    }

    #[test]
    fn test_probe_propagates_bus_errors() {
        let expected_transactions = [
            I2cTransaction::write(0x20, std::vec![0xFF]),
            I2cTransaction::read(0x20, std::vec![0x07]).with_error(ErrorKind::Bus),
        ];

        let mut i2c = I2cMock::new(&expected_transactions);
        assert_eq!(
            probe_address(&mut i2c),
            Err(LcdError::I2cError(ErrorKind::Bus))
        );
        i2c.done();
    }
}
