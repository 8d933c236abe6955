//! Even parity over the variable-width AVC-LAN fields.
//!
//! Every parity-covered field on the wire (addresses, control, length and
//! data bytes) is followed by one bit chosen so that the total number of
//! `1` bits across field and parity bit is even.

/// Mask selecting the low `bits` bits of a field.
pub(crate) fn field_mask(bits: u8) -> u16 {
    if bits >= 16 {
        u16::MAX
    } else {
        (1u16 << bits) - 1
    }
}

/// Returns the parity bit to transmit after the low `bits` bits of `value`.
///
/// The result is `true` when the field holds an odd number of ones, so that
/// field plus parity bit carries an even count.
pub fn even_parity(value: u16, bits: u8) -> bool {
    (value & field_mask(bits)).count_ones() % 2 == 1
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fold_parity(value: u16, bits: u8) -> bool {
        // Bit-serial accumulator, as a receiver counts ones off the wire.
        let mut parity = false;
        for i in (0..bits).rev() {
            if (value >> i) & 1 == 1 {
                parity = !parity;
            }
        }
        parity
    }

    #[test]
    fn test_parity_matches_serial_accumulator_for_all_addresses() {
        for value in 0..=0x0FFFu16 {
            assert_eq!(even_parity(value, 12), fold_parity(value, 12), "{value:#x}");
        }
    }

    #[test]
    fn test_parity_makes_total_even() {
        for value in 0..=0xFFu16 {
            let ones = value.count_ones() + u32::from(even_parity(value, 8));
            assert_eq!(ones % 2, 0);
        }
    }

    #[test]
    fn test_parity_ignores_bits_outside_field() {
        assert!(!even_parity(0xF0, 4));
        assert!(even_parity(0xF1, 4));
        assert_eq!(field_mask(12), 0x0FFF);
        assert_eq!(field_mask(16), 0xFFFF);
    }
}
