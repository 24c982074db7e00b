/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! FIX checksum calculation.
//!
//! The FIX checksum is the sum of all bytes in the message (excluding the
//! checksum field itself) modulo 256, formatted as a 3-digit zero-padded string.

/// Calculates the FIX checksum for the given data.
///
/// # Example
/// ```
/// use fixline_tagvalue::calculate_checksum;
///
/// assert_eq!(calculate_checksum(b"ABC"), 198);
/// ```
#[inline]
#[must_use]
pub fn calculate_checksum(data: &[u8]) -> u8 {
    data.iter().fold(0u8, |acc, &b| acc.wrapping_add(b))
}

/// Formats a checksum value as three ASCII digits.
#[inline]
#[must_use]
pub fn format_checksum(checksum: u8) -> [u8; 3] {
    let d0 = b'0' + (checksum / 100);
    let d1 = b'0' + ((checksum / 10) % 10);
    let d2 = b'0' + (checksum % 10);
    [d0, d1, d2]
}

/// Returns the checksum of `data` as a 3-digit zero-padded string.
#[must_use]
pub fn checksum(data: &[u8]) -> String {
    let digits = format_checksum(calculate_checksum(data));
    digits.iter().map(|&d| d as char).collect()
}

/// Parses a 3-digit checksum string to a u8 value.
///
/// # Returns
/// `Some(checksum)` if valid, `None` otherwise.
#[inline]
#[must_use]
pub fn parse_checksum(bytes: &[u8]) -> Option<u8> {
    if bytes.len() != 3 {
        return None;
    }

    let d0 = bytes[0].checked_sub(b'0')?;
    let d1 = bytes[1].checked_sub(b'0')?;
    let d2 = bytes[2].checked_sub(b'0')?;

    if d0 > 2 || d1 > 9 || d2 > 9 {
        return None;
    }

    u8::try_from(u16::from(d0) * 100 + u16::from(d1) * 10 + u16::from(d2)).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_empty() {
        assert_eq!(calculate_checksum(b""), 0);
        assert_eq!(checksum(b""), "000");
    }

    #[test]
    fn test_checksum_overflow() {
        let data = vec![255u8; 1000];
        let expected = ((255u32 * 1000) % 256) as u8;
        assert_eq!(calculate_checksum(&data), expected);
    }

    #[test]
    fn test_checksum_is_always_three_digits() {
        for len in 0..300usize {
            let data: Vec<u8> = (0..len).map(|i| (i * 7 % 256) as u8).collect();
            let text = checksum(&data);
            let sum: u32 = data.iter().map(|&b| u32::from(b)).sum();
            assert_eq!(text.len(), 3);
            assert_eq!(text, format!("{:03}", sum % 256));
        }
    }

    #[test]
    fn test_format_checksum() {
        assert_eq!(format_checksum(0), *b"000");
        assert_eq!(format_checksum(42), *b"042");
        assert_eq!(format_checksum(255), *b"255");
    }

    #[test]
    fn test_parse_checksum() {
        assert_eq!(parse_checksum(b"003"), Some(3));
        assert_eq!(parse_checksum(b"255"), Some(255));
        assert_eq!(parse_checksum(b"256"), None);
        assert_eq!(parse_checksum(b"00"), None);
        assert_eq!(parse_checksum(b"12X"), None);
    }
}
