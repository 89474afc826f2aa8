//! Kind of a misc for payload packing

/// Packs up to 8 bytes little-endian into the low and high data registers.
/// Bytes past the end of `data` are zero; bytes past 8 are dropped.
pub(crate) fn pack_payload(data: &[u8]) -> (u32, u32) {
    let mut bytes = [0u8; 8];
    let len = data.len().min(8);
    bytes[..len].copy_from_slice(&data[..len]);

    let low = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    let high = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
    (low, high)
}

/// Unpacks all 8 byte positions of the low and high data registers.
pub(crate) fn unpack_payload(low: u32, high: u32) -> [u8; 8] {
    let mut bytes = [0u8; 8];
    bytes[..4].copy_from_slice(&low.to_le_bytes());
    bytes[4..].copy_from_slice(&high.to_le_bytes());
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_0_is_the_low_byte_of_the_low_register() {
        assert_eq!(
            pack_payload(&[0x11, 0x22, 0x33, 0x44, 0x55]),
            (0x4433_2211, 0x0000_0055)
        );
    }

    #[test]
    fn payload_is_capped_at_8_bytes() {
        let data = [1u8, 2, 3, 4, 5, 6, 7, 8, 9, 10];
        assert_eq!(pack_payload(&data), (0x0403_0201, 0x0807_0605));
        assert_eq!(pack_payload(&[]), (0, 0));
    }

    #[test]
    fn unpack_returns_every_position() {
        assert_eq!(
            unpack_payload(0x4433_2211, 0x8877_6655),
            [0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88]
        );
    }
}
