/// CRC-8 as computed by the sensor: polynomial 0x31 (x^8 + x^5 + x^4 + 1),
/// initial remainder 0, MSB first, no reflection and no final XOR.
pub fn crc8(data: &[u8]) -> u8 {
    let mut rem: u8 = 0;

    for &b in data {
        rem ^= b;
        for _ in 0..8 {
            rem = if rem & 0x80 != 0 {
                (rem << 1) ^ 0x31
            } else {
                rem << 1
            };
        }
    }

    rem
}
