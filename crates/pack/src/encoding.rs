/// Normalize raw file bytes to UTF-8.
///
/// Sniffs a BOM: a UTF-8 BOM is stripped, UTF-16 (either endianness) is
/// decoded. Anything else is passed through, with invalid sequences
/// replaced: content is preserved, the exact encoding is not.
pub fn to_utf8(bytes: Vec<u8>) -> Vec<u8> {
    if bytes.starts_with(&[0xef, 0xbb, 0xbf]) {
        return bytes[3..].to_vec();
    }
    if bytes.starts_with(&[0xff, 0xfe]) {
        return decode_utf16(&bytes[2..], u16::from_le_bytes);
    }
    if bytes.starts_with(&[0xfe, 0xff]) {
        return decode_utf16(&bytes[2..], u16::from_be_bytes);
    }

    match String::from_utf8(bytes) {
        Ok(text) => text.into_bytes(),
        Err(err) => String::from_utf8_lossy(err.as_bytes()).into_owned().into_bytes(),
    }
}

fn decode_utf16(bytes: &[u8], read: fn([u8; 2]) -> u16) -> Vec<u8> {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| read([pair[0], pair[1]]))
        .collect();
    String::from_utf16_lossy(&units).into_bytes()
}
