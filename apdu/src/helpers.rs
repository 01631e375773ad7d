// Copyright (c) 2022-2023 The MobileCoin Foundation

use crate::ApduError;

/// Encode a byte slice with a big-endian `u16` length prefix
pub(crate) fn enc_lv(d: &[u8], buff: &mut [u8]) -> Result<usize, ApduError> {
    if d.len() > u16::MAX as usize || buff.len() < 2 + d.len() {
        return Err(ApduError::InvalidLength);
    }

    buff[..2].copy_from_slice(&(d.len() as u16).to_be_bytes());
    buff[2..][..d.len()].copy_from_slice(d);

    Ok(2 + d.len())
}

/// Decode a byte slice with a big-endian `u16` length prefix
pub(crate) fn dec_lv(buff: &[u8]) -> Result<(&[u8], usize), ApduError> {
    if buff.len() < 2 {
        return Err(ApduError::InvalidLength);
    }

    let n = u16::from_be_bytes([buff[0], buff[1]]) as usize;
    if buff.len() < 2 + n {
        return Err(ApduError::InvalidLength);
    }

    Ok((&buff[2..][..n], 2 + n))
}

/// Encode a byte slice with a single byte length prefix
pub(crate) fn enc_short_lv(d: &[u8], buff: &mut [u8]) -> Result<usize, ApduError> {
    if d.len() > u8::MAX as usize || buff.len() < 1 + d.len() {
        return Err(ApduError::InvalidLength);
    }

    buff[0] = d.len() as u8;
    buff[1..][..d.len()].copy_from_slice(d);

    Ok(1 + d.len())
}

/// Decode a byte slice with a single byte length prefix
pub(crate) fn dec_short_lv(buff: &[u8]) -> Result<(&[u8], usize), ApduError> {
    if buff.is_empty() {
        return Err(ApduError::InvalidLength);
    }

    let n = buff[0] as usize;
    if buff.len() < 1 + n {
        return Err(ApduError::InvalidLength);
    }

    Ok((&buff[1..][..n], 1 + n))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn lv_truncated() {
        assert_eq!(dec_lv(&[0x00]), Err(ApduError::InvalidLength));
        assert_eq!(dec_lv(&[0x00, 0x03, 0xaa]), Err(ApduError::InvalidLength));
        assert_eq!(dec_short_lv(&[]), Err(ApduError::InvalidLength));
        assert_eq!(dec_short_lv(&[0x02, 0xaa]), Err(ApduError::InvalidLength));
    }

    #[test]
    fn lv_buffer_too_small() {
        let mut buff = [0u8; 3];
        assert_eq!(enc_lv(&[1, 2], &mut buff), Err(ApduError::InvalidLength));
        assert_eq!(enc_short_lv(&[1, 2, 3], &mut buff), Err(ApduError::InvalidLength));
    }
}
