// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Applet selection APDU

use encdec::{Decode, Encode};

use super::{ApduError, ApduStatic, Instruction, ISO_CLA};

/// ISO 7816-4 SELECT by application identifier
///
/// ## Encoding:
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// /                              AID...                           /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct SelectReq<'a> {
    /// Application identifier
    pub aid: &'a [u8],
}

impl<'a> SelectReq<'a> {
    /// Create a new [SelectReq] APDU
    pub fn new(aid: &'a [u8]) -> Self {
        Self { aid }
    }
}

impl<'a> ApduStatic for SelectReq<'a> {
    const CLA: u8 = ISO_CLA;
    const INS: u8 = Instruction::Select as u8;

    /// Select by DF name
    fn p1(&self) -> u8 {
        0x04
    }
}

impl<'a> Encode for SelectReq<'a> {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, Self::Error> {
        Ok(self.aid.len())
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, Self::Error> {
        if buff.len() < self.aid.len() {
            return Err(ApduError::InvalidLength);
        }

        buff[..self.aid.len()].copy_from_slice(self.aid);

        Ok(self.aid.len())
    }
}

impl<'a> Decode<'a> for SelectReq<'a> {
    type Output = Self;
    type Error = ApduError;

    fn decode(buff: &'a [u8]) -> Result<(Self::Output, usize), Self::Error> {
        Ok((Self { aid: buff }, buff.len()))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{test::encode_decode_apdu, SATOCHIP_AID};

    #[test]
    fn select_apdu() {
        let apdu = SelectReq::new(SATOCHIP_AID);

        let mut buff = [0u8; 32];
        let n = encode_decode_apdu(&mut buff, &apdu);
        assert_eq!(n, 8);
    }
}
