// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Card setup APDU, used to provision a fresh card

use encdec::{Decode, Encode};

use super::{ApduError, ApduStatic, Instruction, SATOCHIP_CLA};
use crate::helpers::{dec_short_lv, enc_short_lv};

/// Configure a fresh card with PIN, PUK and retry counters.
///
/// This may only succeed once per card, subsequent attempts return
/// [SETUP_ALREADY_DONE][crate::StatusWord::SETUP_ALREADY_DONE].
///
/// ## Encoding:
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |   PIN_TRIES   |    PIN_LEN    |            PIN...             /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |   PUK_TRIES   |    PUK_LEN    |            PUK...             /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Copy, Clone, PartialEq)]
pub struct SetupReq<'a> {
    pub pin_tries: u8,
    pub pin: &'a [u8],
    pub puk_tries: u8,
    pub puk: &'a [u8],
}

impl<'a> SetupReq<'a> {
    /// Create a new [SetupReq] APDU
    pub fn new(pin_tries: u8, pin: &'a [u8], puk_tries: u8, puk: &'a [u8]) -> Self {
        Self {
            pin_tries,
            pin,
            puk_tries,
            puk,
        }
    }
}

impl<'a> ApduStatic for SetupReq<'a> {
    const CLA: u8 = SATOCHIP_CLA;
    const INS: u8 = Instruction::Setup as u8;
}

impl<'a> core::fmt::Debug for SetupReq<'a> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SetupReq")
            .field("pin_tries", &self.pin_tries)
            .field("puk_tries", &self.puk_tries)
            .finish_non_exhaustive()
    }
}

impl<'a> Encode for SetupReq<'a> {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, Self::Error> {
        Ok(4 + self.pin.len() + self.puk.len())
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, Self::Error> {
        if buff.len() < self.encode_len()? {
            return Err(ApduError::InvalidLength);
        }

        let mut index = 0;

        buff[index] = self.pin_tries;
        index += 1;
        index += enc_short_lv(self.pin, &mut buff[index..])?;

        buff[index] = self.puk_tries;
        index += 1;
        index += enc_short_lv(self.puk, &mut buff[index..])?;

        Ok(index)
    }
}

impl<'a> Decode<'a> for SetupReq<'a> {
    type Output = Self;
    type Error = ApduError;

    fn decode(buff: &'a [u8]) -> Result<(Self::Output, usize), Self::Error> {
        let mut index = 0;

        let pin_tries = *buff.first().ok_or(ApduError::InvalidLength)?;
        index += 1;
        let (pin, n) = dec_short_lv(&buff[index..])?;
        index += n;

        let puk_tries = *buff.get(index).ok_or(ApduError::InvalidLength)?;
        index += 1;
        let (puk, n) = dec_short_lv(&buff[index..])?;
        index += n;

        Ok((
            Self {
                pin_tries,
                pin,
                puk_tries,
                puk,
            },
            index,
        ))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test::encode_decode_apdu;

    #[test]
    fn setup_apdu() {
        let apdu = SetupReq::new(5, b"123456", 3, b"12345678");

        let mut buff = [0u8; 64];
        assert_eq!(encode_decode_apdu(&mut buff, &apdu), 18);
    }

    #[test]
    fn setup_truncated() {
        assert_eq!(
            SetupReq::decode(&[5, 4, b'1', b'2']).map(|(s, _)| s.pin_tries),
            Err(ApduError::InvalidLength)
        );
        assert_eq!(
            SetupReq::decode(&[5, 1, b'1']).map(|(s, _)| s.pin_tries),
            Err(ApduError::InvalidLength)
        );
    }
}
