// Copyright (c) 2022-2023 The MobileCoin Foundation

//! PIN verification APDU

use encdec::{Decode, Encode};

use super::{ApduError, ApduStatic, Instruction, SATOCHIP_CLA};

/// Verify user PIN
///
/// The card responds with `9000` on success or `63Cx` on failure,
/// where `x` is the number of remaining attempts.
///
/// ## Encoding:
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// /                              PIN...                           /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Copy, Clone, PartialEq)]
pub struct VerifyPinReq<'a> {
    pub pin: &'a [u8],
}

impl<'a> VerifyPinReq<'a> {
    /// Create a new [VerifyPinReq] APDU
    pub fn new(pin: &'a [u8]) -> Self {
        Self { pin }
    }
}

impl<'a> ApduStatic for VerifyPinReq<'a> {
    const CLA: u8 = SATOCHIP_CLA;
    const INS: u8 = Instruction::VerifyPin as u8;
}

/// Redact PIN material from debug output
impl<'a> core::fmt::Debug for VerifyPinReq<'a> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("VerifyPinReq")
            .field("pin", &"<redacted>")
            .finish()
    }
}

impl<'a> Encode for VerifyPinReq<'a> {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, Self::Error> {
        Ok(self.pin.len())
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, Self::Error> {
        if buff.len() < self.pin.len() {
            return Err(ApduError::InvalidLength);
        }

        buff[..self.pin.len()].copy_from_slice(self.pin);

        Ok(self.pin.len())
    }
}

impl<'a> Decode<'a> for VerifyPinReq<'a> {
    type Output = Self;
    type Error = ApduError;

    fn decode(buff: &'a [u8]) -> Result<(Self::Output, usize), Self::Error> {
        Ok((Self { pin: buff }, buff.len()))
    }
}
