// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Public key APDUs

use encdec::{Decode, DecodeOwned, Encode};

use super::{ApduError, ApduStatic, Instruction, Keyslot, SATOCHIP_CLA};
use crate::helpers::{dec_lv, enc_lv};

/// Fetch the public key for a [Keyslot]
///
/// ## Encoding:
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |    KEYSLOT    |
/// +-+-+-+-+-+-+-+-+
/// ```
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct PubKeyReq {
    pub keyslot: Keyslot,
}

impl PubKeyReq {
    /// Create a new [PubKeyReq] APDU
    pub fn new(keyslot: Keyslot) -> Self {
        Self { keyslot }
    }
}

impl ApduStatic for PubKeyReq {
    const CLA: u8 = SATOCHIP_CLA;
    const INS: u8 = Instruction::GetPublicKey as u8;
}

impl Encode for PubKeyReq {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, Self::Error> {
        Ok(1)
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, Self::Error> {
        if buff.is_empty() {
            return Err(ApduError::InvalidLength);
        }

        buff[0] = self.keyslot.index();

        Ok(1)
    }
}

impl DecodeOwned for PubKeyReq {
    type Output = Self;

    type Error = ApduError;

    fn decode_owned(buff: &[u8]) -> Result<(Self::Output, usize), Self::Error> {
        let index = *buff.first().ok_or(ApduError::InvalidLength)?;
        let keyslot = Keyslot::new(index)?;

        Ok((Self { keyslot }, 1))
    }
}

/// Public key response APDU, containing the SEC1-encoded key
///
/// ## Encoding:
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |            KEY_LEN            |        PUBLIC_KEY...          /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct PubKeyResp<'a> {
    pub public_key: &'a [u8],
}

impl<'a> PubKeyResp<'a> {
    /// Create a new [PubKeyResp] APDU
    pub fn new(public_key: &'a [u8]) -> Self {
        Self { public_key }
    }
}

impl<'a> Encode for PubKeyResp<'a> {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, Self::Error> {
        Ok(2 + self.public_key.len())
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, Self::Error> {
        enc_lv(self.public_key, buff)
    }
}

impl<'a> Decode<'a> for PubKeyResp<'a> {
    type Output = Self;
    type Error = ApduError;

    fn decode(buff: &'a [u8]) -> Result<(Self::Output, usize), Self::Error> {
        let (public_key, n) = dec_lv(buff)?;
        Ok((Self { public_key }, n))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test::encode_decode_apdu;

    #[test]
    fn pubkey_req_apdu() {
        let apdu = PubKeyReq::new(Keyslot::new(15).unwrap());

        let mut buff = [0u8; 8];
        encode_decode_apdu(&mut buff, &apdu);
    }

    #[test]
    fn pubkey_resp_apdu() {
        let mut key = [0x11u8; 33];
        key[0] = 0x02;

        let apdu = PubKeyResp::new(&key);

        let mut buff = [0u8; 64];
        assert_eq!(encode_decode_apdu(&mut buff, &apdu), 35);
    }
}
