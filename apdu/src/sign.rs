// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Schnorr signing APDUs

use encdec::{Decode, DecodeOwned, Encode};

use super::{ApduError, ApduStatic, Instruction, Keyslot, SATOCHIP_CLA};
use crate::helpers::{dec_lv, enc_lv};

/// Hash length for signing requests
pub const HASH_LEN: usize = 32;

/// Request a BIP-340 Schnorr signature over a pre-computed hash
/// using the key held in the specified [Keyslot].
///
/// Requires prior PIN verification.
///
/// ## Encoding:
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |    KEYSLOT    |                                               |
/// +-+-+-+-+-+-+-+-+                                               +
/// /                             HASH                              /
/// /                          (32-bytes)                           /
/// |                                                               |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct SignHashReq {
    pub keyslot: Keyslot,
    pub hash: [u8; HASH_LEN],
}

impl SignHashReq {
    /// Create a new [SignHashReq] APDU
    pub fn new(keyslot: Keyslot, hash: [u8; HASH_LEN]) -> Self {
        Self { keyslot, hash }
    }
}

impl ApduStatic for SignHashReq {
    const CLA: u8 = SATOCHIP_CLA;
    const INS: u8 = Instruction::SignSchnorrHash as u8;
}

impl Encode for SignHashReq {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, Self::Error> {
        Ok(1 + HASH_LEN)
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, Self::Error> {
        if buff.len() < 1 + HASH_LEN {
            return Err(ApduError::InvalidLength);
        }

        buff[0] = self.keyslot.index();
        buff[1..][..HASH_LEN].copy_from_slice(&self.hash);

        Ok(1 + HASH_LEN)
    }
}

impl DecodeOwned for SignHashReq {
    type Output = Self;

    type Error = ApduError;

    fn decode_owned(buff: &[u8]) -> Result<(Self::Output, usize), Self::Error> {
        if buff.len() < 1 + HASH_LEN {
            return Err(ApduError::InvalidLength);
        }

        let keyslot = Keyslot::new(buff[0])?;

        let mut hash = [0u8; HASH_LEN];
        hash.copy_from_slice(&buff[1..][..HASH_LEN]);

        Ok((Self { keyslot, hash }, 1 + HASH_LEN))
    }
}

/// Signature response APDU
///
/// ## Encoding:
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |            SIG_LEN            |         SIGNATURE...          /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct SignResp<'a> {
    pub signature: &'a [u8],
}

impl<'a> SignResp<'a> {
    /// Create a new [SignResp] APDU
    pub fn new(signature: &'a [u8]) -> Self {
        Self { signature }
    }
}

impl<'a> Encode for SignResp<'a> {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, Self::Error> {
        Ok(2 + self.signature.len())
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, Self::Error> {
        enc_lv(self.signature, buff)
    }
}

impl<'a> Decode<'a> for SignResp<'a> {
    type Output = Self;
    type Error = ApduError;

    fn decode(buff: &'a [u8]) -> Result<(Self::Output, usize), Self::Error> {
        let (signature, n) = dec_lv(buff)?;
        Ok((Self { signature }, n))
    }
}
