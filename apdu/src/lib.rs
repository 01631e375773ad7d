// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Protocol / APDU definitions for Satochip-class signing cards
//!
//! This module provides the command and response objects exchanged with the card
//! applet, along with the [status word][status] interpreter used to classify every
//! card response.
//!
//! Commands use ISO 7816-4 short APDU framing (`CLA INS P1 P2 Lc DATA`), responses
//! carry an optional payload followed by a two-byte status word.
//! Multi-byte fields and length prefixes are big-endian, matching the card's
//! native encoding.
//!

#![no_std]

use core::fmt::Display;

use encdec::{DecodeOwned, Encode};
use num_enum::TryFromPrimitive;
use strum::Display;

pub mod card_status;
pub mod pin;
pub mod pki;
pub mod prelude;
pub mod pubkey;
pub mod select;
pub mod setup;
pub mod sign;
pub mod status;

mod helpers;

pub use status::{classify, Keyslot, StatusClass, StatusWord};

/// Satochip applet APDU class
pub const SATOCHIP_CLA: u8 = 0xb0;

/// ISO 7816-4 interindustry class, used for SELECT
pub const ISO_CLA: u8 = 0x00;

/// Satochip applet identifier
pub const SATOCHIP_AID: &[u8] = b"SatoChip";

/// Command header length (`CLA INS P1 P2 Lc`)
pub const HEADER_LEN: usize = 5;

/// Maximum command payload for short APDUs
pub const MAX_DATA_LEN: usize = 255;

/// Maximum encoded command length
pub const MAX_COMMAND_LEN: usize = HEADER_LEN + MAX_DATA_LEN;

/// Maximum response length (payload and status word)
pub const MAX_RESPONSE_LEN: usize = 258;

/// Satochip APDU instruction codes
#[derive(Copy, Clone, Debug, PartialEq, Display, TryFromPrimitive)]
#[repr(u8)]
pub enum Instruction {
    /// Configure a fresh card (PIN / PUK / retry counters)
    Setup = 0x2a,

    /// Fetch the public key for a keyslot
    GetPublicKey = 0x35,

    /// Fetch card status (setup / seed flags, retry counters, versions)
    GetStatus = 0x3c,

    /// Verify the user PIN
    VerifyPin = 0x42,

    /// Issue a BIP-340 Schnorr signature over a pre-computed hash
    SignSchnorrHash = 0x7b,

    /// Export the card attestation (PKI) certificate
    ExportPkiCertificate = 0x9a,

    /// ISO 7816-4 SELECT by application identifier
    Select = 0xa4,
}

/// APDU encoding / decoding errors
#[derive(Copy, Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum ApduError {
    /// Buffer or field length invalid
    InvalidLength,

    /// Field encoding invalid
    InvalidEncoding,

    /// Keyslot index outside of `0..=15`
    InvalidKeyslot(u8),

    /// Instruction not recognised
    UnknownInstruction(u8),

    /// Response too short to contain a status word
    MissingStatus,
}

impl Display for ApduError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ApduError::InvalidLength => write!(f, "invalid length"),
            ApduError::InvalidEncoding => write!(f, "invalid encoding"),
            ApduError::InvalidKeyslot(s) => {
                write!(f, "invalid keyslot {s} (max: {})", Keyslot::MAX)
            }
            ApduError::UnknownInstruction(i) => write!(f, "unknown instruction 0x{i:02x}"),
            ApduError::MissingStatus => write!(f, "response missing status word"),
        }
    }
}

impl From<encdec::Error> for ApduError {
    fn from(e: encdec::Error) -> Self {
        match e {
            encdec::Error::Length => ApduError::InvalidLength,
            _ => ApduError::InvalidEncoding,
        }
    }
}

/// APDU command header
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ApduHeader {
    pub cla: u8,
    pub ins: u8,
    pub p1: u8,
    pub p2: u8,
}

/// Static APDU header information, implemented by all request objects
pub trait ApduStatic {
    /// APDU class
    const CLA: u8;

    /// APDU instruction
    const INS: u8;

    /// First parameter byte
    fn p1(&self) -> u8 {
        0
    }

    /// Second parameter byte
    fn p2(&self) -> u8 {
        0
    }
}

/// Encodable APDU request
pub trait ApduReq: Encode<Error = ApduError> {
    /// Fetch the command header for this request
    fn header(&self) -> ApduHeader;
}

impl<T: ApduStatic + Encode<Error = ApduError>> ApduReq for T {
    fn header(&self) -> ApduHeader {
        ApduHeader {
            cla: T::CLA,
            ins: T::INS,
            p1: self.p1(),
            p2: self.p2(),
        }
    }
}

/// Encode a request as a short command APDU into the provided buffer
pub fn encode_command<R: ApduReq>(req: &R, buff: &mut [u8]) -> Result<usize, ApduError> {
    let h = req.header();

    let data_len = req.encode_len()?;
    if data_len > MAX_DATA_LEN || buff.len() < HEADER_LEN + data_len {
        return Err(ApduError::InvalidLength);
    }

    // Write header
    buff[0] = h.cla;
    buff[1] = h.ins;
    buff[2] = h.p1;
    buff[3] = h.p2;
    buff[4] = data_len as u8;

    // Write payload
    let n = req.encode(&mut buff[HEADER_LEN..])?;

    Ok(HEADER_LEN + n)
}

/// Parsed command APDU, used by card implementations
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Command<'a> {
    pub header: ApduHeader,
    pub data: &'a [u8],
}

impl<'a> Command<'a> {
    /// Parse a short command APDU
    pub fn parse(buff: &'a [u8]) -> Result<Self, ApduError> {
        if buff.len() < HEADER_LEN {
            return Err(ApduError::InvalidLength);
        }

        let header = ApduHeader {
            cla: buff[0],
            ins: buff[1],
            p1: buff[2],
            p2: buff[3],
        };

        let lc = buff[4] as usize;
        if buff.len() < HEADER_LEN + lc {
            return Err(ApduError::InvalidLength);
        }

        Ok(Self {
            header,
            data: &buff[HEADER_LEN..][..lc],
        })
    }

    /// Resolve the instruction for this command
    pub fn instruction(&self) -> Result<Instruction, ApduError> {
        Instruction::try_from(self.header.ins)
            .map_err(|_| ApduError::UnknownInstruction(self.header.ins))
    }
}

/// Split a response APDU into payload and trailing [StatusWord]
pub fn split_response(buff: &[u8]) -> Result<(&[u8], StatusWord), ApduError> {
    if buff.len() < 2 {
        return Err(ApduError::MissingStatus);
    }

    let (data, sw) = buff.split_at(buff.len() - 2);
    let sw = StatusWord::new(u16::from_be_bytes([sw[0], sw[1]]));

    Ok((data, sw))
}

/// Write a response APDU (optional payload followed by the status word)
pub fn encode_response<R: Encode<Error = ApduError>>(
    resp: Option<&R>,
    sw: StatusWord,
    buff: &mut [u8],
) -> Result<usize, ApduError> {
    let mut index = 0;

    if let Some(r) = resp {
        if buff.len() < r.encode_len()? + 2 {
            return Err(ApduError::InvalidLength);
        }
        index += r.encode(buff)?;
    }

    if buff.len() < index + 2 {
        return Err(ApduError::InvalidLength);
    }

    buff[index..][..2].copy_from_slice(&sw.code().to_be_bytes());
    index += 2;

    Ok(index)
}

/// Empty response payload, returned by commands that only report a status word
#[derive(Copy, Clone, PartialEq, Debug, Default)]
pub struct Ack;

impl Encode for Ack {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, Self::Error> {
        Ok(0)
    }

    fn encode(&self, _buff: &mut [u8]) -> Result<usize, Self::Error> {
        Ok(0)
    }
}

impl DecodeOwned for Ack {
    type Output = Self;

    type Error = ApduError;

    fn decode_owned(_buff: &[u8]) -> Result<(Self::Output, usize), Self::Error> {
        Ok((Self, 0))
    }
}
