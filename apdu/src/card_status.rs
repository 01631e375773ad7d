// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Card status APDUs

use encdec::{DecodeOwned, Encode};

use super::{ApduError, ApduStatic, Instruction, SATOCHIP_CLA};

/// Fetch card status APDU
#[derive(Copy, Clone, PartialEq, Debug, Default)]
pub struct StatusReq {}

impl ApduStatic for StatusReq {
    const CLA: u8 = SATOCHIP_CLA;
    const INS: u8 = Instruction::GetStatus as u8;
}

impl Encode for StatusReq {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, Self::Error> {
        Ok(0)
    }

    fn encode(&self, _buff: &mut [u8]) -> Result<usize, Self::Error> {
        Ok(0)
    }
}

impl DecodeOwned for StatusReq {
    type Output = Self;

    type Error = ApduError;

    fn decode_owned(_buff: &[u8]) -> Result<(Self::Output, usize), Self::Error> {
        Ok((Self {}, 0))
    }
}

/// Card status response APDU
///
/// ## Encoding:
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |  PROTO_MAJOR  |  PROTO_MINOR  |  APPLET_MAJOR |  APPLET_MINOR |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |   PIN_TRIES   |   PUK_TRIES   |   NEEDS_2FA   |    SEEDED     |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |  SETUP_DONE   | SECURE_CHANNEL|
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
///
/// Flags are encoded as `0x00` (false) or `0x01` (true).
#[derive(Copy, Clone, PartialEq, Debug, Default)]
pub struct StatusResp {
    pub protocol_major: u8,
    pub protocol_minor: u8,
    pub applet_major: u8,
    pub applet_minor: u8,
    /// Remaining user PIN attempts
    pub pin_tries_remaining: u8,
    /// Remaining PUK (unblock) attempts
    pub puk_tries_remaining: u8,
    pub needs_2fa: bool,
    /// Card holds key material
    pub seeded: bool,
    /// Card PIN / PUK configured
    pub setup_done: bool,
    /// Commands must be wrapped in a secure channel
    pub needs_secure_channel: bool,
}

impl StatusResp {
    const LEN: usize = 10;
}

impl Encode for StatusResp {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, Self::Error> {
        Ok(Self::LEN)
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, Self::Error> {
        if buff.len() < Self::LEN {
            return Err(ApduError::InvalidLength);
        }

        buff[0] = self.protocol_major;
        buff[1] = self.protocol_minor;
        buff[2] = self.applet_major;
        buff[3] = self.applet_minor;
        buff[4] = self.pin_tries_remaining;
        buff[5] = self.puk_tries_remaining;
        buff[6] = self.needs_2fa as u8;
        buff[7] = self.seeded as u8;
        buff[8] = self.setup_done as u8;
        buff[9] = self.needs_secure_channel as u8;

        Ok(Self::LEN)
    }
}

impl DecodeOwned for StatusResp {
    type Output = Self;

    type Error = ApduError;

    fn decode_owned(buff: &[u8]) -> Result<(Self::Output, usize), Self::Error> {
        if buff.len() < Self::LEN {
            return Err(ApduError::InvalidLength);
        }

        let flag = |b: u8| match b {
            0 => Ok(false),
            1 => Ok(true),
            _ => Err(ApduError::InvalidEncoding),
        };

        let s = Self {
            protocol_major: buff[0],
            protocol_minor: buff[1],
            applet_major: buff[2],
            applet_minor: buff[3],
            pin_tries_remaining: buff[4],
            puk_tries_remaining: buff[5],
            needs_2fa: flag(buff[6])?,
            seeded: flag(buff[7])?,
            setup_done: flag(buff[8])?,
            needs_secure_channel: flag(buff[9])?,
        };

        Ok((s, Self::LEN))
    }
}
