// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Status word interpretation
//!
//! Every card response ends with a 16-bit [StatusWord]. Status words are
//! classified by range into a [StatusClass]:
//!
//! | Class     | Range                          |
//! |-----------|--------------------------------|
//! | `Success` | `9000`                         |
//! | `Warning` | `62xx`, `63xx`                 |
//! | `Error`   | `69xx` through `6Fxx`          |
//! | `Unknown` | anything else                  |
//!
//! Well-known codes (ISO 7816-4 and the applet-specific `9Cxx` codes) carry a
//! fixed description, all other codes are displayed in hexadecimal.
//!
//! This module also hosts the [Keyslot] range check applied before any keyslot
//! is forwarded to the card.

use core::fmt::{Debug, Display};

use strum::Display;

use crate::ApduError;

/// Status word classification
#[derive(Copy, Clone, Debug, PartialEq, Eq, Display)]
pub enum StatusClass {
    Success,
    Warning,
    Error,
    Unknown,
}

/// Classify a raw status word
pub const fn classify(code: u16) -> StatusClass {
    if code == 0x9000 {
        return StatusClass::Success;
    }

    match (code >> 8) as u8 {
        0x62 | 0x63 => StatusClass::Warning,
        0x69..=0x6f => StatusClass::Error,
        _ => StatusClass::Unknown,
    }
}

/// Card response status word
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct StatusWord(u16);

impl StatusWord {
    pub const SUCCESS: Self = Self(0x9000);

    pub const WARNING_NO_CHANGE: Self = Self(0x6200);
    pub const WARNING_CORRUPTED: Self = Self(0x6281);
    pub const WARNING_EOF: Self = Self(0x6282);
    pub const VERIFY_FAILED: Self = Self(0x6300);

    pub const WRONG_LENGTH: Self = Self(0x6700);
    pub const SECURITY_STATUS_NOT_SATISFIED: Self = Self(0x6982);
    pub const AUTH_METHOD_BLOCKED: Self = Self(0x6983);
    pub const REFERENCE_DATA_NOT_USABLE: Self = Self(0x6984);
    pub const CONDITIONS_NOT_SATISFIED: Self = Self(0x6985);
    pub const WRONG_DATA: Self = Self(0x6a80);
    pub const FILE_NOT_FOUND: Self = Self(0x6a82);
    pub const INCORRECT_P1_P2: Self = Self(0x6a86);
    pub const REFERENCED_DATA_NOT_FOUND: Self = Self(0x6a88);
    pub const WRONG_P1_P2: Self = Self(0x6b00);
    pub const INS_NOT_SUPPORTED: Self = Self(0x6d00);
    pub const CLA_NOT_SUPPORTED: Self = Self(0x6e00);
    pub const UNKNOWN_ERROR: Self = Self(0x6f00);

    pub const SETUP_NOT_DONE: Self = Self(0x9c04);
    pub const UNAUTHORIZED: Self = Self(0x9c06);
    pub const SETUP_ALREADY_DONE: Self = Self(0x9c07);
    pub const IDENTITY_BLOCKED: Self = Self(0x9c0c);
    pub const NO_KEY_IN_SLOT: Self = Self(0x9c14);
    pub const SECURE_CHANNEL_REQUIRED: Self = Self(0x9c20);

    /// Create a status word from a raw code
    pub const fn new(code: u16) -> Self {
        Self(code)
    }

    /// Create a PIN verification failure with retry counter (`63Cx`)
    pub const fn pin_failed(retries: u8) -> Self {
        Self(0x63c0 | (retries & 0x0f) as u16)
    }

    /// Fetch the raw code
    pub const fn code(&self) -> u16 {
        self.0
    }

    /// Classify this status word
    pub const fn class(&self) -> StatusClass {
        classify(self.0)
    }

    /// Check whether this status word indicates success
    pub const fn is_success(&self) -> bool {
        self.0 == Self::SUCCESS.0
    }

    /// Fetch the remaining PIN retries for `63Cx` counter warnings
    pub const fn pin_retries(&self) -> Option<u8> {
        match self.0 & 0xfff0 {
            0x63c0 => Some((self.0 & 0x0f) as u8),
            _ => None,
        }
    }

    /// Fetch the fixed description for well-known status words
    pub const fn description(&self) -> Option<&'static str> {
        let d = match self.0 {
            0x9000 => "Success",

            0x6200 => "No information given (non-volatile memory unchanged)",
            0x6281 => "Part of returned data may be corrupted",
            0x6282 => "End of file reached before reading expected number of bytes",
            0x6300 => "Verification failed",
            0x63c0..=0x63cf => "PIN verification failed",

            0x6700 => "Wrong length",
            0x6982 => "Security status not satisfied",
            0x6983 => "Authentication method blocked",
            0x6984 => "Reference data not usable",
            0x6985 => "Conditions of use not satisfied",
            0x6a80 => "Incorrect parameters in the data field",
            0x6a82 => "File or application not found",
            0x6a86 => "Incorrect parameters P1-P2",
            0x6a88 => "Referenced data not found",
            0x6b00 => "Wrong parameters P1-P2",
            0x6d00 => "Instruction code not supported",
            0x6e00 => "Class not supported",
            0x6f00 => "No precise diagnosis",

            0x9c04 => "Card setup not done",
            0x9c06 => "PIN verification required",
            0x9c07 => "Card setup already done",
            0x9c0c => "PIN blocked, PUK required",
            0x9c14 => "No key in keyslot",
            0x9c20 => "Secure channel required",

            _ => return None,
        };

        Some(d)
    }
}

impl From<u16> for StatusWord {
    fn from(code: u16) -> Self {
        Self(code)
    }
}

impl From<StatusWord> for u16 {
    fn from(sw: StatusWord) -> Self {
        sw.0
    }
}

/// Display the status word description, or the raw code where unknown
impl Display for StatusWord {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match (self.description(), self.pin_retries()) {
            (Some(d), Some(n)) => write!(f, "{d} ({n} tries remaining)"),
            (Some(d), None) => write!(f, "{d}"),
            (None, _) => write!(f, "Unknown status word 0x{:04X}", self.0),
        }
    }
}

impl Debug for StatusWord {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "StatusWord(0x{:04x})", self.0)
    }
}

/// On-card key index
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
pub struct Keyslot(u8);

impl Keyslot {
    /// Highest valid keyslot index
    pub const MAX: u8 = 15;

    /// Create a keyslot, rejecting indices above [Keyslot::MAX]
    pub const fn new(index: u8) -> Result<Self, ApduError> {
        if index > Self::MAX {
            return Err(ApduError::InvalidKeyslot(index));
        }
        Ok(Self(index))
    }

    /// Fetch the keyslot index
    pub const fn index(&self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Keyslot {
    type Error = ApduError;

    fn try_from(index: u8) -> Result<Self, Self::Error> {
        Self::new(index)
    }
}

impl Display for Keyslot {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}
