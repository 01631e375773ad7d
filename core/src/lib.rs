// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Satochip Nostr signing core
//!
//! This provides the card-independent pieces of the signing bridge:
//!
//! - [PinCache][pin_cache::PinCache], holding a verified PIN in memory for a
//!   bounded time window so repeated signing requests do not prompt the user
//!   each time.
//! - The signed message [codec][message], which appends a hex encoded signature
//!   to message content (`content~signature`) and splits it back out on receipt,
//!   along with [verify][message::verify] for checking BIP-340 signatures over the
//!   SHA-256 hash of the content.
//!
//! Card communication lives in `satochip-nostr`, see [apdu] for the wire objects.
//!
//! ## Signed message format
//!
//! ```text
//! <content>~<lowercase hex signature>
//! ```
//!
//! The separator is located by its _last_ occurrence, so content may itself
//! contain `~`. A trailing separator with nothing following it is treated as
//! part of unsigned content.
//!

pub use satochip_apdu::{self as apdu};

mod clock;
pub use clock::{Clock, ManualClock, SystemClock};

pub mod message;
pub use message::{ParsedMessage, SEPARATOR};

pub mod pin_cache;
pub use pin_cache::{PinCache, PinCacheState, PinFormatError};
