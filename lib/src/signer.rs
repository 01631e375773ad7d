// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Message signing orchestration
//!
//! A [Signer] drives a single sign request against a [CardSession]:
//!
//! 1. Fail with [SignOutcome::NoCard] if no card is connected
//! 2. Fail with [SignOutcome::SetupRequired] if the card is not set up
//! 3. Re-verify a cached PIN if one is held, clearing it on failure
//! 4. Otherwise request a PIN via [PinPrompt], validating and verifying
//!    each entry until the card accepts one or the prompt is declined
//! 5. Sign the SHA-256 hash of the message and encode the signed blob
//!
//! Only the [PinCache] persists between requests.

use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use zeroize::Zeroizing;

use satochip_apdu::Keyslot;
use satochip_nostr_core::{
    message::{self, content_hash},
    pin_cache::{validate_format, PIN_TIMEOUT},
    Clock, PinCache, PinCacheState, PinFormatError, SystemClock,
};

use crate::{
    session::{CardSession, ConnectionState},
    Error, Exchange,
};

/// Signer configuration
#[derive(Clone, Debug, PartialEq)]
pub struct SignerConfig {
    /// Lifetime of a cached PIN
    pub pin_timeout: Duration,
    /// Card keyslot used for signing
    pub keyslot: u8,
}

impl Default for SignerConfig {
    fn default() -> Self {
        Self {
            pin_timeout: PIN_TIMEOUT,
            keyslot: 0,
        }
    }
}

/// Reason for a PIN request
#[derive(Copy, Clone, Debug, PartialEq, strum::Display)]
pub enum PinRequest {
    /// No valid PIN cached
    Initial,
    /// The previous entry was malformed
    InvalidFormat(PinFormatError),
    /// The previous entry was rejected by the card
    WrongPin,
}

/// Source of user PIN entries
#[async_trait]
pub trait PinPrompt: Send {
    /// Request a PIN, returning `None` if the user declines
    async fn request_pin(&mut self, req: PinRequest) -> Option<Zeroizing<String>>;
}

/// Terminal outcome of a sign request
#[derive(Clone, Debug, PartialEq)]
pub enum SignOutcome {
    /// Signed message blob (`content~signature`)
    Signed(String),
    /// No card connected
    NoCard,
    /// Card must be initialised before signing
    SetupRequired,
    /// Last PIN entry was malformed and the prompt was declined
    InvalidPinFormat(PinFormatError),
    /// Last PIN entry was rejected and the prompt was declined
    WrongPin,
    /// Card failed to produce a signature
    SigningFailed,
    /// Prompt declined without any PIN entry
    Cancelled,
}

impl SignOutcome {
    /// Fetch the signed blob for successful outcomes
    pub fn signed(&self) -> Option<&str> {
        match self {
            SignOutcome::Signed(s) => Some(s),
            _ => None,
        }
    }
}

/// Message signer, combining a [CardSession] and [PinCache]
pub struct Signer<T: Exchange, C: Clock = SystemClock> {
    session: CardSession<T>,
    pin_cache: PinCache<C>,
    keyslot: Keyslot,
}

impl<T: Exchange + Send + Sync> Signer<T, SystemClock> {
    /// Create a new signer using the system clock
    pub fn new(session: CardSession<T>, config: SignerConfig) -> Result<Self, Error> {
        Self::with_clock(session, config, SystemClock)
    }
}

impl<T: Exchange + Send + Sync, C: Clock + Send> Signer<T, C> {
    /// Create a new signer with the provided [Clock]
    pub fn with_clock(session: CardSession<T>, config: SignerConfig, clock: C) -> Result<Self, Error> {
        let keyslot = Keyslot::new(config.keyslot)?;

        Ok(Self {
            session,
            pin_cache: PinCache::with_clock(clock, config.pin_timeout),
            keyslot,
        })
    }

    /// Fetch the underlying [CardSession]
    pub fn session(&self) -> &CardSession<T> {
        &self.session
    }

    /// Fetch the signing keyslot
    pub fn keyslot(&self) -> Keyslot {
        self.keyslot
    }

    /// Sign a plaintext message, requesting a PIN via `prompt` if required
    pub async fn sign_message<P: PinPrompt + ?Sized>(
        &mut self,
        plaintext: &str,
        prompt: &mut P,
    ) -> SignOutcome {
        let status = match self.session.status() {
            Some(s) => s,
            None => {
                debug!("Sign request without card");
                return SignOutcome::NoCard;
            }
        };

        if !status.setup_done {
            debug!("Sign request for card without setup");
            return SignOutcome::SetupRequired;
        }

        // Re-verify cached PIN where available
        let cached = self
            .pin_cache
            .valid_pin()
            .map(|p| Zeroizing::new(p.to_string()));

        let verified = match cached {
            Some(pin) => match self.session.verify_pin(&pin).await {
                Ok(true) => true,
                Ok(false) => {
                    warn!("Cached PIN rejected, clearing cache");
                    self.pin_cache.clear();
                    false
                }
                Err(_) => return SignOutcome::NoCard,
            },
            None => false,
        };

        if !verified {
            if let Err(o) = self.prompt_pin(prompt).await {
                return o;
            }
        }

        // Sign message hash
        let hash = content_hash(plaintext);

        match self.session.sign(&hash, self.keyslot).await {
            Ok(Some(sig)) => SignOutcome::Signed(message::encode(plaintext, &hex::encode(sig))),
            Ok(None) => SignOutcome::SigningFailed,
            Err(_) => SignOutcome::NoCard,
        }
    }

    /// Request PINs until one is accepted by the card or the prompt is declined
    async fn prompt_pin<P: PinPrompt + ?Sized>(&mut self, prompt: &mut P) -> Result<(), SignOutcome> {
        let mut req = PinRequest::Initial;
        let mut last = SignOutcome::Cancelled;

        loop {
            let pin = match prompt.request_pin(req).await {
                Some(p) => p,
                None => {
                    debug!("PIN prompt declined");
                    return Err(last);
                }
            };

            if let Err(e) = validate_format(&pin) {
                debug!("Invalid PIN format: {e}");
                req = PinRequest::InvalidFormat(e);
                last = SignOutcome::InvalidPinFormat(e);
                continue;
            }

            match self.session.verify_pin(&pin).await {
                Ok(true) => {
                    // Format already checked, storage cannot fail
                    let _ = self.pin_cache.store_pin(&pin);
                    return Ok(());
                }
                Ok(false) => {
                    req = PinRequest::WrongPin;
                    last = SignOutcome::WrongPin;
                }
                Err(_) => return Err(SignOutcome::NoCard),
            }
        }
    }

    /// Verify a received message blob against the sender's public key
    pub fn verify_message(&self, blob: &str, public_key_hex: &str) -> bool {
        message::verify_message(blob, public_key_hex)
    }

    /// Fetch the card connection state
    pub fn card_connection_state(&self) -> ConnectionState {
        self.session.state()
    }

    /// Fetch the PIN cache state
    pub fn pin_cache_state(&mut self) -> PinCacheState {
        self.pin_cache.state()
    }

    /// Clear any cached PIN
    pub fn clear_pin(&mut self) {
        self.pin_cache.clear()
    }

    /// Fetch the x-only (BIP-340) public key for the signing keyslot, hex encoded
    pub async fn public_key(&self) -> Result<Option<String>, Error> {
        let k = match self.session.public_key(self.keyslot).await? {
            Some(k) => k,
            None => return Ok(None),
        };

        Ok(message::x_only_key(&k).map(hex::encode))
    }
}
