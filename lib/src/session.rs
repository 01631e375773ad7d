// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Session handle for a connected Satochip card
//!
//! A [CardSession] owns the card transport and the status snapshot fetched at
//! connect time. Connection state is published through a [watch] channel for
//! non-blocking reads and connection events through a [broadcast] channel.
//!
//! Card operations fail fast with [Error::NotConnected] when no card is
//! present. Card rejections and transport failures are otherwise collapsed
//! to `false` / `None` at this boundary, with the underlying status word
//! logged for diagnostics.

use std::sync::Arc;

use encdec::Decode;
use log::{debug, warn};
use serde::Serialize;
use tokio::sync::{broadcast, watch, MappedMutexGuard, Mutex, MutexGuard};
use zeroize::Zeroizing;

use satochip_apdu::{
    encode_command,
    prelude::*,
    split_response, ApduReq, MAX_COMMAND_LEN, MAX_RESPONSE_LEN, SATOCHIP_AID,
};

use satochip_nostr_core::pin_cache::validate_format;

use crate::{Error, Exchange};

/// Card status snapshot, fetched on connect
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CardStatus {
    /// Applet protocol version (`major.minor`)
    pub protocol_version: String,
    /// Applet firmware version (`major.minor`)
    pub applet_version: String,
    pub pin_tries_remaining: u8,
    pub puk_tries_remaining: u8,
    pub needs_2fa: bool,
    /// Card holds key material
    pub seeded: bool,
    /// PIN / PUK configured
    pub setup_done: bool,
    pub needs_secure_channel: bool,
}

impl From<&StatusResp> for CardStatus {
    fn from(r: &StatusResp) -> Self {
        Self {
            protocol_version: format!("{}.{}", r.protocol_major, r.protocol_minor),
            applet_version: format!("{}.{}", r.applet_major, r.applet_minor),
            pin_tries_remaining: r.pin_tries_remaining,
            puk_tries_remaining: r.puk_tries_remaining,
            needs_2fa: r.needs_2fa,
            seeded: r.seeded,
            setup_done: r.setup_done,
            needs_secure_channel: r.needs_secure_channel,
        }
    }
}

/// Observable connection state
#[derive(Clone, Debug, PartialEq)]
pub enum ConnectionState {
    Disconnected,
    Connected(CardStatus),
}

/// Connection events published by a [CardSession]
#[derive(Clone, Debug, PartialEq)]
pub enum CardEvent {
    /// Card connected, applet selected and status fetched
    Connected(CardStatus),
    /// Connection attempt failed
    ConnectFailed(String),
    /// Card disconnected
    Disconnected,
}

/// Card provisioning configuration, used by [CardSession::initialize_card]
#[derive(Clone)]
pub struct SessionConfig {
    /// PIN configured on a fresh card
    pub initial_pin: Zeroizing<String>,
    /// PUK (unblock code) configured on a fresh card
    pub initial_puk: Zeroizing<String>,
    /// PIN retry limit
    pub pin_tries: u8,
    /// PUK retry limit
    pub puk_tries: u8,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            initial_pin: Zeroizing::new("1234".to_string()),
            initial_puk: Zeroizing::new("12345678".to_string()),
            pin_tries: 5,
            puk_tries: 5,
        }
    }
}

impl core::fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SessionConfig")
            .field("pin_tries", &self.pin_tries)
            .field("puk_tries", &self.puk_tries)
            .finish_non_exhaustive()
    }
}

struct Inner<T> {
    /// Transport for the connected card
    t: Mutex<Option<T>>,
    /// Connection state
    state: watch::Sender<ConnectionState>,
    /// Connection events
    events: broadcast::Sender<CardEvent>,
    config: SessionConfig,
}

/// Handle for a (possibly) connected card.
///
/// This is generic over [Exchange] to support different transports and is
/// cheap to clone, clones share the same connection.
pub struct CardSession<T: Exchange> {
    inner: Arc<Inner<T>>,
}

impl<T: Exchange> Clone for CardSession<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Exchange + Send + Sync> Default for CardSession<T> {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

impl<T: Exchange + Send + Sync> CardSession<T> {
    /// Create a disconnected session
    pub fn new(config: SessionConfig) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        let (events, _) = broadcast::channel(16);

        Self {
            inner: Arc::new(Inner {
                t: Mutex::new(None),
                state,
                events,
                config,
            }),
        }
    }

    /// Subscribe to connection events
    pub fn subscribe(&self) -> broadcast::Receiver<CardEvent> {
        self.inner.events.subscribe()
    }

    /// Watch connection state
    pub fn watch(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state.subscribe()
    }

    /// Fetch the current connection state
    pub fn state(&self) -> ConnectionState {
        self.inner.state.borrow().clone()
    }

    /// Check whether a card is connected
    pub fn is_connected(&self) -> bool {
        matches!(*self.inner.state.borrow(), ConnectionState::Connected(_))
    }

    /// Fetch the status snapshot from the last (re)connect
    pub fn status(&self) -> Option<CardStatus> {
        match &*self.inner.state.borrow() {
            ConnectionState::Connected(s) => Some(s.clone()),
            ConnectionState::Disconnected => None,
        }
    }

    /// Connect to a card via the provided transport, replacing any existing
    /// connection.
    ///
    /// This selects the applet and fetches the card status, on failure the
    /// session is left disconnected and [CardEvent::ConnectFailed] is published.
    pub async fn connect(&self, t: T) -> Result<CardStatus, Error> {
        let mut g = self.inner.t.lock().await;

        // Drop any previous connection
        self.inner.state.send_replace(ConnectionState::Disconnected);
        if g.take().is_some() {
            debug!("Replacing existing card connection");
            let _ = self.inner.events.send(CardEvent::Disconnected);
        }

        debug!("Connecting to card");

        match select(&t).await {
            Ok(status) => {
                debug!("Card connected: {status:?}");

                *g = Some(t);
                self.inner
                    .state
                    .send_replace(ConnectionState::Connected(status.clone()));
                let _ = self.inner.events.send(CardEvent::Connected(status.clone()));

                Ok(status)
            }
            Err(e) => {
                warn!("Card connection failed: {e}");

                let _ = self.inner.events.send(CardEvent::ConnectFailed(e.to_string()));

                Err(e)
            }
        }
    }

    /// Disconnect from the card, dropping the transport
    pub async fn disconnect(&self) {
        let mut g = self.inner.t.lock().await;

        let was_connected = g.take().is_some();
        self.inner.state.send_replace(ConnectionState::Disconnected);

        if was_connected {
            debug!("Card disconnected");
            let _ = self.inner.events.send(CardEvent::Disconnected);
        }
    }

    /// Verify the user PIN.
    ///
    /// Returns `true` iff the card accepts the PIN, card rejections and
    /// transport errors both return `false`.
    pub async fn verify_pin(&self, pin: &str) -> Result<bool, Error> {
        let t = self.transport().await?;
        let mut buff = [0u8; MAX_RESPONSE_LEN];

        debug!("Verifying PIN");

        let r = request::<_, Ack>(&*t, VerifyPinReq::new(pin.as_bytes()), &mut buff).await;

        Ok(collapse("PIN verification", r).is_some())
    }

    /// Sign a pre-computed hash with the key in the provided [Keyslot]
    pub async fn sign(
        &self,
        hash: &[u8; HASH_LEN],
        keyslot: Keyslot,
    ) -> Result<Option<Vec<u8>>, Error> {
        let t = self.transport().await?;
        let mut buff = [0u8; MAX_RESPONSE_LEN];

        debug!("Requesting signature (keyslot: {keyslot})");

        let r = request::<_, SignResp>(&*t, SignHashReq::new(keyslot, *hash), &mut buff)
            .await
            .map(|r| r.signature.to_vec());

        Ok(collapse("Signing", r))
    }

    /// Fetch the public key for the provided [Keyslot]
    pub async fn public_key(&self, keyslot: Keyslot) -> Result<Option<Vec<u8>>, Error> {
        let t = self.transport().await?;
        let mut buff = [0u8; MAX_RESPONSE_LEN];

        debug!("Requesting public key (keyslot: {keyslot})");

        let r = request::<_, PubKeyResp>(&*t, PubKeyReq::new(keyslot), &mut buff)
            .await
            .map(|r| r.public_key.to_vec());

        Ok(collapse("Public key request", r).filter(|k| !k.is_empty()))
    }

    /// Check card authenticity.
    ///
    /// NOTE: this only checks that the card returns a non-empty attestation
    /// certificate, the certificate chain is not validated.
    pub async fn verify_card_authenticity(&self) -> Result<bool, Error> {
        let t = self.transport().await?;
        let mut buff = [0u8; MAX_RESPONSE_LEN];

        debug!("Requesting attestation certificate");

        let r = request::<_, PkiCertResp>(&*t, PkiCertReq {}, &mut buff)
            .await
            .map(|r| r.certificate.len());

        Ok(matches!(collapse("Attestation", r), Some(n) if n > 0))
    }

    /// Provision a fresh card with the configured initial PIN and PUK.
    ///
    /// Refused (returning `false`) when the card reports setup as already
    /// done. On success the status snapshot is refreshed.
    pub async fn initialize_card(&self) -> Result<bool, Error> {
        let t = self.transport().await?;

        if matches!(self.status(), Some(s) if s.setup_done) {
            warn!("Refusing to initialise card, setup already done");
            return Ok(false);
        }

        let c = &self.inner.config;

        // A PIN the signer would refuse leaves the card unusable
        if let Err(e) = validate_format(&c.initial_pin) {
            warn!("Refusing to initialise card, invalid initial PIN: {e}");
            return Ok(false);
        }

        let mut buff = [0u8; MAX_RESPONSE_LEN];

        debug!("Initialising card");

        let req = SetupReq::new(
            c.pin_tries,
            c.initial_pin.as_bytes(),
            c.puk_tries,
            c.initial_puk.as_bytes(),
        );
        if collapse("Card setup", request::<_, Ack>(&*t, req, &mut buff).await).is_none() {
            return Ok(false);
        }

        // Refresh status so subsequent requests see the configured card
        let status = match fetch_status(&*t).await {
            Ok(s) => s,
            Err(e) => {
                warn!("Status refresh failed: {e}");
                let mut s = self.status().ok_or(Error::NotConnected)?;
                s.setup_done = true;
                s
            }
        };

        debug!("Card initialised: {status:?}");

        self.inner
            .state
            .send_replace(ConnectionState::Connected(status));

        Ok(true)
    }

    /// Lock the connected transport, failing fast when disconnected
    async fn transport(&self) -> Result<MappedMutexGuard<'_, T>, Error> {
        if !self.is_connected() {
            return Err(Error::NotConnected);
        }

        let g = self.inner.t.lock().await;

        MutexGuard::try_map(g, |t| t.as_mut()).map_err(|_| Error::NotConnected)
    }
}

/// Collapse operation errors to `None`, logging the cause
fn collapse<R>(op: &str, r: Result<R, Error>) -> Option<R> {
    match r {
        Ok(v) => Some(v),
        Err(Error::Status(sw)) => {
            warn!("{}", rejection(op, sw));
            None
        }
        Err(e) => {
            warn!("{op} failed: {e}");
            None
        }
    }
}

/// Describe a card rejection, [StatusWord]'s display includes PIN retries
fn rejection(op: &str, sw: StatusWord) -> String {
    format!("{op} rejected by card: {sw} ({sw:?})")
}

/// Select the applet and fetch the card status
async fn select<T: Exchange>(t: &T) -> Result<CardStatus, Error> {
    let mut buff = [0u8; MAX_RESPONSE_LEN];

    request::<_, Ack>(t, SelectReq::new(SATOCHIP_AID), &mut buff).await?;

    fetch_status(t).await
}

/// Fetch and decode the card status
async fn fetch_status<T: Exchange>(t: &T) -> Result<CardStatus, Error> {
    let mut buff = [0u8; MAX_RESPONSE_LEN];

    let resp = request::<_, StatusResp>(t, StatusReq {}, &mut buff).await?;

    Ok(CardStatus::from(&resp))
}

/// Issue a request, checking the status word and decoding the response payload
async fn request<'b, T, RESP>(t: &T, req: impl ApduReq, buff: &'b mut [u8]) -> Result<RESP, Error>
where
    T: Exchange,
    RESP: Decode<'b, Output = RESP, Error = ApduError>,
{
    let mut cmd = [0u8; MAX_COMMAND_LEN];
    let n = encode_command(&req, &mut cmd)?;

    let n = t
        .exchange(&cmd[..n], buff)
        .await
        .map_err(|e| Error::Transport(e.to_string()))?;

    let buff: &'b [u8] = buff;
    let (data, sw) = split_response(&buff[..n])?;

    if !sw.is_success() {
        return Err(Error::Status(sw));
    }

    let (resp, _) = RESP::decode(data)?;

    Ok(resp)
}
