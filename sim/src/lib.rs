// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Software Satochip card for testing
//!
//! This provides a [SimCard] implementing the applet behaviour used by
//! `satochip-nostr`, a [SimTransport] for in-process use and [serve] for
//! exposing a simulated card over TCP (see the `satochip-sim` binary).

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};

use async_trait::async_trait;
use log::{debug, error, info};
use tokio::net::{TcpListener, TcpStream};

use satochip_apdu::{MAX_COMMAND_LEN, MAX_RESPONSE_LEN};
use satochip_nostr::{
    transport::{read_frame, write_frame},
    Exchange,
};

mod card;
pub use card::{SimCard, APPLET_VERSION, NUM_KEYSLOTS, PROTOCOL_VERSION};

/// Simulated card options
#[derive(Clone, Debug, PartialEq)]
pub struct Options {
    /// Pre-configured PIN, the card is set up when provided
    pub pin: Option<String>,
    pub pin_tries: u8,
    /// PUK configured alongside a pre-configured PIN
    pub puk: String,
    pub puk_tries: u8,
    /// Seed for keyslot derivation, random if not provided
    pub seed: Option<Vec<u8>>,
    /// Leave keyslots empty
    pub no_seed: bool,
    /// Return a fixed signature for all signing requests
    pub fixed_signature: Option<Vec<u8>>,
    /// Attestation certificate, generated if not provided
    pub certificate: Option<Vec<u8>>,
    /// Return an empty attestation certificate
    pub no_certificate: bool,
    /// Reject applet selection
    pub no_applet: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            pin: None,
            pin_tries: 5,
            puk: "12345678".to_string(),
            puk_tries: 5,
            seed: None,
            no_seed: false,
            fixed_signature: None,
            certificate: None,
            no_certificate: false,
            no_applet: false,
        }
    }
}

impl Options {
    /// Resolve the attestation certificate
    pub(crate) fn certificate(&self) -> Vec<u8> {
        match &self.certificate {
            Some(c) => c.clone(),
            None => b"satochip-sim attestation".to_vec(),
        }
    }
}

/// Simulator errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Card removed from the simulated reader
    #[error("card removed")]
    CardRemoved,

    /// Response encoding failed
    #[error("response encoding failed: {0}")]
    Encoding(satochip_apdu::ApduError),
}

/// In-process transport for a [SimCard]
///
/// Clones share the same card, allowing tests to retain a handle for
/// inspecting card state or simulating card removal.
#[derive(Clone)]
pub struct SimTransport {
    card: Arc<Mutex<SimCard>>,
    present: Arc<AtomicBool>,
}

impl SimTransport {
    /// Create a transport for a new [SimCard]
    pub fn new(opts: &Options) -> Self {
        Self::from(SimCard::new(opts))
    }

    /// Simulate card insertion / removal
    pub fn set_present(&self, present: bool) {
        self.present.store(present, Ordering::SeqCst);
    }

    /// Access the simulated card
    pub fn with_card<R>(&self, f: impl FnOnce(&mut SimCard) -> R) -> R {
        let mut c = match self.card.lock() {
            Ok(c) => c,
            Err(e) => e.into_inner(),
        };
        f(&mut *c)
    }
}

impl From<SimCard> for SimTransport {
    fn from(c: SimCard) -> Self {
        Self {
            card: Arc::new(Mutex::new(c)),
            present: Arc::new(AtomicBool::new(true)),
        }
    }
}

#[async_trait]
impl Exchange for SimTransport {
    type Error = Error;

    async fn exchange(&self, command: &[u8], response: &mut [u8]) -> Result<usize, Error> {
        if !self.present.load(Ordering::SeqCst) {
            return Err(Error::CardRemoved);
        }

        self.with_card(|c| c.process(command, response))
            .map_err(Error::Encoding)
    }
}

/// Serve a simulated card over TCP.
///
/// APDUs are framed with a big-endian `u16` length prefix, matching
/// [TransportTcp][satochip_nostr::transport::TransportTcp]. Connections are
/// handled one at a time, each connection sharing the same card state.
pub async fn serve(l: TcpListener, t: SimTransport) -> anyhow::Result<()> {
    info!("Listening on {}", l.local_addr()?);

    loop {
        let (s, addr) = l.accept().await?;

        debug!("Accepted connection from {addr}");

        match handle(s, &t).await {
            Ok(()) => debug!("Connection from {addr} closed"),
            Err(e) => error!("Connection from {addr} failed: {e}"),
        }
    }
}

/// Process framed APDUs until the peer disconnects
async fn handle(mut s: TcpStream, t: &SimTransport) -> anyhow::Result<()> {
    let mut cmd = [0u8; MAX_COMMAND_LEN];
    let mut resp = [0u8; MAX_RESPONSE_LEN];

    loop {
        let n = match read_frame(&mut s, &mut cmd).await {
            Ok(n) => n,
            Err(satochip_nostr::Error::Transport(_)) => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        let n = t.exchange(&cmd[..n], &mut resp).await?;

        write_frame(&mut s, &resp[..n]).await?;
    }
}

#[cfg(test)]
mod test {
    use std::net::SocketAddr;

    use encdec::Decode;
    use satochip_apdu::{encode_command, prelude::*, split_response, SATOCHIP_AID};

    use super::*;

    #[tokio::test]
    async fn serve_framed_apdus() {
        let port = portpicker::pick_unused_port().expect("no free ports");
        let addr = SocketAddr::from(([127, 0, 0, 1], port));

        let t = SimTransport::new(&Options {
            pin: Some("1234".to_string()),
            ..Default::default()
        });

        let l = TcpListener::bind(addr).await.unwrap();
        tokio::spawn(serve(l, t));

        let mut s = TcpStream::connect(addr).await.unwrap();
        let mut cmd = [0u8; MAX_COMMAND_LEN];
        let mut resp = [0u8; MAX_RESPONSE_LEN];

        let n = encode_command(&SelectReq::new(SATOCHIP_AID), &mut cmd).unwrap();
        write_frame(&mut s, &cmd[..n]).await.unwrap();
        let n = read_frame(&mut s, &mut resp).await.unwrap();
        assert_eq!(split_response(&resp[..n]).unwrap().1, StatusWord::SUCCESS);

        let n = encode_command(&StatusReq {}, &mut cmd).unwrap();
        write_frame(&mut s, &cmd[..n]).await.unwrap();
        let n = read_frame(&mut s, &mut resp).await.unwrap();

        let (data, sw) = split_response(&resp[..n]).unwrap();
        assert_eq!(sw, StatusWord::SUCCESS);

        let (status, _) = StatusResp::decode(data).unwrap();
        assert!(status.setup_done);
        assert_eq!(status.pin_tries_remaining, 5);
    }

    #[tokio::test]
    async fn removed_card() {
        let t = SimTransport::new(&Options::default());
        let mut resp = [0u8; MAX_RESPONSE_LEN];

        t.set_present(false);

        let r = t.exchange(&[0x00, 0xa4, 0x04, 0x00, 0x00], &mut resp).await;
        assert!(matches!(r, Err(Error::CardRemoved)));
    }
}
