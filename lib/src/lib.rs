// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Satochip Nostr signing library (and CLI)
//!
//! This provides a [CardSession] for interacting with Satochip-class cards
//! over any [Exchange] transport, and a [Signer] orchestrating PIN entry,
//! PIN caching and message signing on top of the session.
//!
//! ```no_run
//! use satochip_nostr::{
//!     transport::{TcpOptions, TransportTcp},
//!     CardSession, PinPrompt, PinRequest, SignOutcome, Signer, SignerConfig,
//! };
//! use zeroize::Zeroizing;
//!
//! struct FixedPin;
//!
//! #[async_trait::async_trait]
//! impl PinPrompt for FixedPin {
//!     async fn request_pin(&mut self, req: PinRequest) -> Option<Zeroizing<String>> {
//!         match req {
//!             PinRequest::Initial => Some(Zeroizing::new("1234".to_string())),
//!             _ => None,
//!         }
//!     }
//! }
//!
//! # async fn example() -> anyhow::Result<()> {
//! let session = CardSession::default();
//! session.connect(TransportTcp::new(TcpOptions::default()).await?).await?;
//!
//! let mut signer = Signer::new(session, SignerConfig::default())?;
//!
//! if let SignOutcome::Signed(blob) = signer.sign_message("hello", &mut FixedPin).await {
//!     println!("{blob}");
//! }
//! # Ok(())
//! # }
//! ```

/// Re-export transports for consumer use
pub mod transport;
pub use transport::Exchange;

/// Re-export `satochip-apdu` for consumers
pub use satochip_apdu::{self as apdu};

/// Re-export `satochip-nostr-core` for consumers
pub use satochip_nostr_core::{self as nostr_core, message, PinCacheState, PinFormatError};

mod error;
pub use error::Error;

pub mod session;
pub use session::{CardEvent, CardSession, CardStatus, ConnectionState, SessionConfig};

pub mod signer;
pub use signer::{PinPrompt, PinRequest, SignOutcome, Signer, SignerConfig};
