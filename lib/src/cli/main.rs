// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Command line utility for signing and verifying Nostr messages with a Satochip card

use clap::{Parser, Subcommand};
use log::{debug, error, info, LevelFilter};

use satochip_nostr::{
    apdu::Keyslot,
    message,
    transport::{TcpOptions, TransportTcp},
    CardSession, Error, SessionConfig, SignOutcome, Signer, SignerConfig,
};

mod helpers;
use helpers::*;

/// Satochip Nostr command line utility
#[derive(Clone, PartialEq, Debug, Parser)]
struct Options {
    #[clap(flatten)]
    tcp: TcpOptions,

    /// Subcommand to execute
    #[clap(subcommand)]
    cmd: Actions,

    /// Enable verbose logging
    #[clap(long, default_value = "info")]
    log_level: LevelFilter,
}

#[derive(Clone, PartialEq, Debug, Subcommand)]
#[non_exhaustive]
enum Actions {
    #[clap(flatten)]
    Card(CardActions),

    /// Verify a signed message (no card required)
    Verify {
        /// Signed message blob (`content~signature`)
        message: String,

        /// Hex encoded sender public key
        #[clap(long)]
        pubkey: String,
    },
}

/// Commands requiring a connected card
#[derive(Clone, PartialEq, Debug, Subcommand)]
enum CardActions {
    /// Fetch card status
    Status,

    /// Initialise a fresh card with the provided PIN
    Init {
        /// PIN to configure
        #[clap(long, env = "SATOCHIP_PIN")]
        pin: String,

        /// PUK (unblock code) to configure
        #[clap(long, env = "SATOCHIP_PUK")]
        puk: String,

        /// PIN retry limit
        #[clap(long, default_value_t = 5)]
        pin_tries: u8,
    },

    /// Fetch the x-only public key for a keyslot
    Pubkey {
        /// Card keyslot
        #[clap(long, default_value_t = 0)]
        keyslot: u8,
    },

    /// Check the card returns an attestation certificate
    Authenticate,

    /// Sign a message
    Sign {
        /// Message content
        message: String,

        /// Card keyslot
        #[clap(long, default_value_t = 0)]
        keyslot: u8,

        /// Card PIN, read from stdin if not provided
        #[clap(long, env = "SATOCHIP_PIN")]
        pin: Option<String>,

        /// Disable interactive PIN entry
        #[clap(long)]
        no_prompt: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let args = Options::parse();

    // Setup logging
    let _ = simplelog::SimpleLogger::init(args.log_level, simplelog::Config::default());

    // Handle commands not requiring a card
    let cmd = match args.cmd {
        Actions::Verify { message, pubkey } => return verify(&message, &pubkey),
        Actions::Card(c) => c,
    };

    // Setup session configuration
    let config = match &cmd {
        CardActions::Init {
            pin,
            puk,
            pin_tries,
        } => SessionConfig {
            initial_pin: pin.clone().into(),
            initial_puk: puk.clone().into(),
            pin_tries: *pin_tries,
            ..Default::default()
        },
        _ => SessionConfig::default(),
    };

    // Connect to card
    debug!("Connecting to {}", args.tcp.addr);

    let t = TransportTcp::new(args.tcp.clone()).await?;
    let s = CardSession::new(config);

    if let Err(e) = s.connect(t).await {
        error!("Failed to connect to card at {}", args.tcp.addr);
        return Err(e.into());
    }

    // Execute command
    execute(s, cmd).await
}

/// Verify a signed message blob against a sender public key
fn verify(blob: &str, pubkey: &str) -> anyhow::Result<()> {
    let p = message::parse(blob);
    let valid = message::verify_message(blob, pubkey);

    info!("content: {}", p.content);
    info!("signed: {}, valid: {}", p.is_signed(), valid);

    if !valid {
        return Err(anyhow::anyhow!("Signature verification failed"));
    }

    Ok(())
}

/// Execute a command with the provided session
async fn execute(s: CardSession<TransportTcp>, cmd: CardActions) -> anyhow::Result<()> {
    debug!("Executing command: {:?}", cmd);

    match cmd {
        CardActions::Status => {
            let status = s
                .status()
                .ok_or_else(|| anyhow::anyhow!("Card status unavailable"))?;

            println!("{}", serde_json::to_string_pretty(&status)?);
        }
        CardActions::Init { .. } => match s.initialize_card().await? {
            true => info!("Card initialised"),
            false => return Err(anyhow::anyhow!("Card initialisation failed")),
        },
        CardActions::Pubkey { keyslot } => {
            let keyslot = Keyslot::new(keyslot).map_err(Error::from)?;
            let k = s.public_key(keyslot).await?;

            match k.as_deref().and_then(message::x_only_key) {
                Some(k) => println!("{}", hex::encode(k)),
                None => return Err(anyhow::anyhow!("No public key for keyslot {keyslot}")),
            }
        }
        CardActions::Authenticate => {
            let ok = s.verify_card_authenticity().await?;

            info!("attestation certificate present: {ok}");
        }
        CardActions::Sign {
            message,
            keyslot,
            pin,
            no_prompt,
        } => {
            let mut signer = Signer::new(
                s,
                SignerConfig {
                    keyslot,
                    ..Default::default()
                },
            )?;
            let mut prompt = CliPrompt::new(pin, !no_prompt);

            match signer.sign_message(&message, &mut prompt).await {
                SignOutcome::Signed(blob) => println!("{blob}"),
                SignOutcome::InvalidPinFormat(e) => {
                    return Err(anyhow::anyhow!("Signing failed: {e}"))
                }
                o => return Err(anyhow::anyhow!("Signing failed: {o:?}")),
            }
        }
    }

    Ok(())
}
