// Copyright (c) 2022-2023 The MobileCoin Foundation

use std::net::SocketAddr;

use clap::Parser;
use log::{debug, info, LevelFilter};
use tokio::net::TcpListener;

use satochip_sim::*;

/// Satochip card simulator
///
/// This serves a software Satochip applet over TCP for use with
/// `satochip-nostr-cli` or the `satochip-nostr` library.
#[derive(Clone, Debug, PartialEq, Parser)]
pub struct Args {
    /// Listen address
    #[clap(long, env, default_value = "127.0.0.1:9999")]
    listen: SocketAddr,

    /// Pre-configured PIN (the card starts set up when provided)
    #[clap(long, env = "SIM_PIN")]
    pin: Option<String>,

    /// PIN retry limit for a pre-configured PIN
    #[clap(long, default_value_t = 5)]
    pin_tries: u8,

    /// PUK for a pre-configured PIN
    #[clap(long, default_value = "12345678")]
    puk: String,

    /// Hex encoded seed for keyslot derivation (random if not provided)
    #[clap(long, env = "SIM_SEED", value_parser = parse_hex)]
    seed: Option<HexData>,

    /// Leave keyslots empty
    #[clap(long)]
    no_seed: bool,

    /// Hex encoded signature returned for all signing requests
    #[clap(long, value_parser = parse_hex)]
    fixed_signature: Option<HexData>,

    /// Return an empty attestation certificate
    #[clap(long)]
    no_certificate: bool,

    /// Log level
    #[clap(long, default_value = "debug")]
    log_level: LevelFilter,
}

#[derive(Clone, Debug, PartialEq)]
struct HexData(Vec<u8>);

fn parse_hex(s: &str) -> Result<HexData, hex::FromHexError> {
    hex::decode(s).map(HexData)
}

impl From<&Args> for Options {
    fn from(a: &Args) -> Self {
        Self {
            pin: a.pin.clone(),
            pin_tries: a.pin_tries,
            puk: a.puk.clone(),
            seed: a.seed.as_ref().map(|s| s.0.clone()),
            no_seed: a.no_seed,
            fixed_signature: a.fixed_signature.as_ref().map(|s| s.0.clone()),
            no_certificate: a.no_certificate,
            ..Default::default()
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Setup logging
    let _ = simplelog::SimpleLogger::init(args.log_level, simplelog::Config::default());

    let opts = Options::from(&args);
    debug!(
        "Card setup: {}, seeded: {}",
        opts.pin.is_some(),
        !opts.no_seed
    );

    let t = SimTransport::new(&opts);
    let l = TcpListener::bind(args.listen).await?;

    // Serve until exit signal
    tokio::select!(
        r = serve(l, t) => r?,
        // Exit on ctrl + c
        _ = tokio::signal::ctrl_c() => {
            info!("Exit!");
        },
    );

    Ok(())
}
