// Copyright (c) 2022-2023 The MobileCoin Foundation

use std::net::SocketAddr;

use tokio::net::TcpListener;

use satochip_nostr::{
    transport::{TcpOptions, TransportTcp},
    CardSession, Error, SessionConfig, SignOutcome, Signer, SignerConfig,
};
use satochip_sim::{serve, Options};

mod helpers;
use helpers::*;

/// Start a simulated card listening on a free local port
async fn start_sim(opts: Options) -> TcpOptions {
    let t = setup(opts);

    let port = portpicker::pick_unused_port().expect("no free ports");
    let addr = SocketAddr::from(([127, 0, 0, 1], port));

    let l = TcpListener::bind(addr).await.unwrap();
    tokio::spawn(serve(l, t));

    TcpOptions {
        addr,
        ..Default::default()
    }
}

#[tokio::test]
async fn sign_over_tcp() {
    let opts = start_sim(Options {
        pin: Some(PIN.to_string()),
        fixed_signature: Some(vec![0xab, 0xcd]),
        ..Default::default()
    })
    .await;

    let t = TransportTcp::new(opts).await.unwrap();
    let s = CardSession::new(SessionConfig::default());

    let status = s.connect(t).await.unwrap();
    assert!(status.setup_done);

    let mut signer = Signer::new(s, SignerConfig::default()).unwrap();

    let mut prompt = ScriptedPrompt::new(&["0000", PIN]);
    let r = signer.sign_message("hello", &mut prompt).await;

    assert_eq!(r, SignOutcome::Signed("hello~abcd".to_string()));
    assert_eq!(prompt.requests.len(), 2);

    assert!(signer.public_key().await.unwrap().is_some());
}

#[tokio::test]
async fn initialize_over_tcp() {
    let opts = start_sim(Options::default()).await;

    let s = CardSession::new(SessionConfig::default());
    let status = s.connect(TransportTcp::new(opts.clone()).await.unwrap()).await.unwrap();
    assert!(!status.setup_done);

    assert!(s.initialize_card().await.unwrap());
    assert!(s.status().unwrap().setup_done);

    // Card state is retained across connections
    let status = s.connect(TransportTcp::new(opts).await.unwrap()).await.unwrap();
    assert!(status.setup_done);
    assert!(s.verify_pin(PIN).await.unwrap());
}

#[tokio::test]
async fn connect_refused() {
    let port = portpicker::pick_unused_port().expect("no free ports");

    let r = TransportTcp::new(TcpOptions {
        addr: SocketAddr::from(([127, 0, 0, 1], port)),
        timeout_ms: 500,
    })
    .await;

    assert!(matches!(r, Err(Error::Transport(_))));
}
