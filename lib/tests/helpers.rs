// Copyright (c) 2022-2023 The MobileCoin Foundation

#![allow(unused)]

use std::{collections::VecDeque, str::FromStr};

use async_trait::async_trait;
use log::{debug, LevelFilter};
use simplelog::SimpleLogger;
use zeroize::Zeroizing;

use satochip_nostr::{CardSession, PinPrompt, PinRequest, SessionConfig};
use satochip_sim::{Options, SimTransport};

/// PIN configured on set-up simulated cards
pub const PIN: &str = "1234";

/// Setup logging and a simulated card with the provided options
pub fn setup(opts: Options) -> SimTransport {
    // Setup logging
    let log_level = match std::env::var("LOG_LEVEL").map(|v| LevelFilter::from_str(&v)) {
        Ok(Ok(l)) => l,
        _ => LevelFilter::Debug,
    };

    let _ = SimpleLogger::init(log_level, simplelog::Config::default());

    SimTransport::new(&opts)
}

/// Setup a simulated card with [PIN] configured and connect a session
pub async fn connect(opts: Options) -> (CardSession<SimTransport>, SimTransport) {
    let t = setup(Options {
        pin: Some(PIN.to_string()),
        ..opts
    });

    let s = CardSession::new(SessionConfig::default());
    s.connect(t.clone()).await.expect("connect failed");

    (s, t)
}

/// Scripted [PinPrompt], recording the requests it receives
#[derive(Default)]
pub struct ScriptedPrompt {
    entries: VecDeque<String>,
    pub requests: Vec<PinRequest>,
}

impl ScriptedPrompt {
    pub fn new(entries: &[&str]) -> Self {
        Self {
            entries: entries.iter().map(|e| e.to_string()).collect(),
            requests: vec![],
        }
    }
}

#[async_trait]
impl PinPrompt for ScriptedPrompt {
    async fn request_pin(&mut self, req: PinRequest) -> Option<Zeroizing<String>> {
        debug!("PIN request: {req:?}");

        self.requests.push(req);
        self.entries.pop_front().map(Zeroizing::new)
    }
}
