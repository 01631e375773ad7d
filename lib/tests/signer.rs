// Copyright (c) 2022-2023 The MobileCoin Foundation

use std::time::Duration;

use satochip_nostr::{
    apdu::Keyslot,
    message, nostr_core::ManualClock, CardSession, PinCacheState, PinFormatError, PinRequest,
    SessionConfig, SignOutcome, Signer, SignerConfig,
};
use satochip_sim::{Options, SimTransport};

mod helpers;
use helpers::*;

fn signer(s: CardSession<SimTransport>) -> (Signer<SimTransport, ManualClock>, ManualClock) {
    let c = ManualClock::new();
    let signer = Signer::with_clock(s, SignerConfig::default(), c.clone()).unwrap();
    (signer, c)
}

#[tokio::test]
async fn sign_hello_with_fixed_signature() {
    let (s, _t) = connect(Options {
        fixed_signature: Some(vec![0xab, 0xcd]),
        ..Default::default()
    })
    .await;

    let status = s.status().unwrap();
    assert!(status.seeded);
    assert!(status.setup_done);

    let (mut signer, _c) = signer(s);
    assert_eq!(signer.pin_cache_state(), PinCacheState::Empty);

    let mut prompt = ScriptedPrompt::new(&[PIN]);

    let r = signer.sign_message("hello", &mut prompt).await;
    assert_eq!(r, SignOutcome::Signed("hello~abcd".to_string()));
    assert_eq!(prompt.requests, vec![PinRequest::Initial]);

    assert!(matches!(
        signer.pin_cache_state(),
        PinCacheState::ValidFor(_)
    ));
}

#[tokio::test]
async fn cached_pin_skips_prompt() {
    let (s, t) = connect(Options {
        seed: Some(vec![0x42; 32]),
        ..Default::default()
    })
    .await;
    let (mut signer, c) = signer(s);

    let pubkey = signer.public_key().await.unwrap().unwrap();

    let mut prompt = ScriptedPrompt::new(&[PIN]);
    let a = signer.sign_message("hello", &mut prompt).await;

    // Reconnect to reset the card PIN session, the cached PIN is re-verified
    c.advance(Duration::from_secs(5 * 60));
    signer.session().connect(t).await.unwrap();

    let b = signer.sign_message("world", &mut prompt).await;

    assert_eq!(prompt.requests.len(), 1);

    let a = a.signed().unwrap().to_string();
    let b = b.signed().unwrap().to_string();

    assert!(b.starts_with("world~"));
    assert_eq!(b.len(), "world~".len() + 128);

    // Real signatures verify against the card key
    assert!(signer.verify_message(&a, &pubkey));
    assert!(signer.verify_message(&b, &pubkey));
    assert!(message::verify_message(&b, &pubkey));
    assert!(!signer.verify_message(&b.replace("world", "w0rld"), &pubkey));
}

#[tokio::test]
async fn expired_pin_prompts_again() {
    let (s, _t) = connect(Options::default()).await;
    let (mut signer, c) = signer(s);

    let mut prompt = ScriptedPrompt::new(&[PIN, PIN]);

    signer.sign_message("one", &mut prompt).await.signed().unwrap();

    c.advance(Duration::from_secs(10 * 60));
    assert_eq!(signer.pin_cache_state(), PinCacheState::Empty);

    signer.sign_message("two", &mut prompt).await.signed().unwrap();

    assert_eq!(prompt.requests, vec![PinRequest::Initial, PinRequest::Initial]);
}

#[tokio::test]
async fn setup_required_without_prompt() {
    let t = setup(Options::default());

    let s = CardSession::new(SessionConfig::default());
    let status = s.connect(t).await.unwrap();
    assert!(!status.setup_done);

    let (mut signer, _c) = signer(s);

    let mut prompt = ScriptedPrompt::new(&[PIN]);
    let r = signer.sign_message("hello", &mut prompt).await;

    assert_eq!(r, SignOutcome::SetupRequired);
    assert!(prompt.requests.is_empty());

    // Initialising the card allows a retried request to succeed
    assert!(signer.session().initialize_card().await.unwrap());

    let r = signer.sign_message("hello", &mut prompt).await;
    assert!(r.signed().is_some());
    assert_eq!(prompt.requests, vec![PinRequest::Initial]);
}

#[tokio::test]
async fn no_card() {
    let s = CardSession::<SimTransport>::default();
    let (mut signer, _c) = signer(s);

    let mut prompt = ScriptedPrompt::new(&[PIN]);
    let r = signer.sign_message("hello", &mut prompt).await;

    assert_eq!(r, SignOutcome::NoCard);
    assert!(prompt.requests.is_empty());
}

#[tokio::test]
async fn invalid_format_then_wrong_then_valid() {
    let (s, t) = connect(Options::default()).await;
    let (mut signer, _c) = signer(s);

    let mut prompt = ScriptedPrompt::new(&["12", "9999", PIN]);
    let r = signer.sign_message("hello", &mut prompt).await;

    assert!(r.signed().is_some());
    assert_eq!(
        prompt.requests,
        vec![
            PinRequest::Initial,
            PinRequest::InvalidFormat(PinFormatError::TooShort),
            PinRequest::WrongPin,
        ]
    );

    // Signing key matches the simulated card keyslot
    let expected = t.with_card(|c| c.public_key(Keyslot::default())).map(hex::encode);
    assert_eq!(signer.public_key().await.unwrap(), expected);
}

#[tokio::test]
async fn declined_prompt_reports_last_failure() {
    let (s, _t) = connect(Options::default()).await;
    let (mut signer, _c) = signer(s);

    let r = signer
        .sign_message("hello", &mut ScriptedPrompt::new(&[]))
        .await;
    assert_eq!(r, SignOutcome::Cancelled);

    let r = signer
        .sign_message("hello", &mut ScriptedPrompt::new(&["ab!2"]))
        .await;
    assert_eq!(
        r,
        SignOutcome::InvalidPinFormat(PinFormatError::InvalidCharacters)
    );

    let r = signer
        .sign_message("hello", &mut ScriptedPrompt::new(&["0000"]))
        .await;
    assert_eq!(r, SignOutcome::WrongPin);

    assert_eq!(signer.pin_cache_state(), PinCacheState::Empty);
}

#[tokio::test]
async fn rejected_cached_pin_is_cleared() {
    let (s, t) = connect(Options::default()).await;
    let (mut signer, _c) = signer(s);

    let mut prompt = ScriptedPrompt::new(&[PIN]);
    signer.sign_message("hello", &mut prompt).await.signed().unwrap();

    // Swap in a card with a different PIN
    let other = setup(Options {
        pin: Some("5678".to_string()),
        ..Default::default()
    });
    signer.session().connect(other).await.unwrap();
    drop(t);

    // Cached PIN is rejected and cleared, the prompt is declined
    let r = signer
        .sign_message("hello", &mut ScriptedPrompt::new(&[]))
        .await;
    assert_eq!(r, SignOutcome::Cancelled);
    assert_eq!(signer.pin_cache_state(), PinCacheState::Empty);

    // A fresh PIN is then requested
    let mut prompt = ScriptedPrompt::new(&["5678"]);
    let r = signer.sign_message("hello", &mut prompt).await;
    assert!(r.signed().is_some());
    assert_eq!(prompt.requests, vec![PinRequest::Initial]);
}

#[tokio::test]
async fn signing_failure() {
    let (s, _t) = connect(Options {
        no_seed: true,
        ..Default::default()
    })
    .await;
    let (mut signer, _c) = signer(s);

    let r = signer
        .sign_message("hello", &mut ScriptedPrompt::new(&[PIN]))
        .await;
    assert_eq!(r, SignOutcome::SigningFailed);

    assert_eq!(signer.public_key().await.unwrap(), None);
}

#[tokio::test]
async fn card_removed_mid_request() {
    let (s, t) = connect(Options::default()).await;
    let (mut signer, _c) = signer(s);

    t.set_present(false);

    // Transport failures collapse to a rejected PIN at the session boundary
    let r = signer
        .sign_message("hello", &mut ScriptedPrompt::new(&[PIN]))
        .await;
    assert_eq!(r, SignOutcome::WrongPin);

    signer.session().disconnect().await;

    let r = signer
        .sign_message("hello", &mut ScriptedPrompt::new(&[PIN]))
        .await;
    assert_eq!(r, SignOutcome::NoCard);
}

#[test]
fn keyslot_range() {
    let s = CardSession::<SimTransport>::default();

    let r = Signer::new(
        s,
        SignerConfig {
            keyslot: 16,
            ..Default::default()
        },
    );

    assert!(matches!(r, Err(satochip_nostr::Error::InvalidKeyslot(16))));
}
