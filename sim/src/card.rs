// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Simulated Satochip applet
//!
//! Implements the subset of applet behaviour used by the signing bridge:
//! setup, PIN verification with retry counters, per-keyslot secp256k1 keys,
//! BIP-340 signing, public key export and attestation certificate export.

use encdec::{Decode, DecodeOwned, Encode};
use k256::schnorr::SigningKey;
use log::{debug, trace, warn};
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use satochip_apdu::{
    encode_response, prelude::*, Command, ISO_CLA, SATOCHIP_AID, SATOCHIP_CLA,
};

use crate::Options;

/// Simulated applet protocol version
pub const PROTOCOL_VERSION: (u8, u8) = (0, 12);

/// Simulated applet firmware version
pub const APPLET_VERSION: (u8, u8) = (0, 6);

/// Number of keyslots available
pub const NUM_KEYSLOTS: usize = Keyslot::MAX as usize + 1;

/// Card PIN length bounds
const PIN_LEN: core::ops::RangeInclusive<usize> = 4..=16;

/// Stored secret with retry counter
struct Secret {
    hash: [u8; 32],
    tries: u8,
    remaining: u8,
}

impl Secret {
    fn new(value: &[u8], tries: u8) -> Self {
        Self {
            hash: hash_secret(value),
            tries,
            remaining: tries,
        }
    }

    /// Check a candidate value, updating the retry counter
    fn check(&mut self, value: &[u8]) -> bool {
        if self.remaining == 0 {
            return false;
        }

        if hash_secret(value) == self.hash {
            self.remaining = self.tries;
            true
        } else {
            self.remaining -= 1;
            false
        }
    }
}

fn hash_secret(value: &[u8]) -> [u8; 32] {
    Sha256::digest(value).into()
}

/// Simulated card state
pub struct SimCard {
    applet_installed: bool,
    selected: bool,

    pin: Option<Secret>,
    puk: Option<Secret>,
    pin_verified: bool,

    keys: [Option<SigningKey>; NUM_KEYSLOTS],
    fixed_signature: Option<Vec<u8>>,
    certificate: Vec<u8>,
}

impl SimCard {
    /// Create a new simulated card
    pub fn new(opts: &Options) -> Self {
        let mut c = Self {
            applet_installed: !opts.no_applet,
            selected: false,
            pin: None,
            puk: None,
            pin_verified: false,
            keys: Default::default(),
            fixed_signature: opts.fixed_signature.clone(),
            certificate: match opts.no_certificate {
                true => vec![],
                false => opts.certificate(),
            },
        };

        if !opts.no_seed {
            let seed = match &opts.seed {
                Some(s) => Zeroizing::new(s.clone()),
                None => {
                    let mut s = Zeroizing::new(vec![0u8; 32]);
                    OsRng.fill_bytes(&mut s);
                    s
                }
            };
            c.load_seed(&seed);
        }

        if let Some(pin) = &opts.pin {
            c.pin = Some(Secret::new(pin.as_bytes(), opts.pin_tries));
            c.puk = Some(Secret::new(opts.puk.as_bytes(), opts.puk_tries));
        }

        c
    }

    /// Derive per-keyslot signing keys from a seed
    fn load_seed(&mut self, seed: &[u8]) {
        for (i, k) in self.keys.iter_mut().enumerate() {
            let mut h = Sha256::new();
            h.update(seed);
            h.update([i as u8]);
            let d: Zeroizing<[u8; 32]> = Zeroizing::new(h.finalize().into());

            *k = SigningKey::from_bytes(d.as_slice()).ok();
        }
    }

    /// Check whether the card has been set up
    pub fn setup_done(&self) -> bool {
        self.pin.is_some()
    }

    /// Fetch the x-only public key for a keyslot
    pub fn public_key(&self, keyslot: Keyslot) -> Option<[u8; 32]> {
        self.keys[keyslot.index() as usize]
            .as_ref()
            .map(|k| k.verifying_key().to_bytes().into())
    }

    /// Process a command APDU, writing the response APDU (payload and status
    /// word) to `buff` and returning the response length
    pub fn process(&mut self, cmd: &[u8], buff: &mut [u8]) -> Result<usize, ApduError> {
        trace!("cmd: {cmd:02x?}");

        let r = match Command::parse(cmd) {
            Ok(c) => self.handle(c, buff),
            Err(_) => Err(StatusWord::WRONG_LENGTH),
        };

        match r {
            Ok(n) => Ok(n),
            Err(sw) => {
                debug!("Rejecting command: {sw} ({sw:?})");
                encode_response::<Ack>(None, sw, buff)
            }
        }
    }

    fn handle(&mut self, cmd: Command, buff: &mut [u8]) -> Result<usize, StatusWord> {
        let ins = cmd
            .instruction()
            .map_err(|_| StatusWord::INS_NOT_SUPPORTED)?;

        let expected_cla = match ins {
            Instruction::Select => ISO_CLA,
            _ => SATOCHIP_CLA,
        };
        if cmd.header.cla != expected_cla {
            return Err(StatusWord::CLA_NOT_SUPPORTED);
        }

        debug!("Handling {ins}");

        if ins != Instruction::Select && !self.selected {
            return Err(StatusWord::CONDITIONS_NOT_SATISFIED);
        }

        match ins {
            Instruction::Select => self.select(cmd.data, buff),
            Instruction::GetStatus => respond(&self.status(), buff),
            Instruction::Setup => self.setup(cmd.data, buff),
            Instruction::VerifyPin => self.verify_pin(cmd.data, buff),
            Instruction::SignSchnorrHash => self.sign(cmd.data, buff),
            Instruction::GetPublicKey => self.get_public_key(cmd.data, buff),
            Instruction::ExportPkiCertificate => {
                respond(&PkiCertResp::new(&self.certificate), buff)
            }
        }
    }

    fn select(&mut self, data: &[u8], buff: &mut [u8]) -> Result<usize, StatusWord> {
        let (req, _) = SelectReq::decode(data).map_err(|_| StatusWord::WRONG_DATA)?;

        if !self.applet_installed || req.aid != SATOCHIP_AID {
            self.selected = false;
            return Err(StatusWord::FILE_NOT_FOUND);
        }

        // Selection resets the PIN session
        self.selected = true;
        self.pin_verified = false;

        respond(&Ack, buff)
    }

    fn status(&self) -> StatusResp {
        StatusResp {
            protocol_major: PROTOCOL_VERSION.0,
            protocol_minor: PROTOCOL_VERSION.1,
            applet_major: APPLET_VERSION.0,
            applet_minor: APPLET_VERSION.1,
            pin_tries_remaining: self.pin.as_ref().map(|s| s.remaining).unwrap_or(0),
            puk_tries_remaining: self.puk.as_ref().map(|s| s.remaining).unwrap_or(0),
            needs_2fa: false,
            seeded: self.keys.iter().any(|k| k.is_some()),
            setup_done: self.setup_done(),
            needs_secure_channel: false,
        }
    }

    fn setup(&mut self, data: &[u8], buff: &mut [u8]) -> Result<usize, StatusWord> {
        if self.setup_done() {
            return Err(StatusWord::SETUP_ALREADY_DONE);
        }

        let (req, _) = SetupReq::decode(data).map_err(|_| StatusWord::WRONG_DATA)?;

        if !PIN_LEN.contains(&req.pin.len()) || req.pin_tries == 0 || req.puk_tries == 0 {
            return Err(StatusWord::WRONG_DATA);
        }

        self.pin = Some(Secret::new(req.pin, req.pin_tries));
        self.puk = Some(Secret::new(req.puk, req.puk_tries));
        self.pin_verified = false;

        debug!("Setup complete ({} PIN tries)", req.pin_tries);

        respond(&Ack, buff)
    }

    fn verify_pin(&mut self, data: &[u8], buff: &mut [u8]) -> Result<usize, StatusWord> {
        let (req, _) = VerifyPinReq::decode(data).map_err(|_| StatusWord::WRONG_DATA)?;

        let pin = self.pin.as_mut().ok_or(StatusWord::SETUP_NOT_DONE)?;

        if pin.remaining == 0 {
            return Err(StatusWord::IDENTITY_BLOCKED);
        }

        self.pin_verified = pin.check(req.pin);

        if !self.pin_verified {
            warn!("PIN rejected ({} tries remaining)", pin.remaining);
            return Err(StatusWord::pin_failed(pin.remaining));
        }

        respond(&Ack, buff)
    }

    fn sign(&mut self, data: &[u8], buff: &mut [u8]) -> Result<usize, StatusWord> {
        if !self.setup_done() {
            return Err(StatusWord::SETUP_NOT_DONE);
        }
        if !self.pin_verified {
            return Err(StatusWord::UNAUTHORIZED);
        }

        let (req, _) = SignHashReq::decode_owned(data).map_err(|_| StatusWord::WRONG_DATA)?;

        let key = self.keys[req.keyslot.index() as usize]
            .as_ref()
            .ok_or(StatusWord::NO_KEY_IN_SLOT)?;

        if let Some(s) = &self.fixed_signature {
            return respond(&SignResp::new(s), buff);
        }

        let mut aux = [0u8; 32];
        OsRng.fill_bytes(&mut aux);

        let sig = key
            .sign_raw(&req.hash, &aux)
            .map_err(|_| StatusWord::UNKNOWN_ERROR)?;

        respond(&SignResp::new(&sig.to_bytes()), buff)
    }

    fn get_public_key(&mut self, data: &[u8], buff: &mut [u8]) -> Result<usize, StatusWord> {
        let (req, _) = PubKeyReq::decode_owned(data).map_err(|_| StatusWord::WRONG_DATA)?;

        let x = self.public_key(req.keyslot).ok_or(StatusWord::NO_KEY_IN_SLOT)?;

        // BIP-340 keys have even Y, export in compressed SEC1 form
        let mut k = [0x02u8; 33];
        k[1..].copy_from_slice(&x);

        respond(&PubKeyResp::new(&k), buff)
    }
}

/// Encode a successful response
fn respond<R: Encode<Error = ApduError>>(r: &R, buff: &mut [u8]) -> Result<usize, StatusWord> {
    encode_response(Some(r), StatusWord::SUCCESS, buff).map_err(|_| StatusWord::UNKNOWN_ERROR)
}
