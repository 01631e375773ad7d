//! Prelude to simplify downstream use of APDU objects
//!

pub use crate::{
    card_status::{StatusReq, StatusResp},
    pin::VerifyPinReq,
    pki::{PkiCertReq, PkiCertResp},
    pubkey::{PubKeyReq, PubKeyResp},
    select::SelectReq,
    setup::SetupReq,
    sign::{SignHashReq, SignResp, HASH_LEN},
    Ack, ApduError, ApduReq, Command, Instruction, Keyslot, StatusClass, StatusWord,
};
