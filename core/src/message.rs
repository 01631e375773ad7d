// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Signed message codec
//!
//! Signed messages are transported as `content + SEPARATOR + signature_hex`.
//! Parsing splits at the last [SEPARATOR], see [parse] for edge cases.

use k256::schnorr::{Signature, VerifyingKey};
use log::debug;
use sha2::{Digest, Sha256};

use satochip_apdu::sign::HASH_LEN;

/// Separator between message content and signature
pub const SEPARATOR: char = '~';

/// Marker appended to signed content for display
pub const SIGNED_MARKER: &str = "~signed";

/// Decoded message
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedMessage {
    /// Message content
    pub content: String,
    /// Hex encoded signature, if present
    pub signature: Option<String>,
}

impl ParsedMessage {
    /// Check whether a signature is attached
    pub fn is_signed(&self) -> bool {
        self.signature.is_some()
    }

    /// Content for display, with a fixed marker in place of the signature
    pub fn display_content(&self) -> String {
        match self.is_signed() {
            true => format!("{}{SIGNED_MARKER}", self.content),
            false => self.content.clone(),
        }
    }
}

/// Split a blob at the last separator, ignoring a trailing separator
fn split(blob: &str) -> Option<(&str, &str)> {
    let idx = blob.rfind(SEPARATOR)?;

    let (content, rest) = blob.split_at(idx);
    let signature = &rest[SEPARATOR.len_utf8()..];

    if signature.is_empty() {
        return None;
    }

    Some((content, signature))
}

/// Attach a hex encoded signature to message content.
///
/// `signature_hex` must be non-empty, an empty signature encodes to a blob
/// that parses as unsigned content.
pub fn encode(content: &str, signature_hex: &str) -> String {
    format!("{content}{SEPARATOR}{signature_hex}")
}

/// Parse a message blob.
///
/// Messages without a separator, or where the last separator is the final
/// character, are treated as unsigned with the whole blob as content.
pub fn parse(blob: &str) -> ParsedMessage {
    match split(blob) {
        Some((content, signature)) => ParsedMessage {
            content: content.to_string(),
            signature: Some(signature.to_string()),
        },
        None => ParsedMessage {
            content: blob.to_string(),
            signature: None,
        },
    }
}

/// Check whether a blob carries a signature
pub fn is_signed(blob: &str) -> bool {
    split(blob).is_some()
}

/// Content for display, see [ParsedMessage::display_content]
pub fn display_content(parsed: &ParsedMessage) -> String {
    parsed.display_content()
}

/// Compute the signing hash for message content
pub fn content_hash(content: &str) -> [u8; HASH_LEN] {
    Sha256::digest(content.as_bytes()).into()
}

/// Resolve an x-only (BIP-340) public key from x-only, compressed or
/// uncompressed SEC1 encodings
pub fn x_only_key(key: &[u8]) -> Option<[u8; 32]> {
    let x = match (key.len(), key.first()) {
        (32, _) => key,
        (33, Some(0x02 | 0x03)) => &key[1..],
        (65, Some(0x04)) => &key[1..33],
        _ => return None,
    };

    let mut b = [0u8; 32];
    b.copy_from_slice(x);
    Some(b)
}

#[derive(Debug, thiserror::Error)]
enum VerifyError {
    #[error("hex decode failed: {0}")]
    Hex(#[from] hex::FromHexError),
    #[error("invalid public key")]
    InvalidKey,
    #[error("invalid signature encoding")]
    InvalidSignature,
    #[error("signature mismatch")]
    Mismatch,
}

fn try_verify(content: &str, signature_hex: &str, public_key_hex: &str) -> Result<(), VerifyError> {
    let signature = hex::decode(signature_hex)?;
    let public_key = hex::decode(public_key_hex)?;

    let x = x_only_key(&public_key).ok_or(VerifyError::InvalidKey)?;
    let key = VerifyingKey::from_bytes(&x).map_err(|_| VerifyError::InvalidKey)?;

    let signature =
        Signature::try_from(signature.as_slice()).map_err(|_| VerifyError::InvalidSignature)?;

    let hash = content_hash(content);
    key.verify_raw(&hash, &signature)
        .map_err(|_| VerifyError::Mismatch)
}

/// Verify a BIP-340 signature over the SHA-256 hash of `content`.
///
/// All failures (hex decoding, key or signature encoding, mismatch)
/// collapse to `false`.
pub fn verify(content: &str, signature_hex: &str, public_key_hex: &str) -> bool {
    match try_verify(content, signature_hex, public_key_hex) {
        Ok(()) => true,
        Err(e) => {
            debug!("Signature verification failed: {e}");
            false
        }
    }
}

/// Parse and verify a message blob, unsigned messages never verify
pub fn verify_message(blob: &str, public_key_hex: &str) -> bool {
    match split(blob) {
        Some((content, signature)) => verify(content, signature, public_key_hex),
        None => false,
    }
}

#[cfg(test)]
mod test {
    use k256::schnorr::SigningKey;
    use rand::Rng;

    use super::*;

    #[test]
    fn encode_parse() {
        let blob = encode("hello", "abcd");
        assert_eq!(blob, "hello~abcd");

        assert_eq!(
            parse(&blob),
            ParsedMessage {
                content: "hello".to_string(),
                signature: Some("abcd".to_string()),
            }
        );
        assert!(is_signed(&blob));
    }

    #[test]
    fn encode_parse_random() {
        let mut rng = rand::thread_rng();

        for _i in 0..256 {
            // Printable ASCII content without the separator
            let n = rng.gen_range(0..64);
            let content: String = (0..n)
                .map(|_| rng.gen_range(0x20u8..0x7f) as char)
                .filter(|c| *c != SEPARATOR)
                .collect();

            // Non-empty lowercase hex signature
            let sig: Vec<u8> = (0..rng.gen_range(1..=64)).map(|_| rng.gen()).collect();
            let sig = hex::encode(sig);

            let blob = encode(&content, &sig);
            assert!(is_signed(&blob), "{blob}");

            let p = parse(&blob);
            assert_eq!(p.content, content);
            assert_eq!(p.signature.as_deref(), Some(sig.as_str()));
            assert_eq!(p.display_content(), format!("{content}{SIGNED_MARKER}"));

            // Unsigned content parses back unchanged
            let p = parse(&content);
            assert_eq!(p.content, content);
            assert!(!p.is_signed());
        }
    }

    #[test]
    fn parse_unsigned() {
        for c in ["", "hello", "no separator here", "üñíçødé"] {
            let p = parse(c);
            assert!(!p.is_signed());
            assert!(!is_signed(c));
            assert_eq!(p.content, c);
        }
    }

    #[test]
    fn parse_trailing_separator() {
        let p = parse("a~");
        assert_eq!(p.content, "a~");
        assert_eq!(p.signature, None);
        assert!(!is_signed("a~"));
        assert!(!is_signed("~"));
    }

    #[test]
    fn parse_last_separator() {
        let p = parse("a~b~c0ffee");
        assert_eq!(p.content, "a~b");
        assert_eq!(p.signature.as_deref(), Some("c0ffee"));
    }

    #[test]
    fn parse_empty_content() {
        let p = parse("~abcd");
        assert_eq!(p.content, "");
        assert_eq!(p.signature.as_deref(), Some("abcd"));
    }

    #[test]
    fn empty_signature_is_unsigned() {
        let blob = encode("hello", "");
        assert!(!is_signed(&blob));
        assert_eq!(parse(&blob).content, "hello~");
    }

    #[test]
    fn display() {
        assert_eq!(parse("hello~abcd").display_content(), "hello~signed");
        assert_eq!(display_content(&parse("hello")), "hello");
    }

    #[test]
    fn x_only_encodings() {
        let x = [0x11u8; 32];

        let mut compressed = [0x02u8; 33];
        compressed[1..].copy_from_slice(&x);

        let mut uncompressed = [0x04u8; 65];
        uncompressed[1..33].copy_from_slice(&x);

        assert_eq!(x_only_key(&x), Some(x));
        assert_eq!(x_only_key(&compressed), Some(x));
        assert_eq!(x_only_key(&uncompressed), Some(x));
        assert_eq!(x_only_key(&compressed[..20]), None);
        assert_eq!(x_only_key(&[0x05; 33]), None);
    }

    fn signed(content: &str) -> (String, String) {
        let k = SigningKey::from_bytes(&[0x42; 32]).unwrap();
        let sig = k.sign_raw(&content_hash(content), &[0u8; 32]).unwrap();

        (
            hex::encode(sig.to_bytes()),
            hex::encode(k.verifying_key().to_bytes()),
        )
    }

    #[test]
    fn verify_signature() {
        let (sig, key) = signed("hello");

        assert!(verify("hello", &sig, &key));
        assert!(verify_message(&encode("hello", &sig), &key));

        // Compressed key form is accepted
        assert!(verify("hello", &sig, &format!("02{key}")));
    }

    #[test]
    fn verify_failures_collapse() {
        let (sig, key) = signed("hello");

        assert!(!verify("hellO", &sig, &key));
        assert!(!verify("hello", "zz", &key));
        assert!(!verify("hello", &sig[..64], &key));
        assert!(!verify("hello", &sig, "00"));
        assert!(!verify("hello", &sig, &"00".repeat(32)));
        assert!(!verify_message("hello", &key));
    }
}
