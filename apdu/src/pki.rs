// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Card attestation (PKI) APDUs

use encdec::{Decode, DecodeOwned, Encode};

use super::{ApduError, ApduStatic, Instruction, SATOCHIP_CLA};
use crate::helpers::{dec_lv, enc_lv};

/// Export the card attestation certificate
#[derive(Copy, Clone, PartialEq, Debug, Default)]
pub struct PkiCertReq {}

impl ApduStatic for PkiCertReq {
    const CLA: u8 = SATOCHIP_CLA;
    const INS: u8 = Instruction::ExportPkiCertificate as u8;
}

impl Encode for PkiCertReq {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, Self::Error> {
        Ok(0)
    }

    fn encode(&self, _buff: &mut [u8]) -> Result<usize, Self::Error> {
        Ok(0)
    }
}

impl DecodeOwned for PkiCertReq {
    type Output = Self;

    type Error = ApduError;

    fn decode_owned(_buff: &[u8]) -> Result<(Self::Output, usize), Self::Error> {
        Ok((Self {}, 0))
    }
}

/// Attestation certificate response APDU
///
/// An empty certificate indicates the card was never personalised.
///
/// ## Encoding:
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |           CERT_LEN            |        CERTIFICATE...         /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct PkiCertResp<'a> {
    pub certificate: &'a [u8],
}

impl<'a> PkiCertResp<'a> {
    /// Create a new [PkiCertResp] APDU
    pub fn new(certificate: &'a [u8]) -> Self {
        Self { certificate }
    }
}

impl<'a> Encode for PkiCertResp<'a> {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, Self::Error> {
        Ok(2 + self.certificate.len())
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, Self::Error> {
        enc_lv(self.certificate, buff)
    }
}

impl<'a> Decode<'a> for PkiCertResp<'a> {
    type Output = Self;
    type Error = ApduError;

    fn decode(buff: &'a [u8]) -> Result<(Self::Output, usize), Self::Error> {
        let (certificate, n) = dec_lv(buff)?;
        Ok((Self { certificate }, n))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test::encode_decode_apdu;

    #[test]
    fn pki_cert_apdu() {
        let cert = [0x30u8, 0x82, 0x01, 0x0a];
        let apdu = PkiCertResp::new(&cert);

        let mut buff = [0u8; 16];
        assert_eq!(encode_decode_apdu(&mut buff, &apdu), 6);
    }

    #[test]
    fn pki_cert_empty() {
        let (resp, n) = PkiCertResp::decode(&[0x00, 0x00]).unwrap();
        assert!(resp.certificate.is_empty());
        assert_eq!(n, 2);
    }
}
