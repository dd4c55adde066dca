use crate::application_port::{AuthError, OtpCodec};
use crate::domain_model::{OtpCode, OtpHash};
use anyhow::anyhow;
use hmac::{Hmac, KeyInit, Mac};
use rand::Rng;
use rand::rngs::OsRng;
use secrecy::{ExposeSecret, SecretSlice};
use sha2::Sha256;

pub const MIN_OTP_LENGTH: usize = 4;
pub const MAX_OTP_LENGTH: usize = 12;

/// Numeric codes from the OS CSPRNG, stored as HMAC-SHA256 under a server key.
pub struct HmacOtpCodec {
    key: SecretSlice<u8>,
    length: usize,
}

impl HmacOtpCodec {
    pub fn new(key: Vec<u8>, length: usize) -> anyhow::Result<Self> {
        if key.is_empty() {
            return Err(anyhow!("otp hmac key must not be empty"));
        }
        if !(MIN_OTP_LENGTH..=MAX_OTP_LENGTH).contains(&length) {
            return Err(anyhow!(
                "otp length must be within {MIN_OTP_LENGTH}..={MAX_OTP_LENGTH}, got {length}"
            ));
        }
        Ok(Self {
            key: SecretSlice::from(key),
            length,
        })
    }

    fn mac(&self) -> anyhow::Result<Hmac<Sha256>> {
        Ok(Hmac::<Sha256>::new_from_slice(self.key.expose_secret())?)
    }

    fn hmac_hex(&self, code: &str) -> anyhow::Result<String> {
        let mut mac = self.mac()?;
        mac.update(code.as_bytes());
        let out = mac.finalize().into_bytes();
        Ok(hex::encode(out))
    }
}

impl OtpCodec for HmacOtpCodec {
    fn generate(&self) -> Result<(OtpCode, OtpHash), AuthError> {
        let code: String = (0..self.length)
            .map(|_| char::from(b'0' + OsRng.gen_range(0..10u8)))
            .collect();
        let hash = self
            .hmac_hex(&code)
            .map_err(|e| AuthError::InternalError(e.to_string()))?;
        Ok((OtpCode::new(code), OtpHash(hash)))
    }

    fn verify(&self, candidate: &str, stored: &OtpHash) -> bool {
        let Ok(expected) = hex::decode(&stored.0) else {
            return false;
        };
        let Ok(mut mac) = self.mac() else {
            return false;
        };
        mac.update(candidate.trim().as_bytes());
        // constant-time comparison
        mac.verify_slice(&expected).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec() -> HmacOtpCodec {
        HmacOtpCodec::new(b"test-key".to_vec(), 6).expect("valid codec")
    }

    #[test]
    fn generates_numeric_codes_of_configured_length() {
        let codec = codec();
        for _ in 0..50 {
            let (code, _) = codec.generate().expect("generate");
            assert_eq!(code.expose().len(), 6);
            assert!(code.expose().bytes().all(|b| b.is_ascii_digit()));
        }
    }

    #[test]
    fn generated_code_verifies_against_its_hash() {
        let codec = codec();
        let (code, hash) = codec.generate().expect("generate");
        assert!(codec.verify(code.expose(), &hash));
        assert!(codec.verify(&format!(" {} ", code.expose()), &hash));
    }

    #[test]
    fn hash_does_not_contain_plaintext() {
        let codec = codec();
        let (code, hash) = codec.generate().expect("generate");
        assert_eq!(hash.0.len(), 64);
        assert_ne!(hash.0, code.expose());
    }

    #[test]
    fn wrong_candidate_is_rejected() {
        let codec = codec();
        let hash = OtpHash(codec.hmac_hex("123456").expect("hmac"));
        assert!(codec.verify("123456", &hash));
        assert!(!codec.verify("123457", &hash));
        assert!(!codec.verify("", &hash));
    }

    #[test]
    fn hashes_depend_on_key() {
        let a = codec();
        let b = HmacOtpCodec::new(b"other-key".to_vec(), 6).expect("valid codec");
        let hash = OtpHash(a.hmac_hex("123456").expect("hmac"));
        assert!(!b.verify("123456", &hash));
    }

    #[test]
    fn malformed_stored_hash_never_verifies() {
        let codec = codec();
        assert!(!codec.verify("123456", &OtpHash("not-hex".to_string())));
        assert!(!codec.verify("123456", &OtpHash(String::new())));
    }

    #[test]
    fn rejects_bad_configuration() {
        assert!(HmacOtpCodec::new(Vec::new(), 6).is_err());
        assert!(HmacOtpCodec::new(b"k".to_vec(), 3).is_err());
        assert!(HmacOtpCodec::new(b"k".to_vec(), 13).is_err());
    }
}
