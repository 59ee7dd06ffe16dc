//! Pluggable signing and verification backends.
//!
//! Signatures never perform cryptography themselves. A signature created for
//! writing carries a [`SignatureStrategy`] that produces the bytes stored in
//! its reserved heap region; verification hands the extracted digest,
//! signature bytes and certificate chain to a strategy chosen by the caller.

use crate::error::Result;

#[cfg(feature = "signatures")]
use crate::error::Error;

/// Capability interface for a signing backend.
pub trait SignatureStrategy: std::fmt::Debug {
    /// Sign `data` (normally the archive's TOC checksum digest).
    fn sign(&self, data: &[u8]) -> Result<Vec<u8>>;

    /// Check `signature` over `data` using the given certificate chain.
    ///
    /// Returns `Ok(false)` for a signature that does not verify; errors are
    /// reserved for inputs the backend cannot process at all.
    fn verify(&self, data: &[u8], signature: &[u8], certificates: &[&[u8]]) -> Result<bool>;
}

/// Digest algorithm of the data handed to a strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DigestAlgorithm {
    /// SHA-1 (the XAR default TOC checksum)
    #[default]
    Sha1,
    /// SHA-256
    Sha256,
}

impl DigestAlgorithm {
    /// Get the name of this algorithm.
    pub fn name(&self) -> &'static str {
        match self {
            DigestAlgorithm::Sha1 => "SHA-1",
            DigestAlgorithm::Sha256 => "SHA-256",
        }
    }

    /// Byte length of a digest.
    pub fn digest_len(&self) -> usize {
        match self {
            DigestAlgorithm::Sha1 => 20,
            DigestAlgorithm::Sha256 => 32,
        }
    }

    /// Map a TOC `checksum/style` value to an algorithm.
    pub fn from_style(style: &str) -> Option<Self> {
        match style.to_ascii_lowercase().as_str() {
            "sha1" | "sha-1" => Some(DigestAlgorithm::Sha1),
            "sha256" | "sha-256" => Some(DigestAlgorithm::Sha256),
            _ => None,
        }
    }

    #[cfg(feature = "signatures")]
    fn padding(&self) -> rsa::Pkcs1v15Sign {
        match self {
            DigestAlgorithm::Sha1 => rsa::Pkcs1v15Sign::new::<sha1::Sha1>(),
            DigestAlgorithm::Sha256 => rsa::Pkcs1v15Sign::new::<sha2::Sha256>(),
        }
    }
}

/// RSA PKCS#1 v1.5 strategy over a pre-computed digest.
///
/// Signing requires a private key. Verification uses the public key of the
/// first (leaf) certificate in the chain; the chain is not validated and
/// trust is not evaluated.
#[cfg(feature = "signatures")]
pub struct RsaPkcs1Strategy {
    private_key: Option<rsa::RsaPrivateKey>,
    digest: DigestAlgorithm,
}

#[cfg(feature = "signatures")]
impl RsaPkcs1Strategy {
    /// Create a verify-only strategy.
    pub fn verifier(digest: DigestAlgorithm) -> Self {
        Self {
            private_key: None,
            digest,
        }
    }

    /// Create a signing strategy from a private key.
    pub fn with_private_key(private_key: rsa::RsaPrivateKey, digest: DigestAlgorithm) -> Self {
        Self {
            private_key: Some(private_key),
            digest,
        }
    }

    /// Create a signing strategy from a DER-encoded PKCS#8 private key.
    pub fn from_pkcs8_der(der: &[u8], digest: DigestAlgorithm) -> Result<Self> {
        use rsa::pkcs8::DecodePrivateKey;

        let private_key = rsa::RsaPrivateKey::from_pkcs8_der(der)
            .map_err(|e| Error::Crypto(format!("invalid PKCS#8 private key: {}", e)))?;
        Ok(Self::with_private_key(private_key, digest))
    }

    /// Digest algorithm this strategy expects.
    pub fn digest_algorithm(&self) -> DigestAlgorithm {
        self.digest
    }

    /// Byte length of signatures produced by this strategy.
    ///
    /// This is the length to reserve when creating the signature.
    pub fn signature_len(&self) -> Option<usize> {
        use rsa::traits::PublicKeyParts;

        self.private_key.as_ref().map(|key| key.size())
    }

    /// Verify against an explicit public key.
    pub fn verify_with_key(&self, key: &rsa::RsaPublicKey, data: &[u8], signature: &[u8]) -> bool {
        key.verify(self.digest.padding(), data, signature).is_ok()
    }

    fn leaf_public_key(certificate: &[u8]) -> Result<rsa::RsaPublicKey> {
        use rsa::pkcs8::DecodePublicKey;

        let (_, cert) = x509_parser::parse_x509_certificate(certificate)
            .map_err(|e| Error::Crypto(format!("unreadable leaf certificate: {}", e)))?;
        rsa::RsaPublicKey::from_public_key_der(cert.public_key().raw)
            .map_err(|e| Error::Crypto(format!("leaf certificate has no RSA key: {}", e)))
    }
}

#[cfg(feature = "signatures")]
impl SignatureStrategy for RsaPkcs1Strategy {
    fn sign(&self, data: &[u8]) -> Result<Vec<u8>> {
        let key = self
            .private_key
            .as_ref()
            .ok_or_else(|| Error::Crypto("strategy has no private key".to_string()))?;
        if data.len() != self.digest.digest_len() {
            return Err(Error::Crypto(format!(
                "expected a {} digest of {} bytes, got {}",
                self.digest.name(),
                self.digest.digest_len(),
                data.len()
            )));
        }
        key.sign(self.digest.padding(), data)
            .map_err(|e| Error::Crypto(format!("RSA signing failed: {}", e)))
    }

    fn verify(&self, data: &[u8], signature: &[u8], certificates: &[&[u8]]) -> Result<bool> {
        let Some(leaf) = certificates.first() else {
            log::warn!("Cannot verify signature without a certificate");
            return Ok(false);
        };
        let key = Self::leaf_public_key(leaf)?;
        Ok(self.verify_with_key(&key, data, signature))
    }
}

#[cfg(feature = "signatures")]
impl std::fmt::Debug for RsaPkcs1Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RsaPkcs1Strategy")
            .field(
                "private_key",
                &if self.private_key.is_some() {
                    "[REDACTED]"
                } else {
                    "None"
                },
            )
            .field("digest", &self.digest)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_algorithm_names() {
        assert_eq!(DigestAlgorithm::Sha1.name(), "SHA-1");
        assert_eq!(DigestAlgorithm::Sha256.digest_len(), 32);
        assert_eq!(DigestAlgorithm::default(), DigestAlgorithm::Sha1);
    }

    #[test]
    fn test_digest_from_style() {
        assert_eq!(DigestAlgorithm::from_style("sha1"), Some(DigestAlgorithm::Sha1));
        assert_eq!(DigestAlgorithm::from_style("SHA256"), Some(DigestAlgorithm::Sha256));
        assert_eq!(DigestAlgorithm::from_style("md5"), None);
    }

    /// 1024-bit RSA test key (PKCS#8 DER, base64)
    #[cfg(feature = "signatures")]
    const TEST_KEY_PKCS8: &str = "\
MIICdgIBADANBgkqhkiG9w0BAQEFAASCAmAwggJcAgEAAoGBAJkIO0Zjj98WVy5nrKVP9OJyhLRX\
LH68EPi3lHre0bsjch+3ePaYInd7elBC089SLjxTSbPEwzwGjaGpnzWCZEl+FsmfojobS1HAOzSf\
SWZfuhM+9NxubEETS9pQd6Bg+1Hbn1Uz908XSId/REae1k6tR1LuXXAxLgUyoCb9POctAgMBAAEC\
gYB8TTxge2SUb4AXGG0axiyCd0Sle52Pv9EFRZCckTrIiA0eCBiALKjqZmi+otmLMBSQOZLHK47t\
xeDrLG0+uJAeBHpzyaP0DE05CiM4R62ilGDuj2Iha/aDcygLpY27JNaOwCy9gf7HE8WMQng4Kiku\
7jjzBlXpULb6jAijNN4+vQJBAMYX6jyBd0eS1+utrYIF4WUg4FnmjXD7zTfVSAw7e14NVRKjbQRX\
RjoSxjeVhuweXw9w6PtOHht+V8SQQwkz+KcCQQDFxDXoBb2RzAD47pnolzXGGbTaWP52ST9Kikef\
WGdr8QEzel4BEASK/dNcqEmHRF/JHpsouDEndsBjGy5RZAgLAkEAmIfLniFWVi9UwS1vX6HlhzgE\
aFTlbi0FPMumeXzHpoj/i6V5CRGmiorwQ9aIGIHeUoZvbyocdrEXJcyrQYfaGwJAKUWqblKMXlnx\
tgGtcwHjggUpXgwGhs8Ae2DiU5nSc49nTcPyzEv4dr1EF+ky9xzI1KMjhFr0PyUkP0qT3v5+QwJA\
KVyOQ0Iir6l0gj1zm4L+BpUK3MzyKtGjwQhGxVQQYTHj6jKhw2xarsojaP7IcNhXInp1C/gM/8JV\
cYy4eduL0g==";

    /// Self-signed certificate for `TEST_KEY_PKCS8` (DER, base64)
    #[cfg(feature = "signatures")]
    const TEST_CERT: &str = "\
MIICBDCCAW2gAwIBAgIUG0SN0fOMh0SGB9fHioWwhVw2tkMwDQYJKoZIhvcNAQELBQAwEzERMA8G\
A1UEAwwIeGFyIHRlc3QwIBcNMjYxMDE3MTIwMDM5WhgPMjEyNjA5MjMxMjAwMzlaMBMxETAPBgNV\
BAMMCHhhciB0ZXN0MIGfMA0GCSqGSIb3DQEBAQUAA4GNADCBiQKBgQCZCDtGY4/fFlcuZ6ylT/Ti\
coS0Vyx+vBD4t5R63tG7I3Ift3j2mCJ3e3pQQtPPUi48U0mzxMM8Bo2hqZ81gmRJfhbJn6I6G0tR\
wDs0n0lmX7oTPvTcbmxBE0vaUHegYPtR259VM/dPF0iHf0RGntZOrUdS7l1wMS4FMqAm/TznLQID\
AQABo1MwUTAdBgNVHQ4EFgQUSm+gM2yr//cxzBNOeroQn4SWO0cwHwYDVR0jBBgwFoAUSm+gM2yr\
//cxzBNOeroQn4SWO0cwDwYDVR0TAQH/BAUwAwEB/zANBgkqhkiG9w0BAQsFAAOBgQB+NpKeUWV/\
Dl5oszsswikqe2QdyPe8OGVOwkWd+C3PCE9lDrXEEy77uTJfsZ+WxDwXGcPE8MoTGIcNr+8qbaVp\
pGJWcVehdkF4NKuMQVIQGTVIIZOVVSKm0Yrs+0Zw7QB4B3p6n5/bpgt5O1H2lX9OlhVPAxyyen6b\
+yvTkSnU5w==";

    #[cfg(feature = "signatures")]
    fn decode(text: &str) -> Vec<u8> {
        use base64::{engine::general_purpose::STANDARD, Engine as _};
        STANDARD.decode(text).unwrap()
    }

    #[cfg(feature = "signatures")]
    fn test_key() -> rsa::RsaPrivateKey {
        use rsa::pkcs8::DecodePrivateKey;
        rsa::RsaPrivateKey::from_pkcs8_der(&decode(TEST_KEY_PKCS8)).unwrap()
    }

    #[cfg(feature = "signatures")]
    #[test]
    fn test_sign_and_verify_with_key() {
        let public_key = test_key().to_public_key();

        for (digest, data) in [
            (DigestAlgorithm::Sha1, vec![0x11u8; 20]),
            (DigestAlgorithm::Sha256, vec![0x22u8; 32]),
        ] {
            let strategy = RsaPkcs1Strategy::from_pkcs8_der(&decode(TEST_KEY_PKCS8), digest).unwrap();
            assert_eq!(strategy.digest_algorithm(), digest);
            assert_eq!(strategy.signature_len(), Some(128));

            let signature = strategy.sign(&data).unwrap();
            assert_eq!(signature.len(), 128);
            assert!(strategy.verify_with_key(&public_key, &data, &signature));

            let mut tampered = signature.clone();
            tampered[0] ^= 0x01;
            assert!(!strategy.verify_with_key(&public_key, &data, &tampered));
        }
    }

    #[cfg(feature = "signatures")]
    #[test]
    fn test_padding_depends_on_digest() {
        let public_key = test_key().to_public_key();
        let sha1 = RsaPkcs1Strategy::with_private_key(test_key(), DigestAlgorithm::Sha1);
        let sha256 = RsaPkcs1Strategy::with_private_key(test_key(), DigestAlgorithm::Sha256);

        // Same 32 bytes signed under SHA-256 do not verify as SHA-1 digest info
        let data = [0x33u8; 32];
        let signature = sha256.sign(&data).unwrap();
        assert!(sha256.verify_with_key(&public_key, &data, &signature));
        assert!(!sha1.verify_with_key(&public_key, &data, &signature));
    }

    #[cfg(feature = "signatures")]
    #[test]
    fn test_sign_rejects_wrong_digest_length() {
        let strategy = RsaPkcs1Strategy::with_private_key(test_key(), DigestAlgorithm::Sha1);
        assert!(matches!(strategy.sign(&[0u8; 32]), Err(Error::Crypto(_))));

        let strategy = RsaPkcs1Strategy::with_private_key(test_key(), DigestAlgorithm::Sha256);
        assert!(matches!(strategy.sign(&[0u8; 20]), Err(Error::Crypto(_))));
    }

    #[cfg(feature = "signatures")]
    #[test]
    fn test_verify_with_leaf_certificate() {
        let strategy = RsaPkcs1Strategy::with_private_key(test_key(), DigestAlgorithm::Sha1);
        let data = [0x44u8; 20];
        let signature = strategy.sign(&data).unwrap();

        let cert = decode(TEST_CERT);
        let chain: [&[u8]; 1] = [&cert];
        assert!(strategy.verify(&data, &signature, &chain).unwrap());

        let verifier = RsaPkcs1Strategy::verifier(DigestAlgorithm::Sha1);
        assert!(verifier.verify(&data, &signature, &chain).unwrap());
        assert!(!verifier.verify(&[0x45u8; 20], &signature, &chain).unwrap());
    }

    #[cfg(feature = "signatures")]
    #[test]
    fn test_invalid_pkcs8_is_crypto_error() {
        assert!(matches!(
            RsaPkcs1Strategy::from_pkcs8_der(b"not a key", DigestAlgorithm::Sha1),
            Err(Error::Crypto(_))
        ));
    }

    #[cfg(feature = "signatures")]
    #[test]
    fn test_verifier_without_certificates() {
        let strategy = RsaPkcs1Strategy::verifier(DigestAlgorithm::Sha1);
        assert!(!strategy.verify(&[0u8; 20], &[0u8; 256], &[]).unwrap());
        assert!(strategy.signature_len().is_none());
    }

    #[cfg(feature = "signatures")]
    #[test]
    fn test_verifier_cannot_sign() {
        let strategy = RsaPkcs1Strategy::verifier(DigestAlgorithm::Sha1);
        assert!(matches!(strategy.sign(&[0u8; 20]), Err(Error::Crypto(_))));
    }

    #[cfg(feature = "signatures")]
    #[test]
    fn test_garbage_certificate_is_error() {
        let strategy = RsaPkcs1Strategy::verifier(DigestAlgorithm::Sha256);
        let cert: &[u8] = b"not a certificate";
        assert!(strategy.verify(&[0u8; 32], &[0u8; 256], &[cert]).is_err());
    }

    #[cfg(feature = "signatures")]
    #[test]
    fn test_debug_redacts_key() {
        let strategy = RsaPkcs1Strategy::verifier(DigestAlgorithm::Sha1);
        let debug = format!("{:?}", strategy);
        assert!(debug.contains("RsaPkcs1Strategy"));
        assert!(debug.contains("None"));
    }
}
