// security/mod.rs - Tamper-evident data signing
//
// Used for values that round-trip through the browser, such as the hidden
// `redirect` field of a form. The token is the hex HMAC-SHA256 of the data
// followed by the data itself, so the payload stays readable.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Hex length of an HMAC-SHA256 digest
const MAC_HEX_LEN: usize = 64;

/// Produces and checks signed strings
pub trait Signer: Send + Sync {
    /// Prefix `data` with its MAC
    fn hash_data(&self, data: &str) -> String;

    /// Return the embedded data if the MAC matches, `None` otherwise
    fn validate_data(&self, token: &str) -> Option<String>;
}

#[derive(Clone)]
pub struct HmacSigner {
    keyed: HmacSha256,
}

impl HmacSigner {
    pub fn new(key: impl AsRef<[u8]>) -> Result<Self, hmac::digest::InvalidLength> {
        Ok(Self {
            keyed: HmacSha256::new_from_slice(key.as_ref())?,
        })
    }

    fn mac_hex(&self, data: &str) -> String {
        let mut mac = self.keyed.clone();
        mac.update(data.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }
}

impl std::fmt::Debug for HmacSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HmacSigner").finish_non_exhaustive()
    }
}

impl Signer for HmacSigner {
    fn hash_data(&self, data: &str) -> String {
        format!("{}{}", self.mac_hex(data), data)
    }

    fn validate_data(&self, token: &str) -> Option<String> {
        if token.len() < MAC_HEX_LEN || !token.is_char_boundary(MAC_HEX_LEN) {
            return None;
        }
        let (stored, data) = token.split_at(MAC_HEX_LEN);
        let stored = hex::decode(stored).ok()?;
        let expected = hex::decode(self.mac_hex(data)).ok()?;

        if bool::from(stored.ct_eq(expected.as_slice())) {
            Some(data.to_string())
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_data_validates() {
        let signer = HmacSigner::new("secret").unwrap();
        let token = signer.hash_data("app/do/stuff");
        assert!(token.ends_with("app/do/stuff"));
        assert_eq!(token.len(), MAC_HEX_LEN + "app/do/stuff".len());
        assert_eq!(signer.validate_data(&token).as_deref(), Some("app/do/stuff"));
    }

    #[test]
    fn tampered_data_is_rejected() {
        let signer = HmacSigner::new("secret").unwrap();
        let token = signer.hash_data("app/do/stuff");
        let forged = token.replace("stuff", "other");
        assert_eq!(signer.validate_data(&forged), None);
    }

    #[test]
    fn other_key_is_rejected() {
        let token = HmacSigner::new("secret").unwrap().hash_data("x");
        assert_eq!(HmacSigner::new("other").unwrap().validate_data(&token), None);
    }

    #[test]
    fn short_and_non_hex_tokens_are_rejected() {
        let signer = HmacSigner::new("secret").unwrap();
        assert_eq!(signer.validate_data(""), None);
        assert_eq!(signer.validate_data("app/do/stuff"), None);
        let garbage = format!("{}{}", "z".repeat(MAC_HEX_LEN), "data");
        assert_eq!(signer.validate_data(&garbage), None);
        // multi-byte char straddling the MAC boundary
        let straddle = format!("{}é", "a".repeat(MAC_HEX_LEN - 1));
        assert_eq!(signer.validate_data(&straddle), None);
    }

    #[test]
    fn empty_payload_round_trips() {
        let signer = HmacSigner::new("secret").unwrap();
        let token = signer.hash_data("");
        assert_eq!(signer.validate_data(&token).as_deref(), Some(""));
    }
}
