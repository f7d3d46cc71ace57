use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use super::secret::SessionSecret;

type HmacSha256 = Hmac<Sha256>;

const SALT_BYTES: usize = 8;
const MAC_BYTES: usize = 32;

/// Token handed to the client: `<salt>.<mac>`, both base64url without padding,
/// where `mac = HMAC-SHA256(secret, salt)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsrfToken(String);

impl CsrfToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

fn mac_for(secret: &SessionSecret, salt: &[u8]) -> [u8; MAC_BYTES] {
    let mut mac = HmacSha256::new_from_slice(secret.as_str().as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(salt);

    let mut out = [0u8; MAC_BYTES];
    out.copy_from_slice(&mac.finalize().into_bytes());
    out
}

/// Derives a token bound to `secret`. Each call uses fresh salt, so tokens differ
/// between calls while all of them verify against the same secret.
pub fn issue_token(secret: &SessionSecret) -> CsrfToken {
    let mut salt = [0u8; SALT_BYTES];
    rand::thread_rng().fill_bytes(&mut salt);

    let tag = mac_for(secret, &salt);

    CsrfToken(format!(
        "{}.{}",
        URL_SAFE_NO_PAD.encode(salt),
        URL_SAFE_NO_PAD.encode(tag)
    ))
}

/// Checks `token` against `secret`. Fails closed: a missing secret, a missing or
/// malformed token, or a token derived from another secret all yield `false`.
pub fn verify(secret: Option<&SessionSecret>, token: Option<&str>) -> bool {
    let (Some(secret), Some(token)) = (secret, token) else {
        return false;
    };

    let Some((salt_b64, mac_b64)) = token.split_once('.') else {
        return false;
    };
    let Ok(salt) = URL_SAFE_NO_PAD.decode(salt_b64) else {
        return false;
    };
    let Ok(presented) = URL_SAFE_NO_PAD.decode(mac_b64) else {
        return false;
    };
    if salt.len() != SALT_BYTES || presented.len() != MAC_BYTES {
        return false;
    }

    let expected = mac_for(secret, &salt);
    expected[..].ct_eq(&presented[..]).into()
}
