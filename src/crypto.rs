use base64::{engine::general_purpose, Engine as _};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

fn mac(secret: &[u8], val: &[u8]) -> HmacSha256 {
    let mut mac = HmacSha256::new_from_slice(secret)
        .expect("hmac accepts keys of any length");
    mac.update(val);
    mac
}

pub fn get_digest(secret: &[u8], val: &[u8]) -> Vec<u8> {
    mac(secret, val).finalize().into_bytes().to_vec()
}

/// Constant-time check of `digest` against `val`.
pub fn is_valid(secret: &[u8], val: &[u8], digest: &[u8]) -> bool {
    mac(secret, val).verify_slice(digest).is_ok()
}

/// A fresh PKCE code verifier: 64 random hex characters, well inside the
/// 43..=128 unreserved characters RFC 7636 allows.
pub fn code_verifier() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

/// The `S256` challenge for `verifier`.
pub fn code_challenge(verifier: &str) -> String {
    general_purpose::URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}
