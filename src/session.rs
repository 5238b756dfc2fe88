use super::{crypto, models::AuthUser};
use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};

/// HMAC-secured session string, signed by $SESSION_SECRET
///
/// Note: since this guy is stored in a browser cookie, it's important to
/// ensure it does not get too large. The provider's access token is a JWT,
/// so we keep nothing else in here besides the user.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub user: AuthUser,
}

pub fn serialize_session(secret: &[u8], session: &Session) -> String {
    let json_bytes =
        serde_json::to_vec(session).expect("session can be JSON serialized");
    let b64 = general_purpose::URL_SAFE_NO_PAD.encode(json_bytes);
    let raw_digest = crypto::get_digest(secret, b64.as_bytes());
    let digest = general_purpose::URL_SAFE_NO_PAD.encode(raw_digest);

    format!("{}.{}", b64, digest)
}

pub fn deserialize_session(
    secret: &[u8],
    cookie: &str,
) -> Result<Session, &'static str> {
    let Some((b64_json, b64_digest)) = cookie.split_once('.') else {
        return Err("Invalid session");
    };
    let digest = general_purpose::URL_SAFE_NO_PAD
        .decode(b64_digest)
        .map_err(|_| "Cannot base64 decode the digest")?;

    if !crypto::is_valid(secret, b64_json.as_bytes(), &digest) {
        return Err("Failed to validate session signature");
    }

    let json_bytes = general_purpose::URL_SAFE_NO_PAD
        .decode(b64_json)
        .map_err(|_| "Cannot base64 decode session string")?;

    serde_json::from_slice(&json_bytes)
        .map_err(|_| "Cannot deserialize session JSON")
}
