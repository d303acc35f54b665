//! HMAC signing for provider callback URLs and shared-secret comparison.

use constant_time_eq::constant_time_eq;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

use crate::types::DbId;

type HmacSha256 = Hmac<Sha256>;

// ---------------------------------------------------------------------------
// Callback signatures
// ---------------------------------------------------------------------------

fn callback_mac(secret: &str, task_id: DbId) -> HmacSha256 {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(b"video_task:");
    mac.update(task_id.to_string().as_bytes());
    mac
}

/// Hex-encoded HMAC-SHA256 over the internal task id.
///
/// Embedded in the callback URL so the webhook can tell a provider callback
/// from a forged request without the provider supporting signed payloads.
pub fn sign_task_callback(secret: &str, task_id: DbId) -> String {
    hex::encode(callback_mac(secret, task_id).finalize().into_bytes())
}

/// Verify a callback signature in constant time.
pub fn verify_task_callback(secret: &str, task_id: DbId, signature: &str) -> bool {
    match hex::decode(signature) {
        Some(bytes) => callback_mac(secret, task_id).verify_slice(&bytes).is_ok(),
        None => false,
    }
}

// ---------------------------------------------------------------------------
// Shared secrets
// ---------------------------------------------------------------------------

/// Compare two shared secrets without leaking where they differ.
///
/// Both sides are hashed first so the comparison always runs over 32 bytes
/// regardless of input length. An empty expected secret never matches.
pub fn secrets_match(expected: &str, provided: &str) -> bool {
    if expected.is_empty() {
        return false;
    }
    let a = Sha256::digest(expected.as_bytes());
    let b = Sha256::digest(provided.as_bytes());
    constant_time_eq(a.as_slice(), b.as_slice())
}

// ---------------------------------------------------------------------------
// hex helpers (no extra dep)
// ---------------------------------------------------------------------------

mod hex {
    pub fn encode(bytes: impl AsRef<[u8]>) -> String {
        bytes.as_ref().iter().map(|b| format!("{b:02x}")).collect()
    }

    pub fn decode(s: &str) -> Option<Vec<u8>> {
        if s.len() % 2 != 0 || !s.is_ascii() {
            return None;
        }
        (0..s.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&s[i..i + 2], 16).ok())
            .collect()
    }
}
