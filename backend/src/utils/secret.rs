use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use rand::{rngs::OsRng, RngCore};

/// 32 bytes of OS randomness, well above the 128-bit floor for an
/// unguessable single-use credential.
const SECRET_BYTES: usize = 32;

/// Generates an opaque, URL-safe attendance token secret.
pub fn generate_token_secret() -> String {
    let mut bytes = [0u8; SECRET_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
