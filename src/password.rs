//! Password hashing for the administrator account.
//!
//! Hashes use PBKDF2-HMAC-SHA256 and are encoded as
//! `$pbkdf2-sha256$i=<iterations>$<salt>$<hash>` with unpadded standard base64.

use std::num::NonZeroU32;

use anyhow::Result;
use base64::Engine;
use base64::engine::general_purpose::STANDARD_NO_PAD;
use ring::pbkdf2;
use ring::rand::{SecureRandom, SystemRandom};

const ITERATIONS: u32 = 100_000;
const SALT_LEN: usize = 16;
const HASH_LEN: usize = 32;
const SCHEME: &str = "pbkdf2-sha256";

/// Hashes `password` with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String> {
    let mut salt = [0u8; SALT_LEN];
    SystemRandom::new()
        .fill(&mut salt)
        .map_err(|_| anyhow::anyhow!("failed to generate password salt"))?;
    Ok(hash_with_salt(password, &salt, ITERATIONS))
}

/// Checks `password` against a hash produced by [`hash_password`].
#[cfg(test)]
fn verify_password(password: &str, encoded: &str) -> Result<bool> {
    use anyhow::Context;

    let mut parts = encoded.split('$');
    let (Some(""), Some(SCHEME), Some(iterations), Some(salt), Some(hash), None) = (
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
    ) else {
        anyhow::bail!("unrecognized password hash format");
    };

    let iterations = iterations
        .strip_prefix("i=")
        .and_then(|i| i.parse::<u32>().ok())
        .and_then(NonZeroU32::new)
        .context("invalid iteration count in password hash")?;
    let salt = STANDARD_NO_PAD
        .decode(salt)
        .context("invalid salt in password hash")?;
    let hash = STANDARD_NO_PAD
        .decode(hash)
        .context("invalid digest in password hash")?;

    Ok(pbkdf2::verify(
        pbkdf2::PBKDF2_HMAC_SHA256,
        iterations,
        &salt,
        password.as_bytes(),
        &hash,
    )
    .is_ok())
}

fn hash_with_salt(password: &str, salt: &[u8], iterations: u32) -> String {
    let rounds = NonZeroU32::new(iterations).unwrap_or(NonZeroU32::MIN);
    let mut out = [0u8; HASH_LEN];
    pbkdf2::derive(pbkdf2::PBKDF2_HMAC_SHA256, rounds, salt, password.as_bytes(), &mut out);
    format!(
        "${}$i={}${}${}",
        SCHEME,
        rounds,
        STANDARD_NO_PAD.encode(salt),
        STANDARD_NO_PAD.encode(out)
    )
}
