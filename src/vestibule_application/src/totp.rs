//! Thin wrapper over `totp-rs` with the RFC 6238 defaults this crate uses
//! everywhere: SHA-1, 6 digits, 30-second steps, ±1 step skew.

use totp_rs::{Algorithm, Secret, TOTP};

pub const STEP_SECONDS: u64 = 30;

/// The time-step a Unix timestamp falls into; claimed on successful
/// verification so a code never validates twice in the same step.
pub fn current_step(timestamp: u64) -> u64 {
    timestamp / STEP_SECONDS
}

fn build(
    secret_bytes: Vec<u8>,
    issuer: &str,
    account: &str,
) -> Result<TOTP, String> {
    TOTP::new(
        Algorithm::SHA1,
        6,
        1,
        STEP_SECONDS,
        secret_bytes,
        Some(issuer.to_string()),
        account.to_string(),
    )
    .map_err(|e| format!("TOTP init: {e}"))
}

/// Generate a TOTP enrollment: `(base32_secret, otpauth_uri)`.
pub fn generate_enrollment(issuer: &str, account: &str) -> Result<(String, String), String> {
    let secret = Secret::generate_secret();
    let secret_bytes = secret.to_bytes().map_err(|e| format!("secret bytes: {e}"))?;

    let totp = build(secret_bytes, issuer, account)?;

    let base32 = secret.to_encoded().to_string();
    let uri = totp.get_url();
    Ok((base32, uri))
}

/// Verify `code` against a base32 secret at `timestamp`.
pub fn verify(
    secret_base32: &str,
    code: &str,
    issuer: &str,
    account: &str,
    timestamp: u64,
) -> Result<bool, String> {
    let secret_bytes = Secret::Encoded(secret_base32.to_string())
        .to_bytes()
        .map_err(|e| format!("secret decode: {e}"))?;

    let totp = build(secret_bytes, issuer, account)?;
    Ok(totp.check(code.trim(), timestamp))
}

/// Compute the valid code for `timestamp`. Test and enrollment tooling only;
/// verification always goes through [`verify`].
pub fn generate(secret_base32: &str, timestamp: u64) -> Result<String, String> {
    let secret_bytes = Secret::Encoded(secret_base32.to_string())
        .to_bytes()
        .map_err(|e| format!("secret decode: {e}"))?;

    let totp = build(secret_bytes, "vestibule", "probe")?;
    Ok(totp.generate(timestamp))
}
