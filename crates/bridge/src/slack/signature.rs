//! Verification of inbound Slack event signatures.
//!
//! Implements Slack's signing scheme:
//! <https://api.slack.com/authentication/verifying-requests-from-slack>

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;

use super::error::SlackError;

/// Maximum accepted age of a delivery, in seconds.
const MAX_TIMESTAMP_SKEW_SECS: i64 = 300;

/// Verify a Slack event delivery signature.
///
/// # Arguments
///
/// * `signing_secret` - The app's signing secret
/// * `timestamp` - The `X-Slack-Request-Timestamp` header value
/// * `body` - The raw request body
/// * `signature` - The `X-Slack-Signature` header value
///
/// # Errors
///
/// Returns `SlackError::InvalidSignature` if the timestamp is malformed,
/// outside the replay window, or the signature does not match.
pub fn verify_signature(
    signing_secret: &SecretString,
    timestamp: &str,
    body: &str,
    signature: &str,
) -> Result<(), SlackError> {
    // Check timestamp to prevent replay attacks (5 minutes)
    let ts: i64 = timestamp
        .parse()
        .map_err(|_| SlackError::InvalidSignature("Invalid timestamp".to_owned()))?;

    let now_secs = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_err(|e| SlackError::InvalidSignature(e.to_string()))?
        .as_secs();

    let now = i64::try_from(now_secs)
        .map_err(|_| SlackError::InvalidSignature("System time overflow".to_owned()))?;

    if (now - ts).abs() > MAX_TIMESTAMP_SKEW_SECS {
        return Err(SlackError::InvalidSignature(
            "Request timestamp too old".to_owned(),
        ));
    }

    // Compute expected signature
    let sig_basestring = format!("v0:{timestamp}:{body}");

    let mut mac = Hmac::<Sha256>::new_from_slice(signing_secret.expose_secret().as_bytes())
        .map_err(|e| SlackError::InvalidSignature(e.to_string()))?;

    mac.update(sig_basestring.as_bytes());

    let expected = format!("v0={}", hex::encode(mac.finalize().into_bytes()));

    // Constant-time comparison
    if !constant_time_compare(&expected, signature) {
        return Err(SlackError::InvalidSignature(
            "Signature mismatch".to_owned(),
        ));
    }

    Ok(())
}

/// Constant-time string comparison to prevent timing attacks.
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result: u8 = 0;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }

    result == 0
}
