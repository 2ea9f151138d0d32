// src/services/signing.rs

//! HMAC-SHA256 request signatures shared with the proxy server.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error)]
#[error("Invalid HMAC key: {0}")]
pub struct SigningError(String);

fn keyed(secret: &str) -> Result<HmacSha256, SigningError> {
  HmacSha256::new_from_slice(secret.as_bytes()).map_err(|e| SigningError(e.to_string()))
}

/// Hex HMAC-SHA256 of `parts` concatenated without separators.
///
/// The proxy recomputes the same digest, so part order is part of the protocol.
pub fn sign(secret: &str, parts: &[&str]) -> Result<String, SigningError> {
  let mut mac = keyed(secret)?;
  for part in parts {
    mac.update(part.as_bytes());
  }
  Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Raw digest over `message`; used where a truncated tag is compared.
pub(crate) fn digest(secret: &str, message: &str) -> Result<Vec<u8>, SigningError> {
  let mut mac = keyed(secret)?;
  mac.update(message.as_bytes());
  Ok(mac.finalize().into_bytes().to_vec())
}

/// Constant-time check of a hex tag that may be a left-truncated digest.
pub(crate) fn verify_truncated(secret: &str, message: &str, tag_hex: &str) -> Result<bool, SigningError> {
  let Ok(tag) = hex::decode(tag_hex) else {
    return Ok(false);
  };
  if tag.is_empty() {
    return Ok(false);
  }
  let mut mac = keyed(secret)?;
  mac.update(message.as_bytes());
  Ok(mac.verify_truncated_left(&tag).is_ok())
}
