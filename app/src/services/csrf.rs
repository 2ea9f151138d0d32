// src/services/csrf.rs

//! Short-lived CSRF tokens bound to a checkout session and an action name.
//!
//! A token is the first ten bytes of `HMAC(secret, tick|action|session)` in hex.
//! Ticks advance every half lifetime and a token is accepted during its own tick
//! and the one after, so it lives between 12 and 24 hours.

use chrono::Utc;

use crate::services::signing::{self, SigningError};

/// Action name the express checkout script requests its token for.
pub const EXPRESS_NONCE_ACTION: &str = "wpppc-express-nonce";

const TOKEN_BYTES: usize = 10;
const DEFAULT_LIFETIME_SECS: i64 = 24 * 60 * 60;

#[derive(Clone)]
pub struct CsrfGuard {
  secret: String,
  lifetime_secs: i64,
}

impl std::fmt::Debug for CsrfGuard {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("CsrfGuard").field("lifetime_secs", &self.lifetime_secs).finish_non_exhaustive()
  }
}

impl CsrfGuard {
  pub fn new(secret: impl Into<String>) -> Self {
    Self {
      secret: secret.into(),
      lifetime_secs: DEFAULT_LIFETIME_SECS,
    }
  }

  fn tick(&self, now: i64) -> i64 {
    let half = self.lifetime_secs / 2;
    (now + half - 1).div_euclid(half)
  }

  fn message(tick: i64, action: &str, session_id: &str) -> String {
    format!("{}|{}|{}", tick, action, session_id)
  }

  pub fn issue(&self, session_id: &str, action: &str) -> Result<String, SigningError> {
    self.issue_at(session_id, action, Utc::now().timestamp())
  }

  pub fn issue_at(&self, session_id: &str, action: &str, now: i64) -> Result<String, SigningError> {
    let digest = signing::digest(&self.secret, &Self::message(self.tick(now), action, session_id))?;
    Ok(hex::encode(&digest[..TOKEN_BYTES]))
  }

  pub fn verify(&self, token: &str, session_id: &str, action: &str) -> Result<bool, SigningError> {
    self.verify_at(token, session_id, action, Utc::now().timestamp())
  }

  pub fn verify_at(&self, token: &str, session_id: &str, action: &str, now: i64) -> Result<bool, SigningError> {
    if token.len() != TOKEN_BYTES * 2 {
      return Ok(false);
    }
    let tick = self.tick(now);
    for candidate in [tick, tick - 1] {
      if signing::verify_truncated(&self.secret, &Self::message(candidate, action, session_id), token)? {
        return Ok(true);
      }
    }
    Ok(false)
  }
}
