//! HTTP Digest authentication (RFC 2617) for the device transport.
//!
//! Shelly Gen2+ devices protect their `/rpc/` surface with digest auth
//! over a fixed username. This handler converts a server-issued 401
//! challenge into per-request proof-of-knowledge credentials without
//! ever transmitting the plaintext password.

use md5::{Digest, Md5};
use rand::Rng;
use std::fmt::Write;

/// Parsed parameters of a `WWW-Authenticate: Digest ...` challenge.
#[derive(Debug, Clone, Default)]
struct DigestChallenge {
    realm: String,
    nonce: String,
    qop: Option<String>,
    algorithm: String,
    opaque: Option<String>,
}

/// Digest authentication handler for one device session.
///
/// Holds the most recent challenge only: on a repeated 401 (e.g. a stale
/// nonce) the caller records the new challenge via
/// [`DigestAuth::record_challenge`] and retries the request itself.
pub struct DigestAuth {
    username: String,
    password: String,
    nc: u32,
    challenge: Option<DigestChallenge>,
}

impl DigestAuth {
    /// Create a handler for the given credentials. No challenge is held
    /// until [`DigestAuth::record_challenge`] accepts one.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self { username: username.into(), password: password.into(), nc: 0, challenge: None }
    }

    /// Whether a challenge has been recorded.
    pub fn has_challenge(&self) -> bool {
        self.challenge.is_some()
    }

    /// Parse and store a digest challenge from a 401 response.
    ///
    /// Returns `false` (no-op) unless `status` is 401 and the header is a
    /// digest-scheme challenge. A newly accepted challenge replaces any
    /// previous one.
    pub fn record_challenge(&mut self, status: u16, www_authenticate: &str) -> bool {
        if status != 401 {
            return false;
        }
        let Some(params) = www_authenticate.strip_prefix("Digest ") else {
            return false;
        };

        // Shelly challenges always carry qop=auth; default it the same way
        // when a server omits the parameter.
        let mut challenge = DigestChallenge {
            algorithm: "MD5".to_string(),
            qop: Some("auth".to_string()),
            ..Default::default()
        };
        for part in params.split(',') {
            let Some((key, value)) = part.trim().split_once('=') else {
                continue;
            };
            let value = value.trim().trim_matches('"');
            match key.trim() {
                "realm" => challenge.realm = value.to_string(),
                "nonce" => challenge.nonce = value.to_string(),
                "qop" => challenge.qop = Some(value.to_string()),
                "algorithm" => challenge.algorithm = value.to_string(),
                "opaque" => challenge.opaque = Some(value.to_string()),
                _ => {}
            }
        }

        self.challenge = Some(challenge);
        true
    }

    /// Build an `Authorization` header for the given method and
    /// request-URI (path plus query).
    ///
    /// Returns `None` if no challenge has been recorded. Each call
    /// increments the nonce counter and draws a fresh client nonce.
    pub fn authorization_header(&mut self, method: &str, uri: &str) -> Option<String> {
        let challenge = self.challenge.clone()?;

        self.nc = self.nc.wrapping_add(1);
        let nc_value = format!("{:08x}", self.nc);
        let cnonce = random_hex(16);

        let ha1 = md5_hex(&format!("{}:{}:{}", self.username, challenge.realm, self.password));
        let ha2 = md5_hex(&format!("{}:{}", method, uri));

        let qop = challenge.qop.as_deref();
        let response = match qop {
            Some(q @ ("auth" | "auth-int")) => md5_hex(&format!(
                "{}:{}:{}:{}:{}:{}",
                ha1, challenge.nonce, nc_value, cnonce, q, ha2
            )),
            _ => md5_hex(&format!("{}:{}:{}", ha1, challenge.nonce, ha2)),
        };

        let mut header = format!(
            "Digest username=\"{}\", realm=\"{}\", nonce=\"{}\", uri=\"{}\", algorithm={}, response=\"{}\"",
            self.username, challenge.realm, challenge.nonce, uri, challenge.algorithm, response
        );
        if let Some(q @ ("auth" | "auth-int")) = qop {
            let _ = write!(header, ", qop={}, nc={}, cnonce=\"{}\"", q, nc_value, cnonce);
        }
        if let Some(opaque) = &challenge.opaque {
            let _ = write!(header, ", opaque=\"{}\"", opaque);
        }

        Some(header)
    }
}

/// Lowercase hex MD5 of the input string.
fn md5_hex(input: &str) -> String {
    let digest = Md5::digest(input.as_bytes());
    let mut out = String::with_capacity(32);
    for byte in digest {
        let _ = write!(out, "{:02x}", byte);
    }
    out
}

/// Generates a random lowercase hex string of the specified length.
fn random_hex(length: usize) -> String {
    const HEX_CHARS: &[u8] = b"0123456789abcdef";
    let mut rng = rand::thread_rng();
    (0..length).map(|_| HEX_CHARS[rng.gen_range(0..16)] as char).collect()
}

#[cfg(test)]
#[path = "digest_tests.rs"]
mod digest_tests;
