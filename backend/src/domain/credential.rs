//! Gateway signing credentials.

use std::fmt;

use zeroize::Zeroizing;

/// Algorithm identifier for HMAC-SHA256 signed tokens.
pub const HS256: &str = "HS256";

/// Key/algorithm/secret tuple issued by the gateway for one consumer.
///
/// The secret is zeroed on drop and never rendered by `Debug`.
#[derive(Clone, PartialEq, Eq)]
pub struct GatewayCredential {
    key: String,
    algorithm: String,
    secret: Zeroizing<String>,
}

impl GatewayCredential {
    pub fn new(
        key: impl Into<String>,
        algorithm: impl Into<String>,
        secret: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            algorithm: algorithm.into(),
            secret: Zeroizing::new(secret.into()),
        }
    }

    /// Issuer claim placed in crafted tokens.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }

    /// HMAC key material.
    pub fn secret(&self) -> &str {
        self.secret.as_str()
    }
}

impl fmt::Debug for GatewayCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayCredential")
            .field("key", &self.key)
            .field("algorithm", &self.algorithm)
            .field("secret", &"<redacted>")
            .finish()
    }
}
