//! Compact signed token crafting.
//!
//! Tokens have the shape `header.payload.signature`, each segment encoded as
//! unpadded base64url. The header is `{"alg":…,"typ":"JWT"}`, the payload
//! carries only the issuer claim `{"iss":<credential key>}`, and the
//! signature is HMAC-SHA256 over `header.payload` keyed by the credential
//! secret. Crafting is deterministic: the same credential always yields the
//! same token.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hmac::{Hmac, Mac};
use serde::Serialize;
use sha2::Sha256;
use thiserror::Error;

use super::credential::{GatewayCredential, HS256};

type HmacSha256 = Hmac<Sha256>;

/// Failures raised while crafting a token.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("unsupported signing algorithm: {algorithm}")]
    UnsupportedAlgorithm { algorithm: String },
    #[error("failed to encode token segment: {message}")]
    Encode { message: String },
    #[error("signing key rejected: {message}")]
    InvalidKey { message: String },
}

// Field order is part of the wire format.
#[derive(Serialize)]
struct Header<'a> {
    alg: &'a str,
    typ: &'a str,
}

#[derive(Serialize)]
struct Claims<'a> {
    iss: &'a str,
}

/// Craft a signed token for `credential`.
///
/// # Errors
/// Returns [`TokenError::UnsupportedAlgorithm`] unless the credential uses
/// `HS256`.
///
/// # Examples
/// ```
/// use users_service::domain::{GatewayCredential, craft_token};
///
/// let credential = GatewayCredential::new("K", "HS256", "S");
/// let token = craft_token(&credential).expect("HS256 is supported");
/// assert_eq!(token.split('.').count(), 3);
/// ```
pub fn craft_token(credential: &GatewayCredential) -> Result<String, TokenError> {
    if credential.algorithm() != HS256 {
        return Err(TokenError::UnsupportedAlgorithm {
            algorithm: credential.algorithm().to_owned(),
        });
    }

    let header = encode_segment(&Header {
        alg: credential.algorithm(),
        typ: "JWT",
    })?;
    let claims = encode_segment(&Claims {
        iss: credential.key(),
    })?;
    let signing_input = format!("{header}.{claims}");

    let mut mac = HmacSha256::new_from_slice(credential.secret().as_bytes()).map_err(|err| {
        TokenError::InvalidKey {
            message: err.to_string(),
        }
    })?;
    mac.update(signing_input.as_bytes());
    let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

    Ok(format!("{signing_input}.{signature}"))
}

fn encode_segment<T: Serialize>(value: &T) -> Result<String, TokenError> {
    let json = serde_json::to_vec(value).map_err(|err| TokenError::Encode {
        message: err.to_string(),
    })?;
    Ok(URL_SAFE_NO_PAD.encode(json))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const REFERENCE_TOKEN: &str = concat!(
        "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9.",
        "eyJpc3MiOiJjNWE1NTkwNmNjMjQ0ZjQ4MzIyNmUwMmJjZmYyYjVlIn0.",
        "DcsoWhy98uc3GVyLCg-sytctfgLHEw6rWNjnWiZa8nA",
    );

    fn reference_credential() -> GatewayCredential {
        GatewayCredential::new(
            "c5a55906cc244f483226e02bcff2b5e",
            "HS256",
            "b0970f7fc9564e65xklfn48930b5d08b1",
        )
    }

    #[test]
    fn crafts_the_reference_token() {
        let token = craft_token(&reference_credential()).expect("token");
        assert_eq!(token, REFERENCE_TOKEN);
    }

    #[test]
    fn crafting_is_deterministic() {
        let credential = reference_credential();
        let first = craft_token(&credential).expect("first token");
        let second = craft_token(&credential).expect("second token");
        assert_eq!(first, second);
    }

    #[test]
    fn segments_decode_to_header_and_issuer_claim() {
        let token = craft_token(&GatewayCredential::new("K", HS256, "S")).expect("token");
        let segments: Vec<&str> = token.split('.').collect();
        assert_eq!(segments.len(), 3);
        assert!(segments.iter().all(|segment| !segment.contains('=')));

        let header = URL_SAFE_NO_PAD.decode(segments[0]).expect("header base64");
        let claims = URL_SAFE_NO_PAD.decode(segments[1]).expect("claims base64");
        assert_eq!(header, br#"{"alg":"HS256","typ":"JWT"}"#);
        assert_eq!(claims, br#"{"iss":"K"}"#);
    }

    #[test]
    fn signature_verifies_with_the_secret() {
        let token = craft_token(&GatewayCredential::new("K", HS256, "S")).expect("token");
        let (signing_input, signature) = token.rsplit_once('.').expect("three segments");
        let signature = URL_SAFE_NO_PAD.decode(signature).expect("signature base64");

        let mut mac = HmacSha256::new_from_slice(b"S").expect("hmac accepts any key length");
        mac.update(signing_input.as_bytes());
        mac.verify_slice(&signature).expect("signature matches");
    }

    #[test]
    fn different_secrets_produce_different_signatures() {
        let a = craft_token(&GatewayCredential::new("K", HS256, "S1")).expect("token");
        let b = craft_token(&GatewayCredential::new("K", HS256, "S2")).expect("token");
        assert_ne!(a, b);
    }

    #[rstest]
    #[case::rsa("RS256")]
    #[case::lowercase("hs256")]
    #[case::empty("")]
    fn unsupported_algorithms_are_rejected(#[case] algorithm: &str) {
        let err = craft_token(&GatewayCredential::new("K", algorithm, "S")).expect_err("rejected");
        assert_eq!(
            err,
            TokenError::UnsupportedAlgorithm {
                algorithm: algorithm.to_owned(),
            }
        );
    }
}
