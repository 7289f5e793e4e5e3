//! Driving port for the login use-case.
//!
//! Inbound adapters exchange a username for a signed gateway token through
//! this trait without knowing which store or gateway backs it.

use async_trait::async_trait;

use crate::domain::{Error, Username};

#[async_trait]
pub trait LoginService: Send + Sync {
    /// Return a signed token for a provisioned user.
    async fn login(&self, username: &Username) -> Result<String, Error>;
}

/// Canned login service for handler tests.
///
/// `known` logs in with `token`; every other username is unauthorised.
#[derive(Debug, Clone)]
pub struct FixtureLoginService {
    known: String,
    token: String,
}

impl FixtureLoginService {
    pub fn new(known: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            known: known.into(),
            token: token.into(),
        }
    }
}

#[async_trait]
impl LoginService for FixtureLoginService {
    async fn login(&self, username: &Username) -> Result<String, Error> {
        if username.as_ref() == self.known {
            Ok(self.token.clone())
        } else {
            Err(Error::unauthorized("Unauthorized"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorCode;
    use rstest::rstest;

    #[rstest]
    #[case("user-123", true)]
    #[case("someone-else", false)]
    #[tokio::test]
    async fn fixture_only_recognises_the_known_user(
        #[case] username: &str,
        #[case] should_succeed: bool,
    ) {
        let service = FixtureLoginService::new("user-123", "token");
        let username = Username::new(username).expect("username");
        match (should_succeed, service.login(&username).await) {
            (true, Ok(token)) => assert_eq!(token, "token"),
            (false, Err(err)) => assert_eq!(err.code(), ErrorCode::Unauthorized),
            (true, Err(err)) => panic!("expected success, got error: {err:?}"),
            (false, Ok(token)) => panic!("expected failure, got token: {token}"),
        }
    }
}
