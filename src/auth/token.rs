use chrono::{Duration, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// The id of the user the token was issued to.
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

/// Issues and verifies HS256-signed bearer tokens.
pub struct TokenSigner {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenSigner {
    pub fn new(secret: &str, ttl_hours: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::hours(ttl_hours),
        }
    }

    /// Issues a token for `sub` with the default lifetime.
    pub fn issue(&self, sub: &str) -> Result<String> {
        self.issue_with_ttl(sub, self.ttl)
    }

    /// Issues a token for `sub` expiring after `ttl`.
    pub fn issue_with_ttl(&self, sub: &str, ttl: Duration) -> Result<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: sub.to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| Error::Config(format!("failed to sign token: {e}")))
    }

    /// Decodes and verifies a signed token, keeping the failure modes
    /// distinct: expiry, a signature that does not match, and everything
    /// else (structurally broken input).
    pub fn verify(&self, token: &str) -> Result<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        match decode::<Claims>(token, &self.decoding, &validation) {
            Ok(data) => Ok(data.claims),
            Err(e) => match e.kind() {
                ErrorKind::ExpiredSignature => Err(Error::TokenExpired),
                ErrorKind::InvalidSignature => Err(Error::InvalidSignature),
                _ => Err(Error::MalformedAuth(format!("invalid token: {e}"))),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_and_verify_round_trip() {
        let signer = TokenSigner::new("secret", 24);
        let token = signer.issue("user-1").unwrap();

        let claims = signer.verify(&token).unwrap();
        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.exp - claims.iat, 24 * 3600);
    }

    #[test]
    fn test_verify_rejects_wrong_secret() {
        let signer = TokenSigner::new("secret", 24);
        let other = TokenSigner::new("different", 24);
        let token = signer.issue("user-1").unwrap();

        assert!(matches!(other.verify(&token), Err(Error::InvalidSignature)));
    }

    #[test]
    fn test_verify_rejects_expired_token() {
        let signer = TokenSigner::new("secret", 24);
        let token = signer
            .issue_with_ttl("user-1", Duration::seconds(-10))
            .unwrap();

        assert!(matches!(signer.verify(&token), Err(Error::TokenExpired)));
    }

    #[test]
    fn test_verify_rejects_garbage() {
        let signer = TokenSigner::new("secret", 24);

        assert!(matches!(
            signer.verify("not-a-token"),
            Err(Error::MalformedAuth(_))
        ));
        assert!(matches!(
            signer.verify("aaa.bbb.ccc"),
            Err(Error::MalformedAuth(_))
        ));
    }

    #[test]
    fn test_custom_ttl() {
        let signer = TokenSigner::new("secret", 24);
        let token = signer
            .issue_with_ttl("user-1", Duration::seconds(90))
            .unwrap();

        let claims = signer.verify(&token).unwrap();
        assert_eq!(claims.exp - claims.iat, 90);
    }
}
