//! Stateless session credentials: signed, time-limited tokens carrying the
//! subject id and login email. Verification recomputes the signature and
//! checks expiry; there is no server-side session table and therefore no
//! early revocation. A credential is valid iff its signature verifies and
//! the current time is before its expiry.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

use super::principal::Principal;

/// Claims embedded in every issued credential.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user's stable identifier.
    pub sub: Uuid,
    pub email: String,
    /// Issued-at, Unix seconds.
    pub iat: i64,
    /// Expiry, Unix seconds.
    pub exp: i64,
}

/// Issues and verifies session credentials. The signing secret is injected
/// at construction; the service holds no other state.
#[derive(Clone)]
pub struct TokenService {
    secret: String,
    ttl: Duration,
}

impl TokenService {
    pub fn new(secret: impl Into<String>, ttl: Duration) -> Self {
        Self { secret: secret.into(), ttl }
    }

    /// Sign a credential for the given identity. Pure apart from the clock.
    pub fn issue(&self, principal: &Principal) -> AppResult<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: principal.user_id,
            email: principal.email.clone(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| AppError::server(e.to_string()))
    }

    /// Validate signature and expiry. A bad signature and an expired
    /// credential are deliberately indistinguishable to the caller.
    pub fn verify(&self, token: &str) -> AppResult<Principal> {
        let mut validation = Validation::default();
        validation.leeway = 0;
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .map_err(|_| AppError::unauthenticated("Invalid or expired token"))?;
        Ok(Principal { user_id: data.claims.sub, email: data.claims.email })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal() -> Principal {
        Principal { user_id: Uuid::new_v4(), email: "a@x".into() }
    }

    #[test]
    fn issued_credential_verifies_to_same_identity() {
        let svc = TokenService::new("secret", Duration::days(7));
        let p = principal();
        let token = svc.issue(&p).unwrap();
        let resolved = svc.verify(&token).unwrap();
        assert_eq!(resolved, p);
    }

    #[test]
    fn expired_credential_is_unauthenticated() {
        let svc = TokenService::new("secret", Duration::seconds(-10));
        let token = svc.issue(&principal()).unwrap();
        let err = svc.verify(&token).unwrap_err();
        assert_eq!(err.http_status(), 401);
    }

    #[test]
    fn wrong_secret_is_indistinguishable_from_expiry() {
        let issuer = TokenService::new("secret-a", Duration::days(7));
        let verifier = TokenService::new("secret-b", Duration::days(7));
        let token = issuer.issue(&principal()).unwrap();
        let forged = verifier.verify(&token).unwrap_err();

        let expired_svc = TokenService::new("secret-a", Duration::seconds(-10));
        let expired_token = expired_svc.issue(&principal()).unwrap();
        let expired = expired_svc.verify(&expired_token).unwrap_err();

        // Same kind, same message: callers learn nothing about which check failed.
        assert_eq!(
            serde_json::to_value(&forged).unwrap(),
            serde_json::to_value(&expired).unwrap()
        );
    }
}
