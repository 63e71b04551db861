//! Signed-token service.
//!
//! Three token kinds, one secret each: session tokens authenticate requests
//! and carry no expiry (they are revoked by removing them from the store);
//! activation and password-reset tokens prove control of an email address
//! and expire after a configurable lifetime (24 h by default).

use axum::extract::FromRef;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use crate::{config::TokenConfig, error::ApiError, state::AppState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Session,
    Activation,
    PasswordReset,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub iat: usize,
    /// Random per-token id: two tokens minted for the same subject in the
    /// same second must still be distinct strings.
    pub jti: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp: Option<usize>,
}

#[derive(Clone)]
struct KindKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl KindKeys {
    fn from_secret(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }
}

#[derive(Clone)]
pub struct TokenKeys {
    session: KindKeys,
    activation: KindKeys,
    reset: KindKeys,
    activation_ttl: Duration,
    reset_ttl: Duration,
}

impl FromRef<AppState> for TokenKeys {
    fn from_ref(state: &AppState) -> Self {
        Self::from_config(&state.config.tokens)
    }
}

impl TokenKeys {
    fn from_config(cfg: &TokenConfig) -> Self {
        Self {
            session: KindKeys::from_secret(&cfg.session_secret),
            activation: KindKeys::from_secret(&cfg.activation_secret),
            reset: KindKeys::from_secret(&cfg.reset_secret),
            activation_ttl: Duration::hours(cfg.activation_ttl_hours),
            reset_ttl: Duration::hours(cfg.reset_ttl_hours),
        }
    }

    fn keys(&self, kind: TokenKind) -> &KindKeys {
        match kind {
            TokenKind::Session => &self.session,
            TokenKind::Activation => &self.activation,
            TokenKind::PasswordReset => &self.reset,
        }
    }

    fn ttl(&self, kind: TokenKind) -> Option<Duration> {
        match kind {
            TokenKind::Session => None,
            TokenKind::Activation => Some(self.activation_ttl),
            TokenKind::PasswordReset => Some(self.reset_ttl),
        }
    }

    pub fn sign(&self, kind: TokenKind, user_id: Uuid) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let claims = Claims {
            sub: user_id,
            iat: now.unix_timestamp() as usize,
            jti: Uuid::new_v4(),
            exp: self
                .ttl(kind)
                .map(|ttl| (now + ttl).unix_timestamp() as usize),
        };
        let token = encode(&Header::default(), &claims, &self.keys(kind).encoding)?;
        debug!(user_id = %user_id, kind = ?kind, "token signed");
        Ok(token)
    }

    /// Check signature and structure against the kind's secret and return the
    /// subject id. Expiry failures and everything else stay distinguishable.
    pub fn verify(&self, kind: TokenKind, token: &str) -> Result<Uuid, ApiError> {
        let mut validation = Validation::default();
        if kind == TokenKind::Session {
            // No expiry on session tokens; revocation happens in the store.
            validation.set_required_spec_claims::<&str>(&[]);
            validation.validate_exp = false;
        }
        let data = decode::<Claims>(token, &self.keys(kind).decoding, &validation).map_err(
            |e| match e.kind() {
                ErrorKind::ExpiredSignature => ApiError::TokenExpired,
                _ => ApiError::TokenInvalid,
            },
        )?;
        Ok(data.claims.sub)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_keys() -> TokenKeys {
        TokenKeys::from_config(&TokenConfig {
            session_secret: "test-session-secret".into(),
            activation_secret: "test-activation-secret".into(),
            reset_secret: "test-reset-secret".into(),
            activation_ttl_hours: 24,
            reset_ttl_hours: 24,
        })
    }

    #[test]
    fn sign_and_verify_every_kind() {
        let keys = make_keys();
        let user_id = Uuid::new_v4();
        for kind in [
            TokenKind::Session,
            TokenKind::Activation,
            TokenKind::PasswordReset,
        ] {
            let token = keys.sign(kind, user_id).expect("sign");
            let sub = keys.verify(kind, &token).expect("verify");
            assert_eq!(sub, user_id);
        }
    }

    #[test]
    fn tokens_for_the_same_user_are_distinct() {
        let keys = make_keys();
        let user_id = Uuid::new_v4();
        let first = keys.sign(TokenKind::Session, user_id).expect("sign");
        let second = keys.sign(TokenKind::Session, user_id).expect("sign");
        assert_ne!(first, second);
    }

    #[test]
    fn kinds_do_not_cross_verify() {
        let keys = make_keys();
        let user_id = Uuid::new_v4();
        let activation = keys.sign(TokenKind::Activation, user_id).expect("sign");
        let err = keys.verify(TokenKind::Session, &activation).unwrap_err();
        assert!(matches!(err, ApiError::TokenInvalid));

        let session = keys.sign(TokenKind::Session, user_id).expect("sign");
        let err = keys.verify(TokenKind::PasswordReset, &session).unwrap_err();
        assert!(matches!(err, ApiError::TokenInvalid));
    }

    #[test]
    fn a_tampered_signature_is_invalid() {
        let keys = make_keys();
        let mut token = keys.sign(TokenKind::Session, Uuid::new_v4()).expect("sign");
        let last = if token.pop() == Some('A') { 'B' } else { 'A' };
        token.push(last);

        let err = keys.verify(TokenKind::Session, &token).unwrap_err();
        assert!(matches!(err, ApiError::TokenInvalid));
    }

    #[test]
    fn garbage_is_invalid_not_expired() {
        let keys = make_keys();
        let err = keys
            .verify(TokenKind::Activation, "definitely-not-a-jwt")
            .unwrap_err();
        assert!(matches!(err, ApiError::TokenInvalid));
    }

    #[test]
    fn expired_activation_token_is_reported_as_expired() {
        let keys = make_keys();
        // Hand-craft a token whose exp is one hour in the past, well beyond
        // the default 60 s leeway.
        let past = (OffsetDateTime::now_utc() - Duration::hours(1)).unix_timestamp() as usize;
        let claims = Claims {
            sub: Uuid::new_v4(),
            iat: past,
            jti: Uuid::new_v4(),
            exp: Some(past),
        };
        let token = encode(
            &Header::default(),
            &claims,
            &keys.keys(TokenKind::Activation).encoding,
        )
        .expect("encode");

        let err = keys.verify(TokenKind::Activation, &token).unwrap_err();
        assert!(matches!(err, ApiError::TokenExpired));
    }

    #[test]
    fn activation_token_without_expiry_is_invalid() {
        let keys = make_keys();
        let claims = Claims {
            sub: Uuid::new_v4(),
            iat: OffsetDateTime::now_utc().unix_timestamp() as usize,
            jti: Uuid::new_v4(),
            exp: None,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &keys.keys(TokenKind::Activation).encoding,
        )
        .expect("encode");

        let err = keys.verify(TokenKind::Activation, &token).unwrap_err();
        assert!(matches!(err, ApiError::TokenInvalid));
    }

    #[test]
    fn session_tokens_verify_without_expiry() {
        let keys = make_keys();
        let user_id = Uuid::new_v4();
        let token = keys.sign(TokenKind::Session, user_id).expect("sign");
        // A session token re-checked much later would still pass the
        // signature step; only store removal revokes it.
        assert_eq!(keys.verify(TokenKind::Session, &token).expect("verify"), user_id);
    }
}
