use std::time::Duration;

use axum::extract::FromRef;
use jsonwebtoken::{decode, encode, errors::Error as JwtError, DecodingKey, EncodingKey, Header, Validation};
use time::OffsetDateTime;
use tracing::debug;
use uuid::Uuid;

use crate::auth::claims::{AccessClaims, OAuthStateClaims, SessionClaims};
use crate::auth::dto::SessionToken;
use crate::config::AuthConfig;
use crate::state::AppState;

/// Lifetime of the secondary access token.
pub const ACCESS_TOKEN_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);
/// Lifetime of the OAuth state cookie.
pub const OAUTH_STATE_TTL: Duration = Duration::from_secs(10 * 60);

const LEEWAY_SECS: u64 = 60;

/// Signing keys for session tokens, access tokens and OAuth state.
#[derive(Clone)]
pub struct JwtKeys {
    session_encoding: EncodingKey,
    session_decoding: DecodingKey,
    access_encoding: EncodingKey,
    #[cfg(test)]
    access_decoding: DecodingKey,
    pub session_max_age: Duration,
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        Self::from_config(&state.config.auth)
    }
}

fn unix(t: OffsetDateTime) -> usize {
    t.unix_timestamp().max(0) as usize
}

impl JwtKeys {
    pub fn from_config(auth: &AuthConfig) -> Self {
        let session = auth.session_secret.as_bytes();
        let access = auth.access_token_secret.as_bytes();
        Self {
            session_encoding: EncodingKey::from_secret(session),
            session_decoding: DecodingKey::from_secret(session),
            access_encoding: EncodingKey::from_secret(access),
            #[cfg(test)]
            access_decoding: DecodingKey::from_secret(access),
            session_max_age: Duration::from_secs(auth.session_max_age_secs as u64),
        }
    }

    fn validation() -> Validation {
        let mut validation = Validation::default();
        validation.leeway = LEEWAY_SECS;
        validation
    }

    /// Signs `{userId}` with the access-token secret, valid for seven days.
    pub fn sign_access(&self, user_id: &str) -> Result<String, JwtError> {
        let now = OffsetDateTime::now_utc();
        let claims = AccessClaims {
            user_id: user_id.to_string(),
            iat: unix(now),
            exp: unix(now + ACCESS_TOKEN_TTL),
        };
        let token = encode(&Header::default(), &claims, &self.access_encoding)?;
        debug!(user_id = %user_id, "access token signed");
        Ok(token)
    }

    #[cfg(test)]
    pub fn verify_access(&self, token: &str) -> Result<AccessClaims, JwtError> {
        let data = decode::<AccessClaims>(token, &self.access_decoding, &Self::validation())?;
        Ok(data.claims)
    }

    /// Encodes the session token with a fresh expiry. Returns the JWT and
    /// the moment it expires.
    pub fn encode_session(&self, token: &SessionToken) -> Result<(String, OffsetDateTime), JwtError> {
        let now = OffsetDateTime::now_utc();
        let expires = now + self.session_max_age;
        let claims = SessionClaims::from_token(
            token,
            unix(now),
            unix(expires),
            Uuid::new_v4().to_string(),
        );
        let jwt = encode(&Header::default(), &claims, &self.session_encoding)?;
        Ok((jwt, expires))
    }

    pub fn decode_session(&self, jwt: &str) -> Result<(SessionToken, OffsetDateTime), JwtError> {
        let data = decode::<SessionClaims>(jwt, &self.session_decoding, &Self::validation())?;
        let expires = OffsetDateTime::from_unix_timestamp(data.claims.exp as i64)
            .unwrap_or(OffsetDateTime::UNIX_EPOCH);
        Ok((data.claims.into_token(), expires))
    }

    pub fn encode_oauth_state(
        &self,
        provider: &str,
        state: String,
        pkce_verifier: String,
        callback_url: String,
    ) -> Result<String, JwtError> {
        let claims = OAuthStateClaims {
            provider: provider.to_string(),
            state,
            pkce_verifier,
            callback_url,
            exp: unix(OffsetDateTime::now_utc() + OAUTH_STATE_TTL),
        };
        encode(&Header::default(), &claims, &self.session_encoding)
    }

    pub fn decode_oauth_state(&self, jwt: &str) -> Result<OAuthStateClaims, JwtError> {
        let data = decode::<OAuthStateClaims>(jwt, &self.session_decoding, &Self::validation())?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::dto::{EnrichedToken, ProviderToken};
    use crate::config::AppConfig;

    fn keys_with(session: &str, access: &str) -> JwtKeys {
        let cfg = AppConfig::from_lookup(|key| match key {
            "NEXTAUTH_SECRET" => Some(session.to_string()),
            "JWT_SECRET" => Some(access.to_string()),
            _ => None,
        })
        .unwrap();
        JwtKeys::from_config(&cfg.auth)
    }

    #[test]
    fn access_token_carries_user_and_seven_day_expiry() {
        let keys = keys_with("session-secret", "access-secret");
        let token = keys.sign_access("user-1").expect("sign access");
        let claims = keys.verify_access(&token).expect("verify access");
        assert_eq!(claims.user_id, "user-1");
        assert_eq!(claims.exp - claims.iat, 7 * 24 * 60 * 60);
    }

    #[test]
    fn access_token_signed_with_access_secret_only() {
        let keys = keys_with("session-secret", "access-secret");
        let other = keys_with("session-secret", "different");
        let token = keys.sign_access("user-1").unwrap();
        assert!(other.verify_access(&token).is_err());
    }

    #[test]
    fn session_roundtrip_preserves_enriched_token() {
        let keys = keys_with("session-secret", "access-secret");
        let token = SessionToken::Enriched(EnrichedToken {
            profile: ProviderToken {
                sub: Some("sub-1".into()),
                email: Some("a@x.com".into()),
                name: Some("Ada".into()),
                picture: None,
            },
            id: "user-1".into(),
            access_token: "inner".into(),
        });
        let (jwt, expires) = keys.encode_session(&token).unwrap();
        let (decoded, decoded_expires) = keys.decode_session(&jwt).unwrap();
        assert_eq!(decoded, token);
        assert_eq!(decoded_expires.unix_timestamp(), expires.unix_timestamp());
    }

    #[test]
    fn session_rejected_with_other_secret() {
        let keys = keys_with("session-secret", "access-secret");
        let other = keys_with("another-secret", "access-secret");
        let (jwt, _) = keys
            .encode_session(&SessionToken::Provider(ProviderToken::default()))
            .unwrap();
        assert!(other.decode_session(&jwt).is_err());
        assert!(keys.decode_session("not.a.jwt").is_err());
    }

    #[test]
    fn expired_session_is_rejected() {
        let keys = keys_with("session-secret", "access-secret");
        let claims = SessionClaims::from_token(
            &SessionToken::Provider(ProviderToken::default()),
            1_000,
            2_000,
            "j".into(),
        );
        let jwt = encode(&Header::default(), &claims, &keys.session_encoding).unwrap();
        assert!(keys.decode_session(&jwt).is_err());
    }

    #[test]
    fn oauth_state_roundtrip() {
        let keys = keys_with("session-secret", "access-secret");
        let jwt = keys
            .encode_oauth_state("github", "csrf".into(), "verifier".into(), "/board".into())
            .unwrap();
        let claims = keys.decode_oauth_state(&jwt).unwrap();
        assert_eq!(claims.provider, "github");
        assert_eq!(claims.state, "csrf");
        assert_eq!(claims.pkce_verifier, "verifier");
        assert_eq!(claims.callback_url, "/board");
    }
}
