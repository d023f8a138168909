use serde::{Deserialize, Serialize};

use crate::auth::dto::{EnrichedToken, ProviderToken, SessionToken};

/// Claims of the secondary access token handed to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub iat: usize,
    pub exp: usize,
}

/// Wire form of the session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(
        rename = "accessToken",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub access_token: Option<String>,
    pub iat: usize,
    pub exp: usize,
    pub jti: String,
}

impl SessionClaims {
    pub fn from_token(token: &SessionToken, iat: usize, exp: usize, jti: String) -> Self {
        let (profile, id, access_token) = match token {
            SessionToken::Provider(p) => (p, None, None),
            SessionToken::Enriched(e) => (
                &e.profile,
                Some(e.id.clone()),
                Some(e.access_token.clone()),
            ),
        };
        Self {
            sub: profile.sub.clone(),
            email: profile.email.clone(),
            name: profile.name.clone(),
            picture: profile.picture.clone(),
            id,
            access_token,
            iat,
            exp,
            jti,
        }
    }

    /// A token is enriched only when both the id and the access token are present.
    pub fn into_token(self) -> SessionToken {
        let profile = ProviderToken {
            sub: self.sub,
            email: self.email,
            name: self.name,
            picture: self.picture,
        };
        match (self.id, self.access_token) {
            (Some(id), Some(access_token)) => SessionToken::Enriched(EnrichedToken {
                profile,
                id,
                access_token,
            }),
            _ => SessionToken::Provider(profile),
        }
    }
}

/// Contents of the short-lived cookie that carries OAuth state between the
/// sign-in redirect and the provider callback.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OAuthStateClaims {
    pub provider: String,
    pub state: String,
    pub pkce_verifier: String,
    pub callback_url: String,
    pub exp: usize,
}
