use serde::{Deserialize, Serialize};

use crate::auth::repo_types::UserRecord;

/// Verified user attributes produced by a successful sign-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub image: Option<String>,
}

impl From<UserRecord> for Identity {
    fn from(user: UserRecord) -> Self {
        Self {
            id: user.id_string(),
            name: user.name,
            email: user.email,
            image: user.image,
        }
    }
}

/// Token fields as established by the sign-in provider.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderToken {
    pub sub: Option<String>,
    pub email: Option<String>,
    pub name: Option<String>,
    pub picture: Option<String>,
}

impl ProviderToken {
    pub fn for_identity(identity: &Identity) -> Self {
        Self {
            sub: Some(identity.id.clone()),
            email: identity.email.clone(),
            name: identity.name.clone(),
            picture: identity.image.clone(),
        }
    }
}

/// Token after enrichment: identity id plus a signed access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichedToken {
    pub profile: ProviderToken,
    pub id: String,
    pub access_token: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionToken {
    Provider(ProviderToken),
    Enriched(EnrichedToken),
}

impl SessionToken {
    pub fn profile(&self) -> &ProviderToken {
        match self {
            SessionToken::Provider(p) => p,
            SessionToken::Enriched(e) => &e.profile,
        }
    }
}

/// Externally visible session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub user: SessionUser,
    #[serde(rename = "accessToken", skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionUser {
    pub id: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// Session plus its expiry, as returned by the auth endpoints.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    #[serde(flatten)]
    pub session: Session,
    pub expires: String,
}

/// Request body for the credentials sign-in.
#[derive(Debug, Default, Deserialize)]
pub struct CredentialsRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct SignInQuery {
    #[serde(rename = "callbackUrl")]
    pub callback_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProviderInfo {
    pub id: &'static str,
    pub name: &'static str,
    #[serde(rename = "type")]
    pub kind: &'static str,
    #[serde(rename = "signinUrl")]
    pub signin_url: String,
    #[serde(rename = "callbackUrl")]
    pub callback_url: String,
}
