//! OAuth sign-in with Google and GitHub.
//!
//! The authorization redirect uses PKCE (S256) and a random CSRF state; both
//! travel in a signed short-lived cookie rather than server-side storage.
//! After the code exchange the provider profile is turned into an
//! [`Identity`]. When a user store is configured, provider accounts are
//! linked to persisted users; an existing user with the same email but no
//! link is refused rather than silently merged.

use oauth2::basic::BasicClient;
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, EndpointNotSet, EndpointSet,
    PkceCodeChallenge, PkceCodeVerifier, RedirectUrl, Scope, TokenResponse, TokenUrl,
};
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use crate::auth::dto::Identity;
use crate::auth::repo::UserStore;
use crate::auth::repo_types::{AccountLink, NewUser};
use crate::config::{OAuthCredentials, ProvidersConfig};
use crate::error::StoreError;

const GOOGLE_USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";
const GITHUB_USER_URL: &str = "https://api.github.com/user";
const GITHUB_EMAILS_URL: &str = "https://api.github.com/user/emails";

#[derive(Debug, Error)]
pub enum SignInError {
    #[error("an account with this email exists but is not linked to this provider")]
    AccountNotLinked,
    #[error("invalid provider endpoint: {0}")]
    Endpoint(String),
    #[error("token exchange failed: {0}")]
    Exchange(String),
    #[error("fetching provider profile failed: {0}")]
    Profile(#[from] reqwest::Error),
    #[error("created user has no id")]
    MissingUserId,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Client with authorization and token endpoints set.
type ConfiguredClient = oauth2::Client<
    oauth2::basic::BasicErrorResponse,
    oauth2::basic::BasicTokenResponse,
    oauth2::basic::BasicTokenIntrospectionResponse,
    oauth2::StandardRevocableToken,
    oauth2::basic::BasicRevocationErrorResponse,
    EndpointSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointSet,
>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OAuthProvider {
    Google,
    GitHub,
}

impl OAuthProvider {
    pub const ALL: [OAuthProvider; 2] = [OAuthProvider::Google, OAuthProvider::GitHub];

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.id() == id)
    }

    pub fn id(self) -> &'static str {
        match self {
            OAuthProvider::Google => "google",
            OAuthProvider::GitHub => "github",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            OAuthProvider::Google => "Google",
            OAuthProvider::GitHub => "GitHub",
        }
    }

    fn auth_url(self) -> &'static str {
        match self {
            OAuthProvider::Google => "https://accounts.google.com/o/oauth2/v2/auth",
            OAuthProvider::GitHub => "https://github.com/login/oauth/authorize",
        }
    }

    fn token_url(self) -> &'static str {
        match self {
            OAuthProvider::Google => "https://oauth2.googleapis.com/token",
            OAuthProvider::GitHub => "https://github.com/login/oauth/access_token",
        }
    }

    fn scopes(self) -> &'static [&'static str] {
        match self {
            OAuthProvider::Google => &["openid", "email", "profile"],
            OAuthProvider::GitHub => &["read:user", "user:email"],
        }
    }

    /// Credentials when the provider is enabled.
    pub fn credentials(self, providers: &ProvidersConfig) -> Option<&OAuthCredentials> {
        match self {
            OAuthProvider::Google => providers.google.as_ref(),
            OAuthProvider::GitHub => providers.github.as_ref(),
        }
    }

    pub fn callback_url(self, base_url: &str) -> String {
        format!("{base_url}/api/auth/callback/{}", self.id())
    }

    fn client(self, creds: &OAuthCredentials, base_url: &str) -> Result<ConfiguredClient, SignInError> {
        let endpoint = |e: oauth2::url::ParseError| SignInError::Endpoint(e.to_string());
        Ok(BasicClient::new(ClientId::new(creds.client_id.clone()))
            .set_client_secret(ClientSecret::new(creds.client_secret.clone()))
            .set_auth_uri(AuthUrl::new(self.auth_url().to_string()).map_err(endpoint)?)
            .set_token_uri(TokenUrl::new(self.token_url().to_string()).map_err(endpoint)?)
            .set_redirect_uri(RedirectUrl::new(self.callback_url(base_url)).map_err(endpoint)?))
    }
}

/// Authorization redirect plus the values the callback needs to check it.
#[derive(Debug)]
pub struct AuthorizationRequest {
    pub url: String,
    pub state: String,
    pub pkce_verifier: String,
}

pub fn authorization_request(
    provider: OAuthProvider,
    creds: &OAuthCredentials,
    base_url: &str,
) -> Result<AuthorizationRequest, SignInError> {
    let client = provider.client(creds, base_url)?;
    let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();

    let (url, csrf_state) = client
        .authorize_url(CsrfToken::new_random)
        .add_scopes(provider.scopes().iter().map(|s| Scope::new(s.to_string())))
        .set_pkce_challenge(pkce_challenge)
        .url();

    Ok(AuthorizationRequest {
        url: url.to_string(),
        state: csrf_state.secret().clone(),
        pkce_verifier: pkce_verifier.secret().clone(),
    })
}

/// Profile as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthProfile {
    pub provider: OAuthProvider,
    pub account_id: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub image: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GoogleUser {
    id: String,
    email: Option<String>,
    name: Option<String>,
    picture: Option<String>,
}

impl From<GoogleUser> for OAuthProfile {
    fn from(u: GoogleUser) -> Self {
        Self {
            provider: OAuthProvider::Google,
            account_id: u.id,
            email: u.email,
            name: u.name,
            image: u.picture,
        }
    }
}

#[derive(Debug, Deserialize)]
struct GitHubUser {
    id: u64,
    login: String,
    name: Option<String>,
    email: Option<String>,
    avatar_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GitHubEmail {
    email: String,
    primary: bool,
    verified: bool,
}

fn primary_email(emails: Vec<GitHubEmail>) -> Option<String> {
    emails
        .into_iter()
        .find(|e| e.primary && e.verified)
        .map(|e| e.email)
}

fn github_profile(user: GitHubUser, fallback_email: Option<String>) -> OAuthProfile {
    OAuthProfile {
        provider: OAuthProvider::GitHub,
        account_id: user.id.to_string(),
        email: user.email.or(fallback_email),
        name: user.name.or(Some(user.login)),
        image: user.avatar_url,
    }
}

/// Exchanges the authorization code and fetches the provider profile.
pub async fn exchange_code(
    http: &reqwest::Client,
    provider: OAuthProvider,
    creds: &OAuthCredentials,
    base_url: &str,
    code: String,
    pkce_verifier: String,
) -> Result<OAuthProfile, SignInError> {
    let client = provider.client(creds, base_url)?;
    let token = client
        .exchange_code(AuthorizationCode::new(code))
        .set_pkce_verifier(PkceCodeVerifier::new(pkce_verifier))
        .request_async(http)
        .await
        .map_err(|e| SignInError::Exchange(e.to_string()))?;
    let access_token = token.access_token().secret();

    match provider {
        OAuthProvider::Google => {
            let user: GoogleUser = http
                .get(GOOGLE_USERINFO_URL)
                .bearer_auth(access_token)
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;
            Ok(user.into())
        }
        OAuthProvider::GitHub => {
            let user: GitHubUser = http
                .get(GITHUB_USER_URL)
                .bearer_auth(access_token)
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;
            let fallback = if user.email.is_none() {
                let emails: Vec<GitHubEmail> = http
                    .get(GITHUB_EMAILS_URL)
                    .bearer_auth(access_token)
                    .send()
                    .await?
                    .error_for_status()?
                    .json()
                    .await?;
                primary_email(emails)
            } else {
                None
            };
            Ok(github_profile(user, fallback))
        }
    }
}

/// Turns a provider profile into the identity for the session. Without a
/// store the provider account id is the identity id.
pub async fn resolve_identity(
    users: Option<&dyn UserStore>,
    profile: &OAuthProfile,
) -> Result<Identity, SignInError> {
    let Some(users) = users else {
        return Ok(Identity {
            id: profile.account_id.clone(),
            name: profile.name.clone(),
            email: profile.email.clone(),
            image: profile.image.clone(),
        });
    };

    let provider = profile.provider.id();
    if let Some(user) = users.find_by_account(provider, &profile.account_id).await? {
        return Ok(Identity::from(user));
    }

    if let Some(email) = profile.email.as_deref() {
        if users.find_by_email(email).await?.is_some() {
            return Err(SignInError::AccountNotLinked);
        }
    }

    let user = users
        .create_user(&NewUser {
            email: profile.email.clone(),
            name: profile.name.clone(),
            image: profile.image.clone(),
        })
        .await?;
    let user_id = user.id.clone().ok_or(SignInError::MissingUserId)?;
    users
        .link_account(&AccountLink {
            user_id,
            provider: provider.to_string(),
            provider_account_id: profile.account_id.clone(),
        })
        .await?;

    info!(provider, user_id = %user.id_string(), "user created from provider sign-in");
    Ok(Identity::from(user))
}

/// Keeps post-sign-in redirects on this site.
pub fn sanitize_callback_url(raw: Option<&str>) -> String {
    match raw {
        Some(url) if url.starts_with('/') && !url.starts_with("//") && !url.contains('\\') => {
            url.to_string()
        }
        _ => "/".to_string(),
    }
}
