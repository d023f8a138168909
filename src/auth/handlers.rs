use std::collections::BTreeMap;

use axum::{
    extract::{rejection::JsonRejection, FromRef, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde_json::json;
use time::format_description::well_known::Rfc3339;
use tracing::{debug, info, instrument, warn};

use crate::{
    auth::{
        credentials,
        dto::{CallbackQuery, CredentialsRequest, Identity, ProviderInfo, SessionResponse, SessionToken, SignInQuery},
        extractors::session_jwt,
        issuer,
        jwt::{JwtKeys, OAUTH_STATE_TTL},
        oauth::{self, OAuthProvider, SignInError},
        OAUTH_STATE_COOKIE, SESSION_COOKIE,
    },
    config::{AuthConfig, OAuthCredentials},
    error::ApiError,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/callback/credentials", post(credentials_callback))
        .route("/api/auth/session", get(get_session))
        .route("/api/auth/signout", post(sign_out))
        .route("/api/auth/providers", get(list_providers))
        .route("/api/auth/signin/:provider", get(oauth_signin))
        .route("/api/auth/callback/:provider", get(oauth_callback))
}

fn cookie(auth: &AuthConfig, name: &'static str, value: String, max_age_secs: i64) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(auth.secure_cookies())
        .max_age(time::Duration::seconds(max_age_secs))
        .build()
}

/// Removal carries the same attributes the cookie was set with.
fn clear_cookie(auth: &AuthConfig, jar: CookieJar, name: &'static str) -> CookieJar {
    jar.remove(cookie(auth, name, String::new(), 0))
}

/// Signs the token into the session cookie and returns the projected session.
fn write_session(
    keys: &JwtKeys,
    auth: &AuthConfig,
    jar: CookieJar,
    token: &SessionToken,
) -> Result<(CookieJar, SessionResponse), ApiError> {
    let (jwt, expires) = keys.encode_session(token).map_err(ApiError::internal)?;
    let expires = expires.format(&Rfc3339).map_err(ApiError::internal)?;
    let jar = jar.add(cookie(
        auth,
        SESSION_COOKIE,
        jwt,
        keys.session_max_age.as_secs() as i64,
    ));
    Ok((
        jar,
        SessionResponse {
            session: issuer::project(token),
            expires,
        },
    ))
}

fn start_session(
    state: &AppState,
    jar: CookieJar,
    identity: &Identity,
) -> Result<(CookieJar, SessionResponse), ApiError> {
    let keys = JwtKeys::from_ref(state);
    let token = issuer::issue(&keys, identity).map_err(ApiError::internal)?;
    write_session(&keys, &state.config.auth, jar, &token)
}

fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

fn enabled_provider<'a>(
    state: &'a AppState,
    id: &str,
) -> Result<(OAuthProvider, &'a OAuthCredentials), ApiError> {
    OAuthProvider::from_id(id)
        .and_then(|p| p.credentials(&state.config.auth.providers).map(|c| (p, c)))
        .ok_or_else(|| ApiError::NotFound("Unknown provider".into()))
}

#[instrument(skip(state, jar, payload))]
pub async fn credentials_callback(
    State(state): State<AppState>,
    jar: CookieJar,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<(CookieJar, Json<SessionResponse>), ApiError> {
    let Json(payload) = payload.map_err(|rejection| {
        debug!(reason = %rejection.body_text(), "unreadable credentials body");
        ApiError::CredentialsSignin
    })?;
    let identity =
        credentials::authorize(state.users.as_deref(), &payload.email, &payload.password)
            .await
            .map_err(ApiError::internal)?
            .ok_or(ApiError::CredentialsSignin)?;

    let (jar, session) = start_session(&state, jar, &identity)?;
    info!(user_id = %identity.id, "signed in with credentials");
    Ok((jar, Json(session)))
}

/// Current session, re-issued with a fresh expiry. `{}` when there is none.
#[instrument(skip_all)]
pub async fn get_session(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let keys = JwtKeys::from_ref(&state);
    let decoded = session_jwt(&headers).and_then(|jwt| keys.decode_session(&jwt).ok());
    let Some((token, _expires)) = decoded else {
        let jar = clear_cookie(&state.config.auth, jar, SESSION_COOKIE);
        return Ok((jar, Json(json!({}))).into_response());
    };

    let token = issuer::enrich(&keys, token, None).map_err(ApiError::internal)?;
    let (jar, session) = write_session(&keys, &state.config.auth, jar, &token)?;
    Ok((jar, Json(session)).into_response())
}

pub async fn sign_out(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, StatusCode) {
    (
        clear_cookie(&state.config.auth, jar, SESSION_COOKIE),
        StatusCode::NO_CONTENT,
    )
}

pub async fn list_providers(State(state): State<AppState>) -> Json<BTreeMap<&'static str, ProviderInfo>> {
    let base = &state.config.auth.base_url;
    let mut providers = BTreeMap::new();
    providers.insert(
        "credentials",
        ProviderInfo {
            id: "credentials",
            name: "Credentials",
            kind: "credentials",
            signin_url: format!("{base}/api/auth/signin/credentials"),
            callback_url: format!("{base}/api/auth/callback/credentials"),
        },
    );
    for provider in OAuthProvider::ALL {
        if provider.credentials(&state.config.auth.providers).is_none() {
            continue;
        }
        providers.insert(
            provider.id(),
            ProviderInfo {
                id: provider.id(),
                name: provider.name(),
                kind: "oauth",
                signin_url: format!("{base}/api/auth/signin/{}", provider.id()),
                callback_url: provider.callback_url(base),
            },
        );
    }
    Json(providers)
}

#[instrument(skip(state, query, jar))]
pub async fn oauth_signin(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    Query(query): Query<SignInQuery>,
    jar: CookieJar,
) -> Result<(CookieJar, Response), ApiError> {
    let (provider, creds) = enabled_provider(&state, &provider)?;
    let auth = &state.config.auth;

    let request =
        oauth::authorization_request(provider, creds, &auth.base_url).map_err(ApiError::internal)?;
    let keys = JwtKeys::from_ref(&state);
    let pending = keys
        .encode_oauth_state(
            provider.id(),
            request.state,
            request.pkce_verifier,
            oauth::sanitize_callback_url(query.callback_url.as_deref()),
        )
        .map_err(ApiError::internal)?;

    let jar = jar.add(cookie(
        auth,
        OAUTH_STATE_COOKIE,
        pending,
        OAUTH_STATE_TTL.as_secs() as i64,
    ));
    Ok((jar, found(&request.url)))
}

/// Completes a provider sign-in. The state cookie is single-use and is
/// cleared whatever the outcome.
#[instrument(skip(state, query, jar))]
pub async fn oauth_callback(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    Query(query): Query<CallbackQuery>,
    jar: CookieJar,
) -> Response {
    let pending = jar.get(OAUTH_STATE_COOKIE).map(|c| c.value().to_string());
    let jar = clear_cookie(&state.config.auth, jar, OAUTH_STATE_COOKIE);

    let outcome = match finish_oauth(&state, &provider, query, pending.as_deref()).await {
        Ok((identity, callback_url)) => start_session(&state, jar.clone(), &identity)
            .map(|(jar, _session)| (identity, callback_url, jar)),
        Err(e) => Err(e),
    };
    match outcome {
        Ok((identity, callback_url, jar)) => {
            info!(provider = %provider, user_id = %identity.id, "signed in with provider");
            (jar, found(&callback_url)).into_response()
        }
        Err(e) => (jar, e).into_response(),
    }
}

/// Checks the returned state against the pending one, exchanges the code and
/// resolves the identity. Returns it with the post-sign-in path.
async fn finish_oauth(
    state: &AppState,
    provider: &str,
    query: CallbackQuery,
    pending: Option<&str>,
) -> Result<(Identity, String), ApiError> {
    let (provider, creds) = enabled_provider(state, provider)?;
    if let Some(error) = query.error.as_deref() {
        warn!(provider = provider.id(), %error, "provider denied sign-in");
        return Err(ApiError::OAuthCallback);
    }

    let keys = JwtKeys::from_ref(state);
    let pending = pending
        .and_then(|jwt| keys.decode_oauth_state(jwt).ok())
        .ok_or_else(|| ApiError::BadRequest("Missing or expired OAuth state".into()))?;
    let (Some(code), Some(returned_state)) = (query.code, query.state) else {
        return Err(ApiError::BadRequest("Missing code or state".into()));
    };
    if pending.provider != provider.id() || pending.state != returned_state {
        return Err(ApiError::BadRequest("OAuth state mismatch".into()));
    }

    let profile = oauth::exchange_code(
        &state.http,
        provider,
        creds,
        &state.config.auth.base_url,
        code,
        pending.pkce_verifier,
    )
    .await
    .map_err(|e| {
        warn!(provider = provider.id(), error = %e, "provider sign-in failed");
        ApiError::OAuthCallback
    })?;

    let identity = oauth::resolve_identity(state.users.as_deref(), &profile)
        .await
        .map_err(|e| match e {
            SignInError::AccountNotLinked => ApiError::AccountNotLinked,
            other => ApiError::internal(other),
        })?;
    Ok((identity, pending.callback_url))
}
