//! Session issuance: enriching the token when an identity is established and
//! projecting it into the session the client sees.

use jsonwebtoken::errors::Error as JwtError;

use crate::auth::dto::{EnrichedToken, Identity, ProviderToken, Session, SessionToken, SessionUser};
use crate::auth::jwt::JwtKeys;

/// With an identity, overwrites the profile fields from it and attaches a
/// fresh access token for `identity.id`. Without one the token is returned
/// unchanged.
pub fn enrich(
    keys: &JwtKeys,
    token: SessionToken,
    identity: Option<&Identity>,
) -> Result<SessionToken, JwtError> {
    let Some(identity) = identity else {
        return Ok(token);
    };

    let previous = match token {
        SessionToken::Provider(p) => p,
        SessionToken::Enriched(e) => e.profile,
    };
    let profile = ProviderToken {
        sub: previous.sub.or_else(|| Some(identity.id.clone())),
        email: identity.email.clone(),
        name: identity.name.clone(),
        picture: identity.image.clone(),
    };

    Ok(SessionToken::Enriched(EnrichedToken {
        profile,
        id: identity.id.clone(),
        access_token: keys.sign_access(&identity.id)?,
    }))
}

/// Shapes the token into the externally visible session. The id falls back
/// from the enriched id to the provider subject to an empty string.
pub fn project(token: &SessionToken) -> Session {
    let profile = token.profile();
    let (id, access_token) = match token {
        SessionToken::Enriched(e) => (Some(e.id.clone()), Some(e.access_token.clone())),
        SessionToken::Provider(_) => (None, None),
    };

    Session {
        user: SessionUser {
            id: id.or_else(|| profile.sub.clone()).unwrap_or_default(),
            email: profile.email.clone().unwrap_or_default(),
            name: profile.name.clone(),
            image: profile.picture.clone(),
        },
        access_token,
    }
}

/// Builds the token for a freshly established identity.
pub fn issue(keys: &JwtKeys, identity: &Identity) -> Result<SessionToken, JwtError> {
    let token = SessionToken::Provider(ProviderToken::for_identity(identity));
    enrich(keys, token, Some(identity))
}
