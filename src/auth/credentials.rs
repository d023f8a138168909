use tracing::warn;

use crate::auth::dto::Identity;
use crate::auth::password::{verify_password_async, PasswordError};
use crate::auth::repo::UserStore;
use crate::error::StoreError;

/// Email/password sign-in. Every rejection is `Ok(None)` so callers cannot
/// tell an unknown email from a wrong password; only store failures are errors.
pub async fn authorize(
    users: Option<&dyn UserStore>,
    email: &str,
    password: &str,
) -> Result<Option<Identity>, StoreError> {
    let Some(users) = users else {
        return Ok(None);
    };
    if email.is_empty() || password.is_empty() {
        return Ok(None);
    }

    let Some(user) = users.find_by_email(email).await? else {
        return Ok(None);
    };
    let Some(hash) = user.password_hash.clone() else {
        return Ok(None);
    };

    match verify_password_async(password.to_string(), hash).await {
        Ok(true) => Ok(Some(Identity::from(user))),
        Ok(false) => Ok(None),
        Err(PasswordError::Malformed(reason)) => {
            warn!(user_id = %user.id_string(), %reason, "stored password hash is unreadable");
            Ok(None)
        }
        Err(e @ PasswordError::Task(_)) => {
            warn!(error = %e, "password verification did not complete");
            Ok(None)
        }
    }
}
