use mongodb::bson::Bson;
use serde::{Deserialize, Serialize};

/// User document in the `users` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Bson>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(rename = "password", default, skip_serializing)]
    pub password_hash: Option<String>, // absent for OAuth-only accounts
}

impl UserRecord {
    /// `_id` as a plain string: ObjectIds as hex, strings as-is.
    pub fn id_string(&self) -> String {
        match &self.id {
            Some(Bson::ObjectId(oid)) => oid.to_hex(),
            Some(Bson::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => String::new(),
        }
    }
}

/// Profile fields written when an OAuth sign-in creates a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: Option<String>,
    pub name: Option<String>,
    pub image: Option<String>,
}

/// Row in the `accounts` collection tying a provider account to a user.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountLink {
    pub user_id: Bson,
    pub provider: String,
    pub provider_account_id: String,
}
