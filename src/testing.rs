//! In-memory stores and fixtures shared by unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use mongodb::bson::{oid::ObjectId, Bson, Document};

use crate::auth::jwt::JwtKeys;
use crate::auth::repo::UserStore;
use crate::auth::repo_types::{AccountLink, NewUser, UserRecord};
use crate::config::AppConfig;
use crate::designs::repo::{owner_filter, DesignStore};
use crate::designs::repo_types::DesignRecord;
use crate::error::StoreError;
use crate::state::AppState;

pub fn test_config() -> AppConfig {
    AppConfig::from_lookup(|key| match key {
        "NEXTAUTH_SECRET" => Some("test-session-secret".into()),
        "JWT_SECRET" => Some("test-access-secret".into()),
        "NEXTAUTH_URL" => Some("http://localhost:8080".into()),
        "GITHUB_CLIENT_ID" => Some("gh-client".into()),
        "GITHUB_CLIENT_SECRET" => Some("gh-secret".into()),
        _ => None,
    })
    .expect("test config")
}

pub fn test_keys() -> JwtKeys {
    JwtKeys::from_config(&test_config().auth)
}

#[derive(Default)]
pub struct MemoryUserStore {
    users: Mutex<Vec<UserRecord>>,
    accounts: Mutex<Vec<AccountLink>>,
    email_lookups: AtomicUsize,
    failing: bool,
}

impl MemoryUserStore {
    pub fn with_users(users: Vec<UserRecord>) -> Self {
        Self {
            users: Mutex::new(users),
            ..Default::default()
        }
    }

    /// Every call fails as if the database were unreachable.
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Default::default()
        }
    }

    pub fn email_lookups(&self) -> usize {
        self.email_lookups.load(Ordering::SeqCst)
    }

    pub fn user_count(&self) -> usize {
        self.users.lock().unwrap().len()
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.failing {
            return Err(StoreError::Connect("connection refused".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        self.check()?;
        self.email_lookups.fetch_add(1, Ordering::SeqCst);
        let users = self.users.lock().unwrap();
        Ok(users
            .iter()
            .find(|u| u.email.as_deref() == Some(email))
            .cloned())
    }

    async fn find_by_account(
        &self,
        provider: &str,
        provider_account_id: &str,
    ) -> Result<Option<UserRecord>, StoreError> {
        self.check()?;
        let user_id = {
            let accounts = self.accounts.lock().unwrap();
            accounts
                .iter()
                .find(|a| a.provider == provider && a.provider_account_id == provider_account_id)
                .map(|a| a.user_id.clone())
        };
        let Some(user_id) = user_id else {
            return Ok(None);
        };
        let users = self.users.lock().unwrap();
        Ok(users.iter().find(|u| u.id.as_ref() == Some(&user_id)).cloned())
    }

    async fn create_user(&self, user: &NewUser) -> Result<UserRecord, StoreError> {
        self.check()?;
        let record = UserRecord {
            id: Some(Bson::ObjectId(ObjectId::new())),
            email: user.email.clone(),
            name: user.name.clone(),
            image: user.image.clone(),
            password_hash: None,
        };
        self.users.lock().unwrap().push(record.clone());
        Ok(record)
    }

    async fn link_account(&self, link: &AccountLink) -> Result<(), StoreError> {
        self.check()?;
        self.accounts.lock().unwrap().push(link.clone());
        Ok(())
    }
}

/// Top-level equality match, the only filter shape the stores send.
pub fn matches_filter(filter: &Document, doc: &Document) -> bool {
    filter.iter().all(|(key, value)| doc.get(key) == Some(value))
}

/// Evaluates the same owner filter document the Mongo store sends.
#[derive(Default)]
pub struct MemoryDesignStore {
    designs: Vec<Document>,
}

impl MemoryDesignStore {
    pub fn new(designs: Vec<Document>) -> Self {
        Self { designs }
    }
}

#[async_trait]
impl DesignStore for MemoryDesignStore {
    async fn list_by_owner(&self, email: &str) -> Result<Vec<DesignRecord>, StoreError> {
        let filter = owner_filter(email);
        Ok(self
            .designs
            .iter()
            .filter(|d| matches_filter(&filter, d))
            .cloned()
            .map(DesignRecord)
            .collect())
    }
}

pub fn fake_state(
    users: Option<Arc<dyn UserStore>>,
    designs: Arc<dyn DesignStore>,
) -> AppState {
    AppState::from_parts(Arc::new(test_config()), users, designs, reqwest::Client::new())
}
