use std::sync::Arc;

use async_trait::async_trait;
use mongodb::{
    bson::{doc, Bson, Document},
    Collection,
};

use crate::auth::repo_types::{AccountLink, NewUser, UserRecord};
use crate::db::Mongo;
use crate::error::StoreError;

const USERS: &str = "users";
const ACCOUNTS: &str = "accounts";

/// Read/write access to users and their linked provider accounts.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Exact-match lookup; case handling is whatever the collection's collation does.
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError>;

    async fn find_by_account(
        &self,
        provider: &str,
        provider_account_id: &str,
    ) -> Result<Option<UserRecord>, StoreError>;

    async fn create_user(&self, user: &NewUser) -> Result<UserRecord, StoreError>;

    async fn link_account(&self, link: &AccountLink) -> Result<(), StoreError>;
}

pub struct MongoUserStore {
    mongo: Arc<Mongo>,
}

impl MongoUserStore {
    pub fn new(mongo: Arc<Mongo>) -> Self {
        Self { mongo }
    }

    async fn users(&self) -> Result<Collection<UserRecord>, StoreError> {
        Ok(self.mongo.database().await?.collection(USERS))
    }

    async fn accounts(&self) -> Result<Collection<Document>, StoreError> {
        Ok(self.mongo.database().await?.collection(ACCOUNTS))
    }
}

#[async_trait]
impl UserStore for MongoUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        let user = self.users().await?.find_one(doc! { "email": email }).await?;
        Ok(user)
    }

    async fn find_by_account(
        &self,
        provider: &str,
        provider_account_id: &str,
    ) -> Result<Option<UserRecord>, StoreError> {
        let account = self
            .accounts()
            .await?
            .find_one(doc! {
                "provider": provider,
                "providerAccountId": provider_account_id,
            })
            .await?;
        let Some(user_id) = account.and_then(|a| a.get("userId").cloned()) else {
            return Ok(None);
        };
        let user = self.users().await?.find_one(doc! { "_id": user_id }).await?;
        Ok(user)
    }

    async fn create_user(&self, user: &NewUser) -> Result<UserRecord, StoreError> {
        let users: Collection<Document> = self.mongo.database().await?.collection(USERS);
        let result = users
            .insert_one(doc! {
                "name": user.name.clone(),
                "email": user.email.clone(),
                "image": user.image.clone(),
                "emailVerified": Bson::Null,
            })
            .await?;
        Ok(UserRecord {
            id: Some(result.inserted_id),
            email: user.email.clone(),
            name: user.name.clone(),
            image: user.image.clone(),
            password_hash: None,
        })
    }

    async fn link_account(&self, link: &AccountLink) -> Result<(), StoreError> {
        self.accounts()
            .await?
            .update_one(
                doc! {
                    "provider": link.provider.as_str(),
                    "providerAccountId": link.provider_account_id.as_str(),
                },
                doc! {
                    "$set": {
                        "userId": link.user_id.clone(),
                        "type": "oauth",
                    }
                },
            )
            .upsert(true)
            .await?;
        Ok(())
    }
}
