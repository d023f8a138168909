use std::sync::Arc;

use async_trait::async_trait;
use futures_util::TryStreamExt;
use mongodb::bson::Document;

use crate::db::Mongo;
use crate::designs::repo_types::{DesignRecord, OWNER_FIELD};
use crate::error::StoreError;

const DESIGNS: &str = "designs";

#[async_trait]
pub trait DesignStore: Send + Sync {
    /// Every design whose owner email equals `email`, in store order.
    async fn list_by_owner(&self, email: &str) -> Result<Vec<DesignRecord>, StoreError>;
}

/// Query selecting the designs owned by `email`, by exact equality.
pub fn owner_filter(email: &str) -> Document {
    let mut filter = Document::new();
    filter.insert(OWNER_FIELD, email);
    filter
}

pub struct MongoDesignStore {
    mongo: Arc<Mongo>,
}

impl MongoDesignStore {
    pub fn new(mongo: Arc<Mongo>) -> Self {
        Self { mongo }
    }
}

#[async_trait]
impl DesignStore for MongoDesignStore {
    async fn list_by_owner(&self, email: &str) -> Result<Vec<DesignRecord>, StoreError> {
        let designs = self
            .mongo
            .database()
            .await?
            .collection::<Document>(DESIGNS);
        let docs: Vec<Document> = designs
            .find(owner_filter(email))
            .await?
            .try_collect()
            .await?;
        Ok(docs.into_iter().map(DesignRecord).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::matches_filter;
    use mongodb::bson::doc;

    #[test]
    fn owner_filter_is_a_single_equality_on_user_email() {
        assert_eq!(owner_filter("a@x.com"), doc! { "userEmail": "a@x.com" });
    }

    #[test]
    fn owner_filter_selects_only_the_exact_owner() {
        let filter = owner_filter("a@x.com");
        assert!(matches_filter(&filter, &doc! { "title": "Poster", "userEmail": "a@x.com" }));
        for other in [
            doc! { "userEmail": "b@x.com" },
            doc! { "userEmail": "A@X.COM" },
            doc! { "userEmail": "a@x.com " },
            doc! { "owner": "a@x.com" },
            doc! { "title": "orphan" },
        ] {
            assert!(!matches_filter(&filter, &other), "{other} should not match");
        }
    }

    #[test]
    fn empty_email_filter_does_not_match_everything() {
        let filter = owner_filter("");
        assert!(!filter.is_empty());
        assert!(!matches_filter(&filter, &doc! { "userEmail": "a@x.com" }));
    }
}
