use std::sync::Arc;

use crate::auth::repo::{MongoUserStore, UserStore};
use crate::config::AppConfig;
use crate::db::Mongo;
use crate::designs::repo::{DesignStore, MongoDesignStore};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    /// Present only when MongoDB is configured; credentials sign-in and
    /// account linking are disabled otherwise.
    pub users: Option<Arc<dyn UserStore>>,
    pub designs: Arc<dyn DesignStore>,
    pub http: reqwest::Client,
}

impl AppState {
    /// Wires stores to one shared, lazily opened MongoDB connection. Nothing
    /// here touches the network.
    pub fn init(config: AppConfig) -> anyhow::Result<Self> {
        let mongo = Arc::new(Mongo::new(&config.mongo));

        let users = mongo
            .is_configured()
            .then(|| Arc::new(MongoUserStore::new(mongo.clone())) as Arc<dyn UserStore>);
        let designs = Arc::new(MongoDesignStore::new(mongo)) as Arc<dyn DesignStore>;

        let http = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .user_agent(concat!("designboard/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self::from_parts(Arc::new(config), users, designs, http))
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        users: Option<Arc<dyn UserStore>>,
        designs: Arc<dyn DesignStore>,
        http: reqwest::Client,
    ) -> Self {
        Self {
            config,
            users,
            designs,
            http,
        }
    }
}
