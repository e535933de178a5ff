use std::sync::Arc;

use crate::{
    db::{DbPool, OrmConn},
    notifier::Notifier,
};

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub orm: OrmConn,
    pub auth: AuthSettings,
    pub notifier: Arc<dyn Notifier>,
}

/// Token signing parameters shared by login and the `Caller` extractor.
#[derive(Clone)]
pub struct AuthSettings {
    pub jwt_secret: Arc<str>,
    pub token_ttl_hours: i64,
}

impl AppState {
    pub fn new(pool: DbPool, orm: OrmConn, auth: AuthSettings, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            pool,
            orm,
            auth,
            notifier,
        }
    }
}
