use std::sync::Arc;

use chrono::Duration;

use crate::{
    db::OrmConn,
    services::{invoice::InvoiceRenderer, notifier::NotificationQueue, token_service::TokenService},
};

#[derive(Clone)]
pub struct AppState {
    pub orm: OrmConn,
    pub tokens: TokenService,
    pub notifier: NotificationQueue,
    pub renderer: Arc<dyn InvoiceRenderer>,
    pub reset_token_ttl: Duration,
}
