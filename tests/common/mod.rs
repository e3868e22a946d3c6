#![allow(dead_code)]

use std::{
    str::FromStr,
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use chrono::Utc;
use orders_api::{
    db::{create_orm_conn, run_migrations},
    dto::orders::OrderItemInput,
    entity::{
        contractors::ActiveModel as ContractorActive,
        users::{ActiveModel as UserActive, Model as UserModel},
    },
    middleware::auth::AuthUser,
    services::{
        auth_service::hash_password,
        invoice::{InvoiceRenderer, InvoiceSnapshot, PdfInvoiceRenderer},
        notifier::{EmailMessage, Mailer, NotificationError, NotificationQueue},
        token_service::TokenService,
    },
    state::AppState,
};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, Set};
use uuid::Uuid;

pub const TEST_SECRET: &[u8] = b"integration-test-secret";
pub const PASSWORD: &str = "Strong123";

/// Keeps every message it is asked to send.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<EmailMessage>>,
}

impl RecordingMailer {
    /// Waits until the background worker has delivered `count` messages.
    pub async fn wait_for(&self, count: usize) -> Vec<EmailMessage> {
        for _ in 0..200 {
            {
                let sent = self.sent.lock().unwrap();
                if sent.len() >= count {
                    return sent.clone();
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("expected {count} delivered messages");
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), NotificationError> {
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

/// Simulates an unreachable mail relay.
pub struct FailingMailer;

#[async_trait]
impl Mailer for FailingMailer {
    async fn send(&self, _message: &EmailMessage) -> Result<(), NotificationError> {
        Err(NotificationError::SendFailed("relay unreachable".into()))
    }
}

pub struct BrokenRenderer;

impl InvoiceRenderer for BrokenRenderer {
    fn render(&self, _snapshot: &InvoiceSnapshot) -> anyhow::Result<Vec<u8>> {
        anyhow::bail!("renderer exploded")
    }
}

pub struct TestApp {
    pub state: AppState,
    pub mailer: Arc<RecordingMailer>,
}

pub async fn setup() -> anyhow::Result<TestApp> {
    let mailer = Arc::new(RecordingMailer::default());
    let state = setup_state(mailer.clone()).await?;
    Ok(TestApp { state, mailer })
}

/// Fresh in-memory database with the full schema.
pub async fn setup_state(mailer: Arc<dyn Mailer>) -> anyhow::Result<AppState> {
    let orm = create_orm_conn("sqlite::memory:").await?;
    run_migrations(&orm).await?;

    Ok(AppState {
        orm,
        tokens: TokenService::new(TEST_SECRET, chrono::Duration::minutes(30)),
        notifier: NotificationQueue::spawn(mailer),
        renderer: Arc::new(PdfInvoiceRenderer),
        reset_token_ttl: chrono::Duration::minutes(60),
    })
}

pub async fn create_user(
    state: &AppState,
    email: &str,
    is_admin: bool,
    is_active: bool,
) -> anyhow::Result<UserModel> {
    let user = UserActive {
        id: Set(Uuid::new_v4()),
        email: Set(email.to_string()),
        first_name: Set("Test".into()),
        last_name: Set("User".into()),
        password_hash: Set(hash_password(PASSWORD)?),
        is_admin: Set(is_admin),
        is_active: Set(is_active),
        activation_token: Set(None),
        reset_token: Set(None),
        reset_token_expires_at: Set(None),
        created_at: Set(Utc::now().fixed_offset()),
    }
    .insert(&state.orm)
    .await?;
    Ok(user)
}

pub fn auth_user(user: &UserModel) -> AuthUser {
    AuthUser {
        user_id: user.id,
        email: user.email.clone(),
        is_admin: user.is_admin,
    }
}

pub async fn create_contractor(state: &AppState, name: &str) -> anyhow::Result<Uuid> {
    let contractor = ContractorActive {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        created_at: Set(Utc::now().fixed_offset()),
    }
    .insert(&state.orm)
    .await?;
    Ok(contractor.id)
}

pub fn dec(value: &str) -> Decimal {
    Decimal::from_str(value).unwrap()
}

pub fn item(name: &str, quantity: i32, price: &str, total: &str) -> OrderItemInput {
    OrderItemInput {
        name: name.to_string(),
        quantity,
        price: dec(price),
        total: dec(total),
    }
}

pub fn next_week() -> chrono::NaiveDate {
    Utc::now().date_naive() + chrono::Days::new(7)
}
