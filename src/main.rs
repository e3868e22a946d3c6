use std::{net::SocketAddr, sync::Arc};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use orders_api::{
    app::build_router,
    config::AppConfig,
    db::{create_orm_conn, run_migrations},
    services::{
        invoice::PdfInvoiceRenderer,
        notifier::{LogMailer, Mailer, NotificationQueue, SmtpMailer},
        token_service::TokenService,
    },
    state::AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,orders_api=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;
    let orm = create_orm_conn(&config.database_url).await?;
    run_migrations(&orm).await?;

    let mailer: Arc<dyn Mailer> = match &config.smtp {
        Some(smtp) => {
            tracing::info!(host = %smtp.host, port = smtp.port, "smtp delivery enabled");
            Arc::new(SmtpMailer::new(smtp)?)
        }
        None => {
            tracing::warn!("SMTP_HOST not set, emails will only be logged");
            Arc::new(LogMailer)
        }
    };

    let state = AppState {
        orm,
        tokens: TokenService::new(
            config.jwt_secret.as_bytes(),
            chrono::Duration::minutes(config.access_token_ttl_minutes),
        ),
        notifier: NotificationQueue::spawn(mailer),
        renderer: Arc::new(PdfInvoiceRenderer),
        reset_token_ttl: chrono::Duration::minutes(config.reset_token_ttl_minutes),
    };

    let app = build_router(state, &config.cors_origin)?;

    let addr = SocketAddr::from((config.host.parse::<std::net::IpAddr>()?, config.port));
    tracing::info!("listening on {}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, app).await?;

    Ok(())
}
