use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uxtracking_backend::{
    config::Config,
    db::connection::{create_pool, run_migrations, DbPool},
    routes::router,
    services::accounts::ensure_example_user,
    state::AppState,
    utils::email::SmtpMailer,
};

fn mask_secret(s: &str) -> String {
    if s.is_empty() {
        return "<empty>".into();
    }
    let prefix = s.chars().take(4).collect::<String>();
    format!("{}*** (len={})", prefix, s.len())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration first so the log filter can follow APP_ENV.
    let config = Config::load()?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.environment.default_log_filter().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        environment = config.environment.as_str(),
        database_url = %mask_secret(&config.database_url),
        bind_addr = %config.bind_addr,
        jwt_secret = %mask_secret(&config.jwt_secret),
        jwt_expiration_hours = config.jwt_expiration_hours,
        cookie_secure = config.cookie_secure,
        time_zone = %config.time_zone,
        inference_url = config.inference_url.as_deref().unwrap_or("<unset>"),
        inference_timeout_secs = config.inference_timeout_secs,
        max_body_bytes = config.max_body_bytes,
        "Loaded configuration from environment/.env"
    );

    // Initialize database
    let pool: DbPool = create_pool(&config.database_url).await?;
    run_migrations(&pool).await?;

    let mailer = Arc::new(SmtpMailer::from_env()?);
    let bind_addr = config.bind_addr;
    let state = AppState::from_pool(pool, config, mailer)?;
    ensure_example_user(&state).await?;

    let app = router(state);

    tracing::info!("Server listening on {}", bind_addr);
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
