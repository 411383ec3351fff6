use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uxtracking_backend::{
    config::Config,
    db::connection::create_pool,
    repositories::{PgTokenStore, TokenStore},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load()?;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.environment.default_log_filter().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let pool = create_pool(&config.database_url).await?;
    let tokens = PgTokenStore::new(pool.clone());

    let deleted = tokens
        .delete_expired()
        .await
        .map_err(|err| anyhow::anyhow!("cleanup active tokens: {:?}", err))?;
    if deleted > 0 {
        tracing::info!("Deleted {} expired access tokens", deleted);
    }

    sqlx::query("VACUUM (ANALYZE) active_access_tokens")
        .execute(&pool)
        .await?;

    Ok(())
}
