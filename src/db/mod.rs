pub mod models;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

use crate::store::StoreError;

const MAX_CONNECTIONS: u32 = 10;

/// Opens the pool and brings the schema up to date.
pub async fn connect_and_migrate(database_url: &str) -> Result<PgPool, StoreError> {
    let pool = PgPoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .connect(database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;
    info!(max_connections = MAX_CONNECTIONS, "Database ready");
    Ok(pool)
}
