use anyhow::{Context, Result};
use sqlx::{postgres::PgPoolOptions, PgPool};

pub type DbPool = PgPool;

/// Database client wrapper
#[derive(Clone)]
pub struct DBClient {
    pub pool: DbPool,
}

impl DBClient {
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .context("failed to connect to the withdrawals database")?;

        Ok(Self { pool })
    }

    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}
