use anyhow::{ Context, Result };
use sqlx::postgres::{ PgPool, PgPoolOptions };
use sqlx::Executor;
use std::env;
use std::time::Duration;

use super::postgres::PgGateway;
use crate::utils::logging;

/// Database configuration for the shared PostgreSQL pool
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub connection_string: String,
    pub max_connections: u32,
    pub connect_timeout: Duration,
    /// Comma-separated schemas set as `search_path` on every connection
    pub search_path: Option<String>,
}

impl DbConfig {
    /// Create a new DbConfig from environment variables
    pub fn from_env() -> Result<Self> {
        // DATABASE_URL wins, PG_CONNECTION_STRING is accepted for older deployments
        let db_url = env
            ::var("DATABASE_URL")
            .or_else(|_| env::var("PG_CONNECTION_STRING"))
            .context("DATABASE_URL environment variable not set")?;

        // Default to 10 connections, but allow configuration
        let max_connections = env
            ::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse::<u32>()
            .context("Invalid DATABASE_MAX_CONNECTIONS value")?;

        // Default timeout of 30 seconds
        let connect_timeout_secs = env
            ::var("DATABASE_CONNECT_TIMEOUT")
            .unwrap_or_else(|_| "30".to_string())
            .parse::<u64>()
            .context("Invalid DATABASE_CONNECT_TIMEOUT value")?;

        let search_path = env
            ::var("DATABASE_SEARCH_PATH")
            .unwrap_or_else(|_| "knex,public".to_string());

        Ok(Self {
            connection_string: db_url,
            max_connections,
            connect_timeout: Duration::from_secs(connect_timeout_secs),
            search_path: parse_search_path(&search_path),
        })
    }
}

/// Normalize a comma-separated schema list into a `search_path` value
fn parse_search_path(raw: &str) -> Option<String> {
    let schemas = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| format!("\"{}\"", s.replace('"', "\"\"")))
        .collect::<Vec<_>>();

    if schemas.is_empty() {
        None
    } else {
        Some(schemas.join(", "))
    }
}

/// Process-wide PostgreSQL connection pool
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool
    pub async fn connect(config: DbConfig) -> Result<Self> {
        let search_path = config.search_path.clone();
        let pool = PgPoolOptions::new()
            .min_connections(0)
            .max_connections(config.max_connections)
            .acquire_timeout(config.connect_timeout)
            .after_connect(move |conn, _meta| {
                let search_path = search_path.clone();
                Box::pin(async move {
                    if let Some(path) = search_path {
                        conn.execute(format!("SET search_path TO {}", path).as_str()).await?;
                    }
                    Ok(())
                })
            })
            .connect(&config.connection_string).await
            .context("Failed to connect to database")?;

        // Verify connection by running a simple query
        sqlx::query("SELECT 1").execute(&pool).await.context("Failed to execute test query")?;

        logging::log_activity("database", "Successfully connected to database", None);

        Ok(Self { pool })
    }

    /// Storage gateway sharing this pool
    pub fn gateway(&self) -> PgGateway {
        PgGateway::new(self.pool.clone())
    }
}
