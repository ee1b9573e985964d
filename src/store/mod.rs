//! Durable token and trader storage on SQLite.
//!
//! Every write is a single `INSERT ... ON CONFLICT DO UPDATE` statement keyed
//! by the record's natural identity, so each upsert is atomic and applying
//! the same record twice leaves the same stored state. Conflicts overwrite
//! every scraped field (last write wins).

pub mod records;

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use tracing::debug;

pub use records::{TokenRecord, TraderMetrics, TraderRecord};

/// SQL schema for the harvest database
const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS tokens (
    address TEXT PRIMARY KEY,
    name TEXT,
    market_cap REAL,
    liquidity REAL,
    volume REAL,
    thumbnail TEXT
);

CREATE TABLE IF NOT EXISTS traders (
    wallet_address TEXT PRIMARY KEY,
    token_address TEXT REFERENCES tokens(address),
    gross_profit REAL,
    win_rate REAL,
    wins INTEGER,
    losses INTEGER,
    trade_volume REAL,
    trades INTEGER,
    avg_trade_size REAL
);

-- Inbound lookups: which traders were surfaced by token X
CREATE INDEX IF NOT EXISTS idx_traders_token ON traders(token_address);
"#;

/// Error types for persistence operations
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    /// The shared store itself is unreachable; fatal to the pool
    #[error("Storage connection lost: {0}")]
    ConnectionLost(String),

    /// The record violates a schema constraint (e.g. unknown token reference)
    #[error("Constraint violation: {0}")]
    Constraint(String),

    #[error("Query failed: {0}")]
    Query(String),
}

impl PersistenceError {
    #[must_use]
    pub fn is_connection_lost(&self) -> bool {
        matches!(self, Self::ConnectionLost(_))
    }
}

impl From<sqlx::Error> for PersistenceError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => Self::ConnectionLost(err.to_string()),
            sqlx::Error::Database(db)
                if db.is_foreign_key_violation()
                    || db.is_unique_violation()
                    || db.is_check_violation()
                    || db.message().contains("constraint failed") =>
            {
                Self::Constraint(err.to_string())
            }
            _ => Self::Query(err.to_string()),
        }
    }
}

/// Handle to the harvest database. Cheap to clone; clones share one pool.
#[derive(Clone, Debug)]
pub struct TokenStore {
    pool: SqlitePool,
}

impl TokenStore {
    /// Open (creating if missing) the database named by a `sqlite://` URL.
    pub async fn connect(database_url: &str) -> Result<Self, PersistenceError> {
        let options = SqliteConnectOptions::from_str(database_url)?;
        Self::open_with(options).await
    }

    /// Open (creating if missing) the database file at `path`.
    pub async fn open(path: &Path) -> Result<Self, PersistenceError> {
        Self::open_with(SqliteConnectOptions::new().filename(path)).await
    }

    async fn open_with(options: SqliteConnectOptions) -> Result<Self, PersistenceError> {
        let options = options
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(30));

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;

        // Idempotent: CREATE IF NOT EXISTS
        sqlx::query(SCHEMA_SQL).execute(&pool).await?;

        Ok(Self { pool })
    }

    /// Insert or overwrite a token row.
    pub async fn upsert_token(&self, token: &TokenRecord) -> Result<(), PersistenceError> {
        sqlx::query(
            r#"
            INSERT INTO tokens (address, name, market_cap, liquidity, volume, thumbnail)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(address) DO UPDATE SET
                name = excluded.name,
                market_cap = excluded.market_cap,
                liquidity = excluded.liquidity,
                volume = excluded.volume,
                thumbnail = excluded.thumbnail
            "#,
        )
        .bind(&token.address)
        .bind(&token.name)
        .bind(token.market_cap)
        .bind(token.liquidity)
        .bind(token.volume)
        .bind(&token.thumbnail)
        .execute(&self.pool)
        .await?;

        debug!(token = %token.address, "Upserted token");
        Ok(())
    }

    /// Insert a token, or overwrite only its page-scraped columns.
    ///
    /// Market metrics already stored for the token are left as they are.
    pub async fn upsert_token_overview(&self, token: &TokenRecord) -> Result<(), PersistenceError> {
        sqlx::query(
            r#"
            INSERT INTO tokens (address, name, market_cap, liquidity, volume, thumbnail)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(address) DO UPDATE SET
                name = excluded.name,
                thumbnail = excluded.thumbnail
            "#,
        )
        .bind(&token.address)
        .bind(&token.name)
        .bind(token.market_cap)
        .bind(token.liquidity)
        .bind(token.volume)
        .bind(&token.thumbnail)
        .execute(&self.pool)
        .await?;

        debug!(token = %token.address, "Upserted token overview");
        Ok(())
    }

    /// Insert or overwrite a trader row.
    ///
    /// Fails with [`PersistenceError::Constraint`] when `token_address` names
    /// a token that is not stored.
    pub async fn upsert_trader(&self, trader: &TraderRecord) -> Result<(), PersistenceError> {
        sqlx::query(
            r#"
            INSERT INTO traders (
                wallet_address, token_address, gross_profit, win_rate, wins, losses,
                trade_volume, trades, avg_trade_size
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(wallet_address) DO UPDATE SET
                token_address = excluded.token_address,
                gross_profit = excluded.gross_profit,
                win_rate = excluded.win_rate,
                wins = excluded.wins,
                losses = excluded.losses,
                trade_volume = excluded.trade_volume,
                trades = excluded.trades,
                avg_trade_size = excluded.avg_trade_size
            "#,
        )
        .bind(&trader.wallet_address)
        .bind(&trader.token_address)
        .bind(trader.gross_profit)
        .bind(trader.win_rate)
        .bind(trader.wins)
        .bind(trader.losses)
        .bind(trader.trade_volume)
        .bind(trader.trades)
        .bind(trader.avg_trade_size)
        .execute(&self.pool)
        .await?;

        debug!(trader = %trader.wallet_address, "Upserted trader");
        Ok(())
    }

    pub async fn get_token(&self, address: &str) -> Result<Option<TokenRecord>, PersistenceError> {
        let token = sqlx::query_as::<_, TokenRecord>(
            "SELECT address, name, market_cap, liquidity, volume, thumbnail FROM tokens WHERE address = ?",
        )
        .bind(address)
        .fetch_optional(&self.pool)
        .await?;
        Ok(token)
    }

    pub async fn get_trader(&self, wallet: &str) -> Result<Option<TraderRecord>, PersistenceError> {
        let trader = sqlx::query_as::<_, TraderRecord>(
            r#"
            SELECT wallet_address, token_address, gross_profit, win_rate, wins, losses,
                   trade_volume, trades, avg_trade_size
            FROM traders WHERE wallet_address = ?
            "#,
        )
        .bind(wallet)
        .fetch_optional(&self.pool)
        .await?;
        Ok(trader)
    }

    /// Traders surfaced by `token_address`, ordered by wallet.
    pub async fn traders_for_token(
        &self,
        token_address: &str,
    ) -> Result<Vec<TraderRecord>, PersistenceError> {
        let traders = sqlx::query_as::<_, TraderRecord>(
            r#"
            SELECT wallet_address, token_address, gross_profit, win_rate, wins, losses,
                   trade_volume, trades, avg_trade_size
            FROM traders WHERE token_address = ?
            ORDER BY wallet_address
            "#,
        )
        .bind(token_address)
        .fetch_all(&self.pool)
        .await?;
        Ok(traders)
    }

    pub async fn token_count(&self) -> Result<i64, PersistenceError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM tokens")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn trader_count(&self) -> Result<i64, PersistenceError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM traders")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Round-trip a trivial query, for health checks.
    pub async fn ping(&self) -> Result<(), PersistenceError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Close the pool. Later calls fail with [`PersistenceError::ConnectionLost`].
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
