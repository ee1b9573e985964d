//! Stored record shapes

use serde::{Deserialize, Serialize};

/// One row of the `tokens` table. Natural key: `address`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct TokenRecord {
    pub address: String,
    pub name: Option<String>,
    pub market_cap: Option<f64>,
    pub liquidity: Option<f64>,
    pub volume: Option<f64>,
    pub thumbnail: Option<String>,
}

impl TokenRecord {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            name: None,
            market_cap: None,
            liquidity: None,
            volume: None,
            thumbnail: None,
        }
    }

    /// Whether any market metric is set. Tokens admitted from change events
    /// carry none.
    #[must_use]
    pub fn has_market_metrics(&self) -> bool {
        self.market_cap.is_some() || self.liquidity.is_some() || self.volume.is_some()
    }
}

/// Metrics scraped from a trader's wallet page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TraderMetrics {
    pub gross_profit: Option<f64>,
    pub win_rate: Option<f64>,
    pub wins: Option<i64>,
    pub losses: Option<i64>,
    pub trade_volume: Option<f64>,
    pub trades: Option<i64>,
    pub avg_trade_size: Option<f64>,
}

/// One row of the `traders` table. Natural key: `wallet_address`.
///
/// `token_address` references the token whose top-trader list surfaced the
/// wallet, or is `None` when that association is not known.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct TraderRecord {
    pub wallet_address: String,
    pub token_address: Option<String>,
    pub gross_profit: Option<f64>,
    pub win_rate: Option<f64>,
    pub wins: Option<i64>,
    pub losses: Option<i64>,
    pub trade_volume: Option<f64>,
    pub trades: Option<i64>,
    pub avg_trade_size: Option<f64>,
}

impl TraderRecord {
    pub fn new(
        wallet_address: impl Into<String>,
        token_address: Option<String>,
        metrics: TraderMetrics,
    ) -> Self {
        Self {
            wallet_address: wallet_address.into(),
            token_address,
            gross_profit: metrics.gross_profit,
            win_rate: metrics.win_rate,
            wins: metrics.wins,
            losses: metrics.losses,
            trade_volume: metrics.trade_volume,
            trades: metrics.trades,
            avg_trade_size: metrics.avg_trade_size,
        }
    }
}
