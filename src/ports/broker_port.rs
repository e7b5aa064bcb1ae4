//! Order-placement and account-summary port traits.

use crate::domain::error::SwingtraderError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Submitted,
    Filled,
    Rejected,
}

/// Broker acknowledgement. A `Submitted` ack is treated optimistically; a
/// later reconciliation pass confirms fills.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderAck {
    pub order_id: String,
    pub status: OrderStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSummary {
    pub account_value: f64,
    pub buying_power: f64,
}

#[async_trait]
pub trait OrderPlacer: Send + Sync {
    async fn place_order(
        &self,
        symbol: &str,
        side: OrderSide,
        quantity: i64,
        price_hint: f64,
    ) -> Result<OrderAck, SwingtraderError>;
}

#[async_trait]
pub trait AccountProvider: Send + Sync {
    async fn account_summary(&self) -> Result<AccountSummary, SwingtraderError>;
}
