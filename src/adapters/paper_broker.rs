//! Paper broker and fixed account, for dry runs and tests.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tracing::info;

use crate::domain::error::SwingtraderError;
use crate::ports::broker_port::{
    AccountProvider, AccountSummary, OrderAck, OrderPlacer, OrderSide, OrderStatus,
};

/// Accepts every order and assigns sequential ids. Records each order so
/// tests can assert on what was placed.
#[derive(Default)]
pub struct PaperBroker {
    next_id: AtomicU64,
    orders: Mutex<Vec<PaperOrder>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaperOrder {
    pub symbol: String,
    pub side: OrderSide,
    pub quantity: i64,
    pub price_hint: f64,
}

impl PaperBroker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn orders(&self) -> Vec<PaperOrder> {
        self.orders.lock().map(|o| o.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl OrderPlacer for PaperBroker {
    async fn place_order(
        &self,
        symbol: &str,
        side: OrderSide,
        quantity: i64,
        price_hint: f64,
    ) -> Result<OrderAck, SwingtraderError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        info!(symbol, ?side, quantity, price_hint, order_id = id, "paper order");
        if let Ok(mut orders) = self.orders.lock() {
            orders.push(PaperOrder {
                symbol: symbol.to_string(),
                side,
                quantity,
                price_hint,
            });
        }
        Ok(OrderAck {
            order_id: format!("paper-{id}"),
            status: OrderStatus::Filled,
        })
    }
}

/// Constant account summary; the paper setup has no equity feedback loop.
pub struct FixedAccount {
    pub account_value: f64,
    pub buying_power: f64,
}

impl FixedAccount {
    pub fn new(account_value: f64) -> Self {
        Self {
            account_value,
            buying_power: account_value,
        }
    }
}

#[async_trait]
impl AccountProvider for FixedAccount {
    async fn account_summary(&self) -> Result<AccountSummary, SwingtraderError> {
        Ok(AccountSummary {
            account_value: self.account_value,
            buying_power: self.buying_power,
        })
    }
}
