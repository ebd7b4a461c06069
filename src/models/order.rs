use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// A completed purchase. Created atomically with its tickets; immutable
/// afterwards apart from the refund status transition, which has no API yet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub buyer_id: Uuid,
    /// The reservation this order finalized. Unique per order, which is what
    /// makes retried allocations return the original order instead of minting
    /// a second one.
    pub reservation_id: Uuid,
    pub status: OrderStatus,
    pub total_amount: Decimal,
    pub payment_reference: String,
    pub created_at: DateTime<Utc>,
    pub lines: Vec<OrderLine>,
}

/// Unit price is snapshotted at commit time, not re-read live.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderLine {
    pub ticket_type_id: Uuid,
    pub quantity: i32,
    pub unit_price: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Completed,
    Refunded,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Completed => "completed",
            OrderStatus::Refunded => "refunded",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "completed" => Ok(OrderStatus::Completed),
            "refunded" => Ok(OrderStatus::Refunded),
            other => Err(format!("unknown order status '{other}'")),
        }
    }
}
