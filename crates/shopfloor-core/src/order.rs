//! Accepted orders and their pipeline progress.
//!
//! Only the structural half of an order lives here: which items it spawned
//! and how many have left the pipeline. Pricing, clients and deadlines belong
//! to the business layer outside the core.

use crate::id::{ItemId, ProductTypeId};
use serde::{Deserialize, Serialize};

/// One line of an order: a product and how many units of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product: ProductTypeId,
    pub quantity: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    InProgress,
    Completed,
}

/// An accepted order tracked through the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub lines: Vec<OrderLine>,
    /// Items spawned for this order, one per unit quantity.
    pub items: Vec<ItemId>,
    /// Units that have reached the terminal delivered marker.
    pub delivered: u32,
    pub status: OrderStatus,
}

impl Order {
    pub fn new(lines: Vec<OrderLine>) -> Self {
        Self {
            lines,
            items: Vec::new(),
            delivered: 0,
            status: OrderStatus::InProgress,
        }
    }

    /// Total unit count across all lines.
    pub fn total_units(&self) -> u32 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    /// Record one delivered unit. Returns true when this delivery completed
    /// the order.
    pub fn record_delivery(&mut self) -> bool {
        self.delivered = self.delivered.saturating_add(1);
        if self.status == OrderStatus::InProgress && self.delivered >= self.total_units() {
            self.status = OrderStatus::Completed;
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_line_order() -> Order {
        Order::new(vec![
            OrderLine { product: ProductTypeId(0), quantity: 2 },
            OrderLine { product: ProductTypeId(1), quantity: 1 },
        ])
    }

    #[test]
    fn total_units_sums_lines() {
        assert_eq!(two_line_order().total_units(), 3);
    }

    #[test]
    fn completes_on_last_delivery() {
        let mut order = two_line_order();
        assert!(!order.record_delivery());
        assert!(!order.record_delivery());
        assert_eq!(order.status, OrderStatus::InProgress);
        assert!(order.record_delivery());
        assert_eq!(order.status, OrderStatus::Completed);
    }

    #[test]
    fn completion_fires_once() {
        let mut order = Order::new(vec![OrderLine { product: ProductTypeId(0), quantity: 1 }]);
        assert!(order.record_delivery());
        assert!(!order.record_delivery());
    }
}
