//! The instant-settlement calculator.
//!
//! Merchants choose which product categories may be captured immediately at authorization time. An order's line
//! items fall into two mutually exclusive buckets, `online_virtual` (virtual or downloadable) and `physical`
//! (everything else), with a third order-level bucket, `recurring`, for subscription orders.
//!
//! The scan is fail-fast. The first item whose bucket is not enabled clears that bucket's flag and stops the scan,
//! so the accumulated amount covers only the items seen before the mismatch. A mixed order with a later
//! incompatible item is therefore reported with a partial eligible amount, not a full audit of every item. A
//! subscription order whose `recurring` bucket is disabled stops before the first item, so nothing is eligible.

use rpg_common::MinorUnits;

use crate::db_types::Order;

/// Which product categories the merchant has enabled for instant settlement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SettleConfig {
    pub online_virtual: bool,
    pub physical: bool,
    pub recurring: bool,
}

impl SettleConfig {
    /// Parses a comma-separated category list, e.g. `"online_virtual,recurring"`. Unknown entries are ignored.
    pub fn from_list(list: &str) -> Self {
        let mut config = Self::default();
        for entry in list.split(',').map(str::trim) {
            match entry {
                "online_virtual" => config.online_virtual = true,
                "physical" => config.physical = true,
                "recurring" => config.recurring = true,
                _ => {},
            }
        }
        config
    }
}

/// The outcome of the settlement scan. Derived on demand and never persisted; only its consequence (a capture
/// call) is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettlementDecision {
    pub instant_settle: bool,
    /// The amount eligible for immediate capture, in minor units.
    pub instant_settle_amount: MinorUnits,
    pub order_products_count: usize,
    pub instant_settle_products_count: usize,
}

impl SettlementDecision {
    /// True when every item in the order is settle-eligible, so the capture can be for the full order total.
    pub fn covers_whole_order(&self) -> bool {
        self.instant_settle && self.instant_settle_products_count == self.order_products_count
    }
}

/// Computes whether, and how much of, an order should be captured immediately after authorization.
///
/// An order with zero line items settles instantly with a zero amount. That is a vacuous-truth result carried over
/// for compatibility; callers see `instant_settle_amount` of zero and issue no capture.
pub fn compute(order: &Order, config: &SettleConfig) -> SettlementDecision {
    // A subscription order needs the recurring category enabled. Without it the scan stops before the first
    // item, so nothing is eligible regardless of the other buckets.
    if order.contains_subscription() && !config.recurring {
        return SettlementDecision {
            instant_settle: false,
            instant_settle_amount: MinorUnits::from(0),
            order_products_count: order.items.len(),
            instant_settle_products_count: 0,
        };
    }

    let mut online_virtual_ok = true;
    let mut physical_ok = true;
    let recurring_ok = config.recurring && order.contains_subscription();

    let mut amount = MinorUnits::from(0);
    let mut eligible = 0usize;
    for item in &order.items {
        let is_online_virtual = item.is_virtual || item.is_downloadable;
        let enabled = if is_online_virtual { config.online_virtual } else { config.physical };
        if !enabled {
            if is_online_virtual {
                online_virtual_ok = false;
            } else {
                physical_ok = false;
            }
            break;
        }
        amount += item.total();
        eligible += 1;
    }

    let instant_settle = (online_virtual_ok && physical_ok) || recurring_ok;
    SettlementDecision {
        instant_settle,
        instant_settle_amount: if instant_settle { amount } else { MinorUnits::from(0) },
        order_products_count: order.items.len(),
        instant_settle_products_count: eligible,
    }
}
