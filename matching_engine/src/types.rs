use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub type OrderId = u64;
pub type AccountId = u64;
pub type TradeId = u64;
pub type LinkId = u64;
pub type Price = Decimal;
pub type Quantity = Decimal;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

/// Tagged variant replacing a deep order-type hierarchy; OCO is not a kind
/// of its own, it's an orthogonal `LinkGroup` over a limit and a stop leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderKind {
    Limit,
    Market,
    Stop,
    StopLimit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tif {
    Gtc,
    Ioc,
    Fok,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinkGroup {
    None,
    Oco(LinkId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    Pending,
    Open,
    Partial,
    Triggered,
    Filled,
    Canceled,
    Rejected,
}

impl OrderStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Filled | OrderStatus::Canceled | OrderStatus::Rejected)
    }
}

/// A submitted order at any point in its lifecycle. `price` is required iff
/// `kind` is `Limit` or `StopLimit`; `stop_price` is required iff `kind` is
/// `Stop` or `StopLimit`. `quote_budget` tracks the quote amount still
/// locked for a buy order of any kind: `AccountService` sets it at admission
/// to whatever was actually locked (`amount * price` for limit/stop-limit,
/// the caller-supplied envelope for market/stop), and the engine decrements
/// it by each fill's notional as matching proceeds, so it always reflects
/// what cancellation/residue handling must unlock. `None` for sell orders,
/// which lock base asset instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub account_id: AccountId,
    pub market: String,
    pub side: Side,
    pub kind: OrderKind,
    pub tif: Tif,
    pub price: Option<Price>,
    pub stop_price: Option<Price>,
    pub amount: Quantity,
    pub filled: Quantity,
    pub status: OrderStatus,
    pub link: LinkGroup,
    pub quote_budget: Option<Decimal>,
    pub created_at: DateTime<Utc>,
}

impl Order {
    pub fn remaining(&self) -> Quantity {
        self.amount - self.filled
    }

    pub fn is_filled(&self) -> bool {
        self.remaining().is_zero()
    }

    pub fn link_id(&self) -> Option<LinkId> {
        match self.link {
            LinkGroup::Oco(id) => Some(id),
            LinkGroup::None => None,
        }
    }
}

/// A single matched quantity between a resting maker and an incoming taker.
/// `price` is always the maker's price at the time of match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    pub id: TradeId,
    pub market: String,
    pub maker_order_id: OrderId,
    pub taker_order_id: OrderId,
    pub taker_side: Side,
    pub price: Price,
    pub amount: Quantity,
    pub fee_maker: Decimal,
    pub fee_taker: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Aggregated top-of-book view for market-data emission (§4.2 `snapshot`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookSnapshot {
    pub market: String,
    /// Highest price first.
    pub bids: Vec<(Price, Quantity)>,
    /// Lowest price first.
    pub asks: Vec<(Price, Quantity)>,
}
