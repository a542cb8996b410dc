use serde::{Deserialize, Serialize};

use crate::error::EngineFault;
use crate::types::{OrderId, Trade};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectReason {
    FokUnfillable,
    MarketNoLiquidity,
    InvalidOrder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CancelReason {
    UserRequested,
    IocResidue,
    MarketNoLiquidity,
    OcoLinked,
}

/// Events produced by the matching engine, in strict commit order (§5).
/// Subscribers (market-data broadcaster, audit log) must not block a
/// publisher; the engine only ever appends to an outbound buffer per
/// command and never awaits a subscriber.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EngineEvent {
    OrderAccepted { order_id: OrderId },
    OrderRejected { order_id: OrderId, reason: RejectReason },
    OrderCanceled { order_id: OrderId, reason: CancelReason },
    TradeExecuted(Trade),
    SystemAlert { fault: EngineFault },
}
