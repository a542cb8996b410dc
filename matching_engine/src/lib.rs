pub mod book;
pub mod error;
pub mod events;
pub mod fees;
pub mod types;

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;

use rust_decimal::Decimal;

use book::OrderBook;
use error::{AdmissionError, EngineFault};
use events::{CancelReason, EngineEvent, RejectReason};
use fees::FeeSchedule;
use ledger::{Ledger, SettleTrade};
use types::{LinkGroup, LinkId, Order, OrderId, OrderKind, OrderStatus, Price, Quantity, Side, Tif, Trade};

pub use types::{AccountId, BookSnapshot, TradeId};

/// How many stop activations a single command may chain through before the
/// engine treats further recursion as a bug (§4.3, §7 `stop_trigger_loop`).
const STOP_RECURSION_LIMIT: usize = 256;

/// Single-writer-per-market state machine (§4.3). Owns the `OrderBook`, the
/// stop-order trigger table, and the OCO linkage map for one market; holds
/// the shared `Ledger` to settle trades and release locked funds on
/// cancellation. Callers are expected to serialize access per market (one
/// thread with an inbound channel, or a mutex) — the engine itself assumes
/// single-threaded access to its methods (§5).
pub struct MatchingEngine {
    market: String,
    base_asset: String,
    quote_asset: String,
    book: OrderBook,
    ledger: Arc<Ledger>,
    fees: Arc<dyn FeeSchedule>,
    /// Armed buy-stops, keyed by `stop_price` ascending (the activation
    /// order the spec requires); each level is a FIFO by arrival / order id.
    buy_stops: BTreeMap<Price, VecDeque<Order>>,
    /// Armed sell-stops, keyed by `stop_price`; iterated in reverse for
    /// descending activation order.
    sell_stops: BTreeMap<Price, VecDeque<Order>>,
    oco_links: HashMap<LinkId, (OrderId, OrderId)>,
    order_link: HashMap<OrderId, LinkId>,
    last_trade_price: Option<Price>,
    next_trade_id: TradeId,
    next_link_id: LinkId,
    /// Set by a fatal `EngineFault`; once `true` the engine refuses further
    /// commands until an operator restarts it (§4.3, §7).
    halted: bool,
}

impl MatchingEngine {
    pub fn new(
        market: impl Into<String>,
        base_asset: impl Into<String>,
        quote_asset: impl Into<String>,
        ledger: Arc<Ledger>,
        fees: Arc<dyn FeeSchedule>,
    ) -> Self {
        Self {
            market: market.into(),
            base_asset: base_asset.into(),
            quote_asset: quote_asset.into(),
            book: OrderBook::new(),
            ledger,
            fees,
            buy_stops: BTreeMap::new(),
            sell_stops: BTreeMap::new(),
            oco_links: HashMap::new(),
            order_link: HashMap::new(),
            last_trade_price: None,
            next_trade_id: 1,
            next_link_id: 1,
            halted: false,
        }
    }

    pub fn market(&self) -> &str {
        &self.market
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    pub fn next_link_id(&mut self) -> LinkId {
        let id = self.next_link_id;
        self.next_link_id += 1;
        id
    }

    pub fn snapshot(&self, depth: usize) -> BookSnapshot {
        self.book.snapshot(&self.market, depth)
    }

    pub fn resting_order(&self, order_id: OrderId) -> Option<&Order> {
        self.book.get(order_id)
    }

    fn halt(&mut self, fault: EngineFault, events: &mut Vec<EngineEvent>) {
        tracing::error!(market = %self.market, fault = %fault, "matching engine halted on fatal fault");
        self.halted = true;
        events.push(EngineEvent::SystemAlert { fault });
    }

    /// Asset and quantity an order's lock would release if canceled/rejected
    /// before any further fill. Sell-side orders of every kind lock
    /// `remaining` in base. Buy-side orders of every kind track what's still
    /// locked in `order.quote_budget`, which `AccountService` seeds at
    /// admission with the actual locked amount (`amount * price` for
    /// limit/stop-limit, the caller-supplied envelope for market/stop) and
    /// which `match_taker` decrements by each fill's real notional — not
    /// `remaining() * order.price`, which after a fill at an improved maker
    /// price would overstate what's still locked and strand the difference.
    fn locked_remainder(&self, order: &Order) -> (&str, Quantity) {
        match order.side {
            Side::Sell => (&self.base_asset, order.remaining()),
            Side::Buy => (&self.quote_asset, order.quote_budget.unwrap_or(Decimal::ZERO)),
        }
    }

    fn unlock_remainder(&self, order: &Order) -> Result<(), EngineFault> {
        let (asset, qty) = self.locked_remainder(order);
        if qty <= Decimal::ZERO {
            return Ok(());
        }
        self.ledger
            .unlock(order.account_id, asset, qty)
            .map_err(|e| EngineFault::LedgerInconsistency(e.to_string()))
    }

    // ---- OCO linkage -----------------------------------------------------

    fn link_oco(&mut self, link_id: LinkId, leg_a: OrderId, leg_b: OrderId) {
        self.oco_links.insert(link_id, (leg_a, leg_b));
        self.order_link.insert(leg_a, link_id);
        self.order_link.insert(leg_b, link_id);
    }

    fn linked_leg(&self, order_id: OrderId) -> Option<OrderId> {
        let link_id = *self.order_link.get(&order_id)?;
        let (a, b) = self.oco_links.get(&link_id)?;
        Some(if *a == order_id { *b } else { *a })
    }

    /// Cancels the other leg of an OCO pair once one leg fills or
    /// partially fills (§4.3 OCO). The leg may be resting in the book or
    /// still armed in the stop table.
    ///
    /// An OCO pair's two legs lock collateral exactly once at admission
    /// (both legs trade the same side/asset/amount, so only one can ever
    /// execute); the winning leg's own match/residue/cancel path is what
    /// settles or releases that single lock. Canceling the losing leg here
    /// is therefore bookkeeping only — it must never call `unlock` itself,
    /// or it would release collateral a second time.
    fn cancel_linked_leg(&mut self, order_id: OrderId, events: &mut Vec<EngineEvent>) -> Result<(), EngineFault> {
        let Some(other_id) = self.linked_leg(order_id) else {
            return Ok(());
        };
        self.order_link.remove(&order_id);
        self.order_link.remove(&other_id);

        if self.book.remove(other_id).is_some() {
            events.push(EngineEvent::OrderCanceled { order_id: other_id, reason: CancelReason::OcoLinked });
            return Ok(());
        }
        if remove_from_stop_table(&mut self.buy_stops, &mut self.sell_stops, other_id).is_some() {
            events.push(EngineEvent::OrderCanceled { order_id: other_id, reason: CancelReason::OcoLinked });
        }
        Ok(())
    }

    // ---- Submission entry points -----------------------------------------

    /// Admits a GTC/IOC limit order, matches it against the book, and rests
    /// any residue per tif (§4.3 post-match residue handling).
    pub fn submit_limit(&mut self, mut order: Order) -> Result<Vec<EngineEvent>, EngineFault> {
        let mut events = Vec::new();
        if self.halted {
            return Ok(events);
        }
        let limit_price = order.price;
        self.match_taker(&mut order, limit_price, &mut events)?;
        self.finish_residue(order, &mut events)?;
        self.trigger_stops(&mut events)?;
        Ok(events)
    }

    /// Market order: matched at any crossable price (no limit), residue
    /// canceled once the book is exhausted (§4.3 Market).
    pub fn submit_market(&mut self, mut order: Order) -> Result<Vec<EngineEvent>, EngineFault> {
        let mut events = Vec::new();
        if self.halted {
            return Ok(events);
        }
        self.match_taker(&mut order, None, &mut events)?;
        if order.remaining() > Decimal::ZERO {
            self.reject_or_cancel_market_residue(&mut order, &mut events)?;
        } else {
            order.status = OrderStatus::Filled;
        }
        self.trigger_stops(&mut events)?;
        Ok(events)
    }

    fn reject_or_cancel_market_residue(&mut self, order: &mut Order, events: &mut Vec<EngineEvent>) -> Result<(), EngineFault> {
        order.status = if order.filled > Decimal::ZERO { OrderStatus::Partial } else { OrderStatus::Canceled };
        self.unlock_remainder(order)?;
        events.push(EngineEvent::OrderCanceled { order_id: order.id, reason: CancelReason::MarketNoLiquidity });
        self.cancel_linked_leg(order.id, events)?;
        Ok(())
    }

    /// Fill-or-kill: pre-scans crossable liquidity; if the full amount
    /// cannot be filled, rejects before any ledger effect (§4.3 FOK).
    pub fn submit_fok(&mut self, mut order: Order) -> Result<Vec<EngineEvent>, EngineFault> {
        let mut events = Vec::new();
        if self.halted {
            return Ok(events);
        }
        let available = self.book.crossable_liquidity(order.side, order.price);
        if available < order.remaining() {
            order.status = OrderStatus::Rejected;
            self.unlock_remainder(&order)?;
            events.push(EngineEvent::OrderRejected { order_id: order.id, reason: RejectReason::FokUnfillable });
            return Ok(events);
        }
        let limit_price = order.price;
        self.match_taker(&mut order, limit_price, &mut events)?;
        order.status = OrderStatus::Filled;
        self.trigger_stops(&mut events)?;
        Ok(events)
    }

    /// Arms a stop or stop-limit order in the trigger table (§4.3). Does
    /// not touch the book until it activates.
    pub fn submit_stop(&mut self, order: Order) -> Result<Vec<EngineEvent>, EngineFault> {
        let mut events = Vec::new();
        if self.halted {
            return Ok(events);
        }
        self.arm_stop(order);
        self.trigger_stops(&mut events)?;
        Ok(events)
    }

    fn arm_stop(&mut self, mut order: Order) {
        order.status = OrderStatus::Open;
        let stop_price = order.stop_price.expect("stop order carries a stop price");
        let table = match order.side {
            Side::Buy => &mut self.buy_stops,
            Side::Sell => &mut self.sell_stops,
        };
        table.entry(stop_price).or_default().push_back(order);
    }

    /// Submits two linked legs under a shared `link_id`; either leg filling
    /// (even partially) cancels the other (§4.3 OCO).
    pub fn submit_oco(&mut self, limit_leg: Order, stop_leg: Order) -> Result<Vec<EngineEvent>, EngineFault> {
        let mut events = Vec::new();
        if self.halted {
            return Ok(events);
        }
        let link_id = self.next_link_id();
        self.link_oco(link_id, limit_leg.id, stop_leg.id);

        let limit_price = limit_leg.price;
        let mut limit_leg = limit_leg;
        self.match_taker(&mut limit_leg, limit_price, &mut events)?;
        let limit_filled_any = limit_leg.filled > Decimal::ZERO;
        self.finish_residue(limit_leg, &mut events)?;
        if limit_filled_any {
            // Limit leg wins simultaneous activation; stop leg never arms.
            // Both legs share the single lock taken at admission, so no unlock here.
            self.order_link.remove(&stop_leg.id);
            events.push(EngineEvent::OrderCanceled { order_id: stop_leg.id, reason: CancelReason::OcoLinked });
        } else {
            self.arm_stop(stop_leg);
        }
        self.trigger_stops(&mut events)?;
        Ok(events)
    }

    fn finish_residue(&mut self, mut order: Order, events: &mut Vec<EngineEvent>) -> Result<(), EngineFault> {
        if order.remaining() <= Decimal::ZERO {
            order.status = OrderStatus::Filled;
            self.cancel_linked_leg(order.id, events)?;
            return Ok(());
        }
        match order.tif {
            Tif::Ioc => {
                order.status = if order.filled > Decimal::ZERO { OrderStatus::Partial } else { OrderStatus::Canceled };
                self.unlock_remainder(&order)?;
                events.push(EngineEvent::OrderCanceled { order_id: order.id, reason: CancelReason::IocResidue });
                self.cancel_linked_leg(order.id, events)?;
            }
            Tif::Fok => {
                // FOK never reaches here: submit_fok rejects before matching.
                order.status = OrderStatus::Filled;
            }
            Tif::Gtc => {
                order.status = if order.filled > Decimal::ZERO { OrderStatus::Partial } else { OrderStatus::Open };
                let filled_any = order.filled > Decimal::ZERO;
                let order_id = order.id;
                self.book.insert(order);
                if filled_any {
                    self.cancel_linked_leg(order_id, events)?;
                }
                return Ok(());
            }
        }
        Ok(())
    }

    /// Cancels an order resting in the book or armed in the stop table.
    /// Unlocks its remaining locked quantity and, for OCO members, cancels
    /// the linked leg (§4.3 Cancellation).
    pub fn cancel(&mut self, order_id: OrderId) -> Result<Vec<EngineEvent>, EngineFault> {
        let mut events = Vec::new();
        if self.halted {
            return Ok(events);
        }
        let order = if let Some(order) = self.book.remove(order_id) {
            order
        } else if let Some(order) = remove_from_stop_table(&mut self.buy_stops, &mut self.sell_stops, order_id) {
            order
        } else {
            return Ok(events);
        };
        self.unlock_remainder(&order)?;
        self.order_link.remove(&order_id);
        events.push(EngineEvent::OrderCanceled { order_id, reason: CancelReason::UserRequested });
        self.cancel_linked_leg(order_id, &mut events)?;
        Ok(events)
    }

    // ---- Matching core -----------------------------------------------------

    /// Repeatedly crosses `taker` against the opposite side of the book
    /// until it is exhausted or the best opposite price is no longer
    /// crossable at `limit_price` (`None` means marketable at any price).
    /// Each crossed quantity settles through the ledger before the book is
    /// mutated, so a settlement failure halts the engine with the book
    /// still reflecting the pre-trade state (§4.3 step 4-5, §7).
    fn match_taker(&mut self, taker: &mut Order, limit_price: Option<Price>, events: &mut Vec<EngineEvent>) -> Result<(), EngineFault> {
        while taker.remaining() > Decimal::ZERO {
            let Some(maker_id) = self.book.peek_crossable(taker.side, limit_price) else {
                break;
            };
            let maker = self
                .book
                .get(maker_id)
                .cloned()
                .ok_or_else(|| EngineFault::BookIndexCorruption(format!("order {maker_id} indexed but missing")))?;

            let qty = taker.remaining().min(maker.remaining());
            let price = maker.price.expect("resting maker carries a price");
            let notional = price * qty;

            let (buyer, seller, buyer_fee_role, seller_fee_role) = match taker.side {
                Side::Buy => (taker.account_id, maker.account_id, Role::Taker, Role::Maker),
                Side::Sell => (maker.account_id, taker.account_id, Role::Maker, Role::Taker),
            };
            let buyer_fee = self.fee_for(buyer_fee_role, notional);
            let seller_fee = self.fee_for(seller_fee_role, notional);

            self.ledger
                .settle_trade(SettleTrade {
                    buyer,
                    seller,
                    base_asset: &self.base_asset,
                    quote_asset: &self.quote_asset,
                    price,
                    qty,
                    buyer_fee,
                    seller_fee,
                    maker_order_id: maker_id,
                    taker_order_id: taker.id,
                })
                .map_err(|e| EngineFault::LedgerInconsistency(e.to_string()))?;

            let maker_after = self
                .book
                .apply_fill(maker_id, qty)
                .or_else(|| self.book.get(maker_id).cloned());
            taker.filled += qty;
            if taker.side == Side::Buy {
                if let Some(budget) = taker.quote_budget {
                    taker.quote_budget = Some(budget - notional);
                }
            }
            self.last_trade_price = Some(price);

            let (fee_maker, fee_taker) = match taker.side {
                Side::Buy => (seller_fee, buyer_fee),
                Side::Sell => (buyer_fee, seller_fee),
            };
            let trade_id = self.next_trade_id;
            self.next_trade_id += 1;
            events.push(EngineEvent::TradeExecuted(Trade {
                id: trade_id,
                market: self.market.clone(),
                maker_order_id: maker_id,
                taker_order_id: taker.id,
                taker_side: taker.side,
                price,
                amount: qty,
                fee_maker,
                fee_taker,
                created_at: chrono::Utc::now(),
            }));

            if let Some(maker_order) = maker_after {
                if maker_order.is_filled() {
                    self.cancel_linked_leg(maker_id, events)?;
                }
            }
        }
        Ok(())
    }

    fn fee_for(&self, role: Role, notional: Decimal) -> Decimal {
        match role {
            Role::Maker => self.fees.maker_fee(&self.market, notional),
            Role::Taker => self.fees.taker_fee(&self.market, notional),
        }
    }

    // ---- Stop-order activation --------------------------------------------

    /// After a trade, activates every armed stop whose trigger condition is
    /// satisfied by `last_trade_price`, in ascending `stop_price` for
    /// buy-stops and descending for sell-stops, ties broken by ascending
    /// order id (§4.3). Activation may itself trade and move the price,
    /// which can arm further activations; recursion is bounded by
    /// `STOP_RECURSION_LIMIT` to guarantee termination (§4.3, §7
    /// `stop_trigger_loop`).
    fn trigger_stops(&mut self, events: &mut Vec<EngineEvent>) -> Result<(), EngineFault> {
        let Some(last) = self.last_trade_price else { return Ok(()) };
        let mut activations = 0usize;

        loop {
            let next = self.pop_next_triggered(last);
            let Some(order) = next else { break };
            activations += 1;
            if activations > STOP_RECURSION_LIMIT {
                let fault = EngineFault::StopTriggerLoop(order.id);
                self.halt(fault, events);
                return Ok(());
            }
            self.activate_stop(order, events)?;
            if self.halted {
                break;
            }
        }
        Ok(())
    }

    fn pop_next_triggered(&mut self, last: Price) -> Option<Order> {
        if let Some((&price, level)) = self.buy_stops.iter().next() {
            if last >= price {
                let order = level.front().cloned();
                if let Some(order) = order {
                    let level = self.buy_stops.get_mut(&price).unwrap();
                    level.pop_front();
                    if level.is_empty() {
                        self.buy_stops.remove(&price);
                    }
                    return Some(order);
                }
            }
        }
        if let Some((&price, level)) = self.sell_stops.iter().next_back() {
            if last <= price {
                let order = level.front().cloned();
                if let Some(order) = order {
                    let level = self.sell_stops.get_mut(&price).unwrap();
                    level.pop_front();
                    if level.is_empty() {
                        self.sell_stops.remove(&price);
                    }
                    return Some(order);
                }
            }
        }
        None
    }

    fn activate_stop(&mut self, mut order: Order, events: &mut Vec<EngineEvent>) -> Result<(), EngineFault> {
        order.status = OrderStatus::Triggered;
        match order.kind {
            OrderKind::Stop => {
                order.kind = OrderKind::Market;
                self.match_taker(&mut order, None, events)?;
                if order.remaining() > Decimal::ZERO {
                    self.reject_or_cancel_market_residue(&mut order, events)?;
                } else {
                    order.status = OrderStatus::Filled;
                    self.cancel_linked_leg(order.id, events)?;
                }
            }
            OrderKind::StopLimit => {
                order.kind = OrderKind::Limit;
                let limit_price = order.price;
                self.match_taker(&mut order, limit_price, events)?;
                self.finish_residue(order, events)?;
            }
            OrderKind::Limit | OrderKind::Market => unreachable!("only stop kinds are armed"),
        }
        Ok(())
    }
}

#[derive(Clone, Copy)]
enum Role {
    Maker,
    Taker,
}

fn remove_from_stop_table(
    buy_stops: &mut BTreeMap<Price, VecDeque<Order>>,
    sell_stops: &mut BTreeMap<Price, VecDeque<Order>>,
    order_id: OrderId,
) -> Option<Order> {
    for table in [buy_stops, sell_stops] {
        let mut empty_price = None;
        for (price, level) in table.iter_mut() {
            if let Some(pos) = level.iter().position(|o| o.id == order_id) {
                let order = level.remove(pos);
                if level.is_empty() {
                    empty_price = Some(*price);
                }
                if let Some(price) = empty_price {
                    table.remove(&price);
                }
                return order;
            }
        }
    }
    None
}

/// Constructs a fresh `Order` in `Pending` status; `AccountService` is
/// responsible for admission validation and locking before handing the
/// result to one of the engine's `submit_*` methods (§4.4).
pub fn new_order(
    id: OrderId,
    account_id: AccountId,
    market: impl Into<String>,
    side: Side,
    kind: OrderKind,
    tif: Tif,
    price: Option<Price>,
    stop_price: Option<Price>,
    amount: Quantity,
    quote_budget: Option<Decimal>,
) -> Order {
    Order {
        id,
        account_id,
        market: market.into(),
        side,
        kind,
        tif,
        price,
        stop_price,
        amount,
        filled: Decimal::ZERO,
        status: OrderStatus::Pending,
        link: LinkGroup::None,
        quote_budget,
        created_at: chrono::Utc::now(),
    }
}

pub fn admission_missing_price(kind: OrderKind, side: Side, price: Option<Price>, quote_budget: Option<Decimal>) -> Result<(), AdmissionError> {
    match kind {
        OrderKind::Limit | OrderKind::StopLimit if price.is_none() => {
            Err(AdmissionError::InvalidOrder("limit/stop-limit orders require a price".into()))
        }
        OrderKind::Market if side == Side::Buy && quote_budget.is_none() => {
            Err(AdmissionError::InvalidOrder("market buy orders require a max_quote budget".into()))
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fees::NoFees;
    use rust_decimal_macros::dec;

    fn engine(market: &str) -> MatchingEngine {
        MatchingEngine::new(market, "ALT", "USDT", Arc::new(Ledger::new()), Arc::new(NoFees))
    }

    fn limit(id: OrderId, account: AccountId, side: Side, price: Decimal, amount: Decimal) -> Order {
        // Mirrors what AccountService seeds at admission: buy orders carry
        // their actual locked quote amount in `quote_budget` from the start.
        let quote_budget = if side == Side::Buy { Some(amount * price) } else { None };
        new_order(id, account, "ALT/USDT", side, OrderKind::Limit, Tif::Gtc, Some(price), None, amount, quote_budget)
    }

    fn fund(engine: &MatchingEngine, account: AccountId, asset: &str, amount: Decimal) {
        engine.ledger.credit(account, asset, amount).unwrap();
        engine.ledger.lock(account, asset, amount).unwrap();
    }

    #[test]
    fn scenario_one_full_cross_at_maker_price() {
        let mut eng = engine("ALT/USDT");
        fund(&eng, 1, "USDT", dec!(1000));
        fund(&eng, 2, "ALT", dec!(10));

        let buy = limit(1, 1, Side::Buy, dec!(100), dec!(10));
        let sell = limit(2, 2, Side::Sell, dec!(100), dec!(10));

        eng.submit_limit(buy).unwrap();
        let events = eng.submit_limit(sell).unwrap();

        let trades: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                EngineEvent::TradeExecuted(t) => Some(t),
                _ => None,
            })
            .collect();
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].price, dec!(100));
        assert_eq!(trades[0].amount, dec!(10));
        assert_eq!(eng.ledger.get_balance(1, "ALT").available, dec!(10));
        assert_eq!(eng.ledger.get_balance(2, "USDT").available, dec!(1000));
    }

    #[test]
    fn scenario_two_price_improvement_trades_at_maker_price() {
        let mut eng = engine("ALT/USDT");
        fund(&eng, 2, "ALT", dec!(5));
        fund(&eng, 1, "USDT", dec!(525));

        let sell = limit(1, 2, Side::Sell, dec!(100), dec!(5));
        eng.submit_limit(sell).unwrap();
        let buy = limit(2, 1, Side::Buy, dec!(105), dec!(5));
        let events = eng.submit_limit(buy).unwrap();

        let trade = events
            .iter()
            .find_map(|e| match e {
                EngineEvent::TradeExecuted(t) => Some(t),
                _ => None,
            })
            .unwrap();
        assert_eq!(trade.price, dec!(100));
    }

    #[test]
    fn scenario_three_fok_rejects_without_side_effects() {
        let mut eng = engine("ALT/USDT");
        fund(&eng, 2, "ALT", dec!(8));
        eng.submit_limit(limit(1, 2, Side::Sell, dec!(100), dec!(5))).unwrap();
        eng.submit_limit(limit(2, 2, Side::Sell, dec!(101), dec!(3))).unwrap();

        fund(&eng, 1, "USDT", dec!(1010));
        let mut fok = limit(3, 1, Side::Buy, dec!(101), dec!(10));
        fok.tif = Tif::Fok;
        let events = eng.submit_fok(fok).unwrap();

        assert!(matches!(
            events.last(),
            Some(EngineEvent::OrderRejected { reason: RejectReason::FokUnfillable, .. })
        ));
        assert_eq!(eng.ledger.get_balance(1, "USDT").locked, dec!(0));
        assert_eq!(eng.ledger.get_balance(1, "USDT").available, dec!(1010));
        assert_eq!(eng.snapshot(10).asks.len(), 2);
    }

    #[test]
    fn scenario_four_stop_activates_on_trigger_price() {
        let mut eng = engine("ALT/USDT");
        fund(&eng, 2, "ALT", dec!(11));
        fund(&eng, 1, "USDT", dec!(10600));

        eng.submit_limit(limit(1, 2, Side::Sell, dec!(100), dec!(10))).unwrap();
        let buy_taker = limit(2, 1, Side::Buy, dec!(100), dec!(10));
        eng.submit_limit(buy_taker).unwrap();
        assert_eq!(eng.last_trade_price, Some(dec!(100)));

        let mut stop = new_order(3, 1, "ALT/USDT", Side::Buy, OrderKind::Stop, Tif::Gtc, None, Some(dec!(105)), dec!(1), Some(dec!(106)));
        stop.status = OrderStatus::Pending;
        eng.submit_stop(stop).unwrap();

        eng.submit_limit(limit(4, 2, Side::Sell, dec!(106), dec!(1))).unwrap();
        let events = eng.submit_limit(limit(5, 1, Side::Buy, dec!(106), dec!(1))).unwrap();

        let trade_prices: Vec<Decimal> = events
            .iter()
            .filter_map(|e| match e {
                EngineEvent::TradeExecuted(t) => Some(t.price),
                _ => None,
            })
            .collect();
        assert!(trade_prices.contains(&dec!(106)));
        assert_eq!(eng.last_trade_price, Some(dec!(106)));
    }

    #[test]
    fn scenario_five_oco_cancels_stop_leg_on_limit_fill() {
        let mut eng = engine("ALT/USDT");
        fund(&eng, 1, "ALT", dec!(5));

        let limit_leg = new_order(1, 1, "ALT/USDT", Side::Sell, OrderKind::Limit, Tif::Gtc, Some(dec!(110)), None, dec!(5), None);
        let stop_leg = new_order(2, 1, "ALT/USDT", Side::Sell, OrderKind::Stop, Tif::Gtc, None, Some(dec!(90)), dec!(5), None);
        eng.submit_oco(limit_leg, stop_leg).unwrap();

        fund(&eng, 2, "USDT", dec!(550));
        let taker = limit(3, 2, Side::Buy, dec!(110), dec!(5));
        let events = eng.submit_limit(taker).unwrap();

        assert!(events.iter().any(|e| matches!(
            e,
            EngineEvent::OrderCanceled { order_id: 2, reason: CancelReason::OcoLinked }
        )));
        assert!(eng.resting_order(2).is_none());
    }

    #[test]
    fn cancel_unmatched_limit_unlocks_exactly() {
        let mut eng = engine("ALT/USDT");
        fund(&eng, 1, "USDT", dec!(500));
        let order = limit(1, 1, Side::Buy, dec!(100), dec!(5));
        eng.submit_limit(order).unwrap();
        assert_eq!(eng.ledger.get_balance(1, "USDT").locked, dec!(500));

        eng.cancel(1).unwrap();
        let balance = eng.ledger.get_balance(1, "USDT");
        assert_eq!(balance.available, dec!(500));
        assert_eq!(balance.locked, dec!(0));
    }

    #[test]
    fn partial_fill_at_improved_price_then_cancel_residue_unlocks_exactly() {
        let mut eng = engine("ALT/USDT");
        fund(&eng, 2, "ALT", dec!(3));
        eng.submit_limit(limit(1, 2, Side::Sell, dec!(95), dec!(3))).unwrap();

        // Buyer locks 10 * 100 = 1000 quote up front.
        eng.ledger.credit(1, "USDT", dec!(1000)).unwrap();
        eng.ledger.lock(1, "USDT", dec!(1000)).unwrap();
        let buy = limit(2, 1, Side::Buy, dec!(100), dec!(10));
        eng.submit_limit(buy).unwrap();

        // 3 ALT filled at the maker's improved price of 95, not the buyer's 100.
        assert_eq!(eng.ledger.get_balance(1, "ALT").available, dec!(3));

        eng.cancel(2).unwrap();
        let balance = eng.ledger.get_balance(1, "USDT");
        assert_eq!(balance.locked, dec!(0));
        assert_eq!(balance.available, dec!(715));
    }

    #[test]
    fn ioc_residue_cancels_unfilled_remainder() {
        let mut eng = engine("ALT/USDT");
        fund(&eng, 2, "ALT", dec!(3));
        eng.submit_limit(limit(1, 2, Side::Sell, dec!(100), dec!(3))).unwrap();

        fund(&eng, 1, "USDT", dec!(1000));
        let mut ioc = limit(2, 1, Side::Buy, dec!(100), dec!(10));
        ioc.tif = Tif::Ioc;
        let events = eng.submit_limit(ioc).unwrap();

        assert!(events.iter().any(|e| matches!(
            e,
            EngineEvent::OrderCanceled { reason: CancelReason::IocResidue, .. }
        )));
        assert_eq!(eng.ledger.get_balance(1, "USDT").locked, dec!(0));
    }
}
