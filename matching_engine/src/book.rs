use std::collections::{BTreeMap, HashMap, VecDeque};

use rust_decimal::Decimal;

use crate::types::{BookSnapshot, Order, OrderId, OrderStatus, Price, Quantity, Side};

struct PriceLevel {
    order_ids: VecDeque<OrderId>,
    total_quantity: Quantity,
}

impl PriceLevel {
    fn new() -> Self {
        Self {
            order_ids: VecDeque::new(),
            total_quantity: Decimal::ZERO,
        }
    }

    fn is_empty(&self) -> bool {
        self.order_ids.is_empty()
    }
}

/// Per-market resting-order book. Only ever holds orders in `Open`/`Partial`
/// status: market/IOC/FOK orders never rest, and stop/stop-limit orders sit
/// in the engine's trigger table until activated. Bids are keyed descending,
/// asks ascending, each a FIFO queue within a price level (§4.2).
///
/// Orders are stored once, in `orders`; price levels hold only the id in
/// arrival order, so a partial fill never risks the level's copy drifting
/// out of sync with the index's copy.
pub struct OrderBook {
    bids: BTreeMap<Price, PriceLevel>,
    asks: BTreeMap<Price, PriceLevel>,
    orders: HashMap<OrderId, Order>,
    next_order_id: OrderId,
}

impl Default for OrderBook {
    fn default() -> Self {
        Self::new()
    }
}

impl OrderBook {
    pub fn new() -> Self {
        Self {
            bids: BTreeMap::new(),
            asks: BTreeMap::new(),
            orders: HashMap::new(),
            next_order_id: 1,
        }
    }

    pub fn next_order_id(&mut self) -> OrderId {
        let id = self.next_order_id;
        self.next_order_id += 1;
        id
    }

    pub fn get(&self, order_id: OrderId) -> Option<&Order> {
        self.orders.get(&order_id)
    }

    pub fn best_bid(&self) -> Option<Price> {
        self.bids.keys().next_back().copied()
    }

    pub fn best_ask(&self) -> Option<Price> {
        self.asks.keys().next().copied()
    }

    pub fn spread(&self) -> Option<Price> {
        match (self.best_ask(), self.best_bid()) {
            (Some(ask), Some(bid)) if ask > bid => Some(ask - bid),
            _ => None,
        }
    }

    pub fn quantity_at_price(&self, side: Side, price: Price) -> Quantity {
        self.side_book(side).get(&price).map_or(Decimal::ZERO, |level| level.total_quantity)
    }

    fn side_book(&self, side: Side) -> &BTreeMap<Price, PriceLevel> {
        match side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        }
    }

    fn side_book_mut(&mut self, side: Side) -> &mut BTreeMap<Price, PriceLevel> {
        match side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        }
    }

    /// Inserts a resting order. Caller must have already matched it against
    /// the book (or determined it needs no matching); `order.price` must be
    /// `Some`.
    pub fn insert(&mut self, order: Order) {
        let price = order.price.expect("resting order must carry a price");
        let side = order.side;
        let id = order.id;
        let remaining = order.remaining();

        self.orders.insert(id, order);
        let level = self.side_book_mut(side).entry(price).or_insert_with(PriceLevel::new);
        level.order_ids.push_back(id);
        level.total_quantity += remaining;
    }

    /// Removes a resting order from its level and the index, returning it.
    pub fn remove(&mut self, order_id: OrderId) -> Option<Order> {
        let order = self.orders.remove(&order_id)?;
        let price = order.price.expect("resting order must carry a price");
        let side = order.side;
        let book = self.side_book_mut(side);
        if let Some(level) = book.get_mut(&price) {
            level.order_ids.retain(|id| *id != order_id);
            level.total_quantity -= order.remaining();
            if level.is_empty() {
                book.remove(&price);
            }
        }
        Some(order)
    }

    /// Earliest resting order on the side opposite `taker_side` that can
    /// still cross at `limit_price` (`None` = marketable at any price), in
    /// price-time priority. Returns `None` when the book is exhausted or the
    /// best opposite price is no longer crossable.
    pub fn peek_crossable(&self, taker_side: Side, limit_price: Option<Price>) -> Option<OrderId> {
        let opposite = self.side_book(taker_side.opposite());
        let (&price, level) = match taker_side {
            // Buy taker crosses into asks ascending; sell taker crosses into bids descending.
            Side::Buy => opposite.iter().next()?,
            Side::Sell => opposite.iter().next_back()?,
        };
        if let Some(limit) = limit_price {
            let crossable = match taker_side {
                Side::Buy => price <= limit,
                Side::Sell => price >= limit,
            };
            if !crossable {
                return None;
            }
        }
        level.order_ids.front().copied()
    }

    /// Sum of resting quantity on the opposite side that is crossable at
    /// `limit_price`, used for FOK pre-scans. Does not mutate the book.
    pub fn crossable_liquidity(&self, taker_side: Side, limit_price: Option<Price>) -> Quantity {
        let opposite = self.side_book(taker_side.opposite());
        let mut total = Decimal::ZERO;
        let prices: Vec<Price> = match taker_side {
            Side::Buy => opposite.keys().copied().collect(),
            Side::Sell => opposite.keys().copied().rev().collect(),
        };
        for price in prices {
            if let Some(limit) = limit_price {
                let crossable = match taker_side {
                    Side::Buy => price <= limit,
                    Side::Sell => price >= limit,
                };
                if !crossable {
                    break;
                }
            }
            total += opposite[&price].total_quantity;
        }
        total
    }

    /// Applies a fill of `qty` against a resting maker order, updating both
    /// its entry in the index and its price level's aggregate quantity, and
    /// advancing its status to `Filled`/`Partial`. If the maker is now fully
    /// filled it is removed from the book (and returned); otherwise it keeps
    /// its place at the front of its level's queue, since partial fills
    /// never lose time priority.
    pub fn apply_fill(&mut self, order_id: OrderId, qty: Quantity) -> Option<Order> {
        let price = self.orders.get(&order_id)?.price?;
        let side = self.orders.get(&order_id)?.side;

        let order = self.orders.get_mut(&order_id)?;
        order.filled += qty;
        let filled_now = order.is_filled();
        order.status = if filled_now { OrderStatus::Filled } else { OrderStatus::Partial };

        let book = self.side_book_mut(side);
        if let Some(level) = book.get_mut(&price) {
            level.total_quantity -= qty;
            if filled_now {
                level.order_ids.retain(|id| *id != order_id);
                if level.is_empty() {
                    book.remove(&price);
                }
            }
        }

        if filled_now {
            self.orders.remove(&order_id)
        } else {
            None
        }
    }

    pub fn snapshot(&self, market: &str, depth: usize) -> BookSnapshot {
        let bids = self
            .bids
            .iter()
            .rev()
            .take(depth)
            .map(|(price, level)| (*price, level.total_quantity))
            .collect();
        let asks = self
            .asks
            .iter()
            .take(depth)
            .map(|(price, level)| (*price, level.total_quantity))
            .collect();
        BookSnapshot {
            market: market.to_string(),
            bids,
            asks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{LinkGroup, OrderKind, OrderStatus, Tif};
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn resting(id: OrderId, side: Side, price: Decimal, amount: Decimal) -> Order {
        Order {
            id,
            account_id: 1,
            market: "ALT/USDT".to_string(),
            side,
            kind: OrderKind::Limit,
            tif: Tif::Gtc,
            price: Some(price),
            stop_price: None,
            amount,
            filled: Decimal::ZERO,
            status: OrderStatus::Open,
            link: LinkGroup::None,
            quote_budget: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn insert_sets_best_bid_and_ask() {
        let mut book = OrderBook::new();
        book.insert(resting(1, Side::Buy, dec!(100), dec!(10)));
        book.insert(resting(2, Side::Sell, dec!(105), dec!(5)));
        assert_eq!(book.best_bid(), Some(dec!(100)));
        assert_eq!(book.best_ask(), Some(dec!(105)));
        assert_eq!(book.spread(), Some(dec!(5)));
    }

    #[test]
    fn fifo_within_price_level() {
        let mut book = OrderBook::new();
        book.insert(resting(1, Side::Sell, dec!(100), dec!(5)));
        book.insert(resting(2, Side::Sell, dec!(100), dec!(5)));
        assert_eq!(book.peek_crossable(Side::Buy, None), Some(1));
    }

    #[test]
    fn apply_fill_removes_order_when_exhausted() {
        let mut book = OrderBook::new();
        book.insert(resting(1, Side::Sell, dec!(100), dec!(5)));
        let removed = book.apply_fill(1, dec!(5));
        assert!(removed.is_some());
        assert_eq!(book.best_ask(), None);
    }

    #[test]
    fn apply_fill_partial_keeps_priority() {
        let mut book = OrderBook::new();
        book.insert(resting(1, Side::Sell, dec!(100), dec!(5)));
        book.insert(resting(2, Side::Sell, dec!(100), dec!(5)));
        assert!(book.apply_fill(1, dec!(2)).is_none());
        assert_eq!(book.peek_crossable(Side::Buy, None), Some(1));
        assert_eq!(book.quantity_at_price(Side::Sell, dec!(100)), dec!(8));
    }

    #[test]
    fn remove_clears_empty_level() {
        let mut book = OrderBook::new();
        book.insert(resting(1, Side::Buy, dec!(100), dec!(10)));
        let removed = book.remove(1).unwrap();
        assert_eq!(removed.id, 1);
        assert_eq!(book.best_bid(), None);
    }

    #[test]
    fn crossable_liquidity_stops_at_uncrossable_price() {
        let mut book = OrderBook::new();
        book.insert(resting(1, Side::Sell, dec!(100), dec!(5)));
        book.insert(resting(2, Side::Sell, dec!(101), dec!(3)));
        assert_eq!(book.crossable_liquidity(Side::Buy, Some(dec!(100))), dec!(5));
        assert_eq!(book.crossable_liquidity(Side::Buy, Some(dec!(101))), dec!(8));
        assert_eq!(book.crossable_liquidity(Side::Buy, None), dec!(8));
    }
}
