use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use ledger::{Ledger, Repository};
use matching_engine::error::AdmissionError;
use matching_engine::events::EngineEvent;
use matching_engine::fees::BasisPointsFeeSchedule;
use matching_engine::types::{OrderId, OrderKind, Side, Tif};
use matching_engine::{admission_missing_price, new_order, MatchingEngine};
use parking_lot::Mutex;
use rust_decimal::Decimal;

use crate::audit::AuditLog;
use crate::config::{Config, MarketConfig};
use crate::domain::{Account, AccountId, AuditLogEntry};
use crate::error::AccountServiceError;

/// A caller's intent to place one order, before it becomes a matching-engine
/// `Order` (§4.4). `quote_budget` is required for market buys and ignored
/// otherwise.
pub struct OrderRequest {
    pub account_id: AccountId,
    pub market: String,
    pub side: Side,
    pub kind: OrderKind,
    pub tif: Tif,
    pub price: Option<Decimal>,
    pub stop_price: Option<Decimal>,
    pub amount: Decimal,
    pub quote_budget: Option<Decimal>,
}

/// Pre-admission validation and balance-locking layer (§4.4); the only
/// caller of `MatchingEngine` for order submission and the owner of order
/// id assignment. Holds one `MatchingEngine` per configured market behind
/// its own mutex, matching the single-writer-per-market model of §5.
pub struct AccountService<R, RL> {
    ledger: Arc<Ledger>,
    config: Config,
    engines: HashMap<String, Mutex<MatchingEngine>>,
    accounts: R,
    audit: AuditLog<RL>,
    next_order_id: AtomicU64,
}

impl<R, RL> AccountService<R, RL>
where
    R: Repository<Account, u64>,
    RL: Repository<AuditLogEntry, u64>,
{
    pub fn new(ledger: Arc<Ledger>, config: Config, accounts: R, audit: AuditLog<RL>) -> Self {
        let engines = config
            .markets
            .iter()
            .map(|(symbol, market)| {
                let fees = Arc::new(BasisPointsFeeSchedule::new(Decimal::from(market.maker_fee_bps), Decimal::from(market.taker_fee_bps)));
                let engine = MatchingEngine::new(symbol, &market.base_asset, &market.quote_asset, ledger.clone(), fees);
                (symbol.clone(), Mutex::new(engine))
            })
            .collect();

        Self { ledger, config, engines, accounts, audit, next_order_id: AtomicU64::new(1) }
    }

    /// Forwards any `SystemAlert` the engine raised to the audit trail, so
    /// `system.alert` events are traceable the same way admin actions are
    /// (the engine itself only logs them via `tracing`).
    async fn record_alerts(&self, events: &[EngineEvent]) {
        for event in events {
            if let EngineEvent::SystemAlert { fault } = event {
                self.audit.record("matching_engine", "system.alert", &fault.to_string(), fault.to_string()).await.ok();
            }
        }
    }

    pub fn ledger(&self) -> &Arc<Ledger> {
        &self.ledger
    }

    pub fn snapshot(&self, market: &str, depth: usize) -> Option<matching_engine::BookSnapshot> {
        self.engines.get(market).map(|e| e.lock().snapshot(depth))
    }

    async fn require_active_account(&self, account_id: AccountId) -> Result<(), AccountServiceError> {
        match self.accounts.get(account_id).await {
            Ok(Some(account)) if account.is_active() => Ok(()),
            Ok(Some(_)) => Err(AdmissionError::AccountNotActive.into()),
            Ok(None) => Err(AdmissionError::AccountNotFound(account_id).into()),
            // The in-memory repository's error type is `Infallible`; a real
            // backend's persistence error would surface here instead.
            Err(_) => Err(AdmissionError::AccountNotFound(account_id).into()),
        }
    }

    /// Amount & price bounds and tick-grid checks (§4.4, §6 config table).
    fn check_bounds(&self, market: &MarketConfig, req: &OrderRequest) -> Result<(), AdmissionError> {
        if req.amount <= Decimal::ZERO {
            return Err(AdmissionError::InvalidOrder("amount must be positive".into()));
        }
        if let Some(price) = req.price {
            if price <= Decimal::ZERO {
                return Err(AdmissionError::InvalidOrder("price must be positive".into()));
            }
        }
        if req.amount < market.min_order_size || req.amount > market.max_order_size {
            return Err(AdmissionError::SizeBounds);
        }
        if !is_on_tick(req.amount, market.size_tick) {
            return Err(AdmissionError::TickViolation);
        }
        if let Some(price) = req.price {
            if !is_on_tick(price, market.price_tick) {
                return Err(AdmissionError::TickViolation);
            }
        }
        Ok(())
    }

    /// Computes the (asset, quantity) that must be locked for `req` before
    /// admission (§4.4: "the caller must supply a `max_quote` budget" for
    /// market buys; sells lock the full base amount). The returned quote
    /// quantity for buy orders becomes the order's initial `quote_budget`,
    /// which `MatchingEngine::locked_remainder` tracks as fills consume it.
    fn required_lock<'a>(&self, market: &'a MarketConfig, req: &OrderRequest) -> Result<(&'a str, Decimal), AdmissionError> {
        match req.side {
            Side::Sell => Ok((&market.base_asset, req.amount)),
            Side::Buy => match req.kind {
                OrderKind::Limit | OrderKind::StopLimit => {
                    let price = req.price.ok_or_else(|| AdmissionError::InvalidOrder("buy limit/stop-limit requires a price".into()))?;
                    Ok((&market.quote_asset, req.amount * price))
                }
                OrderKind::Market | OrderKind::Stop => {
                    let budget = req.quote_budget.ok_or_else(|| AdmissionError::InvalidOrder("market/stop buy requires a max_quote budget".into()))?;
                    Ok((&market.quote_asset, budget))
                }
            },
        }
    }

    fn next_order_id(&self) -> OrderId {
        self.next_order_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Validates, locks collateral, and submits one order (§4.4 step by
    /// step). Returns the assigned order id and the events the engine
    /// produced.
    pub async fn submit_order(&self, req: OrderRequest) -> Result<(OrderId, Vec<EngineEvent>), AccountServiceError> {
        self.require_active_account(req.account_id).await?;

        let market_cfg = self.config.market(&req.market).ok_or(AdmissionError::MarketUnknown)?.clone();
        self.check_bounds(&market_cfg, &req)?;
        admission_missing_price(req.kind, req.side, req.price, req.quote_budget)?;

        let (asset, qty) = self.required_lock(&market_cfg, &req)?;
        self.ledger.lock(req.account_id, asset, qty)?;

        let id = self.next_order_id();
        // The engine tracks remaining locked quote in `quote_budget` for
        // every buy order kind, not just market/stop, so it must be seeded
        // with whatever was actually locked above.
        let initial_quote_budget = match req.side {
            Side::Buy => Some(qty),
            Side::Sell => None,
        };
        let order = new_order(id, req.account_id, req.market.clone(), req.side, req.kind, req.tif, req.price, req.stop_price, req.amount, initial_quote_budget);

        let engine = self.engines.get(&req.market).ok_or(AdmissionError::MarketUnknown)?;
        let events = {
            let mut engine = engine.lock();
            match (req.kind, req.tif) {
                (OrderKind::Limit, Tif::Fok) => engine.submit_fok(order)?,
                (OrderKind::Limit, _) => engine.submit_limit(order)?,
                (OrderKind::Market, _) => engine.submit_market(order)?,
                (OrderKind::Stop, _) | (OrderKind::StopLimit, _) => engine.submit_stop(order)?,
            }
        };
        self.record_alerts(&events).await;
        Ok((id, events))
    }

    /// Submits an OCO pair: a limit leg and a stop leg sharing one locked
    /// reservation, since only one leg can ever execute (§4.3 OCO).
    pub async fn submit_oco(&self, account_id: AccountId, market: String, side: Side, limit_price: Decimal, stop_price: Decimal, amount: Decimal) -> Result<(OrderId, OrderId, Vec<EngineEvent>), AccountServiceError> {
        self.require_active_account(account_id).await?;
        let market_cfg = self.config.market(&market).ok_or(AdmissionError::MarketUnknown)?;

        let (asset, qty) = match side {
            Side::Sell => (market_cfg.base_asset.clone(), amount),
            Side::Buy => (market_cfg.quote_asset.clone(), amount * limit_price.max(stop_price)),
        };
        self.ledger.lock(account_id, &asset, qty)?;

        // Both legs share the single lock taken above; seeding each leg's
        // `quote_budget` with the same value lets whichever leg actually
        // fills track its own remaining locked quote independently.
        let leg_quote_budget = match side {
            Side::Buy => Some(qty),
            Side::Sell => None,
        };
        let limit_id = self.next_order_id();
        let stop_id = self.next_order_id();
        let limit_leg = new_order(limit_id, account_id, market.clone(), side, OrderKind::Limit, Tif::Gtc, Some(limit_price), None, amount, leg_quote_budget);
        let stop_leg = new_order(stop_id, account_id, market.clone(), side, OrderKind::Stop, Tif::Gtc, None, Some(stop_price), amount, leg_quote_budget);

        let engine = self.engines.get(&market).ok_or(AdmissionError::MarketUnknown)?;
        let events = engine.lock().submit_oco(limit_leg, stop_leg)?;
        self.record_alerts(&events).await;
        Ok((limit_id, stop_id, events))
    }

    /// Forwards to `MatchingEngine::cancel`, which unlocks any remaining
    /// reservation itself (the engine holds the ledger directly per the
    /// tightly-coupled architecture, rather than AccountService unlocking
    /// after the fact).
    pub async fn cancel_order(&self, market: &str, order_id: OrderId) -> Result<Vec<EngineEvent>, AccountServiceError> {
        let engine = self.engines.get(market).ok_or(AdmissionError::MarketUnknown)?;
        let events = engine.lock().cancel(order_id)?;
        self.record_alerts(&events).await;
        Ok(events)
    }
}

fn is_on_tick(value: Decimal, tick: Decimal) -> bool {
    if tick <= Decimal::ZERO {
        return true;
    }
    (value / tick).fract().is_zero()
}
