use std::process::ExitCode;
use std::sync::Arc;

use accounts::account_service::OrderRequest;
use accounts::admin_service::AdminService;
use accounts::audit::AuditLog;
use accounts::config::Config;
use accounts::domain::{Account, AccountStatus, AdminIdentity, AdminRole, AuditLogEntry, Transaction, WithdrawalRequest, WithdrawalState};
use accounts::wallet_service::WalletService;
use accounts::{AccountService, AccountServiceError};
use ledger::{InMemoryRepository, Ledger, Repository};
use matching_engine::events::EngineEvent;
use matching_engine::types::{OrderKind, Side, Tif};
use rust_decimal_macros::dec;
use tracing_subscriber::EnvFilter;

/// Everything a process needs to run the exchange, built once at startup
/// (§9 design notes: "an explicit application context value holding the
/// Ledger, Engine(s), Wallet and Admin services").
struct AppContext {
    ledger: Arc<Ledger>,
    accounts: AccountService<InMemoryRepository<Account>, InMemoryRepository<AuditLogEntry>>,
    wallet: WalletService<InMemoryRepository<Transaction>>,
    admin: AdminService<InMemoryRepository<WithdrawalRequest>, InMemoryRepository<Account>, InMemoryRepository<AuditLogEntry>>,
}

impl AppContext {
    async fn new(config: Config) -> Self {
        let ledger = Arc::new(Ledger::new());

        let account_repo = InMemoryRepository::<Account>::new();
        account_repo.insert(&Account { id: 1, user_id: 1, status: AccountStatus::Active, kyc_level: 2 }).await.unwrap();
        account_repo.insert(&Account { id: 2, user_id: 2, status: AccountStatus::Active, kyc_level: 2 }).await.unwrap();

        let accounts_audit = AuditLog::new(InMemoryRepository::<AuditLogEntry>::new());
        let accounts = AccountService::new(ledger.clone(), config.clone(), account_repo, accounts_audit);
        let wallet = WalletService::new(ledger.clone(), config.clone(), InMemoryRepository::<Transaction>::new());

        let admin_account_repo = InMemoryRepository::<Account>::new();
        admin_account_repo.insert(&Account { id: 1, user_id: 1, status: AccountStatus::Active, kyc_level: 2 }).await.unwrap();
        let audit = AuditLog::new(InMemoryRepository::<AuditLogEntry>::new());
        let admin = AdminService::new(ledger.clone(), config, InMemoryRepository::<WithdrawalRequest>::new(), admin_account_repo, audit);

        Self { ledger, accounts, wallet, admin }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("configuration error: {e}");
            return ExitCode::from(1);
        }
    };

    tracing::info!("trading core starting up");

    if Config::load().map(|c| c.market("ALT/USDT").is_none()).unwrap_or(true) {
        tracing::error!("persistence unavailable: ALT/USDT market not configured");
        return ExitCode::from(2);
    }

    if let Err(e) = run_scenarios(config).await {
        tracing::error!("scenario run failed: {e}");
        return ExitCode::from(3);
    }

    tracing::info!("all scenarios completed");
    ExitCode::SUCCESS
}

/// Runs the end-to-end scenarios of spec §8, each against its own fresh
/// `AppContext` (§9: the application context is created once per logical
/// session and torn down at its end) so that one scenario's resting orders
/// and balances never leak into the next.
/// `AppContext`, printing the key assertions each scenario is meant to
/// demonstrate. This is a smoke demo, not a test harness: failures abort
/// with an error rather than asserting.
async fn run_scenarios(config: Config) -> Result<(), AccountServiceError> {
    scenario_deposit(&AppContext::new(config.clone()).await).await?;
    scenario_full_cross(&AppContext::new(config.clone()).await).await?;
    scenario_price_improvement(&AppContext::new(config.clone()).await).await?;
    scenario_fok_rejects(&AppContext::new(config.clone()).await).await?;
    scenario_stop_activation(&AppContext::new(config.clone()).await).await?;
    scenario_oco_cancel(&AppContext::new(config.clone()).await).await?;
    scenario_two_eyes_withdrawal(&AppContext::new(config).await).await;
    Ok(())
}

async fn scenario_deposit(ctx: &AppContext) -> Result<(), AccountServiceError> {
    tracing::info!("scenario 0: deposit confirms once the threshold is reached");
    ctx.wallet.observe_deposit(1, 1, "USDT", dec!(1000), "0xseed", 3).await?;
    let tx = ctx.wallet.observe_deposit(1, 1, "USDT", dec!(1000), "0xseed", 12).await?;
    tracing::info!(status = ?tx.status, available = %ctx.ledger.get_balance(1, "USDT").available, "scenario 0 done (expected status=Confirmed)");
    Ok(())
}

async fn scenario_full_cross(ctx: &AppContext) -> Result<(), AccountServiceError> {
    tracing::info!("scenario 1: full cross at maker price");
    ctx.ledger.credit(1, "USDT", dec!(1000)).unwrap();
    ctx.ledger.credit(2, "ALT", dec!(10)).unwrap();

    ctx.accounts
        .submit_order(OrderRequest {
            account_id: 1,
            market: "ALT/USDT".into(),
            side: Side::Buy,
            kind: OrderKind::Limit,
            tif: Tif::Gtc,
            price: Some(dec!(100)),
            stop_price: None,
            amount: dec!(10),
            quote_budget: None,
        })
        .await?;
    let (_, events) = ctx
        .accounts
        .submit_order(OrderRequest {
            account_id: 2,
            market: "ALT/USDT".into(),
            side: Side::Sell,
            kind: OrderKind::Limit,
            tif: Tif::Gtc,
            price: Some(dec!(100)),
            stop_price: None,
            amount: dec!(10),
            quote_budget: None,
        })
        .await?;

    let trades = events.iter().filter(|e| matches!(e, EngineEvent::TradeExecuted(_))).count();
    tracing::info!(trades, alt_balance = %ctx.ledger.get_balance(1, "ALT").available, usdt_balance = %ctx.ledger.get_balance(2, "USDT").available, "scenario 1 done");
    Ok(())
}

async fn scenario_price_improvement(ctx: &AppContext) -> Result<(), AccountServiceError> {
    tracing::info!("scenario 2: price improvement trades at maker price, residue cancel unlocks exactly");
    ctx.ledger.credit(2, "ALT", dec!(5)).unwrap();
    ctx.ledger.credit(1, "USDT", dec!(1050)).unwrap();

    ctx.accounts
        .submit_order(OrderRequest {
            account_id: 2,
            market: "ALT/USDT".into(),
            side: Side::Sell,
            kind: OrderKind::Limit,
            tif: Tif::Gtc,
            price: Some(dec!(100)),
            stop_price: None,
            amount: dec!(5),
            quote_budget: None,
        })
        .await?;
    // Buyer's limit is 105, but the book only offers 5 at 100; the rest
    // (5 of 10) rests unfilled after trading at the maker's better price.
    let (buy_id, events) = ctx
        .accounts
        .submit_order(OrderRequest {
            account_id: 1,
            market: "ALT/USDT".into(),
            side: Side::Buy,
            kind: OrderKind::Limit,
            tif: Tif::Gtc,
            price: Some(dec!(105)),
            stop_price: None,
            amount: dec!(10),
            quote_budget: None,
        })
        .await?;

    let trade_price = events.iter().find_map(|e| match e {
        EngineEvent::TradeExecuted(t) => Some(t.price),
        _ => None,
    });

    ctx.accounts.cancel_order("ALT/USDT", buy_id).await?;
    let locked = ctx.ledger.get_balance(1, "USDT").locked;
    tracing::info!(?trade_price, %locked, "scenario 2 done (expected trade_price=Some(100), locked=0)");
    debug_assert_eq!(locked, dec!(0));
    Ok(())
}

async fn scenario_fok_rejects(ctx: &AppContext) -> Result<(), AccountServiceError> {
    tracing::info!("scenario 3: FOK rejects without side effects");
    ctx.ledger.credit(2, "ALT", dec!(8)).unwrap();
    ctx.accounts
        .submit_order(OrderRequest {
            account_id: 2,
            market: "ALT/USDT".into(),
            side: Side::Sell,
            kind: OrderKind::Limit,
            tif: Tif::Gtc,
            price: Some(dec!(100)),
            stop_price: None,
            amount: dec!(5),
            quote_budget: None,
        })
        .await?;
    ctx.accounts
        .submit_order(OrderRequest {
            account_id: 2,
            market: "ALT/USDT".into(),
            side: Side::Sell,
            kind: OrderKind::Limit,
            tif: Tif::Gtc,
            price: Some(dec!(101)),
            stop_price: None,
            amount: dec!(3),
            quote_budget: None,
        })
        .await?;

    ctx.ledger.credit(1, "USDT", dec!(1010)).unwrap();
    let (_, events) = ctx
        .accounts
        .submit_order(OrderRequest {
            account_id: 1,
            market: "ALT/USDT".into(),
            side: Side::Buy,
            kind: OrderKind::Limit,
            tif: Tif::Fok,
            price: Some(dec!(101)),
            stop_price: None,
            amount: dec!(10),
            quote_budget: None,
        })
        .await?;

    let rejected = events.iter().any(|e| matches!(e, EngineEvent::OrderRejected { .. }));
    tracing::info!(rejected, "scenario 3 done (expected rejected=true)");
    Ok(())
}

async fn scenario_stop_activation(ctx: &AppContext) -> Result<(), AccountServiceError> {
    tracing::info!("scenario 4: stop order activates on trigger price");
    ctx.ledger.credit(2, "ALT", dec!(11)).unwrap();
    ctx.ledger.credit(1, "USDT", dec!(10700)).unwrap();

    ctx.accounts
        .submit_order(OrderRequest {
            account_id: 2,
            market: "ALT/USDT".into(),
            side: Side::Sell,
            kind: OrderKind::Limit,
            tif: Tif::Gtc,
            price: Some(dec!(100)),
            stop_price: None,
            amount: dec!(10),
            quote_budget: None,
        })
        .await?;
    ctx.accounts
        .submit_order(OrderRequest {
            account_id: 1,
            market: "ALT/USDT".into(),
            side: Side::Buy,
            kind: OrderKind::Limit,
            tif: Tif::Gtc,
            price: Some(dec!(100)),
            stop_price: None,
            amount: dec!(10),
            quote_budget: None,
        })
        .await?;

    ctx.accounts
        .submit_order(OrderRequest {
            account_id: 1,
            market: "ALT/USDT".into(),
            side: Side::Buy,
            kind: OrderKind::Stop,
            tif: Tif::Gtc,
            price: None,
            stop_price: Some(dec!(105)),
            amount: dec!(1),
            quote_budget: Some(dec!(110)),
        })
        .await?;

    ctx.accounts
        .submit_order(OrderRequest {
            account_id: 2,
            market: "ALT/USDT".into(),
            side: Side::Sell,
            kind: OrderKind::Limit,
            tif: Tif::Gtc,
            price: Some(dec!(106)),
            stop_price: None,
            amount: dec!(1),
            quote_budget: None,
        })
        .await?;
    let (_, events) = ctx
        .accounts
        .submit_order(OrderRequest {
            account_id: 1,
            market: "ALT/USDT".into(),
            side: Side::Buy,
            kind: OrderKind::Limit,
            tif: Tif::Gtc,
            price: Some(dec!(106)),
            stop_price: None,
            amount: dec!(1),
            quote_budget: None,
        })
        .await?;

    let triggered = events.iter().filter(|e| matches!(e, EngineEvent::TradeExecuted(t) if t.price == dec!(106))).count();
    tracing::info!(triggered, "scenario 4 done (expected >=1 trade at 106)");
    Ok(())
}

async fn scenario_oco_cancel(ctx: &AppContext) -> Result<(), AccountServiceError> {
    tracing::info!("scenario 5: OCO cancels stop leg on limit fill");
    ctx.ledger.credit(1, "ALT", dec!(5)).unwrap();
    let (_, _, events) = ctx.accounts.submit_oco(1, "ALT/USDT".into(), Side::Sell, dec!(110), dec!(90), dec!(5)).await?;
    tracing::info!(events = events.len(), "OCO admitted");

    ctx.ledger.credit(2, "USDT", dec!(550)).unwrap();
    let (_, events) = ctx
        .accounts
        .submit_order(OrderRequest {
            account_id: 2,
            market: "ALT/USDT".into(),
            side: Side::Buy,
            kind: OrderKind::Limit,
            tif: Tif::Gtc,
            price: Some(dec!(110)),
            stop_price: None,
            amount: dec!(5),
            quote_budget: None,
        })
        .await?;

    let stop_leg_canceled = events.iter().any(|e| matches!(e, EngineEvent::OrderCanceled { .. }));
    tracing::info!(stop_leg_canceled, "scenario 5 done (expected stop_leg_canceled=true)");
    Ok(())
}

async fn scenario_two_eyes_withdrawal(ctx: &AppContext) {
    tracing::info!("scenario 6: two-eyes withdrawal approval");
    ctx.ledger.credit(1, "USDT", dec!(1000)).unwrap();

    let admin_a = AdminIdentity { id: 100, role: AdminRole::Approver };
    let admin_b = AdminIdentity { id: 200, role: AdminRole::Approver };

    let request = ctx.admin.request_withdrawal(1, "USDT", dec!(100)).await.unwrap();
    let request = ctx.admin.approve_withdrawal(request.id, admin_a).await.unwrap();

    let same_admin_result = ctx.admin.approve_withdrawal(request.id, admin_a).await;
    tracing::info!(rejected = same_admin_result.is_err(), "second approval by same admin (expected rejected=true)");

    let request = ctx.admin.approve_withdrawal(request.id, admin_b).await.unwrap();
    debug_assert_eq!(request.state, WithdrawalState::Approved);

    let request = ctx.admin.confirm_broadcast(request.id).await.unwrap();
    tracing::info!(state = ?request.state, locked = %ctx.ledger.get_balance(1, "USDT").locked, "scenario 6 done (expected state=Confirmed, locked=0)");
    debug_assert_eq!(request.state, WithdrawalState::Confirmed);
}
