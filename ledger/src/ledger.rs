use std::collections::HashMap;

use chrono::Utc;
use parking_lot::Mutex;
use rust_decimal::Decimal;

use crate::balance::{AccountId, Balance};
use crate::entry::{EntryType, LedgerEntry};
use crate::error::LedgerError;

/// Account reserved for fee collection, one balance row per asset. Never a
/// real user account; resolves the open question of where trading fees are
/// attributed (spec design notes, open question (a)).
pub const FEE_ACCOUNT_ID: AccountId = 0;

struct State {
    balances: HashMap<(AccountId, String), Balance>,
    entries: Vec<LedgerEntry>,
    next_entry_id: u64,
}

/// Authoritative store of per-(account, asset) balances. The only component
/// permitted to mutate a `Balance`; every mutation is validated before it is
/// applied so a failed call leaves state bit-identical to before the call.
///
/// A single mutex guards the whole balance table, which trivially satisfies
/// "two concurrent postings are serialized" and "no partial effect is
/// visible on failure" (spec §4.1, §5) at the cost of cross-account
/// parallelism; the matching engine's command loop already serializes
/// access per market, so this is not the hot-path bottleneck it would be in
/// a naive row-locking scheme.
pub struct Ledger {
    state: Mutex<State>,
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

pub struct SettleTrade<'a> {
    pub buyer: AccountId,
    pub seller: AccountId,
    pub base_asset: &'a str,
    pub quote_asset: &'a str,
    pub price: Decimal,
    pub qty: Decimal,
    /// Fee deducted from the base asset the buyer receives.
    pub buyer_fee: Decimal,
    /// Fee deducted from the quote asset the seller receives.
    pub seller_fee: Decimal,
    pub maker_order_id: u64,
    pub taker_order_id: u64,
}

impl Ledger {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                balances: HashMap::new(),
                entries: Vec::new(),
                next_entry_id: 1,
            }),
        }
    }

    pub fn get_balance(&self, account_id: AccountId, asset: &str) -> Balance {
        let mut state = self.state.lock();
        *state
            .balances
            .entry((account_id, asset.to_string()))
            .or_insert_with(|| Balance::zero(account_id))
    }

    /// Move `qty` from available to locked. Requires `available >= qty`.
    pub fn lock(&self, account_id: AccountId, asset: &str, qty: Decimal) -> Result<(), LedgerError> {
        non_negative(qty)?;
        let mut state = self.state.lock();
        let balance = state
            .balances
            .entry((account_id, asset.to_string()))
            .or_insert_with(|| Balance::zero(account_id));
        if balance.available < qty {
            return Err(LedgerError::InsufficientBalance {
                account_id,
                asset: asset.to_string(),
                required: qty,
                available: balance.available,
            });
        }
        balance.available -= qty;
        balance.locked += qty;
        let available_after = balance.available;
        append_entry(
            &mut state,
            account_id,
            asset,
            -qty,
            available_after,
            EntryType::Lock,
            None,
            None,
        );
        Ok(())
    }

    /// Move `qty` from locked back to available. Requires `locked >= qty`.
    pub fn unlock(&self, account_id: AccountId, asset: &str, qty: Decimal) -> Result<(), LedgerError> {
        non_negative(qty)?;
        let mut state = self.state.lock();
        let balance = state
            .balances
            .entry((account_id, asset.to_string()))
            .or_insert_with(|| Balance::zero(account_id));
        if balance.locked < qty {
            return Err(LedgerError::InsufficientLocked {
                account_id,
                asset: asset.to_string(),
                required: qty,
                locked: balance.locked,
            });
        }
        balance.locked -= qty;
        balance.available += qty;
        let available_after = balance.available;
        append_entry(
            &mut state,
            account_id,
            asset,
            qty,
            available_after,
            EntryType::Unlock,
            None,
            None,
        );
        Ok(())
    }

    /// Increase available balance (deposits, trade receipts outside of
    /// `settle_trade`, withdrawal reversal).
    pub fn credit(&self, account_id: AccountId, asset: &str, qty: Decimal) -> Result<(), LedgerError> {
        non_negative(qty)?;
        let mut state = self.state.lock();
        let balance = state
            .balances
            .entry((account_id, asset.to_string()))
            .or_insert_with(|| Balance::zero(account_id));
        balance.available += qty;
        let available_after = balance.available;
        append_entry(
            &mut state,
            account_id,
            asset,
            qty,
            available_after,
            EntryType::Deposit,
            None,
            None,
        );
        Ok(())
    }

    /// Decrease locked balance (outflow after a trade or a confirmed
    /// withdrawal). Requires `locked >= qty`.
    pub fn debit_locked(&self, account_id: AccountId, asset: &str, qty: Decimal) -> Result<(), LedgerError> {
        non_negative(qty)?;
        let mut state = self.state.lock();
        let balance = state
            .balances
            .entry((account_id, asset.to_string()))
            .or_insert_with(|| Balance::zero(account_id));
        if balance.locked < qty {
            return Err(LedgerError::InsufficientLocked {
                account_id,
                asset: asset.to_string(),
                required: qty,
                locked: balance.locked,
            });
        }
        balance.locked -= qty;
        let available_after = balance.available;
        append_entry(
            &mut state,
            account_id,
            asset,
            Decimal::ZERO,
            available_after,
            EntryType::Withdrawal,
            None,
            None,
        );
        Ok(())
    }

    /// Atomic compound posting for one trade fill: moves base asset from the
    /// seller's locked balance to the buyer's available balance, and quote
    /// asset from the buyer's locked balance to the seller's available
    /// balance, deducting fees into `FEE_ACCOUNT_ID` along the way. Validates
    /// both legs before mutating anything, so a failure leaves every balance
    /// untouched (spec §4.1 (ii)).
    pub fn settle_trade(&self, params: SettleTrade<'_>) -> Result<(), LedgerError> {
        non_negative(params.qty)?;
        let quote_amount = params.price * params.qty;
        let mut state = self.state.lock();

        let seller_base = *state
            .balances
            .entry((params.seller, params.base_asset.to_string()))
            .or_insert_with(|| Balance::zero(params.seller));
        if seller_base.locked < params.qty {
            return Err(LedgerError::InsufficientLocked {
                account_id: params.seller,
                asset: params.base_asset.to_string(),
                required: params.qty,
                locked: seller_base.locked,
            });
        }

        let buyer_quote = *state
            .balances
            .entry((params.buyer, params.quote_asset.to_string()))
            .or_insert_with(|| Balance::zero(params.buyer));
        if buyer_quote.locked < quote_amount {
            return Err(LedgerError::InsufficientLocked {
                account_id: params.buyer,
                asset: params.quote_asset.to_string(),
                required: quote_amount,
                locked: buyer_quote.locked,
            });
        }

        // Seller: base locked -> (quote received, fee skimmed off the top).
        {
            let balance = state
                .balances
                .get_mut(&(params.seller, params.base_asset.to_string()))
                .expect("checked above");
            balance.locked -= params.qty;
        }
        {
            let balance = state
                .balances
                .entry((params.seller, params.quote_asset.to_string()))
                .or_insert_with(|| Balance::zero(params.seller));
            balance.available += quote_amount - params.seller_fee;
        }

        // Buyer: quote locked -> base received, fee skimmed off the top.
        {
            let balance = state
                .balances
                .get_mut(&(params.buyer, params.quote_asset.to_string()))
                .expect("checked above");
            balance.locked -= quote_amount;
        }
        {
            let balance = state
                .balances
                .entry((params.buyer, params.base_asset.to_string()))
                .or_insert_with(|| Balance::zero(params.buyer));
            balance.available += params.qty - params.buyer_fee;
        }

        // Fee account collects both legs.
        let seller_fee_credited = params.seller_fee > Decimal::ZERO;
        if seller_fee_credited {
            let balance = state
                .balances
                .entry((FEE_ACCOUNT_ID, params.quote_asset.to_string()))
                .or_insert_with(|| Balance::zero(FEE_ACCOUNT_ID));
            balance.available += params.seller_fee;
        }
        let buyer_fee_credited = params.buyer_fee > Decimal::ZERO;
        if buyer_fee_credited {
            let balance = state
                .balances
                .entry((FEE_ACCOUNT_ID, params.base_asset.to_string()))
                .or_insert_with(|| Balance::zero(FEE_ACCOUNT_ID));
            balance.available += params.buyer_fee;
        }

        let seller_quote_after = state.balances[&(params.seller, params.quote_asset.to_string())].available;
        let buyer_base_after = state.balances[&(params.buyer, params.base_asset.to_string())].available;

        append_entry(
            &mut state,
            params.seller,
            params.quote_asset,
            quote_amount - params.seller_fee,
            seller_quote_after,
            EntryType::Trade,
            Some(params.maker_order_id),
            Some("trade settlement: sell leg"),
        );
        append_entry(
            &mut state,
            params.buyer,
            params.base_asset,
            params.qty - params.buyer_fee,
            buyer_base_after,
            EntryType::Trade,
            Some(params.taker_order_id),
            Some("trade settlement: buy leg"),
        );

        if seller_fee_credited {
            let fee_quote_after = state.balances[&(FEE_ACCOUNT_ID, params.quote_asset.to_string())].available;
            append_entry(
                &mut state,
                FEE_ACCOUNT_ID,
                params.quote_asset,
                params.seller_fee,
                fee_quote_after,
                EntryType::Fee,
                Some(params.maker_order_id),
                Some("fee collected: sell leg"),
            );
        }
        if buyer_fee_credited {
            let fee_base_after = state.balances[&(FEE_ACCOUNT_ID, params.base_asset.to_string())].available;
            append_entry(
                &mut state,
                FEE_ACCOUNT_ID,
                params.base_asset,
                params.buyer_fee,
                fee_base_after,
                EntryType::Fee,
                Some(params.taker_order_id),
                Some("fee collected: buy leg"),
            );
        }

        tracing::info!(
            buyer = params.buyer,
            seller = params.seller,
            base = params.base_asset,
            quote = params.quote_asset,
            price = %params.price,
            qty = %params.qty,
            "settled trade"
        );

        Ok(())
    }

    pub fn history(&self, account_id: AccountId, asset: &str, limit: usize) -> Vec<LedgerEntry> {
        let state = self.state.lock();
        state
            .entries
            .iter()
            .rev()
            .filter(|e| e.account_id == account_id && e.asset == asset)
            .take(limit)
            .cloned()
            .collect()
    }

    /// Sum of ledger entries for (account, asset); used to reconcile against
    /// the cached `available` balance (conservation invariant, spec §8).
    pub fn derive_balance(&self, account_id: AccountId, asset: &str) -> Decimal {
        let state = self.state.lock();
        state
            .entries
            .iter()
            .filter(|e| e.account_id == account_id && e.asset == asset)
            .map(|e| e.amount)
            .sum()
    }

    pub fn reconcile(&self, account_id: AccountId, asset: &str) -> bool {
        let derived = self.derive_balance(account_id, asset);
        let cached = self.get_balance(account_id, asset).available;
        derived == cached
    }
}

fn non_negative(qty: Decimal) -> Result<(), LedgerError> {
    if qty <= Decimal::ZERO {
        return Err(LedgerError::NonPositiveAmount(qty));
    }
    Ok(())
}

fn append_entry(
    state: &mut State,
    account_id: AccountId,
    asset: &str,
    amount: Decimal,
    balance_after: Decimal,
    entry_type: EntryType,
    reference_id: Option<u64>,
    description: Option<&str>,
) {
    let id = state.next_entry_id;
    state.next_entry_id += 1;
    state.entries.push(LedgerEntry {
        id,
        account_id,
        asset: asset.to_string(),
        amount,
        balance_after,
        entry_type: entry_type.to_string(),
        reference_id,
        description: description.map(str::to_string),
        created_at: Utc::now(),
    });
}
