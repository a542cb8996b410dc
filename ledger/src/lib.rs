mod balance;
mod entry;
mod error;
mod ledger;
mod memory_repository;
mod pg_store;
mod repository;

pub use balance::{AccountId, Balance};
pub use entry::{EntryType, LedgerEntry};
pub use error::LedgerError;
pub use ledger::{Ledger, SettleTrade, FEE_ACCOUNT_ID};
pub use memory_repository::{Identifiable, InMemoryRepository, InMemoryUnitOfWork};
pub use pg_store::{PgLedgerStore, PgStoreError};
pub use repository::{Repository, UnitOfWork};
