pub mod account_service;
pub mod admin_service;
pub mod audit;
pub mod config;
pub mod domain;
pub mod error;
pub mod wallet_service;

pub use account_service::{AccountService, OrderRequest};
pub use admin_service::AdminService;
pub use audit::AuditLog;
pub use config::Config;
pub use error::{AccountServiceError, AdminError};
pub use wallet_service::WalletService;
