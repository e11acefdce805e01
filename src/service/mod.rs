pub mod errors;
pub mod withdrawal_service;

pub use errors::WithdrawalError;
pub use withdrawal_service::{ApprovalOutcome, WithdrawalPolicy, WithdrawalService};
