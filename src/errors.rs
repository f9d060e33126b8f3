use thiserror::Error;

/// Errors surfaced by the pair ledger and the router.
///
/// Every precondition is checked before any state mutation, so each
/// variant identifies exactly which check failed and the whole operation
/// aborts atomically.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AmmError {
    #[error("amount must be non-zero")]
    ZeroAmount,
    #[error("tendered value does not match the declared amount")]
    AmountMismatch,
    #[error("caller is not the bound router")]
    Unauthorized,
    #[error("share amount exceeds available balance or supply")]
    InsufficientShares,
    #[error("initial deposit too small to cover the locked minimum")]
    InsufficientInitialLiquidity,
    #[error("constant-product invariant violated by swap")]
    InvariantViolation,
    #[error("quoted output below caller minimum")]
    SlippageExceeded,
    #[error("arithmetic overflow in pool computation")]
    ArithmeticOverflow,
    #[error("asset ledger: {0}")]
    Ledger(#[from] LedgerError),
}

/// Failures reported by an [`crate::ledger::AssetLedger`] collaborator.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum LedgerError {
    #[error("insufficient balance")]
    InsufficientBalance,
    #[error("insufficient allowance")]
    InsufficientAllowance,
    #[error("balance overflow")]
    BalanceOverflow,
}
