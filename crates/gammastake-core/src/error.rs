use thiserror::Error;

/// Engine-wide error types for Gammastake.
///
/// Every failure is a hard stop: the operation that produced it leaves no
/// partial state behind, and nothing is retried internally.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StakeError {
    /// A component was used before its one-time setup ran.
    #[error("Not initialized: {0}")]
    NotInitialized(String),

    /// One-time setup was attempted twice.
    #[error("Already initialized: {0}")]
    AlreadyInitialized(String),

    /// Permission check failed (non-gov, non-handler, non-self, or a private mode gate).
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Zero or otherwise invalid quantity argument.
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// The token is not accepted as a deposit by this tracker.
    #[error("Invalid deposit token: {0}")]
    InvalidDepositToken(String),

    /// Bonus multiplier outside the accepted range.
    #[error("Invalid multiplier points: {0}")]
    InvalidMultiplier(String),

    /// Operation does not apply to the distributor's emission kind.
    #[error("Invalid emission: {0}")]
    InvalidEmission(String),

    /// Token transfer or burn exceeds the holder's balance.
    #[error("Insufficient balance: {0}")]
    InsufficientBalance(String),

    /// Token transfer exceeds the spender's allowance.
    #[error("Insufficient allowance: {0}")]
    InsufficientAllowance(String),

    /// Unstake requested beyond the account's staked amount.
    #[error("Exceeds staked amount: {0}")]
    ExceedsStakedAmount(String),

    /// Unstake requested beyond the account's deposit balance for the token.
    #[error("Exceeds deposit balance: {0}")]
    ExceedsDepositBalance(String),

    /// Vesting deposit would exceed the account's ceiling.
    #[error("Max vestable amount exceeded: {0}")]
    MaxVestableExceeded(String),

    /// Checked arithmetic failed. Never clamped.
    #[error("Arithmetic overflow: {0}")]
    ArithmeticOverflow(String),

    /// Withdrawal would strand funds already owed to stakers or vesters.
    #[error("Insufficient funds: {0}")]
    InsufficientFunds(String),

    /// Router lookup miss for a tracker.
    #[error("Tracker not found: {0}")]
    TrackerNotFound(String),

    /// Router lookup miss for a vester.
    #[error("Vester not found: {0}")]
    VesterNotFound(String),

    /// Ledger lookup miss for a token.
    #[error("Token not found: {0}")]
    TokenNotFound(String),

    /// Invalid component or protocol configuration.
    #[error("Config error: {0}")]
    Config(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for StakeError {
    fn from(e: serde_json::Error) -> Self {
        StakeError::Serialization(e.to_string())
    }
}

/// Result alias used across the workspace.
pub type Result<T> = std::result::Result<T, StakeError>;
