use thiserror::Error;

/// Why a typed amount is not a `uint256`.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum AmountError {
    #[error("empty input")]
    Empty,

    #[error("invalid digit {0:?}; expected a non-negative integer")]
    InvalidDigit(char),

    #[error("value does not fit in 256 bits")]
    Overflow,
}

/// Failure reported by the wallet provider capability.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ProviderError {
    #[error("user rejected the wallet request")]
    UserRejected,

    #[error("wallet rpc error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("wallet transport failure: {0}")]
    Transport(String),
}

/// Failure of a single call against the on-chain contract.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CallError {
    #[error("user rejected the signing request")]
    UserRejected,

    #[error("transaction {hash} reverted")]
    Reverted { hash: String },

    #[error("call reverted: {0}")]
    ExecutionReverted(String),

    #[error("transport failure: {0}")]
    Transport(String),

    #[error("malformed response: {0}")]
    Malformed(String),
}

impl From<ProviderError> for CallError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::UserRejected => CallError::UserRejected,
            ProviderError::Rpc { code: 3, message } => CallError::ExecutionReverted(message),
            other => CallError::Transport(other.to_string()),
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ConnectionError {
    #[error("no wallet provider found; install a browser wallet to continue")]
    WalletUnavailable,

    #[error("wallet connection was declined")]
    Declined,

    #[error("wallet returned no accounts")]
    NoAccounts,

    #[error("wallet request failed: {0}")]
    Provider(ProviderError),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum BindingError {
    #[error("cannot bind contract without a connected session")]
    NotConnected,

    #[error("invalid contract address {0}")]
    InvalidAddress(String),

    #[error("failed to construct contract transport: {0}")]
    Transport(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error(transparent)]
    Call(#[from] CallError),

    /// The five catalog arrays must share one length; anything else is a
    /// protocol violation and no partial catalog is produced.
    #[error(
        "catalog arrays disagree on length (names {names}, image uris {image_uris}, \
         required scores {required_scores}, max supplies {max_supplies}, \
         current supplies {current_supplies})"
    )]
    CatalogLengthMismatch {
        names: usize,
        image_uris: usize,
        required_scores: usize,
        max_supplies: usize,
        current_supplies: usize,
    },
}

impl FetchError {
    pub fn is_catalog_mismatch(&self) -> bool {
        matches!(self, FetchError::CatalogLengthMismatch { .. })
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TransactionError {
    #[error("{field} must be a non-negative integer: {source}")]
    InvalidInput {
        field: &'static str,
        #[source]
        source: AmountError,
    },

    #[error("achievement draft is missing {0}")]
    IncompleteDraft(&'static str),

    #[error("only the contract owner can {0}")]
    NotOwner(&'static str),

    #[error("no contract bound for this session")]
    NotBound,

    #[error("submission failed: {0}")]
    Submission(CallError),

    #[error("transaction {hash} failed before confirmation: {source}")]
    Confirmation {
        hash: String,
        #[source]
        source: CallError,
    },
}

/// Failure establishing a session: the wallet step or the binding step.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error(transparent)]
    Binding(#[from] BindingError),
}
