use thiserror::Error;

pub type BillingResult<T> = Result<T, BillingError>;

/// Faults raised by the storage and messaging plumbing.
///
/// Outcomes the billing surface reports to applications are status codes
/// ([`crate::response::BillingResponse`]), never errors; this type only
/// surfaces where the caller owns the store or bus directly.
#[derive(Error, Debug)]
pub enum BillingError {
    #[error(transparent)]
    Store(#[from] sled::Error),
    #[error(transparent)]
    Decode(#[from] bincode::error::DecodeError),
    #[error(transparent)]
    Encode(#[from] bincode::error::EncodeError),
    #[error("entropy source unavailable: {0}")]
    Entropy(#[from] getrandom::Error),
}
