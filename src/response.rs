use serde::{Deserialize, Serialize};
use strum::{Display, FromRepr};

/// Status codes mirrored from the billing service's wire surface.
///
/// The discriminants are the integer codes carried by the purchase-result
/// broadcast, so [`BillingResponse::from_code`] round-trips with
/// [`BillingResponse::code`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, FromRepr,
)]
#[repr(i32)]
pub enum BillingResponse {
    ServiceDisconnected = -1,
    Ok = 0,
    UserCanceled = 1,
    ServiceUnavailable = 2,
    BillingUnavailable = 3,
    ItemUnavailable = 4,
    DeveloperError = 5,
    Error = 6,
    ItemAlreadyOwned = 7,
    ItemNotOwned = 8,
}

impl BillingResponse {
    /// The integer form used in broadcast extras.
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Decode an integer code; unknown codes yield `None`.
    pub fn from_code(code: i32) -> Option<Self> {
        Self::from_repr(code)
    }
}
