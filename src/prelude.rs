//! One-stop imports for the common surface.

pub use crate::broadcast::{BroadcastBus, Intent};
pub use crate::client::{ConnectionListener, SandboxBillingClient};
pub use crate::error::{BillingError, BillingResult};
pub use crate::flow::{PurchasePrompt, Storefront};
pub use crate::models::{Purchase, PurchasesResult, SkuDetails, SkuType};
pub use crate::params::{BillingFlowParams, SkuDetailsParams};
pub use crate::response::BillingResponse;
pub use crate::store::BillingStore;
