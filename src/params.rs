//! Parameter records for catalog queries and purchase-flow launches.
//!
//! Built with `typed-builder`, matching the builder surface the billing
//! service exposes for the same shapes.
//!
//! # Examples
//!
//! ```
//! use billing_sandbox::params::SkuDetailsParams;
//!
//! let params = SkuDetailsParams::builder()
//!     .sku_type("inapp")
//!     .skus(vec!["premium".to_string()])
//!     .build();
//! ```

use typed_builder::TypedBuilder;

/// Catalog lookup request: which skus, and which product class.
#[derive(Debug, Clone, TypedBuilder)]
#[builder(doc)]
pub struct SkuDetailsParams {
    /// String form of the product class (`"inapp"` or `"subs"`).
    #[builder(setter(into))]
    pub sku_type: String,

    /// Skus to look up. Products outside this list never match.
    #[builder(default)]
    pub skus: Vec<String>,
}

/// Launch request for the mock purchase flow.
#[derive(Debug, Clone, TypedBuilder)]
#[builder(doc)]
pub struct BillingFlowParams {
    #[builder(setter(into))]
    pub sku: String,

    /// String form of the product class (`"inapp"` or `"subs"`).
    #[builder(setter(into))]
    pub sku_type: String,
}
