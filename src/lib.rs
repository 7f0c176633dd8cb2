//! # Billing Sandbox
//!
//! A local test double for an in-app billing client. Application code talks
//! to the same asynchronous method surface it would in production, while
//! products and purchases live in a sled database on disk and the purchase
//! UI is a programmatic storefront driven by your tests.
//!
//! ## Features
//!
//! - **Persistent catalog**: seed products and purchases in a
//!   [`store::BillingStore`]; state survives process restarts
//! - **Faithful facade**: [`client::SandboxBillingClient`] mirrors the
//!   billing service's method names, status codes and threading shape
//! - **Scriptable purchase flow**: a [`flow::Storefront`] approves, cancels
//!   or fails each launched flow
//! - **No backend**: everything is in-process; results travel over a local
//!   broadcast bus
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::time::Duration;
//! use billing_sandbox::prelude::*;
//!
//! let store = BillingStore::temp()?;
//! store.add_product(
//!     SkuDetails::builder()
//!         .sku("premium")
//!         .sku_type(SkuType::InApp)
//!         .price("$3.99")
//!         .build(),
//! )?;
//!
//! let client = SandboxBillingClient::builder()
//!     .store(store.clone())
//!     .on_purchases_updated(|response, purchases| {
//!         println!("purchases updated: {response} {purchases:?}");
//!     })
//!     .build();
//! client.start_connection(|response| assert_eq!(response, BillingResponse::Ok));
//!
//! let storefront = Storefront::open();
//! client.launch_billing_flow(
//!     &BillingFlowParams::builder().sku("premium").sku_type("inapp").build(),
//! );
//! storefront
//!     .next_prompt(Duration::from_secs(1))
//!     .expect("flow launched")
//!     .approve()?;
//! ```

pub mod broadcast;
pub mod client;
pub mod error;
pub mod flow;
pub mod models;
pub mod params;
pub mod prelude;
pub mod response;
pub mod store;
