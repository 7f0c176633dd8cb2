//! Persisted catalog of simulated products and purchases.
//!
//! The store keeps two sled trees, one per record type: products keyed by
//! sku, purchases keyed by purchase token. Values are bincode-encoded.
//! Handles are cheap to clone and share the underlying database.
//!
//! # Examples
//!
//! ```
//! use billing_sandbox::models::{SkuDetails, SkuType};
//! use billing_sandbox::store::BillingStore;
//!
//! let store = BillingStore::temp().unwrap();
//! let premium = SkuDetails::builder()
//!     .sku("premium")
//!     .sku_type(SkuType::InApp)
//!     .price("$3.99")
//!     .build();
//! store.add_product(premium).unwrap();
//! ```

use std::path::Path;
use std::str::FromStr;
use std::sync::Mutex;

use crate::error::BillingResult;
use crate::models::{Purchase, PurchasesResult, SkuDetails, SkuType};
use crate::params::SkuDetailsParams;

const PRODUCTS_TREE: &str = "sku_details";
const PURCHASES_TREE: &str = "purchases";

static SHARED: Mutex<Option<BillingStore>> = Mutex::new(None);

#[derive(Clone)]
pub struct BillingStore {
    db: sled::Db,
    products: sled::Tree,
    purchases: sled::Tree,
}

impl BillingStore {
    /// Open (or create) a store at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> BillingResult<Self> {
        Self::from_db(sled::open(path)?)
    }

    /// Create a store backed by a temporary database (useful for testing).
    pub fn temp() -> BillingResult<Self> {
        let config = sled::Config::new().temporary(true);
        Self::from_db(config.open()?)
    }

    /// The process-wide store, opened at `path` on first call.
    ///
    /// Later calls return a handle to the same database; their `path`
    /// argument is ignored.
    pub fn shared<P: AsRef<Path>>(path: P) -> BillingResult<Self> {
        let mut slot = SHARED.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(store) = slot.as_ref() {
            return Ok(store.clone());
        }
        let store = Self::open(path)?;
        *slot = Some(store.clone());
        Ok(store)
    }

    fn from_db(db: sled::Db) -> BillingResult<Self> {
        Ok(Self {
            products: db.open_tree(PRODUCTS_TREE)?,
            purchases: db.open_tree(PURCHASES_TREE)?,
            db,
        })
    }

    /// Catalog entries matching the params' sku list and product class.
    ///
    /// An unknown sku-type string matches nothing.
    pub fn sku_details(&self, params: &SkuDetailsParams) -> BillingResult<Vec<SkuDetails>> {
        let sku_type = SkuType::from_str(&params.sku_type).ok();
        let mut details = Vec::new();
        for entry in self.products.iter() {
            let (_, value) = entry?;
            let (record, _) = bincode::decode_from_slice::<SkuDetails, _>(
                &value,
                bincode::config::standard(),
            )?;
            if Some(record.sku_type) == sku_type && params.skus.contains(&record.sku) {
                details.push(record);
            }
        }
        Ok(details)
    }

    /// Insert a catalog entry, replacing any existing entry for the sku.
    pub fn add_product(&self, details: SkuDetails) -> BillingResult<&Self> {
        let value = bincode::encode_to_vec(&details, bincode::config::standard())?;
        if self.products.insert(details.sku.as_bytes(), value)?.is_some() {
            log::debug!("replaced catalog entry for sku {}", details.sku);
        }
        Ok(self)
    }

    pub fn remove_product(&self, sku: &str) -> BillingResult<&Self> {
        self.products.remove(sku.as_bytes())?;
        Ok(self)
    }

    pub fn clear_products(&self) -> BillingResult<&Self> {
        self.products.clear()?;
        Ok(self)
    }

    /// Insert a purchase, replacing any existing record with the same token.
    pub fn add_purchase(&self, purchase: Purchase) -> BillingResult<&Self> {
        let value = bincode::encode_to_vec(&purchase, bincode::config::standard())?;
        self.purchases
            .insert(purchase.purchase_token.as_bytes(), value)?;
        Ok(self)
    }

    /// Remove the purchase with this token. Absent tokens are a no-op.
    pub fn remove_purchase(&self, purchase_token: &str) -> BillingResult<&Self> {
        self.purchases.remove(purchase_token.as_bytes())?;
        Ok(self)
    }

    pub fn clear_purchases(&self) -> BillingResult<&Self> {
        self.purchases.clear()?;
        Ok(self)
    }

    /// All purchases of the given product class.
    pub fn purchases(&self, sku_type: SkuType) -> BillingResult<PurchasesResult> {
        let mut purchases = Vec::new();
        for entry in self.purchases.iter() {
            let (_, value) = entry?;
            let (record, _) = bincode::decode_from_slice::<Purchase, _>(
                &value,
                bincode::config::standard(),
            )?;
            if record.sku_type == sku_type {
                purchases.push(record);
            }
        }
        Ok(PurchasesResult::ok(purchases))
    }

    pub fn purchase_by_token(&self, purchase_token: &str) -> BillingResult<Option<Purchase>> {
        match self.purchases.get(purchase_token.as_bytes())? {
            Some(value) => {
                let (record, _) = bincode::decode_from_slice::<Purchase, _>(
                    &value,
                    bincode::config::standard(),
                )?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    /// Flush the database to disk.
    pub fn flush(&self) -> BillingResult<usize> {
        Ok(self.db.flush()?)
    }
}
