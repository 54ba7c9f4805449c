//! Price Repositories
//!
//! Sources of raw [`PriceRecord`]s. Repositories are passed explicitly to whatever
//! builds a catalog, and own their own lifecycle.

use rustc_hash::FxHashMap;
use thiserror::Error;
use tracing::debug;

use crate::catalog::{PriceRecord, document_id};

pub mod yaml;

pub use yaml::YamlPriceRepository;

/// Repository Errors
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// IO error reading a price file
    #[error("failed to read price file: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("failed to parse YAML: {0}")]
    Yaml(#[from] serde_norway::Error),

    /// Invalid price format
    #[error("invalid price format: {0}")]
    InvalidPrice(String),

    /// Unknown currency code
    #[error("unknown currency code: {0}")]
    UnknownCurrency(String),

    /// Currency mismatch between records
    #[error("currency mismatch: expected {0}, found {1}")]
    CurrencyMismatch(String, String),
}

/// Source of raw price records.
pub trait PriceRepository {
    /// Every stored record.
    ///
    /// # Errors
    ///
    /// Returns a [`RepositoryError`] if the records cannot be read.
    fn records(&self) -> Result<Vec<PriceRecord>, RepositoryError>;
}

/// In-memory document store keyed by [`document_id`].
///
/// Writing a record whose vendor and item are already stored replaces the stored
/// document in place, mirroring an upsert into a document store.
#[derive(Debug, Default, Clone)]
pub struct InMemoryPriceRepository {
    documents: Vec<PriceRecord>,
    index: FxHashMap<String, usize>,
}

impl InMemoryPriceRepository {
    /// Create an empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a record, stamping it with the current time if it has no timestamp.
    ///
    /// Returns the document id it was stored under.
    pub fn put(&mut self, mut record: PriceRecord) -> String {
        let id = record.document_id();

        if record.last_updated.is_none() {
            record.last_updated = Some(jiff::Timestamp::now());
        }

        match self.index.get(&id) {
            Some(&position) => {
                if let Some(slot) = self.documents.get_mut(position) {
                    debug!(document_id = %id, "replacing stored price");
                    *slot = record;
                }
            }
            None => {
                self.index.insert(id.clone(), self.documents.len());
                self.documents.push(record);
            }
        }

        id
    }

    /// Look up a stored record by vendor and item.
    pub fn get(&self, vendor: &str, item: &str) -> Option<&PriceRecord> {
        self.index
            .get(&document_id(vendor, item))
            .and_then(|&position| self.documents.get(position))
    }

    /// Number of stored documents.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Returns `true` if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

impl FromIterator<PriceRecord> for InMemoryPriceRepository {
    fn from_iter<I: IntoIterator<Item = PriceRecord>>(iter: I) -> Self {
        let mut repository = Self::new();

        for record in iter {
            repository.put(record);
        }

        repository
    }
}

impl PriceRepository for InMemoryPriceRepository {
    fn records(&self) -> Result<Vec<PriceRecord>, RepositoryError> {
        Ok(self.documents.clone())
    }
}
