//! YAML Price Files

use std::{
    fs,
    path::{Path, PathBuf},
};

use jiff::Timestamp;
use rust_decimal::Decimal;
use rusty_money::iso::{self, Currency};
use serde::Deserialize;

use crate::{
    catalog::PriceRecord,
    repository::{PriceRepository, RepositoryError},
};

/// Wrapper for prices in YAML
#[derive(Debug, Deserialize)]
pub struct PricesFile {
    /// Price entries, in file order
    pub prices: Vec<PriceEntry>,
}

/// One price entry
#[derive(Debug, Deserialize)]
pub struct PriceEntry {
    /// Item name
    pub item: String,

    /// Vendor name
    pub vendor: String,

    /// Unit price with currency (e.g., "8.00 SAR")
    pub price: String,

    /// When the price was observed
    #[serde(default)]
    pub last_updated: Option<Timestamp>,
}

/// Records and currency read from a price file.
#[derive(Debug, Clone)]
pub struct PriceSheet {
    /// Records in file order
    pub records: Vec<PriceRecord>,

    /// Currency shared by every price, if the file has any
    pub currency: Option<&'static Currency>,
}

/// Repository backed by a YAML price file.
#[derive(Debug, Clone)]
pub struct YamlPriceRepository {
    path: PathBuf,
}

impl YamlPriceRepository {
    /// Repository for `<base_path>/prices/<name>.yml`.
    pub fn from_set(base_path: impl AsRef<Path>, name: &str) -> Self {
        Self::from_path(base_path.as_ref().join("prices").join(format!("{name}.yml")))
    }

    /// Repository for an explicit file path.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and parse the file.
    ///
    /// # Errors
    ///
    /// Returns a [`RepositoryError`] if the file cannot be read or parsed, a price
    /// is malformed, or prices use more than one currency.
    pub fn load(&self) -> Result<PriceSheet, RepositoryError> {
        let contents = fs::read_to_string(&self.path)?;

        parse_prices(&contents)
    }
}

impl PriceRepository for YamlPriceRepository {
    fn records(&self) -> Result<Vec<PriceRecord>, RepositoryError> {
        Ok(self.load()?.records)
    }
}

/// Parse the contents of a YAML price file.
///
/// # Errors
///
/// Returns a [`RepositoryError`] if the YAML is invalid, a price is malformed, or
/// prices use more than one currency.
pub fn parse_prices(contents: &str) -> Result<PriceSheet, RepositoryError> {
    let file: PricesFile = serde_norway::from_str(contents)?;

    let mut currency: Option<&'static Currency> = None;
    let mut records = Vec::with_capacity(file.prices.len());

    for entry in file.prices {
        let (unit_price, entry_currency) = parse_price(&entry.price)?;

        // Validate currency consistency
        if let Some(existing) = currency {
            if existing != entry_currency {
                return Err(RepositoryError::CurrencyMismatch(
                    existing.iso_alpha_code.to_string(),
                    entry_currency.iso_alpha_code.to_string(),
                ));
            }
        } else {
            currency = Some(entry_currency);
        }

        records.push(PriceRecord {
            item: entry.item,
            vendor: entry.vendor,
            unit_price,
            last_updated: entry.last_updated,
        });
    }

    Ok(PriceSheet { records, currency })
}

/// Parse price string (e.g., "7.50 SAR") into an amount and currency
///
/// # Errors
///
/// Returns an error if the string is not in the format "AMOUNT CURRENCY", if the
/// amount is not a decimal number, or if the currency code is not an ISO code.
pub fn parse_price(s: &str) -> Result<(Decimal, &'static Currency), RepositoryError> {
    let mut parts = s.split_whitespace();

    let (Some(amount), Some(code), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(RepositoryError::InvalidPrice(format!(
            "Expected format 'AMOUNT CURRENCY', got: {s}"
        )));
    };

    let amount = amount
        .parse::<Decimal>()
        .map_err(|_err| RepositoryError::InvalidPrice(s.to_string()))?;

    let currency = parse_currency(code)?;

    Ok((amount, currency))
}

/// Look up an ISO 4217 currency by code.
///
/// # Errors
///
/// Returns [`RepositoryError::UnknownCurrency`] for an unknown code.
pub fn parse_currency(code: &str) -> Result<&'static Currency, RepositoryError> {
    iso::find(code).ok_or_else(|| RepositoryError::UnknownCurrency(code.to_string()))
}
