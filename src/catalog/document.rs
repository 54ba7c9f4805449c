//! Document identifiers

/// Deterministic document store key for a vendor's price of an item.
///
/// Whitespace is removed from the vendor name, which is then joined to the item
/// name with an underscore (`"Supermarket A"`, `"Milk"` -> `"SupermarketA_Milk"`).
pub fn document_id(vendor: &str, item: &str) -> String {
    let vendor: String = vendor.chars().filter(|c| !c.is_whitespace()).collect();

    format!("{vendor}_{item}")
}
