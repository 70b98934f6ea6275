//! Known MiBeacon products.

use mibeacon_packet::PRODUCT_ID_PS1BB;

/// A product that broadcasts MiBeacon frames this workspace can decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProductInfo {
    /// MiBeacon product id.
    pub product_id: u16,
    /// Short model name.
    pub model: &'static str,
    pub manufacturer: &'static str,
}

/// Product registry.
///
/// Supporting another Linptech device only needs a new entry here.
pub const PRODUCTS: &[ProductInfo] = &[ProductInfo {
    product_id: PRODUCT_ID_PS1BB,
    model: "PS1BB",
    manufacturer: "Linptech",
}];

/// Look up a product by id.
pub fn product_info(product_id: u16) -> Option<&'static ProductInfo> {
    PRODUCTS.iter().find(|p| p.product_id == product_id)
}

/// Ids of every registered product.
pub fn registered_product_ids() -> Vec<u16> {
    PRODUCTS.iter().map(|p| p.product_id).collect()
}
