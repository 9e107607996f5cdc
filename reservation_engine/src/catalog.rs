//! Static pricing catalogue.
//!
//! Pricing is not owned by the reservation core; the catalogue is a fixed table consulted at checkout time. Unlisted
//! SKUs sell at the default unit price.
use srs_common::Money;

pub const DEFAULT_UNIT_PRICE: Money = Money::from_cents(2999);

const PRICES: [(&str, i64); 3] = [("FLASH-001", 2999), ("FLASH-002", 4999), ("FLASH-003", 1499)];

pub fn price_for(sku: &str) -> Money {
    PRICES
        .iter()
        .find(|(catalogue_sku, _)| *catalogue_sku == sku)
        .map(|(_, cents)| Money::from_cents(*cents))
        .unwrap_or(DEFAULT_UNIT_PRICE)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn listed_and_unlisted_skus() {
        assert_eq!(price_for("FLASH-002"), Money::from_cents(4999));
        assert_eq!(price_for("SOMETHING-ELSE"), DEFAULT_UNIT_PRICE);
    }
}
