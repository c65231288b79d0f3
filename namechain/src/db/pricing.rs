//! Name pricing.
//!
//! Prices are a pure function of the namespace's pricing parameters and
//! the name length. They are consulted by the operation constructor when
//! assembling burn outputs; the state engine itself does not validate
//! payment amounts, so the floating-point math here is not
//! consensus-critical.

use super::records::NamespaceRecord;

/// Computes the price of `name` in `namespace`, in satoshis.
///
/// `price = round(base_cost * (cost_decay_ppm / 1e6) ^ (len(name) - 1))`
pub fn name_price(namespace: &NamespaceRecord, name: &str) -> u64 {
    let decay = f64::from(namespace.cost_decay_ppm) / 1_000_000.0;
    let exponent = name.len().saturating_sub(1) as i32;
    let price = f64::from(namespace.base_cost) * decay.powi(exponent);
    price.round() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::records::NamespaceState;
    use crate::types::{Address, HASH160_LEN, Hash160};

    fn dummy_namespace(base_cost: u32, cost_decay_ppm: u32) -> NamespaceRecord {
        NamespaceRecord {
            creator: Address(Hash160([1; HASH160_LEN])),
            lifetime: 52_595,
            base_cost,
            cost_decay_ppm,
            state: NamespaceState::Ready,
            reveal_height: 10,
            ready_height: Some(20),
        }
    }

    #[test]
    fn single_character_names_cost_the_base_price() {
        let ns = dummy_namespace(25_600, 500_000);
        assert_eq!(name_price(&ns, "a"), 25_600);
    }

    #[test]
    fn price_decays_with_length() {
        // decay = 0.5 halves the price per extra character.
        let ns = dummy_namespace(25_600, 500_000);
        assert_eq!(name_price(&ns, "ab"), 12_800);
        assert_eq!(name_price(&ns, "abcd"), 3_200);
    }

    #[test]
    fn price_rounds_to_the_nearest_satoshi() {
        // 1000 * 0.333^1 = 333.0, 1000 * 0.333^2 = 110.889 -> 111.
        let ns = dummy_namespace(1_000, 333_000);
        assert_eq!(name_price(&ns, "ab"), 333);
        assert_eq!(name_price(&ns, "abc"), 111);
    }
}
