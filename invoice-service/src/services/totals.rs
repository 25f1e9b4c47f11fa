//! Derivation of line amounts and invoice aggregate totals.
//!
//! The engine is a pure function over the raw form values. It recomputes
//! everything from scratch on every call; with at most five items, a single
//! source of truth matters more than incremental updates.

use crate::models::invoice::LineInput;

/// Coerce one raw numeric form value.
///
/// Missing, non-finite, and negative values all become zero. This is the
/// single place the leniency policy lives, so the live preview never shows
/// NaN and the rule stays auditable.
pub fn coerce(value: Option<f64>) -> f64 {
    value.filter(|v| v.is_finite() && *v >= 0.0).unwrap_or(0.0)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Totals {
    /// Per-item amounts, preserved in input order for display.
    pub amounts: Vec<f64>,
    pub subtotal: f64,
    pub tax_amount: f64,
    pub total: f64,
}

/// Derive all amounts and totals from raw items, tax rate, and shipping.
///
/// Stored values keep full float precision; rounding happens only in the
/// display formatter. An empty item list (disallowed upstream by the schema)
/// yields all-zero totals rather than an error.
pub fn compute(items: &[LineInput], tax_rate: Option<f64>, shipping: Option<f64>) -> Totals {
    if items.is_empty() {
        return Totals {
            amounts: Vec::new(),
            subtotal: 0.0,
            tax_amount: 0.0,
            total: 0.0,
        };
    }

    let amounts: Vec<f64> = items
        .iter()
        .map(|item| coerce(item.quantity) * coerce(item.rate))
        .collect();

    let subtotal: f64 = amounts.iter().sum();
    let tax_amount = subtotal * coerce(tax_rate) / 100.0;
    let total = subtotal + tax_amount + coerce(shipping);

    Totals {
        amounts,
        subtotal,
        tax_amount,
        total,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(quantity: Option<f64>, rate: Option<f64>) -> LineInput {
        LineInput {
            description: String::new(),
            issue_date: None,
            quantity,
            rate,
        }
    }

    #[test]
    fn amount_is_quantity_times_rate() {
        let totals = compute(&[item(Some(10.0), Some(100.0))], None, None);
        assert_eq!(totals.amounts, vec![1000.0]);
        assert_eq!(totals.subtotal, 1000.0);
    }

    #[test]
    fn invalid_numerics_coerce_to_zero() {
        assert_eq!(coerce(None), 0.0);
        assert_eq!(coerce(Some(f64::NAN)), 0.0);
        assert_eq!(coerce(Some(f64::INFINITY)), 0.0);
        assert_eq!(coerce(Some(-3.0)), 0.0);
        assert_eq!(coerce(Some(2.5)), 2.5);

        let totals = compute(&[item(None, Some(100.0)), item(Some(4.0), None)], None, None);
        assert_eq!(totals.amounts, vec![0.0, 0.0]);
        assert_eq!(totals.total, 0.0);
    }

    #[test]
    fn subtotal_is_permutation_invariant() {
        let a = item(Some(2.0), Some(30.0));
        let b = item(Some(5.0), Some(7.5));
        let c = item(Some(1.0), Some(99.99));

        let forward = compute(&[a.clone(), b.clone(), c.clone()], Some(10.0), Some(5.0));
        let backward = compute(&[c, b, a], Some(10.0), Some(5.0));

        assert_eq!(forward.subtotal, backward.subtotal);
        assert_eq!(forward.total, backward.total);
    }

    #[test]
    fn zero_tax_rate_yields_zero_tax() {
        let totals = compute(&[item(Some(3.0), Some(40.0))], Some(0.0), None);
        assert_eq!(totals.tax_amount, 0.0);
        assert_eq!(totals.total, 120.0);
    }

    #[test]
    fn shipping_defaults_to_zero_when_absent() {
        let without = compute(&[item(Some(1.0), Some(50.0))], Some(10.0), None);
        let with = compute(&[item(Some(1.0), Some(50.0))], Some(10.0), Some(0.0));
        assert_eq!(without.total, with.total);
    }

    #[test]
    fn derivation_is_idempotent_bit_for_bit() {
        let items = [
            item(Some(3.7), Some(19.99)),
            item(Some(0.5), Some(1234.56)),
        ];
        let first = compute(&items, Some(8.25), Some(12.34));
        let second = compute(&items, Some(8.25), Some(12.34));

        assert_eq!(first.subtotal.to_bits(), second.subtotal.to_bits());
        assert_eq!(first.tax_amount.to_bits(), second.tax_amount.to_bits());
        assert_eq!(first.total.to_bits(), second.total.to_bits());
        for (a, b) in first.amounts.iter().zip(second.amounts.iter()) {
            assert_eq!(a.to_bits(), b.to_bits());
        }
    }

    #[test]
    fn empty_item_list_yields_all_zero_totals() {
        let totals = compute(&[], Some(8.0), Some(25.0));
        assert_eq!(totals.subtotal, 0.0);
        assert_eq!(totals.tax_amount, 0.0);
        assert_eq!(totals.total, 0.0);
    }

    #[test]
    fn consulting_invoice_end_to_end_vector() {
        let totals = compute(&[item(Some(10.0), Some(100.0))], Some(8.0), Some(25.0));
        assert_eq!(totals.subtotal, 1000.0);
        assert_eq!(totals.tax_amount, 80.0);
        assert_eq!(totals.total, 1105.0);
    }
}
