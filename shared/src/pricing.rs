//! Purchase pricing
//!
//! Line and grand totals are computed here from quantities and unit prices;
//! client-supplied totals are only compared against the computed values.

use std::collections::BTreeMap;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::models::PurchaseLineInput;
use crate::settlement::PaymentStatus;
use crate::validation::{
    validate_money, validate_quantity, validate_unit_price, MONEY_SCALE,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PricingError {
    #[error("A purchase needs at least one item")]
    NoItems,

    #[error("Item {line}: {reason}")]
    InvalidQuantity { line: usize, reason: &'static str },

    #[error("Item {line}: {reason}")]
    InvalidUnitPrice { line: usize, reason: &'static str },

    #[error("Item {line}: total price {supplied} does not match computed {computed}")]
    LineTotalMismatch {
        line: usize,
        supplied: Decimal,
        computed: Decimal,
    },

    #[error("Grand total {supplied} does not match computed {computed}")]
    GrandTotalMismatch { supplied: Decimal, computed: Decimal },

    #[error("Item {line}: total price is too large")]
    LineTotalTooLarge { line: usize },

    #[error("Grand total is too large")]
    GrandTotalTooLarge,

    #[error("Grand total must be greater than zero")]
    ZeroTotal,

    #[error("Paid amount: {0}")]
    InvalidPaidAmount(&'static str),

    #[error("Paid amount {paid} exceeds the grand total {total}")]
    PaidExceedsTotal { paid: Decimal, total: Decimal },

    #[error("A partial payment status requires a paid amount")]
    PartialWithoutAmount,

    #[error("Payment status {requested:?} does not match paid amount (expected {derived:?})")]
    StatusMismatch {
        requested: PaymentStatus,
        derived: PaymentStatus,
    },
}

impl PricingError {
    /// Client totals disagree with the computed ones
    pub fn is_total_mismatch(&self) -> bool {
        matches!(
            self,
            PricingError::LineTotalMismatch { .. } | PricingError::GrandTotalMismatch { .. }
        )
    }
}

/// A purchase line with its server-computed total
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PricedLine {
    pub line_no: i32,
    pub ingredient_id: Uuid,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub total_price: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PricedPurchase {
    pub lines: Vec<PricedLine>,
    pub grand_total: Decimal,
}

/// `quantity * unit_price` rounded to cents, half away from zero.
///
/// `None` when the product overflows a `Decimal`.
pub fn line_total(quantity: Decimal, unit_price: Decimal) -> Option<Decimal> {
    quantity
        .checked_mul(unit_price)
        .map(|total| total.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero))
}

/// Price every line and the grand total.
///
/// Line numbers in errors are 1-based.
pub fn price_lines(
    items: &[PurchaseLineInput],
    client_grand_total: Option<Decimal>,
) -> Result<PricedPurchase, PricingError> {
    if items.is_empty() {
        return Err(PricingError::NoItems);
    }

    let mut lines = Vec::with_capacity(items.len());
    for (idx, item) in items.iter().enumerate() {
        let line = idx + 1;
        validate_quantity(item.quantity)
            .map_err(|reason| PricingError::InvalidQuantity { line, reason })?;
        validate_unit_price(item.unit_price)
            .map_err(|reason| PricingError::InvalidUnitPrice { line, reason })?;

        let computed = line_total(item.quantity, item.unit_price)
            .filter(|total| validate_money(*total).is_ok())
            .ok_or(PricingError::LineTotalTooLarge { line })?;
        if let Some(supplied) = item.total_price {
            if supplied != computed {
                return Err(PricingError::LineTotalMismatch {
                    line,
                    supplied,
                    computed,
                });
            }
        }

        lines.push(PricedLine {
            line_no: line as i32,
            ingredient_id: item.ingredient_id,
            quantity: item.quantity,
            unit_price: item.unit_price,
            total_price: computed,
        });
    }

    let grand_total = lines
        .iter()
        .try_fold(Decimal::ZERO, |acc, l| acc.checked_add(l.total_price))
        .filter(|total| validate_money(*total).is_ok())
        .ok_or(PricingError::GrandTotalTooLarge)?;
    if let Some(supplied) = client_grand_total {
        if supplied != grand_total {
            return Err(PricingError::GrandTotalMismatch {
                supplied,
                computed: grand_total,
            });
        }
    }
    if grand_total <= Decimal::ZERO {
        return Err(PricingError::ZeroTotal);
    }

    Ok(PricedPurchase { lines, grand_total })
}

/// Total quantity received per ingredient, in ingredient id order
pub fn stock_increments(lines: &[PricedLine]) -> BTreeMap<Uuid, Decimal> {
    let mut increments = BTreeMap::new();
    for line in lines {
        *increments.entry(line.ingredient_id).or_insert(Decimal::ZERO) += line.quantity;
    }
    increments
}

/// Resolve the amount already paid when a purchase is recorded.
///
/// The returned status is always derived from the returned amount.
pub fn resolve_initial_payment(
    requested_status: Option<PaymentStatus>,
    paid_amount: Option<Decimal>,
    grand_total: Decimal,
) -> Result<(Decimal, PaymentStatus), PricingError> {
    let paid = match (paid_amount, requested_status) {
        (Some(paid), _) => {
            validate_money(paid).map_err(PricingError::InvalidPaidAmount)?;
            if paid > grand_total {
                return Err(PricingError::PaidExceedsTotal {
                    paid,
                    total: grand_total,
                });
            }
            paid
        }
        (None, Some(PaymentStatus::Paid)) => grand_total,
        (None, Some(PaymentStatus::Partial)) => return Err(PricingError::PartialWithoutAmount),
        (None, Some(PaymentStatus::Unpaid)) | (None, None) => Decimal::ZERO,
    };

    let derived = PaymentStatus::derive(paid, grand_total);
    if let Some(requested) = requested_status {
        if requested != derived {
            return Err(PricingError::StatusMismatch { requested, derived });
        }
    }

    Ok((paid, derived))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn item(ingredient_id: Uuid, quantity: &str, unit_price: &str) -> PurchaseLineInput {
        PurchaseLineInput {
            ingredient_id,
            quantity: dec(quantity),
            unit_price: dec(unit_price),
            total_price: None,
        }
    }

    #[test]
    fn test_line_total_rounds_half_away_from_zero() {
        assert_eq!(line_total(dec("3"), dec("0.335")), Some(dec("1.01")));
        assert_eq!(line_total(dec("1.5"), dec("2.10")), Some(dec("3.15")));
        assert_eq!(line_total(Decimal::MAX, dec("2")), None);
    }

    #[test]
    fn test_price_lines_sums_grand_total() {
        let priced = price_lines(
            &[item(Uuid::new_v4(), "2", "12.50"), item(Uuid::new_v4(), "0.5", "8")],
            Some(dec("29")),
        )
        .unwrap();
        assert_eq!(priced.grand_total, dec("29.00"));
        assert_eq!(priced.lines[1].line_no, 2);
    }

    #[test]
    fn test_client_line_total_must_match() {
        let mut line = item(Uuid::new_v4(), "2", "10");
        line.total_price = Some(dec("25"));
        let err = price_lines(&[line], None).unwrap_err();
        assert!(err.is_total_mismatch());
    }

    #[test]
    fn test_zero_total_rejected() {
        let err = price_lines(&[item(Uuid::new_v4(), "1", "0")], None).unwrap_err();
        assert_eq!(err, PricingError::ZeroTotal);
    }

    #[test]
    fn test_empty_items_rejected() {
        assert_eq!(price_lines(&[], None).unwrap_err(), PricingError::NoItems);
    }

    #[test]
    fn test_initial_payment_resolution() {
        let total = dec("100");
        assert_eq!(
            resolve_initial_payment(None, None, total).unwrap(),
            (Decimal::ZERO, PaymentStatus::Unpaid)
        );
        assert_eq!(
            resolve_initial_payment(Some(PaymentStatus::Paid), None, total).unwrap(),
            (total, PaymentStatus::Paid)
        );
        assert_eq!(
            resolve_initial_payment(None, Some(dec("40")), total).unwrap(),
            (dec("40"), PaymentStatus::Partial)
        );
        assert_eq!(
            resolve_initial_payment(Some(PaymentStatus::Partial), None, total).unwrap_err(),
            PricingError::PartialWithoutAmount
        );
        assert!(matches!(
            resolve_initial_payment(Some(PaymentStatus::Paid), Some(dec("40")), total),
            Err(PricingError::StatusMismatch { .. })
        ));
        assert!(matches!(
            resolve_initial_payment(None, Some(dec("100.01")), total),
            Err(PricingError::PaidExceedsTotal { .. })
        ));
    }
}
