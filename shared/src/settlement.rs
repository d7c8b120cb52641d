//! Vendor settlement rules
//!
//! Pure functions behind the payment status of purchases and expenses, the
//! FIFO allocation of a vendor payment over outstanding purchases, and the
//! reversal of such an allocation. The backend runs these plans inside a
//! database transaction; nothing here performs I/O.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Payment status of a purchase or expense.
///
/// Always derived from the paid amount and the total, never stored as
/// supplied by a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "VARCHAR"))]
pub enum PaymentStatus {
    Unpaid,
    Partial,
    Paid,
}

impl PaymentStatus {
    /// Status for `paid` out of `total`.
    ///
    /// Full settlement is checked first, so a zero total counts as paid.
    pub fn derive(paid: Decimal, total: Decimal) -> Self {
        if paid >= total {
            PaymentStatus::Paid
        } else if paid <= Decimal::ZERO {
            PaymentStatus::Unpaid
        } else {
            PaymentStatus::Partial
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Unpaid => "Unpaid",
            PaymentStatus::Partial => "Partial",
            PaymentStatus::Paid => "Paid",
        }
    }
}

/// Errors raised while planning a settlement
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettlementError {
    #[error("Payment amount must be greater than zero")]
    NonPositiveAmount,

    #[error("No outstanding amount to pay for this vendor")]
    NoOutstandingBalance,

    #[error("Payment of {amount} exceeds the outstanding balance of {outstanding}")]
    Overpayment { amount: Decimal, outstanding: Decimal },

    #[error("Payment could not be applied to any purchase")]
    NothingApplied,

    #[error("Purchase {0} referenced by the payment no longer exists")]
    MissingPurchase(Uuid),
}

/// A purchase that may still receive payments
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct OutstandingPurchase {
    pub purchase_id: Uuid,
    pub purchase_date: DateTime<Utc>,
    pub grand_total: Decimal,
    pub paid_amount: Decimal,
}

impl OutstandingPurchase {
    /// Remaining amount owed, never negative
    pub fn due(&self) -> Decimal {
        (self.grand_total - self.paid_amount).max(Decimal::ZERO)
    }
}

/// One step of an allocation plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationLine {
    pub purchase_id: Uuid,
    pub amount_applied: Decimal,
    pub paid_before: Decimal,
    pub paid_after: Decimal,
    pub status_after: PaymentStatus,
}

/// Result of spreading a payment over outstanding purchases
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationPlan {
    pub lines: Vec<AllocationLine>,
    pub total_applied: Decimal,
    pub outstanding_before: Decimal,
}

/// Spread `amount` over `outstanding`, oldest purchase first.
///
/// Each purchase receives `min(remaining, due)` until the amount is used up.
/// Amounts larger than the total due are rejected rather than carried as
/// vendor credit, so a successful plan always applies exactly `amount`.
pub fn allocate_fifo(
    outstanding: &[OutstandingPurchase],
    amount: Decimal,
) -> Result<AllocationPlan, SettlementError> {
    if amount <= Decimal::ZERO {
        return Err(SettlementError::NonPositiveAmount);
    }
    if outstanding.is_empty() {
        return Err(SettlementError::NoOutstandingBalance);
    }

    // Stable sort keeps the caller's tie-break for equal dates
    let mut ordered: Vec<&OutstandingPurchase> = outstanding.iter().collect();
    ordered.sort_by_key(|p| p.purchase_date);

    let outstanding_before: Decimal = ordered.iter().map(|p| p.due()).sum();
    if outstanding_before <= Decimal::ZERO {
        return Err(SettlementError::NothingApplied);
    }
    if amount > outstanding_before {
        return Err(SettlementError::Overpayment {
            amount,
            outstanding: outstanding_before,
        });
    }

    let mut remaining = amount;
    let mut lines = Vec::new();

    for purchase in ordered {
        if remaining <= Decimal::ZERO {
            break;
        }

        let due = purchase.due();
        if due <= Decimal::ZERO {
            continue;
        }

        let applied = remaining.min(due);
        let paid_after = purchase.paid_amount + applied;

        lines.push(AllocationLine {
            purchase_id: purchase.purchase_id,
            amount_applied: applied,
            paid_before: purchase.paid_amount,
            paid_after,
            status_after: PaymentStatus::derive(paid_after, purchase.grand_total),
        });

        remaining -= applied;
    }

    if lines.is_empty() {
        return Err(SettlementError::NothingApplied);
    }

    Ok(AllocationPlan {
        lines,
        total_applied: amount - remaining,
        outstanding_before,
    })
}

/// Amount a stored payment applied to one purchase
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct AppliedAmount {
    pub purchase_id: Uuid,
    pub amount_applied: Decimal,
}

/// Current balance of a purchase touched by a payment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct PurchaseBalance {
    pub purchase_id: Uuid,
    pub grand_total: Decimal,
    pub paid_amount: Decimal,
}

/// New state of a purchase after a payment is reversed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReversalLine {
    pub purchase_id: Uuid,
    pub amount_reversed: Decimal,
    pub paid_after: Decimal,
    pub status_after: PaymentStatus,
}

/// Undo the allocations recorded on a payment.
///
/// Every applied amount is subtracted from the purchase's paid amount,
/// floored at zero. Lines come back in the order of `applied`, one per
/// purchase.
pub fn plan_reversal(
    applied: &[AppliedAmount],
    balances: &[PurchaseBalance],
) -> Result<Vec<ReversalLine>, SettlementError> {
    let mut state: HashMap<Uuid, (Decimal, Decimal)> = balances
        .iter()
        .map(|b| (b.purchase_id, (b.grand_total, b.paid_amount)))
        .collect();

    let mut order: Vec<Uuid> = Vec::new();
    let mut reversed: HashMap<Uuid, Decimal> = HashMap::new();

    for entry in applied {
        let (_, paid) = state
            .get_mut(&entry.purchase_id)
            .ok_or(SettlementError::MissingPurchase(entry.purchase_id))?;

        let paid_after = (*paid - entry.amount_applied).max(Decimal::ZERO);
        let delta = *paid - paid_after;
        *paid = paid_after;

        if !reversed.contains_key(&entry.purchase_id) {
            order.push(entry.purchase_id);
        }
        *reversed.entry(entry.purchase_id).or_insert(Decimal::ZERO) += delta;
    }

    Ok(order
        .into_iter()
        .map(|purchase_id| {
            let (grand_total, paid_after) = state[&purchase_id];
            ReversalLine {
                purchase_id,
                amount_reversed: reversed[&purchase_id],
                paid_after,
                status_after: PaymentStatus::derive(paid_after, grand_total),
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn purchase(day: u32, total: i64, paid: i64) -> OutstandingPurchase {
        OutstandingPurchase {
            purchase_id: Uuid::new_v4(),
            purchase_date: Utc.with_ymd_and_hms(2024, 3, day, 9, 0, 0).unwrap(),
            grand_total: Decimal::from(total),
            paid_amount: Decimal::from(paid),
        }
    }

    #[test]
    fn test_derive_status() {
        let total = Decimal::from(100);
        assert_eq!(PaymentStatus::derive(Decimal::ZERO, total), PaymentStatus::Unpaid);
        assert_eq!(PaymentStatus::derive(Decimal::from(40), total), PaymentStatus::Partial);
        assert_eq!(PaymentStatus::derive(total, total), PaymentStatus::Paid);
        assert_eq!(PaymentStatus::derive(Decimal::ZERO, Decimal::ZERO), PaymentStatus::Paid);
    }

    #[test]
    fn test_allocation_skips_settled_rows() {
        let settled = purchase(1, 100, 100);
        let open = purchase(2, 100, 0);
        let plan = allocate_fifo(&[settled, open.clone()], Decimal::from(50)).unwrap();

        assert_eq!(plan.lines.len(), 1);
        assert_eq!(plan.lines[0].purchase_id, open.purchase_id);
    }

    #[test]
    fn test_allocation_orders_by_date() {
        let newer = purchase(10, 100, 0);
        let older = purchase(2, 100, 0);
        let plan = allocate_fifo(&[newer.clone(), older.clone()], Decimal::from(150)).unwrap();

        assert_eq!(plan.lines[0].purchase_id, older.purchase_id);
        assert_eq!(plan.lines[0].status_after, PaymentStatus::Paid);
        assert_eq!(plan.lines[1].purchase_id, newer.purchase_id);
        assert_eq!(plan.lines[1].amount_applied, Decimal::from(50));
    }

    #[test]
    fn test_reversal_of_unknown_purchase_fails() {
        let applied = [AppliedAmount {
            purchase_id: Uuid::new_v4(),
            amount_applied: Decimal::from(10),
        }];
        assert!(matches!(
            plan_reversal(&applied, &[]),
            Err(SettlementError::MissingPurchase(_))
        ));
    }
}
