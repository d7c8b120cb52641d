//! Vendor payment settlement tests
//!
//! FIFO allocation of payments over outstanding purchases and the reversal
//! of stored allocations.

use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use std::str::FromStr;
use uuid::Uuid;

use shared::settlement::{
    allocate_fifo, plan_reversal, AppliedAmount, OutstandingPurchase, PaymentStatus,
    PurchaseBalance, SettlementError,
};

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn purchase(day: i64, total: Decimal, paid: Decimal) -> OutstandingPurchase {
    let base = Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap();
    OutstandingPurchase {
        purchase_id: Uuid::new_v4(),
        purchase_date: base + Duration::days(day),
        grand_total: total,
        paid_amount: paid,
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// 1200 over dues of 500, 300 and 400 settles all three; the third was already half paid
    #[test]
    fn test_payment_settles_oldest_first() {
        let outstanding = vec![
            purchase(0, dec("500"), Decimal::ZERO),
            purchase(1, dec("300"), Decimal::ZERO),
            purchase(2, dec("800"), dec("400")),
        ];

        let plan = allocate_fifo(&outstanding, dec("1200")).unwrap();

        assert_eq!(plan.lines.len(), 3);
        assert_eq!(plan.lines[0].amount_applied, dec("500"));
        assert_eq!(plan.lines[0].status_after, PaymentStatus::Paid);
        assert_eq!(plan.lines[1].amount_applied, dec("300"));
        assert_eq!(plan.lines[1].status_after, PaymentStatus::Paid);
        assert_eq!(plan.lines[2].amount_applied, dec("400"));
        assert_eq!(plan.lines[2].paid_after, dec("800"));
        assert_eq!(plan.lines[2].status_after, PaymentStatus::Paid);
        assert_eq!(plan.total_applied, dec("1200"));
        assert_eq!(plan.outstanding_before, dec("1200"));
    }

    #[test]
    fn test_payment_spills_into_next_purchase() {
        let outstanding = vec![
            purchase(0, dec("1000"), Decimal::ZERO),
            purchase(1, dec("500"), Decimal::ZERO),
        ];

        let plan = allocate_fifo(&outstanding, dec("1200")).unwrap();

        assert_eq!(plan.lines.len(), 2);
        assert_eq!(plan.lines[0].amount_applied, dec("1000"));
        assert_eq!(plan.lines[0].status_after, PaymentStatus::Paid);
        assert_eq!(plan.lines[1].amount_applied, dec("200"));
        assert_eq!(plan.lines[1].paid_after, dec("200"));
        assert_eq!(plan.lines[1].status_after, PaymentStatus::Partial);
    }

    /// 300 against a 500 purchase leaves it partial and untouched newer ones
    #[test]
    fn test_small_payment_stops_at_first_purchase() {
        let outstanding = vec![
            purchase(3, dec("200"), Decimal::ZERO),
            purchase(0, dec("500"), Decimal::ZERO),
        ];

        let plan = allocate_fifo(&outstanding, dec("300")).unwrap();

        assert_eq!(plan.lines.len(), 1);
        assert_eq!(plan.lines[0].purchase_id, outstanding[1].purchase_id);
        assert_eq!(plan.lines[0].paid_after, dec("300"));
        assert_eq!(plan.lines[0].status_after, PaymentStatus::Partial);
    }

    #[test]
    fn test_overpayment_rejected() {
        let outstanding = vec![purchase(0, dec("100"), dec("40"))];

        let err = allocate_fifo(&outstanding, dec("60.01")).unwrap_err();
        assert_eq!(
            err,
            SettlementError::Overpayment {
                amount: dec("60.01"),
                outstanding: dec("60"),
            }
        );
    }

    #[test]
    fn test_no_outstanding_purchases() {
        let err = allocate_fifo(&[], dec("10")).unwrap_err();
        assert_eq!(err, SettlementError::NoOutstandingBalance);
    }

    #[test]
    fn test_non_positive_amount() {
        let outstanding = vec![purchase(0, dec("100"), Decimal::ZERO)];
        assert_eq!(
            allocate_fifo(&outstanding, Decimal::ZERO).unwrap_err(),
            SettlementError::NonPositiveAmount
        );
        assert_eq!(
            allocate_fifo(&outstanding, dec("-5")).unwrap_err(),
            SettlementError::NonPositiveAmount
        );
    }

    #[test]
    fn test_reversal_restores_partial_purchase() {
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        let applied = vec![
            AppliedAmount { purchase_id: first, amount_applied: dec("500") },
            AppliedAmount { purchase_id: second, amount_applied: dec("100") },
        ];
        let balances = vec![
            PurchaseBalance { purchase_id: second, grand_total: dec("300"), paid_amount: dec("250") },
            PurchaseBalance { purchase_id: first, grand_total: dec("500"), paid_amount: dec("500") },
        ];

        let lines = plan_reversal(&applied, &balances).unwrap();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].purchase_id, first);
        assert_eq!(lines[0].paid_after, Decimal::ZERO);
        assert_eq!(lines[0].status_after, PaymentStatus::Unpaid);
        assert_eq!(lines[1].purchase_id, second);
        assert_eq!(lines[1].paid_after, dec("150"));
        assert_eq!(lines[1].status_after, PaymentStatus::Partial);
    }

    /// Paid amounts never go below zero even if balances drifted
    #[test]
    fn test_reversal_floors_at_zero() {
        let id = Uuid::new_v4();
        let applied = vec![AppliedAmount { purchase_id: id, amount_applied: dec("80") }];
        let balances = vec![PurchaseBalance { purchase_id: id, grand_total: dec("100"), paid_amount: dec("50") }];

        let lines = plan_reversal(&applied, &balances).unwrap();
        assert_eq!(lines[0].paid_after, Decimal::ZERO);
        assert_eq!(lines[0].amount_reversed, dec("50"));
    }

    #[test]
    fn test_reversal_missing_purchase() {
        let id = Uuid::new_v4();
        let applied = vec![AppliedAmount { purchase_id: id, amount_applied: dec("10") }];

        assert_eq!(
            plan_reversal(&applied, &[]).unwrap_err(),
            SettlementError::MissingPurchase(id)
        );
    }
}

// ============================================================================
// Property Tests
// ============================================================================

/// Whole-cent amounts between 0.01 and 5000.00
fn money_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..=500_000).prop_map(|cents| Decimal::new(cents, 2))
}

/// Outstanding purchases on distinct days, each with something still due
fn outstanding_strategy() -> impl Strategy<Value = Vec<OutstandingPurchase>> {
    prop::collection::vec((money_strategy(), 0u32..100), 1..8).prop_map(|rows| {
        rows.into_iter()
            .enumerate()
            .map(|(day, (total, paid_pct))| {
                let paid = (total * Decimal::from(paid_pct) / Decimal::from(100)).round_dp(2);
                purchase(day as i64, total, paid.min(total - dec("0.01")))
            })
            .collect()
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// The full amount is applied and never more than a purchase's due
    #[test]
    fn prop_allocation_conserves_amount(
        outstanding in outstanding_strategy(),
        fraction in 1u32..=100,
    ) {
        let total_due: Decimal = outstanding.iter().map(|p| p.due()).sum();
        let amount = (total_due * Decimal::from(fraction) / Decimal::from(100))
            .round_dp(2)
            .max(dec("0.01"));

        let plan = allocate_fifo(&outstanding, amount).unwrap();

        let applied: Decimal = plan.lines.iter().map(|l| l.amount_applied).sum();
        prop_assert_eq!(applied, amount);
        prop_assert_eq!(plan.total_applied, amount);

        for line in &plan.lines {
            let source = outstanding.iter().find(|p| p.purchase_id == line.purchase_id).unwrap();
            prop_assert!(line.amount_applied > Decimal::ZERO);
            prop_assert!(line.amount_applied <= source.due());
            prop_assert!(line.paid_after <= source.grand_total);
            prop_assert_eq!(line.status_after, PaymentStatus::derive(line.paid_after, source.grand_total));
        }
    }

    /// Every purchase before the last touched one is fully settled
    #[test]
    fn prop_allocation_never_skips_older_purchases(
        outstanding in outstanding_strategy(),
        fraction in 1u32..=100,
    ) {
        let total_due: Decimal = outstanding.iter().map(|p| p.due()).sum();
        let amount = (total_due * Decimal::from(fraction) / Decimal::from(100))
            .round_dp(2)
            .max(dec("0.01"));

        let plan = allocate_fifo(&outstanding, amount).unwrap();

        // Purchases are generated in date order
        for (idx, line) in plan.lines.iter().enumerate() {
            prop_assert_eq!(line.purchase_id, outstanding[idx].purchase_id);
            if idx + 1 < plan.lines.len() {
                prop_assert_eq!(line.status_after, PaymentStatus::Paid);
            }
        }
    }

    /// Anything above the total due is refused
    #[test]
    fn prop_overpayment_always_rejected(
        outstanding in outstanding_strategy(),
        extra in money_strategy(),
    ) {
        let total_due: Decimal = outstanding.iter().map(|p| p.due()).sum();
        let result = allocate_fifo(&outstanding, total_due + extra);
        let is_overpayment = matches!(result, Err(SettlementError::Overpayment { .. }));
        prop_assert!(is_overpayment);
    }

    /// Reversing a fresh allocation returns every purchase to its prior state
    #[test]
    fn prop_reversal_undoes_allocation(
        outstanding in outstanding_strategy(),
        fraction in 1u32..=100,
    ) {
        let total_due: Decimal = outstanding.iter().map(|p| p.due()).sum();
        let amount = (total_due * Decimal::from(fraction) / Decimal::from(100))
            .round_dp(2)
            .max(dec("0.01"));
        let plan = allocate_fifo(&outstanding, amount).unwrap();

        let applied: Vec<AppliedAmount> = plan
            .lines
            .iter()
            .map(|l| AppliedAmount { purchase_id: l.purchase_id, amount_applied: l.amount_applied })
            .collect();
        let balances: Vec<PurchaseBalance> = plan
            .lines
            .iter()
            .map(|l| {
                let source = outstanding.iter().find(|p| p.purchase_id == l.purchase_id).unwrap();
                PurchaseBalance {
                    purchase_id: l.purchase_id,
                    grand_total: source.grand_total,
                    paid_amount: l.paid_after,
                }
            })
            .collect();

        let reversed = plan_reversal(&applied, &balances).unwrap();

        prop_assert_eq!(reversed.len(), plan.lines.len());
        for (line, undo) in plan.lines.iter().zip(&reversed) {
            prop_assert_eq!(undo.purchase_id, line.purchase_id);
            prop_assert_eq!(undo.paid_after, line.paid_before);
            prop_assert_eq!(undo.amount_reversed, line.amount_applied);
        }
    }

    /// Status checks settlement first, then zero
    #[test]
    fn prop_status_derivation(total in money_strategy(), paid_pct in 0u32..=120) {
        let paid = (total * Decimal::from(paid_pct) / Decimal::from(100)).round_dp(2);
        let status = PaymentStatus::derive(paid, total);

        if paid >= total {
            prop_assert_eq!(status, PaymentStatus::Paid);
        } else if paid.is_zero() {
            prop_assert_eq!(status, PaymentStatus::Unpaid);
        } else {
            prop_assert_eq!(status, PaymentStatus::Partial);
        }
    }
}
