//! Links between expenses and the records they mirror
//!
//! Every purchase owns a shadow expense (`purchase_id`), and every vendor
//! payment owns a mirror expense (`vendor_payment_id`, plus a
//! `reference ID: <uuid>` suffix in the note). Older mirrors may only carry
//! the note reference. The functions here decide how such expenses may be
//! edited or deleted; the backend carries the decisions out.

use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Expense, ExpenseCategory, UpdateExpenseInput};
use crate::settlement::PaymentStatus;

/// Marker preceding the vendor payment id inside a mirror's note
pub const PAYMENT_REFERENCE_LABEL: &str = "reference ID:";

const NOTE_SEPARATOR: &str = " | ";

/// Note of a vendor payment mirror: the user's notes followed by the reference
pub fn format_payment_note(notes: Option<&str>, payment_id: Uuid) -> String {
    match notes.map(str::trim).filter(|n| !n.is_empty()) {
        Some(notes) => format!("{notes}{NOTE_SEPARATOR}{PAYMENT_REFERENCE_LABEL} {payment_id}"),
        None => format!("{PAYMENT_REFERENCE_LABEL} {payment_id}"),
    }
}

/// True when the note carries the reference marker, parseable or not
pub fn contains_payment_reference(note: &str) -> bool {
    note.contains(PAYMENT_REFERENCE_LABEL)
}

/// Vendor payment id embedded in a note, if any.
///
/// The last marker wins; the id is the first whitespace-delimited token
/// after it.
pub fn parse_payment_reference(note: &str) -> Option<Uuid> {
    let (_, rest) = note.rsplit_once(PAYMENT_REFERENCE_LABEL)?;
    let token = rest.split_whitespace().next()?;
    Uuid::parse_str(token.trim_end_matches(|c: char| !c.is_ascii_hexdigit())).ok()
}

/// The user-written part of a mirror note, without the reference
pub fn strip_payment_reference(note: &str) -> Option<String> {
    let user_part = match note.find(PAYMENT_REFERENCE_LABEL) {
        Some(idx) => &note[..idx],
        None => note,
    };
    let user_part = user_part.trim().trim_end_matches('|').trim();
    if user_part.is_empty() {
        None
    } else {
        Some(user_part.to_string())
    }
}

/// What an expense mirrors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpenseLink {
    Free,
    Purchase(Uuid),
    VendorPayment(Uuid),
}

/// Classify an expense.
///
/// A purchase link wins over a payment link; the note reference is only
/// consulted for `Vendor` expenses without an explicit link.
pub fn classify(expense: &Expense) -> ExpenseLink {
    if let Some(purchase_id) = expense.purchase_id {
        return ExpenseLink::Purchase(purchase_id);
    }
    if let Some(payment_id) = expense.vendor_payment_id {
        return ExpenseLink::VendorPayment(payment_id);
    }
    if expense.category == ExpenseCategory::Vendor {
        if let Some(payment_id) = expense.note.as_deref().and_then(parse_payment_reference) {
            return ExpenseLink::VendorPayment(payment_id);
        }
    }
    ExpenseLink::Free
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExpenseGuardError {
    #[error("This expense mirrors a purchase; edit the purchase instead")]
    PurchaseMirrorLocked,

    #[error("This expense mirrors a purchase; delete the purchase instead")]
    PurchaseMirrorUndeletable,

    #[error("The {0} of a vendor payment expense cannot be changed once allocated")]
    AmountLocked(&'static str),

    #[error("Notes cannot contain 'reference ID:'")]
    ReservedReference,

    #[error("Paid amount {paid} exceeds the total amount {total}")]
    PaidExceedsTotal { paid: Decimal, total: Decimal },
}

/// How an allowed update is carried out
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateRoute {
    /// Plain update of the expense row
    Free,
    /// Update the mirror and copy date/method/notes to the payment
    SyncVendorPayment(Uuid),
}

/// How an allowed delete is carried out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteRoute {
    Free,
    /// Reverse the payment's allocations, then drop the payment and the mirror
    CascadeVendorPayment(Uuid),
}

/// Decide whether `patch` may be applied to `expense`
pub fn check_update(
    expense: &Expense,
    patch: &UpdateExpenseInput,
) -> Result<UpdateRoute, ExpenseGuardError> {
    match classify(expense) {
        ExpenseLink::Purchase(_) => Err(ExpenseGuardError::PurchaseMirrorLocked),
        ExpenseLink::VendorPayment(payment_id) => {
            if patch.total_amount.is_some_and(|t| t != expense.total_amount) {
                return Err(ExpenseGuardError::AmountLocked("total amount"));
            }
            if patch.paid_amount.is_some_and(|p| p != expense.paid_amount) {
                return Err(ExpenseGuardError::AmountLocked("paid amount"));
            }
            if patch.category.is_some_and(|c| c != expense.category) {
                return Err(ExpenseGuardError::AmountLocked("category"));
            }
            if patch
                .vendor_name
                .as_ref()
                .is_some_and(|v| Some(v) != expense.vendor_name.as_ref())
            {
                return Err(ExpenseGuardError::AmountLocked("vendor name"));
            }
            Ok(UpdateRoute::SyncVendorPayment(payment_id))
        }
        ExpenseLink::Free => {
            if patch.note.as_deref().is_some_and(contains_payment_reference) {
                return Err(ExpenseGuardError::ReservedReference);
            }
            Ok(UpdateRoute::Free)
        }
    }
}

/// Decide whether `expense` may be deleted
pub fn check_delete(expense: &Expense) -> Result<DeleteRoute, ExpenseGuardError> {
    match classify(expense) {
        ExpenseLink::Purchase(_) => Err(ExpenseGuardError::PurchaseMirrorUndeletable),
        ExpenseLink::VendorPayment(payment_id) => Ok(DeleteRoute::CascadeVendorPayment(payment_id)),
        ExpenseLink::Free => Ok(DeleteRoute::Free),
    }
}

/// Total, paid amount and status of a free expense after a change.
///
/// A missing paid amount on a new expense means fully paid.
pub fn resolve_amounts(
    total: Decimal,
    paid: Option<Decimal>,
) -> Result<(Decimal, Decimal, PaymentStatus), ExpenseGuardError> {
    let paid = paid.unwrap_or(total);
    if paid > total {
        return Err(ExpenseGuardError::PaidExceedsTotal { paid, total });
    }
    Ok((total, paid, PaymentStatus::derive(paid, total)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn expense(category: ExpenseCategory, note: Option<String>) -> Expense {
        let now = Utc::now();
        Expense {
            id: Uuid::new_v4(),
            branch_id: Uuid::new_v4(),
            title: "Test".to_string(),
            category,
            vendor_name: Some("Fresh Farms".to_string()),
            total_amount: Decimal::from(100),
            paid_amount: Decimal::from(100),
            payment_status: PaymentStatus::Paid,
            payment_method: None,
            expense_date: now,
            note,
            purchase_id: None,
            vendor_payment_id: None,
            created_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_note_roundtrip() {
        let id = Uuid::new_v4();
        let note = format_payment_note(Some("March invoices"), id);
        assert_eq!(note, format!("March invoices | reference ID: {id}"));
        assert_eq!(parse_payment_reference(&note), Some(id));
        assert_eq!(strip_payment_reference(&note).as_deref(), Some("March invoices"));

        let bare = format_payment_note(Some("  "), id);
        assert_eq!(bare, format!("reference ID: {id}"));
        assert_eq!(strip_payment_reference(&bare), None);
    }

    #[test]
    fn test_unparseable_reference() {
        assert_eq!(parse_payment_reference("reference ID: not-a-uuid"), None);
        assert_eq!(parse_payment_reference("no marker"), None);
    }

    #[test]
    fn test_classify_order() {
        let payment_id = Uuid::new_v4();
        let mut e = expense(
            ExpenseCategory::Vendor,
            Some(format_payment_note(None, payment_id)),
        );
        assert_eq!(classify(&e), ExpenseLink::VendorPayment(payment_id));

        let purchase_id = Uuid::new_v4();
        e.purchase_id = Some(purchase_id);
        assert_eq!(classify(&e), ExpenseLink::Purchase(purchase_id));

        let rent = expense(
            ExpenseCategory::Rent,
            Some(format_payment_note(None, payment_id)),
        );
        assert_eq!(classify(&rent), ExpenseLink::Free);
    }

    #[test]
    fn test_payment_mirror_amount_locked() {
        let payment_id = Uuid::new_v4();
        let mut e = expense(ExpenseCategory::Vendor, None);
        e.vendor_payment_id = Some(payment_id);

        let patch = UpdateExpenseInput {
            total_amount: Some(Decimal::from(90)),
            ..Default::default()
        };
        assert_eq!(
            check_update(&e, &patch),
            Err(ExpenseGuardError::AmountLocked("total amount"))
        );

        let same_amount = UpdateExpenseInput {
            total_amount: Some(Decimal::from(100)),
            note: Some("paid by transfer".to_string()),
            ..Default::default()
        };
        assert_eq!(
            check_update(&e, &same_amount),
            Ok(UpdateRoute::SyncVendorPayment(payment_id))
        );
    }

    #[test]
    fn test_free_note_cannot_forge_reference() {
        let e = expense(ExpenseCategory::Other, None);
        let patch = UpdateExpenseInput {
            note: Some(format!("reference ID: {}", Uuid::new_v4())),
            ..Default::default()
        };
        assert_eq!(
            check_update(&e, &patch),
            Err(ExpenseGuardError::ReservedReference)
        );
    }

    #[test]
    fn test_resolve_amounts() {
        let (_, paid, status) = resolve_amounts(Decimal::from(50), None).unwrap();
        assert_eq!(paid, Decimal::from(50));
        assert_eq!(status, PaymentStatus::Paid);

        assert!(resolve_amounts(Decimal::from(50), Some(Decimal::from(60))).is_err());
    }
}
