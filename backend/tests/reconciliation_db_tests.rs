//! Database-backed reconciliation tests
//!
//! Each test gets a fresh database with the crate migrations applied.
//! They need `DATABASE_URL` pointing at a Postgres server the test user
//! can create databases on.

use std::str::FromStr;

use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use rbo_backend::error::AppError;
use rbo_backend::services::{
    BranchService, ExpenseService, IngredientService, PurchaseService, StockService,
    VendorPaymentService, VendorService,
};
use shared::models::{
    AdjustStockInput, CreateBranchInput, CreateIngredientInput, CreatePurchaseInput,
    CreateVendorInput, CreateVendorPaymentInput, Ingredient, PaymentMethod, PurchaseLineInput,
    Vendor,
};
use shared::PaymentStatus;

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

struct Fixture {
    branch_id: Uuid,
    user_id: Uuid,
    vendor: Vendor,
    flour: Ingredient,
    oil: Ingredient,
}

async fn seed(pool: &PgPool) -> Fixture {
    let branch = BranchService::new(pool.clone())
        .create(CreateBranchInput {
            name: "Riverside".to_string(),
            address: None,
            phone: None,
        })
        .await
        .unwrap();

    let vendor = VendorService::new(pool.clone())
        .create(CreateVendorInput {
            branch_id: branch.id,
            vendor_code: Some("MILL-01".to_string()),
            name: "Northern Mill".to_string(),
            contact_person: None,
            phone: None,
            email: None,
            address: None,
        })
        .await
        .unwrap();

    let ingredients = IngredientService::new(pool.clone());
    let flour = ingredients
        .create(CreateIngredientInput {
            branch_id: branch.id,
            category_id: None,
            name: "Flour".to_string(),
            sku: "FLOUR-001".to_string(),
            unit: "kg".to_string(),
            stock_alert: Some(dec("5")),
        })
        .await
        .unwrap();
    let oil = ingredients
        .create(CreateIngredientInput {
            branch_id: branch.id,
            category_id: None,
            name: "Sunflower oil".to_string(),
            sku: "OIL-5L".to_string(),
            unit: "l".to_string(),
            stock_alert: None,
        })
        .await
        .unwrap();

    Fixture {
        branch_id: branch.id,
        user_id: Uuid::new_v4(),
        vendor,
        flour,
        oil,
    }
}

fn purchase_input(fx: &Fixture, items: Vec<PurchaseLineInput>) -> CreatePurchaseInput {
    CreatePurchaseInput {
        vendor_id: fx.vendor.id,
        branch_id: fx.branch_id,
        purchase_date: None,
        invoice_number: None,
        items,
        payment_status: None,
        paid_amount: None,
        payment_method: None,
        grand_total: None,
        notes: None,
    }
}

fn line(ingredient_id: Uuid, quantity: &str, unit_price: &str) -> PurchaseLineInput {
    PurchaseLineInput {
        ingredient_id,
        quantity: dec(quantity),
        unit_price: dec(unit_price),
        total_price: None,
    }
}

async fn on_hand(pool: &PgPool, ingredient_id: Uuid, branch_id: Uuid) -> Option<Decimal> {
    sqlx::query_scalar::<_, Decimal>(
        "SELECT quantity_in_stock FROM stock WHERE ingredient_id = $1 AND branch_id = $2",
    )
    .bind(ingredient_id)
    .bind(branch_id)
    .fetch_optional(pool)
    .await
    .unwrap()
}

async fn count(pool: &PgPool, sql: &str) -> i64 {
    sqlx::query_scalar::<_, i64>(sql).fetch_one(pool).await.unwrap()
}

async fn purchase_state(pool: &PgPool, purchase_id: Uuid) -> (Decimal, PaymentStatus) {
    sqlx::query_as::<_, (Decimal, PaymentStatus)>(
        "SELECT paid_amount, payment_status FROM purchases WHERE id = $1",
    )
    .bind(purchase_id)
    .fetch_one(pool)
    .await
    .unwrap()
}

async fn shadow_state(pool: &PgPool, purchase_id: Uuid) -> (Decimal, PaymentStatus) {
    sqlx::query_as::<_, (Decimal, PaymentStatus)>(
        "SELECT paid_amount, payment_status FROM expenses WHERE purchase_id = $1",
    )
    .bind(purchase_id)
    .fetch_one(pool)
    .await
    .unwrap()
}

#[sqlx::test(migrations = "./migrations")]
async fn test_vendor_with_purchases_cannot_be_deleted(pool: PgPool) {
    let fx = seed(&pool).await;
    PurchaseService::new(pool.clone())
        .create(fx.user_id, purchase_input(&fx, vec![line(fx.flour.id, "10", "2")]))
        .await
        .unwrap();

    let err = VendorService::new(pool.clone())
        .delete(fx.vendor.id)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Forbidden(_)));
    assert_eq!(err.status_code().as_u16(), 403);
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM vendors").await, 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_adjusting_unstocked_ingredient_is_not_found(pool: PgPool) {
    let fx = seed(&pool).await;

    let err = StockService::new(pool.clone())
        .adjust(
            fx.branch_id,
            fx.user_id,
            AdjustStockInput {
                ingredient_id: fx.oil.id,
                new_quantity: dec("4"),
                notes: None,
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::NotFound(_)));
    assert_eq!(on_hand(&pool, fx.oil.id, fx.branch_id).await, None);
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM stock_movements").await, 0);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_purchase_receives_exact_quantities(pool: PgPool) {
    let fx = seed(&pool).await;
    let purchases = PurchaseService::new(pool.clone());

    purchases
        .create(fx.user_id, purchase_input(&fx, vec![line(fx.flour.id, "5", "2")]))
        .await
        .unwrap();
    let detail = purchases
        .create(
            fx.user_id,
            purchase_input(
                &fx,
                vec![
                    line(fx.flour.id, "10.5", "2"),
                    line(fx.oil.id, "3", "7.25"),
                    line(fx.flour.id, "0.25", "2"),
                ],
            ),
        )
        .await
        .unwrap();

    assert_eq!(detail.purchase.grand_total, dec("43.25"));
    assert_eq!(on_hand(&pool, fx.flour.id, fx.branch_id).await, Some(dec("15.75")));
    assert_eq!(on_hand(&pool, fx.oil.id, fx.branch_id).await, Some(dec("3")));
}

/// An unknown ingredient on any line leaves no purchase and no stock behind
#[sqlx::test(migrations = "./migrations")]
async fn test_purchase_with_missing_ingredient_rolls_back(pool: PgPool) {
    let fx = seed(&pool).await;
    let purchases = PurchaseService::new(pool.clone());
    purchases
        .create(fx.user_id, purchase_input(&fx, vec![line(fx.flour.id, "4", "2")]))
        .await
        .unwrap();

    let err = purchases
        .create(
            fx.user_id,
            purchase_input(
                &fx,
                vec![line(fx.flour.id, "6", "2"), line(Uuid::new_v4(), "1", "1")],
            ),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::NotFound(_)));
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM purchases").await, 1);
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM purchase_items").await, 1);
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM stock").await, 1);
    assert_eq!(on_hand(&pool, fx.flour.id, fx.branch_id).await, Some(dec("4")));
}

#[sqlx::test(migrations = "./migrations")]
async fn test_deleting_payment_mirror_restores_purchases(pool: PgPool) {
    let fx = seed(&pool).await;
    let purchases = PurchaseService::new(pool.clone());

    let first = purchases
        .create(fx.user_id, purchase_input(&fx, vec![line(fx.flour.id, "50", "10")]))
        .await
        .unwrap();
    let mut partly_paid = purchase_input(&fx, vec![line(fx.oil.id, "20", "15")]);
    partly_paid.paid_amount = Some(dec("100"));
    let second = purchases.create(fx.user_id, partly_paid).await.unwrap();

    let first_id = first.purchase.id;
    let second_id = second.purchase.id;
    let first_before = purchase_state(&pool, first_id).await;
    let second_before = purchase_state(&pool, second_id).await;
    assert_eq!(second_before, (dec("100"), PaymentStatus::Partial));

    let response = VendorPaymentService::new(pool.clone())
        .pay(
            fx.user_id,
            CreateVendorPaymentInput {
                vendor_id: fx.vendor.id,
                branch_id: fx.branch_id,
                amount_paid: dec("600"),
                payment_method: PaymentMethod::BankTransfer,
                payment_date: None,
                notes: None,
            },
        )
        .await
        .unwrap();

    assert_eq!(response.payment.total_applied(), dec("600"));
    assert_eq!(purchase_state(&pool, first_id).await, (dec("500"), PaymentStatus::Paid));
    assert_eq!(purchase_state(&pool, second_id).await, (dec("200"), PaymentStatus::Partial));
    assert_eq!(shadow_state(&pool, first_id).await, (dec("500"), PaymentStatus::Paid));

    let payment_id = response.payment.payment.id;
    let mirror_id = sqlx::query_scalar::<_, Uuid>(
        "SELECT id FROM expenses WHERE vendor_payment_id = $1",
    )
    .bind(payment_id)
    .fetch_one(&pool)
    .await
    .unwrap();

    ExpenseService::new(pool.clone())
        .delete(mirror_id, fx.user_id)
        .await
        .unwrap();

    assert_eq!(purchase_state(&pool, first_id).await, first_before);
    assert_eq!(purchase_state(&pool, second_id).await, second_before);
    assert_eq!(shadow_state(&pool, first_id).await, first_before);
    assert_eq!(shadow_state(&pool, second_id).await, second_before);
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM vendor_payments").await, 0);
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM vendor_payment_allocations").await, 0);
}
