//! Validation utilities for the restaurant back office
//!
//! Plain checks return `Result<(), &'static str>` and are used directly by the
//! pricing and service layers. The adapters at the bottom wrap them for
//! `#[validate(custom = "...")]` attributes on input DTOs.

use std::borrow::Cow;

use rust_decimal::Decimal;
use validator::ValidationError;

/// Decimal places allowed on money amounts
pub const MONEY_SCALE: u32 = 2;

/// Decimal places allowed on stock quantities
pub const QUANTITY_SCALE: u32 = 3;

/// Decimal places allowed on unit prices
pub const UNIT_PRICE_SCALE: u32 = 4;

/// Exclusive upper bound on money amounts
pub const MAX_MONEY: Decimal = Decimal::from_parts(3_567_587_328, 232, 0, false, 0);

/// Exclusive upper bound on quantities and stock levels
pub const MAX_QUANTITY: Decimal = Decimal::from_parts(1_215_752_192, 23, 0, false, 0);

/// Exclusive upper bound on unit prices
pub const MAX_UNIT_PRICE: Decimal = Decimal::from_parts(1_410_065_408, 2, 0, false, 0);

/// Number of significant decimal places, ignoring trailing zeros
pub fn significant_scale(value: Decimal) -> u32 {
    value.normalize().scale()
}

// ============================================================================
// Money & Quantities
// ============================================================================

/// Validate a money amount: non-negative, at most two decimals
pub fn validate_money(amount: Decimal) -> Result<(), &'static str> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err("Amount cannot be negative");
    }
    if significant_scale(amount) > MONEY_SCALE {
        return Err("Amount cannot have more than 2 decimal places");
    }
    if amount >= MAX_MONEY {
        return Err("Amount must be less than 1000000000000");
    }
    Ok(())
}

/// Validate a payment amount: strictly positive money
pub fn validate_positive_money(amount: Decimal) -> Result<(), &'static str> {
    if amount <= Decimal::ZERO {
        return Err("Amount must be greater than zero");
    }
    validate_money(amount)
}

/// Validate a purchased quantity
pub fn validate_quantity(quantity: Decimal) -> Result<(), &'static str> {
    if quantity <= Decimal::ZERO {
        return Err("Quantity must be greater than zero");
    }
    if significant_scale(quantity) > QUANTITY_SCALE {
        return Err("Quantity cannot have more than 3 decimal places");
    }
    if quantity >= MAX_QUANTITY {
        return Err("Quantity must be less than 100000000000");
    }
    Ok(())
}

/// Validate an on-hand stock level or alert threshold
pub fn validate_stock_level(level: Decimal) -> Result<(), &'static str> {
    if level < Decimal::ZERO {
        return Err("Stock level cannot be negative");
    }
    if significant_scale(level) > QUANTITY_SCALE {
        return Err("Stock level cannot have more than 3 decimal places");
    }
    if level >= MAX_QUANTITY {
        return Err("Stock level must be less than 100000000000");
    }
    Ok(())
}

/// Validate a unit price
pub fn validate_unit_price(price: Decimal) -> Result<(), &'static str> {
    if price < Decimal::ZERO {
        return Err("Unit price cannot be negative");
    }
    if significant_scale(price) > UNIT_PRICE_SCALE {
        return Err("Unit price cannot have more than 4 decimal places");
    }
    if price >= MAX_UNIT_PRICE {
        return Err("Unit price must be less than 10000000000");
    }
    Ok(())
}

// ============================================================================
// Identifiers & Contact Data
// ============================================================================

/// Validate an ingredient SKU (2-32 chars of uppercase letters, digits, `-`, `_`)
pub fn validate_sku(sku: &str) -> Result<(), &'static str> {
    if sku.len() < 2 {
        return Err("SKU must be at least 2 characters");
    }
    if sku.len() > 32 {
        return Err("SKU must be at most 32 characters");
    }
    if !sku
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '-' || c == '_')
    {
        return Err("SKU must contain only uppercase letters, digits, '-' or '_'");
    }
    Ok(())
}

/// Validate a phone number.
/// Accepts digits with optional `+`, spaces, dashes and parentheses; 7-15 digits.
pub fn validate_phone(phone: &str) -> Result<(), &'static str> {
    if !phone
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | ' ' | '-' | '(' | ')'))
    {
        return Err("Phone number contains invalid characters");
    }
    if phone.chars().skip(1).any(|c| c == '+') {
        return Err("'+' is only allowed as the first character");
    }

    let digits = phone.chars().filter(|c| c.is_ascii_digit()).count();
    if !(7..=15).contains(&digits) {
        return Err("Phone number must have between 7 and 15 digits");
    }
    Ok(())
}

// ============================================================================
// validator adapters
// ============================================================================

fn to_validation_error(code: &'static str, message: &'static str) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(Cow::Borrowed(message));
    error
}

pub fn money(value: &Decimal) -> Result<(), ValidationError> {
    validate_money(*value).map_err(|m| to_validation_error("money", m))
}

pub fn positive_money(value: &Decimal) -> Result<(), ValidationError> {
    validate_positive_money(*value).map_err(|m| to_validation_error("positive_money", m))
}

pub fn stock_level(value: &Decimal) -> Result<(), ValidationError> {
    validate_stock_level(*value).map_err(|m| to_validation_error("stock_level", m))
}

pub fn sku(value: &str) -> Result<(), ValidationError> {
    validate_sku(value).map_err(|m| to_validation_error("sku", m))
}

pub fn phone(value: &str) -> Result<(), ValidationError> {
    validate_phone(value).map_err(|m| to_validation_error("phone", m))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_money_scale() {
        assert!(validate_money(dec("10.50")).is_ok());
        assert!(validate_money(dec("10.500")).is_ok());
        assert!(validate_money(dec("0")).is_ok());
        assert!(validate_money(dec("10.505")).is_err());
        assert!(validate_money(dec("-1")).is_err());
    }

    #[test]
    fn test_positive_money() {
        assert!(validate_positive_money(dec("0.01")).is_ok());
        assert!(validate_positive_money(Decimal::ZERO).is_err());
        assert!(validate_positive_money(dec("-5")).is_err());
    }

    #[test]
    fn test_quantity() {
        assert!(validate_quantity(dec("2.125")).is_ok());
        assert!(validate_quantity(dec("2.1255")).is_err());
        assert!(validate_quantity(Decimal::ZERO).is_err());
    }

    #[test]
    fn test_stock_level_allows_zero() {
        assert!(validate_stock_level(Decimal::ZERO).is_ok());
        assert!(validate_stock_level(dec("-0.001")).is_err());
    }

    #[test]
    fn test_unit_price() {
        assert!(validate_unit_price(Decimal::ZERO).is_ok());
        assert!(validate_unit_price(dec("1.2345")).is_ok());
        assert!(validate_unit_price(dec("1.23456")).is_err());
    }

    #[test]
    fn test_bounds_match_column_precision() {
        assert_eq!(MAX_MONEY, dec("1000000000000"));
        assert_eq!(MAX_QUANTITY, dec("100000000000"));
        assert_eq!(MAX_UNIT_PRICE, dec("10000000000"));
    }

    #[test]
    fn test_magnitude_limits() {
        assert!(validate_money(dec("999999999999.99")).is_ok());
        assert!(validate_money(dec("1000000000000")).is_err());
        assert!(validate_positive_money(dec("1000000000000")).is_err());
        assert!(validate_quantity(dec("99999999999.999")).is_ok());
        assert!(validate_quantity(dec("100000000000000000000")).is_err());
        assert!(validate_stock_level(dec("100000000000")).is_err());
        assert!(validate_unit_price(dec("999999999.9999")).is_ok());
        assert!(validate_unit_price(dec("10000000000")).is_err());
    }

    #[test]
    fn test_sku() {
        assert!(validate_sku("FLOUR-001").is_ok());
        assert!(validate_sku("OIL_5L").is_ok());
        assert!(validate_sku("x").is_err());
        assert!(validate_sku("flour").is_err());
        assert!(validate_sku("A B").is_err());
    }

    #[test]
    fn test_phone() {
        assert!(validate_phone("+1 (555) 123-4567").is_ok());
        assert!(validate_phone("0812345678").is_ok());
        assert!(validate_phone("12345").is_err());
        assert!(validate_phone("555-CALL-NOW").is_err());
        assert!(validate_phone("12+3456789").is_err());
    }

    #[test]
    fn test_adapter_carries_message() {
        let err = money(&dec("1.999")).unwrap_err();
        assert_eq!(err.code, "money");
        assert!(err.message.is_some());
    }
}
