//! Money calculation utilities using rust_decimal for precision
//!
//! This module computes the fee split applied at placement. All arithmetic
//! is done using `Decimal` internally, then converted to `f64` for
//! storage/serialization. Percentages are expressed 0-100.

use crate::core::config::FeeConfig;
use crate::orders::traits::OrderError;
use rust_decimal::prelude::*;
use shared::order::{CartLine, Order, OrderTotals, PaymentBreakdown};

/// Rounding strategy for monetary values (2 decimal places, half-up)
const DECIMAL_PLACES: u32 = 2;

/// Maximum allowed unit price
const MAX_UNIT_PRICE: f64 = 1_000_000.0;
/// Maximum allowed quantity per line
const MAX_QUANTITY: u32 = 9999;

pub fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_default()
}

pub fn to_f64(value: Decimal) -> f64 {
    value
        .round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
        .to_f64()
        .unwrap_or(0.0)
}

fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

/// Validate that a f64 value is finite (not NaN, not Infinity)
#[inline]
fn require_finite(value: f64, field_name: &str) -> Result<(), OrderError> {
    if !value.is_finite() {
        return Err(OrderError::InvalidOperation(format!(
            "{} must be a finite number, got {}",
            field_name, value
        )));
    }
    Ok(())
}

/// Validate a cart line before placement
pub fn validate_cart_line(line: &CartLine) -> Result<(), OrderError> {
    if line.product_id.trim().is_empty() {
        return Err(OrderError::InvalidOperation(
            "product_id must not be empty".to_string(),
        ));
    }
    if line.seller_id.trim().is_empty() {
        return Err(OrderError::InvalidOperation(format!(
            "line {} is missing a seller_id",
            line.product_id
        )));
    }
    if line.name.trim().is_empty() {
        return Err(OrderError::InvalidOperation(format!(
            "line {} is missing a product name",
            line.product_id
        )));
    }

    require_finite(line.unit_price, "unit_price")?;
    if line.unit_price < 0.0 {
        return Err(OrderError::InvalidOperation(format!(
            "unit_price must be non-negative, got {}",
            line.unit_price
        )));
    }
    if line.unit_price > MAX_UNIT_PRICE {
        return Err(OrderError::InvalidOperation(format!(
            "unit_price exceeds maximum allowed ({}), got {}",
            MAX_UNIT_PRICE, line.unit_price
        )));
    }

    if line.quantity == 0 {
        return Err(OrderError::InvalidOperation(format!(
            "quantity must be positive for line {}",
            line.product_id
        )));
    }
    if line.quantity > MAX_QUANTITY {
        return Err(OrderError::InvalidOperation(format!(
            "quantity exceeds maximum allowed ({}), got {}",
            MAX_QUANTITY, line.quantity
        )));
    }

    Ok(())
}

/// Validate a seller discount amount (the partition-level upper bound is
/// checked by the caller once partitions are known)
pub fn validate_discount(amount: f64) -> Result<(), OrderError> {
    require_finite(amount, "discount")?;
    if amount < 0.0 {
        return Err(OrderError::InvalidOperation(format!(
            "discount must be non-negative, got {}",
            amount
        )));
    }
    Ok(())
}

/// Partition subtotal: sum of unit_price * quantity over the lines
pub fn line_subtotal(lines: &[CartLine]) -> Decimal {
    lines
        .iter()
        .map(|l| to_decimal(l.unit_price) * Decimal::from(l.quantity))
        .sum()
}

/// Delivery fee: zero at or above the free-shipping threshold, flat below
pub fn delivery_fee(subtotal: Decimal, fees: &FeeConfig) -> Decimal {
    if subtotal >= to_decimal(fees.free_shipping_threshold) {
        Decimal::ZERO
    } else {
        round_money(to_decimal(fees.delivery_fee))
    }
}

/// Service fee: percent of subtotal, rounded to cents half-up
pub fn service_fee(subtotal: Decimal, fees: &FeeConfig) -> Decimal {
    round_money(subtotal * to_decimal(fees.service_fee_percent) / Decimal::ONE_HUNDRED)
}

/// Platform share of the discounted subtotal (the vendor processing fee)
fn vendor_share(base: Decimal, fees: &FeeConfig) -> Decimal {
    round_money(base * to_decimal(fees.vendor_fee_percent) / Decimal::ONE_HUNDRED)
}

/// Seller payout: discounted subtotal minus the vendor processing fee
///
/// Computed by subtraction so that payout + vendor share reconstruct the
/// discounted subtotal exactly, cent for cent.
pub fn vendor_payout(subtotal: Decimal, discount: Decimal, fees: &FeeConfig) -> Decimal {
    let base = round_money((subtotal - discount).max(Decimal::ZERO));
    (base - vendor_share(base, fees)).max(Decimal::ZERO)
}

/// Platform revenue: service fee plus the vendor processing fee
pub fn platform_revenue(subtotal: Decimal, discount: Decimal, fees: &FeeConfig) -> Decimal {
    let base = round_money((subtotal - discount).max(Decimal::ZERO));
    (service_fee(subtotal, fees) + vendor_share(base, fees)).max(Decimal::ZERO)
}

/// Compute the full money split for one partition
pub fn order_totals(subtotal: Decimal, discount: Decimal, fees: &FeeConfig) -> OrderTotals {
    let subtotal = round_money(subtotal);
    let discount = round_money(discount.max(Decimal::ZERO));
    let delivery = delivery_fee(subtotal, fees);
    let service = service_fee(subtotal, fees);
    let total = subtotal + delivery + service - discount;
    OrderTotals {
        subtotal: to_f64(subtotal),
        delivery_fee: to_f64(delivery),
        service_fee: to_f64(service),
        discount_amount: to_f64(discount),
        total: to_f64(total),
    }
}

/// Derive the three-way settlement view from a stored order
///
/// The service fee was frozen at placement and is read back from the
/// order; only the vendor share is computed against the current schedule.
pub fn payment_breakdown(order: &Order, fees: &FeeConfig) -> PaymentBreakdown {
    let base = round_money(
        (to_decimal(order.subtotal) - to_decimal(order.discount_amount)).max(Decimal::ZERO),
    );
    let share = vendor_share(base, fees);
    PaymentBreakdown {
        customer_paid: order.total,
        seller_payout: to_f64((base - share).max(Decimal::ZERO)),
        platform_revenue: to_f64((to_decimal(order.service_fee) + share).max(Decimal::ZERO)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::order::{Address, OrderStatus, PaymentMethod, PaymentStatus};

    fn fees() -> FeeConfig {
        FeeConfig::default()
    }

    fn cart_line(unit_price: f64, quantity: u32) -> CartLine {
        CartLine {
            product_id: "prod-1".to_string(),
            name: "Widget".to_string(),
            unit_price,
            quantity,
            seller_id: "seller-a".to_string(),
            stock_on_hand: 100,
            category: None,
            brand: None,
        }
    }

    // ========== 运费 ==========

    #[test]
    fn test_delivery_fee_below_threshold() {
        assert_eq!(to_f64(delivery_fee(to_decimal(49.99), &fees())), 5.00);
        assert_eq!(to_f64(delivery_fee(to_decimal(0.01), &fees())), 5.00);
    }

    #[test]
    fn test_delivery_fee_free_at_threshold() {
        assert_eq!(to_f64(delivery_fee(to_decimal(50.00), &fees())), 0.00);
        assert_eq!(to_f64(delivery_fee(to_decimal(60.00), &fees())), 0.00);
    }

    // ========== 服务费 ==========

    #[test]
    fn test_service_fee_rounds_half_up() {
        // 10.25 * 2% = 0.205 → 0.21
        assert_eq!(to_f64(service_fee(to_decimal(10.25), &fees())), 0.21);
        // 31.25 * 2% = 0.625 → 0.63
        assert_eq!(to_f64(service_fee(to_decimal(31.25), &fees())), 0.63);
        // 10.20 * 2% = 0.204 → 0.20
        assert_eq!(to_f64(service_fee(to_decimal(10.20), &fees())), 0.20);
    }

    #[test]
    fn test_reference_scenario() {
        // 2 × 10.00 with the default schedule
        let subtotal = line_subtotal(&[cart_line(10.00, 2)]);
        let totals = order_totals(subtotal, Decimal::ZERO, &fees());
        assert_eq!(totals.subtotal, 20.00);
        assert_eq!(totals.delivery_fee, 5.00);
        assert_eq!(totals.service_fee, 0.40);
        assert_eq!(totals.discount_amount, 0.00);
        assert_eq!(totals.total, 25.40);
    }

    #[test]
    fn test_totals_invariant_holds_to_the_cent() {
        for (subtotal, discount) in [
            (20.00, 0.0),
            (49.99, 5.0),
            (50.00, 0.0),
            (123.45, 10.0),
            (0.01, 0.0),
        ] {
            let totals = order_totals(to_decimal(subtotal), to_decimal(discount), &fees());
            let recomputed = to_decimal(totals.subtotal) + to_decimal(totals.delivery_fee)
                + to_decimal(totals.service_fee)
                - to_decimal(totals.discount_amount);
            assert_eq!(to_f64(recomputed), totals.total);
        }
    }

    // ========== 结算拆分 ==========

    #[test]
    fn test_vendor_split() {
        // subtotal 100, discount 20, vendor 10%: base 80, share 8, payout 72
        let payout = vendor_payout(to_decimal(100.0), to_decimal(20.0), &fees());
        let revenue = platform_revenue(to_decimal(100.0), to_decimal(20.0), &fees());
        assert_eq!(to_f64(payout), 72.00);
        // service 2.00 + share 8.00
        assert_eq!(to_f64(revenue), 10.00);
    }

    #[test]
    fn test_vendor_split_conserves_discounted_subtotal() {
        // base 10.05, vendor 10%: share 1.01 (half-up), payout 9.04
        let payout = vendor_payout(to_decimal(10.05), Decimal::ZERO, &fees());
        assert_eq!(to_f64(payout), 9.04);
        let share = to_decimal(10.05) - payout;
        assert_eq!(to_f64(share), 1.01);
    }

    #[test]
    fn test_payout_floors_at_zero() {
        let payout = vendor_payout(to_decimal(10.0), to_decimal(25.0), &fees());
        assert_eq!(to_f64(payout), 0.00);
        // only the service fee remains
        let revenue = platform_revenue(to_decimal(10.0), to_decimal(25.0), &fees());
        assert_eq!(to_f64(revenue), 0.20);
    }

    #[test]
    fn test_line_subtotal_sums_lines() {
        let lines = vec![cart_line(10.00, 2), cart_line(0.55, 1)];
        assert_eq!(to_f64(line_subtotal(&lines)), 20.55);
    }

    #[test]
    fn test_payment_breakdown_uses_frozen_service_fee() {
        let order = Order {
            id: "order-1".to_string(),
            order_number: "ORD-2024-0001".to_string(),
            customer_id: "cust-1".to_string(),
            seller_id: "seller-a".to_string(),
            lines: vec![],
            subtotal: 20.00,
            delivery_fee: 5.00,
            service_fee: 0.40,
            discount_amount: 0.00,
            total: 25.40,
            status: OrderStatus::Pending,
            payment_method: PaymentMethod::Card,
            payment_status: PaymentStatus::Paid,
            address: Address {
                street: "1 Main St".to_string(),
                city: "Springfield".to_string(),
                state: "IL".to_string(),
                zip: "62701".to_string(),
                country: "US".to_string(),
            },
            cancel_reason: None,
            created_at: 0,
            updated_at: 0,
            estimated_delivery: 0,
        };
        let breakdown = payment_breakdown(&order, &fees());
        assert_eq!(breakdown.customer_paid, 25.40);
        assert_eq!(breakdown.seller_payout, 18.00);
        assert_eq!(breakdown.platform_revenue, 2.40);
    }

    // ========== 校验 ==========

    #[test]
    fn test_validate_cart_line_accepts_valid() {
        assert!(validate_cart_line(&cart_line(9.99, 3)).is_ok());
    }

    #[test]
    fn test_validate_cart_line_rejects_zero_quantity() {
        let result = validate_cart_line(&cart_line(9.99, 0));
        assert!(matches!(result, Err(OrderError::InvalidOperation(_))));
    }

    #[test]
    fn test_validate_cart_line_rejects_negative_price() {
        assert!(validate_cart_line(&cart_line(-1.0, 1)).is_err());
    }

    #[test]
    fn test_validate_cart_line_rejects_non_finite_price() {
        assert!(validate_cart_line(&cart_line(f64::NAN, 1)).is_err());
        assert!(validate_cart_line(&cart_line(f64::INFINITY, 1)).is_err());
    }

    #[test]
    fn test_validate_cart_line_rejects_missing_seller() {
        let mut line = cart_line(9.99, 1);
        line.seller_id = "  ".to_string();
        let err = validate_cart_line(&line).unwrap_err();
        assert!(err.to_string().contains("seller_id"));
    }

    #[test]
    fn test_validate_cart_line_rejects_excessive_values() {
        assert!(validate_cart_line(&cart_line(2_000_000.0, 1)).is_err());
        assert!(validate_cart_line(&cart_line(9.99, 10_000)).is_err());
    }

    #[test]
    fn test_validate_discount() {
        assert!(validate_discount(0.0).is_ok());
        assert!(validate_discount(5.50).is_ok());
        assert!(validate_discount(-0.01).is_err());
        assert!(validate_discount(f64::NAN).is_err());
    }
}
