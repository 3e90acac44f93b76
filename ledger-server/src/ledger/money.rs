//! Money calculation utilities using rust_decimal for precision
//!
//! This module provides precise decimal arithmetic for monetary calculations.
//! All calculations are done using `Decimal` internally, then converted to `f64`
//! for storage/serialization.

use crate::ledger::traits::LedgerError;
use rust_decimal::prelude::*;
use shared::ledger::{AdmissionInput, PaymentInput};

/// Rounding strategy for monetary values (2 decimal places, half-up)
const DECIMAL_PLACES: u32 = 2;

/// Tolerance for monetary comparisons (0.01)
pub const MONEY_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Maximum allowed amount for any single fee or payment (₹10,000,000)
const MAX_AMOUNT: f64 = 10_000_000.0;

/// Validate that a f64 value is finite (not NaN, not Infinity)
#[inline]
fn require_finite(value: f64, field_name: &str) -> Result<(), LedgerError> {
    if !value.is_finite() {
        return Err(LedgerError::InvalidOperation(format!(
            "{} must be a finite number, got {}",
            field_name, value
        )));
    }
    Ok(())
}

/// Convert f64 to Decimal for calculation
#[inline]
pub fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_default()
}

/// Convert Decimal back to f64 for storage, rounded to 2 decimal places
#[inline]
pub fn to_f64(value: Decimal) -> f64 {
    value
        .round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
        .to_f64()
        .unwrap_or_default()
}

/// Compare two monetary values for equality (within 0.01 tolerance)
pub fn money_eq(a: f64, b: f64) -> bool {
    let diff = (to_decimal(a) - to_decimal(b)).abs();
    diff < MONEY_TOLERANCE
}

/// Check if payment is sufficient (with small tolerance for edge cases)
///
/// Returns true if paid >= required - 0.01
pub fn is_payment_sufficient(paid: f64, required: f64) -> bool {
    let paid_dec = to_decimal(paid);
    let required_dec = to_decimal(required);
    paid_dec >= required_dec - MONEY_TOLERANCE
}

/// Validate a PaymentInput before processing
pub fn validate_payment(payment: &PaymentInput) -> Result<(), LedgerError> {
    // Amount must be finite and positive
    require_finite(payment.paid_amount, "paid_amount")?;
    if payment.paid_amount <= 0.0 {
        return Err(LedgerError::InvalidAmount);
    }
    if payment.paid_amount > MAX_AMOUNT {
        return Err(LedgerError::InvalidOperation(format!(
            "paid_amount exceeds maximum allowed ({}), got {}",
            MAX_AMOUNT, payment.paid_amount
        )));
    }

    Ok(())
}

/// Validate the fee structure of a registration input
///
/// total_fees must equal base - discount + cgst + sgst, and the down
/// payment can never exceed the total.
pub fn validate_fee_structure(input: &AdmissionInput) -> Result<(), LedgerError> {
    let fields = [
        (input.base_fees, "base_fees"),
        (input.discount_amount, "discount_amount"),
        (input.cgst_amount, "cgst_amount"),
        (input.sgst_amount, "sgst_amount"),
        (input.total_fees, "total_fees"),
        (input.down_payment, "down_payment"),
    ];
    for (value, field_name) in fields {
        require_finite(value, field_name)?;
        if value < 0.0 {
            return Err(LedgerError::InvalidFeeStructure(format!(
                "{} must be non-negative, got {}",
                field_name, value
            )));
        }
        if value > MAX_AMOUNT {
            return Err(LedgerError::InvalidFeeStructure(format!(
                "{} exceeds maximum allowed ({}), got {}",
                field_name, MAX_AMOUNT, value
            )));
        }
    }

    let expected = to_decimal(input.base_fees) - to_decimal(input.discount_amount)
        + to_decimal(input.cgst_amount)
        + to_decimal(input.sgst_amount);
    if (to_decimal(input.total_fees) - expected).abs() >= MONEY_TOLERANCE {
        return Err(LedgerError::InvalidFeeStructure(format!(
            "total_fees {:.2} does not equal base - discount + cgst + sgst ({:.2})",
            input.total_fees,
            to_f64(expected)
        )));
    }

    if to_decimal(input.down_payment) > to_decimal(input.total_fees) + MONEY_TOLERANCE {
        return Err(LedgerError::InvalidFeeStructure(format!(
            "down_payment {:.2} exceeds total_fees {:.2}",
            input.down_payment, input.total_fees
        )));
    }

    Ok(())
}

/// Validate the installment schedule of a registration input
///
/// Every scheduled amount must be positive, due dates must be strictly
/// increasing, and down payment plus the scheduled amounts must sum to
/// total_fees. An empty schedule is valid only when the down payment
/// already covers the total.
pub fn validate_schedule(input: &AdmissionInput) -> Result<(), LedgerError> {
    let mut scheduled = Decimal::ZERO;
    let mut prev_due = None;
    for (idx, installment) in input.installments.iter().enumerate() {
        if let Some(prev) = prev_due {
            if installment.due_date <= prev {
                return Err(LedgerError::InvalidSchedule(format!(
                    "installment {} due date {} must be after installment {} due date {}",
                    idx + 1,
                    installment.due_date,
                    idx,
                    prev
                )));
            }
        }
        prev_due = Some(installment.due_date);
        require_finite(installment.amount, "installment amount")?;
        if installment.amount <= 0.0 {
            return Err(LedgerError::InvalidSchedule(format!(
                "installment {} amount must be positive, got {}",
                idx + 1,
                installment.amount
            )));
        }
        if installment.amount > MAX_AMOUNT {
            return Err(LedgerError::InvalidSchedule(format!(
                "installment {} amount exceeds maximum allowed ({}), got {}",
                idx + 1,
                MAX_AMOUNT,
                installment.amount
            )));
        }
        scheduled += to_decimal(installment.amount);
    }

    let expected = scheduled + to_decimal(input.down_payment);
    if (to_decimal(input.total_fees) - expected).abs() >= MONEY_TOLERANCE {
        return Err(LedgerError::ScheduleMismatch(format!(
            "down_payment {:.2} + scheduled installments {:.2} does not equal total_fees {:.2}",
            input.down_payment,
            to_f64(scheduled),
            input.total_fees
        )));
    }

    Ok(())
}
