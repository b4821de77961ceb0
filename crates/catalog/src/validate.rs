//! Field-level validation shared by the catalog entities.

use storefront_core::{DomainError, DomainResult};

/// Trim and require a non-empty display name.
pub(crate) fn name(field: &str, value: &str) -> DomainResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation(format!("{field} cannot be empty")));
    }
    Ok(trimmed.to_string())
}

/// Prices are non-negative decimals with at most two fractional digits.
pub(crate) fn price(value: f64) -> DomainResult<f64> {
    if !value.is_finite() {
        return Err(DomainError::validation("price must be a finite number"));
    }
    if value < 0.0 {
        return Err(DomainError::validation("price cannot be negative"));
    }
    let cents = value * 100.0;
    if (cents - cents.round()).abs() > 1e-6 {
        return Err(DomainError::validation(
            "price cannot have more than two decimal places",
        ));
    }
    Ok(value)
}

pub(crate) fn stock(value: i32) -> DomainResult<i32> {
    if value < 0 {
        return Err(DomainError::validation("stock cannot be negative"));
    }
    Ok(value)
}
