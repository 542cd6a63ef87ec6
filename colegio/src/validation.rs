// Reglas de captura de datos. Cada función devuelve `AppError::Validation`
// con un mensaje apto para mostrar al usuario.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::error::{AppError, AppResult};
use crate::grading::is_valid_grade;

pub fn required(field: &str, value: &str) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(AppError::validation(format!("{} is required", field)));
    }
    Ok(())
}

/// Peso porcentual de logros y actividades.
pub fn percent_weight(weight: Decimal) -> AppResult<()> {
    if weight < Decimal::ZERO || weight > Decimal::ONE_HUNDRED {
        return Err(AppError::validation("weight must be between 0 and 100"));
    }
    Ok(())
}

pub fn grade_value(value: Decimal) -> AppResult<()> {
    if !is_valid_grade(value) {
        return Err(AppError::validation(format!("grade {} is out of range 0.00 - 5.00", value)));
    }
    Ok(())
}

pub fn optional_grade(value: Option<Decimal>) -> AppResult<()> {
    match value {
        Some(v) => grade_value(v),
        None => Ok(()),
    }
}

pub fn period(number: u8, weight: Decimal) -> AppResult<()> {
    if !(1..=4).contains(&number) {
        return Err(AppError::validation("period number must be between 1 and 4"));
    }
    if weight <= Decimal::ZERO {
        return Err(AppError::validation("period weight must be greater than 0"));
    }
    Ok(())
}

pub fn date_range(start: NaiveDate, end: NaiveDate) -> AppResult<()> {
    if end < start {
        return Err(AppError::validation("end date must not be before start date"));
    }
    Ok(())
}

pub fn month(month: u8) -> AppResult<()> {
    if !(1..=12).contains(&month) {
        return Err(AppError::validation("month must be between 1 and 12"));
    }
    Ok(())
}

pub fn non_negative_amount(field: &str, value: Decimal) -> AppResult<()> {
    if value < Decimal::ZERO {
        return Err(AppError::validation(format!("{} must not be negative", field)));
    }
    Ok(())
}

pub fn positive_amount(field: &str, value: Decimal) -> AppResult<()> {
    if value <= Decimal::ZERO {
        return Err(AppError::validation(format!("{} must be greater than 0", field)));
    }
    Ok(())
}
