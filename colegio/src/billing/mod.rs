// Reglas de cartera: saldos, bloqueo de boletines y cobros mensuales.

use std::ops::RangeInclusive;

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::models::{FiscalYear, Id, Receivable};
use crate::store::Store;
use crate::tenant::TenantContext;
use crate::validation;

/// Día del mes en que vencen los cobros mensuales.
pub const MONTHLY_DUE_DAY: u32 = 6;

/// Saldo resultante de una operación sobre una cuenta por cobrar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceChange {
    pub balance: Decimal,
    pub paid: bool,
}

/// Abono: el valor debe ser positivo y no superar el saldo.
pub fn apply_payment(balance: Decimal, amount: Decimal) -> AppResult<BalanceChange> {
    validation::positive_amount("payment amount", amount)?;
    if amount > balance {
        return Err(AppError::validation(format!(
            "payment of {} exceeds the outstanding balance of {}",
            amount, balance
        )));
    }
    let remaining = balance - amount;
    if remaining <= Decimal::ZERO {
        Ok(BalanceChange { balance: Decimal::ZERO, paid: true })
    } else {
        Ok(BalanceChange { balance: remaining, paid: false })
    }
}

/// Cambio del valor de un pago ya registrado: se aplica solo la diferencia.
pub fn apply_payment_change(balance: Decimal, old_amount: Decimal, new_amount: Decimal) -> AppResult<BalanceChange> {
    validation::positive_amount("payment amount", new_amount)?;
    let remaining = balance - (new_amount - old_amount);
    if remaining < Decimal::ZERO {
        return Err(AppError::validation(format!(
            "payment of {} exceeds the outstanding balance of {}",
            new_amount,
            balance + old_amount
        )));
    }
    Ok(BalanceChange { balance: remaining, paid: remaining.is_zero() })
}

pub fn revert_payment(balance: Decimal, amount: Decimal) -> BalanceChange {
    let restored = balance + amount;
    BalanceChange { balance: restored, paid: restored <= Decimal::ZERO }
}

/// Meses del año escolar que cubre cada trimestre.
pub fn trimester_months(trimester: u8) -> Option<RangeInclusive<u8>> {
    match trimester {
        1 => Some(2..=4),
        2 => Some(5..=8),
        3 => Some(9..=11),
        _ => None,
    }
}

/// Deuda vencida que bloquea boletines.
pub fn is_blocking(receivable: &Receivable, concept_blocks: bool, today: NaiveDate) -> bool {
    concept_blocks
        && !receivable.paid
        && receivable.balance > Decimal::ZERO
        && receivable.due_date.is_some_and(|due| due < today)
}

pub fn monthly_due_date(fiscal_year: &FiscalYear, month: u8) -> AppResult<NaiveDate> {
    validation::month(month)?;
    NaiveDate::from_ymd_opt(fiscal_year.start_date.year(), u32::from(month), MONTHLY_DUE_DAY)
        .ok_or_else(|| AppError::Internal(format!("invalid due date for month {}", month)))
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportCardAccess {
    pub can_view: bool,
    pub trimester: u8,
    pub blocking: Vec<Receivable>,
    pub outstanding: Decimal,
}

/// Decide si el boletín de un trimestre se puede ver. Bloquea cualquier deuda
/// vencida de un mes hasta el último del trimestre, o sin mes asignado.
pub fn trimester_access(
    receivables: Vec<(Receivable, bool)>,
    trimester: u8,
    today: NaiveDate,
) -> AppResult<ReportCardAccess> {
    let months = trimester_months(trimester)
        .ok_or_else(|| AppError::validation("trimester must be 1, 2 or 3"))?;
    let last_month = *months.end();
    let blocking: Vec<Receivable> = receivables
        .into_iter()
        .filter(|(r, blocks)| is_blocking(r, *blocks, today))
        .filter(|(r, _)| r.month.is_none_or(|m| m <= last_month))
        .map(|(r, _)| r)
        .collect();
    let outstanding: Decimal = blocking.iter().map(|r| r.balance).sum();
    Ok(ReportCardAccess { can_view: blocking.is_empty(), trimester, blocking, outstanding })
}

/// `true` si el estudiante tiene alguna deuda vencida de un concepto que bloquea.
pub fn has_blocking_debt(store: &Store, tenant: &TenantContext, student_id: Id, today: NaiveDate) -> AppResult<bool> {
    let receivables = store.receivables_with_blocking_flag(tenant, student_id, None)?;
    let blocked = receivables.iter().any(|(r, blocks)| is_blocking(r, *blocks, today));
    debug!(student_id, blocked, "blocking debt check");
    Ok(blocked)
}

pub fn report_card_access(
    store: &Store,
    tenant: &TenantContext,
    student_id: Id,
    fiscal_year_id: Id,
    trimester: u8,
    today: NaiveDate,
) -> AppResult<ReportCardAccess> {
    store.student(tenant, student_id)?;
    store.fiscal_year(tenant, fiscal_year_id)?;
    let receivables = store.receivables_with_blocking_flag(tenant, student_id, Some(fiscal_year_id))?;
    trimester_access(receivables, trimester, today)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn receivable(id: Id, balance: &str, due: &str, month: Option<u8>) -> Receivable {
        Receivable {
            id,
            student_id: 1,
            concept_id: 1,
            due_date: Some(day(due)),
            total: dec(balance),
            balance: dec(balance),
            paid: false,
            month,
        }
    }

    #[test]
    fn payment_cannot_exceed_balance() {
        assert!(apply_payment(dec("100"), dec("150")).is_err());
        assert!(apply_payment(dec("100"), dec("0")).is_err());
        assert_eq!(
            apply_payment(dec("100"), dec("100")).unwrap(),
            BalanceChange { balance: Decimal::ZERO, paid: true }
        );
    }

    #[test]
    fn editing_a_payment_applies_the_difference() {
        // saldo 40 tras un pago de 60 sobre 100
        let change = apply_payment_change(dec("40"), dec("60"), dec("100")).unwrap();
        assert_eq!(change, BalanceChange { balance: dec("0"), paid: true });
        assert!(apply_payment_change(dec("40"), dec("60"), dec("101")).is_err());
        let lower = apply_payment_change(dec("0"), dec("100"), dec("30")).unwrap();
        assert_eq!(lower, BalanceChange { balance: dec("70"), paid: false });
        assert_eq!(revert_payment(dec("0"), dec("100")), BalanceChange { balance: dec("100"), paid: false });
    }

    #[test]
    fn only_overdue_blocking_debt_counts() {
        let today = day("2025-06-10");
        let overdue = receivable(1, "50", "2025-03-06", Some(3));
        assert!(is_blocking(&overdue, true, today));
        assert!(!is_blocking(&overdue, false, today));
        let not_due = receivable(2, "50", "2025-06-10", Some(6));
        assert!(!is_blocking(&not_due, true, today));
    }

    #[test]
    fn later_months_do_not_block_earlier_trimesters() {
        let today = day("2025-12-01");
        let october = receivable(1, "80", "2025-10-06", Some(10));
        let access = trimester_access(vec![(october.clone(), true)], 1, today).unwrap();
        assert!(access.can_view);
        let access = trimester_access(vec![(october, true)], 3, today).unwrap();
        assert!(!access.can_view);
        assert_eq!(access.outstanding, dec("80"));
        assert!(trimester_access(Vec::new(), 4, today).is_err());
    }

    #[test]
    fn monthly_charges_fall_due_on_the_sixth() {
        let fy = FiscalYear {
            id: 1,
            name: "2025".into(),
            start_date: day("2025-01-15"),
            end_date: day("2025-12-15"),
            active: true,
        };
        assert_eq!(monthly_due_date(&fy, 3).unwrap(), day("2025-03-06"));
        assert!(monthly_due_date(&fy, 13).is_err());
    }
}
