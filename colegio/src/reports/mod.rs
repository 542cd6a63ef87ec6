// Reportes de cartera: recaudo por año y concepto, por medio de pago,
// cartera pendiente y morosos.

use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::error::AppResult;
use crate::models::Id;
use crate::store::{PaymentRow, PendingReceivable, Store};
use crate::tenant::TenantContext;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearTotal {
    pub fiscal_year_id: Id,
    pub fiscal_year: String,
    pub total: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearConceptTotal {
    pub fiscal_year_id: Id,
    pub fiscal_year: String,
    pub concept_id: Id,
    pub concept: String,
    pub total: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentsByYear {
    pub by_year: Vec<YearTotal>,
    pub by_concept: Vec<YearConceptTotal>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MethodTotal {
    pub method: String,
    pub payments: usize,
    pub total: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DelinquentStudent {
    pub student_id: Id,
    pub student_name: String,
    pub receivables: usize,
    pub outstanding: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct PendingReport {
    pub receivables: Vec<PendingReceivable>,
    pub total: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct DelinquentReport {
    pub students: Vec<DelinquentStudent>,
    pub total: Decimal,
}

pub fn payments_by_year(rows: &[PaymentRow]) -> PaymentsByYear {
    let mut years: HashMap<Id, YearTotal> = HashMap::new();
    let mut concepts: HashMap<(Id, Id), YearConceptTotal> = HashMap::new();
    for row in rows {
        years
            .entry(row.fiscal_year_id)
            .or_insert_with(|| YearTotal {
                fiscal_year_id: row.fiscal_year_id,
                fiscal_year: row.fiscal_year.clone(),
                total: Decimal::ZERO,
            })
            .total += row.amount;
        concepts
            .entry((row.fiscal_year_id, row.concept_id))
            .or_insert_with(|| YearConceptTotal {
                fiscal_year_id: row.fiscal_year_id,
                fiscal_year: row.fiscal_year.clone(),
                concept_id: row.concept_id,
                concept: row.concept.clone(),
                total: Decimal::ZERO,
            })
            .total += row.amount;
    }
    let mut by_year: Vec<YearTotal> = years.into_values().collect();
    by_year.sort_by(|a, b| b.fiscal_year.cmp(&a.fiscal_year));
    let mut by_concept: Vec<YearConceptTotal> = concepts.into_values().collect();
    by_concept.sort_by(|a, b| b.fiscal_year.cmp(&a.fiscal_year).then(b.total.cmp(&a.total)));
    PaymentsByYear { by_year, by_concept }
}

/// Totales por medio de pago, de mayor a menor.
pub fn payment_methods(rows: &[PaymentRow]) -> Vec<MethodTotal> {
    let mut totals: HashMap<String, MethodTotal> = HashMap::new();
    for row in rows {
        let entry = totals.entry(row.method.clone()).or_insert_with(|| MethodTotal {
            method: row.method.clone(),
            payments: 0,
            total: Decimal::ZERO,
        });
        entry.payments += 1;
        entry.total += row.amount;
    }
    let mut v: Vec<MethodTotal> = totals.into_values().collect();
    v.sort_by(|a, b| b.total.cmp(&a.total).then(a.method.cmp(&b.method)));
    v
}

/// Agrupa por estudiante la cartera vencida. Solo cuentan las cuentas con
/// vencimiento anterior a `today`.
pub fn delinquents(pending: &[PendingReceivable], today: NaiveDate) -> Vec<DelinquentStudent> {
    let mut by_student: HashMap<Id, DelinquentStudent> = HashMap::new();
    for p in pending.iter().filter(|p| p.due_date.is_some_and(|d| d < today)) {
        let entry = by_student.entry(p.student_id).or_insert_with(|| DelinquentStudent {
            student_id: p.student_id,
            student_name: p.student_name.clone(),
            receivables: 0,
            outstanding: Decimal::ZERO,
        });
        entry.receivables += 1;
        entry.outstanding += p.balance;
    }
    let mut v: Vec<DelinquentStudent> = by_student.into_values().collect();
    v.sort_by(|a, b| b.outstanding.cmp(&a.outstanding).then(a.student_name.cmp(&b.student_name)));
    v
}

pub fn payments_by_year_report(store: &Store, tenant: &TenantContext) -> AppResult<PaymentsByYear> {
    Ok(payments_by_year(&store.payment_rows(tenant)?))
}

pub fn payment_methods_report(store: &Store, tenant: &TenantContext) -> AppResult<Vec<MethodTotal>> {
    Ok(payment_methods(&store.payment_rows(tenant)?))
}

pub fn pending_report(store: &Store, tenant: &TenantContext) -> AppResult<PendingReport> {
    let receivables = store.pending_receivables(tenant)?;
    let total = receivables.iter().map(|r| r.balance).sum();
    Ok(PendingReport { receivables, total })
}

pub fn delinquent_report(store: &Store, tenant: &TenantContext, today: NaiveDate) -> AppResult<DelinquentReport> {
    let students = delinquents(&store.pending_receivables(tenant)?, today);
    let total = students.iter().map(|s| s.outstanding).sum();
    Ok(DelinquentReport { students, total })
}
