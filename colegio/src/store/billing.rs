// Cartera: años fiscales, conceptos, cuentas por cobrar y pagos.
// Las reglas de saldo viven en `crate::billing`; aquí solo se persisten.

use chrono::{NaiveDate, Utc};
use rusqlite::{params, OptionalExtension, Row};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::info;

use super::{dec_text, decimal_at, Store};
use crate::billing::{self, BalanceChange};
use crate::error::{AppError, AppResult};
use crate::models::*;
use crate::tenant::TenantContext;
use crate::validation;

/// Pago con su año fiscal y concepto, base de los reportes de recaudo.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentRow {
    pub payment_id: Id,
    pub fiscal_year_id: Id,
    pub fiscal_year: String,
    pub concept_id: Id,
    pub concept: String,
    pub method: String,
    pub paid_on: NaiveDate,
    pub amount: Decimal,
}

/// Cuenta por cobrar con saldo pendiente.
#[derive(Debug, Clone, Serialize)]
pub struct PendingReceivable {
    pub receivable_id: Id,
    pub student_id: Id,
    pub student_name: String,
    pub concept: String,
    pub due_date: Option<NaiveDate>,
    pub month: Option<u8>,
    pub balance: Decimal,
}

const RECEIVABLE_COLUMNS: &str = "r.id, r.student_id, r.concept_id, r.due_date, r.total, r.balance, r.paid, r.month";

fn map_fiscal_year(row: &Row<'_>) -> rusqlite::Result<FiscalYear> {
    Ok(FiscalYear {
        id: row.get(0)?,
        name: row.get(1)?,
        start_date: row.get(2)?,
        end_date: row.get(3)?,
        active: row.get(4)?,
    })
}

fn map_concept(row: &Row<'_>) -> rusqlite::Result<PaymentConcept> {
    Ok(PaymentConcept {
        id: row.get(0)?,
        fiscal_year_id: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        value: decimal_at(row, 4)?,
        recurring: row.get(5)?,
        active: row.get(6)?,
        blocks_report_card: row.get(7)?,
    })
}

fn map_receivable(row: &Row<'_>) -> rusqlite::Result<Receivable> {
    Ok(Receivable {
        id: row.get(0)?,
        student_id: row.get(1)?,
        concept_id: row.get(2)?,
        due_date: row.get(3)?,
        total: decimal_at(row, 4)?,
        balance: decimal_at(row, 5)?,
        paid: row.get(6)?,
        month: row.get(7)?,
    })
}

fn map_payment(row: &Row<'_>) -> rusqlite::Result<Payment> {
    Ok(Payment {
        id: row.get(0)?,
        receivable_id: row.get(1)?,
        paid_on: row.get(2)?,
        amount: decimal_at(row, 3)?,
        method: row.get(4)?,
        notes: row.get(5)?,
    })
}

impl Store {
    // --- años fiscales y conceptos ---

    pub fn create_fiscal_year(&self, tenant: &TenantContext, new: &NewFiscalYear) -> AppResult<FiscalYear> {
        validation::required("fiscal year name", &new.name)?;
        validation::date_range(new.start_date, new.end_date)?;
        let dup: Option<Id> = self
            .conn
            .query_row(
                "SELECT id FROM fiscal_years WHERE school_id = ?1 AND name = ?2",
                params![tenant.school_id(), new.name.trim()],
                |r| r.get(0),
            )
            .optional()?;
        if dup.is_some() {
            return Err(AppError::validation(format!("fiscal year '{}' already exists", new.name.trim())));
        }
        self.conn.execute(
            "INSERT INTO fiscal_years (school_id, name, start_date, end_date, active) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![tenant.school_id(), new.name.trim(), new.start_date, new.end_date, new.active],
        )?;
        self.fiscal_year(tenant, self.conn.last_insert_rowid())
    }

    pub fn fiscal_year(&self, tenant: &TenantContext, id: Id) -> AppResult<FiscalYear> {
        self.conn
            .query_row(
                "SELECT id, name, start_date, end_date, active FROM fiscal_years WHERE id = ?1 AND school_id = ?2",
                params![id, tenant.school_id()],
                map_fiscal_year,
            )
            .optional()?
            .ok_or_else(|| AppError::not_found("fiscal year"))
    }

    pub fn create_concept(&self, tenant: &TenantContext, new: &NewPaymentConcept) -> AppResult<PaymentConcept> {
        validation::required("concept name", &new.name)?;
        validation::non_negative_amount("concept value", new.value)?;
        self.ensure_owned(tenant, "fiscal_years", new.fiscal_year_id)?;
        let dup: Option<Id> = self
            .conn
            .query_row(
                "SELECT id FROM payment_concepts WHERE fiscal_year_id = ?1 AND name = ?2",
                params![new.fiscal_year_id, new.name.trim()],
                |r| r.get(0),
            )
            .optional()?;
        if dup.is_some() {
            return Err(AppError::validation(format!(
                "payment concept '{}' already exists for this fiscal year",
                new.name.trim()
            )));
        }
        self.conn.execute(
            "INSERT INTO payment_concepts
                (school_id, fiscal_year_id, name, description, value, recurring, active, blocks_report_card)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                tenant.school_id(),
                new.fiscal_year_id,
                new.name.trim(),
                new.description,
                dec_text(new.value),
                new.recurring,
                new.active,
                new.blocks_report_card
            ],
        )?;
        self.concept(tenant, self.conn.last_insert_rowid())
    }

    pub fn concept(&self, tenant: &TenantContext, id: Id) -> AppResult<PaymentConcept> {
        self.conn
            .query_row(
                "SELECT id, fiscal_year_id, name, description, value, recurring, active, blocks_report_card
                 FROM payment_concepts WHERE id = ?1 AND school_id = ?2",
                params![id, tenant.school_id()],
                map_concept,
            )
            .optional()?
            .ok_or_else(|| AppError::not_found("payment concept"))
    }

    // --- cuentas por cobrar ---

    pub fn create_receivable(&self, tenant: &TenantContext, new: &NewReceivable) -> AppResult<Receivable> {
        self.ensure_owned(tenant, "students", new.student_id)?;
        self.ensure_owned(tenant, "payment_concepts", new.concept_id)?;
        validation::non_negative_amount("total", new.total)?;
        if let Some(month) = new.month {
            validation::month(month)?;
        }
        let balance = new.balance.unwrap_or(new.total);
        validation::non_negative_amount("balance", balance)?;
        if balance > new.total {
            return Err(AppError::validation("balance must not exceed the total"));
        }
        self.insert_receivable(tenant, new.student_id, new.concept_id, new.due_date, new.total, balance, new.month)
    }

    #[allow(clippy::too_many_arguments)]
    fn insert_receivable(
        &self,
        tenant: &TenantContext,
        student_id: Id,
        concept_id: Id,
        due_date: Option<NaiveDate>,
        total: Decimal,
        balance: Decimal,
        month: Option<u8>,
    ) -> AppResult<Receivable> {
        let paid = balance.is_zero();
        self.conn.execute(
            "INSERT INTO receivables (school_id, student_id, concept_id, created_on, due_date, total, balance, paid, month)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                tenant.school_id(),
                student_id,
                concept_id,
                Utc::now().date_naive(),
                due_date,
                dec_text(total),
                dec_text(balance),
                paid,
                month
            ],
        )?;
        self.receivable(tenant, self.conn.last_insert_rowid())
    }

    pub fn receivable(&self, tenant: &TenantContext, id: Id) -> AppResult<Receivable> {
        let sql = format!("SELECT {} FROM receivables r WHERE r.id = ?1 AND r.school_id = ?2", RECEIVABLE_COLUMNS);
        self.conn
            .query_row(&sql, params![id, tenant.school_id()], map_receivable)
            .optional()?
            .ok_or_else(|| AppError::not_found("receivable"))
    }

    pub fn receivables_for_student(&self, tenant: &TenantContext, student_id: Id) -> AppResult<Vec<Receivable>> {
        let sql = format!(
            "SELECT {} FROM receivables r WHERE r.student_id = ?1 AND r.school_id = ?2 ORDER BY r.due_date, r.id",
            RECEIVABLE_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![student_id, tenant.school_id()], map_receivable)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Cuentas del estudiante junto con el flag `blocks_report_card` de su concepto,
    /// opcionalmente limitadas a un año fiscal.
    pub fn receivables_with_blocking_flag(
        &self,
        tenant: &TenantContext,
        student_id: Id,
        fiscal_year_id: Option<Id>,
    ) -> AppResult<Vec<(Receivable, bool)>> {
        let sql = format!(
            "SELECT {}, c.blocks_report_card FROM receivables r
             JOIN payment_concepts c ON c.id = r.concept_id
             WHERE r.student_id = ?1 AND r.school_id = ?2 AND (?3 IS NULL OR c.fiscal_year_id = ?3)
             ORDER BY r.due_date, r.id",
            RECEIVABLE_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![student_id, tenant.school_id(), fiscal_year_id], |r| {
            Ok((map_receivable(r)?, r.get::<_, bool>(8)?))
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Genera el cobro mensual de un concepto para los estudiantes seleccionados
    /// matriculados en el curso. Omite a quien ya tiene el cobro de ese mes.
    pub fn generate_monthly_charges(&self, tenant: &TenantContext, req: &MonthlyCharges) -> AppResult<usize> {
        validation::month(req.month)?;
        let fiscal_year = self.fiscal_year(tenant, req.fiscal_year_id)?;
        let concept = self.concept(tenant, req.concept_id)?;
        if concept.fiscal_year_id != fiscal_year.id {
            return Err(AppError::validation("the concept does not belong to the fiscal year"));
        }
        self.ensure_owned(tenant, "courses", req.course_id)?;
        let due_date = billing::monthly_due_date(&fiscal_year, req.month)?;

        let tx = self.conn.unchecked_transaction()?;
        let mut created = 0usize;
        for student_id in &req.student_ids {
            let student = self.student(tenant, *student_id)?;
            if student.course_id != Some(req.course_id) {
                continue;
            }
            let existing: Option<Id> = self
                .conn
                .query_row(
                    "SELECT id FROM receivables
                     WHERE student_id = ?1 AND concept_id = ?2 AND month = ?3 AND school_id = ?4",
                    params![student.id, concept.id, req.month, tenant.school_id()],
                    |r| r.get(0),
                )
                .optional()?;
            if existing.is_some() {
                continue;
            }
            self.insert_receivable(tenant, student.id, concept.id, Some(due_date), concept.value, concept.value, Some(req.month))?;
            created += 1;
        }
        tx.commit()?;
        info!(concept_id = concept.id, month = req.month, created, "monthly charges generated");
        Ok(created)
    }

    fn set_balance(&self, tenant: &TenantContext, receivable_id: Id, change: BalanceChange) -> AppResult<()> {
        self.conn.execute(
            "UPDATE receivables SET balance = ?1, paid = ?2 WHERE id = ?3 AND school_id = ?4",
            params![dec_text(change.balance), change.paid, receivable_id, tenant.school_id()],
        )?;
        Ok(())
    }

    // --- pagos ---

    pub fn payment(&self, tenant: &TenantContext, id: Id) -> AppResult<Payment> {
        self.conn
            .query_row(
                "SELECT id, receivable_id, paid_on, amount, method, notes FROM payments WHERE id = ?1 AND school_id = ?2",
                params![id, tenant.school_id()],
                map_payment,
            )
            .optional()?
            .ok_or_else(|| AppError::not_found("payment"))
    }

    pub fn payments_for_receivable(&self, tenant: &TenantContext, receivable_id: Id) -> AppResult<Vec<Payment>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, receivable_id, paid_on, amount, method, notes FROM payments
             WHERE receivable_id = ?1 AND school_id = ?2 ORDER BY paid_on, id",
        )?;
        let rows = stmt.query_map(params![receivable_id, tenant.school_id()], map_payment)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Registra un pago y descuenta el saldo en una sola transacción.
    pub fn post_payment(&self, tenant: &TenantContext, new: &NewPayment) -> AppResult<Payment> {
        validation::required("payment method", &new.method)?;
        let tx = self.conn.unchecked_transaction()?;
        let receivable = self.receivable(tenant, new.receivable_id)?;
        let change = billing::apply_payment(receivable.balance, new.amount)?;
        let paid_on = new.paid_on.unwrap_or_else(|| Utc::now().date_naive());
        self.conn.execute(
            "INSERT INTO payments (school_id, receivable_id, paid_on, amount, method, notes)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![tenant.school_id(), receivable.id, paid_on, dec_text(new.amount), new.method.trim(), new.notes],
        )?;
        let payment_id = self.conn.last_insert_rowid();
        self.set_balance(tenant, receivable.id, change)?;
        tx.commit()?;
        info!(receivable_id = receivable.id, amount = %new.amount, balance = %change.balance, "payment posted");
        self.payment(tenant, payment_id)
    }

    /// Cambia el valor de un pago ajustando el saldo por la diferencia.
    pub fn update_payment(&self, tenant: &TenantContext, id: Id, update: &PaymentUpdate) -> AppResult<Payment> {
        let tx = self.conn.unchecked_transaction()?;
        let payment = self.payment(tenant, id)?;
        let receivable = self.receivable(tenant, payment.receivable_id)?;
        let change = billing::apply_payment_change(receivable.balance, payment.amount, update.amount)?;
        let method = update.method.as_deref().map(str::trim).unwrap_or(&payment.method);
        validation::required("payment method", method)?;
        let notes = update.notes.clone().or(payment.notes.clone());
        self.conn.execute(
            "UPDATE payments SET amount = ?1, method = ?2, notes = ?3 WHERE id = ?4 AND school_id = ?5",
            params![dec_text(update.amount), method, notes, id, tenant.school_id()],
        )?;
        self.set_balance(tenant, receivable.id, change)?;
        tx.commit()?;
        info!(payment_id = id, old = %payment.amount, new = %update.amount, "payment updated");
        self.payment(tenant, id)
    }

    /// Anula un pago y devuelve su valor al saldo.
    pub fn delete_payment(&self, tenant: &TenantContext, id: Id) -> AppResult<Receivable> {
        let tx = self.conn.unchecked_transaction()?;
        let payment = self.payment(tenant, id)?;
        let receivable = self.receivable(tenant, payment.receivable_id)?;
        let change = billing::revert_payment(receivable.balance, payment.amount);
        self.conn
            .execute("DELETE FROM payments WHERE id = ?1 AND school_id = ?2", params![id, tenant.school_id()])?;
        self.set_balance(tenant, receivable.id, change)?;
        tx.commit()?;
        info!(payment_id = id, amount = %payment.amount, "payment deleted");
        self.receivable(tenant, receivable.id)
    }

    // --- consultas para reportes ---

    pub fn payment_rows(&self, tenant: &TenantContext) -> AppResult<Vec<PaymentRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT p.id, f.id, f.name, c.id, c.name, p.method, p.paid_on, p.amount
             FROM payments p
             JOIN receivables r ON r.id = p.receivable_id
             JOIN payment_concepts c ON c.id = r.concept_id
             JOIN fiscal_years f ON f.id = c.fiscal_year_id
             WHERE p.school_id = ?1
             ORDER BY p.paid_on, p.id",
        )?;
        let rows = stmt.query_map(params![tenant.school_id()], |r| {
            Ok(PaymentRow {
                payment_id: r.get(0)?,
                fiscal_year_id: r.get(1)?,
                fiscal_year: r.get(2)?,
                concept_id: r.get(3)?,
                concept: r.get(4)?,
                method: r.get(5)?,
                paid_on: r.get(6)?,
                amount: decimal_at(r, 7)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Cuentas no pagadas con saldo, ordenadas por vencimiento.
    pub fn pending_receivables(&self, tenant: &TenantContext) -> AppResult<Vec<PendingReceivable>> {
        let mut stmt = self.conn.prepare(
            "SELECT r.id, s.id, s.last_names || ' ' || s.first_names, c.name, r.due_date, r.month, r.balance
             FROM receivables r
             JOIN students s ON s.id = r.student_id
             JOIN payment_concepts c ON c.id = r.concept_id
             WHERE r.school_id = ?1 AND r.paid = 0
             ORDER BY r.due_date IS NULL, r.due_date, s.last_names, s.first_names",
        )?;
        let rows = stmt.query_map(params![tenant.school_id()], |r| {
            Ok(PendingReceivable {
                receivable_id: r.get(0)?,
                student_id: r.get(1)?,
                student_name: r.get(2)?,
                concept: r.get(3)?,
                due_date: r.get(4)?,
                month: r.get(5)?,
                balance: decimal_at(r, 6)?,
            })
        })?;
        let all = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(all.into_iter().filter(|p| p.balance > Decimal::ZERO).collect())
    }
}
