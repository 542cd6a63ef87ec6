// Estructuras de datos principales

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::grading::mean_rounded;

pub type Id = i64;

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct School {
    pub id: Id,
    pub name: String,
    /// Dominio usado para resolver el colegio a partir del `Host` de la petición.
    pub domain: String,
    pub slogan: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewSchool {
    pub name: String,
    pub domain: String,
    #[serde(default)]
    pub slogan: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcademicYear {
    pub id: Id,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub active: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewAcademicYear {
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default = "default_true")]
    pub active: bool,
}

/// Periodo (trimestre) de un año lectivo. `weight` es el % del año.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Period {
    pub id: Id,
    pub year_id: Id,
    pub number: u8,
    pub name: String,
    pub weight: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewPeriod {
    pub number: u8,
    pub name: String,
    pub weight: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Course {
    pub id: Id,
    pub grade: String,
    pub name: String,
    pub shift: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewCourse {
    pub grade: String,
    pub name: String,
    #[serde(default)]
    pub shift: Option<String>,
}

/// Asignatura del catálogo global del colegio.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subject {
    pub id: Id,
    pub name: String,
    pub area: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewSubject {
    pub name: String,
    #[serde(default)]
    pub area: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Teacher {
    pub id: Id,
    pub first_names: String,
    pub last_names: String,
    pub identification: String,
    pub email: Option<String>,
}

impl Teacher {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.last_names, self.first_names)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewTeacher {
    pub first_names: String,
    pub last_names: String,
    pub identification: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum DocumentType {
    #[default]
    #[serde(rename = "RC")]
    CivilRegistry,
    #[serde(rename = "TI")]
    IdentityCard,
    #[serde(rename = "CC")]
    CitizenCard,
}

impl DocumentType {
    pub fn code(&self) -> &'static str {
        match self {
            DocumentType::CivilRegistry => "RC",
            DocumentType::IdentityCard => "TI",
            DocumentType::CitizenCard => "CC",
        }
    }

    /// Abreviatura para certificados: R.C., T.I., C.C.
    pub fn label(&self) -> &'static str {
        match self {
            DocumentType::CivilRegistry => "R.C.",
            DocumentType::IdentityCard => "T.I.",
            DocumentType::CitizenCard => "C.C.",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "RC" => Some(DocumentType::CivilRegistry),
            "TI" => Some(DocumentType::IdentityCard),
            "CC" => Some(DocumentType::CitizenCard),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Student {
    pub id: Id,
    pub first_names: String,
    pub last_names: String,
    pub document_type: DocumentType,
    pub identification: String,
    pub birth_date: NaiveDate,
    pub course_id: Option<Id>,
    pub guardian: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewStudent {
    pub first_names: String,
    pub last_names: String,
    #[serde(default)]
    pub document_type: DocumentType,
    pub identification: String,
    pub birth_date: NaiveDate,
    #[serde(default)]
    pub course_id: Option<Id>,
    #[serde(default)]
    pub guardian: Option<String>,
}

/// Matrícula de un estudiante en un curso para un año lectivo.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Enrollment {
    pub id: Id,
    pub student_id: Id,
    pub year_id: Id,
    pub course_id: Id,
    pub active: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewEnrollment {
    pub student_id: Id,
    pub year_id: Id,
    pub course_id: Id,
}

/// Promoción masiva de matrículas de (año, curso) origen a (año, curso) destino.
#[derive(Debug, Clone, Deserialize)]
pub struct EnrollmentPromotion {
    pub from_year_id: Id,
    pub from_course_id: Id,
    pub to_year_id: Id,
    pub to_course_id: Id,
    pub student_ids: Vec<Id>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PromotionOutcome {
    pub created: usize,
    /// Ya matriculados en el año destino, o sin matrícula activa en el origen.
    pub skipped: usize,
}

/// Asignatura ofertada a un curso en un año lectivo.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseOffering {
    pub id: Id,
    pub year_id: Id,
    pub course_id: Id,
    pub subject_id: Id,
    pub teacher_id: Option<Id>,
    pub weekly_hours: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewCourseOffering {
    pub year_id: Id,
    pub course_id: Id,
    pub subject_id: Id,
    #[serde(default)]
    pub teacher_id: Option<Id>,
    #[serde(default)]
    pub weekly_hours: u32,
}

/// Tipo de logro. Solo los logros prácticos ("hacer") tienen actividades.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AchievementKind {
    #[default]
    Standard,
    Practical,
}

impl AchievementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AchievementKind::Standard => "standard",
            AchievementKind::Practical => "practical",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "standard" => Some(AchievementKind::Standard),
            "practical" => Some(AchievementKind::Practical),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Achievement {
    pub id: Id,
    pub offering_id: Id,
    pub period_id: Id,
    pub title: String,
    pub description: Option<String>,
    pub weight: Decimal,
    pub kind: AchievementKind,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewAchievement {
    pub offering_id: Id,
    pub period_id: Id,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub weight: Decimal,
    #[serde(default)]
    pub kind: AchievementKind,
}

/// Resultado de guardar un logro: el logro más la suma de pesos de su grupo
/// (oferta, periodo). `warning` no bloquea el guardado.
#[derive(Debug, Clone, Serialize)]
pub struct AchievementSaved {
    pub achievement: Achievement,
    pub weight_total: Decimal,
    pub warning: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    pub id: Id,
    pub achievement_id: Id,
    pub title: String,
    pub weight: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewActivity {
    pub title: String,
    #[serde(default)]
    pub weight: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Grade {
    pub student_id: Id,
    pub achievement_id: Id,
    pub value: Decimal,
    pub notes: Option<String>,
}

/// Fila de captura de notas. `value: None` borra la nota existente.
#[derive(Debug, Clone, Deserialize)]
pub struct GradeEntry {
    pub student_id: Id,
    #[serde(default)]
    pub value: Option<Decimal>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityGrade {
    pub student_id: Id,
    pub activity_id: Id,
    pub value: Decimal,
}

/// "Saber Ser": hasta tres sub-notas por (estudiante, oferta, periodo).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BehavioralScore {
    pub student_id: Id,
    pub offering_id: Id,
    pub period_id: Id,
    pub behavior: Option<Decimal>,
    pub responsibility: Option<Decimal>,
    pub self_evaluation: Option<Decimal>,
}

impl BehavioralScore {
    /// Valor único usado en la mezcla 10/90: promedio de las sub-notas presentes.
    pub fn value(&self) -> Option<Decimal> {
        let present: Vec<Decimal> = [self.behavior, self.responsibility, self.self_evaluation]
            .into_iter()
            .flatten()
            .collect();
        mean_rounded(&present)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BehavioralEntry {
    pub student_id: Id,
    #[serde(default)]
    pub behavior: Option<Decimal>,
    #[serde(default)]
    pub responsibility: Option<Decimal>,
    #[serde(default)]
    pub self_evaluation: Option<Decimal>,
}

impl BehavioralEntry {
    pub fn is_empty(&self) -> bool {
        self.behavior.is_none() && self.responsibility.is_none() && self.self_evaluation.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportObservation {
    pub student_id: Id,
    pub period_id: Id,
    pub teacher_id: Option<Id>,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttendanceStatus {
    #[serde(rename = "P")]
    Present,
    #[serde(rename = "A")]
    Absent,
    #[serde(rename = "J")]
    Excused,
    #[serde(rename = "T")]
    Late,
}

impl AttendanceStatus {
    pub fn code(&self) -> &'static str {
        match self {
            AttendanceStatus::Present => "P",
            AttendanceStatus::Absent => "A",
            AttendanceStatus::Excused => "J",
            AttendanceStatus::Late => "T",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RollCall {
    pub id: Id,
    pub year_id: Id,
    pub course_id: Id,
    pub period_id: Id,
    pub date: NaiveDate,
    pub teacher_id: Option<Id>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AttendanceEntryInput {
    pub student_id: Id,
    #[serde(default)]
    pub status: Option<AttendanceStatus>,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewRollCall {
    pub year_id: Id,
    pub course_id: Id,
    pub period_id: Id,
    pub date: NaiveDate,
    #[serde(default)]
    pub teacher_id: Option<Id>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub entries: Vec<AttendanceEntryInput>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AttendanceSummary {
    pub absences: u32,
    pub lates: u32,
}

// --- Cartera ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FiscalYear {
    pub id: Id,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub active: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewFiscalYear {
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default = "default_true")]
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentConcept {
    pub id: Id,
    pub fiscal_year_id: Id,
    pub name: String,
    pub description: Option<String>,
    pub value: Decimal,
    pub recurring: bool,
    pub active: bool,
    /// Si hay deuda vencida de este concepto, bloquea el boletín.
    pub blocks_report_card: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewPaymentConcept {
    pub fiscal_year_id: Id,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub value: Decimal,
    #[serde(default)]
    pub recurring: bool,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default = "default_true")]
    pub blocks_report_card: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Receivable {
    pub id: Id,
    pub student_id: Id,
    pub concept_id: Id,
    pub due_date: Option<NaiveDate>,
    pub total: Decimal,
    pub balance: Decimal,
    pub paid: bool,
    pub month: Option<u8>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewReceivable {
    pub student_id: Id,
    pub concept_id: Id,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    pub total: Decimal,
    /// Si no se envía, el saldo inicial es el valor total.
    #[serde(default)]
    pub balance: Option<Decimal>,
    #[serde(default)]
    pub month: Option<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: Id,
    pub receivable_id: Id,
    pub paid_on: NaiveDate,
    pub amount: Decimal,
    pub method: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewPayment {
    pub receivable_id: Id,
    pub amount: Decimal,
    pub method: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub paid_on: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentUpdate {
    pub amount: Decimal,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonthlyCharges {
    pub fiscal_year_id: Id,
    pub course_id: Id,
    pub concept_id: Id,
    pub month: u8,
    pub student_ids: Vec<Id>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn behavioral_value_averages_present_subscores() {
        let score = BehavioralScore {
            student_id: 1,
            offering_id: 1,
            period_id: 1,
            behavior: Some(dec("5.0")),
            responsibility: None,
            self_evaluation: Some(dec("4.0")),
        };
        assert_eq!(score.value(), Some(dec("4.50")));
    }

    #[test]
    fn behavioral_value_absent_when_all_subscores_missing() {
        let score = BehavioralScore {
            student_id: 1,
            offering_id: 1,
            period_id: 1,
            behavior: None,
            responsibility: None,
            self_evaluation: None,
        };
        assert_eq!(score.value(), None);
    }

    #[test]
    fn kinds_and_statuses_deserialize_from_short_codes() {
        let kind: AchievementKind = serde_json::from_str("\"practical\"").unwrap();
        assert_eq!(kind, AchievementKind::Practical);
        let status: AttendanceStatus = serde_json::from_str("\"T\"").unwrap();
        assert_eq!(status, AttendanceStatus::Late);
        assert_eq!(DocumentType::from_code("TI"), Some(DocumentType::IdentityCard));
    }
}
