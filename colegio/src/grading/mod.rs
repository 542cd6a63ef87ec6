// Calculadores de notas: funciones puras sobre `Decimal`.
//
// Los datos ausentes se representan con `None`; ningún calculador falla.

pub mod gradebook;
pub mod ranking;
pub mod rollup;

use rust_decimal::{Decimal, RoundingStrategy};
use tracing::debug;

pub use gradebook::GradeBook;
pub use ranking::{competition_ranking, RankedEntry, Ranking};
pub use rollup::{rollup_activities, RollupOutcome};

/// Peso del "Saber Ser" en la nota de la asignatura.
pub const BEHAVIORAL_WEIGHT: Decimal = Decimal::from_parts(10, 0, 0, false, 2);
/// Peso del promedio de logros en la nota de la asignatura.
pub const ACHIEVEMENTS_WEIGHT: Decimal = Decimal::from_parts(90, 0, 0, false, 2);

/// Nota mínima y máxima de la escala.
pub const MIN_GRADE: Decimal = Decimal::ZERO;
pub const MAX_GRADE: Decimal = Decimal::from_parts(5, 0, 0, false, 0);

/// Redondeo a dos decimales, mitad hacia arriba. Siempre deja escala 2.
pub fn round2(value: Decimal) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded
}

/// Promedio ponderado de logros calificados: `(peso, nota)` con peso en %.
///
/// Devuelve `None` si no hay logros o si la suma de pesos es cero.
pub fn weighted_achievement_average<I>(items: I) -> Option<Decimal>
where
    I: IntoIterator<Item = (Decimal, Decimal)>,
{
    let mut weighted_sum = Decimal::ZERO;
    let mut weight_sum = Decimal::ZERO;
    for (weight, grade) in items {
        let fraction = weight / Decimal::ONE_HUNDRED;
        weighted_sum += grade * fraction;
        weight_sum += fraction;
    }
    if weight_sum.is_zero() {
        return None;
    }
    Some(round2(weighted_sum / weight_sum))
}

/// Mezcla 90/10 con el "Saber Ser". Sin puntaje, el promedio queda igual.
pub fn blend_behavioral(average: Decimal, behavioral: Option<Decimal>) -> Decimal {
    match behavioral {
        Some(score) => round2(average * ACHIEVEMENTS_WEIGHT + score * BEHAVIORAL_WEIGHT),
        None => average,
    }
}

/// Nota de una asignatura en un periodo para un estudiante.
///
/// `achievements` son los `(id, peso)` del periodo y `grade_of` busca la nota del
/// estudiante para cada logro. Los logros sin nota no cuentan.
pub fn subject_period_average<F>(
    achievements: &[(i64, Decimal)],
    grade_of: F,
    behavioral: Option<Decimal>,
) -> Option<Decimal>
where
    F: Fn(i64) -> Option<Decimal>,
{
    let graded = achievements
        .iter()
        .filter_map(|(id, weight)| grade_of(*id).map(|g| (*weight, g)));
    let average = weighted_achievement_average(graded)?;
    let blended = blend_behavioral(average, behavioral);
    debug!(%average, %blended, "subject period average");
    Some(blended)
}

/// Media aritmética redondeada; `None` si no hay valores.
pub fn mean_rounded(values: &[Decimal]) -> Option<Decimal> {
    if values.is_empty() {
        return None;
    }
    let total: Decimal = values.iter().copied().sum();
    Some(round2(total / Decimal::from(values.len())))
}

/// Concepto cualitativo del boletín.
pub fn concept_letter(average: Option<Decimal>) -> &'static str {
    let Some(avg) = average else {
        return "N.A.";
    };
    if avg >= Decimal::new(460, 2) {
        "S"
    } else if avg >= Decimal::new(400, 2) {
        "A"
    } else if avg >= Decimal::new(300, 2) {
        "B"
    } else {
        "D"
    }
}

/// `true` si la nota está dentro de la escala 0..=5.
pub fn is_valid_grade(value: Decimal) -> bool {
    value >= MIN_GRADE && value <= MAX_GRADE
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn weighted_average_of_two_achievements() {
        let avg = weighted_achievement_average(vec![(dec("60"), dec("4.0")), (dec("40"), dec("3.0"))]);
        assert_eq!(avg, Some(dec("3.60")));
    }

    #[test]
    fn ungraded_achievement_renormalises_over_graded_weight() {
        // solo el logro de 60% tiene nota
        let weights = [(1, dec("60")), (2, dec("40"))];
        let avg = subject_period_average(&weights, |id| (id == 1).then(|| dec("4.0")), None);
        assert_eq!(avg, Some(dec("4.00")));
    }

    #[test]
    fn blending_with_behavioral_score() {
        let weights = [(1, dec("60")), (2, dec("40"))];
        let grades = |id| match id {
            1 => Some(dec("4.0")),
            2 => Some(dec("3.0")),
            _ => None,
        };
        assert_eq!(subject_period_average(&weights, grades, Some(dec("5.0"))), Some(dec("3.74")));
    }

    #[test]
    fn zero_weights_give_no_average() {
        assert_eq!(weighted_achievement_average(vec![(dec("0"), dec("4.5"))]), None);
        assert_eq!(weighted_achievement_average(Vec::new()), None);
        let weights = [(1, dec("50"))];
        assert_eq!(subject_period_average(&weights, |_| None, Some(dec("5"))), None);
    }

    #[test]
    fn rounding_is_half_up() {
        assert_eq!(round2(dec("3.625")), dec("3.63"));
        assert_eq!(round2(dec("3.635")), dec("3.64"));
        assert_eq!(round2(dec("4")).to_string(), "4.00");
    }

    #[test]
    fn mean_and_letters() {
        assert_eq!(mean_rounded(&[]), None);
        assert_eq!(mean_rounded(&[dec("4.0"), dec("3.5"), dec("3.0")]), Some(dec("3.50")));
        assert_eq!(concept_letter(Some(dec("4.60"))), "S");
        assert_eq!(concept_letter(Some(dec("4.59"))), "A");
        assert_eq!(concept_letter(Some(dec("3.00"))), "B");
        assert_eq!(concept_letter(Some(dec("2.99"))), "D");
        assert_eq!(concept_letter(None), "N.A.");
    }
}
