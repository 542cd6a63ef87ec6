use std::collections::HashMap;

use rust_decimal::Decimal;
use tracing::warn;

use super::{mean_rounded, round2};
use crate::models::{AchievementKind, Activity, Id};

/// Qué hacer con la nota del logro tras recalcular sus actividades.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RollupOutcome {
    /// Logro no práctico: la nota se captura a mano.
    Unchanged,
    /// No hay actividades calificadas: se elimina la nota.
    Clear,
    Set(Decimal),
}

/// Consolida las notas de actividades de un estudiante en la nota del logro.
///
/// Se usa el modo ponderado solo cuando los pesos de las actividades calificadas
/// suman exactamente 100 y además todas las actividades con peso están
/// calificadas. En cualquier otro caso se usa la media simple.
pub fn rollup_activities(
    kind: AchievementKind,
    activities: &[Activity],
    grades: &HashMap<Id, Decimal>,
) -> RollupOutcome {
    if kind != AchievementKind::Practical {
        return RollupOutcome::Unchanged;
    }

    let graded: Vec<(&Activity, Decimal)> = activities
        .iter()
        .filter_map(|a| grades.get(&a.id).map(|g| (a, *g)))
        .collect();
    if graded.is_empty() {
        return RollupOutcome::Clear;
    }

    let hundred = Decimal::ONE_HUNDRED;
    let graded_weight: Decimal = graded.iter().map(|(a, _)| a.weight).sum();
    let total_weight: Decimal = activities.iter().map(|a| a.weight).sum();

    if graded_weight == hundred && total_weight == hundred {
        let value: Decimal = graded.iter().map(|(a, g)| *g * a.weight / hundred).sum();
        return RollupOutcome::Set(round2(value));
    }

    if graded_weight == hundred {
        // el resto de actividades tiene peso pero no nota
        warn!(
            graded = graded.len(),
            total = activities.len(),
            %total_weight,
            "activity weights of graded rows sum to 100 while weighted activities remain ungraded; using mean"
        );
    }

    let values: Vec<Decimal> = graded.iter().map(|(_, g)| *g).collect();
    match mean_rounded(&values) {
        Some(v) => RollupOutcome::Set(v),
        None => RollupOutcome::Clear,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn activity(id: Id, weight: &str) -> Activity {
        Activity { id, achievement_id: 1, title: format!("act {id}"), weight: dec(weight) }
    }

    #[test]
    fn standard_achievements_are_left_alone() {
        let acts = vec![activity(1, "100")];
        let grades = HashMap::from([(1, dec("4.0"))]);
        assert_eq!(rollup_activities(AchievementKind::Standard, &acts, &grades), RollupOutcome::Unchanged);
    }

    #[test]
    fn weighted_when_every_weighted_activity_is_graded() {
        let acts = vec![activity(1, "70"), activity(2, "30")];
        let grades = HashMap::from([(1, dec("4.0")), (2, dec("3.0"))]);
        assert_eq!(
            rollup_activities(AchievementKind::Practical, &acts, &grades),
            RollupOutcome::Set(dec("3.70"))
        );
    }

    #[test]
    fn mean_when_weights_do_not_add_up() {
        let acts = vec![activity(1, "50"), activity(2, "20"), activity(3, "0")];
        let grades = HashMap::from([(1, dec("4.0")), (2, dec("3.0"))]);
        assert_eq!(
            rollup_activities(AchievementKind::Practical, &acts, &grades),
            RollupOutcome::Set(dec("3.50"))
        );
    }

    #[test]
    fn mean_when_weighted_activities_are_still_ungraded() {
        let acts = vec![activity(1, "100"), activity(2, "50")];
        let grades = HashMap::from([(1, dec("4.5"))]);
        assert_eq!(
            rollup_activities(AchievementKind::Practical, &acts, &grades),
            RollupOutcome::Set(dec("4.50"))
        );
    }

    #[test]
    fn nothing_graded_clears_the_grade() {
        let acts = vec![activity(1, "100")];
        assert_eq!(
            rollup_activities(AchievementKind::Practical, &acts, &HashMap::new()),
            RollupOutcome::Clear
        );
        assert_eq!(rollup_activities(AchievementKind::Practical, &[], &HashMap::new()), RollupOutcome::Clear);
    }
}
