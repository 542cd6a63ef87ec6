use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::Serialize;

use super::round2;
use crate::models::Id;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedEntry {
    pub student_id: Id,
    pub score: Decimal,
    pub rank: u32,
}

/// Puestos de un curso, ordenados de mayor a menor promedio.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Ranking {
    pub entries: Vec<RankedEntry>,
}

impl Ranking {
    pub fn rank_of(&self, student_id: Id) -> Option<u32> {
        self.entries.iter().find(|e| e.student_id == student_id).map(|e| e.rank)
    }

    pub fn as_map(&self) -> HashMap<Id, u32> {
        self.entries.iter().map(|e| (e.student_id, e.rank)).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Ranking de competición ("1, 1, 3"): los empatados comparten el puesto del
/// primero del grupo y el siguiente salta a su posición.
pub fn competition_ranking(scores: Vec<(Id, Decimal)>) -> Ranking {
    let mut scores: Vec<(Id, Decimal)> = scores.into_iter().map(|(id, s)| (id, round2(s))).collect();
    scores.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

    let mut entries = Vec::with_capacity(scores.len());
    let mut last: Option<Decimal> = None;
    let mut rank = 0u32;
    for (idx, (student_id, score)) in scores.into_iter().enumerate() {
        if last != Some(score) {
            rank = idx as u32 + 1;
            last = Some(score);
        }
        entries.push(RankedEntry { student_id, score, rank });
    }
    Ranking { entries }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn ties_share_rank_and_skip_the_next() {
        let ranking = competition_ranking(vec![(1, dec("4.5")), (2, dec("4.5")), (3, dec("4.0"))]);
        assert_eq!(ranking.as_map(), HashMap::from([(1, 1), (2, 1), (3, 3)]));
    }

    #[test]
    fn order_is_descending_and_deterministic() {
        let ranking = competition_ranking(vec![(9, dec("3.1")), (4, dec("4.2")), (2, dec("3.1"))]);
        let order: Vec<Id> = ranking.entries.iter().map(|e| e.student_id).collect();
        assert_eq!(order, vec![4, 2, 9]);
        assert_eq!(ranking.rank_of(9), Some(2));
        assert_eq!(ranking.rank_of(7), None);
    }

    #[test]
    fn scores_tie_after_rounding() {
        let ranking = competition_ranking(vec![(1, dec("4.004")), (2, dec("4.001"))]);
        assert_eq!(ranking.rank_of(1), Some(1));
        assert_eq!(ranking.rank_of(2), Some(1));
    }

    #[test]
    fn empty_input_gives_empty_ranking() {
        assert!(competition_ranking(Vec::new()).is_empty());
    }
}
