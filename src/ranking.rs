//! Per-player point totals.
//!
//! Book rows carry points exactly as they were submitted, so a value may be a
//! number, a numeric string, or junk. Totals are recomputed from those rows on
//! every request.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;

use crate::models::Points;

/// Numeric reading of a submitted value; anything non-numeric counts as zero.
pub fn coerce_points(value: &Value) -> f64 {
    let number = match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse::<f64>().unwrap_or(0.0),
        Value::Null | Value::Bool(_) | Value::Array(_) | Value::Object(_) => 0.0,
    };

    if number.is_finite() {
        number
    } else {
        0.0
    }
}

/// One book's contribution to a player's total.
#[derive(Debug, Clone)]
pub struct Contribution {
    pub player_id: String,
    pub player_name: Option<String>,
    pub points: Value,
}

impl Contribution {
    pub fn new(player_id: impl Into<String>, points: Value) -> Self {
        Self {
            player_id: player_id.into(),
            player_name: None,
            points,
        }
    }

    pub fn named(mut self, player_name: Option<String>) -> Self {
        self.player_name = player_name;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankingEntry {
    pub player_id: String,
    pub player_name: Option<String>,
    pub total_points: Points,
}

/// Sum contributions per player and order by total, highest first.
///
/// Equal totals are ordered by player id ascending so the output never
/// depends on row order.
pub fn aggregate<I>(contributions: I) -> Vec<RankingEntry>
where
    I: IntoIterator<Item = Contribution>,
{
    let mut totals: HashMap<String, RankingEntry> = HashMap::new();

    for contribution in contributions {
        let points = coerce_points(&contribution.points);
        let entry = totals
            .entry(contribution.player_id.clone())
            .or_insert_with(|| RankingEntry {
                player_id: contribution.player_id,
                player_name: None,
                total_points: Points::default(),
            });

        entry.total_points.0 += points;
        if entry.player_name.is_none() {
            entry.player_name = contribution
                .player_name
                .filter(|name| !name.trim().is_empty());
        }
    }

    let mut ranking: Vec<RankingEntry> = totals.into_values().collect();
    sort_by_total(&mut ranking, |entry| (entry.total_points, &entry.player_id));
    ranking
}

/// Total descending, then key ascending.
pub(crate) fn sort_by_total<T, F>(items: &mut [T], key: F)
where
    F: Fn(&T) -> (Points, &String),
{
    items.sort_by(|a, b| {
        let (a_total, a_id) = key(a);
        let (b_total, b_id) = key(b);
        b_total
            .value()
            .total_cmp(&a_total.value())
            .then_with(|| a_id.cmp(b_id))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn totals(ranking: &[RankingEntry]) -> Vec<(&str, f64)> {
        ranking
            .iter()
            .map(|entry| (entry.player_id.as_str(), entry.total_points.value()))
            .collect()
    }

    #[test]
    fn sums_mixed_number_and_string_points() {
        let ranking = aggregate([
            Contribution::new("Ana", json!(10)),
            Contribution::new("Ben", json!(5)),
            Contribution::new("Ana", json!("7")),
        ]);

        assert_eq!(totals(&ranking), vec![("Ana", 17.0), ("Ben", 5.0)]);
    }

    #[test]
    fn non_numeric_points_count_as_zero() {
        let ranking = aggregate([
            Contribution::new("Ana", json!("lots")),
            Contribution::new("Ana", json!(null)),
            Contribution::new("Ana", json!(true)),
            Contribution::new("Ana", json!([3])),
            Contribution::new("Ana", json!("NaN")),
            Contribution::new("Ana", json!(" 2.5 ")),
        ]);

        assert_eq!(totals(&ranking), vec![("Ana", 2.5)]);
    }

    #[test]
    fn ties_are_broken_by_player_id() {
        let ranking = aggregate([
            Contribution::new("cara", json!(4)),
            Contribution::new("ben", json!(9)),
            Contribution::new("abe", json!(4)),
            Contribution::new("dan", json!("4")),
        ]);

        assert_eq!(
            totals(&ranking),
            vec![("ben", 9.0), ("abe", 4.0), ("cara", 4.0), ("dan", 4.0)]
        );
    }

    #[test]
    fn order_does_not_depend_on_input_order() {
        let rows = vec![
            Contribution::new("x", json!(1)),
            Contribution::new("y", json!(1)),
            Contribution::new("z", json!(3)),
        ];
        let mut reversed = rows.clone();
        reversed.reverse();

        assert_eq!(aggregate(rows), aggregate(reversed));
    }

    #[test]
    fn first_non_blank_name_is_kept() {
        let ranking = aggregate([
            Contribution::new("7", json!(1)).named(Some(" ".to_string())),
            Contribution::new("7", json!(1)).named(Some("Ana".to_string())),
            Contribution::new("7", json!(1)).named(Some("Ana B.".to_string())),
        ]);

        assert_eq!(ranking[0].player_name.as_deref(), Some("Ana"));
        assert_eq!(ranking[0].total_points, Points(3.0));
    }

    #[test]
    fn empty_input_yields_empty_ranking() {
        assert!(aggregate(Vec::<Contribution>::new()).is_empty());
    }
}
