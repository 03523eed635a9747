//! Reading statistics per player, derived from logged books.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;

use crate::models::{LoggedBook, Points};
use crate::ranking::{coerce_points, sort_by_total};

const BASE_POINTS_COLUMN: &str = "base_points";

/// A single standout book in a player's log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookHighlight {
    pub title: Value,
    pub value: Points,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerStats {
    pub player_id: String,
    pub player_name: Option<String>,
    pub books_counted: usize,
    pub books_completed: usize,
    pub pages: Points,
    /// Pages of completed books only.
    pub book_only_pages: Points,
    /// Sum of each book's `base_points` when the row carries one, else its
    /// `points`.
    pub pre_bonus_points: Points,
    pub total_points: Points,
    pub avg_book_length: Points,
    pub avg_points_per_book: Points,
    pub highest_point_book: Option<BookHighlight>,
    pub highest_rated_book: Option<BookHighlight>,
}

impl PlayerStats {
    fn new(player_id: String) -> Self {
        Self {
            player_id,
            player_name: None,
            books_counted: 0,
            books_completed: 0,
            pages: Points::default(),
            book_only_pages: Points::default(),
            pre_bonus_points: Points::default(),
            total_points: Points::default(),
            avg_book_length: Points::default(),
            avg_points_per_book: Points::default(),
            highest_point_book: None,
            highest_rated_book: None,
        }
    }

    fn add(&mut self, book: &LoggedBook) {
        let pages = coerce_points(&book.pages);
        self.books_counted += 1;
        self.pages.0 += pages;
        if is_truthy(&book.completed) {
            self.books_completed += 1;
            self.book_only_pages.0 += pages;
        }

        let points = coerce_points(&book.points);
        self.total_points.0 += points;
        self.pre_bonus_points.0 += match book.extra.get(BASE_POINTS_COLUMN) {
            Some(base) if !base.is_null() => coerce_points(base),
            _ => points,
        };
        keep_highest(&mut self.highest_point_book, &book.title, points);

        if !book.rating.is_null() {
            keep_highest(
                &mut self.highest_rated_book,
                &book.title,
                coerce_points(&book.rating),
            );
        }

        if self.player_name.is_none() {
            self.player_name = book
                .player_name
                .clone()
                .filter(|name| !name.trim().is_empty());
        }
    }

    fn finish(mut self) -> Self {
        // books_counted is at least one for every entry that exists
        let count = self.books_counted as f64;
        self.avg_book_length = Points::rounded(self.pages.value() / count);
        self.avg_points_per_book = Points::rounded(self.total_points.value() / count);
        self
    }
}

/// Earlier books win ties.
fn keep_highest(slot: &mut Option<BookHighlight>, title: &Value, value: f64) {
    let replace = match slot {
        Some(current) => value > current.value.value(),
        None => true,
    };
    if replace {
        *slot = Some(BookHighlight {
            title: title.clone(),
            value: Points(value),
        });
    }
}

/// Completion flags arrive as booleans, numbers or strings.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(flag) => *flag,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => {
            let s = s.trim();
            s.eq_ignore_ascii_case("true") || s.eq_ignore_ascii_case("yes") || s == "1"
        }
        Value::Null | Value::Array(_) | Value::Object(_) => false,
    }
}

/// Group books by owner; books without an owner (or with a blank one) are
/// skipped, as in the rankings. Ordered like the rankings.
pub fn summarize<'a, I>(books: I) -> Vec<PlayerStats>
where
    I: IntoIterator<Item = &'a LoggedBook>,
{
    let mut by_player: HashMap<String, PlayerStats> = HashMap::new();

    for book in books {
        let Some(owner) = book.player_id.as_ref().filter(|id| !id.is_blank()) else {
            continue;
        };
        let key = owner.to_string();
        by_player
            .entry(key.clone())
            .or_insert_with(|| PlayerStats::new(key))
            .add(book);
    }

    let mut stats: Vec<PlayerStats> = by_player.into_values().map(PlayerStats::finish).collect();
    sort_by_total(&mut stats, |entry| (entry.total_points, &entry.player_id));
    stats
}
