// In-memory roster of entrants and the question bank.
//
// Both lists live for one session only. They are seeded from the classroom
// config and replaced wholesale when settings are saved.

use rand::Rng;
use thiserror::Error;
use tracing::{debug, info};

use crate::quiz::QuizItem;

/// Upper bound on the question bank after a prepend.
pub const MAX_QUESTIONS: usize = 100;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("the name list is empty")]
    EmptyRoster,

    #[error("no entrant at index {index} (roster has {len})")]
    NoSuchEntrant { index: usize, len: usize },
}

// ---------------------------------------------------------------------------
// Roster
// ---------------------------------------------------------------------------

/// Ordered entrant names. Position in the list is the wheel slice index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Roster {
    names: Vec<String>,
}

impl Roster {
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    /// One name per line, trimmed, blank lines dropped.
    pub fn parse_lines(text: &str) -> Vec<String> {
        text.lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Replace the whole list from multi-line text.
    ///
    /// Leaves the current list untouched when the text contains no names.
    pub fn replace_from_text(&mut self, text: &str) -> Result<usize, StoreError> {
        let names = Self::parse_lines(text);
        if names.is_empty() {
            return Err(StoreError::EmptyRoster);
        }
        self.names = names;
        info!(count = self.names.len(), "roster replaced");
        Ok(self.names.len())
    }

    pub fn remove(&mut self, index: usize) -> Result<String, StoreError> {
        if index >= self.names.len() {
            return Err(StoreError::NoSuchEntrant {
                index,
                len: self.names.len(),
            });
        }
        let removed = self.names.remove(index);
        info!(name = %removed, remaining = self.names.len(), "entrant removed");
        Ok(removed)
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Names joined by newlines, the inverse of `parse_lines`.
    pub fn to_text(&self) -> String {
        self.names.join("\n")
    }
}

// ---------------------------------------------------------------------------
// QuestionBank
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuestionBank {
    items: Vec<QuizItem>,
}

impl QuestionBank {
    pub fn new(items: Vec<QuizItem>) -> Self {
        Self { items }
    }

    pub fn replace(&mut self, items: Vec<QuizItem>) {
        self.items = items;
        info!(count = self.items.len(), "question bank replaced");
    }

    /// Insert a batch at the front, then drop the oldest items beyond
    /// `MAX_QUESTIONS`. Returns how many items were evicted.
    pub fn prepend(&mut self, batch: Vec<QuizItem>) -> usize {
        let added = batch.len();
        let mut items = batch;
        items.append(&mut self.items);
        let evicted = items.len().saturating_sub(MAX_QUESTIONS);
        items.truncate(MAX_QUESTIONS);
        self.items = items;
        info!(added, evicted, total = self.items.len(), "questions prepended");
        evicted
    }

    pub fn remove(&mut self, index: usize) -> Option<QuizItem> {
        if index >= self.items.len() {
            return None;
        }
        Some(self.items.remove(index))
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Uniform pick with replacement. `None` for an empty bank.
    pub fn pick_random<R: Rng>(&self, rng: &mut R) -> Option<&QuizItem> {
        if self.items.is_empty() {
            return None;
        }
        let index = rng.gen_range(0..self.items.len());
        debug!(index, "question picked");
        self.items.get(index)
    }

    pub fn items(&self) -> &[QuizItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn question(text: &str) -> QuizItem {
        QuizItem::new(
            text,
            ["a".to_string(), "b".to_string(), "c".to_string(), "d".to_string()],
            0,
        )
    }

    fn bank_of(count: usize, prefix: &str) -> Vec<QuizItem> {
        (0..count).map(|i| question(&format!("{prefix}{i}"))).collect()
    }

    #[test]
    fn parse_lines_trims_and_drops_blanks() {
        let names = Roster::parse_lines("  An \n\n\tBình\n   \nChi\n");
        assert_eq!(names, vec!["An", "Bình", "Chi"]);
    }

    #[test]
    fn replace_from_text_rejects_empty_input() {
        let mut roster = Roster::new(vec!["An".to_string()]);
        assert_eq!(roster.replace_from_text(" \n\n "), Err(StoreError::EmptyRoster));
        assert_eq!(roster.names(), ["An"]);
    }

    #[test]
    fn replace_from_text_swaps_whole_list() {
        let mut roster = Roster::new(vec!["An".to_string()]);
        assert_eq!(roster.replace_from_text("Dũng\nGiang"), Ok(2));
        assert_eq!(roster.names(), ["Dũng", "Giang"]);
        assert_eq!(roster.to_text(), "Dũng\nGiang");
    }

    #[test]
    fn remove_shifts_later_entrants_down() {
        let mut roster = Roster::new(vec!["A".into(), "B".into(), "C".into()]);
        assert_eq!(roster.remove(1), Ok("B".to_string()));
        assert_eq!(roster.get(1), Some("C"));
        assert_eq!(
            roster.remove(5),
            Err(StoreError::NoSuchEntrant { index: 5, len: 2 })
        );
    }

    #[test]
    fn prepend_puts_new_items_first() {
        let mut bank = QuestionBank::new(bank_of(2, "old"));
        bank.prepend(bank_of(1, "new"));
        let texts: Vec<&str> = bank.items().iter().map(QuizItem::question).collect();
        assert_eq!(texts, vec!["new0", "old0", "old1"]);
    }

    #[test]
    fn prepend_caps_at_max_and_evicts_oldest() {
        let mut bank = QuestionBank::new(bank_of(95, "old"));
        let evicted = bank.prepend(bank_of(15, "new"));
        assert_eq!(evicted, 10);
        assert_eq!(bank.len(), MAX_QUESTIONS);
        assert_eq!(bank.items()[0].question(), "new0");
        assert_eq!(bank.items()[99].question(), "old84");
    }

    #[test]
    fn prepend_of_oversized_batch_keeps_its_head() {
        let mut bank = QuestionBank::new(bank_of(3, "old"));
        bank.prepend(bank_of(120, "new"));
        assert_eq!(bank.len(), MAX_QUESTIONS);
        assert!(bank.items().iter().all(|q| q.question().starts_with("new")));
    }

    #[test]
    fn remove_and_clear() {
        let mut bank = QuestionBank::new(bank_of(3, "q"));
        assert_eq!(bank.remove(1).map(|q| q.question().to_string()), Some("q1".to_string()));
        assert!(bank.remove(10).is_none());
        bank.clear();
        assert!(bank.is_empty());
    }

    #[test]
    fn pick_random_on_empty_bank_is_none() {
        let bank = QuestionBank::default();
        let mut rng = StdRng::seed_from_u64(1);
        assert!(bank.pick_random(&mut rng).is_none());
    }

    #[test]
    fn pick_random_can_repeat() {
        let bank = QuestionBank::new(bank_of(2, "q"));
        let mut rng = StdRng::seed_from_u64(42);
        let picks: Vec<String> = (0..50)
            .filter_map(|_| bank.pick_random(&mut rng).map(|q| q.question().to_string()))
            .collect();
        assert_eq!(picks.len(), 50);
        assert!(picks.iter().any(|q| q == "q0"));
        assert!(picks.iter().any(|q| q == "q1"));
    }
}
