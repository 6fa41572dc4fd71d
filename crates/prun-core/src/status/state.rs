use std::{collections::BTreeMap, time::Instant};

use prun_model::Tag;

/// Counters and live lines owned by the aggregator.
#[derive(Debug, Clone)]
pub struct AggregateState {
    pub start: Instant,
    pub total_known: bool,
    /// Final total once known, otherwise the highest running count seen.
    pub total: u64,
    pub processed: u64,
    pub failed: u64,
    /// Last line per running tag. Jobs sharing a tag share one entry.
    pub live: BTreeMap<Tag, String>,
}

impl AggregateState {
    pub fn new(start: Instant) -> Self {
        Self {
            start,
            total_known: false,
            total: 0,
            processed: 0,
            failed: 0,
            live: BTreeMap::new(),
        }
    }

    pub fn started(&mut self, tag: &str) {
        self.live.insert(tag.to_string(), String::new());
    }

    /// Remember `line` as the tag's latest output. Unknown tags are left alone.
    pub fn output(&mut self, tag: &str, line: &str) {
        if let Some(last) = self.live.get_mut(tag) {
            line.clone_into(last);
        }
    }

    pub fn finished(&mut self, tag: &str, failed: bool) {
        self.processed += 1;
        if failed {
            self.failed += 1;
        }
        self.live.remove(tag);
    }

    pub fn running_count(&mut self, count: u64) {
        if !self.total_known {
            self.total = self.total.max(count);
        }
    }

    pub fn final_count(&mut self, total: u64) {
        self.total_known = true;
        self.total = total;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn live_entry_spans_start_to_done() {
        let mut state = AggregateState::new(Instant::now());

        state.output("a", "ignored before start");
        assert!(state.live.is_empty());

        state.started("a");
        assert_eq!(state.live.get("a").map(String::as_str), Some(""));

        state.output("a", "working");
        assert_eq!(state.live.get("a").map(String::as_str), Some("working"));

        state.finished("a", true);
        assert!(state.live.is_empty());
        assert_eq!((state.processed, state.failed), (1, 1));
    }

    #[test]
    fn shared_tag_overwrites() {
        let mut state = AggregateState::new(Instant::now());
        state.started("same");
        state.output("same", "first");
        state.started("same");

        assert_eq!(state.live.len(), 1);
        assert_eq!(state.live.get("same").map(String::as_str), Some(""));
    }

    #[test]
    fn running_counts_only_raise_unknown_total() {
        let mut state = AggregateState::new(Instant::now());
        state.running_count(20);
        state.running_count(10);
        assert_eq!(state.total, 20);
        assert!(!state.total_known);

        state.final_count(23);
        state.running_count(30);
        assert!(state.total_known);
        assert_eq!(state.total, 23);
    }
}
