//! Split of the conversation history into the live window and the turns
//! old enough to be folded into the summary.

use storytalk_core::Turn;

pub struct ContextWindow<'a> {
    /// The most recent turns, sent verbatim.
    pub recent: &'a [Turn],
    /// Everything older, eligible for summarization.
    pub eligible: &'a [Turn],
}

impl<'a> ContextWindow<'a> {
    pub fn build(history: &'a [Turn], window_turns: usize) -> Self {
        let split = history.len().saturating_sub(window_turns);
        let (eligible, recent) = history.split_at(split);
        Self { recent, eligible }
    }

    pub fn eligible_count(&self) -> usize {
        self.eligible.len()
    }

    /// True on batch boundaries only, so a summary is not rebuilt every turn.
    pub fn should_summarize(&self, batch: usize) -> bool {
        let eligible = self.eligible_count();
        eligible > 0 && batch > 0 && eligible % batch == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history(n: usize) -> Vec<Turn> {
        (0..n)
            .map(|i| {
                if i % 2 == 0 {
                    Turn::user(format!("u{i}"))
                } else {
                    Turn::assistant(format!("a{i}"))
                }
            })
            .collect()
    }

    #[test]
    fn short_history_is_all_recent() {
        let turns = history(7);
        let window = ContextWindow::build(&turns, 10);
        assert_eq!(window.recent.len(), 7);
        assert_eq!(window.eligible_count(), 0);
        assert!(!window.should_summarize(5));
    }

    #[test]
    fn keeps_last_ten_verbatim() {
        let turns = history(12);
        let window = ContextWindow::build(&turns, 10);
        assert_eq!(window.recent, &turns[2..]);
        assert_eq!(window.eligible, &turns[..2]);
        assert!(!window.should_summarize(5));
    }

    #[test]
    fn batch_boundaries() {
        for (len, expected) in [(15, true), (16, false), (19, false), (20, true), (25, true)] {
            let turns = history(len);
            let window = ContextWindow::build(&turns, 10);
            assert_eq!(window.should_summarize(5), expected, "len {len}");
        }
    }
}
