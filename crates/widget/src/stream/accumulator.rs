//! Assistant text buffered between completion events.

/// Text received since the last completion-class event.
#[derive(Debug)]
pub struct StreamAccumulator {
    text: String,
    turn_open: bool,
}

impl Default for StreamAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamAccumulator {
    /// Open accumulator for a new request.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            text: String::new(),
            turn_open: true,
        }
    }

    pub fn push(&mut self, chunk: &str) {
        self.text.push_str(chunk);
    }

    /// Take the buffered text and close the turn.
    ///
    /// Returns `None` when nothing was received since the last flush.
    pub fn flush(&mut self) -> Option<String> {
        self.turn_open = false;
        if self.text.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.text))
        }
    }

    /// Start a fresh turn.
    pub fn reopen(&mut self) {
        self.text.clear();
        self.turn_open = true;
    }

    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.turn_open
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flush_concatenates_in_order() {
        let mut acc = StreamAccumulator::new();
        acc.push("Hel");
        acc.push("lo");
        assert_eq!(acc.flush().as_deref(), Some("Hello"));
        assert!(!acc.is_open());
        assert_eq!(acc.flush(), None);
    }

    #[test]
    fn test_reopen_starts_empty_turn() {
        let mut acc = StreamAccumulator::new();
        acc.flush();
        acc.reopen();
        assert!(acc.is_open());
        assert!(acc.is_empty());
    }
}
