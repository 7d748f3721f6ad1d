use tracing::debug;

/// Where the tracker is within the current phrase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhraseState {
    /// No speech since the last phrase ended
    Idle,
    /// A phrase is running; `trailing_silence` counts unvoiced frames since the last voiced one
    Accumulating { trailing_silence: usize },
}

/// Explicit phrase state machine shared by the streaming backends.
///
/// `Idle -> Accumulating` on the first voiced frame, `Accumulating -> Idle`
/// once `end_after` consecutive unvoiced frames have been seen (the phrase
/// is handed back), `Accumulating -> Accumulating` otherwise.
#[derive(Debug, Clone)]
pub struct PhraseTracker<T> {
    state: PhraseState,
    end_after: usize,
    items: Vec<T>,
}

impl<T> PhraseTracker<T> {
    pub fn new(end_after: usize) -> Self {
        Self {
            state: PhraseState::Idle,
            end_after: end_after.max(1),
            items: Vec::new(),
        }
    }

    pub fn state(&self) -> PhraseState {
        self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == PhraseState::Idle
    }

    /// A voiced frame, optionally carrying a new item for the phrase
    pub fn voiced(&mut self, item: Option<T>) {
        if self.state == PhraseState::Idle {
            if item.is_none() {
                return;
            }
            debug!("Phrase started");
        }
        self.state = PhraseState::Accumulating { trailing_silence: 0 };
        self.items.extend(item);
    }

    /// An unvoiced frame. Returns the phrase's items when this frame ends it.
    pub fn unvoiced(&mut self, item: Option<T>) -> Option<Vec<T>> {
        let PhraseState::Accumulating { trailing_silence } = self.state else {
            return None;
        };

        let trailing_silence = trailing_silence + 1;
        if trailing_silence >= self.end_after {
            debug!("Phrase ended after {} silent frames", trailing_silence);
            self.state = PhraseState::Idle;
            return Some(std::mem::take(&mut self.items));
        }

        self.state = PhraseState::Accumulating { trailing_silence };
        self.items.extend(item);
        None
    }

    /// Items of the running phrase, if one is accumulating
    pub fn partial(&self) -> Option<&[T]> {
        match self.state {
            PhraseState::Idle => None,
            PhraseState::Accumulating { .. } => Some(&self.items),
        }
    }

    pub fn last_mut(&mut self) -> Option<&mut T> {
        self.items.last_mut()
    }

    /// End the running phrase unconditionally
    pub fn finish(&mut self) -> Option<Vec<T>> {
        match self.state {
            PhraseState::Idle => None,
            PhraseState::Accumulating { .. } => {
                self.state = PhraseState::Idle;
                Some(std::mem::take(&mut self.items))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silence_while_idle_does_nothing() {
        let mut tracker: PhraseTracker<char> = PhraseTracker::new(2);
        assert_eq!(tracker.unvoiced(None), None);
        tracker.voiced(None);
        assert!(tracker.is_idle());
        assert!(tracker.partial().is_none());
    }

    #[test]
    fn phrase_ends_after_trailing_silence() {
        let mut tracker = PhraseTracker::new(3);
        tracker.voiced(Some('h'));
        tracker.voiced(Some('i'));
        assert_eq!(tracker.state(), PhraseState::Accumulating { trailing_silence: 0 });
        assert_eq!(tracker.unvoiced(None), None);
        assert_eq!(tracker.unvoiced(None), None);
        assert_eq!(tracker.partial(), Some(&['h', 'i'][..]));
        assert_eq!(tracker.unvoiced(None), Some(vec!['h', 'i']));
        assert!(tracker.is_idle());
    }

    #[test]
    fn voiced_frame_resets_silence() {
        let mut tracker = PhraseTracker::new(2);
        tracker.voiced(Some(1));
        assert_eq!(tracker.unvoiced(None), None);
        tracker.voiced(None);
        assert_eq!(tracker.unvoiced(None), None);
        assert_eq!(tracker.unvoiced(None), Some(vec![1]));
    }

    #[test]
    fn unvoiced_items_join_running_phrase() {
        let mut tracker = PhraseTracker::new(5);
        tracker.unvoiced(Some(' '));
        tracker.voiced(Some('a'));
        tracker.unvoiced(Some(' '));
        tracker.voiced(Some('b'));
        assert_eq!(tracker.finish(), Some(vec!['a', ' ', 'b']));
        assert_eq!(tracker.finish(), None);
    }
}
