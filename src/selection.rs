//! Page-wide text selection capture.
//!
//! The surrounding page publishes a [`PointerRelease`] every time the user
//! lets go of the pointer, carrying whatever text is selected at that moment.
//! A chat session subscribes once when it mounts and holds the resulting
//! [`SelectionListener`] for its lifetime; dropping the listener detaches it
//! from the bus.

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::TryRecvError;

/// Selections must be longer than this many characters (after trimming) to
/// be captured.
pub const MIN_SELECTION_CHARS: usize = 10;

const BUS_CAPACITY: usize = 64;

/// A pointer-release event and the selection that was current when it fired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointerRelease {
    /// Raw selection text, untrimmed; empty when nothing is selected.
    pub selection: String,
}

/// Returns the trimmed selection if it is long enough to be meaningful.
pub fn meaningful_selection(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();
    if trimmed.chars().count() > MIN_SELECTION_CHARS {
        Some(trimmed)
    } else {
        None
    }
}

/// Broadcasts pointer-release events to every mounted listener.
#[derive(Debug, Clone)]
pub struct SelectionBus {
    sender: broadcast::Sender<PointerRelease>,
}

impl SelectionBus {
    /// Creates a bus with no listeners.
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(BUS_CAPACITY);
        Self { sender }
    }

    /// Publishes a pointer release.  Returns the number of listeners notified.
    pub fn release(&self, selection: impl Into<String>) -> usize {
        let event = PointerRelease {
            selection: selection.into(),
        };
        // No listeners is not an error; the event simply goes nowhere.
        self.sender.send(event).unwrap_or(0)
    }

    /// Attaches a new listener.
    pub fn subscribe(&self) -> SelectionListener {
        SelectionListener {
            receiver: self.sender.subscribe(),
        }
    }

    /// Number of listeners currently attached.
    pub fn listener_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for SelectionBus {
    fn default() -> Self {
        Self::new()
    }
}

/// A subscription to a [`SelectionBus`], released on drop.
#[derive(Debug)]
pub struct SelectionListener {
    receiver: broadcast::Receiver<PointerRelease>,
}

impl SelectionListener {
    /// Yields once so publishers can finish, then drains every pending event.
    pub async fn settle(&mut self) -> Vec<PointerRelease> {
        tokio::task::yield_now().await;
        let mut events = Vec::new();
        loop {
            match self.receiver.try_recv() {
                Ok(event) => events.push(event),
                Err(TryRecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "selection listener lagged");
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_is_exclusive() {
        assert_eq!(meaningful_selection("0123456789"), None);
        assert_eq!(meaningful_selection("   0123456789   "), None);
        assert_eq!(meaningful_selection("0123456789a"), Some("0123456789a"));
        assert_eq!(meaningful_selection("\n  ownership rules \t"), Some("ownership rules"));
        assert_eq!(meaningful_selection(""), None);
    }

    #[test]
    fn threshold_counts_characters() {
        // Ten multi-byte characters are still only ten characters.
        assert_eq!(meaningful_selection("éééééééééé"), None);
        assert!(meaningful_selection("ééééééééééé").is_some());
    }

    #[tokio::test]
    async fn listener_receives_releases_in_order() {
        let bus = SelectionBus::new();
        let mut listener = bus.subscribe();
        assert_eq!(bus.release("first selection"), 1);
        assert_eq!(bus.release("second selection"), 1);

        let events = listener.settle().await;
        let texts: Vec<_> = events.iter().map(|e| e.selection.as_str()).collect();
        assert_eq!(texts, vec!["first selection", "second selection"]);
        assert!(listener.settle().await.is_empty());
    }

    #[test]
    fn dropping_listener_detaches() {
        let bus = SelectionBus::new();
        assert_eq!(bus.listener_count(), 0);
        let listener = bus.subscribe();
        assert_eq!(bus.listener_count(), 1);
        drop(listener);
        assert_eq!(bus.listener_count(), 0);
        assert_eq!(bus.release("nobody is listening"), 0);
    }
}
