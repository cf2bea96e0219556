use crate::core::observable::{Observable, SubscriptionId};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Direction in which upcoming notes travel toward the judgement line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ScrollDirection {
    /// Notes rise toward a judgement line at the top.
    Up,
    /// Notes fall toward a judgement line at the bottom.
    #[default]
    Down,
}

impl ScrollDirection {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Up => "Up",
            Self::Down => "Down",
        }
    }
}

impl fmt::Display for ScrollDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScrollDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "up" => Ok(Self::Up),
            "down" => Ok(Self::Down),
            other => Err(format!("'{other}' is not a valid scroll direction")),
        }
    }
}

/// Session-wide scroll direction: one writer, many readers.
///
/// Starts unset. The owner must call [`ScrollDirectionBroker::set`] right after
/// construction so the first frame lays out correctly. Every write notifies
/// every consumer, even when the value did not change.
#[derive(Debug, Clone)]
pub struct ScrollDirectionBroker {
    cell: Arc<Observable<ScrollDirection>>,
}

/// Read side of a [`ScrollDirectionBroker`], handed to layout consumers.
#[derive(Debug, Clone)]
pub struct ScrollDirectionReader {
    cell: Arc<Observable<ScrollDirection>>,
}

impl ScrollDirectionBroker {
    pub fn new() -> Self {
        Self { cell: Arc::new(Observable::new()) }
    }

    pub fn set(&self, direction: ScrollDirection) {
        debug!("Scroll direction set to {direction}.");
        self.cell.set(direction);
    }

    #[inline(always)]
    pub fn get(&self) -> Option<ScrollDirection> {
        self.cell.get()
    }

    pub fn reader(&self) -> ScrollDirectionReader {
        ScrollDirectionReader { cell: Arc::clone(&self.cell) }
    }
}

impl Default for ScrollDirectionBroker {
    fn default() -> Self {
        Self::new()
    }
}

impl ScrollDirectionReader {
    #[inline(always)]
    pub fn get(&self) -> Option<ScrollDirection> {
        self.cell.get()
    }

    /// Calls `callback` on every write from now on.
    pub fn subscribe(&self, callback: impl FnMut(ScrollDirection) + Send + 'static) -> SubscriptionId {
        self.cell.subscribe(callback)
    }

    /// Calls `callback` immediately with the current direction (if one has
    /// been set), then on every write.
    pub fn bind(&self, callback: impl FnMut(ScrollDirection) + Send + 'static) -> SubscriptionId {
        self.cell.subscribe_and_fire(callback)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.cell.unsubscribe(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn recorder(reader: &ScrollDirectionReader) -> Arc<Mutex<Vec<ScrollDirection>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        reader.subscribe(move |d| sink.lock().unwrap().push(d));
        seen
    }

    #[test]
    fn first_write_notifies_even_when_equal_to_default() {
        let broker = ScrollDirectionBroker::new();
        let reader = broker.reader();
        let a = recorder(&reader);
        let b = recorder(&reader);
        assert_eq!(reader.get(), None);

        broker.set(ScrollDirection::default());
        assert_eq!(*a.lock().unwrap(), vec![ScrollDirection::Down]);
        assert_eq!(*b.lock().unwrap(), vec![ScrollDirection::Down]);
        assert_eq!(reader.get(), Some(ScrollDirection::Down));
    }

    #[test]
    fn repeated_writes_are_not_suppressed() {
        let broker = ScrollDirectionBroker::new();
        let seen = recorder(&broker.reader());
        broker.set(ScrollDirection::Up);
        broker.set(ScrollDirection::Up);
        broker.set(ScrollDirection::Down);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![ScrollDirection::Up, ScrollDirection::Up, ScrollDirection::Down]
        );
    }

    #[test]
    fn late_binders_receive_current_value() {
        let broker = ScrollDirectionBroker::new();
        broker.set(ScrollDirection::Up);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let id = broker.reader().bind(move |d| sink.lock().unwrap().push(d));
        assert_eq!(*seen.lock().unwrap(), vec![ScrollDirection::Up]);

        assert!(broker.reader().unsubscribe(id));
        broker.set(ScrollDirection::Down);
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn readers_on_other_threads_see_writes() {
        let broker = ScrollDirectionBroker::new();
        let reader = broker.reader();
        broker.set(ScrollDirection::Up);
        let observed = std::thread::spawn(move || reader.get()).join().unwrap();
        assert_eq!(observed, Some(ScrollDirection::Up));
    }

    #[test]
    fn parses_config_values() {
        assert_eq!(" UP ".parse::<ScrollDirection>(), Ok(ScrollDirection::Up));
        assert_eq!("down".parse::<ScrollDirection>(), Ok(ScrollDirection::Down));
        assert!("sideways".parse::<ScrollDirection>().is_err());
    }
}
