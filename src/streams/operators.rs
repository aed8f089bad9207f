//! Windowing and transform operators applied to a stream's messages.
//!
//! [`WindowAssigner`] is a synchronous state machine rather than a
//! combinator over `futures::Stream`: callers `push` items as they
//! arrive (from a [`crate::streams::broker::StreamReceiver::recv`]
//! loop, say) and get back the windows that closed as a result. This
//! keeps windowing free of `Pin`/`Stream` machinery the rest of the
//! crate doesn't otherwise need.

// Layer 1: Standard library imports
use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;

// Layer 2: Third-party crate imports
use chrono::{DateTime, Duration as ChronoDuration, Utc};
// Layer 3: Internal module imports
// (none)

/// The windowing strategy a [`WindowAssigner`] applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowKind {
    /// Tumbling window: closes and resets once `duration` has elapsed
    /// since the window opened.
    Time(ChronoDuration),
    /// Closes once `count` messages have been buffered.
    Count(usize),
    /// Sliding window of `size` messages, re-emitted every `slide`
    /// arrivals (`slide <= size`, otherwise some messages are never
    /// windowed).
    Sliding { size: usize, slide: usize },
    /// Closes the current buffer when the gap between two consecutive
    /// arrivals exceeds `gap`.
    Session { gap: ChronoDuration },
}

/// A closed batch of messages plus the window metadata that produced it.
#[derive(Debug, Clone)]
pub struct Window<T> {
    /// The buffered messages, in arrival order.
    pub messages: Vec<T>,
    /// Timestamp of the first message in the window.
    pub start_time: DateTime<Utc>,
    /// Timestamp of the last message in the window (or the flush time,
    /// for a window closed by timeout with no new arrival).
    pub end_time: DateTime<Utc>,
    /// The strategy that produced this window.
    pub kind: WindowKind,
}

/// Buffers arriving messages and emits closed [`Window`]s per
/// [`WindowKind`] semantics.
///
/// Not `Send`-constrained and holds no lock of its own — callers
/// drive it from a single task (typically the loop reading a
/// [`crate::streams::broker::StreamReceiver`]) and wrap it in a mutex
/// themselves if shared access is needed.
pub struct WindowAssigner<T: Clone> {
    kind: WindowKind,
    buffer: Vec<T>,
    window_start: Option<DateTime<Utc>>,
    last_item_at: Option<DateTime<Utc>>,
    arrivals_since_slide: usize,
}

impl<T: Clone> WindowAssigner<T> {
    /// Create an assigner for the given windowing strategy.
    pub fn new(kind: WindowKind) -> Self {
        Self {
            kind,
            buffer: Vec::new(),
            window_start: None,
            last_item_at: None,
            arrivals_since_slide: 0,
        }
    }

    /// Feed one arriving item at timestamp `at`. Returns the windows
    /// that closed as a result (zero, one, or — for `Sliding` — one
    /// per slide boundary crossed, though in practice at most one per
    /// call since `slide` boundaries are crossed one at a time).
    pub fn push(&mut self, item: T, at: DateTime<Utc>) -> Vec<Window<T>> {
        match self.kind {
            WindowKind::Time(duration) => self.push_time(item, at, duration),
            WindowKind::Count(count) => self.push_count(item, at, count),
            WindowKind::Sliding { size, slide } => self.push_sliding(item, at, size, slide),
            WindowKind::Session { gap } => self.push_session(item, at, gap),
        }
    }

    /// Force-close whatever is currently buffered, if anything, as of
    /// `now`. Used to flush a trailing partial window — e.g. a `Time`
    /// window that hasn't reached its deadline yet but the stream is
    /// shutting down, or a `Session` window whose gap timeout hasn't
    /// been observed because no further item has arrived.
    pub fn flush(&mut self, now: DateTime<Utc>) -> Option<Window<T>> {
        if self.buffer.is_empty() {
            return None;
        }
        let start = self.window_start.unwrap_or(now);
        let end = self.last_item_at.unwrap_or(now);
        let window = Window {
            messages: std::mem::take(&mut self.buffer),
            start_time: start,
            end_time: end,
            kind: self.kind,
        };
        self.window_start = None;
        self.last_item_at = None;
        self.arrivals_since_slide = 0;
        Some(window)
    }

    fn push_time(&mut self, item: T, at: DateTime<Utc>, duration: ChronoDuration) -> Vec<Window<T>> {
        let mut closed = Vec::new();
        if let Some(start) = self.window_start {
            if at - start >= duration {
                if let Some(window) = self.flush(at) {
                    closed.push(window);
                }
            }
        }
        if self.window_start.is_none() {
            self.window_start = Some(at);
        }
        self.last_item_at = Some(at);
        self.buffer.push(item);
        closed
    }

    fn push_count(&mut self, item: T, at: DateTime<Utc>, count: usize) -> Vec<Window<T>> {
        if self.window_start.is_none() {
            self.window_start = Some(at);
        }
        self.last_item_at = Some(at);
        self.buffer.push(item);

        if self.buffer.len() >= count {
            self.flush(at).into_iter().collect()
        } else {
            Vec::new()
        }
    }

    fn push_sliding(&mut self, item: T, at: DateTime<Utc>, size: usize, slide: usize) -> Vec<Window<T>> {
        if self.window_start.is_none() {
            self.window_start = Some(at);
        }
        self.last_item_at = Some(at);
        self.buffer.push(item);
        if self.buffer.len() > size {
            self.buffer.remove(0);
            self.window_start = Some(at);
        }
        self.arrivals_since_slide += 1;

        if self.buffer.len() == size && self.arrivals_since_slide >= slide.max(1) {
            self.arrivals_since_slide = 0;
            #[allow(clippy::unwrap_used)]
            let start = self.window_start.unwrap();
            vec![Window {
                messages: self.buffer.clone(),
                start_time: start,
                end_time: at,
                kind: self.kind,
            }]
        } else {
            Vec::new()
        }
    }

    fn push_session(&mut self, item: T, at: DateTime<Utc>, gap: ChronoDuration) -> Vec<Window<T>> {
        let mut closed = Vec::new();
        if let Some(last) = self.last_item_at {
            if at - last > gap {
                if let Some(window) = self.flush(at) {
                    closed.push(window);
                }
            }
        }
        if self.window_start.is_none() {
            self.window_start = Some(at);
        }
        self.last_item_at = Some(at);
        self.buffer.push(item);
        closed
    }
}

/// Apply `f` to every message in `messages`.
pub fn map<T, U>(messages: Vec<T>, f: impl Fn(T) -> U) -> Vec<U> {
    messages.into_iter().map(f).collect()
}

/// Apply an async `f` to every message in `messages`, sequentially.
pub async fn map_async<T, U, F, Fut>(messages: Vec<T>, f: F) -> Vec<U>
where
    F: Fn(T) -> Fut,
    Fut: Future<Output = U>,
{
    let mut results = Vec::with_capacity(messages.len());
    for message in messages {
        results.push(f(message).await);
    }
    results
}

/// Keep only the messages for which `predicate` returns `true`.
pub fn filter<T>(messages: Vec<T>, predicate: impl Fn(&T) -> bool) -> Vec<T> {
    messages.into_iter().filter(predicate).collect()
}

/// Keep only the messages for which an async `predicate` returns `true`.
pub async fn filter_async<T, F, Fut>(messages: Vec<T>, predicate: F) -> Vec<T>
where
    F: Fn(&T) -> Fut,
    Fut: Future<Output = bool>,
{
    let mut kept = Vec::new();
    for message in messages {
        if predicate(&message).await {
            kept.push(message);
        }
    }
    kept
}

/// Fold `messages` into a single accumulated value.
pub fn reduce<T, A>(messages: Vec<T>, init: A, f: impl Fn(A, T) -> A) -> A {
    messages.into_iter().fold(init, f)
}

/// Fold `messages` into a single accumulated value using an async step.
pub async fn reduce_async<T, A, F, Fut>(messages: Vec<T>, init: A, f: F) -> A
where
    F: Fn(A, T) -> Fut,
    Fut: Future<Output = A>,
{
    let mut acc = init;
    for message in messages {
        acc = f(acc, message).await;
    }
    acc
}

/// Partition `messages` by the key `key_fn` extracts from each.
pub fn group_by<T, K>(messages: Vec<T>, key_fn: impl Fn(&T) -> K) -> HashMap<K, Vec<T>>
where
    K: Eq + Hash,
{
    let mut groups: HashMap<K, Vec<T>> = HashMap::new();
    for message in messages {
        let key = key_fn(&message);
        groups.entry(key).or_default().push(message);
    }
    groups
}
