//! Span cover used by the redactor
//!
//! Raw pattern matches may overlap in any order. [`SpanSet`] keeps the
//! accumulated spans pairwise disjoint, so the final cover does not depend on
//! the order matches were found in.

use serde::{Deserialize, Serialize};

/// Half-open byte range `[start, end)` into a text
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Strict overlap; spans that merely touch do not overlap
    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && self.end > other.start
    }

    pub fn union(&self, other: &Span) -> Span {
        Span::new(self.start.min(other.start), self.end.max(other.end))
    }
}

impl From<(usize, usize)> for Span {
    fn from((start, end): (usize, usize)) -> Self {
        Span::new(start, end)
    }
}

/// Set of pairwise non-overlapping spans
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpanSet {
    spans: Vec<Span>,
}

impl SpanSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a span, absorbing every accumulated span it overlaps.
    ///
    /// The union grows while absorbing, so it is re-checked against the
    /// remaining spans until nothing else overlaps it.
    pub fn insert(&mut self, span: Span) {
        if span.is_empty() {
            return;
        }

        let mut merged = span;
        loop {
            let before = self.spans.len();
            self.spans.retain(|existing| {
                if existing.overlaps(&merged) {
                    merged = merged.union(existing);
                    false
                } else {
                    true
                }
            });
            if self.spans.len() == before {
                break;
            }
        }
        self.spans.push(merged);
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// Spans in ascending order of start
    pub fn into_sorted(mut self) -> Vec<Span> {
        self.spans.sort();
        self.spans
    }
}

impl Extend<Span> for SpanSet {
    fn extend<I: IntoIterator<Item = Span>>(&mut self, iter: I) {
        for span in iter {
            self.insert(span);
        }
    }
}

impl FromIterator<Span> for SpanSet {
    fn from_iter<I: IntoIterator<Item = Span>>(iter: I) -> Self {
        let mut set = SpanSet::new();
        set.extend(iter);
        set
    }
}

/// Minimal sorted, non-overlapping cover of `spans`
pub fn merge_spans<I>(spans: I) -> Vec<Span>
where
    I: IntoIterator,
    I::Item: Into<Span>,
{
    spans
        .into_iter()
        .map(Into::into)
        .collect::<SpanSet>()
        .into_sorted()
}
