//! Redaction for docpipe
//!
//! Author-supplied patterns are matched case-insensitively, overlapping
//! matches are merged into a minimal cover, and each covered span is replaced
//! by a marker token.

pub mod redactor;
pub mod spans;

pub use redactor::{RedactError, Redaction, RedactionOptions, Redactor, expand_pattern};
pub use spans::{Span, SpanSet, merge_spans};
