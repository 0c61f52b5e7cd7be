//! Visit event model for asynchronous analytics recording.

use chrono::NaiveDate;

/// A single successful resolution waiting to be counted.
///
/// Created by the redirect resolver and sent to a bounded channel so the redirect
/// response never waits on the counter store. The day is captured at resolution
/// time so visits near midnight land in the right daily bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisitEvent {
    pub code: String,
    pub visitor: String,
    pub day: NaiveDate,
}

impl VisitEvent {
    pub fn new(code: impl Into<String>, visitor: impl Into<String>, day: NaiveDate) -> Self {
        Self {
            code: code.into(),
            visitor: visitor.into(),
            day,
        }
    }
}
