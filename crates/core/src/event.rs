use chrono::{DateTime, Utc};

/// A domain event: an immutable, versioned fact.
///
/// Event streams are append-only; consumers rebuild state by replaying them
/// through [`crate::Aggregate::apply`].
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Stable dotted type name (e.g. "purchasing.line_item.return_approved").
    fn event_type(&self) -> &'static str;

    /// Schema version of the payload.
    fn version(&self) -> u32;

    /// Business time at which the fact happened.
    fn occurred_at(&self) -> DateTime<Utc>;
}
