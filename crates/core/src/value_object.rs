//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are immutable and compared by their attribute values. To
/// "modify" one, build a new one. `Money` and a ledger's price entries are
/// value objects; a `Product` is an aggregate with identity.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
