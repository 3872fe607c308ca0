//! Marker types.

/// Marker type describing an entity creation.
#[derive(Clone, Copy, Debug)]
pub struct Creation;

/// Marker type describing a beginning of a scheduled period.
#[derive(Clone, Copy, Debug)]
pub struct Begin;

/// Marker type describing an end of a scheduled period.
#[derive(Clone, Copy, Debug)]
pub struct End;
