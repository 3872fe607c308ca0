//! Read entities definitions.

pub mod listing;
