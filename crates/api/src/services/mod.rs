//! Application services used by route handlers.

pub mod group_validation;
