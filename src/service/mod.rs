//! Payload shaping and validation shared by every backend.

mod validation;
pub use validation::{check_type, coerce, value_eq, Payload, RequestValidator};
