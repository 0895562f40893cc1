//! # resume-shared
//!
//! Domain logic shared by the store and the HTTP server: caller roles,
//! Monday-anchored week arithmetic, the report input normalizer and the
//! report validator.

pub mod constants;
pub mod normalize;
pub mod types;
pub mod validation;
pub mod week;

mod error;

pub use error::FieldErrors;
pub use types::{Identity, Role};
pub use validation::{normalize_and_validate, validate, ReportInput};
pub use week::{parse_date, DateOutOfRange, WeekRange};
