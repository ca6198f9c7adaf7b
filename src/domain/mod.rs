pub mod category;
pub mod common;
pub mod field;
pub mod value;

pub use category::{Category, StepPosition, Taxonomy};
pub use common::{Frequency, Name};
pub use field::{FieldKind, FieldTemplate, Row};
pub use value::FieldValue;
