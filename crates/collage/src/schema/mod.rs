//! Collection schemas and the record validator.

pub mod errors;
pub mod field;
pub mod validate;

pub use errors::{ValidationCode, ValidationError, ValidationErrors};
pub use field::{FieldDef, FieldOptions, FieldType};
pub use validate::{ValidationMode, validate_record};
