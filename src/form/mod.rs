//! Form configuration validation.
//!
//! A [`FormConfiguration`] is a declarative tree of field components bound to
//! one schema. [`FormValidator`] walks it once per submission: conditional
//! expressions on a component are evaluated first, then its constraints are
//! checked, then its children are visited.

mod component;
mod error;
mod pattern;
mod relative_date;
mod validator;
pub mod validators;

pub use component::{ComponentProps, FormComponent, FormConfiguration, SelectOption};
pub use error::ValidationErrorItem;
pub use relative_date::{DateUnit, RelativeDate};
pub use validator::FormValidator;
pub use validators::{FieldValidator, ValidatorRegistry};
