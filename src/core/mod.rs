pub mod error;
pub mod types;
pub mod value;

pub use error::{Result, SchemaError};
pub use types::{Attribute, AttributeType};
pub use value::{DATE_FORMAT, DocumentRef, TIME_FORMAT, Value};
