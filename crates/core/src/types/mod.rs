//! Native types and dynamic values.

mod native_type;
mod value;

pub use native_type::NativeType;
pub use value::{ObjectValue, OpaqueValue, TypedValue, Value};
