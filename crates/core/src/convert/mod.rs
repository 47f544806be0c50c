//! Type conversion: converters and the registry resolving conversion paths.

mod converter;
mod registry;

pub use converter::{FnConverter, TypeConverter, UuidStringConverter};
pub use registry::{check_instance, ConversionFn, ConversionHints, Direction, TypeConverters};
