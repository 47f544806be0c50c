//! Extraction of special arguments from a raw call argument list.

use crate::metadata::SpecialArguments;
use crate::types::Value;
use num_bigint::BigInt;
use tracing::warn;

/// The raw argument tagged `tag`, or `None` when the tag is not declared or the
/// argument is null.
pub fn special_argument<'a, B>(binding: &B, args: &'a [Value], tag: &str) -> Option<&'a Value>
where
    B: SpecialArguments + ?Sized,
{
    binding
        .special_argument_index(tag)
        .and_then(|index| args.get(index))
        .filter(|value| !value.is_null())
}

/// The arguments that reach the contract, in their original relative order.
pub fn contract_arguments<B>(binding: &B, args: Vec<Value>) -> Vec<Value>
where
    B: SpecialArguments + ?Sized,
{
    let tags = binding.special_tags();
    args.into_iter()
        .enumerate()
        .filter(|(index, _)| tags.get(*index).map_or(true, Option::is_none))
        .map(|(_, value)| value)
        .collect()
}

/// Reads a big integer special argument.
///
/// Big integers are used as is and other numbers through their integral value;
/// absent or non-numeric arguments fall back to `default`.
pub fn big_integer_argument(value: Option<&Value>, default: impl FnOnce() -> BigInt) -> BigInt {
    match value {
        Some(Value::BigInteger(v)) => v.clone(),
        Some(v) if v.is_number() => match v.to_long() {
            Some(long) => BigInt::from(long),
            None => default(),
        },
        Some(other) => {
            warn!("Ignoring non numeric special argument {}, using default", other);
            default()
        }
        None => default(),
    }
}

/// Reads a special argument holding one string or a collection of strings.
///
/// Non-string elements are skipped.
pub fn string_collection_argument(value: Option<&Value>) -> Option<Vec<String>> {
    match value? {
        Value::String(s) => Some(vec![s.clone()]),
        other => other
            .elements()
            .map(|items| items.iter().filter_map(Value::as_str).map(str::to_string).collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Tags(Vec<Option<&'static str>>);

    impl SpecialArguments for Tags {
        fn special_tags(&self) -> Vec<Option<&str>> {
            self.0.clone()
        }
    }

    fn greet() -> Tags {
        Tags(vec![Some("gasPrice"), None, Some("gasLimit"), None])
    }

    #[test]
    fn test_special_arguments_are_excluded_in_order() {
        let args = vec![Value::Long(1), Value::from("a"), Value::Long(2), Value::Int(3)];
        assert_eq!(contract_arguments(&greet(), args), vec![Value::from("a"), Value::Int(3)]);
    }

    #[test]
    fn test_special_argument_lookup_ignores_case_and_nulls() {
        let args = vec![Value::Long(1), Value::from("a"), Value::Null, Value::Int(3)];
        assert_eq!(special_argument(&greet(), &args, "GASPRICE"), Some(&Value::Long(1)));
        assert_eq!(special_argument(&greet(), &args, "gasLimit"), None);
        assert_eq!(special_argument(&greet(), &args, "value"), None);
    }

    #[test]
    fn test_big_integer_argument_defaults() {
        let default = || BigInt::from(20_000_000_000u64);
        assert_eq!(big_integer_argument(None, default), BigInt::from(20_000_000_000u64));
        assert_eq!(big_integer_argument(Some(&Value::Int(7)), default), BigInt::from(7));
        assert_eq!(big_integer_argument(Some(&Value::Double(7.9)), default), BigInt::from(7));
        assert_eq!(big_integer_argument(Some(&Value::from("x")), default), BigInt::from(20_000_000_000u64));
    }

    #[test]
    fn test_string_collection_argument() {
        let peers = Value::List(vec![Value::from("peer0"), Value::from("peer1")]);
        assert_eq!(
            string_collection_argument(Some(&peers)),
            Some(vec!["peer0".to_string(), "peer1".to_string()])
        );
        assert_eq!(string_collection_argument(Some(&Value::from("peer0"))), Some(vec!["peer0".to_string()]));
        assert_eq!(string_collection_argument(Some(&Value::Int(1))), None);
        assert_eq!(string_collection_argument(None), None);
    }
}
