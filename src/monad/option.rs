//! Optional values.
//!
//! The tagged union itself is `std::option::Option`: `map`, `and_then`,
//! `unwrap_or`, `is_some`/`is_none` and `match` cover the core algebra. This
//! module adds what the standard type lacks: sequencing helpers, structural
//! equality with a caller-supplied comparator, side-effect hooks and the
//! conversions to and from the nullable JSON representation exchanged with
//! external collaborators.

use std::collections::HashMap;
use std::hash::Hash;

use serde::Serialize;
use serde_json::Value;

/// Extension methods for [`Option`].
pub trait OptionExt<A>: Sized {
    /// Runs `f` on the contained value, if any, and returns the option unchanged.
    fn tap<F>(self, f: F) -> Self
    where
        F: FnOnce(&A);

    /// Turns `Some(v)` into `Ok(v)` and `None` into `Err(error)`.
    fn to_result<E>(self, error: E) -> Result<A, E>;

    /// Serializes the option into its nullable JSON form: `None` becomes `null`.
    fn to_null(&self) -> serde_json::Result<Value>
    where
        A: Serialize;

    /// Serializes the option for a field that is omitted when absent:
    /// `None` stays `None` so the caller can skip the key entirely.
    fn to_undefined(&self) -> serde_json::Result<Option<Value>>
    where
        A: Serialize;
}

impl<A> OptionExt<A> for Option<A> {
    fn tap<F>(self, f: F) -> Self
    where
        F: FnOnce(&A),
    {
        if let Some(value) = &self {
            f(value);
        }
        self
    }

    fn to_result<E>(self, error: E) -> Result<A, E> {
        self.ok_or(error)
    }

    fn to_null(&self) -> serde_json::Result<Value>
    where
        A: Serialize,
    {
        match self {
            Some(value) => serde_json::to_value(value),
            None => Ok(Value::Null),
        }
    }

    fn to_undefined(&self) -> serde_json::Result<Option<Value>>
    where
        A: Serialize,
    {
        self.as_ref().map(serde_json::to_value).transpose()
    }
}

/// Reads a JSON field that may be missing or `null`; both collapse to `None`.
pub fn from_nullable(value: Option<&Value>) -> Option<&Value> {
    value.filter(|value| !value.is_null())
}

/// Reads a JSON value where only `null` means absence.
pub fn from_null(value: &Value) -> Option<&Value> {
    (!value.is_null()).then_some(value)
}

/// Reads a JSON field where only a missing key means absence; an explicit
/// `null` is kept as `Some(Value::Null)`.
pub fn from_undefined(value: Option<&Value>) -> Option<&Value> {
    value
}

/// Turns an ordered list of options into an option of the list.
///
/// Stops at the first `None`; the remaining options are not inspected.
pub fn all<A, I>(options: I) -> Option<Vec<A>>
where
    I: IntoIterator<Item = Option<A>>,
{
    options.into_iter().collect()
}

/// Turns a keyed collection of options into an option of the map, keys preserved.
pub fn all_from_dict<K, A, I>(dict: I) -> Option<HashMap<K, A>>
where
    K: Eq + Hash,
    I: IntoIterator<Item = (K, Option<A>)>,
{
    dict.into_iter()
        .map(|(key, option)| option.map(|value| (key, value)))
        .collect()
}

/// Structural equality with a caller-supplied element comparator.
pub fn equals<A, F>(a: &Option<A>, b: &Option<A>, eq: F) -> bool
where
    F: FnOnce(&A, &A) -> bool,
{
    match (a, b) {
        (Some(a), Some(b)) => eq(a, b),
        (None, None) => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tap_runs_only_on_some() {
        let mut seen = Vec::new();
        let some = Some(3).tap(|value| seen.push(*value));
        let none = None::<i32>.tap(|value| seen.push(*value));

        assert_eq!(some, Some(3));
        assert_eq!(none, None);
        assert_eq!(seen, vec![3]);
    }

    #[test]
    fn test_to_result() {
        assert_eq!(Some(1).to_result("missing"), Ok(1));
        assert_eq!(None::<i32>.to_result("missing"), Err("missing"));
    }

    #[test]
    fn test_to_null_and_undefined() {
        assert_eq!(Some("a").to_null().unwrap(), json!("a"));
        assert_eq!(None::<&str>.to_null().unwrap(), Value::Null);
        assert_eq!(Some(2).to_undefined().unwrap(), Some(json!(2)));
        assert_eq!(None::<i32>.to_undefined().unwrap(), None);
    }

    #[test]
    fn test_from_nullable_collapses_null_and_missing() {
        let payload = json!({ "name": "ada", "nickname": null });

        assert_eq!(from_nullable(payload.get("name")), Some(&json!("ada")));
        assert_eq!(from_nullable(payload.get("nickname")), None);
        assert_eq!(from_nullable(payload.get("age")), None);
    }

    #[test]
    fn test_from_null_and_from_undefined() {
        let payload = json!({ "nickname": null });

        assert_eq!(from_null(&Value::Null), None);
        assert_eq!(from_null(&json!(1)), Some(&json!(1)));
        assert_eq!(from_undefined(payload.get("nickname")), Some(&Value::Null));
        assert_eq!(from_undefined(payload.get("age")), None);
    }

    #[test]
    fn test_all_preserves_order() {
        assert_eq!(all(vec![Some(1), Some(2), Some(3)]), Some(vec![1, 2, 3]));
        assert_eq!(all(Vec::<Option<i32>>::new()), Some(vec![]));
    }

    #[test]
    fn test_all_short_circuits_on_first_none() {
        let mut inspected = 0;
        let options = [Some(1), None, Some(3)].into_iter().inspect(|_| inspected += 1);

        assert_eq!(all(options), None);
        assert_eq!(inspected, 2);
    }

    #[test]
    fn test_all_from_dict_keeps_keys() {
        let dict = all_from_dict(vec![("a", Some(1)), ("b", Some(2))]).unwrap();
        assert_eq!(dict.get("a"), Some(&1));
        assert_eq!(dict.get("b"), Some(&2));

        assert_eq!(all_from_dict(vec![("a", Some(1)), ("b", None)]), None);
    }

    #[test]
    fn test_equals() {
        let same = |a: &i32, b: &i32| a == b;
        assert!(equals(&Some(1), &Some(1), same));
        assert!(!equals(&Some(1), &Some(2), same));
        assert!(equals(&None, &None, same));
        assert!(!equals(&Some(1), &None, same));
        assert!(!equals(&None, &Some(1), same));
    }
}
