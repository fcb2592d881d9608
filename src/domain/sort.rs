//! Multi-key sorting by dotted field paths
//!
//! A sort spec looks like `state.position:asc,position:desc`. Each item is
//! projected to JSON once, keys are resolved by walking the path, and items
//! are compared key by key until one differs. The sort is stable.
//!
//! Paths that do not resolve (an optional relation that is absent, a typo)
//! yield no value. Missing values compare equal to each other and order
//! before any present value, so sorting by `epic.name` works when only some
//! stories have an epic.

use std::cmp::Ordering;

use serde::Serialize;
use serde_json::Value;

/// One sort key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub path: Vec<String>,
    pub descending: bool,
}

impl SortKey {
    fn resolve<'v>(&self, root: &'v Value) -> Option<&'v Value> {
        self.path.iter().try_fold(root, |value, segment| match value {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        })
    }
}

/// An ordered list of sort keys
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortSpec {
    keys: Vec<SortKey>,
}

impl SortSpec {
    pub fn keys(&self) -> &[SortKey] {
        &self.keys
    }

    /// Sorts `items` in place according to the spec
    pub fn sort<T: Serialize>(&self, items: &mut Vec<T>) {
        if self.keys.is_empty() {
            return;
        }

        let mut keyed: Vec<(Value, T)> = items
            .drain(..)
            .map(|item| (serde_json::to_value(&item).unwrap_or(Value::Null), item))
            .collect();

        keyed.sort_by(|(a, _), (b, _)| self.compare(a, b));
        items.extend(keyed.into_iter().map(|(_, item)| item));
    }

    /// Compares two projected items key by key
    pub fn compare(&self, a: &Value, b: &Value) -> Ordering {
        for key in &self.keys {
            let ord = compare_values(key.resolve(a), key.resolve(b));
            let ord = if key.descending { ord.reverse() } else { ord };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }
}

impl From<&str> for SortSpec {
    fn from(spec: &str) -> Self {
        let keys = spec
            .split(',')
            .map(str::trim)
            .filter(|group| !group.is_empty())
            .map(|group| {
                let (path, direction) = group.split_once(':').unwrap_or((group, ""));
                SortKey {
                    path: path.split('.').map(str::to_string).collect(),
                    descending: direction.to_lowercase().starts_with("des"),
                }
            })
            .collect();

        Self { keys }
    }
}

/// Total order over optional JSON values: missing/null, then booleans,
/// numbers, strings; arrays and objects are unordered among themselves.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(v: Option<&Value>) -> u8 {
        match v {
            None | Some(Value::Null) => 0,
            Some(Value::Bool(_)) => 1,
            Some(Value::Number(_)) => 2,
            Some(Value::String(_)) => 3,
            Some(Value::Array(_)) => 4,
            Some(Value::Object(_)) => 5,
        }
    }

    match (a, b) {
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            match (x.as_i64(), y.as_i64()) {
                (Some(x), Some(y)) => x.cmp(&y),
                _ => x
                    .as_f64()
                    .partial_cmp(&y.as_f64())
                    .unwrap_or(Ordering::Equal),
            }
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn spec(s: &str) -> SortSpec {
        SortSpec::from(s)
    }

    #[derive(Debug, Clone, PartialEq, Serialize)]
    struct Row {
        a: i64,
        b: i64,
        tag: u32,
    }

    #[test]
    fn parses_keys_and_directions() {
        let parsed = spec("state.position:asc,position:DESC,name");
        assert_eq!(parsed.keys().len(), 3);
        assert_eq!(parsed.keys()[0].path, vec!["state", "position"]);
        assert!(!parsed.keys()[0].descending);
        assert!(parsed.keys()[1].descending);
        assert!(!parsed.keys()[2].descending);
    }

    #[test]
    fn empty_spec_leaves_order_alone() {
        let mut rows = vec![json!({"a": 2}), json!({"a": 1})];
        spec("").sort(&mut rows);
        assert_eq!(rows, vec![json!({"a": 2}), json!({"a": 1})]);
    }

    #[test]
    fn secondary_key_breaks_ties() {
        let mut rows = vec![
            Row { a: 1, b: 1, tag: 0 },
            Row { a: 0, b: 5, tag: 1 },
            Row { a: 1, b: 9, tag: 2 },
        ];
        spec("a:asc,b:desc").sort(&mut rows);
        let tags: Vec<u32> = rows.iter().map(|r| r.tag).collect();
        assert_eq!(tags, vec![1, 2, 0]);
    }

    #[test]
    fn nested_paths_and_missing_relations() {
        let mut rows = vec![
            json!({"id": 1, "epic": {"name": "Zeta"}}),
            json!({"id": 2, "epic": null}),
            json!({"id": 3, "epic": {"name": "Alpha"}}),
            json!({"id": 4}),
        ];
        spec("epic.name").sort(&mut rows);
        let ids: Vec<i64> = rows.iter().map(|r| r["id"].as_i64().unwrap()).collect();
        assert_eq!(ids, vec![2, 4, 3, 1]);
    }

    #[test]
    fn array_index_segments() {
        let mut rows = vec![
            json!({"owners": [{"name": "b"}]}),
            json!({"owners": [{"name": "a"}]}),
        ];
        spec("owners.0.name").sort(&mut rows);
        assert_eq!(rows[0]["owners"][0]["name"], "a");
    }

    proptest! {
        #[test]
        fn matches_lexicographic_tuple_order(
            pairs in proptest::collection::vec((0i64..4, 0i64..4), 0..30)
        ) {
            let mut rows: Vec<Row> = pairs
                .iter()
                .enumerate()
                .map(|(i, (a, b))| Row { a: *a, b: *b, tag: i as u32 })
                .collect();
            let mut expected = rows.clone();
            expected.sort_by(|x, y| x.a.cmp(&y.a).then(y.b.cmp(&x.b)));

            spec("a:asc,b:desc").sort(&mut rows);
            prop_assert_eq!(rows, expected);
        }
    }
}
