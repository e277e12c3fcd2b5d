use crate::value::Value;
use std::sync::Arc;

/// Fold a finished draft back onto the snapshot it was taken from.
///
/// Every node of `next` that is structurally equal to its counterpart in
/// `prev` is swapped for `prev`'s node, so the result shares all unchanged
/// subtrees with `prev`. When nothing changed at all the result is
/// `prev` itself, which callers detect with [`Value::ptr_eq`].
pub(crate) fn reconcile(prev: &Value, next: Value) -> Value {
    if prev.ptr_eq(&next) {
        return prev.clone();
    }
    match (prev, next) {
        (Value::Object(old), Value::Object(mut new)) => {
            let mut unchanged = old.len() == new.len();
            for (key, child) in Arc::make_mut(&mut new).iter_mut() {
                let Some(old_child) = old.get(key) else {
                    unchanged = false;
                    continue;
                };
                *child = reconcile(old_child, std::mem::take(child));
                unchanged &= child.ptr_eq(old_child);
            }
            if unchanged {
                prev.clone()
            } else {
                Value::Object(new)
            }
        }
        (Value::Array(old), Value::Array(mut new)) => {
            let mut unchanged = old.len() == new.len();
            for (child, old_child) in Arc::make_mut(&mut new).iter_mut().zip(old.iter()) {
                *child = reconcile(old_child, std::mem::take(child));
                unchanged &= child.ptr_eq(old_child);
            }
            if unchanged {
                prev.clone()
            } else {
                Value::Array(new)
            }
        }
        (_, next) => next,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value;

    #[test]
    fn identical_input_is_returned_as_is() {
        let prev = value!({"a": {"b": 1}});
        let out = reconcile(&prev, prev.clone());
        assert!(out.ptr_eq(&prev));
    }

    #[test]
    fn equal_rebuilt_tree_collapses_to_prev() {
        let prev = value!({"a": {"b": [1, 2, {"c": "x"}]}, "d": null});
        let rebuilt = value!({"a": {"b": [1, 2, {"c": "x"}]}, "d": null});
        assert!(!rebuilt.ptr_eq(&prev));

        let out = reconcile(&prev, rebuilt);
        assert!(out.ptr_eq(&prev));
    }

    #[test]
    fn changed_leaf_keeps_siblings_shared() {
        let prev = value!({"a": {"b": 1, "c": {"d": 2}}, "e": [1]});
        let next = value!({"a": {"b": 5, "c": {"d": 2}}, "e": [1]});

        let out = reconcile(&prev, next);

        assert!(!out.ptr_eq(&prev));
        assert!(!out["a"].ptr_eq(&prev["a"]));
        assert!(out["a"]["c"].ptr_eq(&prev["a"]["c"]));
        assert!(out["e"].ptr_eq(&prev["e"]));
        assert_eq!(out["a"]["b"].as_i64(), Some(5));
    }

    #[test]
    fn key_set_changes_are_detected() {
        let prev = value!({"a": 1, "b": 2});

        let removed = reconcile(&prev, value!({"a": 1}));
        assert_eq!(removed, value!({"a": 1}));
        assert!(!removed.ptr_eq(&prev));

        let renamed = reconcile(&prev, value!({"a": 1, "c": 2}));
        assert!(!renamed.ptr_eq(&prev));
    }

    #[test]
    fn array_growth_shares_existing_elements() {
        let prev = value!([{"id": 1}, {"id": 2}]);
        let out = reconcile(&prev, value!([{"id": 1}, {"id": 2}, {"id": 3}]));
        assert!(!out.ptr_eq(&prev));
        assert!(out[0].ptr_eq(&prev[0]));
        assert!(out[1].ptr_eq(&prev[1]));
    }

    #[test]
    fn kind_change_wins() {
        let prev = value!({"a": [1]});
        let out = reconcile(&prev, value!({"a": {"0": 1}}));
        assert!(out["a"].is_object());
    }
}
