use itertools::{EitherOrBoth, Itertools};
use std::cmp::Ordering;

use crate::Value;

/// compare evaluates a deep, total ordering of two documents. Arrays are
/// compared lexicographically by element, objects lexicographically by
/// sorted (key, value), numbers by mathematical value. Unequal kinds order
/// as null < bool < number < string < array < object. NaN orders below
/// every other number and equal to itself, to keep the ordering total.
pub fn compare(lhs: &Value<'_>, rhs: &Value<'_>) -> Ordering {
    match (lhs, rhs) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Bool(lhs), Value::Bool(rhs)) => lhs.cmp(rhs),
        (Value::String(lhs), Value::String(rhs)) => lhs.cmp(rhs),
        (lhs, rhs) if lhs.is_number() && rhs.is_number() => num_cmp(lhs, rhs),
        (Value::Array(lhs), Value::Array(rhs)) => lhs
            .iter()
            .zip_longest(rhs.iter())
            .map(|eob| match eob {
                EitherOrBoth::Both(lhs, rhs) => compare(lhs, rhs),
                EitherOrBoth::Right(_) => Ordering::Less,
                EitherOrBoth::Left(_) => Ordering::Greater,
            })
            .find(|o| *o != Ordering::Equal)
            .unwrap_or(Ordering::Equal),
        (Value::Object(lhs), Value::Object(rhs)) => {
            fn sort<'a, 'r>(obj: &'a crate::Object<'r>) -> Vec<&'a crate::Entry<'r>> {
                let mut entries: Vec<_> = obj.iter().collect();
                entries.sort_by(|l, r| l.key().cmp(r.key()));
                entries
            }
            sort(lhs)
                .into_iter()
                .zip_longest(sort(rhs))
                .map(|eob| match eob {
                    EitherOrBoth::Both(lhs, rhs) => {
                        let prop_ord = lhs.key().cmp(rhs.key());
                        match prop_ord {
                            Ordering::Equal => compare(lhs.value(), rhs.value()),
                            _ => prop_ord,
                        }
                    }
                    EitherOrBoth::Right(_) => Ordering::Less,
                    EitherOrBoth::Left(_) => Ordering::Greater,
                })
                .find(|o| *o != Ordering::Equal)
                .unwrap_or(Ordering::Equal)
        }

        // Kinds differ: the arbitrary-but-total cross-kind ordering.
        (Value::Null, _) => Ordering::Less,
        (_, Value::Null) => Ordering::Greater,
        (Value::Bool(_), _) => Ordering::Less,
        (_, Value::Bool(_)) => Ordering::Greater,
        (lhs, _) if lhs.is_number() => Ordering::Less,
        (_, rhs) if rhs.is_number() => Ordering::Greater,
        (Value::String(_), _) => Ordering::Less,
        (_, Value::String(_)) => Ordering::Greater,
        (Value::Array(_), _) => Ordering::Less,
        (_, Value::Array(_)) => Ordering::Greater,

        // Guarded arms do not count toward exhaustiveness; every remaining
        // combination is number-vs-number and was handled above.
        _ => unreachable!("all kind combinations are ordered"),
    }
}

fn num_cmp(lhs: &Value<'_>, rhs: &Value<'_>) -> Ordering {
    use Value::{Double, Int64, Uint64};
    match (lhs, rhs) {
        (Int64(lhs), Int64(rhs)) => lhs.cmp(rhs),
        (Uint64(lhs), Uint64(rhs)) => lhs.cmp(rhs),
        (Double(lhs), Double(rhs)) => f64_cmp(lhs, rhs),

        (Int64(lhs), Uint64(_)) if *lhs < 0 => Ordering::Less,
        (Int64(lhs), Uint64(rhs)) => (*lhs as u64).cmp(rhs),
        (Uint64(_), Int64(rhs)) if *rhs < 0 => Ordering::Greater,
        (Uint64(lhs), Int64(rhs)) => lhs.cmp(&(*rhs as u64)),

        (Int64(lhs), Double(rhs)) => f64_cmp(&(*lhs as f64), rhs),
        (Double(lhs), Int64(rhs)) => f64_cmp(lhs, &(*rhs as f64)),
        (Uint64(lhs), Double(rhs)) => f64_cmp(&(*lhs as f64), rhs),
        (Double(lhs), Uint64(rhs)) => f64_cmp(lhs, &(*rhs as f64)),

        _ => unreachable!("both sides are numbers"),
    }
}

fn f64_cmp(lhs: &f64, rhs: &f64) -> Ordering {
    lhs.partial_cmp(rhs).unwrap_or_else(|| {
        if lhs.is_nan() && rhs.is_nan() {
            Ordering::Equal
        } else if lhs.is_nan() {
            Ordering::Less
        } else {
            Ordering::Greater
        }
    })
}
