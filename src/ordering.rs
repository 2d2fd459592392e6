//! src/ordering.rs
use std::cmp::Ordering;

/// Order in which groups leave the grouper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyOrder {
    /// Keys in the order they were first emitted.
    #[default]
    FirstSeen,
    Ascending,
}

/// Order of values inside a group when no sort value decides it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueOrder {
    /// Emission order.
    #[default]
    Insertion,
    Ascending,
}

/// Partial comparison captured from a `PartialOrd` impl, so ordering can be
/// requested per stage without making every key or value type orderable.
pub type Comparator<T> = fn(&T, &T) -> Option<Ordering>;

pub(crate) fn comparator<T: PartialOrd>() -> Comparator<T> {
    <T as PartialOrd>::partial_cmp
}

/// Stable merge sort. Stops at the first pair `cmp` cannot order and reports
/// one of its elements, rendered with `describe`: the one that cannot be
/// compared with itself (a NaN) if there is one, otherwise the left one.
///
/// `slice::sort_by` needs a total order and may panic when handed a partial
/// one, so incomparable pairs never reach it.
pub(crate) fn try_sort_by<T, F, D>(items: Vec<T>, mut cmp: F, describe: D) -> Result<Vec<T>, String>
where
    F: FnMut(&T, &T) -> Option<Ordering>,
    D: Fn(&T) -> String,
{
    merge_sort(items, &mut cmp, &describe)
}

fn merge_sort<T, F, D>(mut items: Vec<T>, cmp: &mut F, describe: &D) -> Result<Vec<T>, String>
where
    F: FnMut(&T, &T) -> Option<Ordering>,
    D: Fn(&T) -> String,
{
    if items.len() < 2 {
        return Ok(items);
    }
    let right = items.split_off(items.len() / 2);
    let left = merge_sort(items, cmp, describe)?;
    let right = merge_sort(right, cmp, describe)?;

    let mut merged = Vec::with_capacity(left.len() + right.len());
    let mut left = left.into_iter().peekable();
    let mut right = right.into_iter().peekable();
    while let (Some(a), Some(b)) = (left.peek(), right.peek()) {
        match cmp(a, b) {
            None if cmp(a, a).is_some() && cmp(b, b).is_none() => return Err(describe(b)),
            None => return Err(describe(a)),
            // Ties go left.
            Some(Ordering::Greater) => merged.extend(right.next()),
            Some(_) => merged.extend(left.next()),
        }
    }
    merged.extend(left);
    merged.extend(right);
    Ok(merged)
}
