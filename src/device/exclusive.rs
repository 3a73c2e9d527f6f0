//! Two-phase "apply to all or revert" helper used for exclusive access.

/// Applies `apply` to every item, in order.
///
/// Phase one attempts every item and records which ones succeeded. If any
/// attempt failed, phase two calls `revert` on exactly the recorded subset,
/// in reverse order, and the overall result is `false`. An empty slice is a
/// failure.
pub fn apply_all_or_revert<T>(
    items: &mut [T],
    mut apply: impl FnMut(&mut T) -> bool,
    mut revert: impl FnMut(&mut T),
) -> bool {
    if items.is_empty() {
        return false;
    }

    let mut succeeded = Vec::with_capacity(items.len());
    let mut failed = false;
    for (index, item) in items.iter_mut().enumerate() {
        if apply(item) {
            succeeded.push(index);
        } else {
            failed = true;
        }
    }

    if !failed {
        return true;
    }

    for index in succeeded.into_iter().rev() {
        revert(&mut items[index]);
    }
    false
}
