//! Lazily mapped query results.

mod row;
mod sequence;

use std::collections::HashMap;
use std::hash::Hash;

pub use row::RowView;
pub use sequence::ResultSequence;

/// Group `(left, right)` pairs from a join by their left side, keeping the order in
/// which right values arrived.
///
/// ```rust
/// let grouped = sql_streams::results::group_joined(vec![(1, "a"), (2, "b"), (1, "c")]);
/// assert_eq!(grouped[&1], vec!["a", "c"]);
/// assert_eq!(grouped[&2], vec!["b"]);
/// ```
pub fn group_joined<L, R, I>(pairs: I) -> HashMap<L, Vec<R>>
where
    L: Eq + Hash,
    I: IntoIterator<Item = (L, R)>,
{
    let mut grouped: HashMap<L, Vec<R>> = HashMap::new();
    for (left, right) in pairs {
        grouped.entry(left).or_default().push(right);
    }
    grouped
}
