/// Specifies the direction of a `Sort` aggregation stage.
///
/// - `Ascending`: smallest to largest (A to Z, 0 to 9)
/// - `Descending`: largest to smallest (Z to A, 9 to 0)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

impl SortOrder {
    /// Applies this direction to an ascending comparison result.
    #[inline]
    pub fn apply(&self, ordering: std::cmp::Ordering) -> std::cmp::Ordering {
        match self {
            SortOrder::Ascending => ordering,
            SortOrder::Descending => ordering.reverse(),
        }
    }
}
