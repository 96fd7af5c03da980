use std::cmp::Ordering;

/// Ordering policy of a [`crate::PriorityLinkedQueue`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum PriorityMode {
    /// Larger priorities are removed first.
    #[default]
    Max,
    /// Smaller priorities are removed first.
    Min,
}

impl PriorityMode {
    /// Decides whether a new entry is placed in front of a resident one, given
    /// `resident.cmp(&candidate)`.
    ///
    /// Equal priorities never yield, which keeps entries of the same priority in arrival order.
    pub(crate) fn yields_to_candidate(self, resident_vs_candidate: Ordering) -> bool {
        match self {
            PriorityMode::Max => resident_vs_candidate == Ordering::Less,
            PriorityMode::Min => resident_vs_candidate == Ordering::Greater,
        }
    }
}
