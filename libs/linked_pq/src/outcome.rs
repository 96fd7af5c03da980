/// A queued priority together with its value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry<P, V> {
    pub priority: P,
    pub value: V,
}

impl<P, V> Entry<P, V> {
    pub fn new(priority: P, value: V) -> Self {
        Self { priority, value }
    }

    pub fn into_parts(self) -> (P, V) {
        (self.priority, self.value)
    }
}

/// Outcome handed to the completion callback of a submitted operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationResult<P, V> {
    /// The entry was inserted, or it was removed from the front of the queue.
    Success(Entry<P, V>),
    /// An insertion was refused because its priority is already queued and duplicates were
    /// not allowed. The entry is handed back untouched.
    Rejected(Entry<P, V>),
    /// A removal found the queue empty with no insertion pending.
    Empty,
}

impl<P, V> OperationResult<P, V> {
    pub fn is_success(&self) -> bool {
        matches!(self, OperationResult::Success(_))
    }

    /// The entry carried by the outcome, successful or not.
    pub fn entry(&self) -> Option<&Entry<P, V>> {
        match self {
            OperationResult::Success(entry) | OperationResult::Rejected(entry) => Some(entry),
            OperationResult::Empty => None,
        }
    }

    pub fn into_entry(self) -> Option<Entry<P, V>> {
        match self {
            OperationResult::Success(entry) | OperationResult::Rejected(entry) => Some(entry),
            OperationResult::Empty => None,
        }
    }

    pub(crate) fn removed(entry: Option<Entry<P, V>>) -> Self {
        entry.map_or(OperationResult::Empty, OperationResult::Success)
    }
}

impl<P, V> From<OperationResult<P, V>> for bool {
    fn from(result: OperationResult<P, V>) -> Self {
        result.is_success()
    }
}
