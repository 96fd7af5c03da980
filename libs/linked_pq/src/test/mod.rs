//! Behaviour shared by every [`crate::Dispatch`] implementation, see [`suite`].


#[cfg(test)]
mod test_suite {
    use std::sync::Arc;

    use super::suite;
    use crate::{Dispatch, SpawnPerJob};

    struct SpawnTester;

    impl suite::Tester for SpawnTester {
        fn create_dispatcher(&self) -> Arc<dyn Dispatch> {
            Arc::new(SpawnPerJob)
        }
    }

    #[test]
    fn ordering_by_mode() {
        suite::test_ordering_by_mode(SpawnTester);
    }

    #[test]
    fn duplicate_gating() {
        suite::test_duplicate_gating(SpawnTester);
    }

    #[test]
    fn concurrent_insert() {
        suite::test_concurrent_insert(SpawnTester);
    }

    #[test]
    fn concurrent_insert_and_remove() {
        suite::test_concurrent_insert_and_remove(SpawnTester);
    }

    #[test]
    fn async_insert_quiescence() {
        suite::test_async_insert_quiescence(SpawnTester);
    }

    #[test]
    fn remove_never_misses_pending_insert() {
        suite::test_remove_never_misses_pending_insert(SpawnTester);
    }

    #[test]
    fn async_remove_outcomes() {
        suite::test_async_remove_outcomes(SpawnTester);
    }

    #[test]
    fn clear_with_inflight_inserts() {
        suite::test_clear_with_inflight_inserts(SpawnTester);
    }

    #[test]
    fn iteration_matches_drain() {
        suite::test_iteration_matches_drain(SpawnTester);
    }
}
