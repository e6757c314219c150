/// Dependency tracking utilities
pub mod dependency {
    use indexmap::IndexSet;
    use parking_lot::RwLock;

    /// Tracks beans that are currently being created on the creation path.
    ///
    /// A bean that is requested again while its own creation is still in
    /// progress closes a cycle; the tracker keeps insertion order so the
    /// error message can show the whole chain.
    #[derive(Debug, Default)]
    pub struct CreationTracker {
        creating: RwLock<IndexSet<String>>,
    }

    impl CreationTracker {
        /// Creates a new empty creation tracker.
        pub fn new() -> Self {
            Self::default()
        }

        /// Checks if a bean is currently being created.
        pub fn is_creating(&self, name: &str) -> bool {
            self.creating.read().contains(name)
        }

        /// Marks a bean as being created.
        ///
        /// Returns `false` if the bean was already in the creating set.
        pub fn start_creating(&self, name: &str) -> bool {
            self.creating.write().insert(name.to_string())
        }

        /// Marks a bean as finished being created.
        pub fn finish_creating(&self, name: &str) {
            self.creating.write().shift_remove(name);
        }

        /// Renders the creation path ending in `name`, e.g. `a -> b -> a`.
        pub fn chain_to(&self, name: &str) -> String {
            let creating = self.creating.read();
            let mut chain: Vec<&str> = creating.iter().map(String::as_str).collect();
            chain.push(name);
            chain.join(" -> ")
        }
    }

    /// Clears the creation mark when dropped, including on early return.
    pub struct CreationGuard<'a> {
        tracker: &'a CreationTracker,
        name: String,
    }

    impl<'a> CreationGuard<'a> {
        /// Starts tracking `name`; returns `None` when it is already in creation.
        pub fn enter(tracker: &'a CreationTracker, name: &str) -> Option<Self> {
            tracker.start_creating(name).then(|| Self {
                tracker,
                name: name.to_string(),
            })
        }
    }

    impl Drop for CreationGuard<'_> {
        fn drop(&mut self) {
            self.tracker.finish_creating(&self.name);
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_creation_tracker() {
            let tracker = CreationTracker::new();

            assert!(!tracker.is_creating("serviceA"));
            assert!(tracker.start_creating("serviceA"));
            assert!(tracker.is_creating("serviceA"));

            // Circular request
            assert!(!tracker.start_creating("serviceA"));

            tracker.finish_creating("serviceA");
            assert!(!tracker.is_creating("serviceA"));
        }

        #[test]
        fn test_guard_releases_on_drop() {
            let tracker = CreationTracker::new();
            {
                let _a = CreationGuard::enter(&tracker, "serviceA").unwrap();
                let _b = CreationGuard::enter(&tracker, "serviceB").unwrap();
                assert!(CreationGuard::enter(&tracker, "serviceA").is_none());
                assert_eq!(tracker.chain_to("serviceA"), "serviceA -> serviceB -> serviceA");
            }
            assert!(!tracker.is_creating("serviceA"));
            assert!(!tracker.is_creating("serviceB"));
        }
    }
}
