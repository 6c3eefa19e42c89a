use super::traits::Matcher;
use arc_swap::ArcSwap;
use std::sync::Arc;

/// Holder for the matcher of one remote source.
///
/// Readers go through [`Matcher::is_match`] (lock-free, never blocks). The
/// refresh task builds a complete new matcher elsewhere and publishes it with
/// [`LiveMatcher::install`], a single pointer swap: a reader sees either the
/// old matcher or the new one, never a mix.
pub struct LiveMatcher<K: ?Sized + 'static> {
    current: ArcSwap<Arc<dyn Matcher<K>>>,
}

impl<K: ?Sized + 'static> LiveMatcher<K> {
    pub fn new(initial: Arc<dyn Matcher<K>>) -> Self {
        Self {
            current: ArcSwap::from_pointee(initial),
        }
    }

    /// Snapshot of the active matcher.
    pub fn load(&self) -> Arc<dyn Matcher<K>> {
        let guard = self.current.load();
        Arc::clone(&**guard)
    }

    pub fn install(&self, next: Arc<dyn Matcher<K>>) {
        self.current.store(Arc::new(next));
    }
}

impl<K: ?Sized + 'static> Matcher<K> for LiveMatcher<K> {
    fn is_match(&self, key: &K) -> bool {
        self.current.load().is_match(key)
    }
}
