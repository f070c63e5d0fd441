//! Per-destination cache of the last lines a sink accepted.

use std::collections::HashMap;

use super::sink::DestinationId;

/// Last successfully emitted lines for each destination.
///
/// The cache is the diff baseline; only the driver writes to it, and only
/// after the sink accepted a patch.
#[derive(Debug, Clone, Default)]
pub struct LineCache {
    lines: HashMap<DestinationId, Vec<String>>,
}

impl LineCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached lines for `destination`; empty when nothing was emitted yet.
    pub fn get(&self, destination: DestinationId) -> &[String] {
        self.lines
            .get(&destination)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Replace the cached lines for `destination`.
    pub fn store(&mut self, destination: DestinationId, lines: Vec<String>) {
        self.lines.insert(destination, lines);
    }

    /// Forget `destination`. Returns the lines it held.
    pub fn evict(&mut self, destination: DestinationId) -> Option<Vec<String>> {
        self.lines.remove(&destination)
    }

    pub fn contains(&self, destination: DestinationId) -> bool {
        self.lines.contains_key(&destination)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_destination_is_empty() {
        let cache = LineCache::new();
        assert!(cache.get(DestinationId(1)).is_empty());
        assert!(!cache.contains(DestinationId(1)));
    }

    #[test]
    fn store_replaces_verbatim() {
        let mut cache = LineCache::new();
        cache.store(DestinationId(1), vec!["a".into(), "b".into()]);
        cache.store(DestinationId(1), vec!["c".into()]);
        assert_eq!(cache.get(DestinationId(1)), &["c".to_owned()]);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn evict_forgets() {
        let mut cache = LineCache::new();
        cache.store(DestinationId(2), vec!["x".into()]);
        assert_eq!(cache.evict(DestinationId(2)), Some(vec!["x".to_owned()]));
        assert!(cache.is_empty());
    }
}
