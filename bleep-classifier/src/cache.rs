use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use crate::types::{Classification, EvidenceType};

const TOLERANCE: f64 = 0.8;

/// Jaccard similarity between two evidence-type signatures: intersection over union, 1.0 for
/// two empty sets. A plain function so it's testable without the cache's locking.
pub fn jaccard_similarity(a: &HashSet<EvidenceType>, b: &HashSet<EvidenceType>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.union(b).count();
    intersection as f64 / union as f64
}

struct CacheEntry {
    signature: HashSet<EvidenceType>,
    classification: Classification,
}

/// A performance hint only, never a source of evidence: if a device's new evidence
/// signature is at least 80% Jaccard-similar to the one a prior classification was computed
/// from, callers may reuse that classification instead of re-running `classify`.
#[derive(Default)]
pub struct ClassificationCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl ClassificationCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, mac: &str, signature: &HashSet<EvidenceType>) -> Option<Classification> {
        let guard = self.entries.lock().expect("classification cache mutex poisoned");
        let entry = guard.get(mac)?;
        if jaccard_similarity(&entry.signature, signature) >= TOLERANCE {
            Some(entry.classification)
        } else {
            None
        }
    }

    pub fn store(&self, mac: &str, signature: HashSet<EvidenceType>, classification: Classification) {
        let mut guard = self.entries.lock().expect("classification cache mutex poisoned");
        guard.insert(mac.to_owned(), CacheEntry { signature, classification });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use EvidenceType::*;

    fn set(items: &[EvidenceType]) -> HashSet<EvidenceType> {
        items.iter().copied().collect()
    }

    #[test]
    fn identical_signatures_are_fully_similar() {
        let signature = set(&[ClassicDeviceClass, LeAdvertisingData]);
        assert_eq!(jaccard_similarity(&signature, &signature), 1.0);
    }

    #[test]
    fn disjoint_signatures_are_not_similar() {
        let a = set(&[ClassicDeviceClass]);
        let b = set(&[LeAdvertisingData]);
        assert_eq!(jaccard_similarity(&a, &b), 0.0);
    }

    #[test]
    fn cache_hit_within_tolerance() {
        let cache = ClassificationCache::new();
        let original = set(&[ClassicDeviceClass, ClassicServiceUuids, LeAdvertisingData, LeGattServices]);
        cache.store("aa:bb", original.clone(), Classification::Dual);

        // Drop one of four evidence types: Jaccard = 3/4 = 0.75, just under the 0.8 tolerance.
        let mut slightly_different = original.clone();
        slightly_different.remove(&LeAdvertisingData);
        assert!(cache.get("aa:bb", &slightly_different).is_none());

        // Exact match always hits.
        assert_eq!(cache.get("aa:bb", &original), Some(Classification::Dual));
    }

    #[test]
    fn unknown_mac_is_a_cache_miss() {
        let cache = ClassificationCache::new();
        assert!(cache.get("aa:bb", &HashSet::new()).is_none());
    }
}
