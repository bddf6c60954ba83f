use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use vkshim_protocol::{RealId, SurrogateId};

use crate::error::CoreError;

/// First surrogate value handed out, leaving room below for null and for the
/// small sentinel values some clients stash in handle-typed fields.
const FIRST_SURROGATE: u64 = 0x2000;

/// Bijective mapping between the surrogate identities handed to the client
/// and the real identities of the underlying implementation.
///
/// Lookups take the shared lock; inserts and erases take the exclusive lock
/// for the duration of the structural change only. No lock is ever held
/// across a call into the underlying implementation.
pub struct IdentityMap {
    tables: RwLock<Tables>,
    next_surrogate: AtomicU64,
}

#[derive(Default)]
struct Tables {
    forward: HashMap<SurrogateId, RealId>,
    reverse: HashMap<RealId, SurrogateId>,
}

impl IdentityMap {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
            next_surrogate: AtomicU64::new(FIRST_SURROGATE),
        }
    }

    /// Mint a fresh surrogate for a real identity that has never been
    /// wrapped. Wrapping the same live real identity twice means the
    /// previous wrapping was never retired; that is reported, not papered
    /// over.
    pub fn wrap_new(&self, real: RealId) -> Result<SurrogateId, CoreError> {
        let surrogate = SurrogateId(self.next_surrogate.fetch_add(1, Ordering::Relaxed));
        let mut tables = self.tables.write();
        if tables.reverse.contains_key(&real) {
            return Err(CoreError::AlreadyWrapped(real));
        }
        tables.forward.insert(surrogate, real);
        tables.reverse.insert(real, surrogate);
        Ok(surrogate)
    }

    /// Resolve a surrogate to its real identity. Unknown surrogates resolve
    /// to the null identity, which the interface accepts wherever an object
    /// argument may be absent.
    pub fn unwrap(&self, surrogate: SurrogateId) -> RealId {
        if surrogate.is_null() {
            return RealId::NULL;
        }
        self.tables
            .read()
            .forward
            .get(&surrogate)
            .copied()
            .unwrap_or(RealId::NULL)
    }

    /// Atomically remove the mapping, returning the real identity if it was
    /// live. `None` means the object was already destroyed; destruction
    /// paths treat that as a no-op.
    pub fn pop(&self, surrogate: SurrogateId) -> Option<RealId> {
        let mut tables = self.tables.write();
        let real = tables.forward.remove(&surrogate)?;
        tables.reverse.remove(&real);
        Some(real)
    }

    /// Idempotent wrap for discovered objects: a real identity reported
    /// again by a later query presents the same surrogate it got the first
    /// time.
    pub fn maybe_wrap(&self, real: RealId) -> SurrogateId {
        if real.is_null() {
            return SurrogateId::NULL;
        }
        if let Some(existing) = self.tables.read().reverse.get(&real) {
            return *existing;
        }
        let candidate = SurrogateId(self.next_surrogate.fetch_add(1, Ordering::Relaxed));
        let mut tables = self.tables.write();
        if let Some(existing) = tables.reverse.get(&real) {
            // Another thread discovered the same object first.
            return *existing;
        }
        tables.forward.insert(candidate, real);
        tables.reverse.insert(real, candidate);
        candidate
    }

    pub fn len(&self) -> usize {
        self.tables.read().forward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.read().forward.is_empty()
    }
}

impl Default for IdentityMap {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_and_unwrap_round_trip() {
        let map = IdentityMap::new();
        let real = RealId(0xAB);
        let surrogate = map.wrap_new(real).unwrap();
        assert_ne!(surrogate.0, real.0);
        assert_eq!(map.unwrap(surrogate), real);
    }

    #[test]
    fn bijection_holds_over_wrap_and_pop() {
        let map = IdentityMap::new();
        let reals: Vec<RealId> = (1..=8).map(RealId).collect();
        let surrogates: Vec<SurrogateId> =
            reals.iter().map(|&r| map.wrap_new(r).unwrap()).collect();

        // Forward and reverse agree on every live pair.
        for (s, r) in surrogates.iter().zip(&reals) {
            assert_eq!(map.unwrap(*s), *r);
            assert_eq!(map.maybe_wrap(*r), *s);
        }

        // Retire half; the rest stays intact, the retired half is gone.
        for s in &surrogates[..4] {
            assert!(map.pop(*s).is_some());
        }
        for (s, r) in surrogates.iter().zip(&reals).skip(4) {
            assert_eq!(map.unwrap(*s), *r);
        }
        for s in &surrogates[..4] {
            assert_eq!(map.unwrap(*s), RealId::NULL);
        }
        assert_eq!(map.len(), 4);
    }

    #[test]
    fn wrap_new_rejects_live_duplicate() {
        let map = IdentityMap::new();
        map.wrap_new(RealId(7)).unwrap();
        assert!(matches!(
            map.wrap_new(RealId(7)),
            Err(CoreError::AlreadyWrapped(RealId(7)))
        ));
        // After retirement the real identity may be wrapped again.
        let s = map.maybe_wrap(RealId(7));
        map.pop(s);
        map.wrap_new(RealId(7)).unwrap();
    }

    #[test]
    fn pop_is_idempotent() {
        let map = IdentityMap::new();
        let s = map.wrap_new(RealId(1)).unwrap();
        assert_eq!(map.pop(s), Some(RealId(1)));
        assert_eq!(map.pop(s), None);
    }

    #[test]
    fn unknown_surrogate_resolves_to_null() {
        let map = IdentityMap::new();
        assert_eq!(map.unwrap(SurrogateId(0xDEAD)), RealId::NULL);
        assert_eq!(map.unwrap(SurrogateId::NULL), RealId::NULL);
    }

    #[test]
    fn maybe_wrap_is_stable() {
        let map = IdentityMap::new();
        let first = map.maybe_wrap(RealId(42));
        let second = map.maybe_wrap(RealId(42));
        assert_eq!(first, second);
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn concurrent_minting_stays_bijective() {
        use std::sync::Arc;

        let map = Arc::new(IdentityMap::new());
        let mut handles = Vec::new();
        for t in 0..4u64 {
            let map = Arc::clone(&map);
            handles.push(std::thread::spawn(move || {
                for i in 0..256u64 {
                    let real = RealId(1 + t * 1000 + i);
                    let s = map.wrap_new(real).unwrap();
                    assert_eq!(map.unwrap(s), real);
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(map.len(), 4 * 256);
    }
}
