use tracing::{debug, trace};
use vkshim_protocol::{ObjectType, RealId, SurrogateId};

use crate::config::LayerSettings;
use crate::deferred::DeferredOperationTracker;
use crate::error::CoreError;
use crate::identity_map::IdentityMap;
use crate::shadow::ShadowStateStore;

/// Process-scoped state of one interception layer instance. Constructed
/// explicitly and handed to every adapter -- no globals -- so independent
/// instances can coexist (one per test, typically one per process).
pub struct LayerContext {
    pub settings: LayerSettings,
    pub identities: IdentityMap,
    pub shadow: ShadowStateStore,
    pub deferred: DeferredOperationTracker,
}

impl LayerContext {
    pub fn new(settings: LayerSettings) -> Self {
        Self {
            settings,
            identities: IdentityMap::new(),
            shadow: ShadowStateStore::new(),
            deferred: DeferredOperationTracker::new(),
        }
    }

    /// Whether this context virtualizes identities at all.
    pub fn wrapping(&self) -> bool {
        self.settings.wrap_handles
    }

    /// Resolve an incoming surrogate for forwarding. Unknown surrogates
    /// resolve to the null identity, which the interface accepts wherever an
    /// object argument may be absent; logged because it can also be the
    /// shadow of a stale identity held by the caller.
    pub fn resolve(&self, surrogate: SurrogateId) -> RealId {
        if !self.wrapping() {
            return RealId(surrogate.0);
        }
        if surrogate.is_null() {
            return RealId::NULL;
        }
        let real = self.identities.unwrap(surrogate);
        if real.is_null() {
            debug!(surrogate = surrogate.0, "unknown surrogate resolved to null");
        }
        real
    }

    /// Mint the surrogate for a newly created object. Null stays null.
    pub fn mint(&self, ty: ObjectType, real: RealId) -> Result<SurrogateId, CoreError> {
        if !self.wrapping() {
            return Ok(SurrogateId(real.0));
        }
        if real.is_null() {
            return Ok(SurrogateId::NULL);
        }
        let surrogate = self.identities.wrap_new(real)?;
        trace!(?ty, surrogate = surrogate.0, real = real.0, "wrapped new object");
        Ok(surrogate)
    }

    /// Surrogate for a discovered object, stable across repeated discovery.
    pub fn adopt(&self, ty: ObjectType, real: RealId) -> SurrogateId {
        if !self.wrapping() {
            return SurrogateId(real.0);
        }
        let surrogate = self.identities.maybe_wrap(real);
        trace!(?ty, surrogate = surrogate.0, real = real.0, "adopted discovered object");
        surrogate
    }

    /// Retire a surrogate on destruction and hand back the real identity to
    /// forward. Already-retired (or never-wrapped) surrogates forward null,
    /// which the interface treats as destroying nothing.
    pub fn retire(&self, ty: ObjectType, surrogate: SurrogateId) -> RealId {
        if !self.wrapping() {
            return RealId(surrogate.0);
        }
        match self.identities.pop(surrogate) {
            Some(real) => {
                trace!(?ty, surrogate = surrogate.0, real = real.0, "retired object");
                real
            }
            None => RealId::NULL,
        }
    }
}

impl Default for LayerContext {
    fn default() -> Self {
        Self::new(LayerSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passthrough_when_wrapping_disabled() {
        let ctx = LayerContext::new(LayerSettings {
            wrap_handles: false,
        });
        let s = ctx.mint(ObjectType::Buffer, RealId(0xAB)).unwrap();
        assert_eq!(s, SurrogateId(0xAB));
        assert_eq!(ctx.resolve(s), RealId(0xAB));
        assert_eq!(ctx.retire(ObjectType::Buffer, s), RealId(0xAB));
        assert!(ctx.identities.is_empty());
    }

    #[test]
    fn null_identities_stay_null() {
        let ctx = LayerContext::default();
        assert_eq!(ctx.mint(ObjectType::Buffer, RealId::NULL).unwrap(), SurrogateId::NULL);
        assert_eq!(ctx.resolve(SurrogateId::NULL), RealId::NULL);
        assert_eq!(ctx.retire(ObjectType::Buffer, SurrogateId::NULL), RealId::NULL);
    }
}
