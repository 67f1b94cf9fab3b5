//! Typeclass instance cache.

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::arena::{ExprId, TypeId};

/// A built instance: its value node and its type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachedInstance {
    pub expr: ExprId,
    pub ty: TypeId,
}

/// Cache for typeclass instances.
///
/// Maps (typeclass, argument types) → instance. The lock is held while an
/// instance is built, so concurrent requests for one key build it once.
#[derive(Debug, Default)]
pub struct InstanceCache {
    instances: Mutex<FxHashMap<(TypeId, Vec<TypeId>), CachedInstance>>,
}

impl InstanceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a cached instance.
    #[cfg(test)]
    pub fn get(&self, typeclass: TypeId, args: &[TypeId]) -> Option<CachedInstance> {
        self.instances
            .lock()
            .get(&(typeclass, args.to_vec()))
            .copied()
    }

    /// Return the cached instance for `key`, building it with `build` when
    /// absent. The flag reports whether `build` ran.
    ///
    /// # Errors
    ///
    /// Whatever `build` fails with; nothing is cached in that case.
    pub fn get_or_insert_with<E>(
        &self,
        key: (TypeId, Vec<TypeId>),
        build: impl FnOnce() -> Result<CachedInstance, E>,
    ) -> Result<(CachedInstance, bool), E> {
        let mut instances = self.instances.lock();
        if let Some(instance) = instances.get(&key) {
            return Ok((*instance, false));
        }
        let instance = build()?;
        instances.insert(key, instance);
        Ok((instance, true))
    }

    /// Number of cached instances.
    pub fn len(&self) -> usize {
        self.instances.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::ArenaId;

    fn instance(n: usize) -> CachedInstance {
        CachedInstance {
            expr: ExprId::from_index(n),
            ty: TypeId::from_index(n),
        }
    }

    #[test]
    fn builds_once_per_key() {
        let cache = InstanceCache::new();
        let key = (TypeId::from_index(10), vec![TypeId::INT32]);

        let (first, built) = cache
            .get_or_insert_with::<()>(key.clone(), || Ok(instance(1)))
            .unwrap();
        assert!(built);
        let (second, built) = cache
            .get_or_insert_with::<()>(key, || Ok(instance(2)))
            .unwrap();
        assert!(!built);
        assert_eq!(first, second);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn argument_types_are_part_of_the_key() {
        let cache = InstanceCache::new();
        let tc = TypeId::from_index(10);
        cache
            .get_or_insert_with::<()>((tc, vec![TypeId::INT32]), || Ok(instance(1)))
            .unwrap();
        cache
            .get_or_insert_with::<()>((tc, vec![TypeId::BOOL]), || Ok(instance(2)))
            .unwrap();
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(tc, &[TypeId::BOOL]), Some(instance(2)));
    }

    #[test]
    fn failed_builds_are_not_cached() {
        let cache = InstanceCache::new();
        let key = (TypeId::from_index(10), vec![]);
        assert!(cache.get_or_insert_with(key, || Err("boom")).is_err());
        assert!(cache.is_empty());
    }
}
