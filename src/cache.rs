use std::{collections::VecDeque, mem};

use crate::any::{self, Instance, TypeInfo};

#[derive(Default)]
pub(crate) struct Cache {
    pub(crate) map: any::Map,
    pub(crate) resolved: ResolvedSet,
    closed: bool,
}

impl Cache {
    #[inline]
    #[must_use]
    pub(crate) fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub(crate) fn get(&self, type_info: &TypeInfo) -> Option<Instance> {
        self.map.get(type_info).cloned()
    }

    #[inline]
    pub(crate) fn insert(&mut self, type_info: TypeInfo, instance: Instance) -> Option<Instance> {
        self.map.insert(type_info, instance)
    }

    #[inline]
    pub(crate) fn push_resolved(&mut self, resolved: Resolved) {
        self.resolved.push(resolved);
    }

    /// Takes the resolved set and clears cached instances.
    #[inline]
    #[must_use]
    pub(crate) fn drain(&mut self) -> ResolvedSet {
        self.map.clear();
        mem::take(&mut self.resolved)
    }

    /// Drains the cache and refuses any later insert.
    #[inline]
    #[must_use]
    pub(crate) fn close(&mut self) -> ResolvedSet {
        self.closed = true;
        self.drain()
    }

    #[inline]
    #[must_use]
    pub(crate) const fn is_closed(&self) -> bool {
        self.closed
    }
}

pub(crate) struct Resolved {
    pub(crate) type_info: TypeInfo,
    pub(crate) dependency: Instance,
}

#[derive(Default)]
pub(crate) struct ResolvedSet(pub(crate) VecDeque<Resolved>);

impl ResolvedSet {
    #[inline]
    pub(crate) fn push(&mut self, resolved: Resolved) {
        self.0.push_back(resolved);
    }

    /// Pops in LIFO order of resolution.
    #[inline]
    pub(crate) fn pop(&mut self) -> Option<Resolved> {
        self.0.pop_back()
    }
}

#[cfg(test)]
mod tests {
    use super::{Cache, Resolved};
    use crate::any::{Instance, TypeInfo};

    use std::sync::Arc;

    #[test]
    fn test_drain_lifo() {
        let mut cache = Cache::new();
        for type_info in [TypeInfo::of::<u8>(), TypeInfo::of::<u16>(), TypeInfo::of::<u32>()] {
            let instance: Instance = Arc::new(());
            cache.insert(type_info, instance.clone());
            cache.push_resolved(Resolved {
                type_info,
                dependency: instance,
            });
        }

        let mut resolved = cache.drain();

        assert!(cache.map.is_empty());
        assert_eq!(resolved.pop().map(|resolved| resolved.type_info), Some(TypeInfo::of::<u32>()));
        assert_eq!(resolved.pop().map(|resolved| resolved.type_info), Some(TypeInfo::of::<u16>()));
        assert_eq!(resolved.pop().map(|resolved| resolved.type_info), Some(TypeInfo::of::<u8>()));
        assert!(resolved.pop().is_none());
    }

    #[test]
    fn test_close() {
        let mut cache = Cache::new();
        cache.insert(TypeInfo::of::<u8>(), Arc::new(1u8));

        let _ = cache.drain();
        assert!(!cache.is_closed());

        let _ = cache.close();
        assert!(cache.is_closed());
        assert!(cache.map.is_empty());
    }
}
