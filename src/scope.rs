use std::{
    any::Any,
    fmt::{self, Debug, Display, Formatter},
    sync::atomic::{AtomicU64, AtomicU8, Ordering},
};

static NEXT_SCOPE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identifier of a scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ScopeId(u64);

impl ScopeId {
    #[inline]
    #[must_use]
    pub(crate) fn next() -> Self {
        Self(NEXT_SCOPE_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[inline]
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }
}

impl Display for ScopeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ScopeState {
    Active = 0,
    Disposed = 1,
}

/// Opaque token of one resolution scope.
///
/// Created by [`crate::ResolutionBackend::begin_scope`] and destroyed by
/// [`crate::ResolutionBackend::end_scope`]. The handle isn't [`Clone`]: it's shared
/// as `Arc<ScopeHandle>` between the request pipeline and its logical flow.
///
/// The backend stores its own per-scope data in the handle and gets it back with [`Self::state`].
pub struct ScopeHandle {
    id: ScopeId,
    state: AtomicU8,
    backend_state: Box<dyn Any + Send + Sync>,
}

impl ScopeHandle {
    #[inline]
    #[must_use]
    pub fn new<T: Send + Sync + 'static>(backend_state: T) -> Self {
        Self::with_id(ScopeId::next(), backend_state)
    }

    /// Creates a handle for an id reserved beforehand, so the backend state can refer to it.
    #[inline]
    #[must_use]
    pub(crate) fn with_id<T: Send + Sync + 'static>(id: ScopeId, backend_state: T) -> Self {
        Self {
            id,
            state: AtomicU8::new(ScopeState::Active as u8),
            backend_state: Box::new(backend_state),
        }
    }

    #[inline]
    #[must_use]
    pub const fn id(&self) -> ScopeId {
        self.id
    }

    #[inline]
    #[must_use]
    pub fn scope_state(&self) -> ScopeState {
        match self.state.load(Ordering::Acquire) {
            0 => ScopeState::Active,
            _ => ScopeState::Disposed,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.scope_state() == ScopeState::Active
    }

    /// Backend-specific data the handle was created with.
    #[inline]
    #[must_use]
    pub fn state<T: 'static>(&self) -> Option<&T> {
        self.backend_state.downcast_ref()
    }

    /// Moves the handle to [`ScopeState::Disposed`].
    ///
    /// Returns `false` if the handle was already disposed, so only one caller ever runs the teardown.
    #[inline]
    #[must_use]
    pub fn mark_disposed(&self) -> bool {
        self.state
            .compare_exchange(
                ScopeState::Active as u8,
                ScopeState::Disposed as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }
}

impl Debug for ScopeHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopeHandle")
            .field("id", &self.id)
            .field("state", &self.scope_state())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::{ScopeHandle, ScopeState};

    #[test]
    fn test_unique_ids() {
        let scope_1 = ScopeHandle::new(());
        let scope_2 = ScopeHandle::new(());

        assert_ne!(scope_1.id(), scope_2.id());
    }

    #[test]
    fn test_dispose_once() {
        let scope = ScopeHandle::new(());
        assert_eq!(scope.scope_state(), ScopeState::Active);

        assert!(scope.mark_disposed());
        assert!(!scope.mark_disposed());
        assert_eq!(scope.scope_state(), ScopeState::Disposed);
    }

    #[test]
    fn test_backend_state() {
        struct ChildState(u8);

        let scope = ScopeHandle::new(ChildState(7));

        assert_eq!(scope.state::<ChildState>().map(|state| state.0), Some(7));
        assert!(scope.state::<()>().is_none());
    }
}
