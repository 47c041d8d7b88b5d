/// How long a resolved instance lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Lifetime {
    /// One instance per backend, shared by every scope.
    Singleton,
    /// One instance per scope, finalized when the scope ends.
    Scoped,
    /// A new instance on every resolution, never cached or finalized.
    Transient,
}

impl Lifetime {
    #[inline]
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Lifetime::Singleton => "singleton",
            Lifetime::Scoped => "scoped",
            Lifetime::Transient => "transient",
        }
    }
}

/// Who manages the lifetime of an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    /// The backend caches and finalizes the instance.
    Backend,
    /// The host owns the instance; the backend only looks it up.
    Host,
}

/// Config for a registration
/// ## Fields
/// - `lifetime`:
///   Caching policy of the provided instance. See [`Lifetime`].
/// - `ownership`:
///   If [`Ownership::Host`], the instance is fetched from the host on every resolution
///   and is neither cached nor finalized by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    pub lifetime: Lifetime,
    pub ownership: Ownership,
}

impl Config {
    #[inline]
    #[must_use]
    pub const fn new(lifetime: Lifetime) -> Self {
        Self {
            lifetime,
            ownership: Ownership::Backend,
        }
    }

    #[inline]
    #[must_use]
    pub(crate) const fn host_owned() -> Self {
        Self {
            lifetime: Lifetime::Singleton,
            ownership: Ownership::Host,
        }
    }

    #[inline]
    #[must_use]
    pub(crate) const fn is_cached(&self) -> bool {
        matches!(self.ownership, Ownership::Backend) && !matches!(self.lifetime, Lifetime::Transient)
    }

    #[inline]
    #[must_use]
    pub(crate) const fn is_finalizable(&self) -> bool {
        self.is_cached()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(Lifetime::Scoped)
    }
}

impl From<Lifetime> for Config {
    fn from(lifetime: Lifetime) -> Self {
        Self::new(lifetime)
    }
}

#[cfg(test)]
mod tests {
    use super::{Config, Lifetime::*, Ownership};

    #[test]
    fn test_caching_policy() {
        assert!(Config::new(Singleton).is_cached());
        assert!(Config::new(Scoped).is_cached());
        assert!(!Config::new(Transient).is_cached());
        assert!(!Config::host_owned().is_cached());
        assert!(!Config::host_owned().is_finalizable());
        assert_eq!(Config::default().ownership, Ownership::Backend);
    }
}
