//! Composite cache keys.
//!
//! A [`CacheKey`] pairs an entity identifier with the [`Scope`] of the service
//! that owns it. Two services that share one store (say a `news` service and a
//! `comment` service whose ids are both `u64`) can therefore never alias each
//! other's entries, even when their identifiers collide. Services with
//! different entity types share a store of
//! [`AnyEntity`](crate::interceptor::AnyEntity) values through
//! [`CachedService::erased`](crate::interceptor::CachedService::erased).
//!
//! ```text
//!   CacheKey { id: 7, scope: "news" }     ─┐
//!                                          ├─ distinct keys, same store
//!   CacheKey { id: 7, scope: "comment" }  ─┘
//! ```
//!
//! Keys are immutable once built and carry a total order (`id` first, then
//! `scope`). The LFU policy uses that order as its last-resort eviction
//! tie-break, which keeps victim selection reproducible.
//!
//! ## Example
//!
//! ```
//! use cachegate::key::{CacheKey, Scope};
//!
//! let news = Scope::new("news");
//! let comment = Scope::new("comment");
//!
//! assert_ne!(CacheKey::new(7u64, news), CacheKey::new(7u64, comment));
//! assert!(CacheKey::new(1u64, news) < CacheKey::new(2u64, news));
//! ```

use std::fmt;

/// Owner discriminator for a [`CacheKey`].
///
/// Scopes are static names chosen when a service is wired up, so they are
/// `Copy` and compare by string content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Scope(&'static str);

impl Scope {
    /// Creates a scope from a static name.
    #[inline]
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    /// Returns the scope name.
    #[inline]
    pub const fn name(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Composite identity of a cached value: entity id plus owner scope.
///
/// Field order matters for the derived `Ord`: keys sort by `id`, then by
/// `scope`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CacheKey<I> {
    id: I,
    scope: Scope,
}

impl<I> CacheKey<I> {
    /// Builds a key for `id` owned by `scope`.
    #[inline]
    pub fn new(id: I, scope: Scope) -> Self {
        Self { id, scope }
    }

    /// Entity identifier component.
    #[inline]
    pub fn id(&self) -> &I {
        &self.id
    }

    /// Owner scope component.
    #[inline]
    pub fn scope(&self) -> Scope {
        self.scope
    }

    /// Consumes the key, returning the entity identifier.
    #[inline]
    pub fn into_id(self) -> I {
        self.id
    }
}

impl<I: fmt::Display> fmt::Display for CacheKey<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.scope, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    const NEWS: Scope = Scope::new("news");
    const COMMENT: Scope = Scope::new("comment");

    #[test]
    fn same_id_different_scope_never_aliases() {
        let a = CacheKey::new(42u64, NEWS);
        let b = CacheKey::new(42u64, COMMENT);
        assert_ne!(a, b);

        let set: HashSet<_> = [a.clone(), b.clone(), a.clone()].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn ordering_is_id_then_scope() {
        let mut keys = vec![
            CacheKey::new(2u64, COMMENT),
            CacheKey::new(1u64, NEWS),
            CacheKey::new(2u64, NEWS),
            CacheKey::new(1u64, COMMENT),
        ];
        keys.sort();

        assert_eq!(
            keys,
            vec![
                CacheKey::new(1, COMMENT),
                CacheKey::new(1, NEWS),
                CacheKey::new(2, COMMENT),
                CacheKey::new(2, NEWS),
            ]
        );
    }

    #[test]
    fn accessors_and_display() {
        let key = CacheKey::new(9u64, NEWS);
        assert_eq!(*key.id(), 9);
        assert_eq!(key.scope(), NEWS);
        assert_eq!(key.scope().name(), "news");
        assert_eq!(key.to_string(), "news:9");
        assert_eq!(key.into_id(), 9);
    }
}
