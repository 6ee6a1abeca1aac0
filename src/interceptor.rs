//! # Caching Service Decorator
//!
//! [`CachedService`] wraps any [`EntityService`] and routes its three call
//! shapes through a shared [`CacheStore`]:
//!
//! ```text
//!   caller ──► CachedService ──────────────────────────────► inner service
//!                  │                                             ▲
//!                  │  get(id)      contains? ─ yes ─► take        │ miss only
//!                  │                   └──── no ──► inner.get ───┘ then put
//!                  │
//!                  │  create/update   inner call first, then put(value.id())
//!                  │
//!                  │  delete(id)      cache.delete first, then inner.delete
//!                  ▼
//!            CacheStore<CacheKey<Id>, Output>   (keys are (id, scope))
//! ```
//!
//! Every call makes exactly one call to the inner service, except a read
//! hit, which makes none. Errors from the inner service are returned
//! unchanged, and cache changes made before the failure are kept: a failed
//! delete still leaves the entry invalidated.
//!
//! Values reach the store through a [`Payload`]. The default, [`Typed`],
//! stores the service's output as is. [`Erased`] stores an [`AnyEntity`], so
//! services with different output types (say news and comments) can share
//! one store and rely on their scopes to keep ids apart.
//!
//! Overlapping misses for the same key are not coalesced. Both callers reach
//! the inner service and both populate the cache; the later `put` wins.
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use cachegate::interceptor::{CachedService, EntityService, Identified};
//! use cachegate::key::{CacheKey, Scope};
//! use cachegate::policy::lru::ConcurrentLruCache;
//!
//! #[derive(Clone)]
//! struct Article { id: u64, title: String }
//!
//! impl Identified for Article {
//!     type Id = u64;
//!     fn id(&self) -> u64 { self.id }
//! }
//!
//! struct Articles;
//!
//! impl EntityService for Articles {
//!     type Id = u64;
//!     type Input = String;
//!     type Output = Article;
//!     type Error = std::convert::Infallible;
//!
//!     fn get(&self, id: &u64) -> Result<Article, Self::Error> {
//!         Ok(Article { id: *id, title: format!("article {id}") })
//!     }
//!     fn create(&self, title: String) -> Result<Article, Self::Error> {
//!         Ok(Article { id: 1, title })
//!     }
//!     fn update(&self, id: &u64, title: String) -> Result<Article, Self::Error> {
//!         Ok(Article { id: *id, title })
//!     }
//!     fn delete(&self, _id: &u64) -> Result<(), Self::Error> {
//!         Ok(())
//!     }
//! }
//!
//! let cache: Arc<ConcurrentLruCache<CacheKey<u64>, Article>> =
//!     Arc::new(ConcurrentLruCache::new(128));
//! let service = CachedService::new(Articles, cache, Scope::new("articles"));
//!
//! let created = service.create("hello".into()).unwrap();
//! assert_eq!(service.get(&created.id).unwrap().title, "hello");
//! ```

use std::any::Any;
use std::fmt::{self, Debug};
use std::marker::PhantomData;
use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::key::{CacheKey, Scope};
use crate::traits::CacheStore;

/// A value that carries its own identifier.
pub trait Identified {
    type Id;

    fn id(&self) -> Self::Id;
}

/// The service shape the decorator intercepts: read by id, create, update,
/// delete by id.
pub trait EntityService {
    type Id;
    type Input;
    type Output: Identified<Id = Self::Id>;
    type Error;

    fn get(&self, id: &Self::Id) -> Result<Self::Output, Self::Error>;

    fn create(&self, input: Self::Input) -> Result<Self::Output, Self::Error>;

    fn update(&self, id: &Self::Id, input: Self::Input) -> Result<Self::Output, Self::Error>;

    fn delete(&self, id: &Self::Id) -> Result<(), Self::Error>;
}

/// How a decorator turns service values into store values and back.
pub trait Payload<T> {
    /// Value type held by the store.
    type Stored;

    fn wrap(value: &T) -> Arc<Self::Stored>;

    /// `None` if `stored` does not hold a `T`.
    fn unwrap(stored: &Self::Stored) -> Option<T>;
}

/// Stores service values as they are. The store is typed on the service's
/// output.
#[derive(Debug, Clone, Copy, Default)]
pub struct Typed;

impl<T: Clone> Payload<T> for Typed {
    type Stored = T;

    fn wrap(value: &T) -> Arc<T> {
        Arc::new(value.clone())
    }

    fn unwrap(stored: &T) -> Option<T> {
        Some(stored.clone())
    }
}

/// Stores service values as [`AnyEntity`], so services with different
/// output types can share one store.
#[derive(Debug, Clone, Copy, Default)]
pub struct Erased;

impl<T> Payload<T> for Erased
where
    T: Any + Send + Sync + Clone,
{
    type Stored = AnyEntity;

    fn wrap(value: &T) -> Arc<AnyEntity> {
        Arc::new(AnyEntity::new(value.clone()))
    }

    fn unwrap(stored: &AnyEntity) -> Option<T> {
        stored.downcast_ref::<T>().cloned()
    }
}

/// A cached value of any entity type.
///
/// ```
/// use cachegate::interceptor::AnyEntity;
///
/// let entity = AnyEntity::new(42u64);
/// assert_eq!(entity.downcast_ref::<u64>(), Some(&42));
/// assert!(!entity.is::<String>());
/// ```
pub struct AnyEntity(Box<dyn Any + Send + Sync>);

impl AnyEntity {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self(Box::new(value))
    }

    pub fn is<T: Any>(&self) -> bool {
        self.0.is::<T>()
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref()
    }
}

impl fmt::Debug for AnyEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnyEntity").finish_non_exhaustive()
    }
}

/// Read-through, write-through, delete-invalidate decorator.
///
/// Several decorators may share one store as long as their scopes differ.
/// With the default [`Typed`] payload they must also share an output type;
/// decorators built with [`CachedService::erased`] share a
/// `CacheStore<CacheKey<Id>, AnyEntity>` across output types.
#[derive(Debug)]
pub struct CachedService<S, C, P = Typed> {
    inner: S,
    cache: Arc<C>,
    scope: Scope,
    payload: PhantomData<fn() -> P>,
}

impl<S, C> CachedService<S, C> {
    pub fn new(inner: S, cache: Arc<C>, scope: Scope) -> Self {
        Self {
            inner,
            cache,
            scope,
            payload: PhantomData,
        }
    }
}

impl<S, C> CachedService<S, C, Erased> {
    /// Decorator over a store of [`AnyEntity`] values.
    pub fn erased(inner: S, cache: Arc<C>, scope: Scope) -> Self {
        Self {
            inner,
            cache,
            scope,
            payload: PhantomData,
        }
    }
}

impl<S, C, P> CachedService<S, C, P> {
    /// The wrapped service.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn cache(&self) -> &Arc<C> {
        &self.cache
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    /// Cache key for `id` in this decorator's scope.
    pub fn key_for<I>(&self, id: I) -> CacheKey<I> {
        CacheKey::new(id, self.scope)
    }
}

impl<S, C, P> CachedService<S, C, P>
where
    S: EntityService,
    S::Id: Clone + Debug,
    P: Payload<S::Output>,
    C: CacheStore<CacheKey<S::Id>, P::Stored>,
{
    fn store(&self, value: &S::Output) {
        let key = self.key_for(value.id());
        trace!(scope = %self.scope, id = ?key.id(), "caching service result");
        self.cache.put(key, P::wrap(value));
    }
}

impl<S, C, P> EntityService for CachedService<S, C, P>
where
    S: EntityService,
    S::Id: Clone + Debug,
    P: Payload<S::Output>,
    C: CacheStore<CacheKey<S::Id>, P::Stored>,
{
    type Id = S::Id;
    type Input = S::Input;
    type Output = S::Output;
    type Error = S::Error;

    fn get(&self, id: &Self::Id) -> Result<Self::Output, Self::Error> {
        let key = self.key_for(id.clone());

        // The entry can vanish between the two calls; that is a miss.
        if self.cache.contains(&key)
            && let Ok(stored) = self.cache.take(&key)
        {
            if let Some(value) = P::unwrap(&stored) {
                trace!(scope = %self.scope, ?id, "cache hit");
                return Ok(value);
            }
            warn!(scope = %self.scope, ?id, "cached value has another type, reading through");
        }

        debug!(scope = %self.scope, ?id, "cache miss, reading through");
        let value = self.inner.get(id)?;
        self.cache.put(key, P::wrap(&value));
        Ok(value)
    }

    fn create(&self, input: Self::Input) -> Result<Self::Output, Self::Error> {
        let value = self.inner.create(input)?;
        self.store(&value);
        Ok(value)
    }

    fn update(&self, id: &Self::Id, input: Self::Input) -> Result<Self::Output, Self::Error> {
        let value = self.inner.update(id, input)?;
        self.store(&value);
        Ok(value)
    }

    fn delete(&self, id: &Self::Id) -> Result<(), Self::Error> {
        let removed = self.cache.delete(&self.key_for(id.clone()));
        debug!(scope = %self.scope, ?id, resident = removed.is_some(), "invalidated before delete");
        self.inner.delete(id)
    }
}
