//! The erased key type shared by [`crate::dmap::DMap`] and the reverse-dependency index.
//!
//! A [`Query`] value identifies one unit of work and fixes the type of the value that
//! answers it. Because the query family is open (hosts add new query shapes by defining
//! new Rust types), anything that needs to store queries of many shapes together (the
//! memo table, the traces map, the reverse-deps map) has to erase the concrete type and
//! carry a runtime witness that equality on the erased form implies equality of the
//! associated value type. See `table/const_type_id.rs` in the teacher crate for the
//! unsafe, pointer-cast version of this idea; this is the safe `Any`-based version.

use std::any::Any;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Implemented by every concrete query shape a host defines.
///
/// `Query` values identify one unit of work (e.g. `struct ReadFile(PathBuf)`), and the
/// associated `Value` fixes what answering that query produces. Two `Query` values are
/// compared through `Eq`/`Hash`; values of different Rust types are never equal because
/// [`Key::new`] folds the `TypeId` into both the hash and the equality check.
pub trait Query: Any + Eq + Hash + Clone + fmt::Debug + Send + Sync + 'static {
    /// The value produced by answering this query.
    type Value: Clone + Send + Sync + 'static;
}

trait ErasedQuery: Any + Send + Sync + fmt::Debug {
    fn dyn_eq(&self, other: &dyn ErasedQuery) -> bool;
    fn as_any(&self) -> &dyn Any;
}

impl<Q: Query> ErasedQuery for Q {
    fn dyn_eq(&self, other: &dyn ErasedQuery) -> bool {
        match (other.as_any()).downcast_ref::<Q>() {
            Some(other) => self == other,
            None => false,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A type-erased [`Query`], usable as a map key regardless of which concrete query
/// shape it carries.
///
/// `Key` is cheap to clone (an `Arc` underneath) so it can be shared between the memo
/// table, the traces map, and the reverse-dependency map without re-erasing.
#[derive(Clone)]
pub struct Key {
    type_id: std::any::TypeId,
    hash: u64,
    inner: Arc<dyn ErasedQuery>,
}

impl Key {
    pub fn new<Q: Query>(query: Q) -> Self {
        use std::hash::BuildHasher;

        let type_id = typeid::of::<Q>();
        let mut hasher = crate::hash::FxHasher::default().build_hasher();
        type_id.hash(&mut hasher);
        Hash::hash(&query, &mut hasher);
        Key {
            type_id,
            hash: hasher.finish(),
            inner: Arc::new(query),
        }
    }

    /// Recovers the concrete query if `self` was built from a `Q`.
    ///
    /// Returns `None` if `self` carries a different query shape. Callers that got `self`
    /// back out of a map keyed by `Q` in the first place can treat this as infallible.
    pub fn downcast<Q: Query>(&self) -> Option<&Q> {
        if self.type_id != typeid::of::<Q>() {
            return None;
        }
        (*self.inner).as_any().downcast_ref::<Q>()
    }

    pub(crate) fn type_id(&self) -> std::any::TypeId {
        self.type_id
    }
}

impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
            && self.hash == other.hash
            && self.inner.dyn_eq(&*other.inner)
    }
}

impl Eq for Key {}

impl Hash for Key {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // The precomputed hash already folds in the type id, so a plain u64 write is
        // enough here; re-hashing the query itself on every map probe would be wasteful.
        state.write_u64(self.hash);
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.inner, f)
    }
}
