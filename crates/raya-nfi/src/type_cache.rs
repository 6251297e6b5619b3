//! Native type descriptor caches
//!
//! Engine-scoped tables indexed by `NativeSimpleType::ordinal()`, one for
//! scalar descriptors and one for array-of-scalar descriptors, plus a single
//! slot for the environment pseudo-type. Every slot is written at most once;
//! callers get the same `Arc` back for the engine's whole lifetime, so
//! compiled code may compare descriptors with `Arc::ptr_eq`.

use once_cell::sync::OnceCell;
use raya_nfi_spi::NativeSimpleType;
use std::sync::Arc;

/// What a cached descriptor describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeInfoKind {
    /// A scalar native type
    Simple(NativeSimpleType),
    /// A pointer to a contiguous array of a scalar type
    Array(NativeSimpleType),
    /// The implicit native environment argument
    Env,
}

/// Immutable layout descriptor of a native type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedTypeInfo {
    kind: TypeInfoKind,
    size: usize,
    align: usize,
}

impl CachedTypeInfo {
    fn simple(tag: NativeSimpleType) -> Self {
        Self {
            kind: TypeInfoKind::Simple(tag),
            size: tag.size(),
            align: tag.align(),
        }
    }

    // Arrays travel as a pointer to their first element
    fn array(tag: NativeSimpleType) -> Self {
        Self {
            kind: TypeInfoKind::Array(tag),
            size: std::mem::size_of::<usize>(),
            align: std::mem::align_of::<usize>(),
        }
    }

    fn env() -> Self {
        Self {
            kind: TypeInfoKind::Env,
            size: std::mem::size_of::<usize>(),
            align: std::mem::align_of::<usize>(),
        }
    }

    /// Descriptor kind
    pub fn kind(&self) -> TypeInfoKind {
        self.kind
    }

    /// Size in bytes of one argument of this type
    pub fn size(&self) -> usize {
        self.size
    }

    /// Alignment in bytes
    pub fn align(&self) -> usize {
        self.align
    }

    /// Element type of an array descriptor
    pub fn element_type(&self) -> Option<NativeSimpleType> {
        match self.kind {
            TypeInfoKind::Array(tag) => Some(tag),
            _ => None,
        }
    }

    /// Whether this is an array descriptor
    pub fn is_array(&self) -> bool {
        matches!(self.kind, TypeInfoKind::Array(_))
    }
}

/// Engine-wide descriptor tables
pub struct TypeInfoCache {
    simple: [OnceCell<Arc<CachedTypeInfo>>; NativeSimpleType::COUNT],
    array: [OnceCell<Arc<CachedTypeInfo>>; NativeSimpleType::COUNT],
    env: OnceCell<Arc<CachedTypeInfo>>,
}

impl TypeInfoCache {
    /// Create empty tables
    pub fn new() -> Self {
        Self {
            simple: std::array::from_fn(|_| OnceCell::new()),
            array: std::array::from_fn(|_| OnceCell::new()),
            env: OnceCell::new(),
        }
    }

    /// Scalar descriptor for `tag`, built on first use
    pub fn lookup_simple(&self, tag: NativeSimpleType) -> Arc<CachedTypeInfo> {
        self.simple[tag.ordinal()]
            .get_or_init(|| {
                tracing::trace!(%tag, "caching simple type info");
                Arc::new(CachedTypeInfo::simple(tag))
            })
            .clone()
    }

    /// Array-of-`tag` descriptor, built on first use
    pub fn lookup_array(&self, tag: NativeSimpleType) -> Arc<CachedTypeInfo> {
        self.array[tag.ordinal()]
            .get_or_init(|| {
                tracing::trace!(%tag, "caching array type info");
                Arc::new(CachedTypeInfo::array(tag))
            })
            .clone()
    }

    /// Environment pseudo-type descriptor, built on first use
    pub fn env_type(&self) -> Arc<CachedTypeInfo> {
        self.env
            .get_or_init(|| Arc::new(CachedTypeInfo::env()))
            .clone()
    }

    /// Cached scalar descriptor, without populating the slot
    pub fn peek_simple(&self, tag: NativeSimpleType) -> Option<Arc<CachedTypeInfo>> {
        self.simple[tag.ordinal()].get().cloned()
    }

    /// Cached array descriptor, without populating the slot
    pub fn peek_array(&self, tag: NativeSimpleType) -> Option<Arc<CachedTypeInfo>> {
        self.array[tag.ordinal()].get().cloned()
    }

    /// Number of populated slots across all tables
    pub fn populated(&self) -> usize {
        let simple = self.simple.iter().filter(|s| s.get().is_some()).count();
        let array = self.array.iter().filter(|s| s.get().is_some()).count();
        simple + array + usize::from(self.env.get().is_some())
    }
}

impl Default for TypeInfoCache {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TypeInfoCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeInfoCache")
            .field("populated", &self.populated())
            .finish()
    }
}
