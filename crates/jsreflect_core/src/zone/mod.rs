//! Zone allocator for parse trees.
//!
//! A [`Zone`] is a bump-pointer region allocator backed by [`bumpalo`].
//! The parser allocates every [`ParseNode`](crate::parser::parse_node::ParseNode),
//! child list and atom inside one zone per reflect call; the whole tree is
//! freed in bulk when the [`Zone`] is dropped.
//!
//! # Example
//!
//! ```
//! use jsreflect_core::zone::Zone;
//!
//! let zone = Zone::new();
//! let x: &u64 = zone.alloc(42_u64);
//! let s: &str = zone.alloc_str("name");
//! assert_eq!(*x, 42);
//! assert_eq!(s, "name");
//! ```

use bumpalo::Bump;

/// A bump-pointer region allocator for parse-tree nodes.
///
/// All allocations made through a `Zone` are tied to its lifetime.  When the
/// `Zone` is dropped, every allocation is freed at once without running
/// individual destructors (the same semantics as `bumpalo`), so only types
/// without meaningful `Drop` impls belong here.
pub struct Zone {
    bump: Bump,
}

impl Zone {
    /// Create a new, empty `Zone`.
    pub fn new() -> Self {
        Self { bump: Bump::new() }
    }

    /// Allocate `value` inside the zone and return a reference to it.
    pub fn alloc<T>(&self, value: T) -> &T {
        self.bump.alloc(value)
    }

    /// Copy `s` into the zone.
    pub fn alloc_str(&self, s: &str) -> &str {
        self.bump.alloc_str(s)
    }

    /// Copy a slice of `Copy` values into the zone.
    pub fn alloc_slice<T: Copy>(&self, items: &[T]) -> &[T] {
        self.bump.alloc_slice_copy(items)
    }

    /// Total bytes currently reserved by the zone's chunks.
    pub fn allocated_bytes(&self) -> usize {
        self.bump.allocated_bytes()
    }
}

impl Default for Zone {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::Zone;

    #[test]
    fn test_alloc_single_value() {
        let zone = Zone::new();
        let r: &u32 = zone.alloc(99_u32);
        assert_eq!(*r, 99);
    }

    #[test]
    fn test_alloc_many_objects() {
        let zone = Zone::new();
        let count = 10_000_usize;
        let refs: Vec<&usize> = (0..count).map(|i| zone.alloc(i)).collect();
        for (i, r) in refs.iter().enumerate() {
            assert_eq!(**r, i, "value at index {i} was corrupted");
        }
    }

    #[test]
    fn test_alloc_str_copies_text() {
        let zone = Zone::new();
        let owned = String::from("identifier");
        let s = zone.alloc_str(&owned);
        drop(owned);
        assert_eq!(s, "identifier");
    }

    #[test]
    fn test_alloc_slice_of_references() {
        let zone = Zone::new();
        let a = zone.alloc(1_i32);
        let b = zone.alloc(2_i32);
        let items = zone.alloc_slice(&[a, b]);
        assert_eq!(*items[0], 1);
        assert_eq!(*items[1], 2);
    }

    #[test]
    fn test_default_is_new() {
        let zone: Zone = Zone::default();
        let v = zone.alloc(42_i32);
        assert_eq!(*v, 42);
        assert!(zone.allocated_bytes() > 0);
    }
}
