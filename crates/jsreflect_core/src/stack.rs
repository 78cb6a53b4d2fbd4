//! Stack headroom for the recursive parser and serializer.
//!
//! The depth counters bound recursion logically; this keeps the physical
//! stack from running out before that bound is reached, whatever the size of
//! the calling thread's stack.

/// Headroom below which a fresh segment is allocated.
const RED_ZONE: usize = 128 * 1024;

/// Size of each fresh stack segment.
const STACK_SEGMENT: usize = 1024 * 1024;

/// Run `f`, first moving to a new stack segment if fewer than
/// [`RED_ZONE`] bytes remain on the current one.
#[inline]
pub(crate) fn with_headroom<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_SEGMENT, f)
}
