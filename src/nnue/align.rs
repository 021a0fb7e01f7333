//! Cache-line aligned storage for network parameter blocks.

use std::alloc::{alloc_zeroed, Layout};
use std::ops::{Deref, DerefMut};

/// Wrapper forcing 64-byte alignment. Parameter blocks are read on every
/// evaluated node, so they are kept cache-line aligned on the heap.
#[repr(C, align(64))]
pub struct Align64<T>(pub T);

impl<T> Deref for Align64<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T> DerefMut for Align64<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.0
    }
}

impl<T: Clone> Clone for Align64<T> {
    fn clone(&self) -> Self {
        Align64(self.0.clone())
    }
}

/// Allocate a zeroed, 64-byte aligned block directly on the heap.
///
/// Returns `None` when the allocator fails; callers surface that as a
/// hard error since inference cannot run without its buffers.
///
/// Only usable for types where the all-zero bit pattern is a valid value
/// (the integer arrays the network is made of).
pub(crate) fn boxed_zeroed<T>() -> Option<Box<Align64<T>>> {
    let layout = Layout::new::<Align64<T>>();
    if layout.size() == 0 {
        return None;
    }
    // Safety: the layout is non-zero sized, alloc_zeroed returns memory
    // valid for Align64<T> whose fields are integers, for which zeroed
    // bits are a valid representation.
    unsafe {
        let ptr = alloc_zeroed(layout).cast::<Align64<T>>();
        if ptr.is_null() {
            return None;
        }
        Some(Box::from_raw(ptr))
    }
}
