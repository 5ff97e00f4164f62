//! Kernel heap.
//!
//! Thread records, stacks and names live on a single heap carved out of
//! the largest usable region the bootloader reports.

use basalt::interrupt::InterruptGuard;
use core::alloc::{GlobalAlloc, Layout};
use linked_list_allocator::LockedHeap;

/// The heap lock spins, so the holder must not be preempted: a spinning
/// waiter of higher priority would never let it finish. Closing the gate
/// for the duration of each operation rules that out.
struct KernelHeap(LockedHeap);

unsafe impl GlobalAlloc for KernelHeap {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let _guard = InterruptGuard::new();
        unsafe { self.0.alloc(layout) }
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        let _guard = InterruptGuard::new();
        unsafe { self.0.dealloc(ptr, layout) }
    }
}

#[global_allocator]
static ALLOCATOR: KernelHeap = KernelHeap(LockedHeap::empty());

/// Hands `region` to the allocator. Called once during boot, before the
/// first allocation.
pub(crate) fn init(region: basalt::boot::Region) {
    unsafe {
        ALLOCATOR.0.lock().init(region.start as *mut u8, region.len);
    }
}

/// Bytes currently allocated.
pub fn used() -> usize {
    let _guard = InterruptGuard::new();
    ALLOCATOR.0.lock().used()
}

/// Bytes still available.
pub fn free() -> usize {
    let _guard = InterruptGuard::new();
    ALLOCATOR.0.lock().free()
}
