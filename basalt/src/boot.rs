//! Limine boot path.
//!
//! Limine hands over control in 64-bit mode with paging and a higher-half
//! direct map already set up, which is everything this kernel needs. The
//! entry stub immediately switches onto a statically allocated, aligned
//! boot stack: the thread system recovers the running thread by masking
//! `rsp`, so the stack the initial thread runs on must be aligned the same
//! way as every other thread stack.

use limine::BaseRevision;
use limine::request::{HhdmRequest, MemoryMapRequest, RequestsEndMarker, RequestsStartMarker};

/// Alignment and size of the boot stack. The kernel asserts that this
/// matches its per-thread stack size.
pub const BOOT_STACK_SIZE: usize = 0x8000;

#[used]
#[unsafe(link_section = ".requests_start_marker")]
static _START_MARKER: RequestsStartMarker = RequestsStartMarker::new();

#[used]
#[unsafe(link_section = ".requests")]
static BASE_REVISION: BaseRevision = BaseRevision::new();

#[used]
#[unsafe(link_section = ".requests")]
static HHDM_REQUEST: HhdmRequest = HhdmRequest::new();

#[used]
#[unsafe(link_section = ".requests")]
static MEMORY_MAP_REQUEST: MemoryMapRequest = MemoryMapRequest::new();

#[used]
#[unsafe(link_section = ".requests_end_marker")]
static _END_MARKER: RequestsEndMarker = RequestsEndMarker::new();

/// A contiguous region of already-mapped memory handed to the kernel for
/// its heap.
#[derive(Clone, Copy, Debug)]
pub struct Region {
    /// First usable virtual address.
    pub start: usize,
    /// Length in bytes.
    pub len: usize,
}

#[repr(C, align(0x8000))]
struct BootStack([u8; BOOT_STACK_SIZE]);

static mut BOOT_STACK: BootStack = BootStack([0; BOOT_STACK_SIZE]);

#[unsafe(naked)]
#[unsafe(no_mangle)]
unsafe extern "C" fn _start() -> ! {
    core::arch::naked_asm!(
        "lea rsp, [rip + {stack}]",
        "add rsp, {size}",
        "xor ebp, ebp",
        "call {main}",
        "2:",
        "cli",
        "hlt",
        "jmp 2b",
        stack = sym BOOT_STACK,
        size = const BOOT_STACK_SIZE,
        main = sym boot_main,
    )
}

extern "C" fn boot_main() -> ! {
    if !BASE_REVISION.is_supported() {
        crate::power::halt_loop();
    }

    let heap = heap_region().expect("no usable memory region for the kernel heap");

    unsafe extern "Rust" {
        fn rust_main(heap: Region) -> !;
    }
    unsafe { rust_main(heap) }
}

/// Picks the largest usable memory-map entry, skipping low memory, and
/// returns it through the direct map.
fn heap_region() -> Option<Region> {
    let hhdm = HHDM_REQUEST.get_response()?.offset();
    let memmap = MEMORY_MAP_REQUEST.get_response()?;

    let mut best: Option<(u64, u64)> = None;
    for entry in memmap.entries() {
        if entry.entry_type != limine::memory_map::EntryType::USABLE {
            continue;
        }
        let base = entry.base.max(0x10_0000);
        let end = entry.base.saturating_add(entry.length);
        if end <= base {
            continue;
        }
        let len = end - base;
        if best.map_or(true, |(_, best_len)| len > best_len) {
            best = Some((base, len));
        }
    }

    best.map(|(base, len)| Region {
        start: (base + hhdm) as usize,
        len: len as usize,
    })
}
