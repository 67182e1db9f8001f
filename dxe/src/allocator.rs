//! Global allocator backed by boot services pool memory.
//!
//! Pool allocations are 8-byte aligned. Larger alignments over-allocate and
//! keep the pool pointer in the word just below the aligned block.

use core::alloc::{GlobalAlloc, Layout};
use core::ptr::{self, NonNull};
use core::sync::atomic::{AtomicPtr, Ordering};

use morpheus_ramdisk::uefi::bindings::BootServices;
use morpheus_ramdisk::uefi::boot;

const POOL_ALIGN: usize = 8;

static BOOT_SERVICES: AtomicPtr<BootServices> = AtomicPtr::new(ptr::null_mut());

/// Must run before the first allocation.
pub fn set_boot_services(bs: *const BootServices) {
    BOOT_SERVICES.store(bs as *mut BootServices, Ordering::Release);
}

fn boot_services() -> Option<&'static BootServices> {
    // SAFETY: only ever set to the firmware's boot services table
    unsafe { BOOT_SERVICES.load(Ordering::Acquire).as_ref() }
}

pub struct PoolAllocator;

unsafe impl GlobalAlloc for PoolAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let Some(bs) = boot_services() else {
            return ptr::null_mut();
        };

        if layout.align() <= POOL_ALIGN {
            return boot::allocate_pool(bs, layout.size()).map_or(ptr::null_mut(), NonNull::as_ptr);
        }

        let Some(size) = layout.size().checked_add(layout.align()) else {
            return ptr::null_mut();
        };
        let raw = match boot::allocate_pool(bs, size) {
            Ok(raw) => raw.as_ptr(),
            Err(_) => return ptr::null_mut(),
        };
        // raw is 8-aligned, so there is always room for the back pointer
        let offset = layout.align() - (raw as usize % layout.align());
        let aligned = raw.add(offset);
        aligned.cast::<*mut u8>().sub(1).write(raw);
        aligned
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        let Some(bs) = boot_services() else {
            return;
        };
        let raw = if layout.align() <= POOL_ALIGN {
            ptr
        } else {
            ptr.cast::<*mut u8>().sub(1).read()
        };
        let _ = (bs.free_pool)(raw);
    }
}

#[global_allocator]
static ALLOCATOR: PoolAllocator = PoolAllocator;
