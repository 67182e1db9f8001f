//! Section Locator
//!
//! Finds a named, typed section in any of the available image stores
//! (firmware volumes). The first store that returns a non-empty section wins;
//! stores are searched in the order the store set reports them.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt;
use core::ops::Deref;
use core::ptr::NonNull;

use log::{debug, warn};
use uguid::Guid;

use crate::error::LocateError;
use crate::uefi::status;
use crate::Status;

/// PI firmware file section types (leaf sections only).
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionType {
    Pe32 = 0x10,
    Te = 0x12,
    Version = 0x14,
    UserInterface = 0x15,
    FirmwareVolumeImage = 0x17,
    FreeformSubtypeGuid = 0x18,
    Raw = 0x19,
}

impl SectionType {
    /// Wire value passed to `ReadSection`.
    pub const fn as_raw(self) -> u8 {
        self as u8
    }
}

/// Firmware `FreePool` signature.
pub type FreePool = extern "efiapi" fn(buffer: *mut u8) -> Status;

/// Section bytes allocated by firmware from pool memory.
///
/// Released with the firmware's `FreePool` on drop, like `UefiBuffer` does
/// for page allocations.
struct PoolAllocation {
    ptr: NonNull<u8>,
    len: usize,
    free_pool: FreePool,
}

impl PoolAllocation {
    fn as_slice(&self) -> &[u8] {
        // SAFETY: ptr/len describe a live pool allocation (from_pool contract)
        unsafe { core::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    fn leak(self) -> &'static [u8] {
        // SAFETY: the allocation is never freed once `self` is forgotten
        let bytes = unsafe { core::slice::from_raw_parts(self.ptr.as_ptr(), self.len) };
        core::mem::forget(self);
        bytes
    }
}

impl Drop for PoolAllocation {
    fn drop(&mut self) {
        let _ = (self.free_pool)(self.ptr.as_ptr());
    }
}

enum Backing {
    Heap(Box<[u8]>),
    Pool(PoolAllocation),
}

/// Owned, immutable section contents.
///
/// The address of the bytes is stable for the lifetime of the buffer, which
/// is what lets the registrar hand it to the RAM disk service without a copy.
pub struct SectionBuffer {
    backing: Backing,
}

impl SectionBuffer {
    /// Adopt a firmware pool allocation.
    ///
    /// # Safety
    /// `ptr` must point to `len` initialized bytes allocated with the pool
    /// allocator that `free_pool` releases, and nothing else may free it.
    pub unsafe fn from_pool(ptr: NonNull<u8>, len: usize, free_pool: FreePool) -> Self {
        Self {
            backing: Backing::Pool(PoolAllocation {
                ptr,
                len,
                free_pool,
            }),
        }
    }

    pub fn as_slice(&self) -> &[u8] {
        match &self.backing {
            Backing::Heap(bytes) => bytes,
            Backing::Pool(pool) => pool.as_slice(),
        }
    }

    /// Physical (identity-mapped) address of the first byte.
    pub fn base_address(&self) -> u64 {
        self.as_slice().as_ptr() as u64
    }

    /// Give up ownership without freeing the memory.
    pub fn leak(self) -> &'static [u8] {
        match self.backing {
            Backing::Heap(bytes) => Box::leak(bytes),
            Backing::Pool(pool) => pool.leak(),
        }
    }
}

impl Deref for SectionBuffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl From<Vec<u8>> for SectionBuffer {
    fn from(bytes: Vec<u8>) -> Self {
        Self {
            backing: Backing::Heap(bytes.into_boxed_slice()),
        }
    }
}

impl From<Box<[u8]>> for SectionBuffer {
    fn from(bytes: Box<[u8]>) -> Self {
        Self {
            backing: Backing::Heap(bytes),
        }
    }
}

impl fmt::Debug for SectionBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SectionBuffer")
            .field("base", &format_args!("{:#x}", self.base_address()))
            .field("len", &self.len())
            .finish()
    }
}

/// A section found in an image store.
#[derive(Debug)]
pub struct Section {
    pub identifier: Guid,
    pub section_type: SectionType,
    pub data: SectionBuffer,
}

impl Section {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// A single read-only image store.
pub trait ImageStore {
    /// Read section `instance` of type `section_type` from the file `name`.
    ///
    /// Returns `status::NOT_FOUND` when the store has no such section.
    fn read_section(
        &self,
        name: &Guid,
        section_type: SectionType,
        instance: usize,
    ) -> Result<SectionBuffer, Status>;
}

impl<S: ImageStore + ?Sized> ImageStore for Box<S> {
    fn read_section(
        &self,
        name: &Guid,
        section_type: SectionType,
        instance: usize,
    ) -> Result<SectionBuffer, Status> {
        (**self).read_section(name, section_type, instance)
    }
}

/// The set of image stores available right now.
pub trait ImageStores {
    /// Call `visit` for each store in discovery order until it returns `Some`.
    fn find_map<T, F>(&self, visit: F) -> Option<T>
    where
        F: FnMut(usize, &dyn ImageStore) -> Option<T>;
}

impl<S: ImageStore> ImageStores for [S] {
    fn find_map<T, F>(&self, mut visit: F) -> Option<T>
    where
        F: FnMut(usize, &dyn ImageStore) -> Option<T>,
    {
        self.iter()
            .enumerate()
            .find_map(|(index, store)| visit(index, store))
    }
}

impl<S: ImageStore> ImageStores for Vec<S> {
    fn find_map<T, F>(&self, visit: F) -> Option<T>
    where
        F: FnMut(usize, &dyn ImageStore) -> Option<T>,
    {
        self.as_slice().find_map(visit)
    }
}

/// Search every store for section `instance` of `section_type` in file
/// `identifier`.
///
/// Stores that fail for reasons other than "not found" are skipped. An empty
/// section counts as absent.
pub fn locate<S>(
    stores: &S,
    identifier: &Guid,
    section_type: SectionType,
    instance: usize,
) -> Result<Section, LocateError>
where
    S: ImageStores + ?Sized,
{
    let data = stores.find_map(|index, store| {
        match store.read_section(identifier, section_type, instance) {
            Ok(data) if data.is_empty() => {
                warn!("image store {}: section {} is empty, skipping", index, identifier);
                None
            }
            Ok(data) => {
                debug!(
                    "image store {}: found {} ({} bytes)",
                    index,
                    identifier,
                    data.len()
                );
                Some(data)
            }
            Err(status::NOT_FOUND) => None,
            Err(status) => {
                warn!("image store {}: ReadSection failed ({:#x})", index, status);
                None
            }
        }
    });

    match data {
        Some(data) => Ok(Section {
            identifier: *identifier,
            section_type,
            data,
        }),
        None => Err(LocateError::NotFound),
    }
}
