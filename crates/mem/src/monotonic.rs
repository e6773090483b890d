use std::alloc::Layout;
use std::marker::PhantomData;
use std::ptr::NonNull;
use std::sync::Mutex;

use super::{align_up, AllocError, MemoryResource};

// Slabs double from the initial size up to this cap; oversized requests get
// a slab of exactly the required size.
const INITIAL_SLAB: usize = 1024;
const MAX_SLAB: usize = 1 << 22;

// Slab data regions are aligned for any scalar type.
const SLAB_ALIGN: usize = 16;

/// MonotonicResource serves allocations from a chain of growing slabs.
/// `deallocate` is a no-op; all memory is released at once when the resource
/// drops. The first slab may be a caller-provided buffer, which is never
/// freed by the resource.
///
/// Internal state lives behind a mutex so the resource satisfies the `Sync`
/// bound of [`MemoryResource`]; the lock is uncontended in the intended
/// single-threaded use.
pub struct MonotonicResource<'b> {
    inner: Mutex<Inner>,
    marker: PhantomData<&'b mut [u8]>,
}

struct Inner {
    // Owned slab chain, most recent first. The caller-provided initial
    // buffer is never a member.
    head: *mut Slab,
    // The region currently being carved.
    base: *mut u8,
    cap: usize,
    used: usize,
    next_size: usize,
}

#[repr(C)]
struct Slab {
    next: *mut Slab,
    cap: usize,
}

const HEADER: usize = std::mem::size_of::<Slab>();

// Safety: Inner's pointers refer to memory exclusively owned by (or uniquely
// borrowed for) this resource, and all access is serialized by the mutex.
unsafe impl Send for Inner {}

impl MonotonicResource<'static> {
    pub fn new() -> Self {
        Self::with_inner(std::ptr::null_mut(), 0, INITIAL_SLAB)
    }
}

impl Default for MonotonicResource<'static> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'b> MonotonicResource<'b> {
    /// Carve initial allocations out of `buffer` (typically a stack array)
    /// before falling back to heap slabs.
    pub fn with_initial_buffer(buffer: &'b mut [u8]) -> Self {
        let cap = buffer.len();
        let next = cap.saturating_mul(2).clamp(INITIAL_SLAB, MAX_SLAB);
        Self::with_inner(buffer.as_mut_ptr(), cap, next)
    }

    fn with_inner(base: *mut u8, cap: usize, next_size: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                head: std::ptr::null_mut(),
                base,
                cap,
                used: 0,
                next_size,
            }),
            marker: PhantomData,
        }
    }
}

impl Inner {
    fn carve(&mut self, size: usize, align: usize) -> Option<NonNull<u8>> {
        if self.base.is_null() {
            return None;
        }
        let start = align_up(self.base as usize + self.used, align);
        let end = start.checked_add(size)?;
        if end > self.base as usize + self.cap {
            return None;
        }
        self.used = end - self.base as usize;
        NonNull::new(start as *mut u8)
    }

    fn grow(&mut self, size: usize, align: usize) -> Result<(), AllocError> {
        // Room for the worst-case alignment adjustment inside the slab.
        let need = size.checked_add(align.max(SLAB_ALIGN)).ok_or(AllocError)?;
        let data_cap = need.max(self.next_size);
        self.next_size = (data_cap.saturating_mul(2)).min(MAX_SLAB);

        let layout =
            Layout::from_size_align(HEADER + data_cap, SLAB_ALIGN).map_err(|_| AllocError)?;
        // Safety: the layout has non-zero size.
        let raw = unsafe { std::alloc::alloc(layout) };
        let slab = NonNull::new(raw as *mut Slab).ok_or(AllocError)?.as_ptr();

        tracing::trace!(data_cap, next_size = self.next_size, "monotonic resource grew a slab");

        // Safety: freshly allocated, exclusively owned.
        unsafe {
            (*slab).next = self.head;
            (*slab).cap = data_cap;
        }
        self.head = slab;
        self.base = unsafe { raw.add(HEADER) };
        self.cap = data_cap;
        self.used = 0;
        Ok(())
    }
}

impl MemoryResource for MonotonicResource<'_> {
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());

        if let Some(ptr) = inner.carve(layout.size(), layout.align()) {
            return Ok(ptr);
        }
        inner.grow(layout.size(), layout.align())?;
        inner
            .carve(layout.size(), layout.align())
            .ok_or(AllocError)
    }

    unsafe fn deallocate(&self, _ptr: NonNull<u8>, _layout: Layout) {}

    fn deallocate_is_trivial(&self) -> bool {
        true
    }
}

impl Drop for MonotonicResource<'_> {
    fn drop(&mut self) {
        let inner = self.inner.get_mut().unwrap_or_else(|e| e.into_inner());
        let mut slab = inner.head;
        while !slab.is_null() {
            // Safety: each slab was allocated by `grow` with this layout.
            unsafe {
                let next = (*slab).next;
                let layout =
                    Layout::from_size_align_unchecked(HEADER + (*slab).cap, SLAB_ALIGN);
                std::alloc::dealloc(slab as *mut u8, layout);
                slab = next;
            }
        }
    }
}
