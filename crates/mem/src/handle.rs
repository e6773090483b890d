use std::alloc::Layout;
use std::fmt;
use std::ptr::NonNull;
use std::sync::atomic::{fence, AtomicUsize, Ordering};

use super::{AllocError, HeapResource, MemoryResource};

static DEFAULT: HeapResource = HeapResource;

/// Handle is a shared reference to a [`MemoryResource`].
///
/// A handle is either *borrowed* — a bare pointer to a resource that outlives
/// it, for which copy and drop are no-ops — or *counted*, owning a share of a
/// heap-allocated resource whose lifetime is managed by an atomic reference
/// count. The default handle borrows a process-wide [`HeapResource`].
///
/// The handle caches whether the resource's `deallocate` is trivial, so
/// containers can decide to skip per-element teardown without a virtual call.
pub struct Handle<'r> {
    repr: Repr<'r>,
    trivial: bool,
}

#[derive(Clone, Copy)]
enum Repr<'r> {
    Borrowed(&'r (dyn MemoryResource + 'r)),
    Counted(NonNull<CountedBlock>),
}

// A counted resource lives in a single allocation together with its refcount.
#[repr(C)]
struct Counted<R: ?Sized> {
    refs: AtomicUsize,
    resource: R,
}

type CountedBlock = Counted<dyn MemoryResource + Send + Sync>;

impl<'r> Handle<'r> {
    /// Borrow `resource` without reference counting.
    pub fn new(resource: &'r (dyn MemoryResource + 'r)) -> Self {
        Self {
            trivial: resource.deallocate_is_trivial(),
            repr: Repr::Borrowed(resource),
        }
    }

    /// Move `resource` into a counted block and return an owning handle.
    /// The resource is dropped when the last clone of the handle drops.
    pub fn shared<R>(resource: R) -> Handle<'static>
    where
        R: MemoryResource + Send + Sync + 'static,
    {
        let trivial = resource.deallocate_is_trivial();
        let block: Box<CountedBlock> = Box::new(Counted {
            refs: AtomicUsize::new(1),
            resource,
        });
        Handle {
            repr: Repr::Counted(NonNull::from(Box::leak(block))),
            trivial,
        }
    }

    /// The underlying resource.
    #[inline]
    pub fn get(&self) -> &dyn MemoryResource {
        match self.repr {
            Repr::Borrowed(r) => r,
            // Safety: a counted block lives until the last handle drops.
            Repr::Counted(p) => unsafe { &p.as_ref().resource },
        }
    }

    #[inline]
    pub fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        self.get().allocate(layout)
    }

    /// # Safety
    /// See [`MemoryResource::deallocate`].
    #[inline]
    pub unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        self.get().deallocate(ptr, layout)
    }

    /// True when both handles refer to the same resource instance.
    #[inline]
    pub fn is_equal(&self, other: &Handle<'_>) -> bool {
        self.data_ptr() == other.data_ptr()
    }

    /// True when the resource's `deallocate` is a no-op.
    #[inline]
    pub fn deallocate_is_trivial(&self) -> bool {
        self.trivial
    }

    /// True when dropping a tree allocated through this handle requires no
    /// work at all: the handle is uncounted (clones carry no side effects)
    /// and deallocation is trivial.
    #[inline]
    pub fn drops_are_trivial(&self) -> bool {
        self.trivial && matches!(self.repr, Repr::Borrowed(_))
    }

    #[inline]
    fn data_ptr(&self) -> *const u8 {
        self.get() as *const dyn MemoryResource as *const u8
    }
}

impl Default for Handle<'static> {
    fn default() -> Self {
        Handle::new(&DEFAULT)
    }
}

impl Clone for Handle<'_> {
    fn clone(&self) -> Self {
        if let Repr::Counted(p) = self.repr {
            // Safety: we hold a reference, so the count is at least one.
            unsafe { p.as_ref() }.refs.fetch_add(1, Ordering::Relaxed);
        }
        Self {
            repr: self.repr,
            trivial: self.trivial,
        }
    }
}

impl Drop for Handle<'_> {
    fn drop(&mut self) {
        if let Repr::Counted(p) = self.repr {
            // Safety: the block is live until the count reaches zero.
            if unsafe { p.as_ref() }.refs.fetch_sub(1, Ordering::Release) == 1 {
                fence(Ordering::Acquire);
                // Safety: last reference; reclaim the block.
                drop(unsafe { Box::from_raw(p.as_ptr()) });
            }
        }
    }
}

impl PartialEq for Handle<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.is_equal(other)
    }
}

impl fmt::Debug for Handle<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.repr {
            Repr::Borrowed(_) => write!(f, "Handle::Borrowed({:p})", self.data_ptr()),
            Repr::Counted(_) => write!(f, "Handle::Counted({:p})", self.data_ptr()),
        }
    }
}

// Safety: a borrowed resource is `Sync` (a supertrait of `MemoryResource`),
// and a counted block is constructed only from `Send + Sync` resources.
unsafe impl Send for Handle<'_> {}
unsafe impl Sync for Handle<'_> {}
