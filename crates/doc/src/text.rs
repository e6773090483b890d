use std::alloc::Layout;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Range;
use std::ptr::NonNull;

use mem::Handle;

use crate::Error;

/// Strings short enough to fit here never touch the resource.
pub const INLINE_CAP: usize = 16;

/// The longest representable string, in bytes.
pub const MAX_TEXT_LEN: usize = (1 << 31) - 2;

// `tag` holds an inline length in 0..=INLINE_CAP, or HEAP_TAG when the
// contents have spilled to a resource-allocated block.
const HEAP_TAG: u8 = 0xFF;

// Capacity doubles below this, then grows by half.
const DOUBLING_LIMIT: usize = 4096;

// Heap blocks are never smaller than twice the inline capacity.
const MIN_HEAP_CAP: usize = 2 * INLINE_CAP;

/// Text is the document string type: a byte sequence treated as UTF-8, with
/// a small-string optimization storing up to [`INLINE_CAP`] bytes in place.
///
/// Contents are valid UTF-8 for every safe constructor taking `&str`; parsed
/// documents may carry arbitrary (non-control) bytes when UTF-8 validation
/// was disabled, which is why [`Text::as_str`] is checked.
pub struct Text<'r> {
    tag: u8,
    repr: Repr,
    handle: Handle<'r>,
}

#[repr(C)]
union Repr {
    inline: [u8; INLINE_CAP],
    heap: HeapBuf,
}

#[derive(Clone, Copy)]
#[repr(C)]
struct HeapBuf {
    ptr: NonNull<u8>,
    len: u32,
    cap: u32,
}

impl<'r> Text<'r> {
    pub fn new(handle: &Handle<'r>) -> Self {
        Self {
            tag: 0,
            repr: Repr {
                inline: [0; INLINE_CAP],
            },
            handle: handle.clone(),
        }
    }

    pub fn from_str(s: &str, handle: &Handle<'r>) -> Result<Self, Error> {
        Self::from_bytes(s.as_bytes(), handle)
    }

    pub fn from_bytes(bytes: &[u8], handle: &Handle<'r>) -> Result<Self, Error> {
        let mut text = Self::new(handle);
        text.append_bytes(bytes)?;
        Ok(text)
    }

    #[inline]
    pub fn len(&self) -> usize {
        if self.tag == HEAP_TAG {
            // Safety: HEAP_TAG implies the heap arm is initialized.
            unsafe { self.repr.heap.len as usize }
        } else {
            self.tag as usize
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn is_inline(&self) -> bool {
        self.tag != HEAP_TAG
    }

    /// Bytes the string can hold without reallocating.
    #[inline]
    pub fn capacity(&self) -> usize {
        if self.tag == HEAP_TAG {
            unsafe { self.repr.heap.cap as usize }
        } else {
            INLINE_CAP
        }
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        if self.tag == HEAP_TAG {
            // Safety: the heap block holds `len` initialized bytes.
            unsafe {
                let heap = &self.repr.heap;
                std::slice::from_raw_parts(heap.ptr.as_ptr(), heap.len as usize)
            }
        } else {
            // Safety: the inline arm holds `tag` initialized bytes.
            unsafe { &self.repr.inline[..self.tag as usize] }
        }
    }

    /// The contents as UTF-8, or `None` for strings parsed with validation
    /// disabled that hold invalid sequences.
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(self.as_bytes()).ok()
    }

    /// The sub-slice covering `range`, or `OutOfRange`.
    pub fn substr(&self, range: Range<usize>) -> Result<&[u8], Error> {
        self.as_bytes().get(range).ok_or(Error::OutOfRange)
    }

    pub fn handle(&self) -> &Handle<'r> {
        &self.handle
    }

    pub fn append(&mut self, s: &str) -> Result<(), Error> {
        self.append_bytes(s.as_bytes())
    }

    pub fn append_bytes(&mut self, bytes: &[u8]) -> Result<(), Error> {
        let len = self.len();
        let new_len = len.checked_add(bytes.len()).ok_or(Error::OutOfRange)?;
        self.reserve_total(new_len)?;

        // Safety: capacity now covers new_len.
        unsafe {
            std::ptr::copy_nonoverlapping(bytes.as_ptr(), self.tail_ptr(), bytes.len());
        }
        self.set_len(new_len);
        Ok(())
    }

    pub fn push(&mut self, ch: char) -> Result<(), Error> {
        let mut buf = [0u8; 4];
        self.append_bytes(ch.encode_utf8(&mut buf).as_bytes())
    }

    /// Ensure room for `additional` more bytes.
    pub fn reserve(&mut self, additional: usize) -> Result<(), Error> {
        let total = self.len().checked_add(additional).ok_or(Error::OutOfRange)?;
        self.reserve_total(total)
    }

    /// Truncate to `new_len` bytes; no-op when already shorter. Byte
    /// oriented: the cut is not required to fall on a character boundary.
    pub fn truncate(&mut self, new_len: usize) {
        if new_len < self.len() {
            self.set_len(new_len);
        }
    }

    pub fn clear(&mut self) {
        self.set_len(0);
    }

    /// Grow or shrink to exactly `new_len`, filling with `fill`.
    pub fn resize(&mut self, new_len: usize, fill: u8) -> Result<(), Error> {
        let len = self.len();
        if new_len <= len {
            self.set_len(new_len);
            return Ok(());
        }
        self.reserve_total(new_len)?;
        // Safety: capacity now covers new_len.
        unsafe {
            std::ptr::write_bytes(self.tail_ptr(), fill, new_len - len);
        }
        self.set_len(new_len);
        Ok(())
    }

    /// Release excess capacity: spilled strings short enough move back
    /// inline, longer ones reallocate to their exact length.
    pub fn shrink_to_fit(&mut self) -> Result<(), Error> {
        if self.tag != HEAP_TAG {
            return Ok(());
        }
        let heap = unsafe { self.repr.heap };
        let len = heap.len as usize;

        if len <= INLINE_CAP {
            let mut inline = [0u8; INLINE_CAP];
            inline[..len].copy_from_slice(self.as_bytes());
            // Safety: the block came from this handle with this layout.
            unsafe { self.handle.deallocate(heap.ptr, Self::layout(heap.cap as usize)) };
            self.tag = len as u8;
            self.repr = Repr { inline };
            return Ok(());
        }

        let target = len.max(MIN_HEAP_CAP);
        if target < heap.cap as usize {
            self.realloc_heap(heap, target)?;
        }
        Ok(())
    }

    /// Deep copy into `handle`'s resource.
    pub fn clone_in<'t>(&self, handle: &Handle<'t>) -> Result<Text<'t>, Error> {
        Text::from_bytes(self.as_bytes(), handle)
    }

    fn set_len(&mut self, new_len: usize) {
        debug_assert!(new_len <= self.capacity());
        if self.tag == HEAP_TAG {
            unsafe { self.repr.heap.len = new_len as u32 };
        } else {
            self.tag = new_len as u8;
        }
    }

    // Pointer one past the current contents.
    fn tail_ptr(&mut self) -> *mut u8 {
        let len = self.len();
        if self.tag == HEAP_TAG {
            unsafe { self.repr.heap.ptr.as_ptr().add(len) }
        } else {
            unsafe { self.repr.inline.as_mut_ptr().add(len) }
        }
    }

    fn reserve_total(&mut self, total: usize) -> Result<(), Error> {
        if total > MAX_TEXT_LEN {
            return Err(Error::OutOfRange);
        }
        if total <= self.capacity() {
            return Ok(());
        }

        let mut new_cap = self.capacity().max(INLINE_CAP);
        while new_cap < total {
            new_cap = if new_cap < DOUBLING_LIMIT {
                new_cap * 2
            } else {
                new_cap + new_cap / 2
            };
        }
        let new_cap = new_cap.clamp(MIN_HEAP_CAP, MAX_TEXT_LEN);

        if self.tag == HEAP_TAG {
            let heap = unsafe { self.repr.heap };
            self.realloc_heap(heap, new_cap)
        } else {
            let ptr = self.handle.allocate(Self::layout(new_cap))?;
            let len = self.tag as usize;
            // Safety: the new block covers the inline contents.
            unsafe {
                std::ptr::copy_nonoverlapping(self.repr.inline.as_ptr(), ptr.as_ptr(), len);
            }
            self.tag = HEAP_TAG;
            self.repr = Repr {
                heap: HeapBuf {
                    ptr,
                    len: len as u32,
                    cap: new_cap as u32,
                },
            };
            Ok(())
        }
    }

    fn realloc_heap(&mut self, heap: HeapBuf, new_cap: usize) -> Result<(), Error> {
        let ptr = self.handle.allocate(Self::layout(new_cap))?;
        // Safety: both blocks cover `len` bytes; the old block is released
        // with the layout it was allocated with.
        unsafe {
            std::ptr::copy_nonoverlapping(heap.ptr.as_ptr(), ptr.as_ptr(), heap.len as usize);
            self.handle.deallocate(heap.ptr, Self::layout(heap.cap as usize));
        }
        self.repr = Repr {
            heap: HeapBuf {
                ptr,
                len: heap.len,
                cap: new_cap as u32,
            },
        };
        Ok(())
    }

    fn layout(cap: usize) -> Layout {
        // Safety: byte alignment, and cap is bounded by MAX_TEXT_LEN.
        unsafe { Layout::from_size_align_unchecked(cap, 1) }
    }
}

impl Drop for Text<'_> {
    fn drop(&mut self) {
        if self.tag == HEAP_TAG {
            let heap = unsafe { self.repr.heap };
            // Safety: the block came from this handle with this layout.
            unsafe { self.handle.deallocate(heap.ptr, Self::layout(heap.cap as usize)) };
        }
    }
}

impl Clone for Text<'_> {
    fn clone(&self) -> Self {
        self.clone_in(&self.handle).expect("string allocation failed")
    }
}

impl PartialEq for Text<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}
impl Eq for Text<'_> {}

impl PartialEq<str> for Text<'_> {
    fn eq(&self, other: &str) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}
impl PartialEq<&str> for Text<'_> {
    fn eq(&self, other: &&str) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl PartialOrd for Text<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Text<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_bytes().cmp(other.as_bytes())
    }
}

impl Hash for Text<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_bytes().hash(state)
    }
}

impl fmt::Debug for Text<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&String::from_utf8_lossy(self.as_bytes()), f)
    }
}

impl fmt::Display for Text<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(self.as_bytes()))
    }
}

// Safety: Text owns its block exclusively; the handle is Send + Sync.
unsafe impl Send for Text<'_> {}
unsafe impl Sync for Text<'_> {}
