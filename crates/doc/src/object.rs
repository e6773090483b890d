use std::alloc::Layout;
use std::collections::hash_map::RandomState;
use std::fmt;
use std::hash::{BuildHasher, Hasher};
use std::ptr::{self, NonNull};

use mem::Handle;

use crate::{Error, Text, Value};

// An index slot holding no pair offset.
const EMPTY: u32 = u32::MAX;

/// One key/value pair of an [`Object`].
pub struct Entry<'r> {
    pub(crate) key: Text<'r>,
    pub(crate) value: Value<'r>,
}

impl<'r> Entry<'r> {
    #[inline]
    pub fn key(&self) -> &Text<'r> {
        &self.key
    }

    #[inline]
    pub fn value(&self) -> &Value<'r> {
        &self.value
    }

    #[inline]
    pub fn value_mut(&mut self) -> &mut Value<'r> {
        &mut self.value
    }
}

/// Object is an insertion-ordered mapping of string keys to values: a dense
/// pair array preserving insertion order, plus an open-addressed index of
/// pair offsets probed linearly.
///
/// The key hash is salted, and the salt is drawn at construction and fixed
/// for the object's lifetime, so hostile inputs cannot aim collisions at a
/// known hash. The index capacity is a power of two of at least twice the
/// entry count. An object holds at most 2³²−1 entries.
pub struct Object<'r> {
    pairs: Option<NonNull<Entry<'r>>>,
    len: u32,
    cap: u32,
    index: Option<NonNull<u32>>,
    index_cap: usize,
    salt: u64,
    handle: Handle<'r>,
}

impl<'r> Object<'r> {
    pub fn new(handle: &Handle<'r>) -> Self {
        Self {
            pairs: None,
            len: 0,
            cap: 0,
            index: None,
            index_cap: 0,
            salt: RandomState::new().build_hasher().finish(),
            handle: handle.clone(),
        }
    }

    pub fn with_capacity(capacity: usize, handle: &Handle<'r>) -> Result<Self, Error> {
        let mut obj = Self::new(handle);
        obj.grow_pairs(capacity)?;
        obj.ensure_index(capacity)?;
        Ok(obj)
    }

    /// Assemble an object from parsed pairs in document order. A duplicate
    /// key either collapses onto its first occurrence with the later value
    /// winning, or rejects the document when `reject_duplicates` is set.
    pub fn from_pairs<I>(
        iter: I,
        handle: &Handle<'r>,
        reject_duplicates: bool,
    ) -> Result<Object<'r>, Error>
    where
        I: ExactSizeIterator<Item = (Text<'r>, Value<'r>)>,
    {
        let mut obj = Self::with_capacity(iter.len(), handle)?;
        let mut dups = 0usize;

        for (key, value) in iter {
            match obj.find_pair(key.as_bytes()) {
                Some(_) if reject_duplicates => {
                    return Err(Error::DuplicateKey);
                }
                Some(at) => {
                    let value = obj.adopt(value)?;
                    obj.entries_mut()[at as usize].value = value;
                    dups += 1;
                }
                None => {
                    obj.push_pair(key, value)?;
                }
            }
        }
        if dups > 0 {
            tracing::debug!(dups, "collapsed duplicate object keys, later values win");
        }
        Ok(obj)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn handle(&self) -> &Handle<'r> {
        &self.handle
    }

    /// Entries in insertion order.
    #[inline]
    pub fn entries(&self) -> &[Entry<'r>] {
        match self.pairs {
            // Safety: the block holds `len` initialized entries.
            Some(p) => unsafe { std::slice::from_raw_parts(p.as_ptr(), self.len as usize) },
            None => &[],
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Entry<'r>> {
        self.entries().iter()
    }

    pub fn keys<'a>(&'a self) -> impl Iterator<Item = &'a Text<'r>> + 'a {
        self.entries().iter().map(Entry::key)
    }

    pub fn values<'a>(&'a self) -> impl Iterator<Item = &'a Value<'r>> + 'a {
        self.entries().iter().map(Entry::value)
    }

    pub fn values_mut<'a>(&'a mut self) -> impl Iterator<Item = &'a mut Value<'r>> + 'a {
        self.entries_mut().iter_mut().map(Entry::value_mut)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.find_pair(key.as_bytes()).is_some()
    }

    pub fn get(&self, key: &str) -> Option<&Value<'r>> {
        self.find_pair(key.as_bytes())
            .map(|at| &self.entries()[at as usize].value)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value<'r>> {
        match self.find_pair(key.as_bytes()) {
            Some(at) => Some(&mut self.entries_mut()[at as usize].value),
            None => None,
        }
    }

    /// Checked lookup.
    pub fn at(&self, key: &str) -> Result<&Value<'r>, Error> {
        self.get(key).ok_or(Error::NotFound)
    }

    pub fn at_mut(&mut self, key: &str) -> Result<&mut Value<'r>, Error> {
        self.get_mut(key).ok_or(Error::NotFound)
    }

    /// Insert `value` under `key` if absent. Returns the entry's position
    /// and whether an insertion happened; an existing entry is untouched
    /// and the incoming value is discarded.
    pub fn try_emplace(&mut self, key: &str, value: Value<'r>) -> Result<(usize, bool), Error> {
        if let Some(at) = self.find_pair(key.as_bytes()) {
            return Ok((at as usize, false));
        }
        let key = Text::from_str(key, &self.handle)?;
        let at = self.push_pair(key, value)?;
        Ok((at as usize, true))
    }

    /// Panicking flavor of [`Object::try_emplace`].
    pub fn emplace(&mut self, key: &str, value: Value<'r>) -> (usize, bool) {
        self.try_emplace(key, value).expect("object allocation failed")
    }

    /// Insert or overwrite, returning the stored value.
    pub fn assign(&mut self, key: &str, value: Value<'r>) -> Result<&mut Value<'r>, Error> {
        let value = self.adopt(value)?;
        let at = match self.find_pair(key.as_bytes()) {
            Some(at) => {
                self.entries_mut()[at as usize].value = value;
                at
            }
            None => {
                let key = Text::from_str(key, &self.handle)?;
                self.push_pair(key, value)?
            }
        };
        Ok(&mut self.entries_mut()[at as usize].value)
    }

    /// The stored value under `key`, inserting null first when absent.
    pub fn get_or_insert(&mut self, key: &str) -> Result<&mut Value<'r>, Error> {
        let at = match self.find_pair(key.as_bytes()) {
            Some(at) => at,
            None => {
                let key = Text::from_str(key, &self.handle)?;
                self.push_pair(key, Value::Null)?
            }
        };
        Ok(&mut self.entries_mut()[at as usize].value)
    }

    /// Remove and return the value under `key`. Later entries keep their
    /// insertion order; the index is rebuilt over the shifted offsets.
    pub fn remove(&mut self, key: &str) -> Option<Value<'r>> {
        let at = self.find_pair(key.as_bytes())? as usize;
        let base = self.pairs.unwrap().as_ptr();

        // Safety: read the entry out, then shift the tail down over it.
        let entry = unsafe {
            let p = base.add(at);
            let entry = ptr::read(p);
            ptr::copy(p.add(1), p, self.len as usize - at - 1);
            entry
        };
        self.len -= 1;
        self.rebuild_index();

        let Entry { key: _, value } = entry;
        Some(value)
    }

    /// Remove `key`, reporting how many entries were erased (0 or 1).
    pub fn erase(&mut self, key: &str) -> usize {
        self.remove(key).map_or(0, |_| 1)
    }

    /// Deep copy into `handle`'s resource. The copy draws a fresh salt.
    pub fn clone_in<'t>(&self, handle: &Handle<'t>) -> Result<Object<'t>, Error> {
        let mut out = Object::with_capacity(self.len(), handle)?;
        for entry in self.entries() {
            let key = entry.key.clone_in(handle)?;
            let value = entry.value.clone_in(handle)?;
            out.push_pair(key, value)?;
        }
        Ok(out)
    }

    fn entries_mut(&mut self) -> &mut [Entry<'r>] {
        match self.pairs {
            // Safety: as entries(), and we hold &mut self.
            Some(p) => unsafe { std::slice::from_raw_parts_mut(p.as_ptr(), self.len as usize) },
            None => &mut [],
        }
    }

    fn hash_key(&self, key: &[u8]) -> u64 {
        let mut hasher = fxhash::FxHasher::default();
        hasher.write_u64(self.salt);
        hasher.write(key);
        hasher.finish()
    }

    fn find_pair(&self, key: &[u8]) -> Option<u32> {
        let index = self.index?;
        let mask = self.index_cap - 1;
        let mut slot = self.hash_key(key) as usize & mask;
        loop {
            // Safety: slot is within index_cap.
            let at = unsafe { *index.as_ptr().add(slot) };
            if at == EMPTY {
                return None;
            }
            if self.entries()[at as usize].key.as_bytes() == key {
                return Some(at);
            }
            slot = (slot + 1) & mask;
        }
    }

    // Store `at` into the first empty slot of the probe chain. The index
    // always has free slots (load factor is at most one half).
    fn insert_slot(&mut self, hash: u64, at: u32) {
        let index = self.index.unwrap();
        let mask = self.index_cap - 1;
        let mut slot = hash as usize & mask;
        // Safety: slots are within index_cap.
        unsafe {
            while *index.as_ptr().add(slot) != EMPTY {
                slot = (slot + 1) & mask;
            }
            *index.as_ptr().add(slot) = at;
        }
    }

    fn push_pair(&mut self, key: Text<'r>, value: Value<'r>) -> Result<u32, Error> {
        if self.len == u32::MAX {
            return Err(Error::OutOfRange);
        }
        let key = match key.handle().is_equal(&self.handle) {
            true => key,
            false => key.clone_in(&self.handle)?,
        };
        let value = self.adopt(value)?;

        self.grow_pairs(self.len as usize + 1)?;
        self.ensure_index(self.len as usize + 1)?;

        let at = self.len;
        let hash = self.hash_key(key.as_bytes());
        // Safety: pair capacity now exceeds len.
        unsafe {
            ptr::write(
                self.pairs.unwrap().as_ptr().add(at as usize),
                Entry { key, value },
            );
        }
        self.len += 1;
        self.insert_slot(hash, at);
        Ok(at)
    }

    fn adopt(&self, value: Value<'r>) -> Result<Value<'r>, Error> {
        match value.allocator() {
            Some(h) if !h.is_equal(&self.handle) => value.clone_in(&self.handle),
            _ => Ok(value),
        }
    }

    fn grow_pairs(&mut self, needed: usize) -> Result<(), Error> {
        if needed <= self.cap as usize {
            return Ok(());
        }
        if needed > u32::MAX as usize {
            return Err(Error::OutOfRange);
        }
        let new_cap = needed.max(4).max(self.cap as usize * 2).min(u32::MAX as usize);

        let layout = Layout::array::<Entry<'r>>(new_cap).map_err(|_| Error::BadAlloc)?;
        let new_ptr = self.handle.allocate(layout)?.cast::<Entry<'r>>();

        if let Some(old) = self.pairs {
            // Safety: entries are trivially relocatable by byte copy.
            unsafe {
                ptr::copy_nonoverlapping(old.as_ptr(), new_ptr.as_ptr(), self.len as usize);
                self.handle
                    .deallocate(old.cast(), Self::pairs_layout(self.cap as usize));
            }
        }
        self.pairs = Some(new_ptr);
        self.cap = new_cap as u32;
        Ok(())
    }

    // Keep the index a power of two with capacity of at least 2 * for_len.
    fn ensure_index(&mut self, for_len: usize) -> Result<(), Error> {
        if for_len == 0 {
            return Ok(());
        }
        let mut cap = self.index_cap.max(4);
        while cap < for_len * 2 {
            cap = cap.checked_mul(2).ok_or(Error::OutOfRange)?;
        }
        if cap == self.index_cap {
            return Ok(());
        }

        let new = self
            .handle
            .allocate(Layout::array::<u32>(cap).map_err(|_| Error::BadAlloc)?)?
            .cast::<u32>();
        if let Some(old) = self.index {
            // Safety: the old index came from this handle with this layout.
            unsafe {
                self.handle
                    .deallocate(old.cast(), Self::index_layout(self.index_cap));
            }
        }
        self.index = Some(new);
        self.index_cap = cap;
        self.fill_index();
        Ok(())
    }

    fn rebuild_index(&mut self) {
        if self.index.is_some() {
            self.fill_index();
        }
    }

    fn fill_index(&mut self) {
        let index = self.index.unwrap();
        // Safety: the index block holds index_cap slots.
        unsafe {
            std::slice::from_raw_parts_mut(index.as_ptr(), self.index_cap).fill(EMPTY);
        }
        for at in 0..self.len {
            let hash = self.hash_key(self.entries()[at as usize].key.as_bytes());
            self.insert_slot(hash, at);
        }
    }

    fn pairs_layout(cap: usize) -> Layout {
        Layout::array::<Entry<'r>>(cap).expect("object capacity overflow")
    }

    fn index_layout(cap: usize) -> Layout {
        Layout::array::<u32>(cap).expect("object index overflow")
    }

    #[cfg(test)]
    pub(crate) fn index_capacity(&self) -> usize {
        self.index_cap
    }
}

impl Drop for Object<'_> {
    fn drop(&mut self) {
        // See Array::drop.
        if self.handle.drops_are_trivial() {
            return;
        }
        unsafe {
            if let Some(p) = self.pairs {
                // Safety: `len` initialized entries, blocks from this handle.
                ptr::drop_in_place(std::slice::from_raw_parts_mut(
                    p.as_ptr(),
                    self.len as usize,
                ));
                self.handle
                    .deallocate(p.cast(), Self::pairs_layout(self.cap as usize));
            }
            if let Some(index) = self.index {
                self.handle
                    .deallocate(index.cast(), Self::index_layout(self.index_cap));
            }
        }
    }
}

impl Clone for Object<'_> {
    fn clone(&self) -> Self {
        self.clone_in(&self.handle).expect("object allocation failed")
    }
}

impl PartialEq for Object<'_> {
    // Key-set equality with per-key equal values; insertion order does not
    // participate.
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len
            && self.entries().iter().all(|entry| {
                other
                    .find_pair(entry.key.as_bytes())
                    .map_or(false, |at| other.entries()[at as usize].value == entry.value)
            })
    }
}

impl<'a, 'r> IntoIterator for &'a Object<'r> {
    type Item = &'a Entry<'r>;
    type IntoIter = std::slice::Iter<'a, Entry<'r>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Debug for Entry<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&(&self.key, &self.value), f)
    }
}

impl fmt::Debug for Object<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.entries().iter().map(|e| (&e.key, &e.value)))
            .finish()
    }
}

// Safety: Object owns its blocks exclusively; the handle is Send + Sync.
unsafe impl Send for Object<'_> {}
unsafe impl Sync for Object<'_> {}
