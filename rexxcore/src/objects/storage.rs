use std::mem;

use crate::{Result, RexxError, Value, settings};

/// Resizable slot array backing every array-like collection.
///
/// Indices are 1-based. `block.len()` is the physical capacity, `size`
/// the logical size; slots past `size` are always empty.
#[derive(Debug, Clone, Default)]
pub struct IndexedStorage {
    block: Box<[Option<Value>]>,
    size: usize,
    item_count: usize,
    last_item: usize,
    expansions: usize,
}

fn allocate_block(len: usize) -> Result<Box<[Option<Value>]>> {
    let mut block: Vec<Option<Value>> = Vec::new();
    block
        .try_reserve_exact(len)
        .map_err(|_| RexxError::OutOfMemory {
            bytes: len.saturating_mul(mem::size_of::<Option<Value>>()),
        })?;
    block.resize_with(len, || None);
    Ok(block.into_boxed_slice())
}

impl IndexedStorage {
    pub fn new(size: usize) -> Result<Self> {
        let maximum = settings::get().max_array_size;
        if size > maximum {
            return Err(RexxError::ArrayTooBig {
                requested: size,
                maximum,
            });
        }
        Ok(Self {
            block: allocate_block(size)?,
            size,
            ..Default::default()
        })
    }

    pub fn from_values(values: impl IntoIterator<Item = Option<Value>>) -> Result<Self> {
        let maximum = settings::get().max_array_size;
        let too_big = |requested| RexxError::ArrayTooBig { requested, maximum };
        let values = values.into_iter();
        // reject before collecting when the iterator already knows its length
        if values.size_hint().0 > maximum {
            return Err(too_big(values.size_hint().0));
        }
        let values: Vec<Option<Value>> = values.collect();
        if values.len() > maximum {
            return Err(too_big(values.len()));
        }
        let mut storage = Self::new(0)?;
        storage.size = values.len();
        storage.block = values.into_boxed_slice();
        storage.recount();
        Ok(storage)
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.block.len()
    }

    #[inline]
    pub fn items(&self) -> usize {
        self.item_count
    }

    #[inline]
    pub fn last_item(&self) -> usize {
        self.last_item
    }

    /// How many times the backing block has been replaced.
    #[inline]
    pub fn expansions(&self) -> usize {
        self.expansions
    }

    /// Occupied prefix of the block, `slots()[i - 1]` is index `i`.
    #[inline]
    pub fn slots(&self) -> &[Option<Value>] {
        &self.block[..self.size]
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&Value> {
        if index == 0 || index > self.size {
            return None;
        }
        self.block[index - 1].as_ref()
    }

    #[inline]
    pub fn is_occupied(&self, index: usize) -> bool {
        self.get(index).is_some()
    }

    /// Grow the logical size to at least `size`. New slots are empty.
    pub fn ensure_size(&mut self, size: usize) -> Result<()> {
        if size <= self.size {
            return Ok(());
        }
        let maximum = settings::get().max_array_size;
        if size > maximum {
            return Err(RexxError::ArrayTooBig {
                requested: size,
                maximum,
            });
        }
        if size > self.capacity() {
            self.expand(size, maximum)?;
        }
        self.size = size;
        Ok(())
    }

    fn expand(&mut self, size: usize, maximum: usize) -> Result<()> {
        let limit = settings::get().expansion_double_limit;
        let target = if size <= limit {
            size.saturating_mul(2)
        } else {
            size.saturating_add(size / 2)
        }
        .min(maximum)
        .max(size);

        let mut block = allocate_block(target)?;
        for (new, old) in block.iter_mut().zip(self.block[..self.size].iter_mut()) {
            *new = old.take();
        }
        // the old block is left truncated and dropped with the swap
        let old = mem::replace(&mut self.block, block);
        self.expansions += 1;
        log::trace!(
            "storage expanded from {} to {} slots (size {})",
            old.len(),
            target,
            size
        );
        Ok(())
    }

    /// Store into an index within the logical size, returning the
    /// previous occupant.
    pub fn put(&mut self, index: usize, value: Option<Value>) -> Option<Value> {
        debug_assert!(index >= 1 && index <= self.size);
        let filled = value.is_some();
        let previous = mem::replace(&mut self.block[index - 1], value);
        match (previous.is_some(), filled) {
            (false, true) => self.item_count += 1,
            (true, false) => self.item_count -= 1,
            _ => (),
        }
        if filled {
            self.last_item = self.last_item.max(index);
        } else if index == self.last_item {
            self.last_item = self.scan_last(index - 1);
        }
        previous
    }

    #[inline]
    pub fn take(&mut self, index: usize) -> Option<Value> {
        if index == 0 || index > self.size {
            return None;
        }
        self.put(index, None)
    }

    /// Open `count` empty slots at `index`, shifting it and everything
    /// after it right.
    pub fn open_gap(&mut self, index: usize, count: usize) -> Result<()> {
        debug_assert!(index >= 1);
        if count == 0 {
            return Ok(());
        }
        if index > self.size {
            return self.ensure_size(index + count - 1);
        }
        let old_size = self.size;
        self.ensure_size(old_size + count)?;
        self.block[index - 1..old_size + count].rotate_right(count);
        if self.last_item >= index {
            self.last_item += count;
        }
        Ok(())
    }

    /// Remove `count` slots starting at `index`, shifting the tail left.
    pub fn close_gap(&mut self, index: usize, count: usize) {
        debug_assert!(index >= 1);
        if index > self.size || count == 0 {
            return;
        }
        let count = count.min(self.size - index + 1);
        let removed = self.block[index - 1..index - 1 + count]
            .iter()
            .filter(|slot| slot.is_some())
            .count();
        self.item_count -= removed;

        self.block[index - 1..self.size].rotate_left(count);
        let new_size = self.size - count;
        self.block[new_size..self.size].fill(None);
        self.size = new_size;

        if self.last_item >= index + count {
            self.last_item -= count;
        } else if self.last_item >= index {
            self.last_item = self.scan_last((index - 1).min(self.size));
        }
    }

    pub fn fill(&mut self, value: &Value) {
        self.block[..self.size].fill(Some(value.clone()));
        self.item_count = self.size;
        self.last_item = self.size;
    }

    /// Empty every slot, keeping the size.
    pub fn clear(&mut self) {
        self.block[..self.size].fill(None);
        self.item_count = 0;
        self.last_item = 0;
    }

    /// First empty index within the logical size.
    pub fn first_hole(&self) -> Option<usize> {
        self.slots()
            .iter()
            .position(Option::is_none)
            .map(|pos| pos + 1)
    }

    #[inline]
    pub fn is_dense(&self) -> bool {
        self.item_count == self.size
    }

    pub fn iter_occupied(&self) -> impl Iterator<Item = (usize, &Value)> {
        self.slots()
            .iter()
            .enumerate()
            .filter_map(|(pos, slot)| slot.as_ref().map(|value| (pos + 1, value)))
    }

    // highest occupied index at or below `from`
    fn scan_last(&self, from: usize) -> usize {
        (1..=from)
            .rev()
            .find(|&index| self.block[index - 1].is_some())
            .unwrap_or(0)
    }

    fn recount(&mut self) {
        self.item_count = self.slots().iter().filter(|slot| slot.is_some()).count();
        self.last_item = self.scan_last(self.size);
    }
}
