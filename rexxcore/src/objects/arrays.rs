use std::cmp::Ordering;

use crate::{
    IndexedStorage, Result, RexxError, RexxString, Supplier, Value, Visitable, Visitor,
    objects::sort, settings,
};

/// Outcome of a non-raising array lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup<T> {
    Found(T),
    /// index is within bounds but the slot is empty
    Empty,
    /// index lies outside the current bounds
    NoSuchIndex,
}

impl<T> Lookup<T> {
    #[inline]
    pub fn item(self) -> Option<T> {
        match self {
            Lookup::Found(item) => Some(item),
            _ => None,
        }
    }

    #[inline]
    pub fn is_found(&self) -> bool {
        matches!(self, Lookup::Found(_))
    }
}

/// 1-based, optionally multi-dimensional, sparse dynamic array.
#[derive(Debug, Clone, Default)]
pub struct Array {
    storage: IndexedStorage,
    // None: single dimension that may still become multi-dimensional
    dimensions: Option<Vec<usize>>,
}

fn product(dimensions: &[usize]) -> Result<usize> {
    let maximum = settings::get().max_array_size;
    let size = dimensions
        .iter()
        .try_fold(1usize, |acc, &dim| acc.checked_mul(dim))
        .ok_or(RexxError::ArrayTooBig {
            requested: usize::MAX,
            maximum,
        })?;
    if size > maximum {
        return Err(RexxError::ArrayTooBig {
            requested: size,
            maximum,
        });
    }
    Ok(size)
}

fn check_subscripts(subscripts: &[usize]) -> Result<()> {
    if subscripts.is_empty() {
        return Err(RexxError::MissingArgument { position: 1 });
    }
    match subscripts.iter().position(|&sub| sub == 0) {
        Some(pos) => Err(RexxError::invalid_index(pos + 1, 0)),
        None => Ok(()),
    }
}

// Copy one dimension's worth of elements from the old layout into the
// new one, starting at the outermost dimension.
fn copy_dimension(
    old: &mut IndexedStorage,
    old_dims: &[usize],
    new: &mut IndexedStorage,
    new_dims: &[usize],
    old_base: usize,
    new_base: usize,
) {
    let Some((&count, old_rest)) = old_dims.split_first() else {
        return;
    };
    let new_rest = &new_dims[1..];
    if old_rest.is_empty() {
        for offset in 0..count {
            if let Some(value) = old.take(old_base + offset + 1) {
                new.put(new_base + offset + 1, Some(value));
            }
        }
        return;
    }
    let old_stride: usize = old_rest.iter().product();
    let new_stride: usize = new_rest.iter().product();
    for offset in 0..count {
        copy_dimension(
            old,
            old_rest,
            new,
            new_rest,
            old_base + offset * old_stride,
            new_base + offset * new_stride,
        );
    }
}

impl Array {
    pub fn new(size: usize) -> Result<Self> {
        Ok(Self {
            storage: IndexedStorage::new(size)?,
            dimensions: None,
        })
    }

    /// Array with declared dimensions. A single dimension of `0` creates
    /// a zero-size array that can no longer become multi-dimensional.
    pub fn with_dimensions(dimensions: &[usize]) -> Result<Self> {
        if dimensions.is_empty() {
            return Self::new(0);
        }
        let size = product(dimensions)?;
        Ok(Self {
            storage: IndexedStorage::new(size)?,
            dimensions: Some(dimensions.to_vec()),
        })
    }

    /// Dense array holding `values` in order.
    pub fn of(values: impl IntoIterator<Item = Value>) -> Result<Self> {
        Self::from_slots(values.into_iter().map(Some))
    }

    pub fn from_slots(slots: impl IntoIterator<Item = Option<Value>>) -> Result<Self> {
        Ok(Self {
            storage: IndexedStorage::from_values(slots)?,
            dimensions: None,
        })
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.storage.size()
    }

    #[inline]
    pub fn items(&self) -> usize {
        self.storage.items()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items() == 0
    }

    #[inline]
    pub fn last_item(&self) -> usize {
        self.storage.last_item()
    }

    #[inline]
    pub fn storage(&self) -> &IndexedStorage {
        &self.storage
    }

    #[inline]
    pub fn slots(&self) -> &[Option<Value>] {
        self.storage.slots()
    }

    #[inline]
    pub fn is_multi_dimensional(&self) -> bool {
        self.dimensions.as_ref().is_some_and(|dims| dims.len() > 1)
    }

    pub fn dimensions(&self) -> Vec<usize> {
        match &self.dimensions {
            Some(dims) => dims.clone(),
            None => vec![self.size()],
        }
    }

    /// Size of dimension `n` (1-based), 0 for undeclared dimensions.
    pub fn dimension(&self, n: usize) -> usize {
        match &self.dimensions {
            Some(dims) => n.checked_sub(1).and_then(|i| dims.get(i)).copied().unwrap_or(0),
            None if n == 1 => self.size(),
            None => 0,
        }
    }

    fn require_single(&self, method: &'static str) -> Result<()> {
        if self.is_multi_dimensional() {
            return Err(RexxError::NotSingleDimension { method });
        }
        Ok(())
    }

    // keep a declared single dimension in step with the storage size
    fn sync_single_dimension(&mut self) {
        let size = self.size();
        if let Some(dims) = self.dimensions.as_mut().filter(|dims| dims.len() == 1) {
            dims[0] = size;
        }
    }

    /// Flatten already validated subscripts into a storage position.
    pub fn flatten_index(&self, subscripts: &[usize]) -> Option<usize> {
        match &self.dimensions {
            Some(dims) if dims.len() > 1 => {
                if subscripts.len() != dims.len() {
                    return None;
                }
                let mut offset = 0;
                let mut multiplier = 1;
                for (&sub, &dim) in subscripts.iter().zip(dims).rev() {
                    if sub == 0 || sub > dim {
                        return None;
                    }
                    offset += multiplier * (sub - 1);
                    multiplier *= dim;
                }
                Some(offset + 1)
            }
            _ => match subscripts {
                [index] if *index >= 1 => Some(*index),
                _ => None,
            },
        }
    }

    /// Inverse of [`Array::flatten_index`].
    pub fn convert_index(&self, position: usize) -> Option<Vec<usize>> {
        if position == 0 || position > self.size() {
            return None;
        }
        match &self.dimensions {
            Some(dims) if dims.len() > 1 => {
                let mut rest = position - 1;
                let mut subscripts = vec![0; dims.len()];
                for (i, &dim) in dims.iter().enumerate().rev() {
                    subscripts[i] = rest % dim + 1;
                    rest /= dim;
                }
                Some(subscripts)
            }
            _ => Some(vec![position]),
        }
    }

    /// Storage position for a read; `None` when outside the bounds.
    fn position(&self, subscripts: &[usize]) -> Result<Option<usize>> {
        check_subscripts(subscripts)?;
        match &self.dimensions {
            Some(dims) if dims.len() > 1 => {
                if subscripts.len() < dims.len() {
                    return Err(RexxError::TooFewSubscripts {
                        expected: dims.len(),
                        actual: subscripts.len(),
                    });
                }
                if subscripts.len() > dims.len() {
                    return Err(RexxError::TooManySubscripts {
                        expected: dims.len(),
                        actual: subscripts.len(),
                    });
                }
                Ok(self.flatten_index(subscripts))
            }
            _ => {
                if subscripts.len() > 1 {
                    // a fresh array has no shape yet, so nothing is there
                    if self.dimensions.is_none() && self.size() == 0 {
                        return Ok(None);
                    }
                    return Err(RexxError::TooManySubscripts {
                        expected: 1,
                        actual: subscripts.len(),
                    });
                }
                let index = subscripts[0];
                Ok((index <= self.size()).then_some(index))
            }
        }
    }

    /// Storage position for a write, growing the array as needed.
    fn position_or_extend(&mut self, subscripts: &[usize]) -> Result<usize> {
        check_subscripts(subscripts)?;
        match self.dimensions.as_deref() {
            Some(dims) if dims.len() > 1 => {
                if subscripts.len() < dims.len() {
                    return Err(RexxError::TooFewSubscripts {
                        expected: dims.len(),
                        actual: subscripts.len(),
                    });
                }
                if subscripts.len() > dims.len() {
                    return Err(RexxError::TooManySubscripts {
                        expected: dims.len(),
                        actual: subscripts.len(),
                    });
                }
                if subscripts.iter().zip(dims).any(|(sub, dim)| sub > dim) {
                    self.extend_multi(subscripts)?;
                }
            }
            _ if subscripts.len() > 1 => {
                // only a shapeless empty array may take on dimensions
                if self.dimensions.is_some() || self.size() != 0 {
                    return Err(RexxError::TooManySubscripts {
                        expected: 1,
                        actual: subscripts.len(),
                    });
                }
                let size = product(subscripts)?;
                self.storage.ensure_size(size)?;
                self.dimensions = Some(subscripts.to_vec());
            }
            _ => {
                self.storage.ensure_size(subscripts[0])?;
                self.sync_single_dimension();
            }
        }
        self.flatten_index(subscripts)
            .ok_or_else(|| RexxError::invalid_index(1, subscripts[0]))
    }

    fn extend_multi(&mut self, subscripts: &[usize]) -> Result<()> {
        let old_dims = self.dimensions.clone().unwrap_or_default();
        let new_dims: Vec<usize> = old_dims
            .iter()
            .zip(subscripts)
            .map(|(&dim, &sub)| dim.max(sub))
            .collect();
        let mut storage = IndexedStorage::new(product(&new_dims)?)?;
        copy_dimension(&mut self.storage, &old_dims, &mut storage, &new_dims, 0, 0);
        log::trace!("array reshaped from {old_dims:?} to {new_dims:?}");
        self.storage = storage;
        self.dimensions = Some(new_dims);
        Ok(())
    }

    pub fn get(&self, subscripts: &[usize]) -> Result<Lookup<&Value>> {
        Ok(match self.position(subscripts)? {
            Some(position) => match self.storage.get(position) {
                Some(value) => Lookup::Found(value),
                None => Lookup::Empty,
            },
            None => Lookup::NoSuchIndex,
        })
    }

    /// Single-dimension read, `None` for empty or missing slots.
    #[inline]
    pub fn at(&self, index: usize) -> Option<&Value> {
        self.storage.get(index)
    }

    /// Store `value`, or clear the slot when `value` is `None`.
    pub fn put(&mut self, value: Option<Value>, subscripts: &[usize]) -> Result<()> {
        if value.is_none() {
            if let Some(position) = self.position(subscripts)? {
                self.storage.take(position);
            }
            return Ok(());
        }
        let position = self.position_or_extend(subscripts)?;
        self.storage.put(position, value);
        Ok(())
    }

    /// Clear a slot without shifting, returning what was there.
    pub fn remove(&mut self, subscripts: &[usize]) -> Result<Option<Value>> {
        Ok(match self.position(subscripts)? {
            Some(position) => self.storage.take(position),
            None => None,
        })
    }

    pub fn has_index(&self, subscripts: &[usize]) -> Result<bool> {
        Ok(self.get(subscripts)?.is_found())
    }

    /// Open a one-slot gap at `index` and store `value` there.
    pub fn insert(&mut self, value: Option<Value>, index: usize) -> Result<usize> {
        self.require_single("INSERT")?;
        check_subscripts(&[index])?;
        self.storage.open_gap(index, 1)?;
        if value.is_some() {
            self.storage.put(index, value);
        }
        self.sync_single_dimension();
        Ok(index)
    }

    pub fn append(&mut self, value: Value) -> Result<usize> {
        self.require_single("APPEND")?;
        let index = self.last_item() + 1;
        self.put(Some(value), &[index])?;
        Ok(index)
    }

    /// Remove the slot at `index`, closing the gap.
    pub fn delete(&mut self, index: usize) -> Result<Option<Value>> {
        self.require_single("DELETE")?;
        check_subscripts(&[index])?;
        if index > self.size() {
            return Ok(None);
        }
        let removed = self.storage.take(index);
        self.storage.close_gap(index, 1);
        self.sync_single_dimension();
        Ok(removed)
    }

    /// Copy of `count` slots starting at `start` (to the end by default).
    pub fn section(&self, start: usize, count: Option<usize>) -> Result<Array> {
        self.require_single("SECTION")?;
        check_subscripts(&[start])?;
        if start > self.size() {
            return Ok(Array::default());
        }
        let available = self.size() - start + 1;
        let count = count.unwrap_or(available).min(available);
        Array::from_slots(self.slots()[start - 1..start - 1 + count].iter().cloned())
    }

    /// New array holding this array's slots followed by `other`'s.
    pub fn join(&self, other: &Array) -> Result<Array> {
        Array::from_slots(self.slots().iter().chain(other.slots()).cloned())
    }

    pub fn fill(&mut self, value: &Value) {
        self.storage.fill(value);
    }

    pub fn empty(&mut self) {
        self.storage.clear();
    }

    pub fn first(&self) -> Option<usize> {
        self.storage.iter_occupied().next().map(|(index, _)| index)
    }

    pub fn last(&self) -> Option<usize> {
        match self.last_item() {
            0 => None,
            index => Some(index),
        }
    }

    /// Next occupied index after `index`.
    pub fn next(&self, index: usize) -> Option<usize> {
        (index + 1..=self.last_item()).find(|&i| self.storage.is_occupied(i))
    }

    /// Previous occupied index before `index`.
    pub fn previous(&self, index: usize) -> Option<usize> {
        (1..index.min(self.size() + 1))
            .rev()
            .find(|&i| self.storage.is_occupied(i))
    }

    pub fn index_of(&self, value: &Value) -> Option<usize> {
        self.storage
            .iter_occupied()
            .find(|(_, item)| item.equals(value))
            .map(|(index, _)| index)
    }

    pub fn has_item(&self, value: &Value) -> bool {
        self.index_of(value).is_some()
    }

    pub fn remove_item(&mut self, value: &Value) -> Option<Value> {
        let index = self.index_of(value)?;
        self.storage.take(index)
    }

    pub fn all_items(&self) -> Result<Array> {
        Array::of(self.storage.iter_occupied().map(|(_, value)| value.clone()))
    }

    /// Indexes of occupied slots; subscript arrays for multi-dimensional arrays.
    pub fn all_indexes(&self) -> Result<Array> {
        let multi = self.is_multi_dimensional();
        let indexes = self
            .storage
            .iter_occupied()
            .map(|(index, _)| match self.convert_index(index) {
                Some(subs) if multi => Ok(Value::object(Array::of(subs.into_iter().map(Value::from))?)),
                _ => Ok(Value::from(index)),
            })
            .collect::<Result<Vec<_>>>()?;
        Array::of(indexes)
    }

    pub fn make_string(&self, separator: &[u8]) -> RexxString {
        let mut out = Vec::new();
        for (n, (_, value)) in self.storage.iter_occupied().enumerate() {
            if n > 0 {
                out.extend_from_slice(separator);
            }
            out.extend_from_slice(value.to_rexx_string().as_bytes());
        }
        RexxString::from(out)
    }

    /// Same shape with the same item in every slot.
    pub fn same_contents(&self, other: &Array) -> bool {
        self.dimensions == other.dimensions
            && self.size() == other.size()
            && self
                .slots()
                .iter()
                .zip(other.slots())
                .all(|pair| match pair {
                    (Some(a), Some(b)) => a.equals(b),
                    (None, None) => true,
                    _ => false,
                })
    }

    pub fn supplier(&self) -> Result<Supplier> {
        Ok(Supplier::new(self.all_items()?, self.all_indexes()?))
    }

    pub fn stable_sort(&mut self) -> Result<()> {
        self.stable_sort_with(|a, b| a.compare(b))
    }

    /// Stable merge sort with a fallible comparator. The array must be
    /// dense; it is left unchanged if the comparator fails.
    pub fn stable_sort_with<F>(&mut self, compare: F) -> Result<()>
    where
        F: FnMut(&Value, &Value) -> Result<Ordering>,
    {
        self.require_single("SORT")?;
        if let Some(index) = self.storage.first_hole() {
            return Err(RexxError::SparseArray { index });
        }
        if self.size() < 2 {
            return Ok(());
        }
        let mut values: Vec<Value> = self.storage.iter_occupied().map(|(_, v)| v.clone()).collect();
        sort::merge_sort(&mut values, compare)?;
        for (pos, value) in values.into_iter().enumerate() {
            self.storage.put(pos + 1, Some(value));
        }
        Ok(())
    }

    #[inline]
    pub fn sort(&mut self) -> Result<()> {
        self.stable_sort()
    }

    #[inline]
    pub fn sort_with<F>(&mut self, compare: F) -> Result<()>
    where
        F: FnMut(&Value, &Value) -> Result<Ordering>,
    {
        self.stable_sort_with(compare)
    }
}

impl Visitable for Array {
    fn visit_edges(&self, visitor: &mut impl Visitor) {
        self.storage
            .iter_occupied()
            .for_each(|(_, value)| visitor.visit(value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ints(array: &Array) -> Vec<Option<i64>> {
        array
            .slots()
            .iter()
            .map(|slot| slot.as_ref().and_then(Value::as_integer))
            .collect()
    }

    fn assert_density(array: &Array) {
        let occupied = array.slots().iter().filter(|s| s.is_some()).count();
        assert_eq!(array.items(), occupied);
    }

    #[test]
    fn sparse_puts_and_section() {
        let mut array = Array::new(3).unwrap();
        array.put(Some("a".into()), &[1]).unwrap();
        array.put(Some("b".into()), &[3]).unwrap();
        assert_eq!(array.items(), 2);
        assert!(matches!(array.get(&[2]).unwrap(), Lookup::Empty));
        assert!(matches!(array.get(&[4]).unwrap(), Lookup::NoSuchIndex));

        let section = array.section(1, Some(3)).unwrap();
        assert_eq!(section.size(), 3);
        assert!(section.at(1).is_some_and(|v| v.equals(&"a".into())));
        assert!(section.at(2).is_none());
        assert!(section.at(3).is_some_and(|v| v.equals(&"b".into())));
        assert_density(&section);
    }

    #[test]
    fn shapeless_array_becomes_multi_dimensional() {
        let mut array = Array::new(0).unwrap();
        array.put(Some(5i64.into()), &[1, 2]).unwrap();
        assert_eq!(array.dimension(1), 1);
        assert_eq!(array.dimension(2), 2);
        assert_eq!(array.size(), 2);
        assert!(array.get(&[1, 2]).unwrap().item().is_some_and(|v| v.equals(&5i64.into())));
        assert!(matches!(array.get(&[1, 1]).unwrap(), Lookup::Empty));
    }

    #[test]
    fn fixed_zero_array_stays_single_dimension() {
        let mut array = Array::with_dimensions(&[0]).unwrap();
        let err = array.put(Some(1i64.into()), &[1, 2]).unwrap_err();
        assert_eq!(err.name(), "wrong number of subscripts");
        array.put(Some(1i64.into()), &[4]).unwrap();
        assert_eq!(array.dimension(1), 4);
    }

    #[test]
    fn populated_single_dimension_rejects_extra_subscripts() {
        let mut array = Array::of([Value::from(1i64)]).unwrap();
        assert!(matches!(
            array.put(Some(2i64.into()), &[1, 1]),
            Err(RexxError::TooManySubscripts { expected: 1, actual: 2 })
        ));
    }

    #[test]
    fn subscript_count_is_checked() {
        let array = Array::with_dimensions(&[2, 3]).unwrap();
        assert!(matches!(
            array.get(&[1]),
            Err(RexxError::TooFewSubscripts { expected: 2, actual: 1 })
        ));
        assert!(matches!(
            array.get(&[1, 1, 1]),
            Err(RexxError::TooManySubscripts { expected: 2, actual: 3 })
        ));
        assert!(matches!(array.get(&[0, 1]), Err(RexxError::InvalidIndex { position: 1, .. })));
        assert!(matches!(array.get(&[3, 1]).unwrap(), Lookup::NoSuchIndex));
    }

    #[test]
    fn multi_dimensional_extension_relocates_elements() {
        let mut array = Array::with_dimensions(&[2, 2]).unwrap();
        for i in 1..=2 {
            for j in 1..=2 {
                array.put(Some(((i * 10 + j) as i64).into()), &[i, j]).unwrap();
            }
        }
        array.put(Some(99i64.into()), &[3, 4]).unwrap();
        assert_eq!(array.dimensions(), vec![3, 4]);
        assert_eq!(array.size(), 12);
        assert_eq!(array.items(), 5);
        for i in 1..=2 {
            for j in 1..=2 {
                let found = array.get(&[i, j]).unwrap().item().and_then(Value::as_integer);
                assert_eq!(found, Some((i * 10 + j) as i64));
            }
        }
        assert!(matches!(array.get(&[2, 3]).unwrap(), Lookup::Empty));
        assert_density(&array);
    }

    #[test]
    fn three_dimensional_extension() {
        let mut array = Array::with_dimensions(&[2, 2, 2]).unwrap();
        array.put(Some(1i64.into()), &[2, 1, 2]).unwrap();
        array.put(Some(2i64.into()), &[1, 2, 1]).unwrap();
        array.put(Some(3i64.into()), &[2, 3, 3]).unwrap();
        assert_eq!(array.dimensions(), vec![2, 3, 3]);
        assert_eq!(array.get(&[2, 1, 2]).unwrap().item().and_then(Value::as_integer), Some(1));
        assert_eq!(array.get(&[1, 2, 1]).unwrap().item().and_then(Value::as_integer), Some(2));
        assert_eq!(array.items(), 3);
    }

    #[test]
    fn flattening_is_a_bijection() {
        let array = Array::with_dimensions(&[3, 4, 2]).unwrap();
        let mut seen = vec![false; array.size()];
        for i in 1..=3 {
            for j in 1..=4 {
                for k in 1..=2 {
                    let position = array.flatten_index(&[i, j, k]).unwrap();
                    assert!(!seen[position - 1]);
                    seen[position - 1] = true;
                    assert_eq!(array.convert_index(position), Some(vec![i, j, k]));
                }
            }
        }
        assert!(seen.iter().all(|&s| s));
        // last subscript varies fastest
        assert_eq!(array.flatten_index(&[1, 1, 2]), Some(2));
    }

    #[test]
    fn put_none_clears() {
        let mut array = Array::of([Value::from(1i64), Value::from(2i64)]).unwrap();
        array.put(None, &[1]).unwrap();
        assert_eq!(array.items(), 1);
        assert_eq!(array.size(), 2);
        // clearing past the end neither fails nor grows
        array.put(None, &[10]).unwrap();
        assert_eq!(array.size(), 2);
    }

    #[test]
    fn put_beyond_maximum_fails() {
        let mut array = Array::new(0).unwrap();
        let too_far = settings::get().max_array_size + 1;
        let err = array.put(Some(1i64.into()), &[too_far]).unwrap_err();
        assert_eq!(err.name(), "array too big");
    }

    #[test]
    fn construction_beyond_maximum_fails() {
        let maximum = settings::get().max_array_size;
        let err = Array::from_slots(std::iter::repeat_n(None, maximum + 1)).unwrap_err();
        assert_eq!(err.name(), "array too big");
    }

    #[test]
    fn insert_then_delete_restores() {
        let mut array = Array::from_slots([Some(1i64.into()), None, Some(3i64.into())]).unwrap();
        let before = ints(&array);
        array.insert(Some(7i64.into()), 2).unwrap();
        assert_eq!(ints(&array), vec![Some(1), Some(7), None, Some(3)]);
        assert_eq!(array.last_item(), 4);
        assert_density(&array);

        let removed = array.delete(2).unwrap();
        assert_eq!(removed.and_then(|v| v.as_integer()), Some(7));
        assert_eq!(ints(&array), before);
        assert_eq!(array.size(), 3);
        assert_density(&array);
    }

    #[test]
    fn insert_at_end_and_beyond() {
        let mut array = Array::of([Value::from(1i64)]).unwrap();
        array.insert(Some(2i64.into()), 2).unwrap();
        array.insert(Some(5i64.into()), 5).unwrap();
        assert_eq!(ints(&array), vec![Some(1), Some(2), None, None, Some(5)]);
    }

    #[test]
    fn gap_operations_reject_multi_dimensional() {
        let mut array = Array::with_dimensions(&[2, 2]).unwrap();
        assert!(matches!(
            array.insert(None, 1),
            Err(RexxError::NotSingleDimension { method: "INSERT" })
        ));
        assert!(array.delete(1).is_err());
        assert!(array.section(1, None).is_err());
    }

    #[test]
    fn delete_out_of_range_is_soft() {
        let mut array = Array::of([Value::from(1i64)]).unwrap();
        assert!(array.delete(5).unwrap().is_none());
        assert!(array.delete(0).is_err());
    }

    #[test]
    fn append_uses_last_item() {
        let mut array = Array::new(5).unwrap();
        array.put(Some(1i64.into()), &[2]).unwrap();
        assert_eq!(array.append("x".into()).unwrap(), 3);
        assert_eq!(array.size(), 5);
    }

    #[test]
    fn section_clamps() {
        let array = Array::of((1..=5i64).map(Value::from)).unwrap();
        assert_eq!(ints(&array.section(4, Some(10)).unwrap()), vec![Some(4), Some(5)]);
        assert_eq!(array.section(6, None).unwrap().size(), 0);
        assert_eq!(ints(&array.section(2, Some(2)).unwrap()), vec![Some(2), Some(3)]);
    }

    #[test]
    fn join_keeps_counts() {
        let left = Array::from_slots([Some(1i64.into()), None]).unwrap();
        let right = Array::from_slots([None, Some(4i64.into()), None]).unwrap();
        let joined = left.join(&right).unwrap();
        assert_eq!(joined.size(), 5);
        assert_eq!(joined.items(), 2);
        assert_eq!(joined.last_item(), 4);
    }

    #[test]
    fn traversal_helpers() {
        let array = Array::from_slots([None, Some(2i64.into()), None, Some(4i64.into()), None]).unwrap();
        assert_eq!(array.first(), Some(2));
        assert_eq!(array.last(), Some(4));
        assert_eq!(array.next(2), Some(4));
        assert_eq!(array.next(4), None);
        assert_eq!(array.previous(4), Some(2));
        assert_eq!(array.previous(2), None);
        assert_eq!(array.index_of(&Value::from("4")), Some(4));
    }

    #[test]
    fn remove_item_leaves_gap() {
        let mut array = Array::of(["a", "b", "c"].map(Value::from)).unwrap();
        assert!(array.remove_item(&"b".into()).is_some());
        assert_eq!(array.size(), 3);
        assert_eq!(array.items(), 2);
        assert!(!array.has_item(&"b".into()));
    }

    #[test]
    fn all_indexes_of_multi_dimensional() {
        let mut array = Array::with_dimensions(&[2, 2]).unwrap();
        array.put(Some("x".into()), &[2, 1]).unwrap();
        let indexes = array.all_indexes().unwrap();
        assert_eq!(indexes.items(), 1);
        let Some(Value::Object(handle)) = indexes.at(1) else {
            panic!("expected subscript array");
        };
        let crate::HeapObject::Array(subs) = &*handle.read() else {
            panic!("expected array");
        };
        assert_eq!(ints(subs), vec![Some(2), Some(1)]);
    }

    #[test]
    fn make_string_skips_holes() {
        let array = Array::from_slots([Some("a".into()), None, Some(3i64.into())]).unwrap();
        assert_eq!(array.make_string(b", ").to_string(), "a, 3");
    }

    #[test]
    fn sort_requires_dense() {
        let mut array = Array::from_slots([Some(2i64.into()), None, Some(1i64.into())]).unwrap();
        assert!(matches!(array.stable_sort(), Err(RexxError::SparseArray { index: 2 })));
    }

    #[test]
    fn sort_uses_natural_order() {
        let mut array = Array::of([5i64, 3, 9, 1].map(Value::from)).unwrap();
        array.sort().unwrap();
        assert_eq!(ints(&array), vec![Some(1), Some(3), Some(5), Some(9)]);
    }

    #[test]
    fn failed_comparator_leaves_array_unchanged() {
        let mut array = Array::of([3i64, 2, 1].map(Value::from)).unwrap();
        let err = array
            .stable_sort_with(|_, _| Err(RexxError::raised("SYNTAX", "boom")))
            .unwrap_err();
        assert_eq!(err.name(), "raised");
        assert_eq!(ints(&array), vec![Some(3), Some(2), Some(1)]);
    }

    #[test]
    fn density_holds_through_mixed_operations() {
        use rand::{Rng, SeedableRng, rngs::StdRng};

        let mut rng = StdRng::seed_from_u64(0xA11A);
        let mut array = Array::new(0).unwrap();
        for _ in 0..2_000 {
            let index = rng.gen_range(1..40usize);
            match rng.gen_range(0..5) {
                0 => array.put(Some(Value::from(index)), &[index]).unwrap(),
                1 => array.put(None, &[index]).unwrap(),
                2 => {
                    array.insert(Some(Value::from(index)), index).unwrap();
                }
                3 => {
                    array.delete(index).unwrap();
                }
                _ => {
                    array.append(Value::from(index)).unwrap();
                }
            }
            assert_density(&array);
            let last = array.slots().iter().rposition(Option::is_some).map_or(0, |p| p + 1);
            assert_eq!(array.last_item(), last);
        }
    }
}
