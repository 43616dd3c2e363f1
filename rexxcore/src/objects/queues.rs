use crate::{Array, Result, RexxError, Supplier, Value, Visitable, Visitor};

/// Dense single-dimension array with stack and queue operations. The
/// items always occupy indexes `1..=items`.
#[derive(Debug, Clone, Default)]
pub struct Queue {
    array: Array,
}

impl Queue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn of(values: impl IntoIterator<Item = Value>) -> Result<Self> {
        Ok(Self {
            array: Array::of(values)?,
        })
    }

    #[inline]
    pub fn items(&self) -> usize {
        self.array.items()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.array.is_empty()
    }

    #[inline]
    pub fn as_array(&self) -> &Array {
        &self.array
    }

    fn check_index(&self, index: usize, limit: usize) -> Result<()> {
        if index == 0 || index > limit {
            return Err(RexxError::IndexNotValid { index, limit });
        }
        Ok(())
    }

    /// Reject multi-subscript access, queues have one dimension.
    pub fn single_index(subscripts: &[usize]) -> Result<usize> {
        match subscripts {
            [] => Err(RexxError::MissingArgument { position: 1 }),
            [index] => Ok(*index),
            _ => Err(RexxError::TooManySubscripts {
                expected: 1,
                actual: subscripts.len(),
            }),
        }
    }

    /// Add at the front.
    pub fn push(&mut self, value: Value) -> Result<()> {
        self.array.insert(Some(value), 1)?;
        Ok(())
    }

    /// Add at the back.
    pub fn queue(&mut self, value: Value) -> Result<usize> {
        self.array.append(value)
    }

    #[inline]
    pub fn append(&mut self, value: Value) -> Result<usize> {
        self.queue(value)
    }

    /// Remove from the front, `None` when empty.
    pub fn pull(&mut self) -> Result<Option<Value>> {
        if self.is_empty() {
            return Ok(None);
        }
        self.array.delete(1)
    }

    pub fn peek(&self) -> Option<&Value> {
        self.array.at(1)
    }

    pub fn at(&self, index: usize) -> Option<&Value> {
        self.array.at(index)
    }

    /// Replace an existing item.
    pub fn put(&mut self, value: Value, index: usize) -> Result<()> {
        self.check_index(index, self.items())?;
        self.array.put(Some(value), &[index])
    }

    /// Insert so that `value` ends up at `index`.
    pub fn insert(&mut self, value: Value, index: usize) -> Result<usize> {
        self.check_index(index, self.items() + 1)?;
        self.array.insert(Some(value), index)
    }

    pub fn remove(&mut self, index: usize) -> Result<Option<Value>> {
        if index == 0 || index > self.items() {
            return Ok(None);
        }
        self.array.delete(index)
    }

    pub fn has_index(&self, index: usize) -> bool {
        index >= 1 && index <= self.items()
    }

    pub fn first(&self) -> Option<usize> {
        (!self.is_empty()).then_some(1)
    }

    pub fn last(&self) -> Option<usize> {
        (!self.is_empty()).then_some(self.items())
    }

    pub fn index_of(&self, value: &Value) -> Option<usize> {
        self.array.index_of(value)
    }

    pub fn has_item(&self, value: &Value) -> bool {
        self.array.has_item(value)
    }

    pub fn remove_item(&mut self, value: &Value) -> Result<Option<Value>> {
        match self.index_of(value) {
            Some(index) => self.array.delete(index),
            None => Ok(None),
        }
    }

    pub fn empty(&mut self) {
        self.array = Array::default();
    }

    pub fn all_items(&self) -> Result<Array> {
        self.array.all_items()
    }

    pub fn all_indexes(&self) -> Result<Array> {
        self.array.all_indexes()
    }

    pub fn supplier(&self) -> Result<Supplier> {
        self.array.supplier()
    }
}

impl Visitable for Queue {
    fn visit_edges(&self, visitor: &mut impl Visitor) {
        self.array.visit_edges(visitor);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pulled(queue: &mut Queue) -> Option<i64> {
        queue.pull().unwrap().and_then(|v| v.as_integer())
    }

    #[test]
    fn push_is_lifo() {
        let mut queue = Queue::new();
        queue.push(1i64.into()).unwrap();
        queue.push(2i64.into()).unwrap();
        assert_eq!(pulled(&mut queue), Some(2));
        assert_eq!(pulled(&mut queue), Some(1));
        assert_eq!(pulled(&mut queue), None);
    }

    #[test]
    fn queue_is_fifo() {
        let mut queue = Queue::new();
        for i in 1..=3i64 {
            queue.queue(i.into()).unwrap();
        }
        assert_eq!(queue.peek().and_then(Value::as_integer), Some(1));
        assert_eq!(pulled(&mut queue), Some(1));
        assert_eq!(pulled(&mut queue), Some(2));
        assert_eq!(queue.items(), 1);
    }

    #[test]
    fn indexes_are_limited_to_items() {
        let mut queue = Queue::of([Value::from("a"), Value::from("b")]).unwrap();
        assert!(matches!(
            queue.put("z".into(), 3),
            Err(RexxError::IndexNotValid { index: 3, limit: 2 })
        ));
        queue.put("z".into(), 2).unwrap();
        assert!(queue.at(2).is_some_and(|v| v.equals(&"z".into())));
        assert!(queue.remove(5).unwrap().is_none());
        assert!(queue.at(3).is_none());
    }

    #[test]
    fn insert_keeps_items_contiguous() {
        let mut queue = Queue::of([Value::from(1i64), Value::from(3i64)]).unwrap();
        queue.insert(2i64.into(), 2).unwrap();
        queue.insert(4i64.into(), 4).unwrap();
        assert!(queue.insert(9i64.into(), 6).is_err());
        let items: Vec<i64> = queue
            .all_items()
            .unwrap()
            .slots()
            .iter()
            .filter_map(|slot| slot.as_ref().and_then(Value::as_integer))
            .collect();
        assert_eq!(items, vec![1, 2, 3, 4]);
        assert!(queue.as_array().storage().is_dense());
    }

    #[test]
    fn remove_closes_the_gap() {
        let mut queue = Queue::of([1i64, 2, 3].map(Value::from)).unwrap();
        assert_eq!(queue.remove(2).unwrap().and_then(|v| v.as_integer()), Some(2));
        assert_eq!(queue.at(2).and_then(Value::as_integer), Some(3));
        assert_eq!(queue.last(), Some(2));
        assert!(queue.remove_item(&Value::from(1i64)).unwrap().is_some());
        assert_eq!(queue.first(), Some(1));
    }

    #[test]
    fn multiple_subscripts_are_refused() {
        assert!(matches!(
            Queue::single_index(&[1, 2]),
            Err(RexxError::TooManySubscripts { expected: 1, actual: 2 })
        ));
        assert_eq!(Queue::single_index(&[4]), Ok(4));
    }
}
