use crate::{Array, Result, RexxError, Value, Visitable, Visitor};

/// Snapshot iterator over paired items and indexes.
#[derive(Debug, Clone, Default)]
pub struct Supplier {
    items: Array,
    indexes: Array,
    position: usize,
}

impl Supplier {
    pub fn new(items: Array, indexes: Array) -> Self {
        Self {
            items,
            indexes,
            position: 1,
        }
    }

    #[inline]
    pub fn available(&self) -> bool {
        self.position >= 1 && self.position <= self.items.size()
    }

    pub fn item(&self) -> Result<Option<&Value>> {
        if !self.available() {
            return Err(RexxError::NoMoreItems);
        }
        Ok(self.items.at(self.position))
    }

    /// Index paired with the current item. Absent when the index array
    /// is shorter than the item array.
    pub fn index(&self) -> Result<Option<&Value>> {
        if !self.available() {
            return Err(RexxError::NoMoreItems);
        }
        Ok(self.indexes.at(self.position))
    }

    /// Step to the following pair.
    pub fn advance(&mut self) -> Result<()> {
        if !self.available() {
            return Err(RexxError::NoMoreItems);
        }
        self.position += 1;
        Ok(())
    }

    pub fn all_items(&self) -> &Array {
        &self.items
    }

    pub fn all_indexes(&self) -> &Array {
        &self.indexes
    }
}

impl Iterator for Supplier {
    type Item = (Option<Value>, Option<Value>);

    fn next(&mut self) -> Option<Self::Item> {
        if !self.available() {
            return None;
        }
        let pair = (
            self.items.at(self.position).cloned(),
            self.indexes.at(self.position).cloned(),
        );
        self.position += 1;
        Some(pair)
    }
}

impl Visitable for Supplier {
    fn visit_edges(&self, visitor: &mut impl Visitor) {
        self.items.visit_edges(visitor);
        self.indexes.visit_edges(visitor);
    }
}
