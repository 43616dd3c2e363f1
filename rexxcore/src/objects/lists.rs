use std::{collections::HashMap, fmt};

use crate::{Array, HeapObject, Result, RexxError, Supplier, Value, Visitable, Visitor};

/// Stable position of a list entry. Tokens are never reused within a list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListToken(u64);

impl ListToken {
    #[inline]
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[inline]
    pub fn get(self) -> u64 {
        self.0
    }

    /// Token carried by an index value, if it has the right shape.
    pub fn from_value(value: &Value) -> Option<Self> {
        value
            .as_integer()
            .and_then(|raw| u64::try_from(raw).ok())
            .map(Self)
    }
}

impl fmt::Display for ListToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<ListToken> for Value {
    fn from(token: ListToken) -> Self {
        Value::Integer(token.0 as i64)
    }
}

/// Where [`List::insert`] places a new entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListPosition {
    BeforeFirst,
    AfterLast,
    After(ListToken),
}

#[derive(Debug, Clone)]
struct ListNode {
    value: Value,
    previous: Option<ListToken>,
    next: Option<ListToken>,
}

#[derive(Debug, Clone, Default)]
pub struct List {
    nodes: HashMap<ListToken, ListNode, ahash::RandomState>,
    first: Option<ListToken>,
    last: Option<ListToken>,
    issued: u64,
}

impl List {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn of(values: impl IntoIterator<Item = Value>) -> Self {
        let mut list = Self::new();
        for value in values {
            list.add_last(value);
        }
        list
    }

    #[inline]
    pub fn items(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn issue(&mut self) -> ListToken {
        self.issued += 1;
        ListToken(self.issued)
    }

    pub fn insert(&mut self, value: Value, position: ListPosition) -> Result<ListToken> {
        let (previous, next) = match position {
            ListPosition::BeforeFirst => (None, self.first),
            ListPosition::AfterLast => (self.last, None),
            ListPosition::After(token) => match self.nodes.get(&token) {
                Some(node) => (Some(token), node.next),
                None => {
                    return Err(RexxError::IndexNotFound {
                        index: token.to_string(),
                    });
                }
            },
        };
        let token = self.issue();
        self.nodes.insert(
            token,
            ListNode {
                value,
                previous,
                next,
            },
        );
        self.relink(previous, next, Some(token));
        Ok(token)
    }

    // point previous.next and next.previous at `target`
    fn relink(&mut self, previous: Option<ListToken>, next: Option<ListToken>, target: Option<ListToken>) {
        match previous.and_then(|token| self.nodes.get_mut(&token)) {
            Some(node) => node.next = target.or(next),
            None => self.first = target.or(next),
        }
        match next.and_then(|token| self.nodes.get_mut(&token)) {
            Some(node) => node.previous = target.or(previous),
            None => self.last = target.or(previous),
        }
    }

    #[inline]
    pub fn add_first(&mut self, value: Value) -> ListToken {
        self.push_end(value, ListPosition::BeforeFirst)
    }

    #[inline]
    pub fn add_last(&mut self, value: Value) -> ListToken {
        self.push_end(value, ListPosition::AfterLast)
    }

    #[inline]
    pub fn append(&mut self, value: Value) -> ListToken {
        self.add_last(value)
    }

    fn push_end(&mut self, value: Value, position: ListPosition) -> ListToken {
        let token = self.issue();
        let (previous, next) = match position {
            ListPosition::BeforeFirst => (None, self.first),
            _ => (self.last, None),
        };
        self.nodes.insert(
            token,
            ListNode {
                value,
                previous,
                next,
            },
        );
        self.relink(previous, next, Some(token));
        token
    }

    /// Unlink an entry. The token stays invalid afterwards.
    pub fn remove(&mut self, token: ListToken) -> Option<Value> {
        let node = self.nodes.remove(&token)?;
        self.relink(node.previous, node.next, None);
        Some(node.value)
    }

    #[inline]
    pub fn at(&self, token: ListToken) -> Option<&Value> {
        self.nodes.get(&token).map(|node| &node.value)
    }

    /// Replace the value of an existing entry.
    pub fn put(&mut self, value: Value, token: ListToken) -> Result<()> {
        match self.nodes.get_mut(&token) {
            Some(node) => {
                node.value = value;
                Ok(())
            }
            None => Err(RexxError::IndexNotFound {
                index: token.to_string(),
            }),
        }
    }

    #[inline]
    pub fn has_index(&self, token: ListToken) -> bool {
        self.nodes.contains_key(&token)
    }

    #[inline]
    pub fn first_token(&self) -> Option<ListToken> {
        self.first
    }

    #[inline]
    pub fn last_token(&self) -> Option<ListToken> {
        self.last
    }

    pub fn next_token(&self, token: ListToken) -> Option<ListToken> {
        self.nodes.get(&token)?.next
    }

    pub fn previous_token(&self, token: ListToken) -> Option<ListToken> {
        self.nodes.get(&token)?.previous
    }

    pub fn first_item(&self) -> Option<&Value> {
        self.first.and_then(|token| self.at(token))
    }

    pub fn last_item(&self) -> Option<&Value> {
        self.last.and_then(|token| self.at(token))
    }

    pub fn iter(&self) -> Iter<'_> {
        Iter {
            list: self,
            cursor: self.first,
        }
    }

    pub fn index_of(&self, value: &Value) -> Option<ListToken> {
        self.iter()
            .find(|(_, item)| item.equals(value))
            .map(|(token, _)| token)
    }

    pub fn has_item(&self, value: &Value) -> bool {
        self.index_of(value).is_some()
    }

    pub fn remove_item(&mut self, value: &Value) -> Option<Value> {
        let token = self.index_of(value)?;
        self.remove(token)
    }

    pub fn empty(&mut self) {
        self.nodes.clear();
        self.first = None;
        self.last = None;
    }

    /// New list with up to `count` entries starting at `token`.
    pub fn section(&self, token: ListToken, count: Option<usize>) -> Result<List> {
        if !self.has_index(token) {
            return Err(RexxError::IndexNotFound {
                index: token.to_string(),
            });
        }
        let count = count.unwrap_or(usize::MAX);
        let values = Iter {
            list: self,
            cursor: Some(token),
        }
        .take(count)
        .map(|(_, value)| value.clone());
        Ok(List::of(values))
    }

    pub fn all_items(&self) -> Result<Array> {
        Array::of(self.iter().map(|(_, value)| value.clone()))
    }

    pub fn all_indexes(&self) -> Result<Array> {
        Array::of(self.iter().map(|(token, _)| Value::from(token)))
    }

    pub fn supplier(&self) -> Result<Supplier> {
        Ok(Supplier::new(self.all_items()?, self.all_indexes()?))
    }

    /// Referents of the weak references held by this list, dead ones
    /// dropped. Items that are not weak references pass through.
    pub fn live_referents(&self) -> Result<Array> {
        Array::of(self.iter().filter_map(|(_, value)| live_referent(value)))
    }

    /// Unlink entries whose weak reference has died. Returns how many
    /// were removed.
    pub fn compact_weak_references(&mut self) -> usize {
        let dead: Vec<ListToken> = self
            .iter()
            .filter(|(_, value)| live_referent(value).is_none())
            .map(|(token, _)| token)
            .collect();
        for &token in &dead {
            self.remove(token);
        }
        dead.len()
    }
}

fn live_referent(value: &Value) -> Option<Value> {
    let Value::Object(handle) = value else {
        return Some(value.clone());
    };
    match &*handle.read() {
        HeapObject::WeakReference(weak) => weak.value().map(Value::Object),
        _ => Some(value.clone()),
    }
}

pub struct Iter<'a> {
    list: &'a List,
    cursor: Option<ListToken>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (ListToken, &'a Value);

    fn next(&mut self) -> Option<Self::Item> {
        let token = self.cursor?;
        let node = self.list.nodes.get(&token)?;
        self.cursor = node.next;
        Some((token, &node.value))
    }
}

impl Visitable for List {
    fn visit_edges(&self, visitor: &mut impl Visitor) {
        self.nodes.values().for_each(|node| visitor.visit(&node.value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng, rngs::StdRng};

    fn contents(list: &List) -> Vec<i64> {
        list.iter().filter_map(|(_, v)| v.as_integer()).collect()
    }

    #[test]
    fn insert_positions() {
        let mut list = List::new();
        let b = list.insert(2i64.into(), ListPosition::AfterLast).unwrap();
        list.insert(1i64.into(), ListPosition::BeforeFirst).unwrap();
        list.insert(3i64.into(), ListPosition::After(b)).unwrap();
        list.insert(4i64.into(), ListPosition::AfterLast).unwrap();
        assert_eq!(contents(&list), vec![1, 2, 3, 4]);
        assert_eq!(list.items(), 4);
    }

    #[test]
    fn removed_tokens_stay_invalid() {
        let mut list = List::of([1i64, 2, 3].map(Value::from));
        let middle = list.next_token(list.first_token().unwrap()).unwrap();
        assert_eq!(list.remove(middle).and_then(|v| v.as_integer()), Some(2));
        assert!(list.remove(middle).is_none());
        assert!(list.at(middle).is_none());
        assert!(matches!(
            list.insert(9i64.into(), ListPosition::After(middle)),
            Err(RexxError::IndexNotFound { .. })
        ));
        assert!(list.put(9i64.into(), middle).is_err());

        // a new entry never gets the old token back
        let fresh = list.add_last(5i64.into());
        assert_ne!(fresh, middle);
        assert_eq!(contents(&list), vec![1, 3, 5]);
    }

    #[test]
    fn neighbours_are_linked_both_ways() {
        let list = List::of([10i64, 20, 30].map(Value::from));
        let first = list.first_token().unwrap();
        let last = list.last_token().unwrap();
        assert_eq!(list.previous_token(first), None);
        assert_eq!(list.next_token(last), None);
        let middle = list.next_token(first).unwrap();
        assert_eq!(list.previous_token(middle), Some(first));
        assert_eq!(list.next_token(middle), Some(last));
        assert_eq!(list.first_item().and_then(Value::as_integer), Some(10));
        assert_eq!(list.last_item().and_then(Value::as_integer), Some(30));
    }

    #[test]
    fn removing_ends_updates_anchors() {
        let mut list = List::of([1i64, 2].map(Value::from));
        list.remove(list.first_token().unwrap());
        assert_eq!(list.first_token(), list.last_token());
        list.remove(list.last_token().unwrap());
        assert!(list.is_empty());
        assert_eq!(list.first_token(), None);
        assert_eq!(list.last_token(), None);
    }

    #[test]
    fn section_starts_at_token() {
        let list = List::of((1..=5i64).map(Value::from));
        let second = list.next_token(list.first_token().unwrap()).unwrap();
        assert_eq!(contents(&list.section(second, Some(2)).unwrap()), vec![2, 3]);
        assert_eq!(contents(&list.section(second, None).unwrap()), vec![2, 3, 4, 5]);
        assert!(list.section(ListToken::new(999), None).is_err());
    }

    #[test]
    fn item_searches() {
        let mut list = List::of(["a", "b", "a"].map(Value::from));
        assert!(list.has_item(&"b".into()));
        assert_eq!(list.index_of(&"a".into()), list.first_token());
        list.remove_item(&"a".into());
        assert_eq!(list.items(), 2);
        assert_eq!(list.index_of(&"a".into()), list.last_token());
        assert_eq!(list.all_indexes().unwrap().items(), 2);
    }

    #[test]
    fn live_referents_drop_dead_entries() {
        let kept = Value::object(List::new());
        let dropped = Value::object(List::new());
        let mut list = List::new();
        list.add_last(Value::object(kept.as_handle().unwrap().downgrade()));
        list.add_last(Value::object(dropped.as_handle().unwrap().downgrade()));
        list.add_last("plain".into());
        drop(dropped);

        let live = list.live_referents().unwrap();
        assert_eq!(live.items(), 2);
        assert!(live.at(1).is_some_and(|v| v.equals(&kept)));
        assert!(live.at(2).is_some_and(|v| v.equals(&"plain".into())));
        assert!(live.storage().is_dense());

        assert_eq!(list.compact_weak_references(), 1);
        assert_eq!(list.items(), 2);
    }

    #[test]
    fn tokens_survive_unrelated_edits() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut list = List::new();
        let mut model: Vec<(ListToken, i64)> = Vec::new();
        for step in 0..3_000i64 {
            if model.is_empty() || rng.gen_range(0..3) > 0 {
                let at = rng.gen_range(0..=model.len());
                let position = match at {
                    0 => ListPosition::BeforeFirst,
                    n => ListPosition::After(model[n - 1].0),
                };
                let token = list.insert(step.into(), position).unwrap();
                model.insert(at, (token, step));
            } else {
                let at = rng.gen_range(0..model.len());
                let (token, value) = model.remove(at);
                assert_eq!(list.remove(token).and_then(|v| v.as_integer()), Some(value));
            }
            assert_eq!(list.items(), model.len());
        }
        for (token, value) in &model {
            assert_eq!(list.at(*token).and_then(Value::as_integer), Some(*value));
        }
        assert_eq!(contents(&list), model.iter().map(|(_, v)| *v).collect::<Vec<_>>());
    }
}
