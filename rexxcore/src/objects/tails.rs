use std::fmt;

use crate::{RexxString, Value, Visitable, Visitor};

/// Index of a node inside a [`TailTable`]. Nodes are never freed while
/// the table lives, so an id stays valid until [`TailTable::clear`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// Tail name built from its parts joined with `.`, as in `a.b.c`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CompoundTail(RexxString);

impl CompoundTail {
    pub fn new<I, P>(parts: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<[u8]>,
    {
        let mut name = Vec::new();
        for (n, part) in parts.into_iter().enumerate() {
            if n > 0 {
                name.push(b'.');
            }
            name.extend_from_slice(part.as_ref());
        }
        Self(RexxString::from(name))
    }

    /// Tail from evaluated subscript values.
    pub fn from_values(parts: &[Value]) -> Self {
        Self::new(parts.iter().map(|part| part.to_rexx_string()))
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    pub fn into_string(self) -> RexxString {
        self.0
    }
}

impl AsRef<[u8]> for CompoundTail {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

#[derive(Debug, Clone)]
struct TailNode {
    name: RexxString,
    value: Option<Value>,
    parent: Option<NodeId>,
    left: Option<NodeId>,
    right: Option<NodeId>,
    // cached depth of each branch, 0 for a missing child
    left_depth: usize,
    right_depth: usize,
}

impl TailNode {
    #[inline]
    fn depth(&self) -> usize {
        1 + self.left_depth.max(self.right_depth)
    }
}

/// First broken tree property found by [`TailTable::check_balance`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeViolation {
    Unbalanced(NodeId),
    StaleDepth(NodeId),
    Order(NodeId),
    Parent(NodeId),
}

impl fmt::Display for TreeViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TreeViolation::Unbalanced(id) => write!(f, "node {} is out of balance", id.0),
            TreeViolation::StaleDepth(id) => write!(f, "node {} caches a wrong depth", id.0),
            TreeViolation::Order(id) => write!(f, "node {} is out of order", id.0),
            TreeViolation::Parent(id) => write!(f, "node {} has a broken parent link", id.0),
        }
    }
}

/// Compound variable tails of a stem, kept in a height balanced binary
/// tree ordered by the raw tail bytes.
#[derive(Debug, Clone, Default)]
pub struct TailTable {
    nodes: Vec<TailNode>,
    root: Option<NodeId>,
}

impl TailTable {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    fn node(&self, id: NodeId) -> &TailNode {
        &self.nodes[id.0]
    }

    #[inline]
    fn node_mut(&mut self, id: NodeId) -> &mut TailNode {
        &mut self.nodes[id.0]
    }

    #[inline]
    fn depth_of(&self, id: Option<NodeId>) -> usize {
        id.map_or(0, |id| self.node(id).depth())
    }

    /// Depth of the whole tree, 0 when empty.
    pub fn depth(&self) -> usize {
        self.depth_of(self.root)
    }

    /// Nodes in the tree, including those whose value was dropped.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn name(&self, id: NodeId) -> &RexxString {
        &self.node(id).name
    }

    pub fn value(&self, id: NodeId) -> Option<&Value> {
        self.node(id).value.as_ref()
    }

    /// Look up `tail`, adding an empty node for it when `create` is set.
    pub fn find_entry(&mut self, tail: &[u8], create: bool) -> Option<NodeId> {
        let mut anchor = self.root;
        let mut parent = None;
        let mut on_left = false;
        while let Some(id) = anchor {
            let node = self.node(id);
            match tail.cmp(node.name.as_bytes()) {
                std::cmp::Ordering::Equal => return Some(id),
                std::cmp::Ordering::Less => {
                    on_left = true;
                    anchor = node.left;
                }
                std::cmp::Ordering::Greater => {
                    on_left = false;
                    anchor = node.right;
                }
            }
            parent = Some(id);
        }
        if !create {
            return None;
        }

        let id = NodeId(self.nodes.len());
        self.nodes.push(TailNode {
            name: RexxString::from(tail),
            value: None,
            parent,
            left: None,
            right: None,
            left_depth: 0,
            right_depth: 0,
        });
        match parent {
            None => self.root = Some(id),
            Some(parent) => {
                if on_left {
                    self.node_mut(parent).left = Some(id);
                } else {
                    self.node_mut(parent).right = Some(id);
                }
                self.rebalance(parent);
            }
        }
        Some(id)
    }

    /// Read-only lookup.
    pub fn find(&self, tail: &[u8]) -> Option<NodeId> {
        let mut anchor = self.root;
        while let Some(id) = anchor {
            let node = self.node(id);
            anchor = match tail.cmp(node.name.as_bytes()) {
                std::cmp::Ordering::Equal => return Some(id),
                std::cmp::Ordering::Less => node.left,
                std::cmp::Ordering::Greater => node.right,
            };
        }
        None
    }

    // Walk from `start` toward the root refreshing cached depths and
    // rotating where the branches differ by more than one.
    fn rebalance(&mut self, start: NodeId) {
        let mut current = Some(start);
        while let Some(id) = current {
            let before = self.node(id).depth();
            let left_depth = self.depth_of(self.node(id).left);
            let right_depth = self.depth_of(self.node(id).right);
            {
                let node = self.node_mut(id);
                node.left_depth = left_depth;
                node.right_depth = right_depth;
            }

            let mut top = id;
            if left_depth > right_depth + 1 {
                top = self.promote_child(id, true);
            } else if right_depth > left_depth + 1 {
                top = self.promote_child(id, false);
            }

            // nothing above can change
            if self.node(top).depth() == before {
                break;
            }
            current = self.node(top).parent;
        }
    }

    // Rotate the heavy child of `id` into its place, first turning a
    // zig-zag shape into a straight one.
    fn promote_child(&mut self, id: NodeId, left_heavy: bool) -> NodeId {
        let node = self.node(id);
        let Some(child) = (if left_heavy { node.left } else { node.right }) else {
            return id;
        };
        let inner_heavy = {
            let child = self.node(child);
            if left_heavy {
                child.right_depth > child.left_depth
            } else {
                child.left_depth > child.right_depth
            }
        };
        if inner_heavy {
            let grandchild = if left_heavy {
                self.node(child).right
            } else {
                self.node(child).left
            };
            if let Some(grandchild) = grandchild {
                self.move_node(child, grandchild);
            }
        }
        let child = if left_heavy {
            self.node(id).left
        } else {
            self.node(id).right
        };
        match child {
            Some(child) => self.move_node(id, child),
            None => id,
        }
    }

    /// Single rotation lifting `child` above its parent `node`. Returns
    /// the new subtree root.
    fn move_node(&mut self, node: NodeId, child: NodeId) -> NodeId {
        let parent = self.node(node).parent;
        let from_left = self.node(node).left == Some(child);

        if from_left {
            let inner = self.node(child).right;
            self.node_mut(node).left = inner;
            self.node_mut(child).right = Some(node);
            if let Some(inner) = inner {
                self.node_mut(inner).parent = Some(node);
            }
            self.node_mut(node).left_depth = self.depth_of(inner);
        } else {
            let inner = self.node(child).left;
            self.node_mut(node).right = inner;
            self.node_mut(child).left = Some(node);
            if let Some(inner) = inner {
                self.node_mut(inner).parent = Some(node);
            }
            self.node_mut(node).right_depth = self.depth_of(inner);
        }

        self.node_mut(node).parent = Some(child);
        self.node_mut(child).parent = parent;
        let lowered = self.node(node).depth();
        if from_left {
            self.node_mut(child).right_depth = lowered;
        } else {
            self.node_mut(child).left_depth = lowered;
        }

        match parent {
            None => self.root = Some(child),
            Some(parent) => {
                let raised = self.node(child).depth();
                let parent = self.node_mut(parent);
                if parent.left == Some(node) {
                    parent.left = Some(child);
                    parent.left_depth = raised;
                } else {
                    parent.right = Some(child);
                    parent.right_depth = raised;
                }
            }
        }
        child
    }

    /// Leftmost node.
    pub fn first(&self) -> Option<NodeId> {
        self.root.map(|root| self.leftmost(root))
    }

    fn leftmost(&self, mut id: NodeId) -> NodeId {
        while let Some(left) = self.node(id).left {
            id = left;
        }
        id
    }

    /// In-order successor.
    pub fn next(&self, id: NodeId) -> Option<NodeId> {
        if let Some(right) = self.node(id).right {
            return Some(self.leftmost(right));
        }
        let mut child = id;
        let mut parent = self.node(id).parent;
        while let Some(p) = parent {
            if self.node(p).left == Some(child) {
                return Some(p);
            }
            child = p;
            parent = self.node(p).parent;
        }
        None
    }

    pub fn get(&self, tail: &[u8]) -> Option<&Value> {
        self.find(tail).and_then(|id| self.value(id))
    }

    /// Assign a tail, returning the previous value.
    pub fn set(&mut self, tail: &[u8], value: Value) -> Option<Value> {
        let id = self.find_entry(tail, true)?;
        self.node_mut(id).value.replace(value)
    }

    /// Drop a tail's value. The node stays in the tree.
    pub fn drop_tail(&mut self, tail: &[u8]) -> Option<Value> {
        let id = self.find(tail)?;
        self.node_mut(id).value.take()
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.root = None;
    }

    /// Tails that currently hold a value.
    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|node| node.value.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.iter().all(|node| node.value.is_none())
    }

    /// Assigned tails in byte order.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            table: self,
            cursor: self.first(),
        }
    }

    /// Re-insert every assigned tail of `other`.
    pub fn copy_from(&mut self, other: &TailTable) {
        for (name, value) in other.iter() {
            self.set(name.as_bytes(), value.clone());
        }
    }

    /// Verify ordering, parent links, cached depths and the balance of
    /// every node.
    pub fn check_balance(&self) -> Result<(), TreeViolation> {
        let Some(root) = self.root else {
            return Ok(());
        };
        if self.node(root).parent.is_some() {
            return Err(TreeViolation::Parent(root));
        }
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let node = self.node(id);
            for (child, is_left) in [(node.left, true), (node.right, false)] {
                let Some(child) = child else { continue };
                let child_node = self.node(child);
                if child_node.parent != Some(id) {
                    return Err(TreeViolation::Parent(child));
                }
                let ordered = if is_left {
                    child_node.name < node.name
                } else {
                    child_node.name > node.name
                };
                if !ordered {
                    return Err(TreeViolation::Order(child));
                }
                stack.push(child);
            }
            let (left, right) = (self.measure(node.left), self.measure(node.right));
            if left != node.left_depth || right != node.right_depth {
                return Err(TreeViolation::StaleDepth(id));
            }
            if left.abs_diff(right) > 1 {
                return Err(TreeViolation::Unbalanced(id));
            }
        }
        // in-order walk must be strictly increasing
        let mut previous: Option<&RexxString> = None;
        let mut cursor = self.first();
        while let Some(id) = cursor {
            let name = &self.node(id).name;
            if previous.is_some_and(|p| p >= name) {
                return Err(TreeViolation::Order(id));
            }
            previous = Some(name);
            cursor = self.next(id);
        }
        Ok(())
    }

    // depth computed from scratch
    fn measure(&self, id: Option<NodeId>) -> usize {
        let Some(id) = id else { return 0 };
        let node = self.node(id);
        1 + self.measure(node.left).max(self.measure(node.right))
    }
}

pub struct Iter<'a> {
    table: &'a TailTable,
    cursor: Option<NodeId>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (&'a RexxString, &'a Value);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(id) = self.cursor {
            self.cursor = self.table.next(id);
            let node = self.table.node(id);
            if let Some(value) = &node.value {
                return Some((&node.name, value));
            }
        }
        None
    }
}

impl Visitable for TailTable {
    fn visit_edges(&self, visitor: &mut impl Visitor) {
        self.nodes
            .iter()
            .filter_map(|node| node.value.as_ref())
            .for_each(|value| visitor.visit(value));
    }
}
