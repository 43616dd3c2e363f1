use std::{
    fmt,
    ops::Deref,
    sync::{
        Arc, Weak,
        atomic::{AtomicU8, Ordering},
    },
};

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

pub mod arrays;
pub mod buffers;
pub mod lists;
pub mod message;
pub mod queues;
pub mod sort;
pub mod storage;
pub mod supplier;
pub mod tails;

use crate::{
    Array, List, MutableBuffer, Queue, Receiver, Result, Selector, Supplier, TailTable, Value,
    Visitable, Visitor, primitives,
};

#[rustfmt::skip]
#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ObjectType {
    Array         = 0b0000,
    List          = 0b0001,
    Queue         = 0b0010,
    Supplier      = 0b0011,
    Buffer        = 0b0100,
    Table         = 0b0101,
    WeakReference = 0b0110,
}

bitflags::bitflags! {
    #[repr(transparent)]
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
    pub struct HeaderFlags: u8 {
        /// reached by the current marking pass
        const MARK = 1 << 0;
        /// survived a collection, stores into it are old-to-new
        const OLD = 1 << 1;
    }
}

#[derive(Debug, Default)]
pub struct Header {
    flags: AtomicU8,
}

impl Header {
    #[inline]
    pub fn flags(&self) -> HeaderFlags {
        HeaderFlags::from_bits_truncate(self.flags.load(Ordering::Acquire))
    }

    #[inline]
    pub fn is_marked(&self) -> bool {
        self.flags().contains(HeaderFlags::MARK)
    }

    /// Returns `true` if this call set the mark.
    #[inline]
    pub fn mark(&self) -> bool {
        let prev = self.flags.fetch_or(HeaderFlags::MARK.bits(), Ordering::AcqRel);
        prev & HeaderFlags::MARK.bits() == 0
    }

    #[inline]
    pub fn unmark(&self) {
        self.flags.fetch_and(!HeaderFlags::MARK.bits(), Ordering::AcqRel);
    }

    #[inline]
    pub fn is_old(&self) -> bool {
        self.flags().contains(HeaderFlags::OLD)
    }

    #[inline]
    pub fn set_old(&self) {
        self.flags.fetch_or(HeaderFlags::OLD.bits(), Ordering::AcqRel);
    }
}

/// Every collection object the runtime hands out.
#[derive(Debug, Clone)]
pub enum HeapObject {
    Array(Array),
    List(List),
    Queue(Queue),
    Supplier(Supplier),
    Buffer(MutableBuffer),
    Table(TailTable),
    WeakReference(WeakReference),
}

impl HeapObject {
    pub fn object_type(&self) -> ObjectType {
        match self {
            HeapObject::Array(_) => ObjectType::Array,
            HeapObject::List(_) => ObjectType::List,
            HeapObject::Queue(_) => ObjectType::Queue,
            HeapObject::Supplier(_) => ObjectType::Supplier,
            HeapObject::Buffer(_) => ObjectType::Buffer,
            HeapObject::Table(_) => ObjectType::Table,
            HeapObject::WeakReference(_) => ObjectType::WeakReference,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self.object_type() {
            ObjectType::Array => "an Array",
            ObjectType::List => "a List",
            ObjectType::Queue => "a Queue",
            ObjectType::Supplier => "a Supplier",
            ObjectType::Buffer => "a MutableBuffer",
            ObjectType::Table => "a Stem",
            ObjectType::WeakReference => "a WeakReference",
        }
    }
}

impl Visitable for HeapObject {
    fn visit_edges(&self, visitor: &mut impl Visitor) {
        match self {
            HeapObject::Array(array) => array.visit_edges(visitor),
            HeapObject::List(list) => list.visit_edges(visitor),
            HeapObject::Queue(queue) => queue.visit_edges(visitor),
            HeapObject::Supplier(supplier) => supplier.visit_edges(visitor),
            HeapObject::Table(table) => table.visit_edges(visitor),
            // nothing to visit in a buffer, weak references are not edges
            HeapObject::Buffer(_) | HeapObject::WeakReference(_) => (),
        }
    }
}

macro_rules! heap_object_from {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        $(
            impl From<$ty> for HeapObject {
                fn from(value: $ty) -> Self {
                    HeapObject::$variant(value)
                }
            }
        )*
    };
}

heap_object_from!(
    Array(Array),
    List(List),
    Queue(Queue),
    Supplier(Supplier),
    Buffer(MutableBuffer),
    Table(TailTable),
    WeakReference(WeakReference),
);

#[derive(Debug)]
pub struct HeapCell {
    pub header: Header,
    object: RwLock<HeapObject>,
}

impl HeapCell {
    /// Age the cell; the collector tracks old cells across mark cycles.
    #[inline]
    pub fn set_old(&self) {
        self.header.set_old();
    }
}

/// Shared reference to a collection object.
#[derive(Clone)]
pub struct Handle(Arc<HeapCell>);

impl Handle {
    pub fn new(object: HeapObject) -> Self {
        Self(Arc::new(HeapCell {
            header: Header::default(),
            object: RwLock::new(object),
        }))
    }

    #[inline]
    pub fn read(&self) -> RwLockReadGuard<'_, HeapObject> {
        self.0.object.read()
    }

    #[inline]
    pub fn write(&self) -> RwLockWriteGuard<'_, HeapObject> {
        self.0.object.write()
    }

    #[inline]
    pub fn ptr_eq(&self, other: &Handle) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    #[inline]
    pub fn as_ptr(&self) -> *const HeapCell {
        Arc::as_ptr(&self.0)
    }

    pub fn downgrade(&self) -> WeakReference {
        WeakReference {
            target: Arc::downgrade(&self.0),
        }
    }

    pub fn object_type(&self) -> ObjectType {
        self.read().object_type()
    }

    pub fn type_name(&self) -> &'static str {
        self.read().type_name()
    }
}

impl Deref for Handle {
    type Target = HeapCell;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({:p})", self.as_ptr())
    }
}

impl Receiver for Handle {
    fn invoke(&self, selector: &Selector, arguments: &[Value]) -> Result<Option<Value>> {
        primitives::dispatch(self, selector, arguments)
    }

    fn type_name(&self) -> &str {
        Handle::type_name(self)
    }
}

/// Reference that does not keep its target alive.
#[derive(Debug, Clone)]
pub struct WeakReference {
    target: Weak<HeapCell>,
}

impl WeakReference {
    /// Strong handle to the referent, if it is still alive.
    pub fn value(&self) -> Option<Handle> {
        self.target.upgrade().map(Handle)
    }

    pub fn is_alive(&self) -> bool {
        self.target.strong_count() > 0
    }

    #[inline]
    pub fn target_ptr(&self) -> *const HeapCell {
        self.target.as_ptr()
    }
}
