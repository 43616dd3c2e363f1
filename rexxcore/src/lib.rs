mod error;
mod flatten;
mod lookup;
mod objects;
mod parker;
mod value;
mod visitor;

pub mod primitives;
pub mod settings;
pub mod threads;

pub use error::{Result, RexxError};
pub use flatten::{FlatImage, FlatObject, FlatRef, FlatValue, Flattener};
pub use lookup::{Receiver, Selector};
pub use objects::arrays::{Array, Lookup};
pub use objects::buffers::MutableBuffer;
pub use objects::lists::{List, ListPosition, ListToken};
pub use objects::message::{Message, MessageFlags, MessageStatus};
pub use objects::queues::Queue;
pub use objects::sort::merge_sort;
pub use objects::storage::IndexedStorage;
pub use objects::supplier::Supplier;
pub use objects::tails::{CompoundTail, NodeId, TailTable, TreeViolation};
pub use objects::{Handle, Header, HeaderFlags, HeapCell, HeapObject, ObjectType, WeakReference};
pub use parker::NativeParker;
pub use settings::{CollectionCreateInfo, CollectionSettings};
pub use threads::{NativeThread, Worker, WorkerState};
pub use value::{RexxString, Value};
pub use visitor::{MarkStats, Marker, Visitable, Visitor, clear_marks};
