//! Typed views over tree nodes
//!
//! A view binds a type descriptor to a backing node. Views nested in a
//! composite carry a commit hook: replacing the view's backing node runs
//! the hook, which writes the node into the enclosing view and returns
//! the new root at the top of the chain.

mod backed;
mod basic;
mod bitlist;
mod container;

pub use backed::{BackedView, SubtreeView};
pub use basic::{
    BasicType, BasicView, BoolType, BoolView, Uint16Type, Uint16View, Uint32Type, Uint32View,
    Uint64Type, Uint64View, Uint8Type, Uint8View, BOOL_TYPE, UINT16_TYPE, UINT32_TYPE,
    UINT64_TYPE, UINT8_TYPE,
};
pub use bitlist::{BitIter, BitListType, BitListView, ReadonlyBitIter};
pub use container::{ContainerType, ContainerView};

use std::any::TypeId;
use std::fmt;
use std::io::{Read, Write};
use std::sync::Arc;

use thiserror::Error;

use crate::codec::{CodecError, SizeBounds};
use crate::tree::{NavigationError, Node, Root};

/// Commit hook: receives a view's replacement node, writes it into the
/// enclosing scope and returns the new root at the top of the chain.
pub type BackingHook<'a> = Box<dyn FnMut(Arc<Node>) -> Result<Arc<Node>, ViewError> + Send + 'a>;

/// Anything backed by a tree node.
pub trait View {
    /// Node currently representing the value.
    fn backing(&self) -> Arc<Node>;
}

/// Type descriptor: defaults, size bounds and byte encoding of values.
pub trait TypeDef: fmt::Debug + Send + Sync {
    /// Tree of the type's default value.
    fn default_node(&self) -> Arc<Node>;

    /// Bounds on encoded length.
    fn size_bounds(&self) -> SizeBounds;

    /// Encoded length of the value backed by `node`.
    fn value_byte_length(&self, node: &Arc<Node>) -> Result<u64, ViewError>;

    /// Write the encoding of the value backed by `node`.
    fn serialize_node(&self, node: &Arc<Node>, w: &mut dyn Write) -> Result<(), ViewError>;

    /// Read a value occupying exactly `scope` bytes and build its tree.
    fn deserialize_node(&self, r: &mut dyn Read, scope: u64) -> Result<Arc<Node>, ViewError>;

    /// Value type of a scalar descriptor, `None` for composites.
    fn basic_value_type(&self) -> Option<TypeId> {
        None
    }

    /// Bit-list descriptor, if this is one.
    fn as_bitlist(&self) -> Option<&BitListType> {
        None
    }

    /// Container descriptor, if this is one.
    fn as_container(&self) -> Option<&ContainerType> {
        None
    }
}

/// Descriptor of a scalar that can share a chunk with its neighbours.
pub trait BasicTypeDef: TypeDef {
    /// View produced for one slot.
    type Value: BasicView;

    /// Width of one value in bytes.
    fn byte_length(&self) -> u64 {
        Self::Value::BYTE_LENGTH as u64
    }

    /// Values of this type that fit in one chunk.
    fn slot_capacity(&self) -> u8 {
        Self::Value::slot_capacity()
    }

    /// Read the value stored in `slot` of `chunk`.
    fn sub_view_from_backing(&self, chunk: &Root, slot: u8) -> Result<Self::Value, ViewError> {
        Self::Value::from_base(chunk, slot)
    }
}

/// Errors raised by view operations.
///
/// A failed operation leaves the view's backing node as it was.
#[derive(Debug, Error)]
pub enum ViewError {
    /// Tree shape does not match the requested position.
    #[error(transparent)]
    Navigation(#[from] NavigationError),

    /// Byte encoding or decoding failed.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// Stored list length exceeds the type limit.
    #[error("stored length {length} exceeds limit {limit}")]
    CorruptLength {
        /// Length read from the tree.
        length: u64,
        /// Type limit.
        limit: u64,
    },

    /// Element index outside the current length or the type limit.
    #[error("index {index} out of range, bound is {bound}")]
    Index {
        /// Requested index.
        index: u64,
        /// Exclusive bound that was violated.
        bound: u64,
    },

    /// Append would grow the list past its limit.
    #[error("list is full at its limit of {limit}")]
    LimitExceeded {
        /// Type limit.
        limit: u64,
    },

    /// Pop on an empty list.
    #[error("list is empty")]
    EmptyList,

    /// Slot index does not fit in one chunk for this width.
    #[error("slot {slot} out of range, a chunk holds {capacity}")]
    SlotOutOfRange {
        /// Requested slot.
        slot: u8,
        /// Slots per chunk.
        capacity: u8,
    },

    /// Boolean byte other than 0 or 1.
    #[error("invalid boolean byte {0:#04x}")]
    InvalidBool(u8),

    /// Container field index out of range.
    #[error("field {index} out of range, container has {count}")]
    FieldOutOfRange {
        /// Requested field.
        index: usize,
        /// Number of fields.
        count: usize,
    },

    /// Container field has a different type than requested.
    #[error("field {index} is not a {expected}")]
    FieldKind {
        /// Requested field.
        index: usize,
        /// Kind the caller asked for.
        expected: &'static str,
    },
}
