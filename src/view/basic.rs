//! Scalar views packed into chunks
//!
//! A chunk holds 32 / width values; slot `i` covers bytes
//! `[i * width, (i + 1) * width)`, little-endian. Writes copy the base
//! chunk and overwrite one slot.

use std::any::TypeId;
use std::fmt;
use std::io::{Read, Write};
use std::marker::PhantomData;
use std::sync::Arc;

use super::{BasicTypeDef, TypeDef, View, ViewError};
use crate::codec::{read_scope, CodecError, SizeBounds};
use crate::tree::{zero_node, NavigationError, Node, Root, CHUNK_SIZE, ROOT_GINDEX};

/// Scalar value that fits in a chunk slot.
pub trait BasicView: Copy + fmt::Debug + Send + Sync + 'static {
    /// Width of one value in bytes.
    const BYTE_LENGTH: usize;

    /// Decode from exactly `BYTE_LENGTH` bytes.
    fn decode_slot(bytes: &[u8]) -> Result<Self, ViewError>;

    /// Encode into exactly `BYTE_LENGTH` bytes.
    fn encode_slot(self, out: &mut [u8]);

    /// Values of this width per chunk.
    fn slot_capacity() -> u8 {
        (CHUNK_SIZE / Self::BYTE_LENGTH) as u8
    }

    /// Read slot `slot` of `chunk`.
    fn from_base(chunk: &Root, slot: u8) -> Result<Self, ViewError> {
        let start = slot_start::<Self>(slot)?;
        Self::decode_slot(&chunk[start..start + Self::BYTE_LENGTH])
    }

    /// Copy of `base` with slot `slot` overwritten by `self`.
    fn backing_from_base(self, base: &Root, slot: u8) -> Result<Root, ViewError> {
        let start = slot_start::<Self>(slot)?;
        let mut out = *base;
        self.encode_slot(&mut out[start..start + Self::BYTE_LENGTH]);
        Ok(out)
    }

    /// Read the value stored in slot 0 of a leaf.
    fn from_backing(node: &Node) -> Result<Self, ViewError> {
        match node.chunk() {
            Some(chunk) => Self::from_base(chunk, 0),
            None => Err(NavigationError::NotALeaf {
                target: ROOT_GINDEX,
            }
            .into()),
        }
    }

    /// Leaf holding this value in slot 0.
    fn to_backing(self) -> Arc<Node> {
        let mut chunk = Root::ZERO;
        self.encode_slot(&mut chunk[..Self::BYTE_LENGTH]);
        Node::leaf(chunk)
    }
}

fn slot_start<V: BasicView>(slot: u8) -> Result<usize, ViewError> {
    let capacity = V::slot_capacity();
    if slot >= capacity {
        return Err(ViewError::SlotOutOfRange { slot, capacity });
    }
    Ok(slot as usize * V::BYTE_LENGTH)
}

macro_rules! uint_view {
    ($(#[$doc:meta])* $name:ident, $int:ty) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(pub $int);

        impl BasicView for $name {
            const BYTE_LENGTH: usize = std::mem::size_of::<$int>();

            fn decode_slot(bytes: &[u8]) -> Result<Self, ViewError> {
                let mut word = [0u8; std::mem::size_of::<$int>()];
                word.copy_from_slice(bytes);
                Ok($name(<$int>::from_le_bytes(word)))
            }

            fn encode_slot(self, out: &mut [u8]) {
                out.copy_from_slice(&self.0.to_le_bytes());
            }
        }

        impl View for $name {
            fn backing(&self) -> Arc<Node> {
                self.to_backing()
            }
        }

        impl From<$int> for $name {
            fn from(value: $int) -> Self {
                $name(value)
            }
        }

        impl From<$name> for $int {
            fn from(view: $name) -> Self {
                view.0
            }
        }
    };
}

uint_view!(
    /// Unsigned 8-bit scalar
    Uint8View, u8
);
uint_view!(
    /// Unsigned 16-bit scalar
    Uint16View, u16
);
uint_view!(
    /// Unsigned 32-bit scalar
    Uint32View, u32
);
uint_view!(
    /// Unsigned 64-bit scalar
    Uint64View, u64
);

/// Boolean scalar: one byte, 0 or 1
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct BoolView(pub bool);

impl BoolView {
    /// Bit `bit` of a bit-packed chunk (byte `bit / 8`, position `bit % 8`).
    #[inline]
    pub fn from_bitfield(chunk: &Root, bit: u8) -> Self {
        BoolView((chunk[(bit >> 3) as usize] >> (bit & 7)) & 1 == 1)
    }

    /// Copy of `base` with bit `bit` set to `self`.
    pub fn backing_from_bitfield_base(self, base: &Root, bit: u8) -> Root {
        let mut out = *base;
        let mask = 1u8 << (bit & 7);
        if self.0 {
            out[(bit >> 3) as usize] |= mask;
        } else {
            out[(bit >> 3) as usize] &= !mask;
        }
        out
    }
}

impl BasicView for BoolView {
    const BYTE_LENGTH: usize = 1;

    fn decode_slot(bytes: &[u8]) -> Result<Self, ViewError> {
        match bytes[0] {
            0 => Ok(BoolView(false)),
            1 => Ok(BoolView(true)),
            other => Err(ViewError::InvalidBool(other)),
        }
    }

    fn encode_slot(self, out: &mut [u8]) {
        out[0] = self.0 as u8;
    }
}

impl View for BoolView {
    fn backing(&self) -> Arc<Node> {
        self.to_backing()
    }
}

impl From<bool> for BoolView {
    fn from(value: bool) -> Self {
        BoolView(value)
    }
}

impl From<BoolView> for bool {
    fn from(view: BoolView) -> Self {
        view.0
    }
}

/// Descriptor of a scalar type
pub struct BasicType<V>(PhantomData<fn() -> V>);

impl<V: BasicView> BasicType<V> {
    /// The descriptor; it carries no state.
    pub const fn new() -> Self {
        BasicType(PhantomData)
    }

    /// View over the value in slot 0 of `node`.
    pub fn view_from_backing(&self, node: &Node) -> Result<V, ViewError> {
        V::from_backing(node)
    }
}

impl<V> Clone for BasicType<V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<V> Copy for BasicType<V> {}

impl<V: BasicView> Default for BasicType<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: BasicView> fmt::Debug for BasicType<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BasicType<{}>", std::any::type_name::<V>())
    }
}

impl<V: BasicView> TypeDef for BasicType<V> {
    fn default_node(&self) -> Arc<Node> {
        zero_node(0)
    }

    fn size_bounds(&self) -> SizeBounds {
        SizeBounds::fixed(V::BYTE_LENGTH as u64)
    }

    fn value_byte_length(&self, _node: &Arc<Node>) -> Result<u64, ViewError> {
        Ok(V::BYTE_LENGTH as u64)
    }

    fn serialize_node(&self, node: &Arc<Node>, w: &mut dyn Write) -> Result<(), ViewError> {
        let value = V::from_backing(node)?;
        let mut buf = [0u8; CHUNK_SIZE];
        value.encode_slot(&mut buf[..V::BYTE_LENGTH]);
        w.write_all(&buf[..V::BYTE_LENGTH])
            .map_err(CodecError::from)?;
        Ok(())
    }

    fn deserialize_node(&self, r: &mut dyn Read, scope: u64) -> Result<Arc<Node>, ViewError> {
        self.size_bounds().check_scope(scope)?;
        let bytes = read_scope(r, scope)?;
        Ok(V::decode_slot(&bytes)?.to_backing())
    }

    fn basic_value_type(&self) -> Option<TypeId> {
        Some(TypeId::of::<V>())
    }
}

impl<V: BasicView> BasicTypeDef for BasicType<V> {
    type Value = V;
}

/// Descriptor of [`Uint8View`]
pub type Uint8Type = BasicType<Uint8View>;
/// Descriptor of [`Uint16View`]
pub type Uint16Type = BasicType<Uint16View>;
/// Descriptor of [`Uint32View`]
pub type Uint32Type = BasicType<Uint32View>;
/// Descriptor of [`Uint64View`]
pub type Uint64Type = BasicType<Uint64View>;
/// Descriptor of [`BoolView`]
pub type BoolType = BasicType<BoolView>;

/// The `uint8` descriptor.
pub const UINT8_TYPE: Uint8Type = BasicType::new();
/// The `uint16` descriptor.
pub const UINT16_TYPE: Uint16Type = BasicType::new();
/// The `uint32` descriptor.
pub const UINT32_TYPE: Uint32Type = BasicType::new();
/// The `uint64` descriptor.
pub const UINT64_TYPE: Uint64Type = BasicType::new();
/// The `bool` descriptor.
pub const BOOL_TYPE: BoolType = BasicType::new();
