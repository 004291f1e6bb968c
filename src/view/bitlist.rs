//! Bit-list: variable-length bits with a mixed-in length
//!
//! Tree shape: pair(content, length)
//!   content: bits packed 8 per byte, 256 per chunk, under a subtree of
//!            depth cover_depth(ceil(limit / 256))
//!   length:  chunk holding the bit count as 8 little-endian bytes
//!
//! Bit `i` lives in bottom chunk `i >> 8`, byte `(i >> 3) & 31`,
//! position `i & 7`.

use std::io::{Read, Write};
use std::sync::Arc;

use bitvec::prelude::*;
use tracing::trace;

use super::{BackingHook, BoolView, SubtreeView, TypeDef, View, ViewError};
use crate::codec::{read_scope, CodecError, SizeBounds};
use crate::tree::{
    cover_depth, subtree_fill_to_contents, zero_node, ChunkIter, NavigationError, Node, Root,
    CHUNK_SIZE, LEFT_GINDEX, RIGHT_GINDEX,
};

const BITS_PER_CHUNK: u64 = (CHUNK_SIZE * 8) as u64;

/// Bit-list descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BitListType {
    limit: u64,
}

impl BitListType {
    /// Bit-list holding at most `limit` bits.
    pub const fn new(limit: u64) -> Self {
        Self { limit }
    }

    /// Maximum number of bits.
    pub fn limit(&self) -> u64 {
        self.limit
    }

    /// Bottom chunks needed at full capacity.
    pub fn bottom_node_limit(&self) -> u64 {
        self.limit.div_ceil(BITS_PER_CHUNK)
    }

    /// Depth of the content subtree.
    pub fn content_depth(&self) -> u8 {
        cover_depth(self.bottom_node_limit())
    }

    /// Empty list, not nested in anything.
    pub fn new_view(&self) -> BitListView<'static> {
        self.view_from_backing(self.default_node(), None)
    }

    /// Bind a view to `node`; nested views pass the commit hook.
    pub fn view_from_backing<'a>(&self, node: Arc<Node>, hook: Option<BackingHook<'a>>) -> BitListView<'a> {
        BitListView {
            // +1 for the length mix-in
            view: SubtreeView::new(node, hook, self.content_depth() + 1),
            ty: *self,
        }
    }

    /// Standalone list holding `bits`.
    pub fn from_bits(&self, bits: &BitSlice<u8, Lsb0>) -> Result<BitListView<'static>, ViewError> {
        let length = bits.len() as u64;
        if length > self.limit {
            return Err(ViewError::LimitExceeded { limit: self.limit });
        }
        // collect by value so the packed bytes start at bit 0
        let mut packed: BitVec<u8, Lsb0> = bits.iter().by_vals().collect();
        packed.set_uninitialized(false);
        let node = self.node_from_packed(packed.as_raw_slice(), length)?;
        Ok(self.view_from_backing(node, None))
    }

    fn node_from_packed(&self, bytes: &[u8], length: u64) -> Result<Arc<Node>, ViewError> {
        let chunks: Vec<Arc<Node>> = bytes
            .chunks(CHUNK_SIZE)
            .map(|piece| {
                let mut chunk = Root::ZERO;
                chunk[..piece.len()].copy_from_slice(piece);
                Node::leaf(chunk)
            })
            .collect();
        let content = subtree_fill_to_contents(&chunks, self.content_depth())?;
        Ok(Node::pair(content, Node::leaf(Root::from_u64(length))))
    }
}

impl TypeDef for BitListType {
    fn default_node(&self) -> Arc<Node> {
        Node::pair(zero_node(self.content_depth()), zero_node(0))
    }

    fn size_bounds(&self) -> SizeBounds {
        // at least the delimiter byte
        SizeBounds::variable(1, self.limit / 8 + 1)
    }

    fn value_byte_length(&self, node: &Arc<Node>) -> Result<u64, ViewError> {
        self.view_from_backing(Arc::clone(node), None).value_byte_length()
    }

    fn serialize_node(&self, node: &Arc<Node>, w: &mut dyn Write) -> Result<(), ViewError> {
        self.view_from_backing(Arc::clone(node), None).serialize(w)
    }

    fn deserialize_node(&self, r: &mut dyn Read, scope: u64) -> Result<Arc<Node>, ViewError> {
        self.size_bounds().check_scope(scope)?;
        let mut bytes = read_scope(r, scope)?;

        let last = bytes.len() - 1;
        let delimiter_byte = bytes[last];
        if delimiter_byte == 0 {
            return Err(CodecError::MissingDelimiter.into());
        }
        let delimiter = 7 - delimiter_byte.leading_zeros() as u64;
        let length = last as u64 * 8 + delimiter;
        if length > self.limit {
            return Err(ViewError::CorruptLength {
                length,
                limit: self.limit,
            });
        }
        bytes[last] ^= 1 << delimiter;
        self.node_from_packed(&bytes, length)
    }

    fn as_bitlist(&self) -> Option<&BitListType> {
        Some(self)
    }
}

/// View over a bit-list tree
#[derive(Debug)]
pub struct BitListView<'a> {
    view: SubtreeView<'a>,
    ty: BitListType,
}

impl<'a> BitListView<'a> {
    /// Descriptor of this list.
    pub fn type_def(&self) -> &BitListType {
        &self.ty
    }

    /// Number of bits; fails if the stored length exceeds the limit.
    pub fn length(&self) -> Result<u64, ViewError> {
        let node = self.view.backing().get(RIGHT_GINDEX, 1)?;
        let chunk = node
            .chunk()
            .ok_or(NavigationError::NotALeaf {
                target: RIGHT_GINDEX,
            })?;
        let length = chunk.low_u64();
        if length > self.ty.limit {
            return Err(ViewError::CorruptLength {
                length,
                limit: self.ty.limit,
            });
        }
        Ok(length)
    }

    /// Whether the list holds no bits.
    pub fn is_empty(&self) -> Result<bool, ViewError> {
        Ok(self.length()? == 0)
    }

    fn check_index(&self, index: u64) -> Result<(), ViewError> {
        let length = self.length()?;
        if index >= length {
            return Err(ViewError::Index {
                index,
                bound: length,
            });
        }
        if index >= self.ty.limit {
            return Err(ViewError::Index {
                index,
                bound: self.ty.limit,
            });
        }
        Ok(())
    }

    /// Chunk holding bit `index`, its bottom index and the bit position in it.
    fn chunk_of(&self, index: u64) -> Result<(Root, u64, u8), ViewError> {
        let bottom = index >> 8;
        let node = self.view.get_node(bottom)?;
        match node.chunk() {
            Some(chunk) => Ok((*chunk, bottom, index as u8)),
            None => Err(NavigationError::NotALeaf {
                target: self.view.child_gindex(bottom)?,
            }
            .into()),
        }
    }

    /// Bit at `index`.
    pub fn get(&self, index: u64) -> Result<bool, ViewError> {
        self.check_index(index)?;
        let (chunk, _, bit) = self.chunk_of(index)?;
        Ok(BoolView::from_bitfield(&chunk, bit).0)
    }

    /// Overwrite the bit at `index`.
    pub fn set(&mut self, index: u64, value: bool) -> Result<(), ViewError> {
        self.check_index(index)?;
        let (chunk, bottom, bit) = self.chunk_of(index)?;
        let updated = BoolView(value).backing_from_bitfield_base(&chunk, bit);
        self.view.set_node(bottom, Node::leaf(updated))?;
        Ok(())
    }

    /// Add a bit at the end.
    pub fn append(&mut self, value: bool) -> Result<(), ViewError> {
        let length = self.length()?;
        if length >= self.ty.limit {
            return Err(ViewError::LimitExceeded {
                limit: self.ty.limit,
            });
        }
        let bottom = length >> 8;
        let (rebind, base) = if length & 0xff == 0 {
            // first bit of a fresh chunk
            (self.view.child_rebind(bottom, true)?, Root::ZERO)
        } else {
            let (chunk, _, _) = self.chunk_of(length)?;
            (self.view.child_rebind(bottom, false)?, chunk)
        };
        let chunk = BoolView(value).backing_from_bitfield_base(&base, length as u8);
        let node = rebind.apply(Node::leaf(chunk));
        let node = node
            .set(RIGHT_GINDEX, 1)?
            .apply(Node::leaf(Root::from_u64(length + 1)));
        self.view.set_backing(node)?;
        trace!(length = length + 1, "appended bit");
        Ok(())
    }

    /// Remove the last bit.
    pub fn pop(&mut self) -> Result<(), ViewError> {
        let length = self.length()?;
        if length == 0 {
            return Err(ViewError::EmptyList);
        }
        let last = length - 1;
        let (chunk, bottom, bit) = self.chunk_of(last)?;
        let cleared = BoolView(false).backing_from_bitfield_base(&chunk, bit);
        let node = self
            .view
            .child_rebind(bottom, false)?
            .apply(Node::leaf(cleared));
        let node = node
            .set(RIGHT_GINDEX, 1)?
            .apply(Node::leaf(Root::from_u64(last)));
        self.view.set_backing(node)?;
        trace!(length = last, "popped bit");
        Ok(())
    }

    /// Bits in order, read one index at a time.
    pub fn iter(&self) -> Result<BitIter<'_, 'a>, ViewError> {
        let length = self.length()?;
        Ok(BitIter {
            list: self,
            next: 0,
            length,
        })
    }

    /// Bits in order, read by walking the content subtree directly.
    pub fn readonly_iter(&self) -> Result<ReadonlyBitIter, ViewError> {
        let length = self.length()?;
        let content = self.view.backing().get(LEFT_GINDEX, 1)?;
        let chunks = ChunkIter::new(
            content,
            self.view.depth() - 1,
            length.div_ceil(BITS_PER_CHUNK),
        );
        Ok(ReadonlyBitIter {
            chunks,
            current: Root::ZERO,
            position: 0,
            length,
        })
    }

    /// Copy the bits out.
    pub fn to_bitvec(&self) -> Result<BitVec<u8, Lsb0>, ViewError> {
        let length = self.length()?;
        let mut bits = BitVec::with_capacity(length as usize);
        for bit in self.readonly_iter()? {
            bits.push(bit?);
        }
        Ok(bits)
    }

    /// Encoded size: the bits plus one delimiter bit, in whole bytes.
    pub fn value_byte_length(&self) -> Result<u64, ViewError> {
        Ok(self.length()? / 8 + 1)
    }

    /// Write the bits followed by a 1 delimiter bit, zero-padded to a byte.
    pub fn serialize(&self, w: &mut dyn Write) -> Result<(), ViewError> {
        let mut bits = self.to_bitvec()?;
        bits.push(true);
        bits.set_uninitialized(false);
        w.write_all(bits.as_raw_slice()).map_err(CodecError::from)?;
        Ok(())
    }

    /// Same list, detached from any enclosing view.
    pub fn copy_detached(&self) -> BitListView<'static> {
        BitListView {
            view: self.view.detached(),
            ty: self.ty,
        }
    }
}

impl View for BitListView<'_> {
    fn backing(&self) -> Arc<Node> {
        Arc::clone(self.view.backing())
    }
}

/// Index-by-index bit iterator
#[derive(Debug)]
pub struct BitIter<'v, 'a> {
    list: &'v BitListView<'a>,
    next: u64,
    length: u64,
}

impl Iterator for BitIter<'_, '_> {
    type Item = Result<bool, ViewError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.length {
            return None;
        }
        let item = self.list.get(self.next);
        self.next += 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = (self.length - self.next) as usize;
        (n, Some(n))
    }
}

/// Bulk bit iterator over the content chunks
#[derive(Debug)]
pub struct ReadonlyBitIter {
    chunks: ChunkIter,
    current: Root,
    position: u64,
    length: u64,
}

impl Iterator for ReadonlyBitIter {
    type Item = Result<bool, ViewError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.position >= self.length {
            return None;
        }
        if self.position % BITS_PER_CHUNK == 0 {
            match self.chunks.next() {
                Some(Ok(chunk)) => self.current = chunk,
                Some(Err(err)) => {
                    self.length = self.position;
                    return Some(Err(err.into()));
                }
                None => {
                    self.length = self.position;
                    return None;
                }
            }
        }
        let bit = BoolView::from_bitfield(&self.current, self.position as u8).0;
        self.position += 1;
        Some(Ok(bit))
    }
}
