//! Composite container: an ordered list of typed fields
//!
//! Field `i` is the `i`-th bottom node of a subtree of depth
//! `cover_depth(field_count)`. Scalars occupy slot 0 of their own chunk.

use std::any::TypeId;
use std::io::{Read, Write};
use std::sync::Arc;

use tracing::debug;

use super::{BackingHook, BasicView, BitListType, BitListView, SubtreeView, TypeDef, View, ViewError};
use crate::codec::{
    read_scope, serialize_composite, split_composite, CompositeField, FieldLayout, SizeBounds,
    OFFSET_BYTE_LENGTH,
};
use crate::tree::{cover_depth, fill, subtree_fill_to_contents, Node};

/// Container descriptor
#[derive(Debug, Clone, Default)]
pub struct ContainerType {
    fields: Vec<Arc<dyn TypeDef>>,
}

impl ContainerType {
    /// Container with no fields.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a field.
    pub fn with_field(self, ty: impl TypeDef + 'static) -> Self {
        self.with_shared_field(Arc::new(ty))
    }

    /// Append a field whose descriptor is shared with other types.
    pub fn with_shared_field(mut self, ty: Arc<dyn TypeDef>) -> Self {
        self.fields.push(ty);
        self
    }

    /// Number of fields.
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Descriptor of field `index`.
    pub fn field(&self, index: usize) -> Result<&Arc<dyn TypeDef>, ViewError> {
        self.fields.get(index).ok_or(ViewError::FieldOutOfRange {
            index,
            count: self.fields.len(),
        })
    }

    /// Depth of the field subtree.
    pub fn depth(&self) -> u8 {
        cover_depth(self.fields.len() as u64)
    }

    /// Container of default field values, not nested in anything.
    pub fn new_view(&self) -> ContainerView<'static> {
        self.view_from_backing(self.default_node(), None)
    }

    /// Bind a view to `node`; nested views pass the commit hook.
    pub fn view_from_backing<'a>(&self, node: Arc<Node>, hook: Option<BackingHook<'a>>) -> ContainerView<'a> {
        ContainerView {
            view: SubtreeView::new(node, hook, self.depth()),
            ty: self.clone(),
        }
    }

    fn build(&self, nodes: Vec<Arc<Node>>) -> Result<Arc<Node>, ViewError> {
        Ok(subtree_fill_to_contents(&nodes, self.depth())?)
    }

    fn layout(&self) -> Vec<FieldLayout> {
        self.fields
            .iter()
            .map(|f| {
                let bounds = f.size_bounds();
                if bounds.fixed {
                    FieldLayout::Fixed(bounds.min)
                } else {
                    FieldLayout::Variable
                }
            })
            .collect()
    }

    fn field_values(&self, node: &Arc<Node>) -> Result<Vec<FieldValue<'_>>, ViewError> {
        let view = self.view_from_backing(Arc::clone(node), None);
        let mut values = Vec::with_capacity(self.fields.len());
        for (i, ty) in self.fields.iter().enumerate() {
            values.push(FieldValue {
                ty: ty.as_ref(),
                node: view.field_node(i)?,
            });
        }
        Ok(values)
    }
}

impl TypeDef for ContainerType {
    fn default_node(&self) -> Arc<Node> {
        let nodes: Vec<Arc<Node>> = self.fields.iter().map(|f| f.default_node()).collect();
        fill(&nodes, self.depth())
    }

    fn size_bounds(&self) -> SizeBounds {
        let mut min = 0u64;
        let mut max = 0u64;
        let mut fixed = true;
        for field in &self.fields {
            let bounds = field.size_bounds();
            if bounds.fixed {
                min = min.saturating_add(bounds.min);
                max = max.saturating_add(bounds.max);
            } else {
                fixed = false;
                min = min.saturating_add(OFFSET_BYTE_LENGTH + bounds.min);
                max = max.saturating_add(OFFSET_BYTE_LENGTH + bounds.max);
            }
        }
        if fixed {
            SizeBounds::fixed(min)
        } else {
            SizeBounds::variable(min, max)
        }
    }

    fn value_byte_length(&self, node: &Arc<Node>) -> Result<u64, ViewError> {
        let mut total = 0u64;
        for field in self.field_values(node)? {
            total += match field.fixed_byte_length() {
                Some(size) => size,
                None => OFFSET_BYTE_LENGTH + field.value_byte_length()?,
            };
        }
        Ok(total)
    }

    fn serialize_node(&self, node: &Arc<Node>, w: &mut dyn Write) -> Result<(), ViewError> {
        let fields = self.field_values(node)?;
        serialize_composite(&fields, w)?;
        Ok(())
    }

    fn deserialize_node(&self, r: &mut dyn Read, scope: u64) -> Result<Arc<Node>, ViewError> {
        self.size_bounds().check_scope(scope)?;
        let bytes = read_scope(r, scope)?;
        let regions = split_composite(&bytes, &self.layout()).map_err(|err| {
            debug!(%err, bytes = scope, "rejected container encoding");
            err
        })?;

        let mut nodes = Vec::with_capacity(self.fields.len());
        for (ty, mut region) in self.fields.iter().zip(regions) {
            let len = region.len() as u64;
            nodes.push(ty.deserialize_node(&mut region, len)?);
        }
        debug!(fields = nodes.len(), bytes = scope, "decoded container");
        self.build(nodes)
    }

    fn as_container(&self) -> Option<&ContainerType> {
        Some(self)
    }
}

/// A field's descriptor paired with its current node
struct FieldValue<'t> {
    ty: &'t dyn TypeDef,
    node: Arc<Node>,
}

impl CompositeField for FieldValue<'_> {
    type Error = ViewError;

    fn fixed_byte_length(&self) -> Option<u64> {
        let bounds = self.ty.size_bounds();
        bounds.fixed.then_some(bounds.min)
    }

    fn value_byte_length(&self) -> Result<u64, ViewError> {
        self.ty.value_byte_length(&self.node)
    }

    fn serialize(&self, w: &mut dyn Write) -> Result<(), ViewError> {
        self.ty.serialize_node(&self.node, w)
    }
}

/// View over a container tree
#[derive(Debug)]
pub struct ContainerView<'a> {
    view: SubtreeView<'a>,
    ty: ContainerType,
}

impl<'a> ContainerView<'a> {
    /// Descriptor of this container.
    pub fn type_def(&self) -> &ContainerType {
        &self.ty
    }

    /// Node of field `index`.
    pub fn field_node(&self, index: usize) -> Result<Arc<Node>, ViewError> {
        self.ty.field(index)?;
        self.view.get_node(index as u64)
    }

    /// Replace field `index` and commit; returns the new top root.
    pub fn set_field_node(&mut self, index: usize, node: Arc<Node>) -> Result<Arc<Node>, ViewError> {
        self.ty.field(index)?;
        self.view.set_node(index as u64, node)
    }

    fn check_scalar<V: BasicView>(&self, index: usize) -> Result<(), ViewError> {
        if self.ty.field(index)?.basic_value_type() != Some(TypeId::of::<V>()) {
            return Err(ViewError::FieldKind {
                index,
                expected: std::any::type_name::<V>(),
            });
        }
        Ok(())
    }

    /// Scalar stored in field `index`.
    pub fn get<V: BasicView>(&self, index: usize) -> Result<V, ViewError> {
        self.check_scalar::<V>(index)?;
        let node = self.field_node(index)?;
        V::from_backing(&node)
    }

    /// Overwrite the scalar in field `index`.
    pub fn set<V: BasicView>(&mut self, index: usize, value: V) -> Result<(), ViewError> {
        self.check_scalar::<V>(index)?;
        self.set_field_node(index, value.to_backing())?;
        Ok(())
    }

    /// Bit-list in field `index`; its commits write back into this container.
    pub fn bitlist_field(&mut self, index: usize) -> Result<BitListView<'_>, ViewError> {
        let ty: BitListType = *self
            .ty
            .field(index)?
            .as_bitlist()
            .ok_or(ViewError::FieldKind {
                index,
                expected: "bit-list",
            })?;
        let node = self.field_node(index)?;
        Ok(ty.view_from_backing(
            node,
            Some(Box::new(move |n| self.set_field_node(index, n))),
        ))
    }

    /// Container in field `index`; its commits write back into this container.
    pub fn container_field(&mut self, index: usize) -> Result<ContainerView<'_>, ViewError> {
        let ty = self
            .ty
            .field(index)?
            .as_container()
            .cloned()
            .ok_or(ViewError::FieldKind {
                index,
                expected: "container",
            })?;
        let node = self.field_node(index)?;
        Ok(ty.view_from_backing(
            node,
            Some(Box::new(move |n| self.set_field_node(index, n))),
        ))
    }

    /// Encoded size of the current value.
    pub fn value_byte_length(&self) -> Result<u64, ViewError> {
        self.ty.value_byte_length(self.view.backing())
    }

    /// Write the encoding of the current value.
    pub fn serialize(&self, w: &mut dyn Write) -> Result<(), ViewError> {
        self.ty.serialize_node(self.view.backing(), w)
    }

    /// Standalone container decoded from exactly `bytes`.
    pub fn deserialize(ty: &ContainerType, bytes: &[u8]) -> Result<ContainerView<'static>, ViewError> {
        let mut reader = bytes;
        let node = ty.deserialize_node(&mut reader, bytes.len() as u64)?;
        Ok(ty.view_from_backing(node, None))
    }

    /// Same container, detached from any enclosing view.
    pub fn copy_detached(&self) -> ContainerView<'static> {
        ContainerView {
            view: self.view.detached(),
            ty: self.ty.clone(),
        }
    }
}

impl View for ContainerView<'_> {
    fn backing(&self) -> Arc<Node> {
        Arc::clone(self.view.backing())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{sha256_pair, Root};
    use crate::view::{BoolView, Uint16View, Uint64View, Uint8View, BOOL_TYPE, UINT16_TYPE, UINT64_TYPE, UINT8_TYPE};

    fn record() -> ContainerType {
        ContainerType::new()
            .with_field(UINT64_TYPE)
            .with_field(BitListType::new(16))
            .with_field(BOOL_TYPE)
    }

    #[test]
    fn test_scalar_fields() {
        let mut view = record().new_view();
        view.set(0, Uint64View(7)).unwrap();
        view.set(2, BoolView(true)).unwrap();
        assert_eq!(view.get::<Uint64View>(0).unwrap(), Uint64View(7));
        assert_eq!(view.get::<BoolView>(2).unwrap(), BoolView(true));

        assert!(matches!(
            view.get::<Uint64View>(1),
            Err(ViewError::FieldKind { index: 1, .. })
        ));
        assert!(matches!(
            view.get::<Uint8View>(5),
            Err(ViewError::FieldOutOfRange { index: 5, count: 3 })
        ));
    }

    #[test]
    fn test_scalar_access_checks_field_type() {
        let pair = ContainerType::new().with_field(UINT8_TYPE).with_field(UINT8_TYPE);
        let ty = ContainerType::new()
            .with_field(BOOL_TYPE)
            .with_field(pair)
            .with_field(UINT16_TYPE);
        let mut view = ty.new_view();
        let before = view.backing();

        // same width, different type
        assert!(matches!(
            view.set(0, Uint8View(5)),
            Err(ViewError::FieldKind { index: 0, .. })
        ));
        assert!(matches!(
            view.set(1, Uint16View(7)),
            Err(ViewError::FieldKind { index: 1, .. })
        ));
        assert!(view.get::<Uint16View>(1).is_err());
        assert_eq!(view.backing(), before);

        view.set(2, Uint16View(7)).unwrap();
        assert_eq!(view.get::<Uint16View>(2).unwrap(), Uint16View(7));
        assert_eq!(
            view.container_field(1).unwrap().get::<Uint8View>(0).unwrap(),
            Uint8View(0)
        );
    }

    #[test]
    fn test_nested_bitlist_commits_into_container() {
        let mut view = record().new_view();
        let before = view.backing();
        {
            let mut bits = view.bitlist_field(1).unwrap();
            for _ in 0..4 {
                bits.append(true).unwrap();
            }
            assert_eq!(bits.length().unwrap(), 4);
        }
        let after = view.backing();
        assert_ne!(
            before.merkle_root(sha256_pair),
            after.merkle_root(sha256_pair)
        );
        // untouched fields are shared with the old tree
        assert!(Arc::ptr_eq(
            &before.get(4, 2).unwrap(),
            &after.get(4, 2).unwrap()
        ));

        let bits = view.bitlist_field(1).unwrap();
        assert!(bits.get(3).unwrap());
    }

    #[test]
    fn test_two_level_nesting() {
        let inner = ContainerType::new()
            .with_field(UINT16_TYPE)
            .with_field(BitListType::new(8));
        let outer = ContainerType::new()
            .with_field(UINT8_TYPE)
            .with_field(inner);
        let mut view = outer.new_view();
        {
            let mut child = view.container_field(1).unwrap();
            child.set(0, Uint16View(513)).unwrap();
            let mut bits = child.bitlist_field(1).unwrap();
            bits.append(true).unwrap();
        }
        let mut child = view.container_field(1).unwrap();
        assert_eq!(child.get::<Uint16View>(0).unwrap(), Uint16View(513));
        assert_eq!(child.bitlist_field(1).unwrap().length().unwrap(), 1);
    }

    #[test]
    fn test_serialize_round_trip() {
        let ty = record();
        let mut view = ty.new_view();
        view.set(0, Uint64View(0x0102)).unwrap();
        view.set(2, BoolView(true)).unwrap();
        {
            let mut bits = view.bitlist_field(1).unwrap();
            bits.append(true).unwrap();
            bits.append(false).unwrap();
        }

        let mut out = Vec::new();
        view.serialize(&mut out).unwrap();
        // 8 + 4 + 1 fixed region, then one byte of bits: 0b101
        assert_eq!(view.value_byte_length().unwrap(), 14);
        assert_eq!(
            out,
            vec![2, 1, 0, 0, 0, 0, 0, 0, 13, 0, 0, 0, 1, 0b101]
        );

        let decoded = ContainerView::deserialize(&ty, &out).unwrap();
        assert_eq!(
            decoded.backing().merkle_root(sha256_pair),
            view.backing().merkle_root(sha256_pair)
        );
    }

    #[test]
    fn test_size_bounds() {
        let ty = record();
        assert_eq!(ty.size_bounds(), SizeBounds::variable(14, 8 + 4 + 3 + 1));
        let fixed = ContainerType::new().with_field(UINT8_TYPE).with_field(UINT64_TYPE);
        assert_eq!(fixed.size_bounds(), SizeBounds::fixed(9));
        assert!(ContainerView::deserialize(&fixed, &[0; 8]).is_err());
    }

    #[test]
    fn test_empty_container_is_zero_leaf() {
        let view = ContainerType::new().new_view();
        assert_eq!(view.backing().chunk(), Some(&Root::ZERO));
        let mut out = Vec::new();
        view.serialize(&mut out).unwrap();
        assert!(out.is_empty());
    }
}
