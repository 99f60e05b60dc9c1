//! Id-indexed slot tables and the replica records stored in them.
//!
//! Ids are assigned by the stream, never locally, and are protocol-visible:
//! tables grow up to a fixed bound and are never compacted, so a removed
//! slot is cleared in place and every other id stays stable.

use std::collections::BTreeMap;

use crate::error::ProtocolError;
use crate::protocol::{MAX_ASSET_ID, MAX_NODE_ID, MAX_SCENE_ID};

pub type SceneId = u32;
pub type NodeId = u32;
pub type MaterialId = u32;
pub type TextureId = u32;
pub type MeshId = u32;
pub type SoundId = u32;
pub type ColliderId = u32;

/// A growable dense array of optional entries keyed by stream id, with an
/// inclusive id bound enforced on insert.
pub struct SlotTable<T> {
    kind: &'static str,
    max_id: u32,
    slots: Vec<Option<T>>,
}

impl<T> SlotTable<T> {
    pub fn new(kind: &'static str, max_id: u32) -> Self {
        Self {
            kind,
            max_id,
            slots: Vec::new(),
        }
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn occupied_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    fn check_bounds(&self, id: i64) -> Result<u32, ProtocolError> {
        if id < 0 || id > self.max_id as i64 {
            return Err(ProtocolError::IdOutOfBounds {
                kind: self.kind,
                id,
                max: self.max_id,
            });
        }
        Ok(id as u32)
    }

    /// Inserts at a stream-assigned id, growing the table to exactly
    /// `id + 1` slots if needed. The target slot must be empty.
    pub fn insert(&mut self, id: i32, value: T) -> Result<(), ProtocolError> {
        let id = self.check_bounds(id as i64)?;
        if self.slots.len() < id as usize + 1 {
            self.slots.resize_with(id as usize + 1, || None);
        }
        let slot = &mut self.slots[id as usize];
        if slot.is_some() {
            return Err(ProtocolError::OccupiedSlot { kind: self.kind, id });
        }
        *slot = Some(value);
        Ok(())
    }

    pub fn get(&self, id: i32) -> Result<&T, ProtocolError> {
        let id = self.check_bounds(id as i64)?;
        self.slots
            .get(id as usize)
            .and_then(|s| s.as_ref())
            .ok_or(ProtocolError::EmptySlot { kind: self.kind, id })
    }

    pub fn get_mut(&mut self, id: i32) -> Result<&mut T, ProtocolError> {
        let id = self.check_bounds(id as i64)?;
        self.slots
            .get_mut(id as usize)
            .and_then(|s| s.as_mut())
            .ok_or(ProtocolError::EmptySlot { kind: self.kind, id })
    }

    /// Clears an occupied slot without compacting. The slot must hold a
    /// value.
    pub fn remove(&mut self, id: i32) -> Result<T, ProtocolError> {
        let id = self.check_bounds(id as i64)?;
        self.slots
            .get_mut(id as usize)
            .and_then(|s| s.take())
            .ok_or(ProtocolError::EmptySlot { kind: self.kind, id })
    }

    pub fn contains(&self, id: u32) -> bool {
        self.slots
            .get(id as usize)
            .map(|s| s.is_some())
            .unwrap_or(false)
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }

    /// Iterates occupied slots in id order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &T)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(id, slot)| slot.as_ref().map(|v| (id as u32, v)))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (u32, &mut T)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(id, slot)| slot.as_mut().map(|v| (id as u32, v)))
    }
}

/// An attribute value, as decoded from one of the typed attribute-write
/// opcodes. Reference kinds carry stream ids; `None` is the null reference.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Float(f32),
    Int(i64),
    Bool(bool),
    String(String),
    Floats(Vec<f32>),
    Ints(Vec<i64>),
    Node(Option<NodeId>),
    Nodes(Vec<NodeId>),
    Texture(Option<TextureId>),
    Textures(Vec<TextureId>),
    Mesh(Option<MeshId>),
    Meshes(Vec<MeshId>),
    Sound(Option<SoundId>),
    Sounds(Vec<SoundId>),
    Collider(Option<ColliderId>),
    Colliders(Vec<ColliderId>),
    Materials(Vec<MaterialId>),
}

/// A directed link from one node's output attribute to another node's
/// input attribute. Severed implicitly when either node is destroyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttrConnection {
    pub src_attr: u32,
    pub dst_node: NodeId,
    pub dst_attr: u32,
}

pub struct SceneRecord {
    pub start_time: i32,
    /// Count of explicit scene-step commands applied so far.
    pub steps: u64,
}

pub struct NodeRecord {
    pub scene: SceneId,
    pub type_id: i32,
    /// Attribute cache, keyed by attribute index; backs the full-state dump.
    pub attrs: BTreeMap<u32, AttrValue>,
    pub connections: Vec<AttrConnection>,
}

pub struct AssetRecord {
    pub scene: SceneId,
    pub name: String,
}

pub struct MaterialRecord {
    pub scene: SceneId,
    pub components: Vec<Vec<u8>>,
}

/// The interpreter's flat registries. Owned exclusively by one session;
/// cleared wholesale on reset.
pub struct Registries {
    pub scenes: SlotTable<SceneRecord>,
    pub nodes: SlotTable<NodeRecord>,
    pub materials: SlotTable<MaterialRecord>,
    pub textures: SlotTable<AssetRecord>,
    pub meshes: SlotTable<AssetRecord>,
    pub sounds: SlotTable<AssetRecord>,
    pub colliders: SlotTable<AssetRecord>,
}

impl Registries {
    pub fn new() -> Self {
        Self {
            scenes: SlotTable::new("scene", MAX_SCENE_ID),
            nodes: SlotTable::new("node", MAX_NODE_ID),
            materials: SlotTable::new("material", MAX_ASSET_ID),
            textures: SlotTable::new("texture", MAX_ASSET_ID),
            meshes: SlotTable::new("mesh", MAX_ASSET_ID),
            sounds: SlotTable::new("sound", MAX_ASSET_ID),
            colliders: SlotTable::new("collider", MAX_ASSET_ID),
        }
    }

    pub fn clear(&mut self) {
        self.scenes.clear();
        self.nodes.clear();
        self.materials.clear();
        self.textures.clear();
        self.meshes.clear();
        self.sounds.clear();
        self.colliders.clear();
    }

    /// Removes a node and severs every attribute connection that
    /// references it from either side.
    pub fn remove_node(&mut self, id: i32) -> Result<NodeRecord, ProtocolError> {
        let record = self.nodes.remove(id)?;
        let removed = id as u32;
        for (_, node) in self.nodes.iter_mut() {
            node.connections.retain(|c| c.dst_node != removed);
        }
        Ok(record)
    }
}

impl Default for Registries {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_at_bound_resizes_exactly() {
        let mut table: SlotTable<u8> = SlotTable::new("scene", 100);
        table.insert(100, 7).unwrap();
        assert_eq!(table.slot_count(), 101);
        assert_eq!(*table.get(100).unwrap(), 7);
    }

    #[test]
    fn insert_past_bound_fails() {
        let mut table: SlotTable<u8> = SlotTable::new("scene", 100);
        assert_eq!(
            table.insert(101, 7),
            Err(ProtocolError::IdOutOfBounds {
                kind: "scene",
                id: 101,
                max: 100
            })
        );
        assert_eq!(table.slot_count(), 0);
    }

    #[test]
    fn negative_id_fails() {
        let mut table: SlotTable<u8> = SlotTable::new("node", 10);
        assert!(matches!(
            table.insert(-1, 0),
            Err(ProtocolError::IdOutOfBounds { id: -1, .. })
        ));
        assert!(matches!(
            table.get(-1),
            Err(ProtocolError::IdOutOfBounds { id: -1, .. })
        ));
    }

    #[test]
    fn double_insert_fails() {
        let mut table: SlotTable<u8> = SlotTable::new("node", 10);
        table.insert(3, 1).unwrap();
        assert_eq!(
            table.insert(3, 2),
            Err(ProtocolError::OccupiedSlot { kind: "node", id: 3 })
        );
    }

    #[test]
    fn remove_clears_without_compacting() {
        let mut table: SlotTable<u8> = SlotTable::new("node", 10);
        table.insert(2, 1).unwrap();
        table.insert(5, 2).unwrap();
        table.remove(2).unwrap();
        assert_eq!(table.slot_count(), 6);
        assert!(matches!(
            table.get(2),
            Err(ProtocolError::EmptySlot { id: 2, .. })
        ));
        assert_eq!(*table.get(5).unwrap(), 2);
        // Removing an empty slot is a protocol error.
        assert!(table.remove(2).is_err());
    }

    #[test]
    fn removing_node_severs_connections_on_both_sides() {
        let mut regs = Registries::new();
        regs.scenes
            .insert(0, SceneRecord { start_time: 0, steps: 0 })
            .unwrap();
        for id in 0..3 {
            regs.nodes
                .insert(
                    id,
                    NodeRecord {
                        scene: 0,
                        type_id: 1,
                        attrs: BTreeMap::new(),
                        connections: Vec::new(),
                    },
                )
                .unwrap();
        }
        regs.nodes.get_mut(0).unwrap().connections.push(AttrConnection {
            src_attr: 0,
            dst_node: 1,
            dst_attr: 2,
        });
        regs.nodes.get_mut(2).unwrap().connections.push(AttrConnection {
            src_attr: 1,
            dst_node: 0,
            dst_attr: 0,
        });

        // Removing node 1 strips node 0's outgoing link to it.
        regs.remove_node(1).unwrap();
        assert!(regs.nodes.get(0).unwrap().connections.is_empty());
        // Node 2's link to node 0 survives until node 0 goes away.
        assert_eq!(regs.nodes.get(2).unwrap().connections.len(), 1);
        regs.remove_node(0).unwrap();
        assert!(regs.nodes.get(2).unwrap().connections.is_empty());
    }
}
