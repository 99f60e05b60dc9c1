//! Collaborator interfaces consumed by the interpreter. A session is
//! constructed with these rather than reaching through globals; every
//! method has a no-op default so headless use only implements what it
//! needs.

use crate::error::ProtocolError;
use crate::registry::{AttrValue, NodeId, SceneId, SoundId, TextureId};

/// Maps type ids from the stream to entity constructors. The interpreter
/// only validates existence; construction semantics live with the
/// implementor.
pub trait NodeTypeRegistry {
    fn contains(&self, type_id: i32) -> bool;
}

/// A type registry that accepts every non-negative type id. Useful for
/// replay inspection tools that do not instantiate real nodes.
pub struct PermissiveNodeTypes;

impl NodeTypeRegistry for PermissiveNodeTypes {
    fn contains(&self, type_id: i32) -> bool {
        type_id >= 0
    }
}

/// Typed selector for effect emission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum EffectKind {
    Chunks = 0,
    Stickers = 1,
    Tendrils = 2,
    Distortion = 3,
    FlagStand = 4,
}

impl TryFrom<i32> for EffectKind {
    type Error = ProtocolError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Chunks),
            1 => Ok(Self::Stickers),
            2 => Ok(Self::Tendrils),
            3 => Ok(Self::Distortion),
            4 => Ok(Self::FlagStand),
            other => Err(ProtocolError::UnknownEffectKind(other)),
        }
    }
}

/// A decoded `EmitEffect` command.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectEmission {
    pub kind: EffectKind,
    pub count: i32,
    pub chunk_type: i32,
    pub tendril_type: i32,
    pub position: [f32; 3],
    pub velocity: [f32; 3],
    pub scale: f32,
    pub spread: f32,
}

/// A decoded rich screen message (texture + tint + placement variant).
#[derive(Debug, Clone, PartialEq)]
pub struct RichMessage {
    pub texture: TextureId,
    pub tint_texture: TextureId,
    pub text: String,
    pub color: [f32; 3],
    pub tint: [f32; 3],
    pub tint2: [f32; 3],
}

/// Sink for every side effect the interpreter forwards out of the stream:
/// audio, display, effects, node events, and fatal-error announcement.
pub trait EventSink {
    fn node_added(&mut self, _node: NodeId, _scene: SceneId, _type_id: i32) {}

    fn node_removed(&mut self, _node: NodeId, _scene: SceneId) {}

    /// Lifecycle hook invoked once all of a node's initial attributes are set.
    fn node_on_create(&mut self, _node: NodeId) {}

    /// An opaque message blob dispatched to a node.
    fn node_message(&mut self, _node: NodeId, _message: &[u8]) {}

    fn attr_changed(&mut self, _node: NodeId, _attr: u32, _value: &AttrValue) {}

    fn attrs_connected(&mut self, _src: NodeId, _src_attr: u32, _dst: NodeId, _dst_attr: u32) {}

    fn scene_stepped(&mut self, _scene: SceneId) {}

    fn foreground_scene_changed(&mut self, _scene: SceneId) {}

    fn play_sound(&mut self, _sound: SoundId, _volume: f32) {}

    fn play_sound_at_position(&mut self, _sound: SoundId, _volume: f32, _position: [f32; 3]) {}

    fn screen_message(&mut self, _text: &str, _color: [f32; 3]) {}

    fn screen_message_rich(&mut self, _message: &RichMessage) {}

    fn emit_effect(&mut self, _emission: &EffectEmission) {}

    /// Announces a fatal session error just before the session terminates.
    /// Implementors typically surface a localized message and fall back to
    /// a menu or idle context.
    fn session_error(&mut self, _description: &str) {}
}

pub struct NullEventSink;

impl EventSink for NullEventSink {}

/// Physics-body capability: full-state application/extraction plus the
/// smoothing-offset used to absorb correction discontinuities.
pub trait PhysicsSync {
    /// Current position of a body, or `None` if the node has no such body.
    fn body_position(&self, _node: NodeId, _body: u8) -> Option<[f32; 3]> {
        None
    }

    /// Applies an authoritative body snapshot, returning the number of
    /// bytes consumed, or `None` if the node has no such body (the caller
    /// then skips the declared payload).
    fn apply_body_state(&mut self, _node: NodeId, _body: u8, _data: &[u8]) -> Option<usize> {
        None
    }

    /// Adds a positional delta to be absorbed gradually instead of
    /// snapping after a blended correction.
    fn add_blend_offset(&mut self, _node: NodeId, _body: u8, _delta: [f32; 3]) {}

    /// Entity-specific resync data, opaque to the interpreter.
    fn apply_resync_data(&mut self, _node: NodeId, _data: &[u8]) {}

    /// Number of bodies a node exposes for correction encoding.
    fn body_count(&self, _node: NodeId) -> u8 {
        0
    }

    /// Extracts a body's full state for a correction message.
    fn extract_body_state(&self, _node: NodeId, _body: u8) -> Vec<u8> {
        Vec::new()
    }
}

pub struct NullPhysicsSync;

impl PhysicsSync for NullPhysicsSync {}

/// The collaborators a session is constructed with.
pub struct SessionContext {
    pub node_types: Box<dyn NodeTypeRegistry>,
    pub events: Box<dyn EventSink>,
    pub physics: Box<dyn PhysicsSync>,
}

impl SessionContext {
    /// A context with permissive types and no-op collaborators.
    pub fn headless() -> Self {
        Self {
            node_types: Box::new(PermissiveNodeTypes),
            events: Box::new(NullEventSink),
            physics: Box::new(NullPhysicsSync),
        }
    }
}
