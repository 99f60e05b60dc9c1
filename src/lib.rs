//! # scenecast
//! A deterministic scene-replication interpreter: it consumes an ordered
//! binary command stream describing a remote simulated world (scene
//! graphs, nodes, assets, materials, attribute writes, physics
//! corrections) and maintains a faithful local replica, advancing playback
//! at a controlled rate. The same interpreter serves live network
//! sessions, replay files, and relay fan-out to downstream consumers.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

pub mod error;
pub mod protocol;
pub mod registry;
pub mod relay;
pub mod session;
pub mod source;

pub use error::{CorruptionError, FormatError, ProtocolError, ReadError, SessionError};
pub use protocol::reader::ByteReader;
pub use protocol::writer::ByteWriter;
pub use protocol::{encode, MessageKind, SessionCommand};
pub use registry::{
    AttrConnection, AttrValue, ColliderId, MaterialId, MeshId, NodeId, Registries, SceneId,
    SoundId, TextureId,
};
pub use relay::{RelayConnection, RelayId, RelaySendError};
pub use session::context::{
    EffectEmission, EffectKind, EventSink, NodeTypeRegistry, NullEventSink, NullPhysicsSync,
    PermissiveNodeTypes, PhysicsSync, RichMessage, SessionContext,
};
pub use session::{Session, SessionConfig};
pub use source::network::{MessageSender, NetworkFeeder};
pub use source::replay::{ReplayFeeder, ReplayWriter};
pub use source::{FeedState, IdleSource, SourceFeeder, UnderrunPolicy};
