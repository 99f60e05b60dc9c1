//! Wire-level protocol constants: the opcode set, session message kinds,
//! replay file header values, and the bounds enforced at decode time.

pub mod encode;
pub mod reader;
pub mod writer;

use crate::error::ProtocolError;

/// Magic constant opening every replay file ("PRCS" on disk, little-endian).
pub const REPLAY_FILE_ID: u32 = 0x5343_5250;

/// Current protocol version written to new replay files.
pub const PROTOCOL_VERSION: u16 = 33;

/// Oldest protocol version this interpreter still understands.
pub const PROTOCOL_VERSION_MIN: u16 = 24;

/// Inclusive upper bound for scene ids.
pub const MAX_SCENE_ID: u32 = 100;

/// Inclusive upper bound for node ids.
pub const MAX_NODE_ID: u32 = 10_000;

/// Inclusive upper bound for material and asset ids.
pub const MAX_ASSET_ID: u32 = 999;

/// Largest element count accepted for an array attribute.
pub const MAX_ARRAY_SIZE: i32 = 1000;

/// Largest node-message or material-component blob accepted.
pub const MAX_BLOB_SIZE: i32 = 10_000;

/// Step sizes above this are treated as stream corruption.
pub const MAX_STEP_SIZE: i32 = 10_000;

/// A correction packet at or below this size carries no bodies
/// (opcode + blend flag + u16 node count) and is dropped by encoders.
pub const CORRECTION_HEADER_SIZE: usize = 4;

/// Kind byte leading every session message envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Reset = 1,
    Commands = 2,
    DynamicsCorrection = 3,
}

impl MessageKind {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Reset),
            2 => Some(Self::Commands),
            3 => Some(Self::DynamicsCorrection),
            _ => None,
        }
    }
}

/// The closed opcode set. Every command buffer begins with one of these;
/// any other leading byte is a [`ProtocolError::UnknownCommand`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SessionCommand {
    BaseTimeStep = 0,
    StepSceneGraph = 1,
    AddSceneGraph = 2,
    RemoveSceneGraph = 3,
    AddNode = 4,
    RemoveNode = 5,
    NodeOnCreate = 6,
    SetForegroundSceneGraph = 7,
    NodeMessage = 8,
    ConnectNodeAttribute = 9,
    AddMaterial = 10,
    RemoveMaterial = 11,
    AddMaterialComponent = 12,
    AddTexture = 13,
    RemoveTexture = 14,
    AddMesh = 15,
    RemoveMesh = 16,
    AddSound = 17,
    RemoveSound = 18,
    AddCollider = 19,
    RemoveCollider = 20,
    SetNodeAttrFloat = 21,
    SetNodeAttrInt = 22,
    SetNodeAttrBool = 23,
    SetNodeAttrFloats = 24,
    SetNodeAttrInts = 25,
    SetNodeAttrString = 26,
    SetNodeAttrNode = 27,
    SetNodeAttrNodeNull = 28,
    SetNodeAttrNodes = 29,
    SetNodeAttrTexture = 30,
    SetNodeAttrTextureNull = 31,
    SetNodeAttrTextures = 32,
    SetNodeAttrMesh = 33,
    SetNodeAttrMeshNull = 34,
    SetNodeAttrMeshes = 35,
    SetNodeAttrSound = 36,
    SetNodeAttrSoundNull = 37,
    SetNodeAttrSounds = 38,
    SetNodeAttrCollider = 39,
    SetNodeAttrColliderNull = 40,
    SetNodeAttrColliders = 41,
    SetNodeAttrMaterials = 42,
    PlaySound = 43,
    PlaySoundAtPosition = 44,
    ScreenMessage = 45,
    ScreenMessageRich = 46,
    EmitEffect = 47,
    DynamicsCorrection = 48,
    EndOfFile = 49,
}

impl TryFrom<u8> for SessionCommand {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        use SessionCommand::*;
        let cmd = match value {
            0 => BaseTimeStep,
            1 => StepSceneGraph,
            2 => AddSceneGraph,
            3 => RemoveSceneGraph,
            4 => AddNode,
            5 => RemoveNode,
            6 => NodeOnCreate,
            7 => SetForegroundSceneGraph,
            8 => NodeMessage,
            9 => ConnectNodeAttribute,
            10 => AddMaterial,
            11 => RemoveMaterial,
            12 => AddMaterialComponent,
            13 => AddTexture,
            14 => RemoveTexture,
            15 => AddMesh,
            16 => RemoveMesh,
            17 => AddSound,
            18 => RemoveSound,
            19 => AddCollider,
            20 => RemoveCollider,
            21 => SetNodeAttrFloat,
            22 => SetNodeAttrInt,
            23 => SetNodeAttrBool,
            24 => SetNodeAttrFloats,
            25 => SetNodeAttrInts,
            26 => SetNodeAttrString,
            27 => SetNodeAttrNode,
            28 => SetNodeAttrNodeNull,
            29 => SetNodeAttrNodes,
            30 => SetNodeAttrTexture,
            31 => SetNodeAttrTextureNull,
            32 => SetNodeAttrTextures,
            33 => SetNodeAttrMesh,
            34 => SetNodeAttrMeshNull,
            35 => SetNodeAttrMeshes,
            36 => SetNodeAttrSound,
            37 => SetNodeAttrSoundNull,
            38 => SetNodeAttrSounds,
            39 => SetNodeAttrCollider,
            40 => SetNodeAttrColliderNull,
            41 => SetNodeAttrColliders,
            42 => SetNodeAttrMaterials,
            43 => PlaySound,
            44 => PlaySoundAtPosition,
            45 => ScreenMessage,
            46 => ScreenMessageRich,
            47 => EmitEffect,
            48 => DynamicsCorrection,
            49 => EndOfFile,
            other => return Err(ProtocolError::UnknownCommand(other)),
        };
        Ok(cmd)
    }
}
