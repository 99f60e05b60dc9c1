//! Encoders for every stream command, plus the session-message envelope
//! builder. The state dump and relay bootstrap are built from these, and
//! they double as the reference encoding for tests.

use super::writer::ByteWriter;
use super::{MessageKind, SessionCommand};
use crate::session::context::EffectEmission;

fn command(cmd: SessionCommand) -> ByteWriter {
    let mut writer = ByteWriter::new();
    writer.write_u8(cmd as u8);
    writer
}

pub fn base_time_step(step_size: i32) -> Vec<u8> {
    let mut w = command(SessionCommand::BaseTimeStep);
    w.write_i32(step_size);
    w.to_bytes()
}

pub fn step_scene_graph(scene: u32) -> Vec<u8> {
    let mut w = command(SessionCommand::StepSceneGraph);
    w.write_i32(scene as i32);
    w.to_bytes()
}

pub fn add_scene_graph(id: u32, start_time: i32) -> Vec<u8> {
    let mut w = command(SessionCommand::AddSceneGraph);
    w.write_i32(id as i32);
    w.write_i32(start_time);
    w.to_bytes()
}

pub fn remove_scene_graph(id: u32) -> Vec<u8> {
    let mut w = command(SessionCommand::RemoveSceneGraph);
    w.write_i32(id as i32);
    w.to_bytes()
}

pub fn add_node(scene: u32, type_id: i32, id: u32) -> Vec<u8> {
    let mut w = command(SessionCommand::AddNode);
    w.write_i32(scene as i32);
    w.write_i32(type_id);
    w.write_i32(id as i32);
    w.to_bytes()
}

pub fn remove_node(id: u32) -> Vec<u8> {
    let mut w = command(SessionCommand::RemoveNode);
    w.write_i32(id as i32);
    w.to_bytes()
}

pub fn node_on_create(id: u32) -> Vec<u8> {
    let mut w = command(SessionCommand::NodeOnCreate);
    w.write_i32(id as i32);
    w.to_bytes()
}

pub fn set_foreground_scene_graph(id: u32) -> Vec<u8> {
    let mut w = command(SessionCommand::SetForegroundSceneGraph);
    w.write_i32(id as i32);
    w.to_bytes()
}

pub fn node_message(node: u32, message: &[u8]) -> Vec<u8> {
    let mut w = command(SessionCommand::NodeMessage);
    w.write_i32(node as i32);
    w.write_i32(message.len() as i32);
    w.write_bytes(message);
    w.to_bytes()
}

pub fn connect_node_attribute(src: u32, src_attr: u32, dst: u32, dst_attr: u32) -> Vec<u8> {
    let mut w = command(SessionCommand::ConnectNodeAttribute);
    w.write_i32(src as i32);
    w.write_i32(src_attr as i32);
    w.write_i32(dst as i32);
    w.write_i32(dst_attr as i32);
    w.to_bytes()
}

pub fn add_material(scene: u32, id: u32) -> Vec<u8> {
    let mut w = command(SessionCommand::AddMaterial);
    w.write_i32(scene as i32);
    w.write_i32(id as i32);
    w.to_bytes()
}

pub fn remove_material(id: u32) -> Vec<u8> {
    let mut w = command(SessionCommand::RemoveMaterial);
    w.write_i32(id as i32);
    w.to_bytes()
}

pub fn add_material_component(material: u32, component: &[u8]) -> Vec<u8> {
    let mut w = command(SessionCommand::AddMaterialComponent);
    w.write_i32(material as i32);
    w.write_i32(component.len() as i32);
    w.write_bytes(component);
    w.to_bytes()
}

fn add_asset(cmd: SessionCommand, scene: u32, id: u32, name: &str) -> Vec<u8> {
    let mut w = command(cmd);
    w.write_i32(scene as i32);
    w.write_i32(id as i32);
    w.write_string(name);
    w.to_bytes()
}

fn remove_asset(cmd: SessionCommand, id: u32) -> Vec<u8> {
    let mut w = command(cmd);
    w.write_i32(id as i32);
    w.to_bytes()
}

pub fn add_texture(scene: u32, id: u32, name: &str) -> Vec<u8> {
    add_asset(SessionCommand::AddTexture, scene, id, name)
}

pub fn remove_texture(id: u32) -> Vec<u8> {
    remove_asset(SessionCommand::RemoveTexture, id)
}

pub fn add_mesh(scene: u32, id: u32, name: &str) -> Vec<u8> {
    add_asset(SessionCommand::AddMesh, scene, id, name)
}

pub fn remove_mesh(id: u32) -> Vec<u8> {
    remove_asset(SessionCommand::RemoveMesh, id)
}

pub fn add_sound(scene: u32, id: u32, name: &str) -> Vec<u8> {
    add_asset(SessionCommand::AddSound, scene, id, name)
}

pub fn remove_sound(id: u32) -> Vec<u8> {
    remove_asset(SessionCommand::RemoveSound, id)
}

pub fn add_collider(scene: u32, id: u32, name: &str) -> Vec<u8> {
    add_asset(SessionCommand::AddCollider, scene, id, name)
}

pub fn remove_collider(id: u32) -> Vec<u8> {
    remove_asset(SessionCommand::RemoveCollider, id)
}

fn attr_header(cmd: SessionCommand, node: u32, attr: u32) -> ByteWriter {
    let mut w = command(cmd);
    w.write_i32(node as i32);
    w.write_i32(attr as i32);
    w
}

pub fn set_node_attr_float(node: u32, attr: u32, value: f32) -> Vec<u8> {
    let mut w = attr_header(SessionCommand::SetNodeAttrFloat, node, attr);
    w.write_f32(value);
    w.to_bytes()
}

pub fn set_node_attr_int(node: u32, attr: u32, value: i32) -> Vec<u8> {
    let mut w = attr_header(SessionCommand::SetNodeAttrInt, node, attr);
    w.write_i32(value);
    w.to_bytes()
}

pub fn set_node_attr_bool(node: u32, attr: u32, value: bool) -> Vec<u8> {
    let mut w = attr_header(SessionCommand::SetNodeAttrBool, node, attr);
    w.write_i32(value as i32);
    w.to_bytes()
}

pub fn set_node_attr_string(node: u32, attr: u32, value: &str) -> Vec<u8> {
    let mut w = attr_header(SessionCommand::SetNodeAttrString, node, attr);
    w.write_string(value);
    w.to_bytes()
}

pub fn set_node_attr_floats(node: u32, attr: u32, values: &[f32]) -> Vec<u8> {
    let mut w = attr_header(SessionCommand::SetNodeAttrFloats, node, attr);
    w.write_i32(values.len() as i32);
    w.write_f32s(values);
    w.to_bytes()
}

pub fn set_node_attr_ints(node: u32, attr: u32, values: &[i32]) -> Vec<u8> {
    let mut w = attr_header(SessionCommand::SetNodeAttrInts, node, attr);
    w.write_i32(values.len() as i32);
    w.write_i32s(values);
    w.to_bytes()
}

/// Encodes a single-reference attribute write (node, texture, mesh, ...).
pub fn set_node_attr_ref(cmd: SessionCommand, node: u32, attr: u32, id: u32) -> Vec<u8> {
    let mut w = attr_header(cmd, node, attr);
    w.write_i32(id as i32);
    w.to_bytes()
}

/// Encodes a null-reference attribute write.
pub fn set_node_attr_null(cmd: SessionCommand, node: u32, attr: u32) -> Vec<u8> {
    attr_header(cmd, node, attr).to_bytes()
}

/// Encodes a reference-array attribute write.
pub fn set_node_attr_refs(cmd: SessionCommand, node: u32, attr: u32, ids: &[u32]) -> Vec<u8> {
    let mut w = attr_header(cmd, node, attr);
    w.write_i32(ids.len() as i32);
    for id in ids {
        w.write_i32(*id as i32);
    }
    w.to_bytes()
}

pub fn play_sound(sound: u32, volume: f32) -> Vec<u8> {
    let mut w = command(SessionCommand::PlaySound);
    w.write_i32(sound as i32);
    w.write_f32(volume);
    w.to_bytes()
}

pub fn play_sound_at_position(sound: u32, volume: f32, position: [f32; 3]) -> Vec<u8> {
    let mut w = command(SessionCommand::PlaySoundAtPosition);
    w.write_i32(sound as i32);
    w.write_f32(volume);
    w.write_f32s(&position);
    w.to_bytes()
}

pub fn screen_message(text: &str, color: [f32; 3]) -> Vec<u8> {
    let mut w = command(SessionCommand::ScreenMessage);
    w.write_string(text);
    w.write_f32s(&color);
    w.to_bytes()
}

pub fn screen_message_rich(
    texture: u32,
    tint_texture: u32,
    text: &str,
    color: [f32; 3],
    tint: [f32; 3],
    tint2: [f32; 3],
) -> Vec<u8> {
    let mut w = command(SessionCommand::ScreenMessageRich);
    w.write_i32(texture as i32);
    w.write_i32(tint_texture as i32);
    w.write_string(text);
    w.write_f32s(&color);
    w.write_f32s(&tint);
    w.write_f32s(&tint2);
    w.to_bytes()
}

pub fn emit_effect(emission: &EffectEmission) -> Vec<u8> {
    let mut w = command(SessionCommand::EmitEffect);
    w.write_i32(emission.kind as i32);
    w.write_i32(emission.count);
    w.write_i32(emission.chunk_type);
    w.write_i32(emission.tendril_type);
    w.write_f32s(&emission.position);
    w.write_f32s(&emission.velocity);
    w.write_f32(emission.scale);
    w.write_f32(emission.spread);
    w.to_bytes()
}

pub fn end_of_file() -> Vec<u8> {
    command(SessionCommand::EndOfFile).to_bytes()
}

/// Packages command buffers into a `Commands` session message envelope:
/// the kind byte followed by repeated `{u16 len}{len bytes}` sub-records.
pub fn commands_envelope(commands: &[Vec<u8>]) -> Vec<u8> {
    let total: usize = commands.iter().map(|c| c.len() + 2).sum();
    let mut w = ByteWriter::with_capacity(1 + total);
    w.write_u8(MessageKind::Commands as u8);
    for cmd in commands {
        debug_assert!(cmd.len() <= u16::MAX as usize);
        w.write_u16(cmd.len() as u16);
        w.write_bytes(cmd);
    }
    w.to_bytes()
}

/// The 1-byte `Reset` session message.
pub fn reset_message() -> Vec<u8> {
    vec![MessageKind::Reset as u8]
}
