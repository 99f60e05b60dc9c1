//! The command interpreter: session message handling, whole-step command
//! queueing, the time gate, and the opcode dispatch loop.

pub mod context;
mod correction;
mod dump;

use std::collections::VecDeque;

use log::{error, warn};

use crate::error::{CorruptionError, ProtocolError, SessionError};
use crate::protocol::reader::ByteReader;
use crate::protocol::{
    encode, MessageKind, SessionCommand, MAX_ARRAY_SIZE, MAX_BLOB_SIZE, MAX_STEP_SIZE,
};
use crate::registry::{
    AssetRecord, AttrConnection, AttrValue, MaterialRecord, NodeRecord, Registries, SceneId,
    SceneRecord, SlotTable,
};
use crate::relay::{RelayConnection, RelayId, RelaySendError, RelaySet};
use crate::source::{FeedState, SourceFeeder, UnderrunPolicy};
use context::{EffectEmission, EffectKind, RichMessage, SessionContext};

/// Tuning for the time gate.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Fraction of buffered time consumed per unit of caller time.
    pub consume_rate: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { consume_rate: 1.0 }
    }
}

/// A local mirror of a remote simulated world, advanced by interpreting an
/// ordered binary command stream at a controlled playback rate.
pub struct Session {
    ctx: SessionContext,
    registries: Registries,

    /// Commands received but not yet known to form a complete time-step.
    commands_pending: Vec<Vec<u8>>,
    /// Commands guaranteed complete, safe to execute.
    commands: VecDeque<Vec<u8>>,

    base_time: u64,
    target_base_time: f64,
    base_time_buffered: i64,
    consume_rate: f64,

    foreground_scene: Option<SceneId>,
    shutting_down: bool,

    relays: RelaySet,
}

impl Session {
    pub fn new(ctx: SessionContext, config: SessionConfig) -> Self {
        Self {
            ctx,
            registries: Registries::new(),
            commands_pending: Vec::new(),
            commands: VecDeque::new(),
            base_time: 0,
            target_base_time: 0.0,
            base_time_buffered: 0,
            consume_rate: config.consume_rate,
            foreground_scene: None,
            shutting_down: false,
            relays: RelaySet::new(),
        }
    }

    pub fn registries(&self) -> &Registries {
        &self.registries
    }

    /// Elapsed local simulation time, in milliseconds of applied steps.
    pub fn base_time(&self) -> u64 {
        self.base_time
    }

    pub fn target_base_time(&self) -> f64 {
        self.target_base_time
    }

    /// Stepped time received but not yet consumed.
    pub fn buffered_time(&self) -> i64 {
        self.base_time_buffered
    }

    pub fn ready_command_count(&self) -> usize {
        self.commands.len()
    }

    pub fn pending_command_count(&self) -> usize {
        self.commands_pending.len()
    }

    pub fn foreground_scene(&self) -> Option<SceneId> {
        self.foreground_scene
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down
    }

    pub fn set_consume_rate(&mut self, rate: f64) {
        self.consume_rate = rate;
    }

    pub fn relay_count(&self) -> usize {
        self.relays.len()
    }

    /// Advances playback by `time_advance`, catching any stream error: the
    /// error is logged, announced through the event sink, and the session
    /// terminates. There is no per-command retry; a desynchronized
    /// protocol stream is unrecoverable.
    pub fn update(&mut self, time_advance: u32, source: &mut dyn SourceFeeder) {
        if let Err(err) = self.try_update(time_advance, source) {
            let description = err.to_string();
            error!("session error: {description}");
            self.ctx.events.session_error(&description);
            self.end();
        }
    }

    /// Advances playback by `time_advance`, returning the first stream
    /// error instead of terminating. [`Session::update`] is the
    /// terminate-on-error wrapper.
    pub fn try_update(
        &mut self,
        time_advance: u32,
        source: &mut dyn SourceFeeder,
    ) -> Result<(), SessionError> {
        if self.shutting_down {
            return Ok(());
        }

        // Allow the source to modulate speed before the gate accumulates.
        let advance = source.scale_time_advance(time_advance);
        self.target_base_time += advance as f64 * self.consume_rate;

        // Read and run all events up to our target time.
        while (self.base_time as f64) < self.target_base_time {
            if self.commands.is_empty() {
                self.pump_source(source)?;
            }

            let Some(command) = self.commands.pop_front() else {
                // Underrun: replays pause until more data comes in; live
                // relays may soldier on and skip ahead.
                match source.underrun_policy() {
                    UnderrunPolicy::Pause => self.target_base_time = self.base_time as f64,
                    UnderrunPolicy::SkipAhead => {}
                }
                return Ok(());
            };

            self.dispatch(&command, source)?;

            if self.shutting_down {
                return Ok(());
            }
        }

        Ok(())
    }

    /// Keeps pulling messages from the source until the ready queue has
    /// something to execute or the source has nothing more to give.
    fn pump_source(&mut self, source: &mut dyn SourceFeeder) -> Result<(), SessionError> {
        while self.commands.is_empty() {
            match source.next_message()? {
                FeedState::Message(message) => self.handle_session_message(&message)?,
                FeedState::Idle => break,
                FeedState::EndOfStream => {
                    // Synthesize the sentinel so playback finalizes
                    // deterministically instead of stalling. Bypasses the
                    // pending list: it must run even mid-step.
                    self.commands.push_back(encode::end_of_file());
                    break;
                }
            }
        }
        Ok(())
    }

    /// Handles one session message envelope, from either transport or
    /// replay. `Commands` and `DynamicsCorrection` envelopes are forwarded
    /// verbatim to attached relays; a reset notifies them through
    /// [`Session::reset`] itself.
    pub fn handle_session_message(&mut self, message: &[u8]) -> Result<(), SessionError> {
        if self.shutting_down {
            return Ok(());
        }
        let Some(&kind_byte) = message.first() else {
            return Err(ProtocolError::EmptyCommand.into());
        };
        let kind = MessageKind::from_u8(kind_byte)
            .ok_or(ProtocolError::UnknownMessageKind(kind_byte, message.len()))?;

        match kind {
            MessageKind::Reset => {
                self.reset();
            }
            MessageKind::Commands => {
                self.relays.broadcast(message);
                // Repeated {u16 len}{len bytes} sub-records until the
                // envelope is exhausted.
                let mut offset = 1usize;
                while offset < message.len() {
                    if offset + 2 > message.len() {
                        return Err(CorruptionError::EnvelopeTruncated.into());
                    }
                    let size = u16::from_le_bytes([message[offset], message[offset + 1]]) as usize;
                    offset += 2;
                    if offset + size > message.len() {
                        return Err(CorruptionError::EnvelopeTruncated.into());
                    }
                    self.add_command(message[offset..offset + size].to_vec());
                    offset += size;
                }
            }
            MessageKind::DynamicsCorrection => {
                self.relays.broadcast(message);
                // Queue verbatim, with the envelope kind byte rewritten to
                // the correction opcode.
                let mut command = message.to_vec();
                command[0] = SessionCommand::DynamicsCorrection as u8;
                self.add_command(command);
            }
        }
        Ok(())
    }

    /// Queues a single command. Commands accumulate on the pending list
    /// until a step-advance command arrives; only then does the whole
    /// batch move to the ready list, so collaborators never observe a
    /// partially-applied step.
    fn add_command(&mut self, command: Vec<u8>) {
        let is_step = command.first() == Some(&(SessionCommand::BaseTimeStep as u8));
        if is_step && command.len() >= 5 {
            let step = i32::from_le_bytes([command[1], command[2], command[3], command[4]]);
            if step > 0 {
                self.base_time_buffered += step as i64;
            }
        }
        self.commands_pending.push(command);
        if is_step {
            self.commands.extend(self.commands_pending.drain(..));
        }
    }

    /// Full session reset: registries cleared wholesale, queues dropped,
    /// time counters zeroed, attached relays told to reset.
    pub fn reset(&mut self) {
        self.clear_session_objs();
        self.base_time = 0;
        self.target_base_time = 0.0;
        self.relays.broadcast(&encode::reset_message());
    }

    fn clear_session_objs(&mut self) {
        self.registries.clear();
        self.commands_pending.clear();
        self.commands.clear();
        self.base_time_buffered = 0;
        self.foreground_scene = None;
    }

    /// Transitions to the shutting-down state exactly once. Further ticks
    /// are no-ops and further commands are dropped; relays are told to
    /// reset and unregistered.
    pub fn end(&mut self) {
        if self.shutting_down {
            return;
        }
        self.shutting_down = true;
        self.relays.broadcast(&encode::reset_message());
        self.relays.clear();
        self.clear_session_objs();
    }

    /// Attaches a downstream relay: sends a full-state bootstrap followed
    /// by unblended correction messages, then registers the connection for
    /// verbatim forwarding. A failed send drops the connection.
    pub fn attach_relay(
        &mut self,
        mut connection: Box<dyn RelayConnection>,
    ) -> Result<RelayId, RelaySendError> {
        let commands = self.dump_full_state();
        if !commands.is_empty() {
            connection.send_reliable(&encode::commands_envelope(&commands))?;
        }
        for message in self.correction_messages(false) {
            connection.send_reliable(&message)?;
        }
        Ok(self.relays.attach(connection))
    }

    pub fn detach_relay(&mut self, id: RelayId) -> bool {
        self.relays.detach(id)
    }

    fn dispatch(
        &mut self,
        buffer: &[u8],
        source: &mut dyn SourceFeeder,
    ) -> Result<(), SessionError> {
        let mut reader = ByteReader::new(buffer);
        let opcode = SessionCommand::try_from(reader.read_u8()?)?;

        match opcode {
            SessionCommand::BaseTimeStep => {
                let step = reader.read_i32()?;
                if step <= 0 {
                    return Err(CorruptionError::NonPositiveStep(step).into());
                }
                if step > MAX_STEP_SIZE {
                    return Err(CorruptionError::StepSizeTooLarge(step).into());
                }
                self.base_time_buffered -= step as i64;
                if self.base_time_buffered < 0 {
                    return Err(CorruptionError::BufferedTimeUnderflow.into());
                }
                self.base_time += step as u64;
            }
            SessionCommand::StepSceneGraph => {
                let id = reader.read_i32()?;
                self.registries.scenes.get_mut(id)?.steps += 1;
                self.ctx.events.scene_stepped(id as SceneId);
            }
            SessionCommand::AddSceneGraph => {
                let [id, start_time] = reader.read_i32_2()?;
                self.registries.scenes.insert(
                    id,
                    SceneRecord {
                        start_time,
                        steps: 0,
                    },
                )?;
            }
            SessionCommand::RemoveSceneGraph => {
                let id = reader.read_i32()?;
                self.remove_scene(id)?;
            }
            SessionCommand::AddNode => {
                let [scene, type_id, id] = reader.read_i32_3()?;
                self.registries.scenes.get(scene)?;
                if !self.ctx.node_types.contains(type_id) {
                    return Err(ProtocolError::UnknownNodeType(type_id).into());
                }
                self.registries.nodes.insert(
                    id,
                    NodeRecord {
                        scene: scene as SceneId,
                        type_id,
                        attrs: Default::default(),
                        connections: Vec::new(),
                    },
                )?;
                self.ctx
                    .events
                    .node_added(id as u32, scene as SceneId, type_id);
            }
            SessionCommand::RemoveNode => {
                let id = reader.read_i32()?;
                let record = self.registries.remove_node(id)?;
                self.ctx.events.node_removed(id as u32, record.scene);
            }
            SessionCommand::NodeOnCreate => {
                let id = reader.read_i32()?;
                self.registries.nodes.get(id)?;
                self.ctx.events.node_on_create(id as u32);
            }
            SessionCommand::SetForegroundSceneGraph => {
                let id = reader.read_i32()?;
                self.registries.scenes.get(id)?;
                self.foreground_scene = Some(id as SceneId);
                self.ctx.events.foreground_scene_changed(id as SceneId);
            }
            SessionCommand::NodeMessage => {
                let [node, size] = reader.read_i32_2()?;
                self.registries.nodes.get(node)?;
                if size < 1 || size > MAX_BLOB_SIZE {
                    return Err(ProtocolError::InvalidBlobSize {
                        kind: "node message",
                        size,
                    }
                    .into());
                }
                let message = reader.read_bytes(size as usize)?;
                self.ctx.events.node_message(node as u32, message);
            }
            SessionCommand::ConnectNodeAttribute => {
                let [src, src_attr, dst, dst_attr] = reader.read_i32_4()?;
                self.registries.nodes.get(dst)?;
                let src_record = self.registries.nodes.get_mut(src)?;
                src_record.connections.push(AttrConnection {
                    src_attr: src_attr as u32,
                    dst_node: dst as u32,
                    dst_attr: dst_attr as u32,
                });
                self.ctx.events.attrs_connected(
                    src as u32,
                    src_attr as u32,
                    dst as u32,
                    dst_attr as u32,
                );
            }
            SessionCommand::AddMaterial => {
                let [scene, id] = reader.read_i32_2()?;
                self.registries.scenes.get(scene)?;
                self.registries.materials.insert(
                    id,
                    MaterialRecord {
                        scene: scene as SceneId,
                        components: Vec::new(),
                    },
                )?;
            }
            SessionCommand::RemoveMaterial => {
                let id = reader.read_i32()?;
                self.registries.materials.remove(id)?;
            }
            SessionCommand::AddMaterialComponent => {
                let [material, size] = reader.read_i32_2()?;
                if size < 1 || size > MAX_BLOB_SIZE {
                    return Err(ProtocolError::InvalidBlobSize {
                        kind: "material component",
                        size,
                    }
                    .into());
                }
                let component = reader.read_bytes(size as usize)?.to_vec();
                self.registries
                    .materials
                    .get_mut(material)?
                    .components
                    .push(component);
            }
            SessionCommand::AddTexture => self.add_asset(&mut reader, |r| &mut r.textures)?,
            SessionCommand::RemoveTexture => {
                let id = reader.read_i32()?;
                self.registries.textures.remove(id)?;
            }
            SessionCommand::AddMesh => self.add_asset(&mut reader, |r| &mut r.meshes)?,
            SessionCommand::RemoveMesh => {
                let id = reader.read_i32()?;
                self.registries.meshes.remove(id)?;
            }
            SessionCommand::AddSound => self.add_asset(&mut reader, |r| &mut r.sounds)?,
            SessionCommand::RemoveSound => {
                let id = reader.read_i32()?;
                self.registries.sounds.remove(id)?;
            }
            SessionCommand::AddCollider => self.add_asset(&mut reader, |r| &mut r.colliders)?,
            SessionCommand::RemoveCollider => {
                let id = reader.read_i32()?;
                self.registries.colliders.remove(id)?;
            }
            SessionCommand::SetNodeAttrFloat => {
                let [node, attr] = reader.read_i32_2()?;
                let value = AttrValue::Float(reader.read_f32()?);
                self.set_attr(node, attr, value)?;
            }
            SessionCommand::SetNodeAttrInt => {
                // 64 bit ints locally, 32 bit over the wire.
                let [node, attr, value] = reader.read_i32_3()?;
                self.set_attr(node, attr, AttrValue::Int(value as i64))?;
            }
            SessionCommand::SetNodeAttrBool => {
                let [node, attr, value] = reader.read_i32_3()?;
                self.set_attr(node, attr, AttrValue::Bool(value != 0))?;
            }
            SessionCommand::SetNodeAttrFloats => {
                let [node, attr, count] = reader.read_i32_3()?;
                let count = Self::check_array_size(count)?;
                let values = reader.read_f32s(count)?;
                self.set_attr(node, attr, AttrValue::Floats(values))?;
            }
            SessionCommand::SetNodeAttrInts => {
                let [node, attr, count] = reader.read_i32_3()?;
                let count = Self::check_array_size(count)?;
                let values = reader.read_i32s(count)?;
                self.set_attr(
                    node,
                    attr,
                    AttrValue::Ints(values.into_iter().map(|v| v as i64).collect()),
                )?;
            }
            SessionCommand::SetNodeAttrString => {
                let [node, attr] = reader.read_i32_2()?;
                let value = AttrValue::String(reader.read_string()?);
                self.set_attr(node, attr, value)?;
            }
            SessionCommand::SetNodeAttrNode => {
                let [node, attr, target] = reader.read_i32_3()?;
                self.registries.nodes.get(target)?;
                self.set_attr(node, attr, AttrValue::Node(Some(target as u32)))?;
            }
            SessionCommand::SetNodeAttrNodeNull => {
                let [node, attr] = reader.read_i32_2()?;
                self.set_attr(node, attr, AttrValue::Node(None))?;
            }
            SessionCommand::SetNodeAttrNodes => {
                let [node, attr, count] = reader.read_i32_3()?;
                let ids = self.read_ref_array(&mut reader, count, |r| &r.nodes)?;
                self.set_attr(node, attr, AttrValue::Nodes(ids))?;
            }
            SessionCommand::SetNodeAttrTexture => {
                let [node, attr, target] = reader.read_i32_3()?;
                self.registries.textures.get(target)?;
                self.set_attr(node, attr, AttrValue::Texture(Some(target as u32)))?;
            }
            SessionCommand::SetNodeAttrTextureNull => {
                let [node, attr] = reader.read_i32_2()?;
                self.set_attr(node, attr, AttrValue::Texture(None))?;
            }
            SessionCommand::SetNodeAttrTextures => {
                let [node, attr, count] = reader.read_i32_3()?;
                let ids = self.read_ref_array(&mut reader, count, |r| &r.textures)?;
                self.set_attr(node, attr, AttrValue::Textures(ids))?;
            }
            SessionCommand::SetNodeAttrMesh => {
                let [node, attr, target] = reader.read_i32_3()?;
                self.registries.meshes.get(target)?;
                self.set_attr(node, attr, AttrValue::Mesh(Some(target as u32)))?;
            }
            SessionCommand::SetNodeAttrMeshNull => {
                let [node, attr] = reader.read_i32_2()?;
                self.set_attr(node, attr, AttrValue::Mesh(None))?;
            }
            SessionCommand::SetNodeAttrMeshes => {
                let [node, attr, count] = reader.read_i32_3()?;
                let ids = self.read_ref_array(&mut reader, count, |r| &r.meshes)?;
                self.set_attr(node, attr, AttrValue::Meshes(ids))?;
            }
            SessionCommand::SetNodeAttrSound => {
                let [node, attr, target] = reader.read_i32_3()?;
                self.registries.sounds.get(target)?;
                self.set_attr(node, attr, AttrValue::Sound(Some(target as u32)))?;
            }
            SessionCommand::SetNodeAttrSoundNull => {
                let [node, attr] = reader.read_i32_2()?;
                self.set_attr(node, attr, AttrValue::Sound(None))?;
            }
            SessionCommand::SetNodeAttrSounds => {
                let [node, attr, count] = reader.read_i32_3()?;
                let ids = self.read_ref_array(&mut reader, count, |r| &r.sounds)?;
                self.set_attr(node, attr, AttrValue::Sounds(ids))?;
            }
            SessionCommand::SetNodeAttrCollider => {
                let [node, attr, target] = reader.read_i32_3()?;
                self.registries.colliders.get(target)?;
                self.set_attr(node, attr, AttrValue::Collider(Some(target as u32)))?;
            }
            SessionCommand::SetNodeAttrColliderNull => {
                let [node, attr] = reader.read_i32_2()?;
                self.set_attr(node, attr, AttrValue::Collider(None))?;
            }
            SessionCommand::SetNodeAttrColliders => {
                let [node, attr, count] = reader.read_i32_3()?;
                let ids = self.read_ref_array(&mut reader, count, |r| &r.colliders)?;
                self.set_attr(node, attr, AttrValue::Colliders(ids))?;
            }
            SessionCommand::SetNodeAttrMaterials => {
                let [node, attr, count] = reader.read_i32_3()?;
                let ids = self.read_ref_array(&mut reader, count, |r| &r.materials)?;
                self.set_attr(node, attr, AttrValue::Materials(ids))?;
            }
            SessionCommand::PlaySound => {
                let id = reader.read_i32()?;
                self.registries.sounds.get(id)?;
                let volume = reader.read_f32()?;
                self.ctx.events.play_sound(id as u32, volume);
            }
            SessionCommand::PlaySoundAtPosition => {
                let id = reader.read_i32()?;
                self.registries.sounds.get(id)?;
                let volume = reader.read_f32()?;
                let position = reader.read_f32_3()?;
                self.ctx
                    .events
                    .play_sound_at_position(id as u32, volume, position);
            }
            SessionCommand::ScreenMessage => {
                let text = reader.read_string()?;
                let color = reader.read_f32_3()?;
                self.ctx.events.screen_message(&text, color);
            }
            SessionCommand::ScreenMessageRich => {
                let [texture, tint_texture] = reader.read_i32_2()?;
                self.registries.textures.get(texture)?;
                self.registries.textures.get(tint_texture)?;
                let text = reader.read_string()?;
                let color = reader.read_f32_3()?;
                let tint = reader.read_f32_3()?;
                let tint2 = reader.read_f32_3()?;
                self.ctx.events.screen_message_rich(&RichMessage {
                    texture: texture as u32,
                    tint_texture: tint_texture as u32,
                    text,
                    color,
                    tint,
                    tint2,
                });
            }
            SessionCommand::EmitEffect => {
                let [kind, count, chunk_type, tendril_type] = reader.read_i32_4()?;
                let position = reader.read_f32_3()?;
                let velocity = reader.read_f32_3()?;
                let scale = reader.read_f32()?;
                let spread = reader.read_f32()?;
                self.ctx.events.emit_effect(&EffectEmission {
                    kind: EffectKind::try_from(kind)?,
                    count,
                    chunk_type,
                    tendril_type,
                    position,
                    velocity,
                    scale,
                    spread,
                });
            }
            SessionCommand::DynamicsCorrection => {
                correction::apply(&mut reader, &self.registries, self.ctx.physics.as_mut())?;
            }
            SessionCommand::EndOfFile => {
                // EOF can happen anytime; expect any state. Reset and let
                // the source rewind.
                self.reset();
                source.on_session_reset(true)?;
            }
        }

        // Verification: a fully decoded command should land exactly on the
        // buffer end. A mismatch is a protocol/logic bug; report it but
        // keep going.
        if cfg!(debug_assertions) && reader.remaining() != 0 {
            warn!(
                "size error for command {}: expected {} bytes, decoded {}",
                opcode as u8,
                buffer.len(),
                reader.position()
            );
        }

        Ok(())
    }

    fn check_array_size(count: i32) -> Result<usize, SessionError> {
        if !(0..=MAX_ARRAY_SIZE).contains(&count) {
            return Err(ProtocolError::InvalidArraySize(count).into());
        }
        Ok(count as usize)
    }

    /// Reads a count-prefixed id array, validating each id against the
    /// given registry table.
    fn read_ref_array<T>(
        &self,
        reader: &mut ByteReader,
        count: i32,
        table: impl Fn(&Registries) -> &SlotTable<T>,
    ) -> Result<Vec<u32>, SessionError> {
        let count = Self::check_array_size(count)?;
        let raw = reader.read_i32s(count)?;
        let table = table(&self.registries);
        let mut ids = Vec::with_capacity(count);
        for id in raw {
            table.get(id)?;
            ids.push(id as u32);
        }
        Ok(ids)
    }

    fn add_asset(
        &mut self,
        reader: &mut ByteReader,
        table: impl Fn(&mut Registries) -> &mut SlotTable<AssetRecord>,
    ) -> Result<(), SessionError> {
        let [scene, id] = reader.read_i32_2()?;
        let name = reader.read_string()?;
        self.registries.scenes.get(scene)?;
        table(&mut self.registries).insert(
            id,
            AssetRecord {
                scene: scene as SceneId,
                name,
            },
        )?;
        Ok(())
    }

    fn set_attr(&mut self, node: i32, attr: i32, value: AttrValue) -> Result<(), SessionError> {
        let record = self.registries.nodes.get_mut(node)?;
        record.attrs.insert(attr as u32, value.clone());
        self.ctx.events.attr_changed(node as u32, attr as u32, &value);
        Ok(())
    }

    /// Removes a scene and everything registered within it: its nodes
    /// (severing their connections), materials, and assets.
    fn remove_scene(&mut self, id: i32) -> Result<(), SessionError> {
        self.registries.scenes.remove(id)?;
        let scene = id as SceneId;

        let node_ids: Vec<u32> = self
            .registries
            .nodes
            .iter()
            .filter(|(_, n)| n.scene == scene)
            .map(|(id, _)| id)
            .collect();
        for node_id in node_ids {
            let record = self.registries.remove_node(node_id as i32)?;
            self.ctx.events.node_removed(node_id, record.scene);
        }

        let purge = |table: &mut SlotTable<AssetRecord>| {
            let ids: Vec<u32> = table
                .iter()
                .filter(|(_, a)| a.scene == scene)
                .map(|(id, _)| id)
                .collect();
            for asset_id in ids {
                // Slot is known occupied; ignore the result.
                let _ = table.remove(asset_id as i32);
            }
        };
        purge(&mut self.registries.textures);
        purge(&mut self.registries.meshes);
        purge(&mut self.registries.sounds);
        purge(&mut self.registries.colliders);

        let material_ids: Vec<u32> = self
            .registries
            .materials
            .iter()
            .filter(|(_, m)| m.scene == scene)
            .map(|(id, _)| id)
            .collect();
        for material_id in material_ids {
            let _ = self.registries.materials.remove(material_id as i32);
        }

        if self.foreground_scene == Some(scene) {
            self.foreground_scene = None;
        }
        Ok(())
    }
}
