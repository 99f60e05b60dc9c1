//! Physics correction packets: applying authoritative body snapshots from
//! the stream and encoding the local bodies back out for relays.
//!
//! A correction is tolerant of unknown nodes and bodies by design; entity
//! lifetimes on the two ends are never perfectly aligned, so an id we do
//! not know is skipped using the declared length, not treated as an error.
//! Length disagreements for a body we DO know are fatal.

use crate::error::{CorruptionError, SessionError};
use crate::protocol::reader::ByteReader;
use crate::protocol::writer::ByteWriter;
use crate::protocol::{SessionCommand, CORRECTION_HEADER_SIZE};
use crate::registry::Registries;
use crate::session::context::PhysicsSync;

/// Applies one correction packet. The opcode byte has already been
/// consumed by the dispatcher; the cursor sits on the blend flag.
pub(crate) fn apply(
    reader: &mut ByteReader,
    registries: &Registries,
    physics: &mut dyn PhysicsSync,
) -> Result<(), SessionError> {
    let blend = reader.read_u8()? != 0;
    let node_count = reader.read_u16()?;

    for _ in 0..node_count {
        let node_id = reader.read_u32()?;
        let body_count = reader.read_u8()?;
        let known = registries.nodes.contains(node_id);

        for _ in 0..body_count {
            let body = reader.read_u8()?;
            let declared = reader.read_u16()?;
            let data = reader.read_bytes(declared as usize)?;
            if !known {
                continue;
            }

            // Capture the pre-correction position so a blended apply can
            // hand the discontinuity to the smoothing offset instead of
            // snapping.
            let old_position = physics.body_position(node_id, body);
            match physics.apply_body_state(node_id, body, data) {
                Some(consumed) => {
                    if consumed != declared as usize {
                        return Err(CorruptionError::BodyStateLengthMismatch {
                            declared,
                            consumed,
                        }
                        .into());
                    }
                    if blend {
                        if let (Some(old), Some(new)) =
                            (old_position, physics.body_position(node_id, body))
                        {
                            physics.add_blend_offset(
                                node_id,
                                body,
                                [old[0] - new[0], old[1] - new[1], old[2] - new[2]],
                            );
                        }
                    }
                }
                // The node exists here but has no such body; the declared
                // length already carried us past its payload.
                None => {}
            }
        }

        let resync_len = reader.read_u16()?;
        let resync = reader.read_bytes(resync_len as usize)?;
        if known && resync_len > 0 {
            physics.apply_resync_data(node_id, resync);
        }
    }

    // A correction packet is self-delimiting; anything left over means the
    // two ends disagree about its layout.
    if reader.remaining() != 0 {
        return Err(CorruptionError::CorrectionTrailingBytes {
            trailing: reader.remaining(),
        }
        .into());
    }
    Ok(())
}

/// Encodes a correction command covering every node in `scene`, or `None`
/// if no node contributed any data. Used by the relay bootstrap.
pub(crate) fn encode_scene(
    scene: u32,
    registries: &Registries,
    physics: &dyn PhysicsSync,
    blend: bool,
) -> Option<Vec<u8>> {
    let mut w = ByteWriter::new();
    w.write_u8(SessionCommand::DynamicsCorrection as u8);
    w.write_u8(blend as u8);

    let mut node_count: u16 = 0;
    let mut body = ByteWriter::new();
    for (node_id, record) in registries.nodes.iter() {
        if record.scene != scene {
            continue;
        }
        let bodies = physics.body_count(node_id);
        if bodies == 0 {
            continue;
        }
        body.write_u32(node_id);
        body.write_u8(bodies);
        for body_idx in 0..bodies {
            let state = physics.extract_body_state(node_id, body_idx);
            body.write_u8(body_idx);
            debug_assert!(state.len() <= u16::MAX as usize);
            body.write_u16(state.len() as u16);
            body.write_bytes(&state);
        }
        // No per-node resync payload on the encode side.
        body.write_u16(0);
        node_count += 1;
    }

    w.write_u16(node_count);
    w.write_bytes(&body.to_bytes());
    let encoded = w.to_bytes();
    if encoded.len() <= CORRECTION_HEADER_SIZE {
        return None;
    }
    Some(encoded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{NodeRecord, SceneRecord};
    use crate::session::context::NullPhysicsSync;
    use std::collections::BTreeMap;

    struct OneBody {
        position: [f32; 3],
        blend_offsets: Vec<[f32; 3]>,
    }

    impl PhysicsSync for OneBody {
        fn body_position(&self, _node: u32, _body: u8) -> Option<[f32; 3]> {
            Some(self.position)
        }

        fn apply_body_state(&mut self, _node: u32, _body: u8, data: &[u8]) -> Option<usize> {
            let mut r = ByteReader::new(data);
            self.position = r.read_f32_3().ok()?;
            Some(r.position())
        }

        fn add_blend_offset(&mut self, _node: u32, _body: u8, delta: [f32; 3]) {
            self.blend_offsets.push(delta);
        }
    }

    fn registries_with_node(id: i32) -> Registries {
        let mut regs = Registries::new();
        regs.scenes
            .insert(0, SceneRecord { start_time: 0, steps: 0 })
            .unwrap();
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
        regs
    }

    fn correction_packet(node: u32, blend: bool, position: [f32; 3]) -> Vec<u8> {
        let mut w = ByteWriter::new();
        w.write_u8(blend as u8);
        w.write_u16(1);
        w.write_u32(node);
        w.write_u8(1);
        w.write_u8(0);
        w.write_u16(12);
        w.write_f32s(&position);
        w.write_u16(0);
        w.to_bytes()
    }

    #[test]
    fn blended_apply_records_old_minus_new() {
        let regs = registries_with_node(4);
        let mut physics = OneBody {
            position: [10.0, 0.0, 2.0],
            blend_offsets: Vec::new(),
        };
        let packet = correction_packet(4, true, [7.0, 1.0, 2.0]);
        apply(&mut ByteReader::new(&packet), &regs, &mut physics).unwrap();
        assert_eq!(physics.position, [7.0, 1.0, 2.0]);
        assert_eq!(physics.blend_offsets, vec![[3.0, -1.0, 0.0]]);
    }

    #[test]
    fn unblended_apply_snaps_without_offset() {
        let regs = registries_with_node(4);
        let mut physics = OneBody {
            position: [10.0, 0.0, 2.0],
            blend_offsets: Vec::new(),
        };
        let packet = correction_packet(4, false, [7.0, 1.0, 2.0]);
        apply(&mut ByteReader::new(&packet), &regs, &mut physics).unwrap();
        assert_eq!(physics.position, [7.0, 1.0, 2.0]);
        assert!(physics.blend_offsets.is_empty());
    }

    #[test]
    fn unknown_node_is_skipped_cleanly() {
        let regs = Registries::new();
        let mut physics = NullPhysicsSync;
        let packet = correction_packet(99, true, [1.0, 2.0, 3.0]);
        apply(&mut ByteReader::new(&packet), &regs, &mut physics).unwrap();
    }

    #[test]
    fn declared_consumed_mismatch_is_fatal() {
        let regs = registries_with_node(4);
        let mut physics = OneBody {
            position: [0.0; 3],
            blend_offsets: Vec::new(),
        };
        // Declare 16 bytes; OneBody consumes only 12.
        let mut w = ByteWriter::new();
        w.write_u8(0);
        w.write_u16(1);
        w.write_u32(4);
        w.write_u8(1);
        w.write_u8(0);
        w.write_u16(16);
        w.write_f32s(&[1.0, 2.0, 3.0, 4.0]);
        w.write_u16(0);
        let packet = w.to_bytes();
        let err = apply(&mut ByteReader::new(&packet), &regs, &mut physics).unwrap_err();
        assert!(matches!(
            err,
            SessionError::Corruption(CorruptionError::BodyStateLengthMismatch {
                declared: 16,
                consumed: 12
            })
        ));
    }

    struct ExtractableBody {
        position: [f32; 3],
    }

    impl PhysicsSync for ExtractableBody {
        fn body_position(&self, _node: u32, _body: u8) -> Option<[f32; 3]> {
            Some(self.position)
        }

        fn apply_body_state(&mut self, _node: u32, _body: u8, data: &[u8]) -> Option<usize> {
            let mut r = ByteReader::new(data);
            self.position = r.read_f32_3().ok()?;
            Some(r.position())
        }

        fn body_count(&self, _node: u32) -> u8 {
            1
        }

        fn extract_body_state(&self, _node: u32, _body: u8) -> Vec<u8> {
            let mut w = ByteWriter::new();
            w.write_f32s(&self.position);
            w.to_bytes()
        }
    }

    #[test]
    fn encoded_scene_applies_on_another_end() {
        let regs = registries_with_node(4);
        let source = ExtractableBody {
            position: [1.0, 2.0, 3.0],
        };
        let command = encode_scene(0, &regs, &source, false).expect("node has a body");
        assert_eq!(command[0], SessionCommand::DynamicsCorrection as u8);

        let mut dest = ExtractableBody { position: [0.0; 3] };
        // Skip the opcode byte, as the dispatcher would.
        apply(&mut ByteReader::new(&command[1..]), &regs, &mut dest).unwrap();
        assert_eq!(dest.position, [1.0, 2.0, 3.0]);
    }

    #[test]
    fn scene_without_bodies_encodes_nothing() {
        let regs = registries_with_node(4);
        assert!(encode_scene(0, &regs, &NullPhysicsSync, false).is_none());
    }

    #[test]
    fn trailing_bytes_are_fatal() {
        let regs = Registries::new();
        let mut physics = NullPhysicsSync;
        let mut packet = correction_packet(99, false, [0.0; 3]);
        packet.push(0xff);
        let err = apply(&mut ByteReader::new(&packet), &regs, &mut physics).unwrap_err();
        assert!(matches!(
            err,
            SessionError::Corruption(CorruptionError::CorrectionTrailingBytes { trailing: 1 })
        ));
    }
}
