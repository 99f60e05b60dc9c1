//! Tests for session message handling, whole-step queueing, the time
//! gate, and command dispatch semantics.

use std::cell::RefCell;
use std::rc::Rc;

use scenecast::{
    encode, AttrValue, ByteWriter, CorruptionError, EffectEmission, EffectKind, EventSink,
    FeedState, IdleSource, MessageKind, ProtocolError, RichMessage, Session, SessionCommand,
    SessionConfig, SessionContext, SessionError, SourceFeeder, UnderrunPolicy,
};

// ========== Test Helpers ==========

#[derive(Debug, Clone, PartialEq)]
enum Event {
    NodeAdded(u32, u32, i32),
    NodeRemoved(u32),
    SceneStepped(u32),
    ScreenMessage(String),
    RichMessageShown(u32, String),
    SoundPlayed(u32, f32),
    SoundPlayedAt(u32, [f32; 3]),
    EffectEmitted(EffectKind, i32),
    SessionError(String),
}

#[derive(Clone, Default)]
struct Recorder {
    events: Rc<RefCell<Vec<Event>>>,
}

impl EventSink for Recorder {
    fn node_added(&mut self, node: u32, scene: u32, type_id: i32) {
        self.events
            .borrow_mut()
            .push(Event::NodeAdded(node, scene, type_id));
    }

    fn node_removed(&mut self, node: u32, _scene: u32) {
        self.events.borrow_mut().push(Event::NodeRemoved(node));
    }

    fn scene_stepped(&mut self, scene: u32) {
        self.events.borrow_mut().push(Event::SceneStepped(scene));
    }

    fn screen_message(&mut self, text: &str, _color: [f32; 3]) {
        self.events
            .borrow_mut()
            .push(Event::ScreenMessage(text.to_string()));
    }

    fn screen_message_rich(&mut self, message: &RichMessage) {
        self.events
            .borrow_mut()
            .push(Event::RichMessageShown(message.texture, message.text.clone()));
    }

    fn play_sound(&mut self, sound: u32, volume: f32) {
        self.events.borrow_mut().push(Event::SoundPlayed(sound, volume));
    }

    fn play_sound_at_position(&mut self, sound: u32, _volume: f32, position: [f32; 3]) {
        self.events
            .borrow_mut()
            .push(Event::SoundPlayedAt(sound, position));
    }

    fn emit_effect(&mut self, emission: &EffectEmission) {
        self.events
            .borrow_mut()
            .push(Event::EffectEmitted(emission.kind, emission.count));
    }

    fn session_error(&mut self, description: &str) {
        self.events
            .borrow_mut()
            .push(Event::SessionError(description.to_string()));
    }
}

fn recorded_session() -> (Session, Rc<RefCell<Vec<Event>>>) {
    let recorder = Recorder::default();
    let events = recorder.events.clone();
    let mut ctx = SessionContext::headless();
    ctx.events = Box::new(recorder);
    (Session::new(ctx, SessionConfig::default()), events)
}

fn feed(session: &mut Session, commands: &[Vec<u8>]) {
    session
        .handle_session_message(&encode::commands_envelope(commands))
        .unwrap();
}

/// A feeder that serves a scripted list of envelopes, then reports the
/// configured drained state (idle for a stalled live source, end of
/// stream for a finite one).
struct Scripted {
    messages: Vec<Vec<u8>>,
    drained: FeedState,
    policy: UnderrunPolicy,
    resets: usize,
}

impl Scripted {
    fn new(messages: Vec<Vec<u8>>, policy: UnderrunPolicy) -> Self {
        Self {
            messages,
            drained: FeedState::Idle,
            policy,
            resets: 0,
        }
    }

    fn finite(messages: Vec<Vec<u8>>, policy: UnderrunPolicy) -> Self {
        Self {
            drained: FeedState::EndOfStream,
            ..Self::new(messages, policy)
        }
    }
}

impl SourceFeeder for Scripted {
    fn next_message(&mut self) -> Result<FeedState, SessionError> {
        if self.messages.is_empty() {
            Ok(self.drained.clone())
        } else {
            Ok(FeedState::Message(self.messages.remove(0)))
        }
    }

    fn underrun_policy(&self) -> UnderrunPolicy {
        self.policy
    }

    fn on_session_reset(&mut self, _rewind: bool) -> Result<(), SessionError> {
        self.resets += 1;
        Ok(())
    }
}

// ========== Whole-Step Queueing ==========

#[test]
fn commands_stay_pending_until_a_time_step_arrives() {
    let (mut session, _) = recorded_session();

    feed(&mut session, &[encode::add_scene_graph(0, 0)]);
    assert_eq!(session.pending_command_count(), 1);
    assert_eq!(session.ready_command_count(), 0);

    // The step closes the batch; everything moves to the ready queue.
    feed(&mut session, &[encode::base_time_step(16)]);
    assert_eq!(session.pending_command_count(), 0);
    assert_eq!(session.ready_command_count(), 2);
    assert_eq!(session.buffered_time(), 16);
}

#[test]
fn basic_scene_construction_applies_on_update() {
    let (mut session, events) = recorded_session();
    feed(
        &mut session,
        &[
            encode::add_scene_graph(0, 0),
            encode::add_node(0, 5, 0),
            encode::base_time_step(16),
        ],
    );

    session.try_update(16, &mut IdleSource).unwrap();

    assert_eq!(session.base_time(), 16);
    assert_eq!(session.buffered_time(), 0);
    assert_eq!(session.ready_command_count(), 0);
    assert_eq!(session.registries().scenes.occupied_count(), 1);
    assert_eq!(session.registries().nodes.occupied_count(), 1);
    assert_eq!(events.borrow()[0], Event::NodeAdded(0, 0, 5));
}

#[test]
fn time_gate_holds_commands_past_the_step_boundary() {
    let (mut session, _) = recorded_session();
    feed(
        &mut session,
        &[
            encode::add_scene_graph(0, 0),
            encode::base_time_step(16),
            encode::add_node(0, 5, 0),
            encode::base_time_step(16),
        ],
    );

    // A small advance executes the first batch and the step carries
    // base_time past the target; the second batch waits.
    session.try_update(1, &mut IdleSource).unwrap();
    assert_eq!(session.base_time(), 16);
    assert_eq!(session.registries().scenes.occupied_count(), 1);
    assert_eq!(session.registries().nodes.occupied_count(), 0);

    session.try_update(1, &mut IdleSource).unwrap();
    assert_eq!(session.registries().nodes.occupied_count(), 0);

    // Catching up past the second step releases the second batch.
    session.try_update(20, &mut IdleSource).unwrap();
    assert_eq!(session.base_time(), 32);
    assert_eq!(session.registries().nodes.occupied_count(), 1);
}

#[test]
fn consume_rate_scales_the_target() {
    let (mut session, _) = recorded_session();
    session.set_consume_rate(2.0);
    feed(
        &mut session,
        &[encode::add_scene_graph(0, 0), encode::base_time_step(16)],
    );

    session.try_update(8, &mut IdleSource).unwrap();
    assert_eq!(session.base_time(), 16);
}

// ========== Dispatch Semantics ==========

#[test]
fn scene_step_and_removal() {
    let (mut session, events) = recorded_session();
    feed(
        &mut session,
        &[
            encode::add_scene_graph(1, 100),
            encode::add_node(1, 2, 3),
            encode::step_scene_graph(1),
            encode::remove_scene_graph(1),
            encode::base_time_step(1),
        ],
    );
    session.try_update(1, &mut IdleSource).unwrap();

    assert_eq!(session.registries().scenes.occupied_count(), 0);
    // Removing a scene takes its nodes with it.
    assert_eq!(session.registries().nodes.occupied_count(), 0);
    let events = events.borrow();
    assert!(events.contains(&Event::SceneStepped(1)));
    assert!(events.contains(&Event::NodeRemoved(3)));
}

#[test]
fn attribute_writes_are_cached_per_node() {
    let (mut session, _) = recorded_session();
    feed(
        &mut session,
        &[
            encode::add_scene_graph(0, 0),
            encode::add_node(0, 1, 0),
            encode::add_texture(0, 2, "crate_tex"),
            encode::set_node_attr_float(0, 4, 1.5),
            encode::set_node_attr_ref(scenecast::SessionCommand::SetNodeAttrTexture, 0, 7, 2),
            encode::base_time_step(1),
        ],
    );
    session.try_update(1, &mut IdleSource).unwrap();

    let node = session.registries().nodes.get(0).unwrap();
    assert_eq!(node.attrs.get(&4), Some(&AttrValue::Float(1.5)));
    assert_eq!(node.attrs.get(&7), Some(&AttrValue::Texture(Some(2))));
}

#[test]
fn sound_playback_reaches_the_sink() {
    let (mut session, events) = recorded_session();
    feed(
        &mut session,
        &[
            encode::add_scene_graph(0, 0),
            encode::add_sound(0, 1, "boom"),
            encode::play_sound(1, 0.5),
            encode::play_sound_at_position(1, 1.0, [4.0, 0.0, -2.0]),
            encode::base_time_step(1),
        ],
    );
    session.try_update(1, &mut IdleSource).unwrap();

    let events = events.borrow();
    assert!(events.contains(&Event::SoundPlayed(1, 0.5)));
    assert!(events.contains(&Event::SoundPlayedAt(1, [4.0, 0.0, -2.0])));
}

#[test]
fn playing_an_unregistered_sound_is_rejected() {
    let (mut session, _) = recorded_session();
    feed(
        &mut session,
        &[encode::play_sound(3, 1.0), encode::base_time_step(1)],
    );
    let err = session.try_update(1, &mut IdleSource).unwrap_err();
    assert!(matches!(
        err,
        SessionError::Protocol(ProtocolError::EmptySlot { kind: "sound", id: 3 })
    ));
}

#[test]
fn rich_screen_message_reaches_the_sink() {
    let (mut session, events) = recorded_session();
    feed(
        &mut session,
        &[
            encode::add_scene_graph(0, 0),
            encode::add_texture(0, 2, "card"),
            encode::add_texture(0, 3, "card_tint"),
            encode::screen_message_rich(
                2,
                3,
                "flag captured",
                [1.0, 1.0, 1.0],
                [0.2, 0.4, 0.8],
                [0.1, 0.1, 0.1],
            ),
            encode::base_time_step(1),
        ],
    );
    session.try_update(1, &mut IdleSource).unwrap();
    assert!(events
        .borrow()
        .contains(&Event::RichMessageShown(2, "flag captured".into())));
}

#[test]
fn effect_emission_reaches_the_sink() {
    let (mut session, events) = recorded_session();
    feed(
        &mut session,
        &[
            encode::emit_effect(&EffectEmission {
                kind: EffectKind::Tendrils,
                count: 12,
                chunk_type: 0,
                tendril_type: 1,
                position: [0.0, 5.0, 0.0],
                velocity: [0.0, -1.0, 0.0],
                scale: 1.0,
                spread: 0.5,
            }),
            encode::base_time_step(1),
        ],
    );
    session.try_update(1, &mut IdleSource).unwrap();
    assert!(events
        .borrow()
        .contains(&Event::EffectEmitted(EffectKind::Tendrils, 12)));
}

#[test]
fn unknown_effect_kind_is_rejected() {
    let (mut session, _) = recorded_session();
    let mut w = ByteWriter::new();
    w.write_u8(SessionCommand::EmitEffect as u8);
    w.write_i32(99);
    w.write_i32(1);
    w.write_i32(0);
    w.write_i32(0);
    w.write_f32s(&[0.0; 3]);
    w.write_f32s(&[0.0; 3]);
    w.write_f32(1.0);
    w.write_f32(0.0);
    feed(&mut session, &[w.to_bytes(), encode::base_time_step(1)]);

    let err = session.try_update(1, &mut IdleSource).unwrap_err();
    assert!(matches!(
        err,
        SessionError::Protocol(ProtocolError::UnknownEffectKind(99))
    ));
}

#[test]
fn screen_message_reaches_the_sink() {
    let (mut session, events) = recorded_session();
    feed(
        &mut session,
        &[
            encode::screen_message("hello there", [1.0, 0.5, 0.0]),
            encode::base_time_step(1),
        ],
    );
    session.try_update(1, &mut IdleSource).unwrap();
    assert!(events
        .borrow()
        .contains(&Event::ScreenMessage("hello there".into())));
}

// ========== Error Paths ==========

#[test]
fn unknown_opcode_is_a_protocol_error() {
    let (mut session, _) = recorded_session();
    feed(&mut session, &[vec![200u8], encode::base_time_step(1)]);

    let err = session.try_update(1, &mut IdleSource).unwrap_err();
    assert!(matches!(
        err,
        SessionError::Protocol(ProtocolError::UnknownCommand(200))
    ));
}

#[test]
fn node_into_missing_scene_is_rejected() {
    let (mut session, _) = recorded_session();
    feed(
        &mut session,
        &[encode::add_node(9, 1, 0), encode::base_time_step(1)],
    );

    let err = session.try_update(1, &mut IdleSource).unwrap_err();
    assert!(matches!(
        err,
        SessionError::Protocol(ProtocolError::EmptySlot { kind: "scene", id: 9 })
    ));
}

#[test]
fn scene_id_past_bound_is_rejected() {
    let (mut session, _) = recorded_session();
    feed(
        &mut session,
        &[encode::add_scene_graph(101, 0), encode::base_time_step(1)],
    );

    let err = session.try_update(1, &mut IdleSource).unwrap_err();
    assert!(matches!(
        err,
        SessionError::Protocol(ProtocolError::IdOutOfBounds {
            kind: "scene",
            id: 101,
            max: 100
        })
    ));
}

#[test]
fn zero_step_size_is_corruption() {
    let (mut session, _) = recorded_session();
    feed(&mut session, &[encode::base_time_step(0)]);

    let err = session.try_update(1, &mut IdleSource).unwrap_err();
    assert!(matches!(
        err,
        SessionError::Corruption(CorruptionError::NonPositiveStep(0))
    ));
}

#[test]
fn negative_step_size_is_corruption() {
    let (mut session, _) = recorded_session();
    feed(&mut session, &[encode::base_time_step(-16)]);

    let err = session.try_update(1, &mut IdleSource).unwrap_err();
    assert!(matches!(
        err,
        SessionError::Corruption(CorruptionError::NonPositiveStep(-16))
    ));
}

#[test]
fn implausibly_large_step_size_is_corruption() {
    let (mut session, _) = recorded_session();
    feed(&mut session, &[encode::base_time_step(10_001)]);

    let err = session.try_update(1, &mut IdleSource).unwrap_err();
    assert!(matches!(
        err,
        SessionError::Corruption(CorruptionError::StepSizeTooLarge(10_001))
    ));

    // The largest legal step is fine.
    let (mut session, _) = recorded_session();
    feed(&mut session, &[encode::base_time_step(10_000)]);
    session.try_update(10_000, &mut IdleSource).unwrap();
    assert_eq!(session.base_time(), 10_000);
}

#[test]
fn oversized_array_count_is_rejected() {
    let (mut session, _) = recorded_session();
    feed(
        &mut session,
        &[
            encode::set_node_attr_floats(0, 0, &vec![0.0; 1001]),
            encode::base_time_step(1),
        ],
    );

    let err = session.try_update(1, &mut IdleSource).unwrap_err();
    assert!(matches!(
        err,
        SessionError::Protocol(ProtocolError::InvalidArraySize(1001))
    ));
}

#[test]
fn empty_node_message_blob_is_rejected() {
    let (mut session, _) = recorded_session();
    feed(
        &mut session,
        &[
            encode::add_scene_graph(0, 0),
            encode::add_node(0, 1, 0),
            encode::node_message(0, &[]),
            encode::base_time_step(1),
        ],
    );

    let err = session.try_update(1, &mut IdleSource).unwrap_err();
    assert!(matches!(
        err,
        SessionError::Protocol(ProtocolError::InvalidBlobSize {
            kind: "node message",
            size: 0
        })
    ));
}

#[test]
fn oversized_material_component_blob_is_rejected() {
    let (mut session, _) = recorded_session();
    feed(
        &mut session,
        &[
            encode::add_scene_graph(0, 0),
            encode::add_material(0, 0),
            encode::add_material_component(0, &vec![7u8; 10_001]),
            encode::base_time_step(1),
        ],
    );

    let err = session.try_update(1, &mut IdleSource).unwrap_err();
    assert!(matches!(
        err,
        SessionError::Protocol(ProtocolError::InvalidBlobSize {
            kind: "material component",
            size: 10_001
        })
    ));
}

#[test]
fn empty_envelope_is_rejected() {
    let (mut session, _) = recorded_session();
    let err = session.handle_session_message(&[]).unwrap_err();
    assert!(matches!(
        err,
        SessionError::Protocol(ProtocolError::EmptyCommand)
    ));
}

#[test]
fn unknown_message_kind_is_rejected() {
    let (mut session, _) = recorded_session();
    let err = session.handle_session_message(&[99, 1, 2, 3]).unwrap_err();
    assert!(matches!(
        err,
        SessionError::Protocol(ProtocolError::UnknownMessageKind(99, 4))
    ));
}

#[test]
fn update_terminates_the_session_on_error() {
    let (mut session, events) = recorded_session();
    feed(&mut session, &[vec![200u8], encode::base_time_step(1)]);

    session.update(1, &mut IdleSource);

    assert!(session.is_shutting_down());
    assert!(events
        .borrow()
        .iter()
        .any(|e| matches!(e, Event::SessionError(_))));
    // Further ticks and messages are no-ops.
    session.update(100, &mut IdleSource);
    session
        .handle_session_message(&encode::commands_envelope(&[encode::add_scene_graph(0, 0)]))
        .unwrap();
    assert_eq!(session.pending_command_count(), 0);
}

// ========== Underrun Policies ==========

#[test]
fn pause_policy_clamps_the_target() {
    let (mut session, _) = recorded_session();
    let mut source = Scripted::new(Vec::new(), UnderrunPolicy::Pause);

    session.try_update(1000, &mut source).unwrap();
    assert_eq!(session.base_time(), 0);
    assert_eq!(session.target_base_time(), 0.0);

    // Once data arrives, playback resumes from here without skipping.
    feed(
        &mut session,
        &[encode::add_scene_graph(0, 0), encode::base_time_step(16)],
    );
    session.try_update(16, &mut source).unwrap();
    assert_eq!(session.base_time(), 16);
}

#[test]
fn skip_ahead_policy_keeps_the_target() {
    let (mut session, _) = recorded_session();
    let mut source = Scripted::new(Vec::new(), UnderrunPolicy::SkipAhead);

    session.try_update(1000, &mut source).unwrap();
    assert_eq!(session.target_base_time(), 1000.0);

    // The backlog drains in one tick when data shows up.
    feed(
        &mut session,
        &[
            encode::base_time_step(16),
            encode::base_time_step(16),
            encode::base_time_step(16),
        ],
    );
    session.try_update(0, &mut source).unwrap();
    assert_eq!(session.base_time(), 48);
}

// ========== Sources, Reset, End of Stream ==========

#[test]
fn scripted_source_feeds_through_the_tick() {
    let (mut session, _) = recorded_session();
    let mut source = Scripted::new(
        vec![encode::commands_envelope(&[
            encode::add_scene_graph(0, 0),
            encode::base_time_step(16),
        ])],
        UnderrunPolicy::Pause,
    );

    session.try_update(16, &mut source).unwrap();
    assert_eq!(session.base_time(), 16);
    assert_eq!(session.registries().scenes.occupied_count(), 1);
}

#[test]
fn reset_envelope_clears_everything() {
    let (mut session, _) = recorded_session();
    feed(
        &mut session,
        &[encode::add_scene_graph(0, 0), encode::base_time_step(16)],
    );
    session.try_update(16, &mut IdleSource).unwrap();
    assert_eq!(session.base_time(), 16);

    session.handle_session_message(&[MessageKind::Reset as u8]).unwrap();
    assert_eq!(session.base_time(), 0);
    assert_eq!(session.buffered_time(), 0);
    assert_eq!(session.registries().scenes.occupied_count(), 0);
    assert_eq!(session.ready_command_count(), 0);
}

#[test]
fn end_of_stream_resets_and_rewinds_the_source() {
    let (mut session, _) = recorded_session();
    let mut source = Scripted::finite(
        vec![encode::commands_envelope(&[
            encode::add_scene_graph(0, 0),
            encode::base_time_step(4),
        ])],
        UnderrunPolicy::SkipAhead,
    );

    session.try_update(4, &mut source).unwrap();
    assert_eq!(session.base_time(), 4);

    // Source exhausted: the synthesized end-of-file resets the session
    // and asks the source to rewind.
    session.try_update(100, &mut source).unwrap();
    assert_eq!(session.base_time(), 0);
    assert_eq!(session.registries().scenes.occupied_count(), 0);
    assert_eq!(source.resets, 1);
    assert!(!session.is_shutting_down());
}
