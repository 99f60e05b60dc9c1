//! Full-state serialization: re-expressing the current registries as the
//! command stream that would rebuild them. This is the relay bootstrap; a
//! fresh session fed the dump converges to an equivalent replica.

use crate::protocol::{encode, SessionCommand};
use crate::registry::AttrValue;
use crate::session::{correction, Session};

impl Session {
    /// Encodes every live object as commands, ordered so each command's
    /// referents already exist when it executes: scenes first, then
    /// materials and assets, then nodes with their attributes and
    /// connections, then material components.
    pub fn dump_full_state(&self) -> Vec<Vec<u8>> {
        let mut out = Vec::new();

        for (id, scene) in self.registries.scenes.iter() {
            out.push(encode::add_scene_graph(id, scene.start_time));
        }
        for (id, material) in self.registries.materials.iter() {
            out.push(encode::add_material(material.scene, id));
        }
        for (id, tex) in self.registries.textures.iter() {
            out.push(encode::add_texture(tex.scene, id, &tex.name));
        }
        for (id, mesh) in self.registries.meshes.iter() {
            out.push(encode::add_mesh(mesh.scene, id, &mesh.name));
        }
        for (id, sound) in self.registries.sounds.iter() {
            out.push(encode::add_sound(sound.scene, id, &sound.name));
        }
        for (id, collider) in self.registries.colliders.iter() {
            out.push(encode::add_collider(collider.scene, id, &collider.name));
        }

        // Nodes in two passes: create them all, then write attributes and
        // connections, since node-reference attributes can point at nodes
        // created later in id order.
        for (id, node) in self.registries.nodes.iter() {
            out.push(encode::add_node(node.scene, node.type_id, id));
        }
        for (id, node) in self.registries.nodes.iter() {
            for (&attr, value) in &node.attrs {
                out.push(encode_attr(id, attr, value));
            }
            for conn in &node.connections {
                out.push(encode::connect_node_attribute(
                    id,
                    conn.src_attr,
                    conn.dst_node,
                    conn.dst_attr,
                ));
            }
            out.push(encode::node_on_create(id));
        }

        for (id, material) in self.registries.materials.iter() {
            for component in &material.components {
                out.push(encode::add_material_component(id, component));
            }
        }

        if let Some(scene) = self.foreground_scene {
            out.push(encode::set_foreground_scene_graph(scene));
        }

        out
    }

    /// Encodes one correction command per scene with live bodies. With
    /// `blend` off the receiver snaps to these states; a bootstrap wants
    /// that, not smoothing from an unrelated starting pose.
    pub fn correction_messages(&self, blend: bool) -> Vec<Vec<u8>> {
        let mut out = Vec::new();
        for (scene, _) in self.registries.scenes.iter() {
            if let Some(command) =
                correction::encode_scene(scene, &self.registries, self.ctx.physics.as_ref(), blend)
            {
                // Corrections travel as their own envelope kind, not inside
                // a `Commands` batch.
                let mut message = command;
                message[0] = crate::protocol::MessageKind::DynamicsCorrection as u8;
                out.push(message);
            }
        }
        out
    }
}

fn encode_attr(node: u32, attr: u32, value: &AttrValue) -> Vec<u8> {
    use SessionCommand as Cmd;
    match value {
        AttrValue::Float(v) => encode::set_node_attr_float(node, attr, *v),
        AttrValue::Int(v) => encode::set_node_attr_int(node, attr, *v as i32),
        AttrValue::Bool(v) => encode::set_node_attr_bool(node, attr, *v),
        AttrValue::String(v) => encode::set_node_attr_string(node, attr, v),
        AttrValue::Floats(v) => encode::set_node_attr_floats(node, attr, v),
        AttrValue::Ints(v) => {
            let narrowed: Vec<i32> = v.iter().map(|&x| x as i32).collect();
            encode::set_node_attr_ints(node, attr, &narrowed)
        }
        AttrValue::Node(Some(id)) => encode::set_node_attr_ref(Cmd::SetNodeAttrNode, node, attr, *id),
        AttrValue::Node(None) => encode::set_node_attr_null(Cmd::SetNodeAttrNodeNull, node, attr),
        AttrValue::Nodes(ids) => encode::set_node_attr_refs(Cmd::SetNodeAttrNodes, node, attr, ids),
        AttrValue::Texture(Some(id)) => {
            encode::set_node_attr_ref(Cmd::SetNodeAttrTexture, node, attr, *id)
        }
        AttrValue::Texture(None) => {
            encode::set_node_attr_null(Cmd::SetNodeAttrTextureNull, node, attr)
        }
        AttrValue::Textures(ids) => {
            encode::set_node_attr_refs(Cmd::SetNodeAttrTextures, node, attr, ids)
        }
        AttrValue::Mesh(Some(id)) => encode::set_node_attr_ref(Cmd::SetNodeAttrMesh, node, attr, *id),
        AttrValue::Mesh(None) => encode::set_node_attr_null(Cmd::SetNodeAttrMeshNull, node, attr),
        AttrValue::Meshes(ids) => encode::set_node_attr_refs(Cmd::SetNodeAttrMeshes, node, attr, ids),
        AttrValue::Sound(Some(id)) => {
            encode::set_node_attr_ref(Cmd::SetNodeAttrSound, node, attr, *id)
        }
        AttrValue::Sound(None) => encode::set_node_attr_null(Cmd::SetNodeAttrSoundNull, node, attr),
        AttrValue::Sounds(ids) => encode::set_node_attr_refs(Cmd::SetNodeAttrSounds, node, attr, ids),
        AttrValue::Collider(Some(id)) => {
            encode::set_node_attr_ref(Cmd::SetNodeAttrCollider, node, attr, *id)
        }
        AttrValue::Collider(None) => {
            encode::set_node_attr_null(Cmd::SetNodeAttrColliderNull, node, attr)
        }
        AttrValue::Colliders(ids) => {
            encode::set_node_attr_refs(Cmd::SetNodeAttrColliders, node, attr, ids)
        }
        AttrValue::Materials(ids) => {
            encode::set_node_attr_refs(Cmd::SetNodeAttrMaterials, node, attr, ids)
        }
    }
}
