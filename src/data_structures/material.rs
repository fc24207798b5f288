//! Materials, cyclic material selection and pickable targets.

use crate::data_structures::scene_graph::{NodeId, SceneGraph};

/// Index of a material in the [`SceneGraph`]'s material library.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MaterialId(pub usize);

/// Surface description of a mesh.
///
/// `texture` names a texture resource. Until (and unless) that texture is
/// loaded, renderers fall back to `colour`.
#[derive(Clone, Debug, PartialEq)]
pub struct Material {
    pub name: String,
    pub colour: [f32; 3],
    pub texture: Option<String>,
    pub repeat: [f32; 2],
    pub double_sided: bool,
}

impl Material {
    pub fn new(name: impl Into<String>, colour: [f32; 3]) -> Self {
        Self {
            name: name.into(),
            colour,
            texture: None,
            repeat: [1.0, 1.0],
            double_sided: false,
        }
    }

    pub fn with_texture(mut self, texture: impl Into<String>) -> Self {
        self.texture = Some(texture.into());
        self
    }

    pub fn with_repeat(mut self, u: f32, v: f32) -> Self {
        self.repeat = [u, v];
        self
    }

    pub fn double_sided(mut self) -> Self {
        self.double_sided = true;
        self
    }
}

/// An ordered, cyclically advanceable list of material variants.
///
/// The index always stays within `0..len()`.
#[derive(Clone, Debug, PartialEq)]
pub struct MaterialCycle {
    materials: Vec<MaterialId>,
    index: usize,
}

impl MaterialCycle {
    /// # Panics
    ///
    /// Panics if `materials` is empty; a cycle needs at least one entry.
    pub fn new(materials: Vec<MaterialId>) -> Self {
        assert!(
            !materials.is_empty(),
            "a material cycle needs at least one material"
        );
        Self {
            materials,
            index: 0,
        }
    }

    /// Steps to the next material, wrapping around, and returns it.
    pub fn advance(&mut self) -> MaterialId {
        self.index = (self.index + 1) % self.materials.len();
        self.current()
    }

    pub fn current(&self) -> MaterialId {
        self.materials[self.index]
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }
}

/// A group of nodes hit-tested together and sharing one [`MaterialCycle`].
///
/// Every node in `members` shows the cycle's current material. Nodes in
/// `hit_only` count as hits on the target but keep their own material, e.g.
/// the roof of a building whose walls change.
#[derive(Clone, Debug)]
pub struct PickableTarget {
    pub name: String,
    pub members: Vec<NodeId>,
    pub hit_only: Vec<NodeId>,
    pub cycle: MaterialCycle,
}

impl PickableTarget {
    pub fn new(name: impl Into<String>, members: Vec<NodeId>, cycle: MaterialCycle) -> Self {
        Self {
            name: name.into(),
            members,
            hit_only: Vec::new(),
            cycle,
        }
    }

    pub fn with_hit_only(mut self, nodes: Vec<NodeId>) -> Self {
        self.hit_only = nodes;
        self
    }

    /// Every node that counts as a hit on this target.
    pub fn hit_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.members.iter().chain(self.hit_only.iter()).copied()
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.hit_nodes().any(|candidate| candidate == node)
    }

    /// Shows the cycle's current material on every member.
    pub fn apply(&self, graph: &mut SceneGraph) {
        let material = self.cycle.current();
        for &member in &self.members {
            if !graph.set_material(member, material) {
                log::warn!(
                    "Pickable target {} references node {:?} which has no material slot.",
                    self.name,
                    member
                );
            }
        }
    }

    pub fn advance_and_apply(&mut self, graph: &mut SceneGraph) -> MaterialId {
        let material = self.cycle.advance();
        self.apply(graph);
        material
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cycle_of(len: usize) -> MaterialCycle {
        MaterialCycle::new((0..len).map(MaterialId).collect())
    }

    #[test]
    fn index_after_n_advances_is_n_mod_len() {
        for len in 1..=5 {
            let mut cycle = cycle_of(len);
            for n in 1..=17 {
                cycle.advance();
                assert_eq!(cycle.index(), n % len, "len {len}, n {n}");
                assert!(cycle.index() < cycle.len());
            }
        }
    }

    #[test]
    fn advance_returns_the_new_current_material() {
        let mut cycle = MaterialCycle::new(vec![MaterialId(7), MaterialId(3)]);
        assert_eq!(cycle.current(), MaterialId(7));
        assert_eq!(cycle.advance(), MaterialId(3));
        assert_eq!(cycle.advance(), MaterialId(7));
    }

    #[test]
    fn single_entry_cycle_stays_put() {
        let mut cycle = cycle_of(1);
        assert_eq!(cycle.advance(), MaterialId(0));
        assert_eq!(cycle.index(), 0);
    }

    #[test]
    #[should_panic(expected = "at least one material")]
    fn empty_cycle_is_rejected() {
        MaterialCycle::new(Vec::new());
    }
}
