mod force;
mod tree;

use std::collections::HashMap;

use eframe::egui::{Vec2, vec2};

use crate::util::stable_pair;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LayoutMode {
    Force,
    Hierarchical,
}

impl LayoutMode {
    pub fn toggled(self) -> Self {
        match self {
            Self::Force => Self::Hierarchical,
            Self::Hierarchical => Self::Force,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Force => "force",
            Self::Hierarchical => "hierarchical",
        }
    }
}

#[derive(Clone, Debug)]
pub struct LayoutNode {
    pub id: String,
    pub title: String,
    pub is_meta: bool,
}

impl LayoutNode {
    fn radius(&self) -> f32 {
        if self.is_meta { 10.0 } else { 16.0 }
    }
}

/// Owns world positions for every node the view has ever shown. Force mode
/// integrates continuously; hierarchical mode recomputes the whole tree on
/// every structural change. Old positions are kept so a node that comes
/// back after a collapse reappears where it was.
pub struct LayoutEngine {
    mode: LayoutMode,
    positions: HashMap<String, Vec2>,
    velocities: HashMap<String, Vec2>,
}

impl LayoutEngine {
    pub fn new(mode: LayoutMode) -> Self {
        Self {
            mode,
            positions: HashMap::new(),
            velocities: HashMap::new(),
        }
    }

    pub fn mode(&self) -> LayoutMode {
        self.mode
    }

    pub fn position(&self, id: &str) -> Option<Vec2> {
        self.positions.get(id).copied()
    }

    pub fn positions(&self) -> &HashMap<String, Vec2> {
        &self.positions
    }

    pub fn set_position(&mut self, id: &str, position: Vec2) {
        self.positions.insert(id.to_owned(), position);
        self.velocities.insert(id.to_owned(), Vec2::ZERO);
    }

    /// Reconciles the layout with a new visible structure.
    pub fn sync(&mut self, nodes: &[LayoutNode], links: &[(String, String)]) {
        match self.mode {
            LayoutMode::Hierarchical => {
                for (id, position) in tree::positions(nodes, links) {
                    self.positions.insert(id, position);
                }
                self.velocities.clear();
            }
            LayoutMode::Force => self.seed_missing(nodes, links),
        }
    }

    pub fn set_mode(&mut self, mode: LayoutMode, nodes: &[LayoutNode], links: &[(String, String)]) {
        if mode == self.mode {
            return;
        }
        self.mode = mode;
        self.velocities.clear();
        self.sync(nodes, links);
    }

    /// Integrates one force step over the given nodes. No-op outside force
    /// mode. Returns whether anything moved.
    pub fn step(
        &mut self,
        nodes: &[LayoutNode],
        links: &[(String, String)],
        delta_seconds: f32,
    ) -> bool {
        if self.mode != LayoutMode::Force || nodes.len() < 2 {
            return false;
        }

        let index_by_id: HashMap<&str, usize> = nodes
            .iter()
            .enumerate()
            .map(|(index, node)| (node.id.as_str(), index))
            .collect();

        let mut sim = nodes
            .iter()
            .map(|node| force::ForceNode {
                position: self.positions.get(&node.id).copied().unwrap_or(Vec2::ZERO),
                velocity: self.velocities.get(&node.id).copied().unwrap_or(Vec2::ZERO),
                radius: node.radius(),
            })
            .collect::<Vec<_>>();

        let edges = links
            .iter()
            .filter_map(|(source, target)| {
                Some((*index_by_id.get(source.as_str())?, *index_by_id.get(target.as_str())?))
            })
            .collect::<Vec<_>>();

        let any_motion = force::step(&mut sim, &edges, delta_seconds);

        for (node, state) in nodes.iter().zip(sim) {
            self.positions.insert(node.id.clone(), state.position);
            self.velocities.insert(node.id.clone(), state.velocity);
        }

        any_motion
    }

    /// World-space bounding box of the given visible nodes.
    pub fn bounds_of<'a>(&self, ids: impl Iterator<Item = &'a str>) -> Option<(Vec2, Vec2)> {
        let mut bounds: Option<(Vec2, Vec2)> = None;
        for id in ids {
            let Some(position) = self.positions.get(id) else {
                continue;
            };
            bounds = Some(match bounds {
                None => (*position, *position),
                Some((min, max)) => (
                    vec2(min.x.min(position.x), min.y.min(position.y)),
                    vec2(max.x.max(position.x), max.y.max(position.y)),
                ),
            });
        }
        bounds
    }

    /// New nodes start near an already-positioned neighbor so expansion
    /// grows out of the clicked region instead of teleporting in.
    fn seed_missing(&mut self, nodes: &[LayoutNode], links: &[(String, String)]) {
        for node in nodes {
            if self.positions.contains_key(&node.id) {
                continue;
            }

            let anchor = links.iter().find_map(|(source, target)| {
                if *target == node.id {
                    self.positions.get(source).copied()
                } else if *source == node.id {
                    self.positions.get(target).copied()
                } else {
                    None
                }
            });

            let (jx, jy) = stable_pair(&node.id);
            let position = match anchor {
                Some(anchor) => anchor + vec2(jx, jy) * 42.0,
                None => {
                    let radius = 140.0 + (jx.abs() * 120.0);
                    let angle = jy * std::f32::consts::PI;
                    vec2(angle.cos(), angle.sin()) * radius
                }
            };
            self.positions.insert(node.id.clone(), position);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str) -> LayoutNode {
        LayoutNode {
            id: id.to_owned(),
            title: id.to_uppercase(),
            is_meta: false,
        }
    }

    #[test]
    fn force_sync_seeds_new_nodes_near_their_parent() {
        let mut engine = LayoutEngine::new(LayoutMode::Force);
        engine.set_position("a", vec2(100.0, 50.0));

        let nodes = vec![node("a"), node("b")];
        let links = vec![("a".to_owned(), "b".to_owned())];
        engine.sync(&nodes, &links);

        let seeded = engine.position("b").expect("b seeded");
        assert!((seeded - vec2(100.0, 50.0)).length() <= 60.0);
    }

    #[test]
    fn positions_survive_removal_and_return() {
        let mut engine = LayoutEngine::new(LayoutMode::Force);
        let nodes = vec![node("a"), node("b")];
        let links = vec![("a".to_owned(), "b".to_owned())];
        engine.sync(&nodes, &links);
        let before = engine.position("b").expect("b placed");

        // b disappears, then comes back.
        engine.sync(&[node("a")], &[]);
        engine.sync(&nodes, &links);
        assert_eq!(engine.position("b"), Some(before));
    }

    #[test]
    fn hierarchical_sync_recomputes_rows() {
        let mut engine = LayoutEngine::new(LayoutMode::Hierarchical);
        let nodes = vec![node("a"), node("b")];
        let links = vec![("a".to_owned(), "b".to_owned())];
        engine.sync(&nodes, &links);

        let a = engine.position("a").expect("a placed");
        let b = engine.position("b").expect("b placed");
        assert!(b.y > a.y);
    }

    #[test]
    fn step_is_inert_in_hierarchical_mode() {
        let mut engine = LayoutEngine::new(LayoutMode::Hierarchical);
        let nodes = vec![node("a"), node("b")];
        let links = vec![("a".to_owned(), "b".to_owned())];
        engine.sync(&nodes, &links);
        let before = engine.position("a");

        assert!(!engine.step(&nodes, &links, 1.0 / 60.0));
        assert_eq!(engine.position("a"), before);
    }
}
