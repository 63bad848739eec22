use std::collections::{HashMap, HashSet};

use eframe::egui::Vec2;

use crate::graph::collapse::{FADE_MS, fade_delay_ms};
use crate::layout::LayoutMode;

/// Enter transition length, after the per-node stagger delay.
pub const ENTER_MS: u64 = 200;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Phase {
    Entering { delay_ms: u64, started: f64 },
    Active,
    Exiting { delay_ms: u64, started: f64 },
}

#[derive(Clone, Debug)]
pub struct NodeVisual {
    pub position: Vec2,
    pub phase: Phase,
    pub alpha: f32,
    pub scale: f32,
}

impl NodeVisual {
    pub fn is_exiting(&self) -> bool {
        matches!(self.phase, Phase::Exiting { .. })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EdgeShape {
    Curve,
    Elbow,
}

pub struct SceneInput<'a> {
    /// Visible node ids in a stable order; stagger indices follow it.
    pub node_ids: &'a [String],
    pub links: &'a [(String, String)],
    pub positions: &'a HashMap<String, Vec2>,
    pub mode: LayoutMode,
}

/// Frame-coalesced scene builder. Any number of `schedule` calls between
/// two frames results in exactly one synchronization pass; the pass diffs
/// nodes and edges against the previous scene and drives the per-node
/// enter/exit transitions.
#[derive(Default)]
pub struct RenderScheduler {
    pending: bool,
    passes: u64,
    nodes: HashMap<String, NodeVisual>,
    edges: HashMap<(String, String), EdgeShape>,
    // Edges removed ahead of a collapse commit; still present in the input
    // links until the visibility recompute, so syncs must not re-add them.
    suppressed: HashSet<(String, String)>,
}

impl RenderScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self) {
        self.pending = true;
    }

    pub fn passes(&self) -> u64 {
        self.passes
    }

    pub fn nodes(&self) -> &HashMap<String, NodeVisual> {
        &self.nodes
    }

    pub fn edges(&self) -> &HashMap<(String, String), EdgeShape> {
        &self.edges
    }

    pub fn animating(&self) -> bool {
        self.nodes
            .values()
            .any(|node| node.phase != Phase::Active)
    }

    /// Starts the staggered fade-out for a collapse. Stagger delays follow
    /// the given id order; positions freeze for the duration.
    pub fn begin_exit(&mut self, ids: &[String], now: f64) {
        for (index, id) in ids.iter().enumerate() {
            if let Some(node) = self.nodes.get_mut(id) {
                node.phase = Phase::Exiting {
                    delay_ms: fade_delay_ms(index),
                    started: now,
                };
            }
        }
        self.pending = true;
    }

    /// Reverts in-flight fades, e.g. when the user aborts a collapse.
    pub fn cancel_exits(&mut self) {
        for node in self.nodes.values_mut() {
            if node.is_exiting() {
                node.phase = Phase::Active;
            }
        }
        self.suppressed.clear();
        self.pending = true;
    }

    /// Drops edges from the scene immediately, ahead of the visibility
    /// recompute that happens when a collapse commits.
    pub fn remove_edges(&mut self, keys: &[(String, String)]) {
        for key in keys {
            self.edges.remove(key);
            self.suppressed.insert(key.clone());
        }
        self.pending = true;
    }

    /// Runs at most one synchronization pass per frame. Returns whether a
    /// pass ran; callers keep requesting repaints while it returns true.
    pub fn frame(&mut self, now: f64, input: &SceneInput<'_>) -> bool {
        if !self.pending && !self.animating() {
            return false;
        }
        self.pending = false;
        self.passes += 1;

        self.sync_nodes(now, input);
        self.sync_edges(input);
        self.advance(now);
        true
    }

    fn sync_nodes(&mut self, now: f64, input: &SceneInput<'_>) {
        let current: HashSet<&str> = input.node_ids.iter().map(String::as_str).collect();

        // New nodes this pass share one stagger batch.
        let mut batch = 0usize;
        for id in input.node_ids {
            let Some(position) = input.positions.get(id).copied() else {
                continue;
            };
            match self.nodes.get_mut(id) {
                Some(node) => {
                    if !node.is_exiting() {
                        node.position = position;
                    }
                }
                None => {
                    self.nodes.insert(
                        id.clone(),
                        NodeVisual {
                            position,
                            phase: Phase::Entering {
                                delay_ms: fade_delay_ms(batch),
                                started: now,
                            },
                            alpha: 0.0,
                            scale: 0.6,
                        },
                    );
                    batch += 1;
                }
            }
        }

        // Nodes that vanished without an exit animation drop out at once.
        self.nodes
            .retain(|id, node| current.contains(id.as_str()) || node.is_exiting());
    }

    fn sync_edges(&mut self, input: &SceneInput<'_>) {
        let shape = match input.mode {
            LayoutMode::Force => EdgeShape::Curve,
            LayoutMode::Hierarchical => EdgeShape::Elbow,
        };

        let mut wanted = HashSet::with_capacity(input.links.len());
        for (source, target) in input.links {
            let key = (source.clone(), target.clone());
            if self.suppressed.contains(&key) {
                wanted.insert(key);
                continue;
            }
            if self.nodes.contains_key(source) && self.nodes.contains_key(target) {
                self.edges.insert(key.clone(), shape);
                wanted.insert(key);
            }
        }
        self.edges.retain(|key, _| wanted.contains(key));
        self.suppressed.retain(|key| wanted.contains(key));
    }

    fn advance(&mut self, now: f64) {
        let mut gone = Vec::new();

        for (id, node) in &mut self.nodes {
            match node.phase {
                Phase::Active => {
                    node.alpha = 1.0;
                    node.scale = 1.0;
                }
                Phase::Entering { delay_ms, started } => {
                    let elapsed_ms = (now - started) * 1000.0;
                    let t = ((elapsed_ms - delay_ms as f64) / ENTER_MS as f64).clamp(0.0, 1.0);
                    let eased = ease_out(t as f32);
                    node.alpha = eased;
                    node.scale = 0.6 + 0.4 * eased;
                    if t >= 1.0 {
                        node.phase = Phase::Active;
                    }
                }
                Phase::Exiting { delay_ms, started } => {
                    let elapsed_ms = (now - started) * 1000.0;
                    let t = ((elapsed_ms - delay_ms as f64) / FADE_MS as f64).clamp(0.0, 1.0);
                    node.alpha = 1.0 - t as f32;
                    node.scale = 1.0;
                    if t >= 1.0 {
                        gone.push(id.clone());
                    }
                }
            }
        }

        for id in gone {
            self.nodes.remove(&id);
            self.edges
                .retain(|(source, target), _| *source != id && *target != id);
            self.suppressed
                .retain(|(source, target)| *source != id && *target != id);
        }
    }
}

fn ease_out(t: f32) -> f32 {
    1.0 - (1.0 - t).powi(3)
}
