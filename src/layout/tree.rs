use std::collections::{HashMap, VecDeque};

use eframe::egui::{Vec2, vec2};

use super::LayoutNode;

const NODE_WIDTH: f32 = 190.0;
const NODE_HEIGHT: f32 = 80.0;
const HORIZONTAL_SPACING: f32 = 80.0;
const VERTICAL_SPACING: f32 = 240.0;
const MARGIN_TOP: f32 = 50.0;

/// Deterministic top-down tree layout. Each content level is a row; the
/// children of one parent are centered under it, content nodes first and
/// alphabetical within each class. Metadata nodes sit on a shallow second
/// row just below their owner's row.
pub(super) fn positions(
    nodes: &[LayoutNode],
    links: &[(String, String)],
) -> HashMap<String, Vec2> {
    let by_id: HashMap<&str, &LayoutNode> = nodes.iter().map(|node| (node.id.as_str(), node)).collect();

    // First incoming link wins as the layout parent.
    let mut parent: HashMap<&str, &str> = HashMap::new();
    for (source, target) in links {
        if by_id.contains_key(source.as_str()) && by_id.contains_key(target.as_str()) {
            parent.entry(target.as_str()).or_insert(source.as_str());
        }
    }

    let mut children: HashMap<&str, Vec<&str>> = HashMap::new();
    let mut roots = Vec::new();
    for node in nodes {
        match parent.get(node.id.as_str()) {
            Some(owner) => children.entry(*owner).or_default().push(node.id.as_str()),
            None => roots.push(node.id.as_str()),
        }
    }
    roots.sort_by_key(|id| sort_key(by_id[id]));

    let mut levels: HashMap<&str, u32> = HashMap::new();
    let mut queue = VecDeque::new();
    for root in &roots {
        levels.insert(*root, 0);
        queue.push_back(*root);
    }
    while let Some(current) = queue.pop_front() {
        let level = levels[current];
        if let Some(kids) = children.get(current) {
            for kid in kids {
                if !levels.contains_key(*kid) {
                    levels.insert(*kid, level + 1);
                    queue.push_back(*kid);
                }
            }
        }
    }


    let mut placed = HashMap::new();
    place_row(&mut placed, &by_id, &roots, 0.0, 0);

    // Parents are always placed before their children: walk levels upward.
    let mut by_level: Vec<(&str, u32)> = levels.iter().map(|(id, level)| (*id, *level)).collect();
    by_level.sort_by_key(|entry| entry.1);

    for (id, _) in by_level {
        let Some(kids) = children.get(id) else {
            continue;
        };
        let Some(anchor) = placed.get(id).copied() else {
            continue;
        };
        let Some(level) = levels.get(id).map(|level| level + 1) else {
            continue;
        };

        let mut sorted = kids.clone();
        sorted.sort_by_key(|kid| sort_key(by_id[kid]));
        place_row(&mut placed, &by_id, &sorted, anchor.x, level);
    }

    placed
}

fn sort_key(node: &LayoutNode) -> (bool, String) {
    (node.is_meta, node.title.to_lowercase())
}

fn place_row(
    placed: &mut HashMap<String, Vec2>,
    by_id: &HashMap<&str, &LayoutNode>,
    ids: &[&str],
    center_x: f32,
    level: u32,
) {
    let content: Vec<&str> = ids.iter().filter(|id| !by_id[**id].is_meta).copied().collect();
    let meta: Vec<&str> = ids.iter().filter(|id| by_id[**id].is_meta).copied().collect();

    let base_y = MARGIN_TOP + level as f32 * (NODE_HEIGHT + VERTICAL_SPACING);
    spread(placed, &content, center_x, base_y);

    let meta_y = base_y + NODE_HEIGHT + (VERTICAL_SPACING * 0.25).max(16.0);
    spread(placed, &meta, center_x, meta_y);
}

fn spread(placed: &mut HashMap<String, Vec2>, ids: &[&str], center_x: f32, y: f32) {
    if ids.is_empty() {
        return;
    }
    let step = NODE_WIDTH + HORIZONTAL_SPACING;
    let total = step * (ids.len() - 1) as f32;
    for (index, id) in ids.iter().enumerate() {
        let x = center_x - (total / 2.0) + step * index as f32;
        placed.entry((*id).to_owned()).or_insert(vec2(x, y));
    }
}
