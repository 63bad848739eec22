use eframe::egui::{
    self, Align2, Color32, Context, FontId, Pos2, Rect, Response, Sense, Stroke, Vec2, pos2,
};
use eframe::egui::epaint::CubicBezierShape;
use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;

use crate::graph::meta::{self, MetaKind};
use crate::render::EdgeShape;
use crate::util::short_title;

use super::ViewModel;

const BACKGROUND: Color32 = Color32::from_rgb(19, 23, 29);
const EDGE_COLOR: Color32 = Color32::from_rgb(105, 120, 136);
const CONTENT_COLOR: Color32 = Color32::from_rgb(88, 152, 212);
const TAG_COLOR: Color32 = Color32::from_rgb(104, 178, 116);
const HYPERNYM_COLOR: Color32 = Color32::from_rgb(168, 124, 216);
const HYPONYM_COLOR: Color32 = Color32::from_rgb(226, 160, 94);

impl ViewModel {
    pub(in crate::app) fn canvas(&mut self, ctx: &Context) -> bool {
        let mut repaint = false;

        egui::CentralPanel::default()
            .frame(egui::Frame::new())
            .show(ctx, |ui| {
                let rect = ui.available_rect_before_wrap();
                let response = ui.allocate_rect(rect, Sense::click_and_drag());
                let painter = ui.painter_at(rect);

                let now = ctx.input(|input| input.time);
                let delta_seconds = ctx.input(|input| input.stable_dt).min(0.05);
                repaint = self.tick(now, delta_seconds, rect);

                let hovered = response
                    .hover_pos()
                    .and_then(|pointer| self.node_at(rect, pointer));
                self.handle_pointer(ctx, &response, rect, hovered.as_deref());

                painter.rect_filled(rect, 0.0, BACKGROUND);
                draw_grid(&painter, rect, self.pan, self.zoom);
                self.draw_edges(&painter, rect);
                self.draw_nodes(&painter, rect, hovered.as_deref());
            });

        repaint
    }

    fn handle_pointer(
        &mut self,
        ctx: &Context,
        response: &Response,
        rect: Rect,
        hovered: Option<&str>,
    ) {
        let scroll = ctx.input(|input| input.raw_scroll_delta.y);
        if response.hovered()
            && scroll != 0.0
            && let Some(pointer) = response.hover_pos()
        {
            let anchor = screen_to_world(rect, self.pan, self.zoom, pointer);
            self.zoom = (self.zoom * (scroll * 0.0015).exp()).clamp(0.05, 3.0);
            let shifted = world_to_screen(rect, self.pan, self.zoom, anchor);
            self.pan += pointer - shifted;
            self.scheduler.schedule();
        }

        if response.drag_started() {
            self.dragging = hovered.map(str::to_owned);
        }
        if response.dragged() {
            match self.dragging.clone() {
                Some(id) => {
                    if let Some(pointer) = response.interact_pointer_pos() {
                        let world = screen_to_world(rect, self.pan, self.zoom, pointer);
                        self.layout.set_position(&id, world);
                        self.scheduler.schedule();
                    }
                }
                None => {
                    self.pan += response.drag_delta();
                    self.scheduler.schedule();
                }
            }
        }
        if response.drag_stopped() {
            self.dragging = None;
        }

        if response.clicked() {
            self.highlighted = match hovered {
                Some(id) if self.highlighted.as_deref() == Some(id) => None,
                Some(id) => Some(id.to_owned()),
                None => None,
            };
            self.scheduler.schedule();
        }
    }

    fn node_at(&self, rect: Rect, pointer: Pos2) -> Option<String> {
        let mut best: Option<(String, f32)> = None;
        for (id, visual) in self.scheduler.nodes() {
            let center = world_to_screen(rect, self.pan, self.zoom, visual.position);
            let radius = self.node_radius(id, visual.scale) + 3.0;
            let distance = center.distance(pointer);
            if distance <= radius
                && best.as_ref().is_none_or(|(_, nearest)| distance < *nearest)
            {
                best = Some((id.clone(), distance));
            }
        }
        best.map(|(id, _)| id)
    }

    fn node_radius(&self, id: &str, scale: f32) -> f32 {
        let base = if self.store.is_meta(id) { 7.0 } else { 11.0 };
        (base * self.zoom.powf(0.40)).clamp(2.5, 40.0) * scale
    }

    fn draw_edges(&self, painter: &egui::Painter, rect: Rect) {
        let width = (1.3 * self.zoom.powf(0.5)).clamp(0.35, 3.0);

        for ((source, target), shape) in self.scheduler.edges() {
            let (Some(from), Some(to)) = (
                self.scheduler.nodes().get(source),
                self.scheduler.nodes().get(target),
            ) else {
                continue;
            };

            let a = world_to_screen(rect, self.pan, self.zoom, from.position);
            let b = world_to_screen(rect, self.pan, self.zoom, to.position);
            if !span_visible(rect, a, b) {
                continue;
            }

            let alpha = from.alpha.min(to.alpha);
            let stroke = Stroke::new(width, EDGE_COLOR.gamma_multiply(alpha * 0.85));

            match shape {
                EdgeShape::Curve => {
                    let dx = (b.x - a.x) * 0.3;
                    painter.add(CubicBezierShape::from_points_stroke(
                        [a, pos2(a.x + dx, a.y), pos2(b.x - dx, b.y), b],
                        false,
                        Color32::TRANSPARENT,
                        stroke,
                    ));
                }
                EdgeShape::Elbow => {
                    let mid_y = (a.y + b.y) / 2.0;
                    painter.line_segment([a, pos2(a.x, mid_y)], stroke);
                    painter.line_segment([pos2(a.x, mid_y), pos2(b.x, mid_y)], stroke);
                    painter.line_segment([pos2(b.x, mid_y), b], stroke);
                }
            }
        }
    }

    fn draw_nodes(&self, painter: &egui::Painter, rect: Rect, hovered: Option<&str>) {
        let matcher = SkimMatcherV2::default();
        let query = self.search.trim();

        for (id, visual) in self.scheduler.nodes() {
            let center = world_to_screen(rect, self.pan, self.zoom, visual.position);
            let radius = self.node_radius(id, visual.scale);
            if !circle_visible(rect, center, radius) {
                continue;
            }

            let Some(record) = self.store.node(id) else {
                continue;
            };

            let mut alpha = visual.alpha;
            if !query.is_empty()
                && matcher.fuzzy_match(&record.title, query).is_none()
                && matcher
                    .fuzzy_match(&record.title.to_lowercase(), &query.to_lowercase())
                    .is_none()
            {
                alpha *= 0.22;
            }

            let color = node_color(id, &record.node_type).gamma_multiply(alpha);
            painter.circle_filled(center, radius, color);

            if self.highlighted.as_deref() == Some(id.as_str()) {
                painter.circle_stroke(
                    center,
                    radius + 2.5,
                    Stroke::new(2.0, Color32::WHITE.gamma_multiply(alpha)),
                );
            } else if hovered == Some(id.as_str()) {
                painter.circle_stroke(
                    center,
                    radius + 2.0,
                    Stroke::new(1.2, Color32::from_gray(200).gamma_multiply(alpha)),
                );
            }

            let show_label = self.zoom > 0.55
                || hovered == Some(id.as_str())
                || self.highlighted.as_deref() == Some(id.as_str());
            if show_label {
                let font = FontId::proportional((10.5 * self.zoom.powf(0.3)).clamp(9.0, 15.0));
                painter.text(
                    center + Vec2::new(0.0, radius + 3.0),
                    Align2::CENTER_TOP,
                    short_title(&record.title, 28),
                    font,
                    Color32::from_gray(205).gamma_multiply(alpha),
                );
            }
        }
    }
}

fn node_color(id: &str, node_type: &str) -> Color32 {
    match meta::classify(id, node_type) {
        Some(MetaKind::Tag) => TAG_COLOR,
        Some(MetaKind::Hypernym) => HYPERNYM_COLOR,
        Some(MetaKind::Hyponym) => HYPONYM_COLOR,
        None => CONTENT_COLOR,
    }
}

fn draw_grid(painter: &egui::Painter, rect: Rect, pan: Vec2, zoom: f32) {
    let step = (56.0 * zoom.clamp(0.6, 1.8)).max(20.0);
    let origin = rect.center() + pan;
    let stroke = Stroke::new(1.0, Color32::from_rgba_unmultiplied(60, 70, 80, 60));

    let mut x = origin.x.rem_euclid(step);
    while x < rect.right() {
        painter.line_segment([pos2(x, rect.top()), pos2(x, rect.bottom())], stroke);
        x += step;
    }

    let mut y = origin.y.rem_euclid(step);
    while y < rect.bottom() {
        painter.line_segment([pos2(rect.left(), y), pos2(rect.right(), y)], stroke);
        y += step;
    }
}

fn world_to_screen(rect: Rect, pan: Vec2, zoom: f32, world: Vec2) -> Pos2 {
    rect.center() + pan + world * zoom
}

fn screen_to_world(rect: Rect, pan: Vec2, zoom: f32, screen: Pos2) -> Vec2 {
    (screen - rect.center() - pan) / zoom
}

fn circle_visible(rect: Rect, position: Pos2, radius: f32) -> bool {
    !(position.x + radius < rect.left()
        || position.x - radius > rect.right()
        || position.y + radius < rect.top()
        || position.y - radius > rect.bottom())
}

fn span_visible(rect: Rect, start: Pos2, end: Pos2) -> bool {
    let padding = 24.0;
    !(start.x.max(end.x) < rect.left() - padding
        || start.x.min(end.x) > rect.right() + padding
        || start.y.max(end.y) < rect.top() - padding
        || start.y.min(end.y) > rect.bottom() + padding)
}
