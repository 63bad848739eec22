use eframe::egui::{self, Color32, Context, Key, RichText};

use crate::util::short_title;

use super::ViewModel;

impl ViewModel {
    pub(in crate::app) fn show(&mut self, ctx: &Context) {
        let now = ctx.input(|input| input.time);
        self.handle_shortcuts(ctx, now);
        self.side_panel(ctx, now);
        if self.canvas(ctx) {
            ctx.request_repaint();
        }
    }

    fn handle_shortcuts(&mut self, ctx: &Context, now: f64) {
        if ctx.wants_keyboard_input() {
            return;
        }

        let (expand, collapse, layout, fit) = ctx.input(|input| {
            (
                input.key_pressed(Key::E),
                input.key_pressed(Key::C),
                input.key_pressed(Key::L),
                input.key_pressed(Key::Num0),
            )
        });

        if expand {
            self.expand_level(now);
        }
        if collapse {
            self.collapse_level(now);
        }
        if layout {
            self.toggle_layout();
        }
        if fit {
            self.fit_requested = true;
        }
    }

    fn side_panel(&mut self, ctx: &Context, now: f64) {
        egui::SidePanel::left("controls")
            .default_width(250.0)
            .show(ctx, |ui| {
                ui.add_space(8.0);
                ui.heading("semagraph");
                ui.separator();

                ui.label("Search");
                ui.text_edit_singleline(&mut self.search);
                ui.add_space(8.0);

                let busy = self.op_pending();
                ui.horizontal(|ui| {
                    if ui
                        .add_enabled(!busy, egui::Button::new("Expand [e]"))
                        .clicked()
                    {
                        self.expand_level(now);
                    }
                    if ui
                        .add_enabled(!busy, egui::Button::new("Collapse [c]"))
                        .clicked()
                    {
                        self.collapse_level(now);
                    }
                });
                ui.horizontal(|ui| {
                    if ui
                        .button(format!("Layout: {} [l]", self.layout.mode().label()))
                        .clicked()
                    {
                        self.toggle_layout();
                    }
                    if ui.button("Fit [0]").clicked() {
                        self.fit_requested = true;
                    }
                });
                if ui.add_enabled(busy, egui::Button::new("Stop")).clicked() {
                    self.stop();
                }

                if busy {
                    ui.horizontal(|ui| {
                        ui.spinner();
                        if self.pending_expansion.is_some() {
                            ui.label("expanding...");
                        } else {
                            ui.label("collapsing...");
                        }
                    });
                }

                ui.separator();
                ui.label(format!(
                    "{} of {} nodes visible",
                    self.scene_order.len(),
                    self.store.node_count()
                ));
                ui.label(format!("{} edges", self.visible_links.len()));
                ui.label(format!("{} expanded", self.expanded.len()));

                if let Some(error) = self.last_error.clone() {
                    ui.add_space(6.0);
                    ui.colored_label(Color32::from_rgb(235, 110, 100), error);
                    if ui.small_button("Dismiss").clicked() {
                        self.last_error = None;
                    }
                }

                if let Some(id) = self.highlighted.clone()
                    && let Some(record) = self.store.node(&id)
                {
                    ui.separator();
                    ui.label(RichText::new(short_title(&record.title, 48)).strong());
                    ui.label(format!("type: {}", record.node_type));
                    if let Some(summary) = &record.summary {
                        ui.add_space(4.0);
                        ui.label(short_title(summary, 280));
                    }
                    let is_root = !self
                        .store
                        .links()
                        .iter()
                        .any(|link| link.target == id && !self.store.is_meta(&link.source));
                    if is_root && !self.expanded.contains(&id) {
                        ui.add_space(4.0);
                        ui.label(
                            RichText::new("press [e] to expand this root alone")
                                .small()
                                .weak(),
                        );
                    }
                }
            });
    }
}
