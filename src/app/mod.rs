use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use anyhow::{Context as _, Result, anyhow};
use eframe::egui::{self, Context, Rect, Vec2};

use crate::api::{GraphPayload, RemoteClient, RemoteNode, SearchParams};
use crate::graph::{GraphStore, collapse, expand, visible};
use crate::layout::{LayoutEngine, LayoutMode, LayoutNode};
use crate::render::{RenderScheduler, SceneInput};

mod ui;
mod view;

/// Seconds after an expansion commit before the viewport refits.
const EXPAND_REFIT_DELAY: f64 = 0.3;
/// Seconds after a refit before automatic refitting is allowed again.
const REFIT_RELEASE_DELAY: f64 = 0.6;

#[derive(Clone)]
pub struct AppConfig {
    pub base_url: String,
    pub token: Option<String>,
    pub query: String,
    pub depth: u32,
    pub limit: u32,
    pub data_file: Option<PathBuf>,
    pub upload: bool,
}

pub struct SemaGraphApp {
    config: AppConfig,
    client: Option<Arc<RemoteClient>>,
    state: AppState,
}

enum AppState {
    Loading {
        rx: Receiver<Result<GraphStore, String>>,
    },
    Ready(Box<ViewModel>),
    Error(String),
}

struct PendingExpansion {
    rx: Receiver<(String, Option<Vec<RemoteNode>>)>,
    awaiting: HashSet<String>,
    frontier: Vec<String>,
    failed: Vec<String>,
}

struct PendingCollapse {
    target: String,
    exiting: Vec<String>,
    commit_at: f64,
}

#[derive(Default)]
struct RefitTimers {
    suppress: bool,
    refit_at: Option<f64>,
    release_at: Option<f64>,
}

pub(in crate::app) struct ViewModel {
    client: Option<Arc<RemoteClient>>,
    store: GraphStore,
    expanded: HashSet<String>,
    visible: HashSet<String>,
    visible_links: Vec<(String, String)>,
    scene_order: Vec<String>,
    layout: LayoutEngine,
    scheduler: RenderScheduler,
    pan: Vec2,
    zoom: f32,
    search: String,
    highlighted: Option<String>,
    dragging: Option<String>,
    pending_expansion: Option<PendingExpansion>,
    pending_collapses: Vec<PendingCollapse>,
    refit: RefitTimers,
    fit_requested: bool,
    last_error: Option<String>,
}

impl SemaGraphApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, config: AppConfig) -> Self {
        let client = if config.data_file.is_some() && !config.upload {
            None
        } else {
            Some(Arc::new(RemoteClient::new(
                &config.base_url,
                config.token.clone(),
            )))
        };
        let state = Self::start_load(&config, client.clone());
        Self {
            config,
            client,
            state,
        }
    }

    fn start_load(config: &AppConfig, client: Option<Arc<RemoteClient>>) -> AppState {
        let (tx, rx) = mpsc::channel();
        let config = config.clone();

        thread::spawn(move || {
            let result =
                load_initial(&config, client.as_deref()).map_err(|error| error.to_string());
            let _ = tx.send(result);
        });

        AppState::Loading { rx }
    }
}

fn load_initial(config: &AppConfig, client: Option<&RemoteClient>) -> Result<GraphStore> {
    let mut store = GraphStore::new();

    if let Some(path) = &config.data_file {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read graph file {}", path.display()))?;
        let payload: GraphPayload = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse graph file {}", path.display()))?;
        store.load_payload(&payload);

        // Mirror the file to the backend when asked; local viewing still
        // works if the push fails.
        if config.upload
            && let Some(client) = client
        {
            let body: serde_json::Value = serde_json::from_str(&raw)
                .with_context(|| format!("failed to parse graph file {}", path.display()))?;
            let response = client.post("/api/graph/load", &body);
            match response.error {
                Some(error) => tracing::warn!(%error, "graph upload failed"),
                None => tracing::info!(nodes = store.node_count(), "graph uploaded"),
            }
        }
        return Ok(store);
    }

    let client = client.ok_or_else(|| anyhow!("no data file and no remote endpoint configured"))?;
    let response = client.search(&SearchParams::initial(
        &config.query,
        config.depth,
        config.limit,
    ));
    let data = response.data.ok_or_else(|| {
        anyhow!(response.error.unwrap_or_else(|| "initial load failed".to_owned()))
    })?;

    tracing::info!(nodes = data.nodes.len(), "initial graph loaded");
    store.merge_roots(&data.nodes);
    Ok(store)
}

impl eframe::App for SemaGraphApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        let mut transition = None;

        match &mut self.state {
            AppState::Loading { rx } => {
                match rx.try_recv() {
                    Ok(Ok(store)) => {
                        transition = Some(AppState::Ready(Box::new(ViewModel::new(
                            store,
                            self.client.clone(),
                        ))));
                    }
                    Ok(Err(error)) => transition = Some(AppState::Error(error)),
                    Err(TryRecvError::Empty) => {}
                    Err(TryRecvError::Disconnected) => {
                        transition = Some(AppState::Error(
                            "background load worker disconnected".to_owned(),
                        ));
                    }
                }

                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.vertical_centered(|ui| {
                        ui.add_space(120.0);
                        ui.heading("Loading knowledge graph...");
                        ui.add_space(8.0);
                        ui.spinner();
                    });
                });
                ctx.request_repaint();
            }
            AppState::Error(error) => {
                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.heading("Failed to load knowledge graph");
                    ui.add_space(6.0);
                    ui.label(error.as_str());
                    ui.add_space(10.0);
                    if ui.button("Retry").clicked() {
                        transition = Some(Self::start_load(&self.config, self.client.clone()));
                    }
                });
            }
            AppState::Ready(model) => {
                model.show(ctx);
            }
        }

        if let Some(next_state) = transition {
            self.state = next_state;
        }
    }
}

impl ViewModel {
    fn new(store: GraphStore, client: Option<Arc<RemoteClient>>) -> Self {
        let mut model = Self {
            client,
            store,
            expanded: HashSet::new(),
            visible: HashSet::new(),
            visible_links: Vec::new(),
            scene_order: Vec::new(),
            layout: LayoutEngine::new(LayoutMode::Force),
            scheduler: RenderScheduler::new(),
            pan: Vec2::ZERO,
            zoom: 1.0,
            search: String::new(),
            highlighted: None,
            dragging: None,
            pending_expansion: None,
            pending_collapses: Vec::new(),
            refit: RefitTimers::default(),
            fit_requested: true,
            last_error: None,
        };
        model.refresh_scene();
        model
    }

    fn op_pending(&self) -> bool {
        self.pending_expansion.is_some() || !self.pending_collapses.is_empty()
    }

    fn exiting_ids(&self) -> HashSet<String> {
        self.pending_collapses
            .iter()
            .flat_map(|pending| pending.exiting.iter().cloned())
            .collect()
    }

    fn layout_nodes(&self) -> Vec<LayoutNode> {
        self.scene_order
            .iter()
            .filter_map(|id| {
                let record = self.store.node(id)?;
                Some(LayoutNode {
                    id: record.id.clone(),
                    title: record.title.clone(),
                    is_meta: record.is_meta(),
                })
            })
            .collect()
    }

    /// Recomputes visibility from the expansion state and pushes the new
    /// structure through layout and scheduler.
    fn refresh_scene(&mut self) {
        let exiting = self.exiting_ids();
        self.visible = visible::visible_nodes(&self.store, &self.expanded, &exiting);
        self.visible_links = visible::visible_links(&self.store, &self.visible);

        let mut order = self.visible.iter().cloned().collect::<Vec<_>>();
        order.sort();
        self.scene_order = order;

        let nodes = self.layout_nodes();
        self.layout.sync(&nodes, &self.visible_links);
        if !self.refit.suppress {
            self.fit_requested = true;
        }
        self.scheduler.schedule();
    }

    /// One level of expansion; targeted when a visible root is highlighted,
    /// global otherwise. Ignored while another expand or collapse is still
    /// in flight.
    fn expand_level(&mut self, now: f64) {
        if self.op_pending() {
            return;
        }

        let target = self.highlighted.clone();
        let plan =
            expand::plan_expansion(&self.store, &self.visible, &self.expanded, target.as_deref());
        if plan.is_empty() {
            return;
        }

        self.refit.suppress = true;
        let (tx, rx) = mpsc::channel();
        let mut awaiting = HashSet::new();

        for id in &plan.to_fetch {
            if !self.store.begin_fetch(id) {
                continue;
            }
            awaiting.insert(id.clone());

            match &self.client {
                Some(client) => {
                    let client = Arc::clone(client);
                    let tx = tx.clone();
                    let id = id.clone();
                    thread::spawn(move || {
                        let response = client.search(&SearchParams::children_of(&id));
                        if let Some(error) = &response.error {
                            tracing::warn!(node = %id, %error, "child fetch failed");
                        }
                        let _ = tx.send((id, response.data.map(|data| data.nodes)));
                    });
                }
                // Offline graphs have nothing further to fetch.
                None => {
                    let _ = tx.send((id.clone(), Some(Vec::new())));
                }
            }
        }

        if awaiting.is_empty() {
            self.commit_expansion(plan.frontier, &[], now);
        } else {
            self.pending_expansion = Some(PendingExpansion {
                rx,
                awaiting,
                frontier: plan.frontier,
                failed: Vec::new(),
            });
        }
    }

    fn poll_expansion(&mut self, now: f64) {
        let Some(mut pending) = self.pending_expansion.take() else {
            return;
        };

        loop {
            match pending.rx.try_recv() {
                Ok((id, result)) => {
                    pending.awaiting.remove(&id);
                    if result.is_none() {
                        pending.failed.push(id.clone());
                    }
                    self.store.complete_fetch(&id, result.as_deref());
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    for id in pending.awaiting.drain() {
                        self.store.complete_fetch(&id, None);
                        pending.failed.push(id);
                    }
                    break;
                }
            }
        }

        if pending.awaiting.is_empty() {
            if !pending.failed.is_empty() {
                self.last_error = Some(format!(
                    "failed to fetch children for {} node(s)",
                    pending.failed.len()
                ));
            }
            let failed = std::mem::take(&mut pending.failed);
            self.commit_expansion(pending.frontier, &failed, now);
        } else {
            self.pending_expansion = Some(pending);
        }
    }

    /// Marks the frontier expanded. Nodes whose fetch failed and whose
    /// children remain unknown stay unexpanded so a later attempt retries,
    /// and a node that turns out childless is never marked expanded.
    fn commit_expansion(&mut self, frontier: Vec<String>, failed: &[String], now: f64) {
        for id in frontier {
            if failed.contains(&id) && !self.store.has_fetched(&id) {
                continue;
            }
            if !self.store.has_children(&id) {
                continue;
            }
            self.expanded.insert(id);
        }
        self.refresh_scene();
        self.refit.refit_at = Some(now + EXPAND_REFIT_DELAY);
        self.refit.release_at = None;
    }

    /// Retracts the deepest expanded level with a staggered fade; the
    /// structural commit happens once every fade has had time to finish.
    fn collapse_level(&mut self, now: f64) {
        if self.op_pending() {
            return;
        }

        let targets = collapse::deepest_expanded(&self.store, &self.visible, &self.expanded);
        if targets.is_empty() {
            return;
        }

        self.refit.suppress = true;
        let mut any_fade = false;

        for target in targets {
            let descendants = collapse::descendants_of(&self.store, &target, &self.visible);
            if descendants.is_empty() {
                self.expanded.remove(&target);
                continue;
            }

            let descendant_set = descendants.iter().cloned().collect::<HashSet<_>>();
            let removed = collapse::edges_to_remove(&self.store, &descendant_set);
            self.scheduler.remove_edges(&removed);
            self.scheduler.begin_exit(&descendants, now);

            let commit_at = now + collapse::fade_window_ms(descendants.len()) as f64 / 1000.0;
            self.pending_collapses.push(PendingCollapse {
                target,
                exiting: descendants,
                commit_at,
            });
            any_fade = true;
        }

        if any_fade {
            self.refit.refit_at = Some(now + collapse::COLLAPSE_REFIT_MS as f64 / 1000.0);
            self.refit.release_at = None;
        } else {
            // Nothing faded; the structure changed synchronously.
            self.refresh_scene();
        }
        self.scheduler.schedule();
    }

    fn poll_collapses(&mut self, now: f64) {
        let mut committed = false;
        let mut index = 0;
        while index < self.pending_collapses.len() {
            if now >= self.pending_collapses[index].commit_at {
                let done = self.pending_collapses.remove(index);
                self.expanded.remove(&done.target);
                committed = true;
            } else {
                index += 1;
            }
        }
        if committed {
            self.refresh_scene();
        }
    }

    /// Aborts in-flight operations: fade-outs revert, awaited fetches are
    /// released so they can be retried, and refit timers are cleared.
    fn stop(&mut self) {
        if let Some(pending) = self.pending_expansion.take() {
            for id in pending.awaiting {
                self.store.complete_fetch(&id, None);
            }
        }
        if !self.pending_collapses.is_empty() {
            self.pending_collapses.clear();
            self.scheduler.cancel_exits();
        }
        self.refit = RefitTimers::default();
        self.refresh_scene();
    }

    fn toggle_layout(&mut self) {
        let nodes = self.layout_nodes();
        let mode = self.layout.mode().toggled();
        self.layout.set_mode(mode, &nodes, &self.visible_links);
        self.fit_requested = true;
        self.scheduler.schedule();
    }

    /// Per-frame bookkeeping: fan-in of fetches, collapse commits, refit
    /// timers, force integration, and the single scheduler pass.
    fn tick(&mut self, now: f64, delta_seconds: f32, rect: Rect) -> bool {
        self.poll_expansion(now);
        self.poll_collapses(now);

        if let Some(at) = self.refit.refit_at
            && now >= at
        {
            self.refit.refit_at = None;
            self.fit_requested = true;
            self.refit.release_at = Some(now + REFIT_RELEASE_DELAY);
        }
        if let Some(at) = self.refit.release_at
            && now >= at
        {
            self.refit.release_at = None;
            self.refit.suppress = false;
        }

        let nodes = self.layout_nodes();
        let moving = self.layout.step(&nodes, &self.visible_links, delta_seconds);
        if moving {
            self.scheduler.schedule();
        }

        let input = SceneInput {
            node_ids: &self.scene_order,
            links: &self.visible_links,
            positions: self.layout.positions(),
            mode: self.layout.mode(),
        };
        self.scheduler.frame(now, &input);

        if self.fit_requested {
            self.fit_requested = false;
            self.fit_to_view(rect);
        }

        moving
            || self.scheduler.animating()
            || self.op_pending()
            || self.refit.refit_at.is_some()
            || self.refit.release_at.is_some()
    }

    fn fit_to_view(&mut self, rect: Rect) {
        let Some((min, max)) = self
            .layout
            .bounds_of(self.scene_order.iter().map(String::as_str))
        else {
            return;
        };

        let size = max - min;
        let width = size.x.max(1.0) + 240.0;
        let height = size.y.max(1.0) + 240.0;
        let zoom = (rect.width() / width)
            .min(rect.height() / height)
            .clamp(0.05, 2.5);
        let center = (min + max) / 2.0;

        self.zoom = zoom;
        self.pan = -center * zoom;
    }
}
