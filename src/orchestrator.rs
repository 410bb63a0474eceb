//! Layer orchestration: the single owner of plot, layer and date selection
//!
//! The orchestrator is driven by UI events (`select_plot`, `select_layer`,
//! `page_date`, `select_legend_class`, `hover_coordinate`). Each event updates
//! the [`SelectionContext`], spawns whatever analysis fetch it needs and
//! rebuilds the [`MapSnapshot`]. Fetch results come back over a channel and
//! are applied in [`poll`](LayerOrchestrator::poll); a result whose plot, date
//! or generation no longer matches is discarded.
//!
//! ```text
//! Idle --select_plot--> Loading(kind) --result--> Ready(kind)
//!                          ^                          |
//!                          +-- plot / layer / page ---+
//! ```
//!
//! No operation returns an error. A failed fetch leaves that layer absent
//! (empty legend, no tile URL) and shows up in the snapshot's status message.

use crate::core::config::EngineConfig;
use crate::core::date::{Clock, DatePaginator, PageDirection, SystemClock};
use crate::core::geo::LatLng;
use crate::core::plot::Plot;
use crate::data::response::AnalysisResponse;
use crate::layers::{
    build_legend, AnalysisLayer, CoordinateMatcher, LayerKind, LegendRow, PlotBoundaryCache,
    TooltipEntry,
};
use crate::prelude::{Arc, HashMap};
use crate::runtime::{self, AsyncHandle};
use crate::source::{AnalysisRequest, AnalysisSource};
use crate::Result;
use chrono::NaiveDate;
use crossbeam_channel::{unbounded, Receiver, Sender};
use serde::Serialize;
use std::time::Duration;

/// Selection state shared with every consumer. Only the orchestrator writes it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectionContext {
    pub plot_id: Option<String>,
    pub active_layer: LayerKind,
    pub selected_legend_class: Option<&'static str>,
    /// Never later than today.
    pub current_end_date: NaiveDate,
    pub hovered_coordinate: Option<LatLng>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OrchestratorState {
    Idle,
    Loading(LayerKind),
    Ready(LayerKind),
}

/// Identifies one issued analysis fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    pub plot_id: String,
    pub kind: LayerKind,
    pub end_date: NaiveDate,
    pub generation: u64,
}

impl FetchTicket {
    fn request(&self) -> AnalysisRequest {
        AnalysisRequest::new(self.plot_id.clone(), self.kind, self.end_date)
    }
}

#[derive(Debug, Clone)]
pub enum SlotState {
    Loading { generation: u64 },
    Ready(AnalysisLayer),
    /// Fetch or parse failure; the layer renders nothing.
    Absent { reason: String },
}

/// One layer kind's data for the current plot at `end_date`.
#[derive(Debug, Clone)]
pub struct LayerSlot {
    pub end_date: NaiveDate,
    pub state: SlotState,
}

impl LayerSlot {
    pub fn layer(&self) -> Option<&AnalysisLayer> {
        match &self.state {
            SlotState::Ready(layer) => Some(layer),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.state, SlotState::Loading { .. })
    }
}

enum Completion {
    Analysis {
        ticket: FetchTicket,
        result: Result<AnalysisResponse>,
    },
    Plot {
        plot_id: String,
        generation: u64,
        result: Result<Plot>,
    },
}

/// A marker for one pixel of the selected legend class.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PixelMarker {
    pub coordinate: LatLng,
    pub label: &'static str,
    pub description: &'static str,
    pub percentage: u32,
    pub color: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlotSummary {
    pub plot_name: String,
    pub display_name: String,
    pub address: Option<String>,
}

/// Read-only view handed to the presentation layer after every transition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapSnapshot {
    pub state: OrchestratorState,
    pub active_layer: LayerKind,
    pub plot: Option<PlotSummary>,
    pub plot_area_acres: Option<f64>,
    pub tile_url: Option<String>,
    pub legend: Vec<LegendRow>,
    /// `[lon, lat]` ring of the plot outline.
    pub boundary_polygon: Option<Vec<[f64; 2]>>,
    pub selected_legend_class: Option<&'static str>,
    pub pixel_markers: Vec<PixelMarker>,
    pub tooltip: Option<Vec<TooltipEntry>>,
    pub current_end_date: NaiveDate,
    pub can_page_forward: bool,
    pub status_message: Option<String>,
}

struct PendingFetch {
    generation: u64,
    handle: Box<dyn AsyncHandle>,
}

pub struct LayerOrchestrator {
    config: EngineConfig,
    source: Arc<dyn AnalysisSource>,
    clock: Arc<dyn Clock>,
    paginator: DatePaginator,
    matcher: CoordinateMatcher,
    selection: SelectionContext,
    plot: Option<Plot>,
    plot_error: Option<String>,
    slots: HashMap<LayerKind, LayerSlot>,
    boundary: PlotBoundaryCache,
    pending: HashMap<LayerKind, PendingFetch>,
    pending_plot: Option<PendingFetch>,
    next_generation: u64,
    tx: Sender<Completion>,
    rx: Receiver<Completion>,
    snapshot: MapSnapshot,
}

impl LayerOrchestrator {
    pub fn new(source: Arc<dyn AnalysisSource>, config: EngineConfig) -> Result<Self> {
        Self::with_clock(source, config, Arc::new(SystemClock))
    }

    pub fn with_clock(
        source: Arc<dyn AnalysisSource>,
        config: EngineConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;
        let (tx, rx) = unbounded();
        let today = clock.today();
        let selection = SelectionContext {
            plot_id: None,
            active_layer: config.default_layer,
            selected_legend_class: None,
            current_end_date: today,
            hovered_coordinate: None,
        };
        let mut orchestrator = Self {
            paginator: DatePaginator::new(config.page_step_days),
            matcher: CoordinateMatcher::new(config.coordinate_tolerance_deg),
            config,
            source,
            clock,
            selection,
            plot: None,
            plot_error: None,
            slots: HashMap::default(),
            boundary: PlotBoundaryCache::new(),
            pending: HashMap::default(),
            pending_plot: None,
            next_generation: 0,
            tx,
            rx,
            snapshot: MapSnapshot {
                state: OrchestratorState::Idle,
                active_layer: LayerKind::Growth,
                plot: None,
                plot_area_acres: None,
                tile_url: None,
                legend: Vec::new(),
                boundary_polygon: None,
                selected_legend_class: None,
                pixel_markers: Vec::new(),
                tooltip: None,
                current_end_date: today,
                can_page_forward: false,
                status_message: None,
            },
        };
        orchestrator.refresh_snapshot();
        Ok(orchestrator)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn selection(&self) -> &SelectionContext {
        &self.selection
    }

    pub fn snapshot(&self) -> &MapSnapshot {
        &self.snapshot
    }

    pub fn plot(&self) -> Option<&Plot> {
        self.plot.as_ref()
    }

    pub fn slot(&self, kind: LayerKind) -> Option<&LayerSlot> {
        self.slots.get(&kind)
    }

    pub fn layer(&self, kind: LayerKind) -> Option<&AnalysisLayer> {
        self.slots.get(&kind).and_then(LayerSlot::layer)
    }

    pub fn boundary_cache(&self) -> &PlotBoundaryCache {
        &self.boundary
    }

    pub fn state(&self) -> OrchestratorState {
        if self.selection.plot_id.is_none() {
            return OrchestratorState::Idle;
        }
        let kind = self.selection.active_layer;
        match self.slots.get(&kind) {
            Some(slot) if slot.is_loading() => OrchestratorState::Loading(kind),
            _ => OrchestratorState::Ready(kind),
        }
    }

    /// Fetches still in flight, plot record included.
    pub fn in_flight(&self) -> usize {
        self.pending.len() + usize::from(self.pending_plot.is_some())
    }

    /// Switches to `plot_id`: date back to today, boundary and layers
    /// dropped, plot record and the active layer fetched.
    pub fn select_plot(&mut self, plot_id: impl Into<String>) {
        let plot_id = plot_id.into();
        log::info!("selecting plot {}", plot_id);

        self.cancel_all();
        self.slots.clear();
        self.boundary.clear();
        self.plot = None;
        self.plot_error = None;
        self.selection.plot_id = Some(plot_id.clone());
        self.selection.current_end_date = self.clock.today();
        self.selection.selected_legend_class = None;
        self.selection.hovered_coordinate = None;

        self.issue_plot_fetch(plot_id);
        self.issue_fetch(self.selection.active_layer);
        self.refresh_snapshot();
    }

    /// Makes `kind` the active layer and restarts time navigation at today.
    /// Fetches only when the kind has no usable data for the plot and date.
    pub fn select_layer(&mut self, kind: LayerKind) {
        log::debug!("selecting layer {}", kind);
        self.selection.active_layer = kind;
        self.selection.selected_legend_class = None;
        self.set_end_date(self.clock.today());

        if self.selection.plot_id.is_some() && self.needs_fetch(kind) {
            self.issue_fetch(kind);
        }
        self.refresh_snapshot();
    }

    /// Steps the end date and refetches the active layer. Forward steps clamp
    /// at today; a step that does not move the date does nothing.
    pub fn page_date(&mut self, direction: PageDirection) {
        let today = self.clock.today();
        let current = self.selection.current_end_date;
        let next = self.paginator.page(current, direction, today);
        if next == current {
            log::debug!("paging {:?} from {} is a no-op", direction, current);
            self.refresh_snapshot();
            return;
        }

        log::debug!("paging {:?}: {} -> {}", direction, current, next);
        self.set_end_date(next);
        if self.selection.plot_id.is_some() {
            self.issue_fetch(self.selection.active_layer);
        }
        self.refresh_snapshot();
    }

    /// Toggles the legend class used for pixel markers. Classes covering at
    /// least the isolate threshold cannot be selected.
    pub fn select_legend_class(&mut self, label: &str, percentage: f64) {
        if percentage >= self.config.isolate_coverage_threshold {
            log::debug!("class {} covers {}%, nothing to isolate", label, percentage);
            return;
        }
        let Some(class) = self.selection.active_layer.class(label) else {
            log::debug!("{} has no class {}", self.selection.active_layer, label);
            return;
        };
        self.selection.selected_legend_class = match self.selection.selected_legend_class {
            Some(selected) if selected == class.label => None,
            _ => Some(class.label),
        };
        self.refresh_snapshot();
    }

    pub fn hover_coordinate(&mut self, coordinate: Option<LatLng>) {
        self.selection.hovered_coordinate = coordinate;
        self.refresh_snapshot();
    }

    /// Applies every completed fetch. Returns true when anything changed.
    pub fn poll(&mut self) -> bool {
        let finished: Vec<LayerKind> = self
            .pending
            .iter()
            .filter(|(_, fetch)| fetch.handle.is_finished())
            .map(|(kind, _)| *kind)
            .collect();
        let plot_finished = self
            .pending_plot
            .as_ref()
            .map(|fetch| fetch.handle.is_finished())
            .unwrap_or(false);

        let mut changed = false;
        while let Ok(completion) = self.rx.try_recv() {
            changed |= match completion {
                Completion::Analysis { ticket, result } => self.apply_analysis(ticket, result),
                Completion::Plot {
                    plot_id,
                    generation,
                    result,
                } => self.apply_plot(&plot_id, generation, result),
            };
        }

        // tasks that ended (panicked or were aborted) without reporting
        for kind in finished {
            if let Some(fetch) = self.pending.remove(&kind) {
                log::warn!("{} fetch ended without a result", kind);
                if let Some(slot) = self.slots.get_mut(&kind) {
                    if matches!(slot.state, SlotState::Loading { generation } if generation == fetch.generation)
                    {
                        slot.state = SlotState::Absent {
                            reason: "fetch ended without a result".to_string(),
                        };
                    }
                }
                changed = true;
            }
        }
        if plot_finished && self.pending_plot.take().is_some() {
            self.plot_error = Some("plot record fetch ended without a result".to_string());
            changed = true;
        }

        if changed {
            self.refresh_snapshot();
        }
        changed
    }

    /// Polls until no fetch is in flight.
    pub async fn settle(&mut self) {
        let interval = Duration::from_millis(self.config.settle_poll_interval_ms);
        loop {
            self.poll();
            if self.in_flight() == 0 {
                break;
            }
            runtime::async_delay(interval).await;
        }
    }

    fn needs_fetch(&self, kind: LayerKind) -> bool {
        match self.slots.get(&kind) {
            None => true,
            Some(slot) => {
                slot.end_date != self.selection.current_end_date
                    || matches!(slot.state, SlotState::Absent { .. })
            }
        }
    }

    /// Moves the end date and drops layers that belong to another date.
    fn set_end_date(&mut self, date: NaiveDate) {
        if self.selection.current_end_date == date {
            return;
        }
        self.selection.current_end_date = date;
        let stale: Vec<LayerKind> = self
            .slots
            .iter()
            .filter(|(_, slot)| slot.end_date != date)
            .map(|(kind, _)| *kind)
            .collect();
        for kind in stale {
            self.slots.remove(&kind);
            if let Some(fetch) = self.pending.remove(&kind) {
                fetch.handle.cancel();
            }
        }
    }

    fn issue_fetch(&mut self, kind: LayerKind) {
        let Some(plot_id) = self.selection.plot_id.clone() else {
            return;
        };
        let end_date = self.selection.current_end_date;
        if let Some(slot) = self.slots.get(&kind) {
            if slot.is_loading() && slot.end_date == end_date {
                log::debug!("{} fetch for {} already in flight", kind, end_date);
                return;
            }
        }

        self.next_generation += 1;
        let ticket = FetchTicket {
            plot_id,
            kind,
            end_date,
            generation: self.next_generation,
        };
        // mark loading before spawning: a blocking spawner completes inline
        self.slots.insert(
            kind,
            LayerSlot {
                end_date,
                state: SlotState::Loading {
                    generation: ticket.generation,
                },
            },
        );
        if let Some(previous) = self.pending.remove(&kind) {
            previous.handle.cancel();
        }

        let request = ticket.request();
        log::debug!("fetching {} (generation {})", request, ticket.generation);
        let source = self.source.clone();
        let tx = self.tx.clone();
        let generation = ticket.generation;
        let handle = runtime::spawn(async move {
            let result = source.fetch_analysis(&request).await;
            let _ = tx.send(Completion::Analysis { ticket, result });
        });
        self.pending.insert(kind, PendingFetch { generation, handle });
    }

    fn issue_plot_fetch(&mut self, plot_id: String) {
        self.next_generation += 1;
        let generation = self.next_generation;
        let source = self.source.clone();
        let tx = self.tx.clone();
        let handle = runtime::spawn(async move {
            let result = source.fetch_plot(&plot_id).await;
            let _ = tx.send(Completion::Plot {
                plot_id,
                generation,
                result,
            });
        });
        self.pending_plot = Some(PendingFetch { generation, handle });
    }

    fn cancel_all(&mut self) {
        for (_, fetch) in self.pending.drain() {
            fetch.handle.cancel();
        }
        if let Some(fetch) = self.pending_plot.take() {
            fetch.handle.cancel();
        }
    }

    fn is_current(&self, ticket: &FetchTicket) -> bool {
        self.selection.plot_id.as_deref() == Some(ticket.plot_id.as_str())
            && self.selection.current_end_date == ticket.end_date
            && matches!(
                self.slots.get(&ticket.kind),
                Some(LayerSlot { end_date, state: SlotState::Loading { generation } })
                    if *end_date == ticket.end_date && *generation == ticket.generation
            )
    }

    fn apply_analysis(&mut self, ticket: FetchTicket, result: Result<AnalysisResponse>) -> bool {
        if !self.is_current(&ticket) {
            log::warn!(
                "discarding stale {} result for {} (generation {})",
                ticket.kind,
                ticket.end_date,
                ticket.generation
            );
            return false;
        }
        if self
            .pending
            .get(&ticket.kind)
            .map(|fetch| fetch.generation == ticket.generation)
            .unwrap_or(false)
        {
            self.pending.remove(&ticket.kind);
        }

        let state = match result {
            Ok(response) => {
                self.boundary.observe(&response);
                let layer = AnalysisLayer::from_response(ticket.kind, &response);
                log::info!(
                    "{} ready for {}: {} classes, {} pixels",
                    ticket.kind,
                    ticket.end_date,
                    layer.buckets.len(),
                    layer.pixel_count()
                );
                SlotState::Ready(layer)
            }
            Err(e) => {
                log::warn!("{} fetch for {} failed: {}", ticket.kind, ticket.end_date, e);
                SlotState::Absent {
                    reason: e.to_string(),
                }
            }
        };
        self.slots.insert(
            ticket.kind,
            LayerSlot {
                end_date: ticket.end_date,
                state,
            },
        );
        true
    }

    fn apply_plot(&mut self, plot_id: &str, generation: u64, result: Result<Plot>) -> bool {
        let current = self.selection.plot_id.as_deref() == Some(plot_id)
            && self
                .pending_plot
                .as_ref()
                .map(|fetch| fetch.generation == generation)
                .unwrap_or(false);
        if !current {
            log::warn!("discarding stale plot record for {}", plot_id);
            return false;
        }
        self.pending_plot = None;
        match result {
            Ok(plot) => {
                self.plot = Some(plot);
                self.plot_error = None;
            }
            Err(e) => {
                log::warn!("plot record for {} failed: {}", plot_id, e);
                self.plot_error = Some(format!("Plot details unavailable: {}", e));
            }
        }
        true
    }

    fn ready_layers(&self) -> impl Iterator<Item = &AnalysisLayer> + '_ {
        let date = self.selection.current_end_date;
        self.slots
            .values()
            .filter(move |slot| slot.end_date == date)
            .filter_map(LayerSlot::layer)
    }

    fn status_message(&self) -> Option<String> {
        self.selection.plot_id.as_ref()?;
        let kind = self.selection.active_layer;
        let date = self.selection.current_end_date;
        let layer_status = match self.slots.get(&kind).map(|slot| &slot.state) {
            Some(SlotState::Absent { reason }) => {
                Some(format!("{} unavailable: {}", kind.title(), reason))
            }
            Some(SlotState::Ready(layer)) if !layer.has_summary() => {
                Some(format!("No {} data up to {}", kind.title(), date))
            }
            Some(SlotState::Ready(layer)) if layer.tile_url.is_none() => {
                Some(format!("{} raster overlay unavailable", kind.title()))
            }
            _ => None,
        };
        layer_status.or_else(|| self.plot_error.clone())
    }

    fn pixel_markers(&self, active: Option<&AnalysisLayer>) -> Vec<PixelMarker> {
        let (Some(layer), Some(label)) = (active, self.selection.selected_legend_class) else {
            return Vec::new();
        };
        let Some(bucket) = layer.bucket(label) else {
            return Vec::new();
        };
        bucket
            .coordinates
            .iter()
            .map(|coordinate| PixelMarker {
                coordinate: *coordinate,
                label: bucket.class.label,
                description: bucket.class.description,
                percentage: bucket.rounded_percentage(),
                color: bucket.class.color,
            })
            .collect()
    }

    fn refresh_snapshot(&mut self) {
        let kind = self.selection.active_layer;
        let date = self.selection.current_end_date;
        let active = self.layer(kind).filter(|_| {
            self.slots
                .get(&kind)
                .map(|slot| slot.end_date == date)
                .unwrap_or(false)
        });

        let boundary_polygon = self
            .boundary
            .ring()
            .or_else(|| {
                self.plot
                    .as_ref()
                    .map(Plot::boundary_ring)
                    .filter(|ring| ring.len() >= 3)
            })
            .map(|ring| ring.iter().map(LatLng::to_lng_lat).collect());

        let plot_area_acres = active
            .and_then(|layer| layer.area_acres)
            .or_else(|| self.ready_layers().find_map(|layer| layer.area_acres))
            .or_else(|| self.plot.as_ref().and_then(Plot::area_acres));

        let plot = match (&self.plot, &self.selection.plot_id) {
            (Some(plot), _) => Some(PlotSummary {
                plot_name: plot.plot_name.clone(),
                display_name: plot.display_name(),
                address: plot.address.clone(),
            }),
            (None, Some(plot_id)) => Some(PlotSummary {
                plot_name: plot_id.clone(),
                display_name: plot_id.clone(),
                address: None,
            }),
            (None, None) => None,
        };

        let tooltip = self
            .selection
            .hovered_coordinate
            .map(|coordinate| self.matcher.find_all_layers(self.ready_layers(), &coordinate))
            .filter(|entries| !entries.is_empty());

        let snapshot = MapSnapshot {
            state: self.state(),
            active_layer: kind,
            plot,
            plot_area_acres,
            tile_url: active
                .and_then(|layer| layer.tile_url.as_ref())
                .map(|template| template.as_str().to_string()),
            legend: build_legend(kind, active),
            boundary_polygon,
            selected_legend_class: self.selection.selected_legend_class,
            pixel_markers: self.pixel_markers(active),
            tooltip,
            current_end_date: date,
            can_page_forward: self.paginator.can_step_forward(date, self.clock.today()),
            status_message: self.status_message(),
        };
        self.snapshot = snapshot;
    }
}

impl Drop for LayerOrchestrator {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
