//! Interactive face selection over a loaded report.
//!
//! A [`SelectionController`] owns everything that changes while an operator
//! works on one report: the selection, the view transform, hover state, a
//! pending overlap choice and the pointer gesture. Every change to the
//! selection bumps a revision and hands a fresh [`HostRecord`] to the sink.

use std::collections::HashSet;
use std::rc::Rc;

use chrono::Utc;
use log::{debug, info};
use serde::Serialize;

use crate::config::{InitialSelection, ViewerConfig};
use crate::error::ParseError;
use crate::geometry::{point_in_polygon, Point};
use crate::host::{HostRecord, HostSink, NullSink, RECORD_VERSION};
use crate::io::{parse_report, read_report};
use crate::measurement::{face_summary, selection_summary, total_area, FaceSummary, SummaryItem};
use crate::model::{FaceId, LineType, ReportModel};
use crate::render::{build_frame, scene_faces, FrameState, RenderFrame, SceneFace};
use crate::view::{ViewTransform, WHEEL_ZOOM_RATE};

/// Several faces lie under a click and the operator has to pick one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Disambiguation {
    /// Candidate faces with their display labels, smallest area first.
    pub candidates: Vec<(FaceId, String)>,
    /// Screen position of the click that produced the candidates.
    pub anchor: Point,
}

impl Disambiguation {
    pub fn contains(&self, face_id: &str) -> bool {
        self.candidates.iter().any(|(id, _)| id == face_id)
    }
}

#[derive(Debug, Clone)]
struct SelectionEntry {
    face_id: FaceId,
    summary: FaceSummary,
}

/// A pointer press that has not been released yet.
#[derive(Debug, Clone, Copy)]
struct Press {
    start: Point,
    start_offset_x: f64,
    start_offset_y: f64,
}

pub struct SelectionController<S: HostSink = NullSink> {
    model: Rc<ReportModel>,
    config: ViewerConfig,
    transform: ViewTransform,
    width: f64,
    height: f64,
    selection: Vec<SelectionEntry>,
    summary: Vec<SummaryItem>,
    hovered: Vec<FaceId>,
    pending: Option<Disambiguation>,
    press: Option<Press>,
    highlighted: Option<LineType>,
    revision: u64,
    sink: S,
}

impl<S: HostSink> SelectionController<S> {
    /// Fits the view to the model in the configured viewport and applies the
    /// configured initial selection.
    pub fn new(model: Rc<ReportModel>, config: ViewerConfig, sink: S) -> Self {
        let width = config.viewport_width;
        let height = config.viewport_height;
        let transform = ViewTransform::fit_to_bounds(model.bounds, width, height, config.padding);
        let mut controller = Self {
            model,
            config,
            transform,
            width,
            height,
            selection: Vec::new(),
            summary: Vec::new(),
            hovered: Vec::new(),
            pending: None,
            press: None,
            highlighted: None,
            revision: 0,
            sink,
        };
        if controller.config.initial_selection == InitialSelection::All {
            controller.select_all();
        }
        controller
    }

    pub fn model(&self) -> &Rc<ReportModel> {
        &self.model
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn transform(&self) -> ViewTransform {
        self.transform
    }

    pub fn viewport(&self) -> (f64, f64) {
        (self.width, self.height)
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Selected face ids in selection order.
    pub fn selected_ids(&self) -> Vec<&str> {
        self.selection.iter().map(|e| e.face_id.as_str()).collect()
    }

    pub fn is_selected(&self, face_id: &str) -> bool {
        self.selection.iter().any(|e| e.face_id == face_id)
    }

    /// Cached per-face summaries of the selection.
    pub fn face_summaries(&self) -> impl Iterator<Item = &FaceSummary> {
        self.selection.iter().map(|e| &e.summary)
    }

    /// Aggregate summary of the current selection.
    pub fn summary(&self) -> &[SummaryItem] {
        &self.summary
    }

    pub fn total_area(&self) -> f64 {
        total_area(self.selected_ids(), &self.model)
    }

    pub fn hovered(&self) -> &[FaceId] {
        &self.hovered
    }

    pub fn pending(&self) -> Option<&Disambiguation> {
        self.pending.as_ref()
    }

    pub fn highlighted_type(&self) -> Option<LineType> {
        self.highlighted
    }

    pub fn is_panning(&self) -> bool {
        self.press.is_some()
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Eligible faces containing the screen point, smallest area first and
    /// ties broken by id.
    pub fn hit_test(&self, sx: f64, sy: f64) -> Vec<FaceId> {
        let p = self.transform.to_data(sx, sy);
        let mut hits: Vec<(f64, &FaceId)> = self
            .model
            .eligible_faces()
            .filter(|f| f.bounds.map_or(true, |bb| bb.contains(p)))
            .filter(|f| point_in_polygon(p, &f.vertices))
            .map(|f| (f.area.unwrap_or(0.0), &f.id))
            .collect();
        hits.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.cmp(b.1)));
        hits.into_iter().map(|(_, id)| id.clone()).collect()
    }

    /// Handles a click at a screen position. One face under the click is
    /// toggled; several open a [`Disambiguation`] instead.
    pub fn click(&mut self, sx: f64, sy: f64) {
        let hits = self.hit_test(sx, sy);
        match hits.len() {
            0 => debug!("click at ({sx}, {sy}) hit no face"),
            1 => {
                self.toggle_face(&hits[0]);
            }
            n => {
                debug!("click at ({sx}, {sy}) hit {n} faces");
                let candidates = hits
                    .into_iter()
                    .map(|id| {
                        let label = self
                            .model
                            .faces
                            .get(&id)
                            .map(|f| f.display_label())
                            .unwrap_or_else(|| id.clone());
                        (id, label)
                    })
                    .collect();
                self.hovered.clear();
                self.pending = Some(Disambiguation {
                    candidates,
                    anchor: Point::new(sx, sy),
                });
            }
        }
    }

    /// Adds or removes one eligible face. Returns `false` for unknown or
    /// ineligible faces.
    pub fn toggle_face(&mut self, face_id: &str) -> bool {
        if let Some(pos) = self.selection.iter().position(|e| e.face_id == face_id) {
            self.selection.remove(pos);
        } else if !self.push_face(face_id) {
            return false;
        }
        self.publish();
        true
    }

    /// Toggles a face offered by the pending disambiguation and closes it.
    /// Ids that were not offered leave everything unchanged.
    pub fn resolve_disambiguation(&mut self, face_id: &str) -> bool {
        let offered = self.pending.as_ref().is_some_and(|p| p.contains(face_id));
        if !offered {
            return false;
        }
        self.pending = None;
        self.toggle_face(face_id)
    }

    pub fn dismiss_disambiguation(&mut self) {
        self.pending = None;
    }

    pub fn pointer_down(&mut self, sx: f64, sy: f64) {
        if self.pending.is_some() {
            return;
        }
        self.press = Some(Press {
            start: Point::new(sx, sy),
            start_offset_x: self.transform.offset_x,
            start_offset_y: self.transform.offset_y,
        });
    }

    /// Pans while a press is active, otherwise tracks the faces under the
    /// pointer.
    pub fn pointer_move(&mut self, sx: f64, sy: f64) {
        if let Some(press) = self.press {
            self.transform = ViewTransform::new(
                self.transform.scale,
                press.start_offset_x + sx - press.start.x,
                press.start_offset_y + sy - press.start.y,
            );
            self.hovered.clear();
        } else if self.pending.is_none() {
            self.hovered = self.hit_test(sx, sy);
        }
    }

    /// Ends a press. Travel below the click threshold on both axes counts as
    /// a click, anything else was a pan.
    pub fn pointer_up(&mut self, sx: f64, sy: f64) {
        let Some(press) = self.press.take() else {
            return;
        };
        let threshold = self.config.click_threshold;
        if (sx - press.start.x).abs() < threshold && (sy - press.start.y).abs() < threshold {
            self.click(sx, sy);
        }
    }

    pub fn pointer_leave(&mut self) {
        self.press = None;
        self.hovered.clear();
    }

    /// Ctrl+wheel (or a pinch) zooms at the cursor within the configured
    /// scale range, a plain wheel pans.
    pub fn wheel(&mut self, delta_x: f64, delta_y: f64, ctrl: bool, sx: f64, sy: f64) {
        if ctrl {
            self.transform.zoom_at_point_within(
                (-delta_y * WHEEL_ZOOM_RATE).exp(),
                sx,
                sy,
                self.config.min_scale,
                self.config.max_scale,
            );
        } else {
            self.transform.pan_by(-delta_x, -delta_y);
        }
    }

    /// Every eligible face is selected, and there is at least one.
    pub fn is_all_selected(&self) -> bool {
        let mut eligible = self.model.eligible_faces().peekable();
        eligible.peek().is_some() && eligible.all(|f| self.is_selected(&f.id))
    }

    /// Clears the selection when everything is selected, selects every
    /// eligible face otherwise.
    pub fn toggle_select_all(&mut self) {
        if self.is_all_selected() {
            self.clear_selection();
        } else {
            self.select_all();
        }
    }

    pub fn select_all(&mut self) {
        let model = Rc::clone(&self.model);
        let mut changed = false;
        for face in model.eligible_faces() {
            if !self.is_selected(&face.id) {
                changed |= self.push_face(&face.id);
            }
        }
        if changed {
            self.publish();
        }
    }

    pub fn clear_selection(&mut self) {
        if !self.selection.is_empty() {
            self.selection.clear();
            self.publish();
        }
    }

    /// Adds every eligible face bordering a line of `line_type`. Faces
    /// already selected stay selected.
    pub fn select_by_line_type(&mut self, line_type: LineType) {
        let model = Rc::clone(&self.model);
        let mut changed = false;
        for line in model.lines.values().filter(|l| l.line_type == line_type) {
            for face_id in model.faces_of_line(&line.id) {
                if !self.is_selected(face_id) {
                    changed |= self.push_face(face_id);
                }
            }
        }
        if changed {
            self.publish();
        }
    }

    /// Highlights `line_type`, or removes the highlight if it was active.
    pub fn toggle_highlighted_type(&mut self, line_type: LineType) {
        self.highlighted = if self.highlighted == Some(line_type) {
            None
        } else {
            Some(line_type)
        };
    }

    /// Refits the view to the model.
    pub fn reset_view(&mut self) {
        self.transform = ViewTransform::fit_to_bounds(
            self.model.bounds,
            self.width,
            self.height,
            self.config.padding,
        );
    }

    pub fn resize(&mut self, width: f64, height: f64) {
        self.width = width;
        self.height = height;
        self.reset_view();
    }

    pub fn zoom_in(&mut self) {
        self.zoom_by(self.config.zoom_step);
    }

    pub fn zoom_out(&mut self) {
        self.zoom_by(1.0 / self.config.zoom_step);
    }

    fn zoom_by(&mut self, factor: f64) {
        self.transform.zoom_at_center(
            factor,
            self.width,
            self.height,
            self.config.min_scale,
            self.config.max_scale,
        );
    }

    /// 2D frame of the current state.
    pub fn frame(&self) -> RenderFrame {
        let selected: HashSet<FaceId> = self.selection.iter().map(|e| e.face_id.clone()).collect();
        build_frame(
            &self.model,
            FrameState {
                transform: self.transform,
                width: self.width,
                height: self.height,
                selected: &selected,
                hovered: &self.hovered,
                highlighted_type: self.highlighted,
            },
        )
    }

    /// Faces of the 3D scene with the current selection applied.
    pub fn scene(&self, hovered: Option<&str>) -> Vec<SceneFace> {
        let selected: HashSet<FaceId> = self.selection.iter().map(|e| e.face_id.clone()).collect();
        scene_faces(&self.model, &selected, hovered)
    }

    /// Record describing the current selection.
    pub fn host_record(&self) -> HostRecord {
        HostRecord {
            version: RECORD_VERSION,
            selected_faces: self.face_summaries().cloned().collect(),
            total_area: self.total_area(),
            line_summary: self.summary.clone(),
            all_selected: self.is_all_selected(),
            revision: self.revision,
            timestamp: Utc::now(),
        }
    }

    fn push_face(&mut self, face_id: &str) -> bool {
        let eligible = self.model.faces.get(face_id).is_some_and(|f| f.is_eligible());
        if !eligible {
            debug!("face {face_id} cannot be selected");
            return false;
        }
        match face_summary(face_id, &self.model) {
            Some(summary) => {
                self.selection.push(SelectionEntry {
                    face_id: face_id.to_string(),
                    summary,
                });
                true
            }
            None => false,
        }
    }

    fn publish(&mut self) {
        self.revision += 1;
        self.summary = selection_summary(self.selected_ids(), &self.model);
        debug!(
            "selection revision {}: {} faces",
            self.revision,
            self.selection.len()
        );
        let record = self.host_record();
        self.sink.deliver(&record);
    }
}

/// The report currently open, if any.
///
/// Loading builds a new model and controller and drops the previous ones.
/// The sink is carried from one controller to the next.
pub struct Session<S: HostSink + Default = NullSink> {
    config: ViewerConfig,
    sink: S,
    controller: Option<SelectionController<S>>,
}

impl<S: HostSink + Default> Session<S> {
    pub fn new(config: ViewerConfig, sink: S) -> Self {
        Self {
            config,
            sink,
            controller: None,
        }
    }

    /// Parses `xml` and replaces the open report. A failed parse leaves the
    /// open report untouched.
    pub fn load(&mut self, xml: &str) -> Result<&mut SelectionController<S>, ParseError> {
        let model = parse_report(xml)?;
        Ok(self.install(model))
    }

    pub fn load_file(&mut self, path: &str) -> Result<&mut SelectionController<S>, ParseError> {
        let model = read_report(path)?;
        Ok(self.install(model))
    }

    /// Closes the open report.
    pub fn clear(&mut self) {
        if let Some(controller) = self.controller.take() {
            info!("closing report");
            self.sink = Self::retire(controller);
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.controller.is_some()
    }

    pub fn controller(&self) -> Option<&SelectionController<S>> {
        self.controller.as_ref()
    }

    pub fn controller_mut(&mut self) -> Option<&mut SelectionController<S>> {
        self.controller.as_mut()
    }

    pub fn sink(&self) -> &S {
        match &self.controller {
            Some(controller) => controller.sink(),
            None => &self.sink,
        }
    }

    fn install(&mut self, model: ReportModel) -> &mut SelectionController<S> {
        let sink = match self.controller.take() {
            Some(previous) => Self::retire(previous),
            None => std::mem::take(&mut self.sink),
        };
        let controller = SelectionController::new(Rc::new(model), self.config.clone(), sink);
        self.controller.insert(controller)
    }

    /// Tells the host the outgoing selection is gone, then hands back the sink.
    fn retire(mut controller: SelectionController<S>) -> S {
        controller.clear_selection();
        controller.into_sink()
    }
}
