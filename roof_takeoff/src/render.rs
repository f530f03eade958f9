//! Rendering boundary.
//!
//! Nothing here draws pixels. A [`RenderFrame`] carries everything a 2D canvas
//! needs for one redraw (screen-space outlines with their resolved styles) and
//! [`camera_framing`] / [`scene_faces`] feed a 3D scene.

use std::collections::HashSet;

use serde::Serialize;

use crate::geometry::{Point, Point3};
use crate::model::{FaceId, LineType, ReportModel};
use crate::styles::{line_type_style, view_colors, LineWeight, Rgba, StrokePattern};
use crate::view::ViewTransform;

/// Interaction state of a face, which decides its fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FaceState {
    Idle,
    Selected,
    /// Hovered and not selected: a click would add it.
    HoverAdd,
    /// Hovered and selected: a click would remove it.
    HoverRemove,
}

impl FaceState {
    pub fn from_flags(selected: bool, hovered: bool) -> Self {
        match (selected, hovered) {
            (true, true) => Self::HoverRemove,
            (true, false) => Self::Selected,
            (false, true) => Self::HoverAdd,
            (false, false) => Self::Idle,
        }
    }

    pub fn fill(&self) -> Rgba {
        match self {
            Self::Idle => Rgba::new(view_colors::UNSELECTED, 0.3),
            Self::Selected => Rgba::new(view_colors::SELECTED, 0.6),
            Self::HoverAdd => Rgba::new(view_colors::HOVER_ADD, 0.6),
            Self::HoverRemove => Rgba::new(view_colors::HOVER_REMOVE, 0.6),
        }
    }

    pub fn stroke(&self) -> Rgba {
        match self {
            Self::Idle => Rgba::new(view_colors::UNSELECTED, 0.5),
            Self::Selected => Rgba::new(view_colors::SELECTED, 0.9),
            Self::HoverAdd => Rgba::opaque(view_colors::HOVER_ADD),
            Self::HoverRemove => Rgba::opaque(view_colors::HOVER_REMOVE),
        }
    }

    pub fn stroke_width(&self) -> LineWeight {
        match self {
            Self::Idle => LineWeight(0.5),
            _ => LineWeight(2.0),
        }
    }

    /// Flat color used for the face in the 3D scene.
    pub fn scene_color(&self) -> [u8; 3] {
        match self {
            Self::Idle => view_colors::UNSELECTED,
            Self::Selected => view_colors::SELECTED,
            Self::HoverAdd => view_colors::HOVER_ADD,
            Self::HoverRemove => view_colors::HOVER_REMOVE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FaceRender {
    pub face_id: FaceId,
    /// Closed outline in screen pixels.
    pub outline: Vec<Point>,
    pub state: FaceState,
    pub fill: Rgba,
    pub stroke: Rgba,
    pub stroke_width: LineWeight,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineRender {
    pub line_id: String,
    pub line_type: LineType,
    pub start: Point,
    pub end: Point,
    /// Borders at least one selected face.
    pub selected: bool,
    /// Matches the highlighted line type.
    pub highlighted: bool,
    pub color: Rgba,
    pub width: LineWeight,
    pub pattern: StrokePattern,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabelRender {
    pub text: String,
    pub position: Point,
    pub color: [u8; 3],
}

/// Everything needed to draw one 2D frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderFrame {
    pub transform: ViewTransform,
    pub width: f64,
    pub height: f64,
    pub faces: Vec<FaceRender>,
    pub lines: Vec<LineRender>,
    pub labels: Vec<LabelRender>,
}

/// Inputs of a frame that change with interaction.
#[derive(Debug, Clone, Copy)]
pub struct FrameState<'a> {
    pub transform: ViewTransform,
    pub width: f64,
    pub height: f64,
    pub selected: &'a HashSet<FaceId>,
    pub hovered: &'a [FaceId],
    pub highlighted_type: Option<LineType>,
}

/// Builds the 2D frame for `model` in its current interaction state.
pub fn build_frame(model: &ReportModel, state: FrameState<'_>) -> RenderFrame {
    let t = state.transform;
    let hovered: HashSet<&str> = state.hovered.iter().map(String::as_str).collect();

    let faces = model
        .faces
        .values()
        .filter(|f| f.vertices.len() >= 2)
        .map(|f| {
            let face_state = FaceState::from_flags(
                state.selected.contains(&f.id),
                hovered.contains(f.id.as_str()),
            );
            FaceRender {
                face_id: f.id.clone(),
                outline: f.vertices.iter().map(|p| t.to_screen(*p)).collect(),
                state: face_state,
                fill: face_state.fill(),
                stroke: face_state.stroke(),
                stroke_width: face_state.stroke_width(),
            }
        })
        .collect();

    let lines = model
        .lines
        .values()
        .filter_map(|line| {
            let (a, b) = model.line_endpoints(line)?;
            let selected = model
                .faces_of_line(&line.id)
                .iter()
                .any(|id| state.selected.contains(id));
            let highlighted = state.highlighted_type == Some(line.line_type);
            let dimmed = state.highlighted_type.is_some() && !highlighted;
            let (width, pattern) = if selected {
                (LineWeight(3.0), StrokePattern::Solid)
            } else if highlighted {
                (LineWeight(4.0), StrokePattern::Solid)
            } else {
                (LineWeight::default(), StrokePattern::Dashed([10, 6]))
            };
            Some(LineRender {
                line_id: line.id.clone(),
                line_type: line.line_type,
                start: t.to_screen(a),
                end: t.to_screen(b),
                selected,
                highlighted,
                color: Rgba::new(
                    line_type_style(line.line_type).color,
                    if dimmed { 0.3 } else { 1.0 },
                ),
                width,
                pattern,
            })
        })
        .collect();

    let label_threshold = state.width.min(state.height) / 1000.0 * 0.5;
    let labels = if t.scale > label_threshold {
        model
            .faces
            .values()
            .filter(|f| !f.vertices.is_empty())
            .filter_map(|f| {
                let text = f.label.clone()?;
                Some(LabelRender {
                    text,
                    position: t.to_screen(f.centroid),
                    color: view_colors::LABEL,
                })
            })
            .collect()
    } else {
        Vec::new()
    };

    RenderFrame {
        transform: t,
        width: state.width,
        height: state.height,
        faces,
        lines,
        labels,
    }
}

/// Camera placement that frames the whole model from above.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CameraFraming {
    /// Center of the model extent, in model coordinates (z up).
    pub target: Point3,
    pub size: Point3,
    /// Distance at which the largest extent fills the field of view.
    pub distance: f64,
    /// Camera position, in model coordinates.
    pub eye: Point3,
    pub fov_degrees: f64,
}

pub const CAMERA_FOV_DEGREES: f64 = 50.0;
/// How far beyond the fitting distance the overview camera is pulled back.
pub const CAMERA_PULLBACK: f64 = 2.5;

/// Frames every point of `model` lifted into 3D. `None` without points.
pub fn camera_framing(model: &ReportModel) -> Option<CameraFraming> {
    let mut iter = model.points.values().map(|p| p.lifted());
    let first = iter.next()?;
    let (min, max) = iter.fold((first, first), |(lo, hi), p| {
        (
            Point3::new(lo.x.min(p.x), lo.y.min(p.y), lo.z.min(p.z)),
            Point3::new(hi.x.max(p.x), hi.y.max(p.y), hi.z.max(p.z)),
        )
    });
    let target = Point3::new(
        (min.x + max.x) / 2.0,
        (min.y + max.y) / 2.0,
        (min.z + max.z) / 2.0,
    );
    let size = Point3::new(max.x - min.x, max.y - min.y, max.z - min.z);
    let max_dim = size.x.max(size.y).max(size.z);
    let distance = max_dim / (2.0 * (CAMERA_FOV_DEGREES.to_radians() / 2.0).tan());
    Some(CameraFraming {
        target,
        size,
        distance,
        eye: Point3::new(target.x, target.y, target.z + distance * CAMERA_PULLBACK),
        fov_degrees: CAMERA_FOV_DEGREES,
    })
}

/// Converts a z-up model point to the y-up convention of most 3D scenes.
pub fn to_y_up(p: Point3) -> Point3 {
    Point3::new(p.x, p.z, -p.y)
}

/// A face of the 3D scene.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SceneFace {
    pub face_id: FaceId,
    pub vertices: Vec<Point3>,
    pub color: Rgba,
}

/// Lifted faces for a 3D scene, skipping faces without an area to fill.
pub fn scene_faces(
    model: &ReportModel,
    selected: &HashSet<FaceId>,
    hovered: Option<&str>,
) -> Vec<SceneFace> {
    model
        .eligible_faces()
        .map(|f| {
            let state = FaceState::from_flags(
                selected.contains(&f.id),
                hovered == Some(f.id.as_str()),
            );
            SceneFace {
                face_id: f.id.clone(),
                vertices: f.vertices_3d.clone(),
                color: Rgba::new(state.scene_color(), 0.7),
            }
        })
        .collect()
}
