//! Report model built from one loaded roof export.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::geometry::{distance, BoundingBox, Point, Point3};

/// Identifier of a face as it appears in the export.
pub type FaceId = String;

/// Semantic role of a roof boundary segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LineType {
    Eave,
    Rake,
    Ridge,
    Valley,
    Flashing,
    #[serde(rename = "STEPFLASH")]
    StepFlash,
    Parapet,
    Hip,
    Other,
}

impl LineType {
    pub const ALL: [LineType; 9] = [
        LineType::Eave,
        LineType::Rake,
        LineType::Ridge,
        LineType::Valley,
        LineType::Flashing,
        LineType::StepFlash,
        LineType::Parapet,
        LineType::Hip,
        LineType::Other,
    ];

    /// Parses an export type token. Case insensitive, unknown tokens map to
    /// [`LineType::Other`].
    pub fn from_token(token: &str) -> Self {
        match token.trim().to_ascii_uppercase().as_str() {
            "EAVE" => Self::Eave,
            "RAKE" => Self::Rake,
            "RIDGE" => Self::Ridge,
            "VALLEY" => Self::Valley,
            "FLASHING" => Self::Flashing,
            "STEPFLASH" => Self::StepFlash,
            "PARAPET" => Self::Parapet,
            "HIP" => Self::Hip,
            _ => Self::Other,
        }
    }

    /// Token used by the export for this type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eave => "EAVE",
            Self::Rake => "RAKE",
            Self::Ridge => "RIDGE",
            Self::Valley => "VALLEY",
            Self::Flashing => "FLASHING",
            Self::StepFlash => "STEPFLASH",
            Self::Parapet => "PARAPET",
            Self::Hip => "HIP",
            Self::Other => "OTHER",
        }
    }

    /// Name of the overall summary attribute holding the authoritative
    /// sloped total for this type, if the export carries one.
    pub fn summary_key(&self) -> Option<&'static str> {
        match self {
            Self::Rake => Some("TotalRakesLength"),
            Self::StepFlash => Some("TotalStepFlashingLength"),
            Self::Flashing => Some("TotalFlashingLength"),
            Self::Hip => Some("TotalHipsLength"),
            Self::Ridge => Some("TotalRidgesLength"),
            Self::Valley => Some("TotalValleysLength"),
            _ => None,
        }
    }
}

impl fmt::Display for LineType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A roof vertex. `z` is absent in most plan exports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoofPoint {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub z: Option<f64>,
}

impl RoofPoint {
    pub fn new(id: impl Into<String>, x: f64, y: f64, z: Option<f64>) -> Self {
        Self {
            id: id.into(),
            x,
            y,
            z,
        }
    }

    pub fn plan(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Lifts the point into 3D with a zero elevation when none was given.
    pub fn lifted(&self) -> Point3 {
        Point3::new(self.x, self.y, self.z.unwrap_or(0.0))
    }
}

/// A boundary segment between two points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoofLine {
    pub id: String,
    pub point1_id: String,
    pub point2_id: String,
    pub line_type: LineType,
}

impl RoofLine {
    pub fn new(
        id: impl Into<String>,
        point1_id: impl Into<String>,
        point2_id: impl Into<String>,
        line_type: LineType,
    ) -> Self {
        Self {
            id: id.into(),
            point1_id: point1_id.into(),
            point2_id: point2_id.into(),
            line_type,
        }
    }
}

/// A planar roof surface.
///
/// The geometric fields are empty until [`crate::polygon::reconstruct_faces`]
/// has run over the owning model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Face {
    pub id: FaceId,
    pub label: Option<String>,
    /// Boundary lines in export order, not necessarily a traversal order.
    pub line_ids: Vec<String>,
    /// Rise per 12 units of run.
    pub pitch: Option<f64>,
    pub area: Option<f64>,
    pub ordered_point_ids: Vec<String>,
    pub vertices: Vec<Point>,
    pub vertices_3d: Vec<Point3>,
    pub centroid: Point,
    pub bounds: Option<BoundingBox>,
    /// Set when the boundary edges did not chain into a single loop.
    pub partial_loop: bool,
}

impl Face {
    pub fn new(
        id: impl Into<String>,
        label: Option<String>,
        line_ids: Vec<String>,
        pitch: Option<f64>,
        area: Option<f64>,
    ) -> Self {
        Self {
            id: id.into(),
            label,
            line_ids,
            pitch,
            area,
            ordered_point_ids: Vec::new(),
            vertices: Vec::new(),
            vertices_3d: Vec::new(),
            centroid: Point::new(0.0, 0.0),
            bounds: None,
            partial_loop: false,
        }
    }

    /// Faces with fewer than three vertices take no part in hit testing.
    pub fn is_eligible(&self) -> bool {
        self.vertices.len() >= 3
    }

    /// Label to show the operator, falling back to the id.
    pub fn display_label(&self) -> String {
        match &self.label {
            Some(label) => label.clone(),
            None => format!("Face ID: {}", self.id),
        }
    }
}

/// The graph of points, lines and faces of one export.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportModel {
    pub points: BTreeMap<String, RoofPoint>,
    pub lines: BTreeMap<String, RoofLine>,
    pub faces: BTreeMap<FaceId, Face>,
    /// Faces listing each line on their boundary.
    pub line_faces: BTreeMap<String, Vec<FaceId>>,
    pub bounds: Option<BoundingBox>,
    /// Overall summary attributes of the export.
    pub summary: BTreeMap<String, f64>,
    /// Flat plan length of every line, accumulated by type.
    pub flat_totals: BTreeMap<LineType, f64>,
}

impl ReportModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the plan endpoints of `line`, `None` if either point is unknown.
    pub fn line_endpoints(&self, line: &RoofLine) -> Option<(Point, Point)> {
        let p1 = self.points.get(&line.point1_id)?;
        let p2 = self.points.get(&line.point2_id)?;
        Some((p1.plan(), p2.plan()))
    }

    /// Flat plan length of `line`, zero when an endpoint is missing.
    pub fn flat_length(&self, line: &RoofLine) -> f64 {
        self.line_endpoints(line)
            .map(|(a, b)| distance(a, b))
            .unwrap_or(0.0)
    }

    pub fn faces_of_line(&self, line_id: &str) -> &[FaceId] {
        self.line_faces
            .get(line_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Authoritative sloped total for `line_type` from the overall summary.
    pub fn authoritative_total(&self, line_type: LineType) -> Option<f64> {
        line_type
            .summary_key()
            .and_then(|key| self.summary.get(key).copied())
    }

    pub fn flat_total(&self, line_type: LineType) -> Option<f64> {
        self.flat_totals.get(&line_type).copied()
    }

    pub fn eligible_faces(&self) -> impl Iterator<Item = &Face> {
        self.faces.values().filter(|f| f.is_eligible())
    }

    /// Recomputes the model bounding box and the per-type flat totals.
    pub fn compute_totals(&mut self) {
        let mut totals = BTreeMap::new();
        for line in self.lines.values() {
            if let Some((a, b)) = self.line_endpoints(line) {
                *totals.entry(line.line_type).or_insert(0.0) += distance(a, b);
            }
        }
        self.flat_totals = totals;
        self.bounds = BoundingBox::from_points(self.points.values().map(RoofPoint::plan));
    }
}
