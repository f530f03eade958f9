//! Slope-corrected measurement summaries for a set of roof faces.
//!
//! Plan lengths are converted to true lengths per line type:
//!
//! * rakes and flashings are scaled by the ratio of the export's
//!   authoritative sloped total to the model's plan total for that type,
//! * eaves and parapets are horizontal and keep their plan length,
//! * hips, valleys, ridges and unknown types use the pitch of the bordering
//!   faces with the rise/run multiplier `sqrt(p² + 144) / 12`.

use std::collections::{BTreeMap, HashSet};

use log::trace;
use serde::{Deserialize, Serialize};

use crate::model::{Face, LineType, ReportModel, RoofLine};
use crate::styles::{line_type_style, to_hex, PITCH_COLOR, TOTAL_AREA_COLOR};

pub const LENGTH_UNIT: &str = "ft";
pub const AREA_UNIT: &str = "sq ft";
pub const PITCH_UNIT: &str = "/ 12";
pub const TOTAL_AREA_NAME: &str = "Total Area";
pub const PITCH_NAME: &str = "Pitch";

/// What a summary entry measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryKind {
    Line(LineType),
    TotalArea,
    Pitch,
}

impl SummaryKind {
    /// Recovers the kind from a row's display name. Unknown names are
    /// treated as lines of type [`LineType::Other`].
    pub fn from_name(name: &str) -> Self {
        match name {
            TOTAL_AREA_NAME => Self::TotalArea,
            PITCH_NAME => Self::Pitch,
            _ => Self::Line(
                LineType::ALL
                    .into_iter()
                    .find(|t| line_type_style(*t).name == name)
                    .unwrap_or(LineType::Other),
            ),
        }
    }
}

/// One row of a measurement summary.
///
/// The kind is not serialized; it is rebuilt from the name when a row is
/// read back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "SummaryRow")]
pub struct SummaryItem {
    #[serde(skip_serializing)]
    pub kind: SummaryKind,
    pub name: String,
    pub length: f64,
    pub color: String,
    pub unit: String,
}

/// Serialized form of a [`SummaryItem`].
#[derive(Deserialize)]
struct SummaryRow {
    name: String,
    length: f64,
    color: String,
    unit: String,
}

impl From<SummaryRow> for SummaryItem {
    fn from(row: SummaryRow) -> Self {
        Self {
            kind: SummaryKind::from_name(&row.name),
            name: row.name,
            length: row.length,
            color: row.color,
            unit: row.unit,
        }
    }
}

impl SummaryItem {
    fn line(line_type: LineType, length: f64) -> Self {
        let style = line_type_style(line_type);
        Self {
            kind: SummaryKind::Line(line_type),
            name: style.name.to_string(),
            length: round2(length),
            color: to_hex(style.color),
            unit: LENGTH_UNIT.to_string(),
        }
    }

    fn total_area(area: f64) -> Self {
        Self {
            kind: SummaryKind::TotalArea,
            name: TOTAL_AREA_NAME.to_string(),
            length: round2(area),
            color: to_hex(TOTAL_AREA_COLOR),
            unit: AREA_UNIT.to_string(),
        }
    }

    fn pitch(pitch: f64) -> Self {
        Self {
            kind: SummaryKind::Pitch,
            name: PITCH_NAME.to_string(),
            length: pitch,
            color: to_hex(PITCH_COLOR),
            unit: PITCH_UNIT.to_string(),
        }
    }

    pub fn is_line(&self) -> bool {
        matches!(self.kind, SummaryKind::Line(_))
    }
}

/// Measurement breakdown of a single face.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaceSummary {
    pub face_id: String,
    pub face_label: Option<String>,
    pub pitch: Option<f64>,
    pub area: Option<f64>,
    /// Line entries only; the area and pitch rows are carried by the fields
    /// above.
    #[serde(rename = "faceSummary")]
    pub line_summary: Vec<SummaryItem>,
}

/// Rounds to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Rise/run slope multiplier for a pitch given as rise per 12 of run.
pub fn pitch_multiplier(pitch: f64) -> f64 {
    (pitch * pitch + 144.0).sqrt() / 12.0
}

/// Summarizes the faces in `face_ids` against `model`.
///
/// Line entries are sorted by display name and followed by `Total Area`
/// when the selected area is positive and by `Pitch` when any selected face
/// has one. The pitch row reports the last selected face carrying a pitch,
/// not an average. A line bordering several selected faces is counted once.
pub fn selection_summary<'a, I>(face_ids: I, model: &ReportModel) -> Vec<SummaryItem>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut totals: BTreeMap<LineType, f64> = BTreeMap::new();
    let mut seen_faces: HashSet<&str> = HashSet::new();
    let mut processed_lines: HashSet<&str> = HashSet::new();
    let mut total_area = 0.0;
    let mut last_pitch = None;

    for face_id in face_ids {
        if !seen_faces.insert(face_id) {
            continue;
        }
        let Some(face) = model.faces.get(face_id) else {
            continue;
        };
        if let Some(area) = face.area.filter(|a| *a > 0.0) {
            total_area += area;
        }
        if let Some(pitch) = face.pitch.filter(|p| *p != 0.0) {
            last_pitch = Some(pitch);
        }
        for line_id in &face.line_ids {
            if !processed_lines.insert(line_id.as_str()) {
                continue;
            }
            let Some(line) = model.lines.get(line_id) else {
                continue;
            };
            let Some(length) = true_length(line, face, model) else {
                continue;
            };
            *totals.entry(line.line_type).or_insert(0.0) += length;
        }
    }

    let mut items: Vec<SummaryItem> = totals
        .into_iter()
        .map(|(line_type, length)| SummaryItem::line(line_type, length))
        .collect();
    items.sort_by(|a, b| a.name.cmp(&b.name));
    if total_area > 0.0 {
        items.push(SummaryItem::total_area(total_area));
    }
    if let Some(pitch) = last_pitch {
        items.push(SummaryItem::pitch(pitch));
    }
    items
}

/// Sloped length of `line` reached while visiting `face`, `None` when an
/// endpoint is missing.
pub fn true_length(line: &RoofLine, face: &Face, model: &ReportModel) -> Option<f64> {
    let (a, b) = model.line_endpoints(line)?;
    let flat = crate::geometry::distance(a, b);
    let length = match line.line_type {
        LineType::Rake | LineType::Flashing | LineType::StepFlash => {
            let flat_total = model.flat_total(line.line_type).filter(|t| *t > 0.0);
            let sloped_total = model
                .authoritative_total(line.line_type)
                .filter(|t| *t != 0.0);
            match (flat_total, sloped_total) {
                (Some(flat_total), Some(sloped_total)) => sloped_total * (flat / flat_total),
                _ => {
                    trace!("line {}: no sloped total, using plan length", line.id);
                    flat
                }
            }
        }
        LineType::Eave | LineType::Parapet => flat,
        LineType::Hip | LineType::Valley | LineType::Ridge | LineType::Other => {
            let pitch = effective_pitch(&line.id, model)
                .unwrap_or_else(|| face.pitch.unwrap_or(0.0));
            if pitch > 0.0 {
                flat * pitch_multiplier(pitch)
            } else {
                trace!("line {}: no pitch, using plan length", line.id);
                flat
            }
        }
    };
    Some(length)
}

/// Mean positive pitch of the faces bordering `line_id`.
pub fn effective_pitch(line_id: &str, model: &ReportModel) -> Option<f64> {
    let pitches: Vec<f64> = model
        .faces_of_line(line_id)
        .iter()
        .filter_map(|id| model.faces.get(id))
        .filter_map(|f| f.pitch)
        .filter(|p| *p > 0.0)
        .collect();
    if pitches.is_empty() {
        None
    } else {
        Some(pitches.iter().sum::<f64>() / pitches.len() as f64)
    }
}

/// Breakdown of a single face, `None` if the face is unknown.
pub fn face_summary(face_id: &str, model: &ReportModel) -> Option<FaceSummary> {
    let face = model.faces.get(face_id)?;
    let line_summary = selection_summary([face_id], model)
        .into_iter()
        .filter(SummaryItem::is_line)
        .collect();
    Some(FaceSummary {
        face_id: face.id.clone(),
        face_label: face.label.clone(),
        pitch: face.pitch,
        area: face.area,
        line_summary,
    })
}

/// Unrounded sum of the areas of the selected faces.
pub fn total_area<'a, I>(face_ids: I, model: &ReportModel) -> f64
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen = HashSet::new();
    face_ids
        .into_iter()
        .filter(|id| seen.insert(*id))
        .filter_map(|id| model.faces.get(id))
        .filter_map(|f| f.area)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{RoofPoint, RoofLine};
    use crate::polygon::reconstruct_faces;

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn add_point(model: &mut ReportModel, id: &str, x: f64, y: f64) {
        model.points.insert(id.into(), RoofPoint::new(id, x, y, None));
    }

    fn add_line(model: &mut ReportModel, id: &str, a: &str, b: &str, t: LineType) {
        model.lines.insert(id.into(), RoofLine::new(id, a, b, t));
    }

    fn add_face(model: &mut ReportModel, id: &str, lines: &[&str], pitch: Option<f64>) {
        for l in lines {
            model
                .line_faces
                .entry(l.to_string())
                .or_default()
                .push(id.to_string());
        }
        model
            .faces
            .insert(id.into(), Face::new(id, None, ids(lines), pitch, None));
    }

    fn finish(mut model: ReportModel) -> ReportModel {
        model.compute_totals();
        reconstruct_faces(&mut model);
        model
    }

    fn unit_square(line_type: LineType, pitch: Option<f64>) -> ReportModel {
        let mut m = ReportModel::new();
        add_point(&mut m, "a", 0.0, 0.0);
        add_point(&mut m, "b", 1.0, 0.0);
        add_point(&mut m, "c", 1.0, 1.0);
        add_point(&mut m, "d", 0.0, 1.0);
        add_line(&mut m, "ab", "a", "b", line_type);
        add_line(&mut m, "bc", "b", "c", line_type);
        add_line(&mut m, "cd", "c", "d", line_type);
        add_line(&mut m, "da", "d", "a", line_type);
        add_face(&mut m, "f", &["ab", "bc", "cd", "da"], pitch);
        finish(m)
    }

    /// Two 10x5 rectangles sharing a ridge along y = 5.
    fn gable(pitch_a: Option<f64>, pitch_b: Option<f64>) -> ReportModel {
        let mut m = ReportModel::new();
        add_point(&mut m, "p1", 0.0, 0.0);
        add_point(&mut m, "p2", 10.0, 0.0);
        add_point(&mut m, "p3", 10.0, 5.0);
        add_point(&mut m, "p4", 0.0, 5.0);
        add_point(&mut m, "p5", 10.0, 10.0);
        add_point(&mut m, "p6", 0.0, 10.0);
        add_line(&mut m, "e1", "p1", "p2", LineType::Eave);
        add_line(&mut m, "r1", "p2", "p3", LineType::Rake);
        add_line(&mut m, "ridge", "p3", "p4", LineType::Ridge);
        add_line(&mut m, "r2", "p4", "p1", LineType::Rake);
        add_line(&mut m, "r3", "p3", "p5", LineType::Rake);
        add_line(&mut m, "e2", "p5", "p6", LineType::Eave);
        add_line(&mut m, "r4", "p6", "p4", LineType::Rake);
        add_face(&mut m, "south", &["e1", "r1", "ridge", "r2"], pitch_a);
        add_face(&mut m, "north", &["ridge", "r3", "e2", "r4"], pitch_b);
        finish(m)
    }

    fn find<'a>(items: &'a [SummaryItem], name: &str) -> Option<&'a SummaryItem> {
        items.iter().find(|i| i.name == name)
    }

    #[test]
    fn unit_square_eaves() {
        let model = unit_square(LineType::Eave, None);
        let items = selection_summary(["f"], &model);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].name, "Eave");
        assert_eq!(items[0].length, 4.0);
        assert_eq!(items[0].unit, "ft");
        assert_eq!(items[1].kind, SummaryKind::TotalArea);
        assert_eq!(items[1].length, 1.0);
    }

    #[test]
    fn empty_selection() {
        let model = unit_square(LineType::Eave, None);
        assert!(selection_summary(Vec::<&str>::new(), &model).is_empty());
        assert_eq!(total_area(Vec::<&str>::new(), &model), 0.0);
        assert!(selection_summary(["missing"], &model).is_empty());
    }

    #[test]
    fn ridge_uses_mean_of_bordering_pitches() {
        let model = gable(Some(6.0), Some(8.0));
        let items = selection_summary(["south"], &model);
        let ridge = find(&items, "Ridge").unwrap();
        let expected = 10.0 * (49.0f64 + 144.0).sqrt() / 12.0;
        assert!((ridge.length - round2(expected)).abs() < 1e-9);
        assert!((ridge.length - 11.58).abs() < 1e-9);
    }

    #[test]
    fn ridge_of_ten_with_pitches_six_and_eight() {
        let model = gable(Some(6.0), Some(8.0));
        let line = &model.lines["ridge"];
        let len = true_length(line, &model.faces["south"], &model).unwrap();
        assert!((len - 10.0 * pitch_multiplier(7.0)).abs() < 1e-9);
        assert!((round2(len) - 11.58).abs() < 1e-9);
    }

    #[test]
    fn ridge_without_any_pitch_is_flat() {
        let model = gable(None, None);
        let items = selection_summary(["south"], &model);
        assert_eq!(find(&items, "Ridge").unwrap().length, 10.0);
        assert!(find(&items, PITCH_NAME).is_none());
    }

    #[test]
    fn ridge_ignores_zero_pitch_neighbours() {
        let model = gable(Some(0.0), Some(12.0));
        let items = selection_summary(["south"], &model);
        let expected = round2(10.0 * pitch_multiplier(12.0));
        assert_eq!(find(&items, "Ridge").unwrap().length, expected);
    }

    #[test]
    fn shared_ridge_counted_once() {
        let model = gable(Some(6.0), Some(6.0));
        let both = selection_summary(["south", "north"], &model);
        let one = selection_summary(["south"], &model);
        assert_eq!(
            find(&both, "Ridge").unwrap().length,
            find(&one, "Ridge").unwrap().length
        );
        assert_eq!(find(&both, "Eave").unwrap().length, 20.0);
        assert_eq!(find(&both, TOTAL_AREA_NAME).unwrap().length, 100.0);
    }

    #[test]
    fn rake_without_summary_total_is_flat() {
        let model = gable(Some(6.0), Some(6.0));
        let items = selection_summary(["south"], &model);
        assert_eq!(find(&items, "Rake").unwrap().length, 10.0);
    }

    #[test]
    fn rake_scaled_by_authoritative_total() {
        let mut model = gable(Some(6.0), Some(6.0));
        // plan total of the four rakes is 20
        model.summary.insert("TotalRakesLength".into(), 30.0);
        let items = selection_summary(["south"], &model);
        assert_eq!(find(&items, "Rake").unwrap().length, 15.0);
        let all = selection_summary(["south", "north"], &model);
        assert_eq!(find(&all, "Rake").unwrap().length, 30.0);
    }

    #[test]
    fn entries_sorted_by_name_then_area_and_pitch() {
        let model = gable(Some(6.0), Some(6.0));
        let items = selection_summary(["south"], &model);
        let names: Vec<&str> = items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["Eave", "Rake", "Ridge", "Total Area", "Pitch"]);
    }

    #[test]
    fn pitch_entry_is_last_face_not_average() {
        // Known quirk: the pitch row follows selection order.
        let model = gable(Some(6.0), Some(8.0));
        let a = selection_summary(["south", "north"], &model);
        let b = selection_summary(["north", "south"], &model);
        assert_eq!(find(&a, PITCH_NAME).unwrap().length, 8.0);
        assert_eq!(find(&b, PITCH_NAME).unwrap().length, 6.0);
    }

    #[test]
    fn summary_is_idempotent() {
        let model = gable(Some(6.0), Some(8.0));
        let first = selection_summary(["south", "north"], &model);
        let second = selection_summary(["south", "north"], &model);
        assert_eq!(first, second);
    }

    #[test]
    fn single_face_total_area_matches_face() {
        let model = gable(Some(6.0), Some(8.0));
        let items = selection_summary(["north"], &model);
        let area = model.faces["north"].area.unwrap();
        assert_eq!(find(&items, TOTAL_AREA_NAME).unwrap().length, round2(area));
    }

    #[test]
    fn duplicate_ids_are_ignored() {
        let model = gable(Some(6.0), Some(8.0));
        assert_eq!(
            selection_summary(["south", "south"], &model),
            selection_summary(["south"], &model)
        );
        assert_eq!(total_area(["south", "south"], &model), 50.0);
    }

    #[test]
    fn face_summary_drops_area_and_pitch_rows() {
        let model = gable(Some(6.0), Some(8.0));
        let summary = face_summary("south", &model).unwrap();
        assert_eq!(summary.pitch, Some(6.0));
        assert_eq!(summary.area, Some(50.0));
        assert!(summary.line_summary.iter().all(SummaryItem::is_line));
        assert_eq!(summary.line_summary.len(), 3);
        assert!(face_summary("nope", &model).is_none());
    }

    #[test]
    fn summary_item_json_shape() {
        let model = unit_square(LineType::Eave, None);
        let items = selection_summary(["f"], &model);
        let json = serde_json::to_value(&items[0]).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"name": "Eave", "length": 4.0, "color": "#007BFF", "unit": "ft"})
        );
    }

    #[test]
    fn summary_items_read_back_with_their_kind() {
        let model = unit_square(LineType::Eave, Some(6.0));
        let items = selection_summary(["f"], &model);
        let kinds: Vec<SummaryKind> = items.iter().map(|i| i.kind).collect();
        assert_eq!(
            kinds,
            vec![
                SummaryKind::Line(LineType::Eave),
                SummaryKind::TotalArea,
                SummaryKind::Pitch
            ]
        );
        let json = serde_json::to_string(&items).unwrap();
        let back: Vec<SummaryItem> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, items);
        assert!(!back[1].is_line());
        assert!(!back[2].is_line());
    }

    #[test]
    fn kind_from_display_name() {
        assert_eq!(
            SummaryKind::from_name("Step Flashing"),
            SummaryKind::Line(LineType::StepFlash)
        );
        assert_eq!(SummaryKind::from_name("Gutter"), SummaryKind::Line(LineType::Other));
    }
}
