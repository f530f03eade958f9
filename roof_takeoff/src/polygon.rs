//! Rebuilds ordered vertex loops for roof faces from their unordered edges.

use std::collections::BTreeMap;
use std::fmt;

use log::warn;

use crate::geometry::{polygon_area, vertex_centroid, BoundingBox};
use crate::model::{ReportModel, RoofLine, RoofPoint};

/// Result of chaining the edges of one face.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LoopOutcome {
    /// Point ids in traversal order without the closing duplicate.
    pub point_ids: Vec<String>,
    /// Number of usable edges (both endpoints known).
    pub edge_count: usize,
    /// Number of usable edges consumed by the chain.
    pub used_edges: usize,
    /// Whether the chain returned to its starting point.
    pub closed: bool,
}

impl LoopOutcome {
    /// True when the edges did not form one closed loop.
    pub fn is_partial(&self) -> bool {
        self.edge_count > 0 && (self.used_edges < self.edge_count || !self.closed)
    }
}

/// A face whose boundary did not chain into one closed loop. The partial
/// loop is still used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconstructionWarning {
    pub face_id: String,
    pub used_edges: usize,
    pub edge_count: usize,
    pub vertex_count: usize,
}

impl fmt::Display for ReconstructionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "face {} does not form a single closed loop: used {} of {} edges, {} vertices",
            self.face_id, self.used_edges, self.edge_count, self.vertex_count
        )
    }
}

/// Chains the boundary edges listed in `line_ids` into a vertex loop.
///
/// Greedy single pass: starting from the first usable edge, the first unused
/// edge touching the tail extends the chain. There is no backtracking, so a
/// branching or disconnected boundary yields only the first chain.
pub fn order_face_loop(
    line_ids: &[String],
    lines: &BTreeMap<String, RoofLine>,
    points: &BTreeMap<String, RoofPoint>,
) -> LoopOutcome {
    let edges: Vec<(&str, &str)> = line_ids
        .iter()
        .filter_map(|id| lines.get(id))
        .filter(|l| points.contains_key(&l.point1_id) && points.contains_key(&l.point2_id))
        .map(|l| (l.point1_id.as_str(), l.point2_id.as_str()))
        .collect();
    let Some(&(start, second)) = edges.first() else {
        return LoopOutcome::default();
    };

    let mut order = vec![start, second];
    let mut used = vec![false; edges.len()];
    used[0] = true;
    let mut used_edges = 1;
    let mut tail = second;
    while used_edges < edges.len() {
        let next = edges.iter().enumerate().find_map(|(i, &(a, b))| {
            if used[i] {
                None
            } else if a == tail {
                Some((i, b))
            } else if b == tail {
                Some((i, a))
            } else {
                None
            }
        });
        let Some((i, point)) = next else {
            break;
        };
        used[i] = true;
        used_edges += 1;
        order.push(point);
        tail = point;
    }

    let closed = order.len() > 1 && order.first() == order.last();
    if closed {
        order.pop();
    }
    LoopOutcome {
        point_ids: order.into_iter().map(str::to_string).collect(),
        edge_count: edges.len(),
        used_edges,
        closed,
    }
}

/// Fills in the vertex loop, centroid, bounds and area of every face.
///
/// Areas supplied by the export are kept, the rest are computed with the
/// shoelace formula over the rebuilt loop. Faces left with a partial loop
/// are logged and returned.
pub fn reconstruct_faces(model: &mut ReportModel) -> Vec<ReconstructionWarning> {
    let ReportModel {
        points,
        lines,
        faces,
        ..
    } = model;
    let mut warnings = Vec::new();
    for face in faces.values_mut() {
        let outcome = order_face_loop(&face.line_ids, lines, points);
        face.partial_loop = outcome.is_partial();
        if face.partial_loop {
            let warning = ReconstructionWarning {
                face_id: face.id.clone(),
                used_edges: outcome.used_edges,
                edge_count: outcome.edge_count,
                vertex_count: outcome.point_ids.len(),
            };
            warn!("{}", warning);
            warnings.push(warning);
        }
        let resolved: Vec<&RoofPoint> = outcome
            .point_ids
            .iter()
            .filter_map(|id| points.get(id))
            .collect();
        face.vertices = resolved.iter().map(|p| p.plan()).collect();
        face.vertices_3d = resolved.iter().map(|p| p.lifted()).collect();
        face.ordered_point_ids = outcome.point_ids;
        if let Some(c) = vertex_centroid(&face.vertices) {
            face.centroid = c;
        }
        face.bounds = BoundingBox::from_points(face.vertices.iter().copied());
        if face.area.is_none() {
            face.area = Some(polygon_area(&face.vertices));
        }
    }
    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{signed_polygon_area, Point};
    use crate::model::{Face, LineType};

    fn model_with(points: &[(&str, f64, f64)], lines: &[(&str, &str, &str)]) -> ReportModel {
        let mut model = ReportModel::new();
        for &(id, x, y) in points {
            model.points.insert(id.into(), RoofPoint::new(id, x, y, None));
        }
        for &(id, a, b) in lines {
            model
                .lines
                .insert(id.into(), RoofLine::new(id, a, b, LineType::Eave));
        }
        model
    }

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn shuffled_square_closes() {
        let model = model_with(
            &[("a", 0.0, 0.0), ("b", 1.0, 0.0), ("c", 1.0, 1.0), ("d", 0.0, 1.0)],
            &[("ab", "a", "b"), ("cd", "c", "d"), ("da", "d", "a"), ("bc", "c", "b")],
        );
        let out = order_face_loop(&ids(&["ab", "cd", "da", "bc"]), &model.lines, &model.points);
        assert_eq!(out.point_ids, ids(&["a", "b", "c", "d"]));
        assert!(out.closed);
        assert!(!out.is_partial());
    }

    #[test]
    fn disjoint_chains_keep_first() {
        let _ = env_logger::builder().is_test(true).try_init();
        let model = model_with(
            &[
                ("a", 0.0, 0.0),
                ("b", 1.0, 0.0),
                ("c", 1.0, 1.0),
                ("d", 5.0, 5.0),
                ("e", 6.0, 5.0),
                ("f", 6.0, 6.0),
            ],
            &[("ab", "a", "b"), ("bc", "b", "c"), ("de", "d", "e"), ("ef", "e", "f")],
        );
        let out = order_face_loop(&ids(&["ab", "bc", "de", "ef"]), &model.lines, &model.points);
        assert_eq!(out.point_ids, ids(&["a", "b", "c"]));
        assert_eq!(out.used_edges, 2);
        assert!(out.is_partial());
    }

    #[test]
    fn disjoint_chains_warn_and_flag_the_face() {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut model = model_with(
            &[
                ("a", 0.0, 0.0),
                ("b", 1.0, 0.0),
                ("c", 1.0, 1.0),
                ("d", 5.0, 5.0),
                ("e", 6.0, 5.0),
                ("f", 6.0, 6.0),
            ],
            &[("ab", "a", "b"), ("bc", "b", "c"), ("de", "d", "e"), ("ef", "e", "f")],
        );
        let lines = ids(&["ab", "bc", "de", "ef"]);
        model
            .faces
            .insert("split".into(), Face::new("split", None, lines, None, None));
        let warnings = reconstruct_faces(&mut model);
        assert_eq!(
            warnings,
            vec![ReconstructionWarning {
                face_id: "split".into(),
                used_edges: 2,
                edge_count: 4,
                vertex_count: 3,
            }]
        );
        assert!(warnings[0].to_string().contains("used 2 of 4 edges"));
        let face = &model.faces["split"];
        assert!(face.partial_loop);
        assert_eq!(face.ordered_point_ids, ids(&["a", "b", "c"]));
    }

    #[test]
    fn edges_with_missing_points_are_skipped() {
        let model = model_with(
            &[("a", 0.0, 0.0), ("b", 1.0, 0.0), ("c", 0.0, 1.0)],
            &[("ab", "a", "b"), ("bx", "b", "x"), ("bc", "b", "c"), ("ca", "c", "a")],
        );
        let out = order_face_loop(
            &ids(&["bx", "ab", "bc", "ca", "unknown"]),
            &model.lines,
            &model.points,
        );
        assert_eq!(out.point_ids, ids(&["a", "b", "c"]));
        assert_eq!(out.edge_count, 3);
        assert!(!out.is_partial());
    }

    #[test]
    fn no_edges_no_loop() {
        let model = ReportModel::new();
        let out = order_face_loop(&ids(&["x"]), &model.lines, &model.points);
        assert!(out.point_ids.is_empty());
        assert!(!out.is_partial());
    }

    #[test]
    fn reconstruct_fills_geometry() {
        let mut model = model_with(
            &[("a", 0.0, 0.0), ("b", 2.0, 0.0), ("c", 2.0, 2.0), ("d", 0.0, 2.0)],
            &[("ab", "a", "b"), ("bc", "b", "c"), ("cd", "c", "d"), ("da", "d", "a")],
        );
        let lines = ids(&["ab", "bc", "cd", "da"]);
        model
            .faces
            .insert("f1".into(), Face::new("f1", None, lines.clone(), None, None));
        model
            .faces
            .insert("f2".into(), Face::new("f2", None, lines, Some(6.0), Some(9.5)));
        assert!(reconstruct_faces(&mut model).is_empty());

        let f1 = &model.faces["f1"];
        assert_eq!(f1.vertices.len(), 4);
        assert_eq!(f1.vertices_3d.len(), 4);
        assert_eq!(f1.centroid, Point::new(1.0, 1.0));
        assert!((f1.area.unwrap() - 4.0).abs() < 1e-9);
        assert!(signed_polygon_area(&f1.vertices) >= 0.0);
        assert!(f1.is_eligible());
        assert!(!f1.partial_loop);
        // authoritative area wins over the computed one
        assert_eq!(model.faces["f2"].area, Some(9.5));
    }
}
