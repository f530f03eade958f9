//! Reader for the vendor roof measurement XML export.
//!
//! The export nests `POINTS`, `LINES` and `FACES` groups under a `ROOF`
//! element and carries global totals as `OVERALL_SUMMARY/ATTRIBUTE` pairs.
//! Rows with invalid fields are dropped; only a document that is not
//! well-formed XML fails.

use log::{debug, info};
use roxmltree::{Document, Node};

use crate::error::ParseError;
use crate::model::{Face, LineType, ReportModel, RoofLine, RoofPoint};
use crate::polygon::reconstruct_faces;

use super::read_to_string;

/// Reads and parses the export at `path`.
pub fn read_report(path: &str) -> Result<ReportModel, ParseError> {
    let xml = read_to_string(path)?;
    parse_report(&xml)
}

/// Parses export text into a fully reconstructed [`ReportModel`].
pub fn parse_report(xml: &str) -> Result<ReportModel, ParseError> {
    let doc = Document::parse(xml)?;
    let mut model = ReportModel::new();
    let mut dropped = 0usize;

    for roof in doc.descendants().filter(|n| n.has_tag_name("ROOF")) {
        for node in grouped(roof, "POINTS", "POINT") {
            match parse_point(node) {
                Some(p) => {
                    model.points.insert(p.id.clone(), p);
                }
                None => dropped += 1,
            }
        }
        for node in grouped(roof, "LINES", "LINE") {
            match parse_line(node) {
                Some(l) => {
                    model.lines.insert(l.id.clone(), l);
                }
                None => dropped += 1,
            }
        }
        for node in grouped(roof, "FACES", "FACE") {
            match parse_face(node) {
                Some(face) => {
                    for line_id in &face.line_ids {
                        model
                            .line_faces
                            .entry(line_id.clone())
                            .or_default()
                            .push(face.id.clone());
                    }
                    model.faces.insert(face.id.clone(), face);
                }
                None => dropped += 1,
            }
        }
    }

    let root = doc.root_element();
    if root.has_tag_name("EAGLEVIEW_EXPORT") {
        for node in grouped(root, "OVERALL_SUMMARY", "ATTRIBUTE") {
            let name = non_empty(node.attribute("name"));
            let value = node.attribute("value").and_then(parse_number);
            match (name, value) {
                (Some(name), Some(value)) => {
                    model.summary.insert(name.to_string(), value);
                }
                _ => dropped += 1,
            }
        }
    }

    if dropped > 0 {
        debug!("dropped {} export rows with missing or invalid fields", dropped);
    }
    model.compute_totals();
    let partial = reconstruct_faces(&mut model).len();
    info!(
        "parsed {} points, {} lines, {} faces ({} with partial outlines)",
        model.points.len(),
        model.lines.len(),
        model.faces.len(),
        partial
    );
    debug!("bounding box: {:?}", model.bounds);
    Ok(model)
}

/// Element children named `item` of every direct `group` child of `parent`.
fn grouped<'a, 'input: 'a>(
    parent: Node<'a, 'input>,
    group: &'a str,
    item: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> + 'a {
    parent
        .children()
        .filter(move |c| c.has_tag_name(group))
        .flat_map(move |g| g.children().filter(move |c| c.has_tag_name(item)))
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

fn parse_number(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|v| !v.is_nan())
}

fn parse_point(node: Node) -> Option<RoofPoint> {
    let id = non_empty(node.attribute("id"))?;
    let data = non_empty(node.attribute("data"))?;
    let coords: Vec<f64> = data
        .split(',')
        .map(parse_number)
        .collect::<Option<Vec<f64>>>()?;
    if coords.len() < 2 {
        return None;
    }
    Some(RoofPoint::new(id, coords[0], coords[1], coords.get(2).copied()))
}

fn parse_line(node: Node) -> Option<RoofLine> {
    let id = non_empty(node.attribute("id"))?;
    let path = non_empty(node.attribute("path"))?;
    let line_type = node
        .attribute("type")
        .map(LineType::from_token)
        .unwrap_or(LineType::Other);
    let refs: Vec<&str> = path.split(',').map(str::trim).collect();
    match refs.as_slice() {
        [a, b] => Some(RoofLine::new(id, *a, *b, line_type)),
        _ => None,
    }
}

fn parse_face(node: Node) -> Option<Face> {
    let id = non_empty(node.attribute("id"))?;
    let polygon = node.descendants().find(|n| n.has_tag_name("POLYGON"))?;
    let label = non_empty(node.attribute("designator")).map(str::to_string);
    let line_ids = non_empty(polygon.attribute("path"))
        .map(|p| p.split(',').map(|s| s.trim().to_string()).collect())
        .unwrap_or_default();
    let pitch = polygon.attribute("pitch").and_then(parse_number);
    let area = non_empty(polygon.attribute("unroundedsize"))
        .or_else(|| non_empty(polygon.attribute("size")))
        .and_then(parse_number);
    Some(Face::new(id, label, line_ids, pitch, area))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SQUARE: &str = r#"<?xml version="1.0"?>
<EAGLEVIEW_EXPORT>
  <STRUCTURES>
    <ROOF id="r1">
      <POINTS>
        <POINT id="P1" data="0,0,10"/>
        <POINT id="P2" data="1,0"/>
        <POINT id="P3" data="1,1"/>
        <POINT id="P4" data="0,1"/>
        <POINT id="BAD" data="1,abc"/>
        <POINT id="SHORT" data="1"/>
        <POINT data="3,3"/>
      </POINTS>
      <LINES>
        <LINE id="L1" type="eave" path="P1,P2"/>
        <LINE id="L2" type="EAVE" path="P2,P3"/>
        <LINE id="L3" type="Eave" path="P3,P4"/>
        <LINE id="L4" type="EAVE" path="P4,P1"/>
        <LINE id="L5" type="GUTTER" path="P1,P3"/>
        <LINE id="L6" type="EAVE" path="P1,P2,P3"/>
      </LINES>
      <FACES>
        <FACE id="F1" designator="A">
          <POLYGON path="L1,L2,L3,L4" pitch="6" size="2" unroundedsize="1.04"/>
        </FACE>
        <FACE id="F2">
          <POLYGON path="L1,L2,L3,L4" pitch="x"/>
        </FACE>
        <FACE id="F3"/>
      </FACES>
    </ROOF>
  </STRUCTURES>
  <OVERALL_SUMMARY>
    <ATTRIBUTE name="TotalRakesLength" value="42.5"/>
    <ATTRIBUTE name="Broken" value="n/a"/>
  </OVERALL_SUMMARY>
</EAGLEVIEW_EXPORT>
"#;

    #[test]
    fn parses_entities_and_drops_invalid_rows() {
        let model = parse_report(SQUARE).unwrap();
        assert_eq!(model.points.len(), 4);
        assert_eq!(model.points["P1"].z, Some(10.0));
        assert_eq!(model.points["P2"].z, None);
        assert_eq!(model.lines.len(), 5);
        assert_eq!(model.lines["L1"].line_type, LineType::Eave);
        assert_eq!(model.lines["L5"].line_type, LineType::Other);
        assert_eq!(model.faces.len(), 2);
        assert_eq!(model.summary.len(), 1);
        assert_eq!(model.summary["TotalRakesLength"], 42.5);
    }

    #[test]
    fn face_attributes() {
        let model = parse_report(SQUARE).unwrap();
        let f1 = &model.faces["F1"];
        assert_eq!(f1.label.as_deref(), Some("A"));
        assert_eq!(f1.pitch, Some(6.0));
        assert_eq!(f1.area, Some(1.04));
        let f2 = &model.faces["F2"];
        assert_eq!(f2.pitch, None);
        assert!((f2.area.unwrap() - 1.0).abs() < 1e-9);
        assert_eq!(f2.vertices.len(), 4);
        assert_eq!(model.faces_of_line("L1").to_vec(), vec!["F1".to_string(), "F2".to_string()]);
    }

    #[test]
    fn totals_and_bounds() {
        let model = parse_report(SQUARE).unwrap();
        assert!((model.flat_total(LineType::Eave).unwrap() - 4.0).abs() < 1e-9);
        assert!((model.flat_total(LineType::Other).unwrap() - 2f64.sqrt()).abs() < 1e-9);
        let bb = model.bounds.unwrap();
        assert_eq!((bb.min_x, bb.min_y, bb.max_x, bb.max_y), (0.0, 0.0, 1.0, 1.0));
    }

    #[test]
    fn empty_roof_has_no_bounds() {
        let model =
            parse_report("<EAGLEVIEW_EXPORT><STRUCTURES><ROOF/></STRUCTURES></EAGLEVIEW_EXPORT>")
                .unwrap();
        assert!(model.points.is_empty());
        assert!(model.bounds.is_none());
    }

    #[test]
    fn malformed_document_is_an_error() {
        let err = parse_report("<EAGLEVIEW_EXPORT><ROOF>").unwrap_err();
        assert!(matches!(err, ParseError::Xml(_)));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = read_report("/definitely/not/here.xml").unwrap_err();
        assert!(matches!(err, ParseError::Io(_)));
    }
}
