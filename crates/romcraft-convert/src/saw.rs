//! SAW tool definitions: JSON with a fiducial list and an optional pivot.

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::convert::MarkerTool;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl From<[f64; 3]> for Point {
    fn from([x, y, z]: [f64; 3]) -> Self {
        Point { x, y, z }
    }
}

impl From<Point> for [f64; 3] {
    fn from(p: Point) -> Self {
        [p.x, p.y, p.z]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SawTool {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default)]
    pub count: usize,
    pub fiducials: Vec<Point>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pivot: Option<Point>,
}

impl From<&MarkerTool> for SawTool {
    fn from(tool: &MarkerTool) -> Self {
        SawTool {
            id: tool.id,
            count: tool.markers.len(),
            fiducials: tool.markers.iter().copied().map(Point::from).collect(),
            pivot: tool.pivot.map(Point::from),
        }
    }
}

pub fn parse(text: &str) -> Result<MarkerTool> {
    let saw: SawTool = serde_json::from_str(text).context("invalid SAW tool definition")?;

    if saw.count != saw.fiducials.len() {
        bail!(
            "SAW tool declares {} fiducials but lists {}",
            saw.count,
            saw.fiducials.len()
        );
    }

    Ok(MarkerTool {
        id: saw.id,
        markers: saw.fiducials.into_iter().map(Into::into).collect(),
        pivot: saw.pivot.map(Into::into),
    })
}

/// Pretty JSON with four-space indentation.
pub fn render(tool: &MarkerTool) -> Result<String> {
    let mut out = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut out, formatter);
    SawTool::from(tool).serialize(&mut ser)?;

    Ok(String::from_utf8(out)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        let tool = parse(
            r#"{
                "id": 7,
                "count": 2,
                "fiducials": [{"x": 1.0, "y": 2.0, "z": 3.0}, {"x": -1, "y": 0, "z": 0.5}],
                "pivot": {"x": 0.0, "y": 0.0, "z": -100.0}
            }"#,
        )
        .unwrap();

        assert_eq!(tool.id, Some(7));
        assert_eq!(tool.markers, vec![[1.0, 2.0, 3.0], [-1.0, 0.0, 0.5]]);
        assert_eq!(tool.pivot, Some([0.0, 0.0, -100.0]));
    }

    #[test]
    fn test_count_must_match() {
        let err = parse(r#"{"count": 3, "fiducials": [{"x": 0, "y": 0, "z": 0}]}"#).unwrap_err();
        assert!(err.to_string().contains("declares 3 fiducials but lists 1"));

        // a missing count reads as zero
        assert!(parse(r#"{"fiducials": [{"x": 0, "y": 0, "z": 0}]}"#).is_err());
        assert!(parse(r#"{"fiducials": []}"#).is_ok());
    }

    #[test]
    fn test_render_omits_missing_optionals() {
        let tool = MarkerTool {
            id: None,
            markers: vec![[1.5, 0.0, 0.0]],
            pivot: None,
        };
        let text = render(&tool).unwrap();

        assert!(text.starts_with("{\n    \"count\": 1,"));
        assert!(!text.contains("pivot"));
        assert_eq!(parse(&text).unwrap(), tool);
    }
}
