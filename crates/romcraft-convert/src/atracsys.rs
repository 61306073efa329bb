//! Atracsys tool definitions: INI files with a `[geometry]` section, one
//! `[fiducialN]` section per marker and an optional `[pivot]`.

use std::{collections::BTreeMap, fmt::Write};

use anyhow::{Context, Result, anyhow, bail};

use crate::convert::MarkerTool;

type Section = BTreeMap<String, String>;

/// Sections by name. Keys are lower-cased; values are trimmed.
fn parse_ini(text: &str) -> Result<BTreeMap<String, Section>> {
    let mut sections: BTreeMap<String, Section> = BTreeMap::new();
    let mut current: Option<String> = None;

    for (number, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }

        if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            let name = name.trim().to_string();
            sections.entry(name.clone()).or_default();
            current = Some(name);
            continue;
        }

        let Some(split) = line.find(['=', ':']) else {
            bail!("line {}: expected `key = value`", number + 1);
        };
        let Some(section) = &current else {
            bail!("line {}: key outside of any section", number + 1);
        };

        let key = line[..split].trim().to_lowercase();
        let value = line[split + 1..].trim().to_string();
        sections.entry(section.clone()).or_default().insert(key, value);
    }

    Ok(sections)
}

fn get<'a>(section: &'a Section, name: &str, key: &str) -> Result<&'a str> {
    section
        .get(key)
        .map(String::as_str)
        .ok_or_else(|| anyhow!("[{name}] is missing `{key}`"))
}

fn point(sections: &BTreeMap<String, Section>, name: &str) -> Result<[f64; 3]> {
    let section = sections
        .get(name)
        .ok_or_else(|| anyhow!("missing section [{name}]"))?;

    let mut xyz = [0.0; 3];
    for (axis, key) in xyz.iter_mut().zip(["x", "y", "z"]) {
        *axis = get(section, name, key)?
            .parse()
            .with_context(|| format!("[{name}] {key} is not a number"))?;
    }
    Ok(xyz)
}

pub fn parse(text: &str) -> Result<MarkerTool> {
    let sections = parse_ini(text)?;
    let geometry = sections
        .get("geometry")
        .ok_or_else(|| anyhow!("missing section [geometry]"))?;

    let count: usize = get(geometry, "geometry", "count")?
        .parse()
        .context("[geometry] count is not a count")?;
    let id = geometry
        .get("id")
        .map(|id| id.parse::<i64>().context("[geometry] id is not an integer"))
        .transpose()?;

    let markers = (0..count)
        .map(|i| point(&sections, &format!("fiducial{i}")))
        .collect::<Result<Vec<_>>>()?;
    let pivot = sections
        .contains_key("pivot")
        .then(|| point(&sections, "pivot"))
        .transpose()?;

    Ok(MarkerTool { id, markers, pivot })
}

fn write_point(out: &mut String, name: &str, [x, y, z]: [f64; 3]) {
    // writing to a String cannot fail
    let _ = write!(out, "[{name}]\nx = {x:?}\ny = {y:?}\nz = {z:?}\n\n");
}

pub fn render(tool: &MarkerTool) -> String {
    let mut out = format!("[geometry]\ncount = {}\n", tool.markers.len());
    if let Some(id) = tool.id {
        let _ = writeln!(out, "id = {id}");
    }
    out.push('\n');

    for (i, marker) in tool.markers.iter().enumerate() {
        write_point(&mut out, &format!("fiducial{i}"), *marker);
    }
    if let Some(pivot) = tool.pivot {
        write_point(&mut out, "pivot", pivot);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
; exported by the tracker software
[geometry]
count = 2
id = 1500

[fiducial0]
x = 0.000000
y = 0.000000
z = 0.000000

[fiducial1]
X = 28.5
y: -11.25
z = 0

[pivot]
x = 1
y = 2
z = 3
";

    #[test]
    fn test_parse() {
        let tool = parse(SAMPLE).unwrap();

        assert_eq!(tool.id, Some(1500));
        assert_eq!(tool.markers, vec![[0.0, 0.0, 0.0], [28.5, -11.25, 0.0]]);
        assert_eq!(tool.pivot, Some([1.0, 2.0, 3.0]));
    }

    #[test]
    fn test_missing_fiducial() {
        let err = parse("[geometry]\ncount = 1\n").unwrap_err();
        assert!(err.to_string().contains("[fiducial0]"));
    }

    #[test]
    fn test_rejects_key_outside_section() {
        assert!(parse("count = 1\n[geometry]\n").is_err());
    }

    #[test]
    fn test_render_round_trip() {
        let tool = MarkerTool {
            id: None,
            markers: vec![[1.0, -2.5, 0.125], [0.0, 0.0, 61.00001]],
            pivot: Some([0.0, 0.0, -90.0]),
        };

        let text = render(&tool);
        assert!(text.starts_with("[geometry]\ncount = 2\n\n[fiducial0]\nx = 1.0\n"));
        assert_eq!(parse(&text).unwrap(), tool);
    }
}
