//! Tabular extraction - raw spreadsheet rows to canonical measurement records
//!
//! Raw column names differ between datasets (the IGLE, IMA and efferent
//! spreadsheets all name the innervation area differently), so a named
//! `SchemaProfile` maps every known synonym onto one canonical field:
//! `%x`, `%y`, `area` and optionally `face`.
//!
//! Which percent axis ends up "vertical" and which "depth" is part of the
//! profile. The two input conventions seen so far disagree here: one treats
//! `%y` as vertical and relabels `%x` as depth, the other swaps them.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use super::normalize::CoordinateRange;
use super::{ProjectionError, Result};

pub const FIELD_PERCENT_X: &str = "%x";
pub const FIELD_PERCENT_Y: &str = "%y";
pub const FIELD_AREA: &str = "area";
pub const FIELD_FACE: &str = "face";

/// Rows as read from a dataset file, before any column mapping
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    /// Column names in order of first appearance
    pub columns: Vec<String>,
    pub rows: Vec<HashMap<String, Value>>,
}

/// Which percentage column feeds a derived axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PercentAxis {
    X,
    Y,
}

/// Named column mapping selected per dataset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaProfile {
    /// Raw column name -> canonical field name
    pub columns: HashMap<String, String>,
    /// Whether the `face` field must be present
    #[serde(default)]
    pub require_face: bool,
    #[serde(default = "default_vertical_axis")]
    pub vertical_axis: PercentAxis,
    #[serde(default = "default_depth_axis")]
    pub depth_axis: PercentAxis,
}

fn default_vertical_axis() -> PercentAxis {
    PercentAxis::Y
}

fn default_depth_axis() -> PercentAxis {
    PercentAxis::X
}

/// One measurement row after mapping and normalization
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    pub percent_x: f64,
    pub percent_y: f64,
    /// Innervation area, drives colour intensity
    pub area: f64,
    pub face: Option<String>,
    /// Vertical distance in mm
    pub vertical: f64,
    /// Depth distance in mm
    pub depth: f64,
    /// `100 - vertical percent`. Not consumed by the projection.
    pub vertical_complement: f64,
}

/// Result of running a table through a profile
#[derive(Debug, Clone)]
pub struct Extracted {
    pub profile: String,
    pub records: Vec<Measurement>,
    has_face: bool,
}

impl Extracted {
    /// (vertical, depth) pairs, the plane the mesh is matched in
    pub fn planar_points(&self) -> Vec<[f64; 2]> {
        self.records.iter().map(|m| [m.vertical, m.depth]).collect()
    }

    pub fn intensities(&self) -> Vec<f64> {
        self.records.iter().map(|m| m.area).collect()
    }

    /// Face labels aligned with `planar_points`, or None when the table has no face column
    pub fn faces(&self) -> Option<Vec<String>> {
        if !self.has_face {
            return None;
        }
        Some(
            self.records
                .iter()
                .map(|m| m.face.clone().unwrap_or_default())
                .collect(),
        )
    }
}

/// Map a raw table through a schema profile and derive physical coordinates.
///
/// Unmapped columns are discarded. A missing required field fails before any
/// row is read; a bad cell in any row fails the whole table.
pub fn extract(
    table: &RawTable,
    profile_name: &str,
    profile: &SchemaProfile,
    vertical_range: CoordinateRange,
    depth_range: CoordinateRange,
) -> Result<Extracted> {
    // canonical field -> raw column, first synonym in column order wins
    let mut resolved: HashMap<&str, &str> = HashMap::new();
    for column in &table.columns {
        let Some(canonical) = profile.columns.get(column) else {
            tracing::debug!("Dropping unmapped column '{}'", column);
            continue;
        };
        match resolved.get(canonical.as_str()) {
            Some(existing) => {
                tracing::warn!(
                    "Columns '{}' and '{}' both map to '{}', keeping '{}'",
                    existing, column, canonical, existing
                );
            }
            None => {
                resolved.insert(canonical.as_str(), column.as_str());
            }
        }
    }

    let mut required = vec![FIELD_PERCENT_X, FIELD_PERCENT_Y, FIELD_AREA];
    if profile.require_face {
        required.push(FIELD_FACE);
    }
    for field in required {
        if !resolved.contains_key(field) {
            return Err(ProjectionError::Schema {
                profile: profile_name.to_string(),
                field: field.to_string(),
            });
        }
    }

    let x_col = resolved[FIELD_PERCENT_X];
    let y_col = resolved[FIELD_PERCENT_Y];
    let area_col = resolved[FIELD_AREA];
    let face_col = resolved.get(FIELD_FACE).copied();

    let mut records = Vec::with_capacity(table.rows.len());
    for (i, row) in table.rows.iter().enumerate() {
        let percent_x = numeric_cell(row, i, x_col)?;
        let percent_y = numeric_cell(row, i, y_col)?;
        let area = numeric_cell(row, i, area_col)?;
        if area < 0.0 {
            return Err(ProjectionError::InvalidValue {
                row: i,
                field: area_col.to_string(),
                reason: format!("negative area {}", area),
            });
        }

        let face = match face_col {
            Some(col) => match text_cell(row, col) {
                Some(label) => Some(label),
                None if profile.require_face => {
                    return Err(ProjectionError::InvalidValue {
                        row: i,
                        field: col.to_string(),
                        reason: "missing face label".to_string(),
                    });
                }
                None => None,
            },
            None => None,
        };

        let pick = |axis: PercentAxis| match axis {
            PercentAxis::X => percent_x,
            PercentAxis::Y => percent_y,
        };
        let vertical_percent = pick(profile.vertical_axis);
        let depth_percent = pick(profile.depth_axis);

        records.push(Measurement {
            percent_x,
            percent_y,
            area,
            face,
            vertical: vertical_range.to_distance(vertical_percent),
            depth: depth_range.to_distance(depth_percent),
            vertical_complement: 100.0 - vertical_percent,
        });
    }

    tracing::debug!(
        "Extracted {} records with profile '{}' (face column: {})",
        records.len(),
        profile_name,
        face_col.unwrap_or("none")
    );

    Ok(Extracted {
        profile: profile_name.to_string(),
        records,
        has_face: face_col.is_some(),
    })
}

fn numeric_cell(row: &HashMap<String, Value>, index: usize, column: &str) -> Result<f64> {
    let invalid = |reason: String| ProjectionError::InvalidValue {
        row: index,
        field: column.to_string(),
        reason,
    };

    let value = match row.get(column) {
        None | Some(Value::Null) => return Err(invalid("missing value".to_string())),
        Some(Value::Number(n)) => n
            .as_f64()
            .ok_or_else(|| invalid(format!("unrepresentable number {}", n)))?,
        Some(Value::String(s)) if s.trim().is_empty() => {
            return Err(invalid("missing value".to_string()))
        }
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| invalid(format!("'{}' is not a number", s)))?,
        Some(other) => return Err(invalid(format!("unexpected value {}", other))),
    };

    if !value.is_finite() {
        return Err(invalid(format!("non-finite value {}", value)));
    }
    Ok(value)
}

fn text_cell(row: &HashMap<String, Value>, column: &str) -> Option<String> {
    match row.get(column)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn profile(require_face: bool) -> SchemaProfile {
        let columns = [
            ("%x (distance from pylorus side)", FIELD_PERCENT_X),
            ("%y (distance from bottom)", FIELD_PERCENT_Y),
            ("Average IGLE Area (um²)", FIELD_AREA),
            ("Area Of Innervation", FIELD_AREA),
            ("V/D", FIELD_FACE),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        SchemaProfile {
            columns,
            require_face,
            vertical_axis: PercentAxis::Y,
            depth_axis: PercentAxis::X,
        }
    }

    fn table(rows: Vec<Value>) -> RawTable {
        let mut columns: Vec<String> = Vec::new();
        let rows = rows
            .into_iter()
            .map(|row| {
                let map: HashMap<String, Value> = serde_json::from_value(row).unwrap();
                let mut keys: Vec<_> = map.keys().cloned().collect();
                keys.sort();
                for key in keys {
                    if !columns.contains(&key) {
                        columns.push(key);
                    }
                }
                map
            })
            .collect();
        RawTable { columns, rows }
    }

    fn ranges() -> (CoordinateRange, CoordinateRange) {
        (CoordinateRange::new(24.6, 0.0), CoordinateRange::new(0.0, 36.7))
    }

    #[test]
    fn test_extract_maps_and_normalizes() {
        let t = table(vec![json!({
            "%x (distance from pylorus side)": 50.0,
            "%y (distance from bottom)": 100.0,
            "Area Of Innervation": 12.5,
            "V/D": "V",
            "Specimen": "rat 7",
        })]);
        let (v, d) = ranges();
        let out = extract(&t, "stomach", &profile(true), v, d).unwrap();

        assert_eq!(out.records.len(), 1);
        let m = &out.records[0];
        assert_eq!(m.vertical, 0.0);
        assert!((m.depth - 18.35).abs() < 1e-9);
        assert_eq!(m.area, 12.5);
        assert_eq!(m.face.as_deref(), Some("V"));
        assert_eq!(m.vertical_complement, 0.0);
        assert_eq!(out.faces(), Some(vec!["V".to_string()]));
    }

    #[test]
    fn test_missing_area_is_schema_error() {
        let t = table(vec![json!({
            "%x (distance from pylorus side)": 10.0,
            "%y (distance from bottom)": 20.0,
        })]);
        let (v, d) = ranges();
        let err = extract(&t, "stomach", &profile(false), v, d).unwrap_err();
        match err {
            ProjectionError::Schema { field, .. } => assert_eq!(field, FIELD_AREA),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_face_only_required_when_profile_says_so() {
        let t = table(vec![json!({
            "%x (distance from pylorus side)": 10.0,
            "%y (distance from bottom)": 20.0,
            "Area Of Innervation": 1.0,
        })]);
        let (v, d) = ranges();
        assert!(matches!(
            extract(&t, "stomach", &profile(true), v, d),
            Err(ProjectionError::Schema { .. })
        ));
        let out = extract(&t, "stomach", &profile(false), v, d).unwrap();
        assert_eq!(out.faces(), None);
    }

    #[test]
    fn test_bad_cell_fails_whole_batch() {
        let t = table(vec![
            json!({
                "%x (distance from pylorus side)": 10.0,
                "%y (distance from bottom)": 20.0,
                "Area Of Innervation": 1.0,
            }),
            json!({
                "%x (distance from pylorus side)": 10.0,
                "%y (distance from bottom)": 20.0,
                "Area Of Innervation": "",
            }),
        ]);
        let (v, d) = ranges();
        match extract(&t, "stomach", &profile(false), v, d) {
            Err(ProjectionError::InvalidValue { row, .. }) => assert_eq!(row, 1),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_numeric_strings_accepted() {
        let t = table(vec![json!({
            "%x (distance from pylorus side)": " 25 ",
            "%y (distance from bottom)": "50",
            "Area Of Innervation": "3.5",
        })]);
        let (v, d) = ranges();
        let out = extract(&t, "stomach", &profile(false), v, d).unwrap();
        assert_eq!(out.records[0].percent_x, 25.0);
        assert_eq!(out.intensities(), vec![3.5]);
    }

    #[test]
    fn test_swapped_axes() {
        let mut p = profile(false);
        p.vertical_axis = PercentAxis::X;
        p.depth_axis = PercentAxis::Y;
        let t = table(vec![json!({
            "%x (distance from pylorus side)": 0.0,
            "%y (distance from bottom)": 100.0,
            "Area Of Innervation": 1.0,
        })]);
        let (v, d) = ranges();
        let out = extract(&t, "swapped", &p, v, d).unwrap();
        assert_eq!(out.planar_points(), vec![[24.6, 36.7]]);
        assert_eq!(out.records[0].vertical_complement, 100.0);
    }
}
