//! JSON batch loading and result export.
//!
//! Input is a JSON array of records. A record needs numeric `x` and `y`; any
//! other key becomes an attribute of the point. Exports wrap query results
//! with the query name, its parameters and a UTC timestamp, and write points
//! back in the same record shape.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::attribute::AttrValue;
use crate::error::RecordError;
use crate::geometry::{Point, Rectangle};
use crate::quadtree::Quadtree;

/// Group name for points missing the grouping attribute in a [`Summary`].
pub const UNGROUPED: &str = "uncategorized";

/// Outcome of a batch load.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub inserted: usize,
    /// Records outside the tree boundary.
    pub rejected: usize,
    /// Records without numeric coordinates.
    pub skipped: usize,
}

/// Converts one JSON record into a point, or `None` when `x`/`y` are missing
/// or not numbers.
pub fn record_to_point(record: Value) -> Option<Point> {
    Point::try_from(record).ok()
}

/// Reads a JSON array of records and inserts each one into `tree`.
pub fn load_records<R: Read>(tree: &mut Quadtree, reader: R) -> Result<LoadReport, RecordError> {
    let Value::Array(records) = serde_json::from_reader::<_, Value>(reader)? else {
        return Err(RecordError::NotAnArray);
    };

    let mut report = LoadReport::default();
    for (index, record) in records.into_iter().enumerate() {
        match record_to_point(record) {
            Some(point) => {
                if tree.insert(point) {
                    report.inserted += 1;
                } else {
                    report.rejected += 1;
                }
            }
            None => {
                warn!(index, "skipping record without numeric x and y");
                report.skipped += 1;
            }
        }
    }
    debug!(
        inserted = report.inserted,
        rejected = report.rejected,
        skipped = report.skipped,
        "loaded records"
    );
    Ok(report)
}

pub fn load_file(tree: &mut Quadtree, path: impl AsRef<Path>) -> Result<LoadReport, RecordError> {
    let file = File::open(path.as_ref())?;
    debug!(path = %path.as_ref().display(), "loading records");
    load_records(tree, BufReader::new(file))
}

/// Points whose attribute `name` matches hand-typed `text`, either as the
/// inferred value or as literal text.
pub fn filter_by_text<'a>(tree: &'a Quadtree, name: &str, text: &str) -> Vec<&'a Point> {
    tree.get_all_points()
        .into_iter()
        .filter(|p| p.attribute(name).is_some_and(|v| v.matches_text(text)))
        .collect()
}

/// Query results wrapped with what was asked and when.
#[derive(Clone, Debug, Serialize)]
pub struct QueryExport<'a> {
    pub query: &'static str,
    pub timestamp: DateTime<Utc>,
    pub parameters: Value,
    pub total_found: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
    pub points: Vec<&'a Point>,
}

impl<'a> QueryExport<'a> {
    fn new(query: &'static str, parameters: Value, points: Vec<&'a Point>) -> Self {
        Self {
            query,
            timestamp: Utc::now(),
            parameters,
            total_found: points.len(),
            distance: None,
            points,
        }
    }

    pub fn range(rect: &Rectangle, points: Vec<&'a Point>) -> Self {
        Self::new("range", json!(rect), points)
    }

    pub fn filter(name: &str, value: &AttrValue, points: Vec<&'a Point>) -> Self {
        Self::new("filter", json!({ "attribute": name, "value": value }), points)
    }

    pub fn nearest(query: &Point, result: Option<(&'a Point, f64)>) -> Self {
        let parameters = json!({ "x": query.x, "y": query.y });
        match result {
            Some((point, distance)) => Self {
                distance: Some(distance),
                ..Self::new("nearest", parameters, vec![point])
            },
            None => Self::new("nearest", parameters, Vec::new()),
        }
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}

/// Per-group counts and a numeric average over every point in a tree.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Summary {
    pub total_points: usize,
    pub by_group: BTreeMap<String, usize>,
    /// Mean of the numeric values of the averaged attribute, if any exist.
    pub average: Option<f64>,
    pub subdivided: bool,
}

pub fn summarize(tree: &Quadtree, group_by: &str, average_of: &str) -> Summary {
    let points = tree.get_all_points();
    let mut by_group = BTreeMap::new();
    let mut sum = 0.0;
    let mut counted = 0usize;

    for point in &points {
        let group = point
            .attribute(group_by)
            .map_or_else(|| UNGROUPED.to_string(), AttrValue::to_string);
        *by_group.entry(group).or_insert(0) += 1;

        if let Some(v) = point.attribute(average_of).and_then(AttrValue::as_f64) {
            sum += v;
            counted += 1;
        }
    }

    Summary {
        total_points: points.len(),
        by_group,
        average: (counted > 0).then(|| sum / counted as f64),
        subdivided: tree.is_subdivided(),
    }
}

/// Counts from the queries run alongside a batch load.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct QueryCounts {
    pub range_found: usize,
    /// Matches per filter value, keyed by the value as typed.
    pub filters: BTreeMap<String, usize>,
    pub nearest_distance: Option<f64>,
}

/// The `summary.json` export of a batch load.
#[derive(Clone, Debug, Serialize)]
pub struct BatchSummary {
    pub timestamp: DateTime<Utc>,
    pub statistics: Summary,
    pub queries: QueryCounts,
}

impl BatchSummary {
    pub fn new(statistics: Summary, queries: QueryCounts) -> Self {
        Self {
            timestamp: Utc::now(),
            statistics,
            queries,
        }
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}

/// Pretty-prints `value` as JSON followed by a newline.
pub fn write_json<W, T>(mut writer: W, value: &T) -> Result<(), RecordError>
where
    W: Write,
    T: Serialize + ?Sized,
{
    serde_json::to_writer_pretty(&mut writer, value)?;
    writeln!(writer)?;
    Ok(())
}

pub fn save_json<T>(path: impl AsRef<Path>, value: &T) -> Result<(), RecordError>
where
    T: Serialize + ?Sized,
{
    let mut writer = BufWriter::new(File::create(path.as_ref())?);
    write_json(&mut writer, value)?;
    writer.flush()?;
    debug!(path = %path.as_ref().display(), "saved export");
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    const CITY: &str = r#"[
        {"x": 100, "y": 100, "name": "Restaurant A", "category": "Restaurant", "rating": 4.5},
        {"x": 200.5, "y": 200, "name": "Hospital B", "category": "Hospital", "rating": 4},
        {"x": 150, "y": 150, "name": "Restaurant D", "category": "Restaurant", "open": true},
        {"x": 1500, "y": 10, "name": "Far away"},
        {"y": 10, "name": "No x"},
        {"x": "12", "y": 10},
        {"x": 400, "y": 400, "tags": ["green", "quiet"]}
    ]"#;

    fn city() -> Quadtree {
        Quadtree::new(Rectangle::new(500.0, 500.0, 1000.0, 1000.0), 2)
    }

    #[test]
    fn loads_records_and_reports_problems() {
        let mut qt = city();
        let report = load_records(&mut qt, CITY.as_bytes()).unwrap();
        assert_eq!(
            report,
            LoadReport {
                inserted: 4,
                rejected: 1,
                skipped: 2,
            }
        );
        assert_eq!(qt.count_points(), 4);
        assert_eq!(qt.count_by_attribute("category", "Restaurant"), 2);
        assert_eq!(qt.count_by_attribute("open", true), 1);
        assert_eq!(qt.count_by_attribute("tags", r#"["green","quiet"]"#), 1);

        let hospital = qt.filter_by_attribute("name", "Hospital B");
        assert_eq!(hospital.len(), 1);
        assert_eq!(hospital[0].x, 200.5);
        assert!(hospital[0].attribute("x").is_none());
        assert_eq!(hospital[0].attribute("rating"), Some(&AttrValue::Int(4)));
    }

    #[test]
    fn rejects_non_array_input() {
        let mut qt = city();
        let err = load_records(&mut qt, r#"{"x": 1, "y": 2}"#.as_bytes()).unwrap_err();
        assert!(matches!(err, RecordError::NotAnArray));

        let err = load_records(&mut qt, "[{".as_bytes()).unwrap_err();
        assert!(matches!(err, RecordError::Json(_)));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let mut qt = city();
        let err = load_file(&mut qt, "/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, RecordError::Io(_)));
    }

    #[test]
    fn range_export_shape() {
        let mut qt = city();
        load_records(&mut qt, CITY.as_bytes()).unwrap();
        let rect = Rectangle::new(150.0, 150.0, 100.0, 100.0);
        let ts = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let export = QueryExport::range(&rect, qt.query_range(&rect)).with_timestamp(ts);

        let json = serde_json::to_value(&export).unwrap();
        assert_eq!(json["query"], "range");
        assert_eq!(json["timestamp"], "2024-05-01T12:00:00Z");
        assert_eq!(json["parameters"]["width"], 100.0);
        assert_eq!(json["total_found"], 2);
        assert!(json.get("distance").is_none());
        assert_eq!(json["points"][0]["name"], "Restaurant A");
        assert_eq!(json["points"][0]["x"], 100.0);
    }

    #[test]
    fn nearest_and_filter_exports() {
        let mut qt = city();
        load_records(&mut qt, CITY.as_bytes()).unwrap();
        let query = Point::new(180.0, 180.0);

        let export = QueryExport::nearest(&query, qt.nearest_neighbor_with_distance(&query));
        let json = serde_json::to_value(&export).unwrap();
        assert_eq!(json["total_found"], 1);
        assert_eq!(json["points"][0]["name"], "Hospital B");
        assert_eq!(json["parameters"], json!({"x": 180.0, "y": 180.0}));
        assert!(json["distance"].as_f64().unwrap() > 28.0);

        let empty = city();
        let export = QueryExport::nearest(&query, empty.nearest_neighbor_with_distance(&query));
        assert_eq!(export.total_found, 0);
        assert!(export.distance.is_none());

        let value = AttrValue::from("Restaurant");
        let export = QueryExport::filter("category", &value, qt.filter_by_attribute("category", &value));
        let json = serde_json::to_value(&export).unwrap();
        assert_eq!(json["parameters"], json!({"attribute": "category", "value": "Restaurant"}));
        assert_eq!(json["total_found"], 2);
    }

    #[test]
    fn summarize_groups_and_averages() {
        let mut qt = city();
        load_records(&mut qt, CITY.as_bytes()).unwrap();
        let summary = summarize(&qt, "category", "rating");
        assert_eq!(summary.total_points, 4);
        assert_eq!(summary.by_group["Restaurant"], 2);
        assert_eq!(summary.by_group["Hospital"], 1);
        assert_eq!(summary.by_group[UNGROUPED], 1);
        assert_eq!(summary.average, Some(4.25));
        assert!(summary.subdivided);

        let empty = summarize(&city(), "category", "rating");
        assert_eq!(empty.total_points, 0);
        assert!(empty.by_group.is_empty());
        assert_eq!(empty.average, None);
    }

    #[test]
    fn filter_by_text_accepts_typed_and_literal_values() {
        let mut qt = city();
        load_records(&mut qt, CITY.as_bytes()).unwrap();
        qt.insert(Point::new(50.0, 50.0).with_attribute("category", "4"));
        qt.insert(Point::new(60.0, 60.0).with_attribute("category", 4));

        assert_eq!(filter_by_text(&qt, "category", "Restaurant").len(), 2);
        assert_eq!(filter_by_text(&qt, "category", "4").len(), 2);
        assert_eq!(filter_by_text(&qt, "open", "true").len(), 1);
        assert_eq!(filter_by_text(&qt, "rating", "4").len(), 1);
        assert!(filter_by_text(&qt, "missing", "4").is_empty());
    }

    #[test]
    fn batch_summary_shape() {
        let mut qt = city();
        load_records(&mut qt, CITY.as_bytes()).unwrap();
        let mut filters = BTreeMap::new();
        filters.insert("Restaurant".to_string(), filter_by_text(&qt, "category", "Restaurant").len());
        filters.insert("School".to_string(), filter_by_text(&qt, "category", "School").len());
        let queries = QueryCounts {
            range_found: 2,
            filters,
            nearest_distance: Some(12.5),
        };
        let ts = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let export = BatchSummary::new(summarize(&qt, "category", "rating"), queries)
            .with_timestamp(ts);

        let json = serde_json::to_value(&export).unwrap();
        assert_eq!(json["timestamp"], "2024-05-01T12:00:00Z");
        assert_eq!(json["statistics"]["total_points"], 4);
        assert_eq!(json["statistics"]["by_group"]["Hospital"], 1);
        assert_eq!(json["queries"]["range_found"], 2);
        assert_eq!(json["queries"]["filters"], json!({"Restaurant": 2, "School": 0}));
        assert_eq!(json["queries"]["nearest_distance"], 12.5);

        let empty = BatchSummary::new(summarize(&city(), "category", "rating"), QueryCounts::default());
        let json = serde_json::to_value(&empty).unwrap();
        assert!(json["queries"]["nearest_distance"].is_null());
    }

    #[test]
    fn write_json_appends_newline() {
        let mut out = Vec::new();
        write_json(&mut out, &LoadReport::default()).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.ends_with("}\n"));
        assert!(text.contains("\"inserted\": 0"));
    }
}
