//! Reading-order reconstruction of raw OCR fields.
//!
//! OCR providers return fragments in detection order, not reading
//! order. Fields are clustered into rows (centroid y within a pixel
//! tolerance of the row's topmost member), ordered by row then centroid
//! x, then grouped into lines. Row membership is decided against the
//! row anchor, never pairwise, so noisy y values that chain across the
//! tolerance still produce one total order. There is no error path:
//! fields with missing polygon data default their coordinates to 0 and
//! still participate.

use crate::config::PipelineConfig;
use crate::models::RawOcrField;

/// Reading-ordered text for one image.
#[derive(Debug, Clone)]
pub struct ReconstructedText {
    /// Space-joined text per line, top to bottom.
    pub lines: Vec<String>,
    /// All fields in reading order joined by single spaces, ignoring
    /// line grouping. Pattern searches run on this so they never depend
    /// on where lines break.
    pub full_text: String,
}

/// Centroid of a field's bounding polygon; (0, 0) when absent.
fn centroid(field: &RawOcrField) -> (f32, f32) {
    let verts = &field.bounding_polygon;
    if verts.is_empty() {
        return (0.0, 0.0);
    }
    let n = verts.len() as f32;
    let x = verts.iter().map(|v| v.x).sum::<f32>() / n;
    let y = verts.iter().map(|v| v.y).sum::<f32>() / n;
    (x, y)
}

/// X of the field's first vertex, used for left-to-right order inside
/// a line.
fn leading_x(field: &RawOcrField) -> f32 {
    field.bounding_polygon.first().map(|v| v.x).unwrap_or(0.0)
}

/// Sort fields into reading order.
///
/// Fields are clustered into rows top-down: a field joins the current
/// row while its centroid y sits within the row tolerance of the row's
/// first (topmost) member, and the final order is by `(row, centroid
/// x)`. Comparing concrete keys keeps the order total; a tolerant
/// pairwise y comparison would not be transitive once y values chain
/// across the tolerance.
pub fn sort_fields(fields: &[RawOcrField], config: &PipelineConfig) -> Vec<RawOcrField> {
    let mut by_y: Vec<(f32, f32, usize)> = fields
        .iter()
        .enumerate()
        .map(|(i, f)| {
            let (x, y) = centroid(f);
            (y, x, i)
        })
        .collect();
    by_y.sort_by(|a, b| {
        a.0.partial_cmp(&b.0)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
    });

    let mut keyed: Vec<(usize, f32, usize)> = Vec::with_capacity(by_y.len());
    let mut row = 0usize;
    let mut anchor = f32::NEG_INFINITY;
    for (y, x, idx) in by_y {
        if y - anchor > config.same_row_tolerance_px {
            row += 1;
            anchor = y;
        }
        keyed.push((row, x, idx));
    }
    keyed.sort_by(|a, b| {
        a.0.cmp(&b.0)
            .then(a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
    });

    keyed
        .into_iter()
        .map(|(_, _, idx)| fields[idx].clone())
        .collect()
}

struct LineBucket<'a> {
    y: f32,
    items: Vec<&'a RawOcrField>,
}

/// Group sorted fields into lines and join each left-to-right.
pub fn reconstruct(fields: &[RawOcrField], config: &PipelineConfig) -> ReconstructedText {
    let sorted = sort_fields(fields, config);

    let mut buckets: Vec<LineBucket> = Vec::new();
    for field in &sorted {
        let (_, y) = centroid(field);
        match buckets
            .iter_mut()
            .find(|b| (b.y - y).abs() <= config.line_band_tolerance_px)
        {
            Some(bucket) => bucket.items.push(field),
            None => buckets.push(LineBucket {
                y,
                items: vec![field],
            }),
        }
    }

    buckets.sort_by(|a, b| a.y.partial_cmp(&b.y).unwrap_or(std::cmp::Ordering::Equal));

    let lines = buckets
        .into_iter()
        .map(|mut bucket| {
            bucket.items.sort_by(|a, b| {
                leading_x(a)
                    .partial_cmp(&leading_x(b))
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
            bucket
                .items
                .iter()
                .map(|f| f.text.as_str())
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect();

    let full_text = sorted
        .iter()
        .map(|f| f.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");

    ReconstructedText { lines, full_text }
}
