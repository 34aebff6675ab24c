//! JSON dataset files.
//!
//! Two layouts are accepted:
//!
//! ```json
//! { "points": [[0.1, 2.0], [3.5, -1.0]], "metadata": [{ "label": "a" }, { "label": "b" }] }
//! ```
//!
//! and projection exports, where every point carries a class index into
//! `labelNames`:
//!
//! ```json
//! { "projection": [[0.1, 2.0, 1.0]], "labels": [0], "labelNames": ["cat"] }
//! ```

use anyhow::{bail, Context, Result};
use scatterpick::{Dataset, MetadataValue, PointMetadata};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DatasetFile {
    Points {
        points: Vec<Vec<f64>>,
        #[serde(default)]
        metadata: Vec<PointMetadata>,
    },
    #[serde(rename_all = "camelCase")]
    Projection {
        projection: Vec<Vec<f64>>,
        #[serde(default)]
        labels: Vec<usize>,
        #[serde(default)]
        label_names: Vec<String>,
    },
}

/// Reads and validates a dataset file.
pub fn load(path: &Path) -> Result<Dataset> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading dataset {}", path.display()))?;
    let dataset = parse(&raw).with_context(|| format!("parsing dataset {}", path.display()))?;
    log::info!(
        "Loaded {} {:?} points from {} (metadata: {}).",
        dataset.len(),
        dataset.dimensions(),
        path.display(),
        dataset.has_metadata()
    );
    Ok(dataset)
}

pub fn parse(raw: &str) -> Result<Dataset> {
    let file: DatasetFile = serde_json::from_str(raw)?;
    let dataset = match file {
        DatasetFile::Points { points, metadata } => Dataset::new(&points, metadata)?,
        DatasetFile::Projection {
            projection,
            labels,
            label_names,
        } => {
            let metadata = projection_metadata(projection.len(), &labels, &label_names)?;
            Dataset::new(&projection, metadata)?
        }
    };
    Ok(dataset)
}

fn projection_metadata(
    point_count: usize,
    labels: &[usize],
    label_names: &[String],
) -> Result<Vec<PointMetadata>> {
    if labels.is_empty() {
        return Ok(Vec::new());
    }
    if labels.len() != point_count {
        bail!("{} labels for {} points", labels.len(), point_count);
    }

    labels
        .iter()
        .map(|&index| {
            let mut meta = match label_names.get(index) {
                Some(name) => PointMetadata::with_label(name.clone()),
                None if label_names.is_empty() => PointMetadata::with_label(index.to_string()),
                None => bail!(
                    "label index {} out of range ({} label names)",
                    index,
                    label_names.len()
                ),
            };
            meta.fields
                .insert("labelIndex".into(), MetadataValue::Number(index as f64));
            Ok(meta)
        })
        .collect()
}
