use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use arrow::array::{
    Array, ArrayRef, Float32Array, Float64Array, Float64Builder, LargeListArray, LargeStringArray,
    ListArray, ListBuilder, StringArray,
};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use serde::{Deserialize, Serialize};

use super::model::{AxisSpec, BinAxis, HistogramFile, StoredHistogram};
use crate::error::HistError;
use crate::source::{DataFile, FileOpener};

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a histogram container from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.json`            – `{ "histograms": [ { "name", "x", "contents", ... } ] }`
/// * `.parquet` / `.pq` – one row per histogram with list-typed edge and cell columns
pub fn load_file(path: &Path) -> Result<HistogramFile> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let histograms = match ext.as_str() {
        "json" => load_json(path)?,
        "parquet" | "pq" => load_parquet(path)?,
        other => bail!("Unsupported file extension: .{other}"),
    };
    Ok(HistogramFile::new(path, histograms))
}

/// [`FileOpener`] backed by [`load_file`].
#[derive(Debug, Clone, Copy, Default)]
pub struct HistFileOpener;

impl FileOpener for HistFileOpener {
    fn open(&self, path: &Path) -> crate::error::Result<Box<dyn DataFile>> {
        match load_file(path) {
            Ok(file) => {
                log::debug!("loaded {} histograms from {}", file.len(), path.display());
                Ok(Box::new(file))
            }
            Err(e) => Err(HistError::FileOpen {
                path: path.to_path_buf(),
                reason: format!("{e:#}"),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// JSON container
// ---------------------------------------------------------------------------

/// On-disk record of one histogram.
///
/// ```json
/// {
///   "histograms": [
///     {
///       "name": "ENeutron",
///       "title": "Neutron energy",
///       "x": { "bins": 3, "min": 0.0, "max": 3.0 },
///       "contents": [0, 4, 9, 1, 0],
///       "sumw2": [0, 4, 9, 1, 0]
///     }
///   ]
/// }
/// ```
///
/// `contents` (and `sumw2`) hold every cell including under- and overflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistogramRecord {
    pub name: String,
    #[serde(default)]
    pub title: String,
    pub x: AxisSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<AxisSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z: Option<AxisSpec>,
    pub contents: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sumw2: Option<Vec<f64>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContainerDocument {
    pub histograms: Vec<HistogramRecord>,
}

impl HistogramRecord {
    pub fn into_histogram(self) -> Result<StoredHistogram> {
        // Each axis contributes a factor of at least `bins + 2` cells, so a
        // uniform axis can never declare more bins than the stored contents allow.
        for spec in [Some(&self.x), self.y.as_ref(), self.z.as_ref()].into_iter().flatten() {
            if let AxisSpec::Uniform { bins, .. } = spec {
                if bins.saturating_add(2) > self.contents.len() {
                    bail!(
                        "histogram {} declares {bins} bins but stores only {} cells",
                        self.name,
                        self.contents.len()
                    );
                }
            }
        }
        let mut axes = vec![BinAxis::from_spec(&self.x).context("x axis")?];
        if self.y.is_none() && self.z.is_some() {
            bail!("histogram {} has a z axis but no y axis", self.name);
        }
        if let Some(y) = &self.y {
            axes.push(BinAxis::from_spec(y).context("y axis")?);
        }
        if let Some(z) = &self.z {
            axes.push(BinAxis::from_spec(z).context("z axis")?);
        }
        StoredHistogram::new(self.name, self.title, axes, self.contents, self.sumw2)
    }

    pub fn from_histogram(hist: &StoredHistogram) -> Self {
        let specs: Vec<AxisSpec> = hist.axes().iter().map(BinAxis::to_spec).collect();
        let mut specs = specs.into_iter();
        HistogramRecord {
            name: hist.name.clone(),
            title: hist.title.clone(),
            x: specs.next().unwrap_or(AxisSpec::Variable { edges: Vec::new() }),
            y: specs.next(),
            z: specs.next(),
            contents: hist.contents().to_vec(),
            sumw2: hist.sumw2().map(<[f64]>::to_vec),
        }
    }
}

fn load_json(path: &Path) -> Result<Vec<StoredHistogram>> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let doc: ContainerDocument = serde_json::from_str(&text).context("parsing JSON")?;

    doc.histograms
        .into_iter()
        .enumerate()
        .map(|(i, rec)| {
            let name = rec.name.clone();
            rec.into_histogram()
                .with_context(|| format!("Histogram {i} ({name})"))
        })
        .collect()
}

/// Write histograms as a JSON container.
pub fn write_json(path: &Path, histograms: &[StoredHistogram]) -> Result<()> {
    let doc = ContainerDocument {
        histograms: histograms.iter().map(HistogramRecord::from_histogram).collect(),
    };
    let text = serde_json::to_string_pretty(&doc).context("serializing JSON")?;
    std::fs::write(path, text).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Parquet container
// ---------------------------------------------------------------------------

/// Load a Parquet file containing one histogram per row.
///
/// Expected schema:
/// - `name`: Utf8
/// - `title`: Utf8 (optional column, nullable)
/// - `x_edges`: List<Float64> – bin edges of the x axis
/// - `y_edges`, `z_edges`: List<Float64> (optional columns, null for lower dimensions)
/// - `contents`: List<Float64> – every cell including under/overflow
/// - `sumw2`: List<Float64> (optional column, nullable)
fn load_parquet(path: &Path) -> Result<Vec<StoredHistogram>> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let reader = builder.build().context("building parquet reader")?;

    let mut histograms = Vec::new();

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let schema = batch.schema();

        let required = |name: &str| -> Result<ArrayRef> {
            let idx = schema
                .index_of(name)
                .map_err(|_| anyhow!("Parquet file missing '{name}' column"))?;
            Ok(batch.column(idx).clone())
        };
        let optional = |name: &str| schema.index_of(name).ok().map(|i| batch.column(i).clone());

        let names = required("name")?;
        let x_edges = required("x_edges")?;
        let contents = required("contents")?;
        let titles = optional("title");
        let y_edges = optional("y_edges");
        let z_edges = optional("z_edges");
        let sumw2 = optional("sumw2");

        for row in 0..batch.num_rows() {
            let name = extract_string(&names, row)
                .with_context(|| format!("Row {row}: failed to read 'name'"))?
                .ok_or_else(|| anyhow!("Row {row}: histogram name is null"))?;
            let title = match &titles {
                Some(col) => extract_string(col, row)?.unwrap_or_default(),
                None => String::new(),
            };

            let mut axes = vec![BinAxis::from_edges(
                extract_f64_list(&x_edges, row)
                    .with_context(|| format!("Row {row}: failed to read 'x_edges'"))?,
            )?];
            let present = |col: &Option<ArrayRef>| col.clone().filter(|c| !c.is_null(row));
            let (y, z) = (present(&y_edges), present(&z_edges));
            if y.is_none() && z.is_some() {
                bail!("Row {row}: histogram {name} has z_edges but no y_edges");
            }
            for (label, col) in [("y_edges", y), ("z_edges", z)] {
                let Some(col) = col else { continue };
                let edges = extract_f64_list(&col, row)
                    .with_context(|| format!("Row {row}: failed to read '{label}'"))?;
                axes.push(BinAxis::from_edges(edges)?);
            }

            let cells = extract_f64_list(&contents, row)
                .with_context(|| format!("Row {row}: failed to read 'contents'"))?;
            let weights = match &sumw2 {
                Some(col) if !col.is_null(row) => Some(
                    extract_f64_list(col, row)
                        .with_context(|| format!("Row {row}: failed to read 'sumw2'"))?,
                ),
                _ => None,
            };

            histograms.push(
                StoredHistogram::new(name, title, axes, cells, weights)
                    .with_context(|| format!("Row {row}"))?,
            );
        }
    }

    Ok(histograms)
}

/// Write histograms as a Parquet container (one row per histogram).
pub fn write_parquet(path: &Path, histograms: &[StoredHistogram]) -> Result<()> {
    let list_field = || {
        DataType::List(Arc::new(Field::new("item", DataType::Float64, true)))
    };
    let schema = Arc::new(Schema::new(vec![
        Field::new("name", DataType::Utf8, false),
        Field::new("title", DataType::Utf8, true),
        Field::new("x_edges", list_field(), false),
        Field::new("y_edges", list_field(), true),
        Field::new("z_edges", list_field(), true),
        Field::new("contents", list_field(), false),
        Field::new("sumw2", list_field(), true),
    ]));

    let names = StringArray::from(histograms.iter().map(|h| h.name.as_str()).collect::<Vec<_>>());
    let titles = StringArray::from(
        histograms
            .iter()
            .map(|h| (!h.title.is_empty()).then_some(h.title.as_str()))
            .collect::<Vec<_>>(),
    );
    let axis_edges = |pos: usize| {
        build_f64_list(histograms.iter().map(|h| h.axes().get(pos).map(BinAxis::edges)))
    };
    let contents = build_f64_list(histograms.iter().map(|h| Some(h.contents())));
    let sumw2 = build_f64_list(histograms.iter().map(|h| h.sumw2()));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(names),
            Arc::new(titles),
            Arc::new(axis_edges(0)),
            Arc::new(axis_edges(1)),
            Arc::new(axis_edges(2)),
            Arc::new(contents),
            Arc::new(sumw2),
        ],
    )
    .context("building record batch")?;

    let file = std::fs::File::create(path)
        .with_context(|| format!("creating {}", path.display()))?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing parquet batch")?;
    writer.close().context("closing parquet writer")?;
    Ok(())
}

// -- Parquet / Arrow helpers --

fn build_f64_list<'a>(rows: impl Iterator<Item = Option<&'a [f64]>>) -> ListArray {
    let mut builder = ListBuilder::new(Float64Builder::new());
    for row in rows {
        match row {
            Some(values) => {
                builder.values().append_slice(values);
                builder.append(true);
            }
            None => builder.append(false),
        }
    }
    builder.finish()
}

fn extract_string(col: &ArrayRef, row: usize) -> Result<Option<String>> {
    if col.is_null(row) {
        return Ok(None);
    }
    if let Some(s) = col.as_any().downcast_ref::<StringArray>() {
        Ok(Some(s.value(row).to_string()))
    } else if let Some(s) = col.as_any().downcast_ref::<LargeStringArray>() {
        Ok(Some(s.value(row).to_string()))
    } else {
        bail!("Expected Utf8 column, got {:?}", col.data_type())
    }
}

/// Extract a `Vec<f64>` from a List or LargeList column at the given row.
fn extract_f64_list(col: &ArrayRef, row: usize) -> Result<Vec<f64>> {
    if col.is_null(row) {
        bail!("null value in list column");
    }

    let values_array = match col.data_type() {
        DataType::List(_) => {
            let list_arr = col
                .as_any()
                .downcast_ref::<ListArray>()
                .context("expected ListArray")?;
            list_arr.value(row)
        }
        DataType::LargeList(_) => {
            let list_arr = col
                .as_any()
                .downcast_ref::<LargeListArray>()
                .context("expected LargeListArray")?;
            list_arr.value(row)
        }
        other => bail!("Expected List or LargeList column, got {other:?}"),
    };

    // The inner array can be Float64 or Float32
    if let Some(f64_arr) = values_array.as_any().downcast_ref::<Float64Array>() {
        Ok(f64_arr.iter().map(|v| v.unwrap_or(f64::NAN)).collect())
    } else if let Some(f32_arr) = values_array.as_any().downcast_ref::<Float32Array>() {
        Ok(f32_arr.iter().map(|v| v.unwrap_or(f32::NAN) as f64).collect())
    } else {
        bail!(
            "List inner type is {:?}, expected Float64 or Float32",
            values_array.data_type()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<StoredHistogram> {
        let x = BinAxis::uniform(3, 0.0, 3.0).unwrap();
        let y = BinAxis::from_edges(vec![0.0, 1.0, 4.0]).unwrap();
        vec![
            StoredHistogram::from_bins("h1", vec![x.clone()], &[1.0, 2.0, 3.0], Some(&[1.0, 1.0, 2.0]))
                .unwrap(),
            StoredHistogram::from_bins("h2", vec![x, y], &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], None)
                .unwrap(),
        ]
    }

    #[test]
    fn json_container_preserves_histograms() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run1.json");
        write_json(&path, &sample()).unwrap();

        let file = load_file(&path).unwrap();
        assert_eq!(file.histograms(), sample().as_slice());
    }

    #[test]
    fn parquet_container_preserves_histograms() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run1.parquet");
        write_parquet(&path, &sample()).unwrap();

        let file = load_file(&path).unwrap();
        assert_eq!(file.keys(), ["h1", "h2"]);
        assert_eq!(file.histograms(), sample().as_slice());
    }

    #[test]
    fn json_accepts_uniform_axis_shorthand() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("short.json");
        std::fs::write(
            &path,
            r#"{"histograms":[{"name":"E","x":{"bins":2,"min":0,"max":2},"contents":[0,1,2,0]}]}"#,
        )
        .unwrap();

        let file = load_file(&path).unwrap();
        let h = &file.histograms()[0];
        assert_eq!(h.axes()[0].edges(), &[0.0, 1.0, 2.0]);
        assert_eq!(h.title, "");
    }

    #[test]
    fn rejects_wrong_cell_count_and_extension() {
        let dir = tempfile::tempdir().unwrap();
        let bad = dir.path().join("bad.json");
        std::fs::write(
            &bad,
            r#"{"histograms":[{"name":"E","x":{"bins":2,"min":0,"max":2},"contents":[1,2]}]}"#,
        )
        .unwrap();
        assert!(load_file(&bad).is_err());

        let other = dir.path().join("data.root");
        std::fs::write(&other, b"root").unwrap();
        let err = load_file(&other).unwrap_err();
        assert!(format!("{err:#}").contains("Unsupported file extension"));
    }

    #[test]
    fn parquet_rejects_z_edges_without_y_edges() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gap.parquet");
        let list_field = || DataType::List(Arc::new(Field::new("item", DataType::Float64, true)));
        let schema = Arc::new(Schema::new(vec![
            Field::new("name", DataType::Utf8, false),
            Field::new("x_edges", list_field(), false),
            Field::new("y_edges", list_field(), true),
            Field::new("z_edges", list_field(), true),
            Field::new("contents", list_field(), false),
        ]));
        let edges: &[f64] = &[0.0, 1.0, 2.0];
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(StringArray::from(vec!["gap"])),
                Arc::new(build_f64_list([Some(edges)].into_iter())),
                Arc::new(build_f64_list([None].into_iter())),
                Arc::new(build_f64_list([Some(edges)].into_iter())),
                Arc::new(build_f64_list([Some(&[0.0; 16][..])].into_iter())),
            ],
        )
        .unwrap();
        let mut writer = ArrowWriter::try_new(std::fs::File::create(&path).unwrap(), schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();

        let err = load_file(&path).unwrap_err();
        assert!(format!("{err:#}").contains("z_edges but no y_edges"));
    }

    #[test]
    fn opener_maps_failures_to_file_open() {
        let err = HistFileOpener.open(Path::new("/nonexistent/none.json")).err().unwrap();
        assert!(matches!(err, HistError::FileOpen { .. }));
    }
}
