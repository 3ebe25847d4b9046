//! File I/O: safetensors segment files, the label CSV, and the prepared
//! dataset file.
//!
//! Segment file (one per segment):
//!   data      [C, T]  F32
//!   sfreq     [1]     F32
//!   ch_names  [n]     U8   newline-separated UTF-8
//!
//! Prepared dataset file (written by [`write_prepared`]):
//!   x_{train,test,val}         [N, S, 1]  F32
//!   y_{train,test,val}         [N]        U8
//!   end_time_{train,test,val}  [N]        I64
//!   classes                    [K]        U8
//!   class_weights              [K]        F64
//!   sfreq                      [1]        F32   conditioned rate
//!   standardize                [2]        F32   mean, std (only when fitted)
use anyhow::{anyhow, bail, Context, Result};
use ndarray::{Array1, Array2, Array3};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::dataset::Dataset;
use crate::labels::{LabelRow, LabelTable};
use crate::recording::{Recording, RecordingSource, Segment};
use crate::PreparedDataset;

// ── Low-level safetensors parser ─────────────────────────────────────────────

struct TensorEntry {
    dtype: String,
    shape: Vec<usize>,
    start: usize,
    end: usize,
}

/// An in-memory safetensors file.
pub struct StFile {
    bytes: Vec<u8>,
    data_start: usize,
    entries: HashMap<String, TensorEntry>,
}

impl StFile {
    pub fn open(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
        Self::from_bytes(bytes).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        let len_bytes: [u8; 8] = bytes
            .get(..8)
            .and_then(|b| b.try_into().ok())
            .context("safetensors file too small")?;
        let n = u64::from_le_bytes(len_bytes) as usize;
        let header_bytes = bytes.get(8..8 + n).context("truncated safetensors header")?;
        let header: HashMap<String, serde_json::Value> =
            serde_json::from_slice(header_bytes).context("failed to parse safetensors header")?;
        let data_start = 8 + n;

        let mut entries = HashMap::new();
        for (name, val) in header {
            if name == "__metadata__" {
                continue;
            }
            let entry = parse_entry(&val).with_context(|| format!("tensor {name:?}"))?;
            entries.insert(name.clone(), entry);
        }
        for (name, e) in &entries {
            if e.start > e.end || data_start + e.end > bytes.len() {
                bail!("tensor {name:?} lies outside the file");
            }
        }
        Ok(Self { bytes, data_start, entries })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn shape(&self, name: &str) -> Result<&[usize]> {
        Ok(&self.entry(name)?.shape)
    }

    fn entry(&self, name: &str) -> Result<&TensorEntry> {
        self.entries.get(name).with_context(|| format!("missing {name:?} key"))
    }

    fn raw(&self, name: &str, dtype: &str) -> Result<&[u8]> {
        let e = self.entry(name)?;
        if e.dtype != dtype {
            bail!("tensor {name:?} is {}, expected {dtype}", e.dtype);
        }
        Ok(&self.bytes[self.data_start + e.start..self.data_start + e.end])
    }

    pub fn f32(&self, name: &str) -> Result<Vec<f32>> {
        Ok(self.raw(name, "F32")?
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect())
    }

    pub fn f64(&self, name: &str) -> Result<Vec<f64>> {
        Ok(self.raw(name, "F64")?
            .chunks_exact(8)
            .map(|b| f64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]))
            .collect())
    }

    pub fn i64(&self, name: &str) -> Result<Vec<i64>> {
        Ok(self.raw(name, "I64")?
            .chunks_exact(8)
            .map(|b| i64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]))
            .collect())
    }

    pub fn u8(&self, name: &str) -> Result<Vec<u8>> {
        Ok(self.raw(name, "U8")?.to_vec())
    }

    pub fn f32_arr2(&self, name: &str) -> Result<Array2<f32>> {
        let shape = self.shape(name)?;
        let &[r, c] = shape else {
            bail!("tensor {name:?} has shape {shape:?}, expected 2-D");
        };
        Ok(Array2::from_shape_vec((r, c), self.f32(name)?)?)
    }

    pub fn f32_arr3(&self, name: &str) -> Result<Array3<f32>> {
        let shape = self.shape(name)?;
        let &[a, b, c] = shape else {
            bail!("tensor {name:?} has shape {shape:?}, expected 3-D");
        };
        Ok(Array3::from_shape_vec((a, b, c), self.f32(name)?)?)
    }
}

fn parse_entry(val: &serde_json::Value) -> Result<TensorEntry> {
    let dtype = val["dtype"].as_str().context("missing dtype")?.to_string();
    let shape = val["shape"]
        .as_array()
        .context("missing shape")?
        .iter()
        .map(|v| v.as_u64().map(|d| d as usize).context("non-integer dimension"))
        .collect::<Result<Vec<_>>>()?;
    let offsets = val["data_offsets"].as_array().context("missing data_offsets")?;
    let offset = |i: usize| {
        offsets
            .get(i)
            .and_then(|v| v.as_u64())
            .map(|v| v as usize)
            .context("malformed data_offsets")
    };
    Ok(TensorEntry { dtype, shape, start: offset(0)?, end: offset(1)? })
}

// ── Segment files ────────────────────────────────────────────────────────────

/// Load one segment file into a [`Recording`].
pub fn load_recording(path: &Path) -> Result<Recording> {
    let st = StFile::open(path)?;
    let data = st.f32_arr2("data").with_context(|| format!("{}", path.display()))?;
    let sfreq = *st
        .f32("sfreq")?
        .first()
        .with_context(|| format!("{}: empty 'sfreq'", path.display()))?;
    let raw_names = st.u8("ch_names")?;
    let ch_names: Vec<String> = std::str::from_utf8(&raw_names)
        .context("ch_names is not UTF-8")?
        .split('\n')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect();
    log::debug!(
        "loaded {}: {} ch × {} samples @ {sfreq} Hz",
        path.display(),
        data.nrows(),
        data.ncols()
    );
    Ok(Recording::new(ch_names, data, sfreq)?)
}

/// Write a [`Recording`] in the segment file layout.
pub fn write_recording(rec: &Recording, path: &Path) -> Result<()> {
    let mut w = StWriter::new();
    w.add_f32_arr2("data", &rec.data);
    w.add_f32("sfreq", &[rec.sfreq], &[1]);
    let names = rec.ch_names.join("\n");
    w.add_u8("ch_names", names.as_bytes(), &[names.len()]);
    w.write(path)
}

/// Interictal and ictal segment files of one subject.
#[derive(Debug, Clone)]
pub struct SafetensorsSource {
    pub interictal: PathBuf,
    pub ictal: PathBuf,
}

impl RecordingSource for SafetensorsSource {
    fn load(&self, segment: Segment) -> crate::Result<Recording> {
        let path = match segment {
            Segment::Interictal => &self.interictal,
            Segment::Ictal => &self.ictal,
        };
        Ok(load_recording(path).with_context(|| format!("loading {segment} segment"))?)
    }
}

// ── Label table ──────────────────────────────────────────────────────────────

/// Read a header-less `electrode,onset,offset` CSV.
///
/// Columns past the third are ignored. Fields are kept as text and parsed
/// by [`LabelTable::resolve`]; `build_dataset` resolves every row before
/// windowing, so a malformed row aborts the run whether or not its
/// electrode is recorded.
pub fn load_label_table(path: &Path, placeholder: &str) -> Result<LabelTable> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("opening {}", path.display()))?;

    let mut rows = Vec::new();
    for (i, rec) in rdr.records().enumerate() {
        let rec = rec.with_context(|| format!("{}: row {}", path.display(), i + 1))?;
        match (rec.get(0), rec.get(1), rec.get(2)) {
            (Some(id), Some(onset), Some(offset)) => rows.push(LabelRow::new(id, onset, offset)),
            _ => bail!(
                "{}: row {} has {} fields, expected at least 3",
                path.display(),
                i + 1,
                rec.len()
            ),
        }
    }
    log::debug!("loaded {} label rows from {}", rows.len(), path.display());
    Ok(LabelTable::new(rows, placeholder))
}

// ── Generic safetensors builder ──────────────────────────────────────────────

/// Safetensors writer for F32, F64, I64 and U8 tensors.
///
/// ```rust,no_run
/// use ictal::io::StWriter;
/// use std::path::Path;
/// let mut w = StWriter::new();
/// w.add_f32("signal", &[1.0f32, 2.0, 3.0], &[1, 3]);
/// w.add_u8("mask", &[0u8, 1, 1], &[3]);
/// w.write(Path::new("/tmp/out.safetensors")).unwrap();
/// ```
#[derive(Default)]
pub struct StWriter {
    entries: Vec<(String, Vec<u8>, &'static str, Vec<usize>)>,
}

impl StWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_f32(&mut self, name: &str, data: &[f32], shape: &[usize]) {
        let bytes: Vec<u8> = data.iter().flat_map(|v| v.to_le_bytes()).collect();
        self.entries.push((name.to_string(), bytes, "F32", shape.to_vec()));
    }

    pub fn add_f32_arr2(&mut self, name: &str, arr: &Array2<f32>) {
        let data: Vec<f32> = arr.iter().copied().collect();
        self.add_f32(name, &data, &[arr.nrows(), arr.ncols()]);
    }

    pub fn add_f32_arr3(&mut self, name: &str, arr: &Array3<f32>) {
        let data: Vec<f32> = arr.iter().copied().collect();
        let (a, b, c) = arr.dim();
        self.add_f32(name, &data, &[a, b, c]);
    }

    pub fn add_f64(&mut self, name: &str, data: &[f64], shape: &[usize]) {
        let bytes: Vec<u8> = data.iter().flat_map(|v| v.to_le_bytes()).collect();
        self.entries.push((name.to_string(), bytes, "F64", shape.to_vec()));
    }

    pub fn add_i64(&mut self, name: &str, data: &[i64], shape: &[usize]) {
        let bytes: Vec<u8> = data.iter().flat_map(|v| v.to_le_bytes()).collect();
        self.entries.push((name.to_string(), bytes, "I64", shape.to_vec()));
    }

    pub fn add_u8(&mut self, name: &str, data: &[u8], shape: &[usize]) {
        self.entries.push((name.to_string(), data.to_vec(), "U8", shape.to_vec()));
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        use std::io::Write;
        let mut header_map = serde_json::Map::new();
        let mut offset: usize = 0;
        for (name, data, dtype, shape) in &self.entries {
            header_map.insert(
                name.clone(),
                serde_json::json!({
                    "dtype": dtype,
                    "shape": shape,
                    "data_offsets": [offset, offset + data.len()],
                }),
            );
            offset += data.len();
        }
        let hdr_bytes = serde_json::to_vec(&header_map)?;
        let pad = (8 - hdr_bytes.len() % 8) % 8;
        let padded: Vec<u8> = hdr_bytes
            .into_iter()
            .chain(std::iter::repeat(b' ').take(pad))
            .collect();
        let mut f = std::fs::File::create(path)
            .with_context(|| format!("creating {}", path.display()))?;
        f.write_all(&(padded.len() as u64).to_le_bytes())?;
        f.write_all(&padded)?;
        for (_, data, _, _) in &self.entries {
            f.write_all(data)?;
        }
        Ok(())
    }
}

// ── Prepared dataset ─────────────────────────────────────────────────────────

fn add_split(w: &mut StWriter, suffix: &str, d: &Dataset) {
    w.add_f32_arr3(&format!("x_{suffix}"), &d.windows);
    w.add_u8(&format!("y_{suffix}"), &d.labels.to_vec(), &[d.len()]);
    w.add_i64(&format!("end_time_{suffix}"), &d.end_times.to_vec(), &[d.len()]);
}

/// Write the three splits and the class weights to one safetensors file.
pub fn write_prepared(prepared: &PreparedDataset, path: &Path) -> Result<()> {
    let mut w = StWriter::new();
    add_split(&mut w, "train", &prepared.splits.train);
    add_split(&mut w, "test", &prepared.splits.test);
    add_split(&mut w, "val", &prepared.splits.val);

    let classes = prepared.class_weights.classes();
    w.add_u8("classes", &classes, &[classes.len()]);
    w.add_f64("class_weights", &prepared.class_weights.weights(), &[classes.len()]);
    w.add_f32("sfreq", &[prepared.sfreq], &[1]);
    if let Some(st) = prepared.standardizer {
        w.add_f32("standardize", &[st.mean, st.std], &[2]);
    }
    w.write(path)
}

/// Windows, labels and end times of one split, as written by
/// [`write_prepared`]. Electrode spans are not stored.
pub fn read_split(st: &StFile, suffix: &str) -> Result<Dataset> {
    let windows = st.f32_arr3(&format!("x_{suffix}"))?;
    let labels = Array1::from(st.u8(&format!("y_{suffix}"))?);
    let end_times = Array1::from(st.i64(&format!("end_time_{suffix}"))?);
    if labels.len() != windows.shape()[0] || end_times.len() != labels.len() {
        return Err(anyhow!(
            "split {suffix:?}: {} windows, {} labels, {} end times",
            windows.shape()[0],
            labels.len(),
            end_times.len()
        ));
    }
    Ok(Dataset { windows, labels, end_times, spans: Vec::new() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn recording_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seg.safetensors");
        let data = Array2::from_shape_fn((3, 50), |(c, t)| (c * 100 + t) as f32 * 0.5);
        let names = vec!["LA1".to_string(), "LA2".into(), "RB10".into()];
        let rec = Recording::new(names, data, 1024.0).unwrap();
        write_recording(&rec, &path).unwrap();
        assert_eq!(load_recording(&path).unwrap(), rec);
    }

    #[test]
    fn source_reads_both_segments() {
        let dir = tempfile::tempdir().unwrap();
        let a = Recording::new(vec!["X".into()], Array2::zeros((1, 10)), 512.0).unwrap();
        let b = Recording::new(vec!["X".into()], Array2::ones((1, 12)), 512.0).unwrap();
        let src = SafetensorsSource {
            interictal: dir.path().join("inter.safetensors"),
            ictal: dir.path().join("ictal.safetensors"),
        };
        write_recording(&a, &src.interictal).unwrap();
        write_recording(&b, &src.ictal).unwrap();
        assert_eq!(src.load(Segment::Interictal).unwrap(), a);
        assert_eq!(src.load(Segment::Ictal).unwrap().n_samples(), 12);
    }

    #[test]
    fn missing_segment_file_is_other_error() {
        let src = SafetensorsSource {
            interictal: PathBuf::from("/nonexistent/inter.safetensors"),
            ictal: PathBuf::from("/nonexistent/ictal.safetensors"),
        };
        assert!(matches!(src.load(Segment::Ictal), Err(crate::PrepError::Other(_))));
    }

    #[test]
    fn wrong_dtype_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.safetensors");
        let mut w = StWriter::new();
        w.add_f64("data", &[0.0; 4], &[2, 2]);
        w.write(&path).unwrap();
        let st = StFile::open(&path).unwrap();
        assert!(st.f32_arr2("data").is_err());
        assert!(load_recording(&path).is_err());
    }

    #[test]
    fn truncated_file_is_rejected() {
        assert!(StFile::from_bytes(vec![1, 2, 3]).is_err());
        let mut bytes = 100u64.to_le_bytes().to_vec();
        bytes.extend_from_slice(b"{}");
        assert!(StFile::from_bytes(bytes).is_err());
    }

    #[test]
    fn label_csv_is_headerless_and_trimmed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("labels.csv");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "LA1, 416050000000, 416060000000").unwrap();
        writeln!(f, "LA2,-,-").unwrap();
        drop(f);

        let table = load_label_table(&path, "-").unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows()[0], LabelRow::new("LA1", "416050000000", "416060000000"));
        assert_eq!(table.mark("LA2").unwrap(), crate::SeizureMark::Unmarked);
    }

    #[test]
    fn label_csv_rejects_short_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("labels.csv");
        std::fs::write(&path, "LA1,1,2\nLA2,3\n").unwrap();
        assert!(load_label_table(&path, "-").is_err());
    }

    #[test]
    fn label_csv_ignores_trailing_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("labels.csv");
        std::fs::write(&path, "LA1,416050000000,416060000000,clinician A\nLA2,-,-,,\n").unwrap();

        let table = load_label_table(&path, "-").unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows()[0], LabelRow::new("LA1", "416050000000", "416060000000"));
        assert_eq!(table.mark("LA2").unwrap(), crate::SeizureMark::Unmarked);
    }
}
