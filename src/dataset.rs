//! Dataset assembly and positional splitting.
//!
//! Electrodes are concatenated in the order given, each contributing its
//! interictal windows and then its ictal windows. The split is positional:
//! train is the leading block of rows, test the next, validation the rest.
//! Adjacent, overlapping windows of one electrode therefore stay together,
//! except where a split boundary falls inside an electrode's block.
use ndarray::{s, Array1, Array3, Axis};
use std::ops::Range;

use crate::config::SplitFractions;
use crate::error::{PrepError, Result};
use crate::window::{ElectrodeWindows, SegmentWindows};

/// Rows `[start, start + len)` of a dataset came from `electrode_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElectrodeSpan {
    pub electrode_id: String,
    pub start: usize,
    pub len: usize,
}

/// Positive / negative window counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LabelCounts {
    pub seizure: usize,
    pub non_seizure: usize,
}

/// Windows, labels and provenance, row-aligned.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    /// `[N, sequence_len, 1]`
    pub windows: Array3<f32>,
    pub labels: Array1<u8>,
    pub end_times: Array1<i64>,
    pub spans: Vec<ElectrodeSpan>,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn sequence_len(&self) -> usize {
        self.windows.shape()[1]
    }

    pub fn label_counts(&self) -> LabelCounts {
        let seizure = self.labels.iter().filter(|&&l| l == 1).count();
        LabelCounts { seizure, non_seizure: self.len() - seizure }
    }

    /// Copy of rows `range`, with spans clipped to it and rebased to 0.
    pub fn slice_rows(&self, range: Range<usize>) -> Dataset {
        let spans = self
            .spans
            .iter()
            .filter_map(|sp| {
                let start = sp.start.max(range.start);
                let end = (sp.start + sp.len).min(range.end);
                (start < end).then(|| ElectrodeSpan {
                    electrode_id: sp.electrode_id.clone(),
                    start: start - range.start,
                    len: end - start,
                })
            })
            .collect();
        Dataset {
            windows: self.windows.slice(s![range.clone(), .., ..]).to_owned(),
            labels: self.labels.slice(s![range.clone()]).to_owned(),
            end_times: self.end_times.slice(s![range]).to_owned(),
            spans,
        }
    }
}

/// Train / test / validation partitions.
#[derive(Debug, Clone, PartialEq)]
pub struct Splits {
    pub train: Dataset,
    pub test: Dataset,
    pub val: Dataset,
}

/// Concatenate per-electrode windows in the given order.
///
/// # Errors
/// [`PrepError::ShapeMismatch`] if any segment's windows are not
/// `[W, sequence_len, 1]` or its label / timestamp counts differ from `W`.
pub fn assemble(parts: &[ElectrodeWindows], sequence_len: usize) -> Result<Dataset> {
    for part in parts {
        check_segment(&part.electrode_id, "interictal", &part.interictal, sequence_len)?;
        check_segment(&part.electrode_id, "ictal", &part.ictal, sequence_len)?;
    }

    let n: usize = parts.iter().map(ElectrodeWindows::len).sum();
    let mut windows = Array3::<f32>::zeros((n, sequence_len, 1));
    let mut labels = Array1::<u8>::zeros(n);
    let mut end_times = Array1::<i64>::zeros(n);
    let mut spans = Vec::with_capacity(parts.len());

    let mut row = 0;
    for part in parts {
        let start = row;
        for seg in [&part.interictal, &part.ictal] {
            let rows = row..row + seg.len();
            windows.slice_mut(s![rows.clone(), .., ..]).assign(&seg.windows);
            labels.slice_mut(s![rows.clone()]).assign(&seg.labels);
            end_times.slice_mut(s![rows]).assign(&seg.end_times);
            row += seg.len();
        }
        spans.push(ElectrodeSpan {
            electrode_id: part.electrode_id.clone(),
            start,
            len: row - start,
        });
    }

    Ok(Dataset { windows, labels, end_times, spans })
}

fn check_segment(
    electrode_id: &str,
    segment: &str,
    seg: &SegmentWindows,
    sequence_len: usize,
) -> Result<()> {
    let (w, t, f) = seg.windows.dim();
    if t != sequence_len || f != 1 {
        return Err(PrepError::ShapeMismatch(format!(
            "electrode {electrode_id:?} {segment}: windows are [{w}, {t}, {f}], expected [_, {sequence_len}, 1]"
        )));
    }
    if seg.labels.len() != w || seg.end_times.len() != w {
        return Err(PrepError::ShapeMismatch(format!(
            "electrode {electrode_id:?} {segment}: {w} windows, {} labels, {} timestamps",
            seg.labels.len(),
            seg.end_times.len()
        )));
    }
    Ok(())
}

/// Positional split.
///
/// The first `floor(train · N)` rows are train, the next `floor(test · N)`
/// are test, and the remainder is validation.
pub fn split(dataset: &Dataset, fractions: &SplitFractions) -> Splits {
    let n = dataset.len();
    let (n_train, n_test, _) = fractions.counts(n);
    Splits {
        train: dataset.slice_rows(0..n_train),
        test: dataset.slice_rows(n_train..n_train + n_test),
        val: dataset.slice_rows(n_train + n_test..n),
    }
}

/// Concatenate datasets row-wise (inverse of [`split`]).
pub fn concat(parts: &[&Dataset]) -> Result<Dataset> {
    let seq = parts.first().map_or(0, |d| d.sequence_len());
    if let Some(bad) = parts.iter().find(|d| d.sequence_len() != seq) {
        return Err(PrepError::ShapeMismatch(format!(
            "cannot concatenate windows of length {} and {seq}",
            bad.sequence_len()
        )));
    }
    // Spans bisected by a split boundary are joined back together.
    let mut spans: Vec<ElectrodeSpan> = Vec::new();
    let mut offset = 0;
    for d in parts {
        for sp in &d.spans {
            let start = sp.start + offset;
            match spans.last_mut() {
                Some(last)
                    if last.electrode_id == sp.electrode_id && last.start + last.len == start =>
                {
                    last.len += sp.len;
                }
                _ => spans.push(ElectrodeSpan {
                    electrode_id: sp.electrode_id.clone(),
                    start,
                    len: sp.len,
                }),
            }
        }
        offset += d.len();
    }
    let windows: Vec<_> = parts.iter().map(|d| d.windows.view()).collect();
    let labels: Vec<_> = parts.iter().map(|d| d.labels.view()).collect();
    let end_times: Vec<_> = parts.iter().map(|d| d.end_times.view()).collect();
    let to_shape_err = |e: ndarray::ShapeError| PrepError::ShapeMismatch(e.to_string());
    Ok(Dataset {
        windows: ndarray::concatenate(Axis(0), &windows).map_err(to_shape_err)?,
        labels: ndarray::concatenate(Axis(0), &labels).map_err(to_shape_err)?,
        end_times: ndarray::concatenate(Axis(0), &end_times).map_err(to_shape_err)?,
        spans,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labels::SeizureInterval;
    use crate::window::{extract, WindowParams};
    use ndarray::Array1;

    fn electrode(id: &str, n: usize, iv: SeizureInterval) -> ElectrodeWindows {
        let x = Array1::from_iter((0..n).map(|v| v as f32));
        let p = WindowParams { sequence_len: 4, step_size: 2, sample_period: 1 };
        extract(id, x.view(), x.view(), iv, 0, 100, &p)
    }

    #[test]
    fn assemble_orders_electrodes_then_segments() {
        let never = SeizureInterval { onset: 1, offset: 0 };
        let ictal_first = SeizureInterval { onset: 104, offset: 104 };
        let parts = vec![electrode("A", 9, never), electrode("B", 9, ictal_first)];
        let ds = assemble(&parts, 4).unwrap();
        // 9 samples, seq 4, step 2 → edges 4, 6, 8 → 3 windows per segment
        assert_eq!(ds.windows.shape(), &[12, 4, 1]);
        assert_eq!(ds.labels.to_vec(), vec![0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0]);
        assert_eq!(ds.end_times.to_vec(), vec![4, 6, 8, 104, 106, 108, 4, 6, 8, 104, 106, 108]);
        assert_eq!(
            ds.spans,
            vec![
                ElectrodeSpan { electrode_id: "A".into(), start: 0, len: 6 },
                ElectrodeSpan { electrode_id: "B".into(), start: 6, len: 6 },
            ]
        );
    }

    #[test]
    fn assemble_rejects_wrong_window_length() {
        let never = SeizureInterval { onset: 1, offset: 0 };
        let parts = vec![electrode("A", 9, never)];
        assert!(matches!(assemble(&parts, 5), Err(PrepError::ShapeMismatch(_))));
    }

    #[test]
    fn assemble_rejects_label_count_mismatch() {
        let never = SeizureInterval { onset: 1, offset: 0 };
        let mut part = electrode("A", 9, never);
        part.ictal.labels = Array1::zeros(2);
        assert!(matches!(assemble(&[part], 4), Err(PrepError::ShapeMismatch(_))));
    }

    #[test]
    fn assemble_nothing_is_empty() {
        let ds = assemble(&[], 16).unwrap();
        assert!(ds.is_empty());
        assert_eq!(ds.windows.shape(), &[0, 16, 1]);
    }

    #[test]
    fn split_is_positional_and_covers() {
        let never = SeizureInterval { onset: 1, offset: 0 };
        let parts: Vec<_> = ["A", "B", "C"].iter().map(|id| electrode(id, 13, never)).collect();
        let ds = assemble(&parts, 4).unwrap(); // 5 + 5 per electrode → 30 rows
        let splits = split(&ds, &SplitFractions { train: 0.5, test: 0.3, val: 0.2 });
        assert_eq!((splits.train.len(), splits.test.len(), splits.val.len()), (15, 9, 6));
        assert_eq!(splits.train.windows, ds.windows.slice(s![0..15, .., ..]));
        assert_eq!(splits.val.end_times, ds.end_times.slice(s![24..30]));

        // Electrode B (rows 10..20) is bisected at row 15.
        assert_eq!(
            splits.train.spans.last().unwrap(),
            &ElectrodeSpan { electrode_id: "B".into(), start: 10, len: 5 }
        );
        assert_eq!(
            splits.test.spans[0],
            ElectrodeSpan { electrode_id: "B".into(), start: 0, len: 5 }
        );

        let back = concat(&[&splits.train, &splits.test, &splits.val]).unwrap();
        assert_eq!(back.windows, ds.windows);
        assert_eq!(back.labels, ds.labels);
        assert_eq!(back.spans, ds.spans);
    }

    #[test]
    fn label_counts() {
        let iv = SeizureInterval { onset: 100, offset: 106 };
        let ds = assemble(&[electrode("A", 9, iv)], 4).unwrap();
        assert_eq!(ds.label_counts(), LabelCounts { seizure: 2, non_seizure: 4 });
    }
}
