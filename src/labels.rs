//! Electrode seizure labels.
//!
//! A label row names an electrode and the clock ticks at which seizure
//! activity starts and stops on it. Electrodes that never seize carry a
//! placeholder instead of numbers. Rows are kept as text and parsed on
//! lookup into a [`SeizureMark`], which resolves to one canonical
//! [`SeizureInterval`].
use crate::error::{PrepError, Result};

/// One raw row of the label table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelRow {
    pub electrode_id: String,
    pub onset: String,
    pub offset: String,
}

impl LabelRow {
    pub fn new(electrode_id: &str, onset: &str, offset: &str) -> Self {
        Self {
            electrode_id: electrode_id.to_string(),
            onset: onset.to_string(),
            offset: offset.to_string(),
        }
    }
}

/// Parsed seizure annotation of one electrode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeizureMark {
    Marked { onset: i64, offset: i64 },
    Unmarked,
}

impl SeizureMark {
    /// Resolve to an interval on the recording clock.
    ///
    /// Unmarked electrodes get `[ictal_start + 1, ictal_start + 1]`. Every
    /// window ends at least one full window after `ictal_start`, so no window
    /// of an unmarked electrode is ever labeled positive.
    pub fn resolve(self, ictal_start: i64) -> SeizureInterval {
        match self {
            SeizureMark::Marked { onset, offset } => SeizureInterval { onset, offset },
            SeizureMark::Unmarked => SeizureInterval {
                onset: ictal_start + 1,
                offset: ictal_start + 1,
            },
        }
    }
}

/// Closed interval `[onset, offset]` of clock ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeizureInterval {
    pub onset: i64,
    pub offset: i64,
}

impl SeizureInterval {
    #[inline]
    pub fn contains(&self, t: i64) -> bool {
        self.onset <= t && t <= self.offset
    }
}

/// The label table for one subject.
#[derive(Debug, Clone)]
pub struct LabelTable {
    rows: Vec<LabelRow>,
    placeholder: String,
}

impl LabelTable {
    /// `placeholder` is the cell text meaning "unmarked" (`"-"` by default
    /// in [`crate::PipelineConfig`]).
    pub fn new(rows: Vec<LabelRow>, placeholder: impl Into<String>) -> Self {
        Self { rows, placeholder: placeholder.into() }
    }

    pub fn rows(&self) -> &[LabelRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Distinct electrode ids in first-appearance order.
    pub fn electrode_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = Vec::with_capacity(self.rows.len());
        for r in &self.rows {
            if !ids.contains(&r.electrode_id.as_str()) {
                ids.push(&r.electrode_id);
            }
        }
        ids
    }

    /// Parse the single row for `electrode_id`.
    ///
    /// # Errors
    /// * [`PrepError::UnknownElectrode`] if zero or several rows match.
    /// * [`PrepError::MalformedLabel`] if a marked field is not an integer.
    pub fn mark(&self, electrode_id: &str) -> Result<SeizureMark> {
        let mut matches = self.rows.iter().filter(|r| r.electrode_id == electrode_id);
        let row = match (matches.next(), matches.count()) {
            (Some(row), 0) => row,
            (first, rest) => {
                return Err(PrepError::UnknownElectrode {
                    electrode_id: electrode_id.to_string(),
                    matches: first.map_or(0, |_| 1 + rest),
                })
            }
        };

        let onset = row.onset.trim();
        let offset = row.offset.trim();
        if onset == self.placeholder || offset == self.placeholder {
            return Ok(SeizureMark::Unmarked);
        }
        let parse = |field: &'static str, value: &str| {
            value.parse::<i64>().map_err(|_| PrepError::MalformedLabel {
                electrode_id: electrode_id.to_string(),
                field,
                value: value.to_string(),
            })
        };
        Ok(SeizureMark::Marked {
            onset: parse("onset", onset)?,
            offset: parse("offset", offset)?,
        })
    }

    /// Seizure interval of `electrode_id` on the recording clock.
    pub fn resolve(&self, electrode_id: &str, ictal_start: i64) -> Result<SeizureInterval> {
        let interval = self.mark(electrode_id)?.resolve(ictal_start);
        if interval.onset > interval.offset {
            log::warn!(
                "electrode {electrode_id}: onset {} after offset {}, no window will be positive",
                interval.onset,
                interval.offset
            );
        }
        Ok(interval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> LabelTable {
        LabelTable::new(
            vec![
                LabelRow::new("LA1", "416050000000", "416060000000"),
                LabelRow::new("LA2", "-", "-"),
                LabelRow::new("LB1", "416050000000", "-"),
                LabelRow::new("LB2", "4160x", "416060000000"),
                LabelRow::new("LC1", "1", "2"),
                LabelRow::new("LC1", "3", "4"),
            ],
            "-",
        )
    }

    #[test]
    fn marked_electrode_resolves_to_its_interval() {
        let iv = table().resolve("LA1", 416_039_606_029).unwrap();
        assert_eq!(iv, SeizureInterval { onset: 416_050_000_000, offset: 416_060_000_000 });
    }

    #[test]
    fn unmarked_electrode_gets_sentinel() {
        let t = table();
        assert_eq!(t.mark("LA2").unwrap(), SeizureMark::Unmarked);
        let iv = t.resolve("LA2", 1000).unwrap();
        assert_eq!(iv, SeizureInterval { onset: 1001, offset: 1001 });
    }

    #[test]
    fn one_placeholder_field_is_enough() {
        assert_eq!(table().mark("LB1").unwrap(), SeizureMark::Unmarked);
    }

    #[test]
    fn non_integer_field_is_malformed() {
        match table().mark("LB2") {
            Err(PrepError::MalformedLabel { field, value, .. }) => {
                assert_eq!(field, "onset");
                assert_eq!(value, "4160x");
            }
            other => panic!("expected MalformedLabel, got {other:?}"),
        }
    }

    #[test]
    fn missing_and_duplicate_rows_are_unknown() {
        let t = table();
        assert!(matches!(
            t.mark("ZZ9"),
            Err(PrepError::UnknownElectrode { matches: 0, .. })
        ));
        assert!(matches!(
            t.mark("LC1"),
            Err(PrepError::UnknownElectrode { matches: 2, .. })
        ));
    }

    #[test]
    fn electrode_ids_dedup_in_order() {
        assert_eq!(table().electrode_ids(), vec!["LA1", "LA2", "LB1", "LB2", "LC1"]);
    }

    #[test]
    fn interval_is_closed() {
        let iv = SeizureInterval { onset: 10, offset: 20 };
        assert!(iv.contains(10) && iv.contains(20) && iv.contains(15));
        assert!(!iv.contains(9) && !iv.contains(21));
    }
}
