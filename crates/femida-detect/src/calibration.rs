// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Calibration table — the fixed bubble grid of the answer sheet, measured in
// pixels of the canonical rectified image.
//
// The grid has 20 question columns spread along x (`BORDER_TOP` /
// `BORDER_BOTTOM`) and 12 label rows along y (`BORDER_LEFT` /
// `BORDER_RIGHT`). The 12 rows fold into two blocks of six labels: the upper
// block answers questions 1..=20, the lower block 21..=40.

use std::collections::HashMap;
use std::sync::LazyLock;

use femida_core::error::{FemidaError, Result};
use femida_core::types::{GeometryDescriptor, Key, Label, QUESTION_COUNT};
use tracing::debug;

/// Width of every rectified sheet, in pixels.
pub const CANONICAL_WIDTH: u32 = 3000;

/// Height of every rectified sheet: `3000 * 578 / 403`, truncated.
pub const CANONICAL_HEIGHT: u32 = (CANONICAL_WIDTH as u64 * 578 / 403) as u32;

/// Option labels, in sheet order.
pub const LABELS: [Label; 6] = Label::ALL;

/// Leading edges of the 12 label rows.
pub const BORDER_LEFT: [f64; 12] = [
    1001.05364189, 1140.30542526, 1279.14998283, 1419.51725082,
    1559.92500267, 1703.37992821, 1962.73085518, 2108.28859329,
    2253.78823833, 2398.27252483, 2543.75992908, 2687.42875385,
];

/// Row extent added to `BORDER_LEFT` to get the trailing edges.
pub const ROW_SPAN: f64 = 119.08159110083334;

/// Leading edges of the 20 question columns.
pub const BORDER_TOP: [f64; 20] = [
    117.07986768, 262.0833257, 406.66667048, 551.08331553,
    696.61630789, 841.62500191, 988.26667436, 1134.61490504,
    1278.74997139, 1424.70830472, 1570.14406967, 1715.04166921,
    1860.08333524, 2003.87500127, 2147.95829391, 2294.20823479,
    2440.94248358, 2589.62494087, 2736.86812528, 2881.99990145,
];

/// Column extent added to `BORDER_TOP` to get the trailing edges.
pub const COLUMN_SPAN: f64 = 116.13320818099999;

/// Trailing edges of the label rows.
pub const BORDER_RIGHT: [f64; 12] = {
    let mut out = [0.0; 12];
    let mut i = 0;
    while i < 12 {
        out[i] = BORDER_LEFT[i] + ROW_SPAN;
        i += 1;
    }
    out
};

/// Trailing edges of the question columns.
pub const BORDER_BOTTOM: [f64; 20] = {
    let mut out = [0.0; 20];
    let mut i = 0;
    while i < 20 {
        out[i] = BORDER_TOP[i] + COLUMN_SPAN;
        i += 1;
    }
    out
};

static TABLE: LazyLock<CalibrationTable> = LazyLock::new(CalibrationTable::build);

/// The process-wide calibration table, built on first use.
pub fn table() -> &'static CalibrationTable {
    &TABLE
}

/// Geometry of one bubble.
///
/// Fails with [`FemidaError::Precondition`] for keys outside 1..=40 x A..F.
pub fn geometry_for(question: u8, label: char) -> Result<GeometryDescriptor> {
    let key = Key::from_char(question, label)?;
    table().get(key)
}

/// Immutable mapping from bubble key to its rectangle on the canonical sheet.
#[derive(Debug)]
pub struct CalibrationTable {
    /// Entries in canonical order.
    entries: Vec<(Key, GeometryDescriptor)>,
    index: HashMap<Key, usize>,
}

impl CalibrationTable {
    fn build() -> Self {
        let questions_per_block = QUESTION_COUNT as usize / 2;
        let mut entries = Vec::with_capacity(BORDER_TOP.len() * BORDER_LEFT.len());

        for i in 0..BORDER_TOP.len() {
            for j in 0..BORDER_LEFT.len() {
                let question = (i + questions_per_block * (j / LABELS.len()) + 1) as u8;
                let label = LABELS[j % LABELS.len()];

                let (top, bottom) = (BORDER_TOP[i], BORDER_BOTTOM[i]);
                let (left, right) = (BORDER_LEFT[j], BORDER_RIGHT[j]);
                let geometry = GeometryDescriptor::axis_aligned(
                    ((top + bottom) / 2.0, (left + right) / 2.0),
                    (bottom - top, right - left),
                );
                entries.push((Key { question, label }, geometry));
            }
        }

        let index = entries
            .iter()
            .enumerate()
            .map(|(pos, (key, _))| (*key, pos))
            .collect();

        debug!(entries = entries.len(), "Calibration table built");
        Self { entries, index }
    }

    pub fn get(&self, key: Key) -> Result<GeometryDescriptor> {
        self.index
            .get(&key)
            .map(|&pos| self.entries[pos].1)
            .ok_or_else(|| FemidaError::Precondition(format!("no calibrated bubble for {key}")))
    }

    /// Entries in canonical order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = (Key, GeometryDescriptor)> + '_ {
        self.entries.iter().copied()
    }

    /// Keys in canonical order.
    pub fn keys(&self) -> Vec<Key> {
        self.entries.iter().map(|(key, _)| *key).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn canonical_height_matches_sheet_ratio() {
        assert_eq!(CANONICAL_HEIGHT, 4302);
    }

    #[test]
    fn table_is_a_bijection_onto_all_keys() {
        let table = table();
        assert_eq!(table.len(), 240);

        let keys: HashSet<Key> = table.keys().into_iter().collect();
        assert_eq!(keys.len(), 240);
        for question in 1..=40 {
            for label in Label::ALL {
                assert!(keys.contains(&Key { question, label }), "missing {question}{label}");
            }
        }
    }

    #[test]
    fn fold_arithmetic_matches_grid_position() {
        let keys = table().keys();
        // Row-major over 20 columns x 12 rows.
        for i in 0..20 {
            for j in 0..12 {
                let key = keys[i * 12 + j];
                let expected_question = (i + 20 * (j / 6) + 1) as u8;
                assert_eq!(key.question, expected_question);
                assert_eq!(key.label, Label::ALL[j % 6]);
            }
        }
        assert_eq!(keys[0], Key { question: 1, label: Label::A });
        assert_eq!(keys[6], Key { question: 21, label: Label::A });
        assert_eq!(keys[239], Key { question: 40, label: Label::F });
    }

    #[test]
    fn geometry_is_midpoint_and_span_of_edges() {
        let g = geometry_for(1, 'A').unwrap();
        assert!((g.center().0 - (117.07986768 + COLUMN_SPAN / 2.0)).abs() < 1e-9);
        assert!((g.center().1 - (1001.05364189 + ROW_SPAN / 2.0)).abs() < 1e-9);
        assert!((g.delta().0 - COLUMN_SPAN).abs() < 1e-9);
        assert!((g.delta().1 - ROW_SPAN).abs() < 1e-9);
        assert_eq!(g.angle(), 0.0);

        // Question 21 sits in the same column as question 1, lower block.
        let lower = geometry_for(21, 'A').unwrap();
        assert_eq!(lower.center().0, g.center().0);
        assert!((lower.center().1 - (1962.73085518 + ROW_SPAN / 2.0)).abs() < 1e-9);
    }

    #[test]
    fn every_box_lies_inside_canonical_sheet() {
        for (key, geometry) in table().iter() {
            let slice = geometry.to_slice();
            assert!(slice.cols.start >= 0 && slice.cols.end <= CANONICAL_WIDTH as i64, "{key}");
            assert!(slice.rows.start >= 0 && slice.rows.end <= CANONICAL_HEIGHT as i64, "{key}");
        }
    }

    #[test]
    fn out_of_domain_lookup_fails() {
        assert!(matches!(geometry_for(0, 'A'), Err(FemidaError::Precondition(_))));
        assert!(matches!(geometry_for(41, 'A'), Err(FemidaError::Precondition(_))));
        assert!(matches!(geometry_for(1, 'G'), Err(FemidaError::Precondition(_))));
    }

    #[test]
    fn concurrent_first_use_yields_one_table() {
        let handles: Vec<_> = (0..8)
            .map(|_| std::thread::spawn(|| table() as *const CalibrationTable as usize))
            .collect();
        let addresses: HashSet<usize> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(addresses.len(), 1);
    }
}
