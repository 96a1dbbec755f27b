//! Per-column harvest totals

use crate::assemble::Assembly;
use crate::axis::TimeAxis;
use farmcal_core::{ActionType, ColumnTotal};
use rust_decimal::Decimal;

/// Sums harvested yield per time column
#[derive(Clone, Copy, Debug, Default)]
pub struct TotalsComputer;

impl TotalsComputer {
    /// One total per axis column, in column order. Columns without any
    /// harvest are zero.
    pub fn compute(axis: &TimeAxis, assembly: &Assembly<'_>) -> Vec<ColumnTotal> {
        let mut sums = vec![Decimal::ZERO; axis.len()];

        for (key, resolved) in assembly.slots() {
            let record = resolved.record;
            if record.action_type != ActionType::Harvesting {
                continue;
            }
            let (Some(value), Some(position)) =
                (record.yield_value, axis.position(key.year, key.iso_week))
            else {
                continue;
            };
            sums[position] += value;
        }

        axis.columns()
            .iter()
            .zip(sums)
            .map(|(&column, total)| ColumnTotal { column, total })
            .collect()
    }
}
