//! Grid assembly
//!
//! Places activity records into `(block, year, week)` slots. Each slot holds
//! at most one record. Which record survives a collision is decided by the
//! [`CollisionPolicy`]; the default keeps the last record in input order, so
//! callers must hand records over in their input order.

use crate::axis::TimeAxis;
use crate::cell::check_renderable;
use farmcal_core::{ActivityRecord, BlockId, GridError, SkippedRecord};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use tracing::{debug, warn};

/// What to do with a record whose (year, week) is not on the axis
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutOfRangePolicy {
    /// Reject the record, keep going, report it afterwards
    #[default]
    Skip,
    /// Fail the whole assembly
    Abort,
}

/// Which record wins when two land in the same slot
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CollisionPolicy {
    /// Last record in input order wins
    #[default]
    LastWins,
    /// Higher action rank wins (harvesting > uprooting > planting > other);
    /// equal ranks fall back to last-wins
    ActionPriority,
}

impl CollisionPolicy {
    /// Whether `incoming` replaces `current` in a slot
    pub fn replaces(self, current: &ActivityRecord, incoming: &ActivityRecord) -> bool {
        match self {
            CollisionPolicy::LastWins => true,
            CollisionPolicy::ActionPriority => {
                incoming.action_type.priority() >= current.action_type.priority()
            }
        }
    }
}

/// Composite slot key: one record per block per ISO week
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotKey {
    pub block_id: BlockId,
    pub year: i32,
    pub iso_week: u32,
}

impl SlotKey {
    pub fn new(block_id: impl Into<BlockId>, year: i32, iso_week: u32) -> Self {
        Self {
            block_id: block_id.into(),
            year,
            iso_week,
        }
    }

    fn of(record: &ActivityRecord) -> Self {
        Self::new(record.block_id.clone(), record.year, record.iso_week)
    }
}

/// A record resolved into a slot, with its input position
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Resolved<'a> {
    pub index: usize,
    pub record: &'a ActivityRecord,
}

/// Block row metadata, in first-seen order
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockInfo {
    pub block_id: BlockId,
    pub area: Option<Decimal>,
}

/// Result of assembling a batch of records
#[derive(Clone, Debug)]
pub struct Assembly<'a> {
    slots: HashMap<SlotKey, Resolved<'a>>,
    blocks: Vec<BlockInfo>,
    skipped: Vec<SkippedRecord>,
}

impl<'a> Assembly<'a> {
    /// The record occupying a slot
    pub fn get(&self, block_id: &str, year: i32, iso_week: u32) -> Option<Resolved<'a>> {
        self.slots
            .get(&SlotKey::new(block_id, year, iso_week))
            .copied()
    }

    pub fn slots(&self) -> impl Iterator<Item = (&SlotKey, &Resolved<'a>)> {
        self.slots.iter()
    }

    /// Number of occupied slots
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Distinct blocks in first-seen order (the row order)
    pub fn blocks(&self) -> &[BlockInfo] {
        &self.blocks
    }

    /// Records rejected during assembly, in input order
    pub fn skipped(&self) -> &[SkippedRecord] {
        &self.skipped
    }
}

/// Maps records onto the calendar axis
#[derive(Clone, Debug, Default)]
pub struct GridAssembler {
    pub out_of_range: OutOfRangePolicy,
    pub collision: CollisionPolicy,
}

impl GridAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn out_of_range(mut self, policy: OutOfRangePolicy) -> Self {
        self.out_of_range = policy;
        self
    }

    pub fn collision(mut self, policy: CollisionPolicy) -> Self {
        self.collision = policy;
        self
    }

    /// Assemble `records` (in input order) against `axis`
    ///
    /// Records that cannot be rendered (a coded action without a crop) are
    /// skipped here so they never take a slot. Only fails under
    /// [`OutOfRangePolicy::Abort`].
    pub fn assemble<'a>(
        &self,
        records: &'a [ActivityRecord],
        axis: &TimeAxis,
    ) -> Result<Assembly<'a>, GridError> {
        let mut slots: HashMap<SlotKey, Resolved<'a>> = HashMap::new();
        let mut blocks: Vec<BlockInfo> = Vec::new();
        let mut block_rows: HashMap<&'a str, usize> = HashMap::new();
        let mut skipped = Vec::new();

        for (index, record) in records.iter().enumerate() {
            if axis.position(record.year, record.iso_week).is_none() {
                let error = GridError::OutOfRangeWeek {
                    block_id: record.block_id.clone(),
                    year: record.year,
                    week: record.iso_week,
                };
                if self.out_of_range == OutOfRangePolicy::Abort {
                    return Err(error);
                }
                skipped.push(skip(index, record, error));
                continue;
            }

            // an unrenderable record must not displace the slot's occupant
            if let Err(error) = check_renderable(record) {
                skipped.push(skip(index, record, error));
                continue;
            }

            match block_rows.get(record.block_id.as_str()) {
                Some(&row) => {
                    let block = &mut blocks[row];
                    if block.area.is_none() {
                        block.area = record.area;
                    }
                }
                None => {
                    block_rows.insert(record.block_id.as_str(), blocks.len());
                    blocks.push(BlockInfo {
                        block_id: record.block_id.clone(),
                        area: record.area,
                    });
                }
            }

            let resolved = Resolved { index, record };
            match slots.entry(SlotKey::of(record)) {
                Entry::Vacant(slot) => {
                    slot.insert(resolved);
                }
                Entry::Occupied(mut slot) => {
                    let current = slot.get();
                    if self.collision.replaces(current.record, record) {
                        debug!(
                            block = %record.block_id,
                            year = record.year,
                            week = record.iso_week,
                            replaced = current.index,
                            by = index,
                            "slot collision"
                        );
                        slot.insert(resolved);
                    }
                }
            }
        }

        debug!(
            slots = slots.len(),
            blocks = blocks.len(),
            skipped = skipped.len(),
            "records assembled"
        );

        Ok(Assembly {
            slots,
            blocks,
            skipped,
        })
    }
}

fn skip(index: usize, record: &ActivityRecord, error: GridError) -> SkippedRecord {
    warn!(index, %error, "skipping record");
    SkippedRecord {
        index,
        block_id: record.block_id.clone(),
        year: record.year,
        iso_week: record.iso_week,
        error,
    }
}
