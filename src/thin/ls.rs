use anyhow::{anyhow, Result};
use std::collections::BTreeMap;
use std::fmt;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

use crate::commands::engine::*;
use crate::grid_layout::GridLayout;
use crate::io_engine::SECTOR_SHIFT;
use crate::report::Report;
use crate::thin::block_time::BlockTime;
use crate::thin::damage::FatalDamage;
use crate::thin::device_detail::DeviceDetail;
use crate::thin::device_tree::DeviceVisitor;
use crate::thin::mapping_tree::MappingVisitor;
use crate::thin::metadata::*;
use crate::thin::ref_tracker::*;
use crate::units::*;


//------------------------------------------

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LsError {
    #[error("unknown field '{0}'")]
    UnknownField(String),

    #[error("No input file provided.")]
    MissingInput,

    #[error("metadata contains errors (run thin_check for details).")]
    MetadataDamage,

    #[error("couldn't find mapping tree root for device {0}")]
    MissingMappingRoot(u64),
}

//------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputField {
    DeviceId,

    MappedBlocks,
    ExclusiveBlocks,
    SharedBlocks,

    MappedSectors,
    ExclusiveSectors,
    SharedSectors,

    MappedBytes,
    ExclusiveBytes,
    SharedBytes,

    Mapped,
    Exclusive,
    Shared,

    TransactionId,
    CreationTime,
    SnapshottedTime,
}

pub const ALL_FIELDS: [OutputField; 16] = [
    OutputField::DeviceId,
    OutputField::MappedBlocks,
    OutputField::ExclusiveBlocks,
    OutputField::SharedBlocks,
    OutputField::MappedSectors,
    OutputField::ExclusiveSectors,
    OutputField::SharedSectors,
    OutputField::MappedBytes,
    OutputField::ExclusiveBytes,
    OutputField::SharedBytes,
    OutputField::Mapped,
    OutputField::Exclusive,
    OutputField::Shared,
    OutputField::TransactionId,
    OutputField::CreationTime,
    OutputField::SnapshottedTime,
];

pub const DEFAULT_FIELDS: [OutputField; 4] = [
    OutputField::DeviceId,
    OutputField::Mapped,
    OutputField::CreationTime,
    OutputField::SnapshottedTime,
];

impl OutputField {
    /// Whether the field can only be filled in by counting block
    /// references across every device.
    pub fn needs_exclusivity(&self) -> bool {
        use OutputField::*;

        matches!(
            self,
            ExclusiveBlocks
                | SharedBlocks
                | ExclusiveSectors
                | SharedSectors
                | ExclusiveBytes
                | SharedBytes
                | Exclusive
                | Shared
        )
    }
}

impl FromStr for OutputField {
    type Err = LsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        use OutputField::*;

        match s {
            "DEV" => Ok(DeviceId),
            "MAPPED_BLOCKS" => Ok(MappedBlocks),
            "EXCLUSIVE_BLOCKS" => Ok(ExclusiveBlocks),
            "SHARED_BLOCKS" => Ok(SharedBlocks),

            "MAPPED_SECTORS" => Ok(MappedSectors),
            "EXCLUSIVE_SECTORS" => Ok(ExclusiveSectors),
            "SHARED_SECTORS" => Ok(SharedSectors),

            "MAPPED_BYTES" => Ok(MappedBytes),
            "EXCLUSIVE_BYTES" => Ok(ExclusiveBytes),
            "SHARED_BYTES" => Ok(SharedBytes),

            "MAPPED" => Ok(Mapped),
            "EXCLUSIVE" => Ok(Exclusive),
            "SHARED" => Ok(Shared),

            "TRANSACTION" => Ok(TransactionId),
            "CREATE_TIME" => Ok(CreationTime),
            "SNAP_TIME" => Ok(SnapshottedTime),

            _ => Err(LsError::UnknownField(s.to_string())),
        }
    }
}

impl fmt::Display for OutputField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use OutputField::*;

        let s = match self {
            DeviceId => "DEV",
            MappedBlocks => "MAPPED_BLOCKS",
            ExclusiveBlocks => "EXCLUSIVE_BLOCKS",
            SharedBlocks => "SHARED_BLOCKS",

            MappedSectors => "MAPPED_SECTORS",
            ExclusiveSectors => "EXCLUSIVE_SECTORS",
            SharedSectors => "SHARED_SECTORS",

            MappedBytes => "MAPPED_BYTES",
            ExclusiveBytes => "EXCLUSIVE_BYTES",
            SharedBytes => "SHARED_BYTES",

            Mapped => "MAPPED",
            Exclusive => "EXCLUSIVE",
            Shared => "SHARED",

            TransactionId => "TRANSACTION",
            CreationTime => "CREATE_TIME",
            SnapshottedTime => "SNAP_TIME",
        };
        write!(f, "{}", s)
    }
}

/// Parses every selector, failing on the first one that isn't known.
/// Duplicates are kept.
pub fn parse_fields<S: AsRef<str>>(names: &[S]) -> Result<Vec<OutputField>, LsError> {
    names.iter().map(|s| s.as_ref().parse()).collect()
}

pub fn exclusivity_needed(fields: &[OutputField]) -> bool {
    fields.iter().any(|f| f.needs_exclusivity())
}

//------------------------------------------

pub type DeviceTable = BTreeMap<u64, DeviceDetail>;

struct DeviceCollector<'a> {
    table: &'a mut DeviceTable,
}

impl<'a> DeviceVisitor for DeviceCollector<'a> {
    fn visit(&mut self, dev_id: u64, detail: &DeviceDetail) -> Result<()> {
        self.table.insert(dev_id, *detail);
        Ok(())
    }
}

pub fn build_device_table(md: &dyn ThinMetadata) -> Result<DeviceTable> {
    let mut table = DeviceTable::new();
    md.walk_device_tree(&mut DeviceCollector { table: &mut table }, &mut FatalDamage)?;
    Ok(table)
}

fn mapping_root(md: &dyn ThinMetadata, dev_id: u64) -> Result<u64> {
    match md.lookup_mapping_root(dev_id) {
        Ok(Some(root)) => Ok(root),
        Ok(None) => Err(LsError::MissingMappingRoot(dev_id).into()),
        Err(e) => Err(e.context(LsError::MetadataDamage)),
    }
}

//------------------------------------------

struct RefIncrementer<'a> {
    rt: &'a mut ReferenceTracker,
    nr_data_blocks: u64,
}

impl<'a> MappingVisitor for RefIncrementer<'a> {
    fn visit(&mut self, path: &[u64], bt: &BlockTime) -> Result<()> {
        if bt.block >= self.nr_data_blocks {
            return Err(anyhow!(
                "thin block {:?} maps beyond the end of the data device ({} >= {})",
                path,
                bt.block,
                self.nr_data_blocks
            )
            .context(LsError::MetadataDamage));
        }

        self.rt.increment(bt.block);
        Ok(())
    }
}

/// Records every data block referenced by every device in the table.
/// A mapping beyond the end of the data device is damage.
pub fn pass1(
    md: &dyn ThinMetadata,
    table: &DeviceTable,
    rt: &mut ReferenceTracker,
    report: &Report,
) -> Result<()> {
    let nr_devs = table.len();
    for (i, dev_id) in table.keys().enumerate() {
        let root = mapping_root(md, *dev_id)?;
        let mut incrementer = RefIncrementer {
            rt: &mut *rt,
            nr_data_blocks: md.nr_data_blocks(),
        };
        md.walk_mapping_tree(root, &mut incrementer, &mut FatalDamage)?;
        report.progress(((i + 1) * 100 / nr_devs) as u8);
    }
    Ok(())
}

struct ExclusiveCounter<'a> {
    rt: &'a ReferenceTracker,
    nr_exclusive: u64,
}

impl<'a> MappingVisitor for ExclusiveCounter<'a> {
    fn visit(&mut self, _path: &[u64], bt: &BlockTime) -> Result<()> {
        if self.rt.get_state(bt.block) == BlockState::Exclusive {
            self.nr_exclusive += 1;
        }
        Ok(())
    }
}

/// Counts the mappings of a device whose data block no other device
/// references.  The tracker must already hold every device's references.
pub fn count_exclusives(md: &dyn ThinMetadata, rt: &ReferenceTracker, dev_id: u64) -> Result<u64> {
    let root = mapping_root(md, dev_id)?;
    let mut counter = ExclusiveCounter {
        rt,
        nr_exclusive: 0,
    };
    md.walk_mapping_tree(root, &mut counter, &mut FatalDamage)?;
    Ok(counter.nr_exclusive)
}

//------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LsRow {
    pub dev_id: u64,
    pub detail: DeviceDetail,

    /// Only counted if one of the fields asked for it.
    pub exclusive_blocks: Option<u64>,
}

impl LsRow {
    pub fn shared_blocks(&self) -> Option<u64> {
        self.exclusive_blocks
            .map(|ex| self.detail.mapped_blocks.saturating_sub(ex))
    }
}

/// Gathers one row per device, in device id order.  Block references are
/// only counted when a field needs them.
pub fn collect_rows(
    md: &dyn ThinMetadata,
    fields: &[OutputField],
    report: &Report,
) -> Result<Vec<LsRow>> {
    report.set_sub_title("reading device details");
    let table = build_device_table(md)?;

    if !exclusivity_needed(fields) {
        return Ok(table
            .iter()
            .map(|(dev_id, detail)| LsRow {
                dev_id: *dev_id,
                detail: *detail,
                exclusive_blocks: None,
            })
            .collect());
    }

    report.set_sub_title("counting block references");
    let mut rt = ReferenceTracker::new();
    pass1(md, &table, &mut rt, report)?;

    report.set_sub_title("counting exclusive blocks");
    let nr_devs = table.len();
    let mut rows = Vec::with_capacity(nr_devs);
    for (i, (dev_id, detail)) in table.iter().enumerate() {
        rows.push(LsRow {
            dev_id: *dev_id,
            detail: *detail,
            exclusive_blocks: Some(count_exclusives(md, &rt, *dev_id)?),
        });
        report.progress(((i + 1) * 100 / nr_devs) as u8);
    }

    Ok(rows)
}

//------------------------------------------

pub struct LsTable<'a> {
    fields: &'a [OutputField],
    grid: GridLayout,
    data_block_size: u64,
}

impl<'a> LsTable<'a> {
    pub fn new(fields: &'a [OutputField], nr_rows: usize, bs: u32) -> LsTable<'a> {
        let grid = GridLayout::new_with_size(nr_rows, fields.len());

        LsTable {
            fields,
            grid,
            data_block_size: bs as u64,
        }
    }

    pub fn push_headers(&mut self) {
        if self.fields.is_empty() {
            return;
        }

        for i in self.fields {
            self.grid.field(i.to_string());
        }
        self.grid.new_row();
    }

    pub fn push_row(&mut self, row: &LsRow) {
        use OutputField::*;

        if self.fields.is_empty() {
            return;
        }

        let sectors = |blocks: u64| blocks.saturating_mul(self.data_block_size);
        let bytes = |blocks: u64| sectors(blocks).saturating_mul(1 << SECTOR_SHIFT);

        let detail = &row.detail;
        let ex_blocks = row.exclusive_blocks.unwrap_or(0);
        let shared_blocks = row.shared_blocks().unwrap_or(0);

        for field in self.fields {
            let val: u64 = match field {
                DeviceId => row.dev_id,
                TransactionId => detail.transaction_id,
                CreationTime => detail.creation_time as u64,
                SnapshottedTime => detail.snapshotted_time as u64,
                MappedBlocks => detail.mapped_blocks,
                MappedSectors => sectors(detail.mapped_blocks),
                MappedBytes | Mapped => bytes(detail.mapped_blocks),
                ExclusiveBlocks => ex_blocks,
                ExclusiveSectors => sectors(ex_blocks),
                ExclusiveBytes | Exclusive => bytes(ex_blocks),
                SharedBlocks => shared_blocks,
                SharedSectors => sectors(shared_blocks),
                SharedBytes | Shared => bytes(shared_blocks),
            };

            let cell = match field {
                Mapped | Exclusive | Shared => {
                    let (val, unit) = to_pretty_print_units(val);
                    let mut s = val.to_string();
                    s.push_str(&unit.to_string_short());
                    s
                }
                _ => val.to_string(),
            };

            self.grid.field(cell);
        }
        self.grid.new_row();
    }

    pub fn render(&self, w: &mut dyn Write) -> Result<()> {
        self.grid.render(w)
    }
}

pub fn write_table(
    w: &mut dyn Write,
    fields: &[OutputField],
    rows: &[LsRow],
    data_block_size: u32,
    headers: bool,
) -> Result<()> {
    let mut table = LsTable::new(fields, rows.len() + 1, data_block_size);
    if headers {
        table.push_headers();
    }
    for row in rows {
        table.push_row(row);
    }
    table.render(w)
}

//------------------------------------------

pub struct ThinLsOptions<'a> {
    pub input: &'a Path,
    pub engine_opts: EngineOptions,
    pub fields: Vec<OutputField>,
    pub no_headers: bool,
    pub report: Arc<Report>,
}

/// Prints the table only once every device has been accounted for, so
/// a failure never produces partial output.
pub fn ls(opts: ThinLsOptions) -> Result<()> {
    let engine = build_io_engine(opts.input, &opts.engine_opts)?;
    let md = Metadata::open(engine, opts.engine_opts.use_metadata_snap)?;

    let rows = collect_rows(&md, &opts.fields, &opts.report)?;
    opts.report.complete();

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    write_table(
        &mut out,
        &opts.fields,
        &rows,
        md.data_block_size(),
        !opts.no_headers,
    )?;
    out.flush()?;
    Ok(())
}

//------------------------------------------
