//! Write-ahead log and snapshot persistence (`feature = "journal"`).
//! `spec.md` §6.
//!
//! Commands are appended as fixed-size binary records into a
//! memory-mapped segment file, each followed by a CRC32 trailer so a
//! torn write from a mid-append crash is detectable on replay rather
//! than silently corrupting state. Durability is batched: `msync` via
//! [`memmap2::MmapMut::flush`] happens every [`Wal::FLUSH_EVERY_RECORDS`]
//! appends, whenever the configured flush interval
//! (see [`Wal::with_flush_interval_millis`]) has elapsed since the last
//! flush (`spec.md` §4.8: "forces durability at most every N
//! milliseconds"), or on an explicit [`Wal::flush`] call — whichever
//! comes first.
//!
//! Full book state is persisted separately as a snapshot file: a
//! structured, JSON-serialized list of resting orders in FIFO order per
//! level, replayed in that order to reconstruct FIFO priority exactly.
//! The live [`crate::orderbook::snapshot::compute_state_hash`] fingerprint
//! is a different, deliberately smaller format — a raw-byte digest input,
//! not a persistence format — the two should not be confused.

use crate::config::BookConfig;
use crate::orderbook::book::OrderBook;
use crate::orderbook::command::{CancelOrder, Command, NewOrder, ReplaceOrder, Side, TimeInForce};
use crate::orderbook::error::OrderBookError;
use bincode::config::{self, Configuration, Fixint, LittleEndian};
use memmap2::{MmapMut, MmapOptions};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::Path;
use std::{fmt, io};

/// Marks a written record, distinguishing it from the zero-filled
/// unwritten tail of a freshly preallocated segment.
const RECORD_MAGIC: u32 = 0x4F_42_57_4C; // "OBWL"

fn bincode_config() -> Configuration<LittleEndian, Fixint> {
    config::standard().with_fixed_int_encoding()
}

/// One WAL record: a fixed-width encoding of a [`Command`], tagged with
/// [`RECORD_MAGIC`] so replay can detect the unwritten tail of a
/// preallocated segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct WalRecord {
    magic: u32,
    kind: u8,
    owner: u32,
    id: u32,
    side: u8,
    tif: u8,
    flags: u8,
    price_ticks: i64,
    qty: i32,
    qty_delta: i32,
    /// The book sequence number this command produces once applied.
    /// Lets replay detect a gap against the snapshot header it resumes
    /// from (`spec.md` §4.8's "replay truncated past header" check).
    sequence: u64,
}

impl WalRecord {
    fn new(command: Command, sequence: u64) -> Self {
        use crate::orderbook::command::wire::{KIND_CANCEL, KIND_NEW, KIND_REPLACE, RecordFlags};

        match command {
            Command::New(o) => {
                let mut flags = RecordFlags::empty();
                flags.set(RecordFlags::POST_ONLY, o.post_only);
                flags.set(RecordFlags::REDUCE_ONLY, o.reduce_only);
                WalRecord {
                    magic: RECORD_MAGIC,
                    kind: KIND_NEW,
                    owner: o.owner,
                    id: o.id,
                    side: o.side as u8,
                    tif: o.tif as u8,
                    flags: flags.bits(),
                    price_ticks: o.price_ticks,
                    qty: o.qty,
                    qty_delta: 0,
                    sequence,
                }
            }
            Command::Cancel(c) => WalRecord {
                magic: RECORD_MAGIC,
                kind: KIND_CANCEL,
                owner: c.owner,
                id: c.id,
                side: 0,
                tif: 0,
                flags: 0,
                price_ticks: 0,
                qty: 0,
                qty_delta: 0,
                sequence,
            },
            Command::Replace(r) => WalRecord {
                magic: RECORD_MAGIC,
                kind: KIND_REPLACE,
                owner: r.owner,
                id: r.id,
                side: 0,
                tif: 0,
                flags: 0,
                price_ticks: r.new_price_ticks.unwrap_or(crate::orderbook::command::NULL_PRICE),
                qty: 0,
                qty_delta: r.qty_delta,
                sequence,
            },
        }
    }
}

impl TryFrom<WalRecord> for Command {
    type Error = WalError;

    fn try_from(r: WalRecord) -> Result<Self, WalError> {
        use crate::orderbook::command::wire::{KIND_CANCEL, KIND_NEW, KIND_REPLACE, RecordFlags};

        match r.kind {
            KIND_NEW => {
                let side = if r.side == Side::Buy as u8 { Side::Buy } else { Side::Sell };
                let tif = match r.tif {
                    x if x == TimeInForce::Ioc as u8 => TimeInForce::Ioc,
                    x if x == TimeInForce::Fok as u8 => TimeInForce::Fok,
                    _ => TimeInForce::Gtc,
                };
                let flags = RecordFlags::from_bits_truncate(r.flags);
                Ok(Command::New(NewOrder {
                    owner: r.owner,
                    id: r.id,
                    side,
                    price_ticks: r.price_ticks,
                    qty: r.qty,
                    tif,
                    post_only: flags.contains(RecordFlags::POST_ONLY),
                    reduce_only: flags.contains(RecordFlags::REDUCE_ONLY),
                }))
            }
            KIND_CANCEL => Ok(Command::Cancel(CancelOrder {
                owner: r.owner,
                id: r.id,
            })),
            KIND_REPLACE => {
                let new_price_ticks = if r.price_ticks == crate::orderbook::command::NULL_PRICE {
                    None
                } else {
                    Some(r.price_ticks)
                };
                Ok(Command::Replace(ReplaceOrder {
                    owner: r.owner,
                    id: r.id,
                    new_price_ticks,
                    qty_delta: r.qty_delta,
                }))
            }
            other => Err(WalError::UnknownRecordKind { kind: other }),
        }
    }
}

/// Fatal WAL/snapshot I/O errors.
#[derive(Debug)]
#[non_exhaustive]
pub enum WalError {
    Io(io::Error),
    Encode(bincode::error::EncodeError),
    Decode(bincode::error::DecodeError),
    /// A written (non-zero) record's CRC32 trailer did not match its
    /// payload, or its magic/kind byte was unrecognizable. Unlike a
    /// trailing all-zero (never-written) slot, this is mid-stream
    /// corruption: fatal, per `spec.md` §4.8 — the operator must restore
    /// from the most recent snapshot, not resume replay past it.
    CrcMismatch { record_index: u64 },
    /// A record carried a `kind` byte the router doesn't recognize.
    UnknownRecordKind { kind: u8 },
    /// The segment file has no room for another record.
    SegmentFull,
}

impl fmt::Display for WalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WalError::Io(e) => write!(f, "WAL I/O error: {e}"),
            WalError::Encode(e) => write!(f, "WAL record encode error: {e}"),
            WalError::Decode(e) => write!(f, "WAL record decode error: {e}"),
            WalError::CrcMismatch { record_index } => {
                write!(f, "WAL record {record_index} failed its CRC32 check")
            }
            WalError::UnknownRecordKind { kind } => write!(f, "unknown WAL record kind {kind}"),
            WalError::SegmentFull => write!(f, "WAL segment has no remaining capacity"),
        }
    }
}

impl std::error::Error for WalError {}

impl From<io::Error> for WalError {
    fn from(e: io::Error) -> Self {
        WalError::Io(e)
    }
}

/// A memory-mapped, append-only segment file of fixed-size WAL records.
pub struct Wal {
    file: File,
    mmap: MmapMut,
    slot_len: usize,
    capacity_slots: u64,
    write_slot: u64,
    unflushed_records: u32,
    flush_interval_millis: u64,
    last_flush_millis: u64,
}

impl Wal {
    /// Force an `msync` after this many unflushed appends even if
    /// [`Wal::flush`] is never called explicitly.
    pub const FLUSH_EVERY_RECORDS: u32 = 64;

    /// Default value for the time-based durability bound (`spec.md` §4.8:
    /// "forces durability at most every N milliseconds"), used by
    /// [`Wal::create`]. Override with [`Wal::with_flush_interval_millis`].
    pub const DEFAULT_FLUSH_INTERVAL_MILLIS: u64 = 100;

    /// Creates a new segment file at `path` sized for `capacity_slots`
    /// records, truncating any existing file.
    pub fn create(path: &Path, capacity_slots: u64) -> Result<Self, WalError> {
        let slot_len = encoded_slot_len();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        file.set_len(capacity_slots * slot_len as u64)?;
        let mmap = unsafe { MmapOptions::new().map_mut(&file)? };
        Ok(Self {
            file,
            mmap,
            slot_len,
            capacity_slots,
            write_slot: 0,
            unflushed_records: 0,
            flush_interval_millis: Self::DEFAULT_FLUSH_INTERVAL_MILLIS,
            last_flush_millis: crate::utils::current_time_millis(),
        })
    }

    /// Overrides the time-based durability bound set by [`Wal::create`].
    /// The record-count bound ([`Self::FLUSH_EVERY_RECORDS`]) still
    /// applies independently; whichever threshold is reached first
    /// triggers the next flush.
    pub fn with_flush_interval_millis(mut self, millis: u64) -> Self {
        self.flush_interval_millis = millis;
        self
    }

    /// Opens an existing segment file and replays every valid record in
    /// it against a fresh router-compatible consumer, via `apply`.
    /// Returns the number of records replayed and stops at the first
    /// unwritten (all-zero) slot, leaving the WAL positioned to append
    /// from there. A non-empty slot that fails its magic or CRC32 check
    /// is mid-stream corruption, not a partial tail, and is fatal
    /// (`spec.md` §4.8).
    pub fn open_and_replay(
        path: &Path,
        mut apply: impl FnMut(Command, u64),
    ) -> Result<(Self, u64), WalError> {
        let slot_len = encoded_slot_len();
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        let len = file.metadata()?.len();
        let capacity_slots = len / slot_len as u64;
        let mmap = unsafe { MmapOptions::new().map_mut(&file)? };

        let mut replayed = 0u64;
        let mut write_slot = 0u64;
        while write_slot < capacity_slots {
            let start = (write_slot as usize) * slot_len;
            let slice = &mmap[start..start + slot_len];
            match decode_record(slice) {
                RecordSlot::Record(command, sequence) => {
                    apply(command, sequence);
                    replayed += 1;
                    write_slot += 1;
                }
                RecordSlot::UnwrittenTail => break,
                RecordSlot::Corrupt => {
                    return Err(WalError::CrcMismatch {
                        record_index: write_slot,
                    });
                }
            }
        }

        Ok((
            Self {
                file,
                mmap,
                slot_len,
                capacity_slots,
                write_slot,
                unflushed_records: 0,
                flush_interval_millis: Self::DEFAULT_FLUSH_INTERVAL_MILLIS,
                last_flush_millis: crate::utils::current_time_millis(),
            },
            replayed,
        ))
    }

    /// Replays `wal_path` onto `book` (typically freshly loaded from the
    /// most recent snapshot), applying each recovered command directly
    /// through the matching engine rather than re-appending it. This is
    /// the "apply WAL after the latest snapshot, in order, through the
    /// command router" replay path `spec.md` §4.8 describes.
    ///
    /// Each record carries the sequence number it produced when
    /// originally appended. Replay expects them contiguous starting
    /// right after `book.sequence` (the snapshot header); a gap means
    /// the WAL segment doesn't pick up where the snapshot left off, so
    /// replay is abandoned with [`OrderBookError::ReplayTruncated`]
    /// rather than silently skipping ahead.
    pub fn recover(mut book: OrderBook, wal_path: &Path) -> Result<WalReplay, OrderBookError> {
        let mut expected_sequence = book.sequence + 1;
        let mut fatal: Option<OrderBookError> = None;

        let (wal, records_replayed) = Wal::open_and_replay(wal_path, |command, sequence| {
            if fatal.is_some() {
                return;
            }
            if sequence != expected_sequence {
                fatal = Some(OrderBookError::ReplayTruncated {
                    at_sequence: expected_sequence,
                });
                return;
            }
            let result = match command {
                Command::New(order) => crate::orderbook::matching::apply_new_order(&mut book, order),
                Command::Cancel(cancel) => {
                    crate::orderbook::matching::apply_cancel(&mut book, cancel);
                    Ok(())
                }
                Command::Replace(replace) => {
                    crate::orderbook::matching::apply_replace(&mut book, replace);
                    Ok(())
                }
            };
            match result {
                Ok(()) => {
                    book.sequence = sequence;
                    expected_sequence += 1;
                }
                Err(err) => fatal = Some(err),
            }
        })?;

        if let Some(err) = fatal {
            return Err(err);
        }
        Ok(WalReplay {
            book,
            wal,
            records_replayed,
        })
    }

    /// Appends `command`, batching durability: an `msync` only happens
    /// every [`Self::FLUSH_EVERY_RECORDS`] appends, or on an explicit
    /// [`Self::flush`]. `sequence` is the book sequence number this
    /// command will produce once applied, carried in the record so
    /// replay can detect a gap against a snapshot header.
    pub fn append(&mut self, command: Command, sequence: u64) -> Result<(), WalError> {
        if self.write_slot >= self.capacity_slots {
            return Err(WalError::SegmentFull);
        }
        let record = WalRecord::new(command, sequence);
        let encoded = bincode::serde::encode_to_vec(record, bincode_config())
            .map_err(WalError::Encode)?;
        let crc = crc32fast::hash(&encoded);

        let start = (self.write_slot as usize) * self.slot_len;
        self.mmap[start..start + encoded.len()].copy_from_slice(&encoded);
        self.mmap[start + encoded.len()..start + encoded.len() + 4]
            .copy_from_slice(&crc.to_le_bytes());

        self.write_slot += 1;
        self.unflushed_records += 1;
        let elapsed = crate::utils::current_time_millis().saturating_sub(self.last_flush_millis);
        if self.unflushed_records >= Self::FLUSH_EVERY_RECORDS || elapsed >= self.flush_interval_millis {
            self.flush()?;
        }
        Ok(())
    }

    /// Forces a durability sync of the mapped segment.
    pub fn flush(&mut self) -> Result<(), WalError> {
        self.mmap.flush()?;
        self.unflushed_records = 0;
        self.last_flush_millis = crate::utils::current_time_millis();
        Ok(())
    }

    pub fn records_written(&self) -> u64 {
        self.write_slot
    }
}

fn encoded_slot_len() -> usize {
    let sample = WalRecord {
        magic: RECORD_MAGIC,
        kind: 0,
        owner: 0,
        id: 0,
        side: 0,
        tif: 0,
        flags: 0,
        price_ticks: 0,
        qty: 0,
        qty_delta: 0,
        sequence: 0,
    };
    bincode::serde::encode_to_vec(sample, bincode_config())
        .expect("fixed-width record encoding never fails")
        .len()
        + 4 // CRC32 trailer
}

/// The three things a WAL slot can decode to.
enum RecordSlot {
    /// A well-formed record with a matching CRC32, plus the sequence
    /// number it produced when appended.
    Record(Command, u64),
    /// A never-written slot (all-zero bytes) — the end of the log.
    UnwrittenTail,
    /// A non-empty slot that fails its magic, CRC32, or payload decode —
    /// mid-stream corruption, not a partial tail.
    Corrupt,
}

/// Decodes one fixed-width slot, distinguishing a legitimately unwritten
/// tail slot from mid-stream corruption (`spec.md` §4.8): only an
/// all-zero slot is treated as "the log ends here"; anything else that
/// fails to decode is corruption.
fn decode_record(slice: &[u8]) -> RecordSlot {
    if slice.iter().all(|&b| b == 0) {
        return RecordSlot::UnwrittenTail;
    }

    let payload_len = slice.len() - 4;
    let payload = &slice[..payload_len];
    let Ok(crc_bytes) = slice[payload_len..].try_into() else {
        return RecordSlot::Corrupt;
    };
    let stored_crc = u32::from_le_bytes(crc_bytes);
    if crc32fast::hash(payload) != stored_crc {
        return RecordSlot::Corrupt;
    }
    let Ok((record, _)) =
        bincode::serde::decode_from_slice::<WalRecord, _>(payload, bincode_config())
    else {
        return RecordSlot::Corrupt;
    };
    if record.magic != RECORD_MAGIC {
        return RecordSlot::Corrupt;
    }
    let sequence = record.sequence;
    match Command::try_from(record) {
        Ok(command) => RecordSlot::Record(command, sequence),
        Err(_) => RecordSlot::Corrupt,
    }
}

/// Result of replaying a snapshot plus a WAL segment into a fresh book.
pub struct WalReplay {
    pub book: OrderBook,
    pub wal: Wal,
    pub records_replayed: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RestingOrderRecord {
    id: u32,
    owner: u32,
    side: Side,
    price_ticks: i64,
    qty: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SnapshotBody {
    config: BookConfig,
    sequence: u64,
    /// Resting orders in FIFO order per level, side by side — replaying
    /// them in this order reconstructs FIFO priority exactly.
    resting: Vec<RestingOrderRecord>,
}

/// Writes a full book snapshot: a 4-byte little-endian length prefix
/// followed by the UTF-8 JSON body.
pub fn write_snapshot(book: &OrderBook, out: &mut impl Write) -> Result<(), WalError> {
    let mut resting = Vec::new();
    for side in [Side::Buy, Side::Sell] {
        let levels = match side {
            Side::Buy => &book.bid_levels,
            Side::Sell => &book.ask_levels,
        };
        for level in 0..book.grid.levels() {
            let mut slot = levels.front(level);
            while slot != crate::orderbook::storage::NONE {
                resting.push(RestingOrderRecord {
                    id: book.storage.id(slot),
                    owner: book.storage.owner(slot),
                    side,
                    price_ticks: book.grid.level_to_price(level),
                    qty: book.storage.remaining(slot),
                });
                slot = book.storage.next(slot);
            }
        }
    }

    let body = SnapshotBody {
        config: book.config,
        sequence: book.sequence,
        resting,
    };
    let json = serde_json::to_vec(&body).expect("SnapshotBody serialization never fails");
    out.write_all(&(json.len() as u32).to_le_bytes())?;
    out.write_all(&json)?;
    Ok(())
}

/// Reads a snapshot written by [`write_snapshot`] and rebuilds a fresh
/// [`OrderBook`] from it, replaying resting orders in their recorded
/// FIFO order so priority is reconstructed exactly.
pub fn read_snapshot(input: &mut impl Read) -> Result<OrderBook, OrderBookError> {
    let mut len_bytes = [0u8; 4];
    input.read_exact(&mut len_bytes).map_err(WalError::Io)?;
    let len = u32::from_le_bytes(len_bytes) as usize;
    let mut json = vec![0u8; len];
    input.read_exact(&mut json).map_err(WalError::Io)?;
    let body: SnapshotBody = serde_json::from_slice(&json)
        .map_err(|_| WalError::Decode(bincode::error::DecodeError::Other("invalid snapshot JSON")))?;

    let mut book = OrderBook::new(body.config)?;
    book.sequence = body.sequence;
    for order in body.resting {
        crate::orderbook::matching::restore_resting_order(
            &mut book,
            order.id,
            order.owner,
            order.side,
            order.price_ticks,
            order.qty,
        )?;
    }
    Ok(book)
}
