//! Persistence seams for the counter row and the event log.
//!
//! Each store guards its own data with its own lock. The file-backed stores
//! keep the full data set in memory and write through on every change.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use flowwatch_types::{CounterRow, EventFilter, EventLogRecord};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, warn};

use crate::StoreError;

/// Storage for the singleton counter row.
pub trait CounterStore: Send + Sync {
    /// The stored row, or `None` if nothing has been saved yet.
    fn load(&self) -> Result<Option<CounterRow>, StoreError>;

    /// Replace the stored row.
    fn save(&self, row: &CounterRow) -> Result<(), StoreError>;
}

/// Append-only storage for event-log records.
pub trait EventStore: Send + Sync {
    fn append(&self, record: &EventLogRecord) -> Result<(), StoreError>;

    /// Every record matching `filter`, in append order.
    fn scan(&self, filter: &EventFilter) -> Result<Vec<EventLogRecord>, StoreError>;

    fn len(&self) -> Result<usize, StoreError>;

    fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }
}

/// Counter row held in memory only.
#[derive(Debug, Default)]
pub struct MemoryCounterStore {
    row: Mutex<Option<CounterRow>>,
}

impl MemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CounterStore for MemoryCounterStore {
    fn load(&self) -> Result<Option<CounterRow>, StoreError> {
        Ok(*self.row.lock())
    }

    fn save(&self, row: &CounterRow) -> Result<(), StoreError> {
        *self.row.lock() = Some(*row);
        Ok(())
    }
}

/// Counter row persisted as a JSON document.
///
/// Saves go to a sibling temporary file which is then renamed over the
/// target, so a crash mid-write leaves the previous row intact.
#[derive(Debug)]
pub struct FileCounterStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileCounterStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl CounterStore for FileCounterStore {
    fn load(&self) -> Result<Option<CounterRow>, StoreError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    fn save(&self, row: &CounterRow) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock();
        let json = serde_json::to_vec_pretty(row)?;
        let temp = self.temp_path();
        fs::write(&temp, json)?;
        fs::rename(&temp, &self.path)?;
        debug!(path = %self.path.display(), "saved counter row");
        Ok(())
    }
}

/// Event records held in memory only.
#[derive(Debug, Default)]
pub struct MemoryEventStore {
    records: RwLock<Vec<EventLogRecord>>,
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EventStore for MemoryEventStore {
    fn append(&self, record: &EventLogRecord) -> Result<(), StoreError> {
        self.records.write().push(record.clone());
        Ok(())
    }

    fn scan(&self, filter: &EventFilter) -> Result<Vec<EventLogRecord>, StoreError> {
        Ok(matching(&self.records.read(), filter))
    }

    fn len(&self) -> Result<usize, StoreError> {
        Ok(self.records.read().len())
    }
}

/// Event records persisted as one JSON object per line.
///
/// The file is read once on open; later appends write through to the end of
/// the file before becoming visible to searches.
#[derive(Debug)]
pub struct JsonlEventStore {
    path: PathBuf,
    records: RwLock<Vec<EventLogRecord>>,
}

impl JsonlEventStore {
    /// Open (or lazily create) the log at `path`.
    ///
    /// Lines that fail to parse are skipped with a warning.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let mut records = Vec::new();

        match File::open(&path) {
            Ok(file) => {
                for (index, line) in BufReader::new(file).lines().enumerate() {
                    let line = line?;
                    if line.trim().is_empty() {
                        continue;
                    }
                    match serde_json::from_str::<EventLogRecord>(&line) {
                        Ok(record) => records.push(record),
                        Err(e) => warn!(
                            path = %path.display(),
                            line = index + 1,
                            error = %e,
                            "skipping unreadable event record"
                        ),
                    }
                }
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        debug!(path = %path.display(), count = records.len(), "opened event log");
        Ok(Self {
            path,
            records: RwLock::new(records),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl EventStore for JsonlEventStore {
    fn append(&self, record: &EventLogRecord) -> Result<(), StoreError> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');

        let mut records = self.records.write();
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)?;

        let len = file.metadata()?.len();
        if len > 0 && !ends_with_newline(&mut file)? {
            // Earlier write was cut short; keep its fragment on its own line.
            line.insert(0, b'\n');
        }
        if let Err(e) = file.write_all(&line) {
            if let Err(truncate) = file.set_len(len) {
                warn!(
                    path = %self.path.display(),
                    error = %truncate,
                    "could not roll back partial event record"
                );
            }
            return Err(e.into());
        }
        records.push(record.clone());
        Ok(())
    }

    fn scan(&self, filter: &EventFilter) -> Result<Vec<EventLogRecord>, StoreError> {
        Ok(matching(&self.records.read(), filter))
    }

    fn len(&self) -> Result<usize, StoreError> {
        Ok(self.records.read().len())
    }
}

fn ends_with_newline(file: &mut File) -> io::Result<bool> {
    let mut last = [0u8; 1];
    file.seek(SeekFrom::End(-1))?;
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}

fn matching(records: &[EventLogRecord], filter: &EventFilter) -> Vec<EventLogRecord> {
    records
        .iter()
        .filter(|record| filter.matches(record))
        .cloned()
        .collect()
}
