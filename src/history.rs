//! Calculation history
//!
//! Recording is fire-and-forget: a sink never fails the calculation that
//! feeds it. Failures are logged and the entry is dropped.

use chrono::{DateTime, Utc};
use log::{debug, warn};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::sync::mpsc::{self, Sender};
use std::thread::{self, JoinHandle};

use crate::error::StoreError;
use crate::input::CalculationInput;
use crate::result::CalculationResult;

/// Identifies a calculation for later lookup
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CalculationKey {
    pub agreement: String,
    pub scenario: String,
    pub input_hash: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub agreement: String,
    pub scenario: String,
    pub input: CalculationInput,
    pub result: CalculationResult,
}

impl HistoryEntry {
    pub fn new(agreement: &str, scenario: &str, input: &CalculationInput, result: &CalculationResult) -> Self {
        Self {
            timestamp: Utc::now(),
            agreement: agreement.to_string(),
            scenario: scenario.to_string(),
            input: input.clone(),
            result: result.clone(),
        }
    }

    pub fn key(&self) -> CalculationKey {
        CalculationKey {
            agreement: self.agreement.clone(),
            scenario: self.scenario.clone(),
            input_hash: self.input.fingerprint(),
        }
    }
}

/// Destination for calculation records
pub trait HistorySink: Send + Sync {
    fn record(&self, entry: HistoryEntry);
}

/// Bounded in-memory history, oldest entries evicted first
pub struct MemoryHistory {
    entries: Mutex<VecDeque<HistoryEntry>>,
    capacity: usize,
}

impl MemoryHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
            capacity: capacity.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Up to `limit` entries, newest first
    pub fn recent(&self, limit: usize) -> Vec<HistoryEntry> {
        self.entries.lock().iter().rev().take(limit).cloned().collect()
    }

    /// Latest entry for an (agreement, scenario), matched case-insensitively
    pub fn last_for(&self, agreement: &str, scenario: &str) -> Option<HistoryEntry> {
        self.entries
            .lock()
            .iter()
            .rev()
            .find(|e| e.agreement.eq_ignore_ascii_case(agreement) && e.scenario.eq_ignore_ascii_case(scenario))
            .cloned()
    }

    pub fn find(&self, key: &CalculationKey) -> Option<HistoryEntry> {
        self.entries.lock().iter().rev().find(|e| &e.key() == key).cloned()
    }
}

impl Default for MemoryHistory {
    fn default() -> Self {
        Self::new(100)
    }
}

impl HistorySink for MemoryHistory {
    fn record(&self, entry: HistoryEntry) {
        let mut entries = self.entries.lock();
        if entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }
}

/// Appends entries as JSON lines from a background writer thread
pub struct JsonlHistory {
    sender: Mutex<Option<Sender<HistoryEntry>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl JsonlHistory {
    /// Open `path` for appending, creating it if needed
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let display = path.display().to_string();
        let (sender, receiver) = mpsc::channel::<HistoryEntry>();

        let worker = thread::spawn(move || {
            let mut writer = BufWriter::new(file);
            for entry in receiver {
                let written = serde_json::to_writer(&mut writer, &entry)
                    .map_err(std::io::Error::from)
                    .and_then(|_| writer.write_all(b"\n"))
                    .and_then(|_| writer.flush());
                match written {
                    Ok(()) => debug!("History entry for {}/{} written", entry.agreement, entry.scenario),
                    Err(e) => warn!("Failed to write history entry to {display}: {e}"),
                }
            }
        });

        Ok(Self {
            sender: Mutex::new(Some(sender)),
            worker: Mutex::new(Some(worker)),
        })
    }

    /// Stop accepting entries and wait for pending writes
    pub fn close(&self) {
        drop(self.sender.lock().take());
        if let Some(worker) = self.worker.lock().take() {
            if worker.join().is_err() {
                warn!("History writer thread panicked");
            }
        }
    }
}

impl HistorySink for JsonlHistory {
    fn record(&self, entry: HistoryEntry) {
        match self.sender.lock().as_ref() {
            Some(sender) => {
                if sender.send(entry).is_err() {
                    warn!("History writer has stopped; entry dropped");
                }
            }
            None => warn!("History is closed; entry dropped"),
        }
    }
}

impl Drop for JsonlHistory {
    fn drop(&mut self) {
        self.close();
    }
}

/// Read a JSON-lines history file, skipping blank lines
pub fn read_history<P: AsRef<Path>>(path: P) -> Result<Vec<HistoryEntry>, StoreError> {
    let reader = BufReader::new(File::open(path)?);
    let mut entries = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        entries.push(serde_json::from_str(&line)?);
    }
    Ok(entries)
}
