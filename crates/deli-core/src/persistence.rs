//! The save-document contract and the in-memory store.
//!
//! The shift loads one [`SaveDocument`] at construction and writes it back
//! after any step that changed money or stock. Stores report failures as
//! [`StoreError`]; the shift logs them and keeps playing on what it has.
//!
//! The binary envelope (`encode_document` / `decode_document`) prefixes the
//! bitcode payload with a magic number and a format version so stale or
//! foreign files are rejected before decoding.

use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::fixed::Cents;

/// Magic number identifying a deli save file.
pub const SAVE_MAGIC: u32 = 0xDE11_0001;

/// Current envelope version. Increment when breaking the document layout.
pub const SAVE_VERSION: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("encoding failed: {0}")]
    Encode(String),
    #[error("decoding failed: {0}")]
    Decode(String),
    #[error("invalid save magic: expected 0x{:08X}, got 0x{:08X}", SAVE_MAGIC, .0)]
    InvalidMagic(u32),
    #[error("unsupported save version {0} (this build reads {SAVE_VERSION})")]
    UnsupportedVersion(u32),
    #[error("store unavailable")]
    Unavailable,
}

/// Lifetime counters kept across shifts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Stats {
    pub high_score: u64,
    pub orders_completed: u64,
    pub orders_missed: u64,
    pub best_combo: u32,
    pub total_earned: Cents,
}

/// Where the player's ship sits on the world map. Owned by the travel layer;
/// carried through untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShipPosition {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaveDocument {
    pub current_location: String,
    pub ship_position: ShipPosition,
    /// The wallet, in cents.
    pub total_money: Cents,
    pub shifts_completed: u32,
    pub locations_visited: Vec<String>,
    /// Stock by ingredient name.
    pub inventory: BTreeMap<String, u32>,
    pub stats: Stats,
}

pub const DEFAULT_LOCATION: &str = "home_station";

impl Default for SaveDocument {
    fn default() -> Self {
        Self {
            current_location: DEFAULT_LOCATION.to_string(),
            ship_position: ShipPosition::default(),
            total_money: 0,
            shifts_completed: 0,
            locations_visited: vec![DEFAULT_LOCATION.to_string()],
            inventory: BTreeMap::new(),
            stats: Stats::default(),
        }
    }
}

impl SaveDocument {
    /// A fresh save holding `stock`.
    pub fn with_stock(stock: BTreeMap<String, u32>) -> Self {
        Self {
            inventory: stock,
            ..Self::default()
        }
    }
}

/// The persistent store collaborator.
pub trait SaveStore {
    /// `Ok(None)` when nothing has been saved yet.
    fn load(&mut self) -> Result<Option<SaveDocument>, StoreError>;
    fn save(&mut self, doc: &SaveDocument) -> Result<(), StoreError>;
}

#[derive(Debug, Default)]
struct MemoryInner {
    doc: Option<SaveDocument>,
    saves: u64,
    fail_saves: bool,
}

/// Store that keeps the document in memory. Clones share the same slot, so
/// a caller can keep a handle after giving one to a shift.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Rc<RefCell<MemoryInner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(doc: SaveDocument) -> Self {
        let store = Self::new();
        store.inner.borrow_mut().doc = Some(doc);
        store
    }

    pub fn document(&self) -> Option<SaveDocument> {
        self.inner.borrow().doc.clone()
    }

    /// Successful saves so far.
    pub fn save_count(&self) -> u64 {
        self.inner.borrow().saves
    }

    /// Make every later save fail with [`StoreError::Unavailable`].
    pub fn set_failing(&self, failing: bool) {
        self.inner.borrow_mut().fail_saves = failing;
    }
}

impl SaveStore for MemoryStore {
    fn load(&mut self) -> Result<Option<SaveDocument>, StoreError> {
        Ok(self.inner.borrow().doc.clone())
    }

    fn save(&mut self, doc: &SaveDocument) -> Result<(), StoreError> {
        let mut inner = self.inner.borrow_mut();
        if inner.fail_saves {
            return Err(StoreError::Unavailable);
        }
        inner.doc = Some(doc.clone());
        inner.saves += 1;
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct SaveHeader {
    magic: u32,
    version: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct SaveEnvelope {
    header: SaveHeader,
    doc: SaveDocument,
}

pub fn encode_document(doc: &SaveDocument) -> Result<Vec<u8>, StoreError> {
    let envelope = SaveEnvelope {
        header: SaveHeader {
            magic: SAVE_MAGIC,
            version: SAVE_VERSION,
        },
        doc: doc.clone(),
    };
    bitcode::serialize(&envelope).map_err(|e| StoreError::Encode(e.to_string()))
}

pub fn decode_document(data: &[u8]) -> Result<SaveDocument, StoreError> {
    let envelope: SaveEnvelope =
        bitcode::deserialize(data).map_err(|e| StoreError::Decode(e.to_string()))?;
    if envelope.header.magic != SAVE_MAGIC {
        return Err(StoreError::InvalidMagic(envelope.header.magic));
    }
    if envelope.header.version != SAVE_VERSION {
        return Err(StoreError::UnsupportedVersion(envelope.header.version));
    }
    Ok(envelope.doc)
}
