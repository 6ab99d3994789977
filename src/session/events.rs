//! Bounded history of game events seen on the push stream

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use serde::Serialize;
use serde_json::{Map, Value};

/// Stream plumbing, not game events
const IGNORED_EVENT_TYPES: [&str; 4] = ["", "CONNECTED", "SNAPSHOT", "ERROR"];

/// Message fields copied into a record when present
const RECORDED_FIELDS: [&str; 8] = [
    "player_id",
    "command_type",
    "direction",
    "speak_text",
    "result_status",
    "turn_no",
    "round_no",
    "step_seq",
];

/// One game event, reduced to the fields worth reporting
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventRecord {
    pub event_type: String,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

impl EventRecord {
    /// `None` for plumbing events
    pub fn from_message(event_type: &str, message: &Value) -> Option<Self> {
        if IGNORED_EVENT_TYPES.contains(&event_type) {
            return None;
        }
        let details = RECORDED_FIELDS
            .iter()
            .filter_map(|key| message.get(*key).map(|v| (key.to_string(), v.clone())))
            .collect();
        Some(Self {
            event_type: event_type.to_string(),
            details,
        })
    }
}

/// Ring buffer; the oldest record is dropped once full
#[derive(Debug)]
pub struct RecentEvents {
    capacity: usize,
    records: Mutex<VecDeque<EventRecord>>,
}

impl RecentEvents {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            records: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    pub fn push(&self, record: EventRecord) {
        if self.capacity == 0 {
            return;
        }
        let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        while records.len() >= self.capacity {
            records.pop_front();
        }
        records.push_back(record);
    }

    /// Oldest first
    pub fn to_vec(&self) -> Vec<EventRecord> {
        let records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        records.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
