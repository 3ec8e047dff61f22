//! Grow-only lookup tables shared by the encoder and decoder.
//!
//! Ids start at 1 and are dense; id 0 never names an entry.

use std::collections::HashMap;

use log::debug;

use crate::error::{JellyError, Result, TableKind};

/// Encoder side: value -> id, plus the values in id order.
#[derive(Debug, Clone)]
pub struct EncoderTable {
    kind: TableKind,
    limit: u32,
    ids: HashMap<String, u32>,
    values: Vec<String>,
}

impl EncoderTable {
    pub fn new(kind: TableKind, limit: u32) -> Self {
        Self {
            kind,
            limit,
            ids: HashMap::new(),
            values: Vec::new(),
        }
    }

    /// Id for `value`, and whether it was just assigned.
    pub fn get_or_insert(&mut self, value: &str) -> Result<(u32, bool)> {
        if let Some(&id) = self.ids.get(value) {
            return Ok((id, false));
        }
        if self.values.len() as u64 >= self.limit as u64 {
            return Err(JellyError::ResourceLimit {
                table: self.kind,
                limit: self.limit,
            });
        }
        self.values.push(value.to_string());
        let id = self.values.len() as u32;
        self.ids.insert(value.to_string(), id);
        debug!("{} table: assigned id {} to {:?}", self.kind, id, value);
        Ok((id, true))
    }

    pub fn get(&self, value: &str) -> Option<u32> {
        self.ids.get(value).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn clear(&mut self) {
        self.ids.clear();
        self.values.clear();
    }
}

/// Decoder side: dense id -> value arena, filled only by update rows.
///
/// Ids arrive in order: an update names an id that is already bound or
/// the next free one, never a gap.
#[derive(Debug, Clone)]
pub struct DecoderTable {
    kind: TableKind,
    limit: u32,
    values: Vec<String>,
    last_id: u32,
}

impl DecoderTable {
    pub fn new(kind: TableKind, limit: u32) -> Self {
        Self {
            kind,
            limit,
            values: Vec::new(),
            last_id: 0,
        }
    }

    /// Replace the ceiling, e.g. after a stream-options row.
    pub fn set_limit(&mut self, limit: u32) {
        self.limit = limit;
    }

    /// Apply an update row. `id == 0` means the last id plus one.
    ///
    /// Rebinding an id to a different value, or skipping ahead of the next
    /// free id, is a protocol error.
    pub fn insert(&mut self, id: u32, value: String) -> Result<u32> {
        let id = if id == 0 {
            self.last_id.checked_add(1).ok_or_else(|| {
                JellyError::Protocol(format!("{} table id overflow", self.kind))
            })?
        } else {
            id
        };
        if id > self.limit {
            return Err(JellyError::Protocol(format!(
                "{} table id {} exceeds the declared size {}",
                self.kind, id, self.limit
            )));
        }
        let idx = (id - 1) as usize;
        match self.values.get(idx) {
            Some(existing) if *existing != value => {
                return Err(JellyError::Protocol(format!(
                    "{} table id {} rebound from {:?} to {:?}",
                    self.kind, id, existing, value
                )));
            }
            Some(_) => {}
            None if idx == self.values.len() => self.values.push(value),
            None => {
                return Err(JellyError::Protocol(format!(
                    "{} table id {} skips ahead of the next free id {}",
                    self.kind,
                    id,
                    self.values.len() + 1
                )));
            }
        }
        self.last_id = id;
        Ok(id)
    }

    pub fn get(&self, id: u32) -> Result<&str> {
        id.checked_sub(1)
            .and_then(|idx| self.values.get(idx as usize))
            .map(String::as_str)
            .ok_or_else(|| {
                JellyError::Protocol(format!("{} table has no entry for id {}", self.kind, id))
            })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn clear(&mut self) {
        self.values.clear();
        self.last_id = 0;
    }
}
