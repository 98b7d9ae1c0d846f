use std::fmt;

use crate::error::{Error, Result};
use crate::mapper::Reading;

// ---------------------------------------------------------------------------
// Mark – one annotated fracture point
// ---------------------------------------------------------------------------

/// Identity of a mark within one session. Assigned from 1 upwards and never
/// reused, even after removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MarkId(pub u64);

impl fmt::Display for MarkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A user annotation, frozen at the reading it was created with.
#[derive(Debug, Clone, PartialEq)]
pub struct Mark {
    pub id: MarkId,
    pub label: String,
    pub pixel_x: f64,
    pub pixel_y: f64,
    /// Track position at creation, in µm.
    pub position: f64,
    /// Force at creation, in N.
    pub force: f64,
    /// Calibration/data generation the reading was resolved under.
    pub generation: u64,
}

// ---------------------------------------------------------------------------
// MarkManager
// ---------------------------------------------------------------------------

/// Ordered marks of one session. Insertion order is display and export order.
#[derive(Debug, Clone)]
pub struct MarkManager {
    marks: Vec<Mark>,
    next_id: u64,
}

impl Default for MarkManager {
    fn default() -> Self {
        Self {
            marks: Vec::new(),
            next_id: 1,
        }
    }
}

impl MarkManager {
    /// Append a mark for an already-resolved reading.
    pub fn add(&mut self, pixel_x: f64, pixel_y: f64, reading: Reading, generation: u64) -> &Mark {
        let id = MarkId(self.next_id);
        self.next_id += 1;

        self.marks.push(Mark {
            id,
            label: id.0.to_string(),
            pixel_x,
            pixel_y,
            position: reading.position,
            force: reading.force,
            generation,
        });
        log::debug!(
            "mark {id} at {:.1} µm, {:.3} N",
            reading.position,
            reading.force
        );
        &self.marks[self.marks.len() - 1]
    }

    pub fn remove(&mut self, id: MarkId) -> Result<Mark> {
        let idx = self
            .marks
            .iter()
            .position(|m| m.id == id)
            .ok_or(Error::MarkNotFound(id))?;
        log::debug!("mark {id} removed");
        Ok(self.marks.remove(idx))
    }

    pub fn get(&self, id: MarkId) -> Option<&Mark> {
        self.marks.iter().find(|m| m.id == id)
    }

    /// Marks in insertion order.
    pub fn list(&self) -> &[Mark] {
        &self.marks
    }

    pub fn len(&self) -> usize {
        self.marks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.marks.is_empty()
    }

    /// The mark whose track position is closest to `position`, if it lies
    /// within `tolerance` µm.
    pub fn nearest(&self, position: f64, tolerance: f64) -> Option<MarkId> {
        self.marks
            .iter()
            .map(|m| (m.id, (m.position - position).abs()))
            .filter(|&(_, d)| d <= tolerance)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(id, _)| id)
    }

    /// Marks resolved under a generation other than `current`.
    pub fn stale(&self, current: u64) -> impl Iterator<Item = &Mark> {
        self.marks.iter().filter(move |m| m.generation != current)
    }

    /// Drop every stale mark, returning how many went.
    pub fn remove_stale(&mut self, current: u64) -> usize {
        let before = self.marks.len();
        self.marks.retain(|m| m.generation == current);
        before - self.marks.len()
    }

    /// Remove all marks. Identities keep counting from where they were.
    pub fn clear(&mut self) {
        self.marks.clear();
    }
}
