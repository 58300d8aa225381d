// Mark store - Position-ordered mark sequence with typed queries

use std::collections::BTreeMap;
use std::fmt;

use crate::domain::model::*;

/// Ordered sequence of marks keyed by frame position.
///
/// Queries never hand out links between marks; callers keep positions and
/// look marks up again after every mutation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarkStore {
    marks: BTreeMap<i32, Mark>,
}

impl MarkStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from loaded marks; later duplicates replace earlier ones
    pub fn from_marks(marks: impl IntoIterator<Item = Mark>) -> Self {
        let mut store = Self::new();
        for mark in marks {
            store.marks.insert(mark.position, mark);
        }
        store
    }

    pub fn len(&self) -> usize {
        self.marks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.marks.is_empty()
    }

    pub fn clear(&mut self) {
        self.marks.clear();
    }

    /// Iterate marks in position order
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Mark> {
        self.marks.values()
    }

    /// Positions of all marks passing the filter
    pub fn positions(&self, filter: MarkFilter) -> Vec<i32> {
        self.iter()
            .filter(|m| filter.matches(m.mark_type))
            .map(|m| m.position)
            .collect()
    }

    /// Owned snapshot of the sequence
    pub fn to_vec(&self) -> Vec<Mark> {
        self.marks.values().cloned().collect()
    }

    /// Insert a mark. A mark already at the position keeps the stronger type;
    /// the comment and broadcast state follow the surviving type.
    pub fn add(
        &mut self,
        mark_type: MarkType,
        position: i32,
        comment: Option<String>,
        in_broadcast: bool,
    ) -> &Mark {
        let mark = self
            .marks
            .entry(position)
            .and_modify(|existing| {
                if mark_type > existing.mark_type {
                    existing.mark_type = mark_type;
                    existing.old_type = None;
                    existing.comment = comment.clone();
                    existing.in_broadcast = in_broadcast;
                }
            })
            .or_insert_with(|| Mark::new(mark_type, position, comment.clone(), in_broadcast));
        mark
    }

    /// Mark at an exact position
    pub fn get(&self, position: i32) -> Option<&Mark> {
        self.marks.get(&position)
    }

    /// Remove the mark at a position
    pub fn delete(&mut self, position: i32) -> Option<Mark> {
        self.marks.remove(&position)
    }

    /// Remove every mark passing the filter
    pub fn delete_type(&mut self, filter: MarkFilter) -> Vec<Mark> {
        let doomed = self.positions(filter);
        self.remove_all(doomed)
    }

    /// Remove marks passing the filter in `[from, to]`
    pub fn delete_range(&mut self, from: i32, to: i32, filter: MarkFilter) -> Vec<Mark> {
        if from > to {
            return Vec::new();
        }
        let doomed: Vec<i32> = self
            .marks
            .range(from..=to)
            .filter(|(_, m)| filter.matches(m.mark_type))
            .map(|(p, _)| *p)
            .collect();
        self.remove_all(doomed)
    }

    /// Remove marks weaker than `strength` in `[from, to)`
    pub fn delete_weak_in_range(&mut self, from: i32, to: i32, strength: Strength) -> Vec<Mark> {
        if from >= to {
            return Vec::new();
        }
        let doomed: Vec<i32> = self
            .marks
            .range(from..to)
            .filter(|(_, m)| m.mark_type.strength < strength)
            .map(|(p, _)| *p)
            .collect();
        self.remove_all(doomed)
    }

    /// Remove every mark strictly before (`before == true`) or strictly after
    /// a position
    pub fn delete_till(&mut self, position: i32, before: bool) -> Vec<Mark> {
        let doomed: Vec<i32> = if before {
            self.marks.range(..position).map(|(p, _)| *p).collect()
        } else {
            self.marks
                .range((std::ops::Bound::Excluded(position), std::ops::Bound::Unbounded))
                .map(|(p, _)| *p)
                .collect()
        };
        self.remove_all(doomed)
    }

    fn remove_all(&mut self, positions: Vec<i32>) -> Vec<Mark> {
        positions
            .into_iter()
            .filter_map(|p| self.marks.remove(&p))
            .collect()
    }

    /// Reposition a mark. The mark becomes a `Moved` mark of the same class
    /// and remembers its previous type. Returns the new position.
    pub fn move_mark(&mut self, position: i32, new_position: i32, reason: &str) -> Option<i32> {
        let mut mark = self.marks.remove(&position)?;
        let star = if mark.is_start() { "*" } else { "" };
        mark.comment = Some(format!(
            "moved from {} ({}) to ({}), {}{}",
            mark.mark_type.code(),
            position,
            new_position,
            reason,
            star
        ));
        if mark.mark_type.strength != Strength::Moved {
            mark.old_type = Some(mark.mark_type);
        }
        mark.mark_type = MarkType::moved(mark.mark_type.class);
        mark.position = new_position;
        self.marks.insert(new_position, mark);
        Some(new_position)
    }

    /// Change type and position of a mark in place, keeping its comment
    pub fn retype(&mut self, position: i32, new_type: MarkType, new_position: i32) -> Option<i32> {
        let mut mark = self.marks.remove(&position)?;
        mark.mark_type = new_type;
        mark.position = new_position;
        self.marks.insert(new_position, mark);
        Some(new_position)
    }

    /// First mark passing the filter
    pub fn first(&self, filter: MarkFilter) -> Option<&Mark> {
        self.iter().find(|m| filter.matches(m.mark_type))
    }

    /// Last mark passing the filter
    pub fn last(&self, filter: MarkFilter) -> Option<&Mark> {
        self.marks.values().rev().find(|m| filter.matches(m.mark_type))
    }

    /// Nearest mark strictly after a position
    pub fn next(&self, position: i32, filter: MarkFilter) -> Option<&Mark> {
        self.marks
            .range((std::ops::Bound::Excluded(position), std::ops::Bound::Unbounded))
            .map(|(_, m)| m)
            .find(|m| filter.matches(m.mark_type))
    }

    /// Nearest mark strictly before a position
    pub fn prev(&self, position: i32, filter: MarkFilter) -> Option<&Mark> {
        self.marks
            .range(..position)
            .rev()
            .map(|(_, m)| m)
            .find(|m| filter.matches(m.mark_type))
    }

    /// Nearest mark within `window` frames of `center`; ties go to the
    /// earlier mark
    pub fn around(&self, window: i32, center: i32, filter: MarkFilter) -> Option<&Mark> {
        let window = window.max(0);
        let lower = center.saturating_sub(window);
        let upper = center.saturating_add(window);
        let before = self
            .marks
            .range(lower..=center)
            .rev()
            .map(|(_, m)| m)
            .find(|m| filter.matches(m.mark_type));
        let after = self
            .marks
            .range((std::ops::Bound::Excluded(center), std::ops::Bound::Included(upper)))
            .map(|(_, m)| m)
            .find(|m| filter.matches(m.mark_type));
        match (before, after) {
            (Some(b), Some(a)) => {
                let db = center as i64 - b.position as i64;
                let da = a.position as i64 - center as i64;
                if da < db {
                    Some(a)
                } else {
                    Some(b)
                }
            }
            (Some(b), None) => Some(b),
            (None, a) => a,
        }
    }

    /// Number of marks passing the filter
    pub fn count(&self, filter: MarkFilter) -> usize {
        self.iter().filter(|m| filter.matches(m.mark_type)).count()
    }

    /// Mark directly following a position, of any type
    pub fn after(&self, position: i32) -> Option<&Mark> {
        self.next(position, MarkFilter::Any)
    }

    /// Mark directly preceding a position, of any type
    pub fn before(&self, position: i32) -> Option<&Mark> {
        self.prev(position, MarkFilter::Any)
    }

    /// Number of logo stop marks directly followed by a logo start
    pub fn logo_stop_start_pairs(&self) -> usize {
        let marks: Vec<&Mark> = self.iter().collect();
        marks
            .windows(2)
            .filter(|w| w[0].mark_type == MarkType::LOGO_STOP && w[1].mark_type == MarkType::LOGO_START)
            .count()
    }

    /// Whether positions strictly increase, classes alternate and the first
    /// mark is a start
    pub fn is_settled(&self) -> bool {
        let mut expected = MarkClass::Start;
        for mark in self.iter() {
            if mark.mark_type.class != expected {
                return false;
            }
            expected = expected.opposite();
        }
        true
    }
}

impl fmt::Display for MarkStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for mark in self.iter() {
            writeln!(
                f,
                "({:>7}) {:<16} {}",
                mark.position,
                mark.mark_type.code(),
                mark.comment.as_deref().unwrap_or("")
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests;
