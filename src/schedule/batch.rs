// src/schedule/batch.rs

//! Per-batch launch bookkeeping.

use std::collections::{BTreeMap, HashSet};

use crate::schedule::context::GadgetId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JobState {
    Pending,
    Running,
    Done,
}

#[derive(Debug, Clone)]
struct Entry {
    id: GadgetId,
    name: String,
    state: JobState,
    /// In-batch jobs that must be done before this one launches.
    wait_for: Vec<String>,
}

/// Jobs of one batch and which of them may launch.
///
/// Wait lists only keep names that belong to the batch; anything outside
/// it has either already run or was skipped.
#[derive(Debug, Clone, Default)]
pub struct BatchState {
    /// Kept in submission order.
    entries: Vec<Entry>,
    by_name: BTreeMap<String, usize>,
}

impl BatchState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, id: GadgetId, name: impl Into<String>) {
        let name = name.into();
        self.by_name.insert(name.clone(), self.entries.len());
        self.entries.push(Entry {
            id,
            name,
            state: JobState::Pending,
            wait_for: Vec::new(),
        });
    }

    /// Record what `name` waits for. Must be called after every job of the
    /// batch has been pushed.
    pub fn set_wait_for(&mut self, name: &str, wait_for: Vec<String>) {
        let known: HashSet<&str> = self.by_name.keys().map(String::as_str).collect();
        let filtered: Vec<String> = wait_for
            .into_iter()
            .filter(|w| w != name && known.contains(w.as_str()))
            .collect();
        if let Some(&idx) = self.by_name.get(name) {
            self.entries[idx].wait_for = filtered;
        }
    }

    pub fn wait_list(&self, name: &str) -> &[String] {
        self.by_name
            .get(name)
            .map(|&idx| self.entries[idx].wait_for.as_slice())
            .unwrap_or(&[])
    }

    /// `(id, name)` of every job, in submission order.
    pub fn members(&self) -> Vec<(GadgetId, String)> {
        self.entries.iter().map(|e| (e.id, e.name.clone())).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    fn is_done(&self, name: &str) -> bool {
        self.by_name
            .get(name)
            .is_some_and(|&idx| self.entries[idx].state == JobState::Done)
    }

    /// Pending jobs whose wait lists are satisfied, marked running, in
    /// submission order.
    pub fn take_ready(&mut self) -> Vec<(GadgetId, String)> {
        let ready: Vec<usize> = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.state == JobState::Pending)
            .filter(|(_, e)| e.wait_for.iter().all(|w| self.is_done(w)))
            .map(|(idx, _)| idx)
            .collect();

        ready
            .into_iter()
            .map(|idx| {
                let entry = &mut self.entries[idx];
                entry.state = JobState::Running;
                (entry.id, entry.name.clone())
            })
            .collect()
    }

    /// Mark a running job as done. Returns its id, or `None` if the name is
    /// not a running job of this batch.
    pub fn mark_done(&mut self, name: &str) -> Option<GadgetId> {
        let &idx = self.by_name.get(name)?;
        let entry = &mut self.entries[idx];
        if entry.state != JobState::Running {
            return None;
        }
        entry.state = JobState::Done;
        Some(entry.id)
    }

    pub fn running(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.state == JobState::Running)
            .count()
    }

    pub fn is_finished(&self) -> bool {
        self.entries.iter().all(|e| e.state == JobState::Done)
    }

    /// Nothing is running, yet pending jobs cannot launch.
    pub fn is_stalled(&self) -> bool {
        self.running() == 0 && !self.is_finished()
    }

    /// Names of jobs still pending.
    pub fn pending(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| e.state == JobState::Pending)
            .map(|e| e.name.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch() -> BatchState {
        let mut b = BatchState::new();
        b.push(0, "uvm");
        b.push(1, "cn");
        b.push(2, "top");
        b.set_wait_for("cn", vec!["uvm".into(), "not_in_batch".into()]);
        b.set_wait_for("top", vec!["cn".into(), "uvm".into()]);
        b
    }

    #[test]
    fn wait_lists_drop_foreign_names() {
        let b = batch();
        assert_eq!(b.wait_list("cn"), ["uvm".to_string()]);
        assert!(b.wait_list("uvm").is_empty());
    }

    #[test]
    fn launches_follow_wait_lists() {
        let mut b = batch();
        assert_eq!(b.take_ready(), vec![(0, "uvm".to_string())]);
        assert!(b.take_ready().is_empty());

        assert_eq!(b.mark_done("uvm"), Some(0));
        assert_eq!(b.take_ready(), vec![(1, "cn".to_string())]);
        assert_eq!(b.mark_done("cn"), Some(1));
        assert_eq!(b.take_ready(), vec![(2, "top".to_string())]);
        assert!(!b.is_finished());
        assert_eq!(b.mark_done("top"), Some(2));
        assert!(b.is_finished());
        assert_eq!(b.mark_done("top"), None);
    }

    #[test]
    fn mutual_waits_stall() {
        let mut b = BatchState::new();
        b.push(0, "a");
        b.push(1, "b");
        b.set_wait_for("a", vec!["b".into()]);
        b.set_wait_for("b", vec!["a".into()]);
        assert!(b.take_ready().is_empty());
        assert!(b.is_stalled());
        assert_eq!(b.pending(), vec!["a", "b"]);
    }
}
