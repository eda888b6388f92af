//! Undo/redo snapshots of the table document.
//!
//! [`HistoryService`] keeps a bounded stack of document snapshots with a
//! cursor; [`HistoryDebouncer`] groups rapid changes into a single snapshot,
//! recording either after a quiet period or immediately when a bus batch
//! completes.

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use tabula_model::events::{EventBus, HandlerId, TableEvent};
use tabula_model::{TableDocument, TableModel};

struct Snapshot {
    doc: TableDocument,
    /// Serialized form, used for the duplicate check. Serialization is
    /// deterministic (sorted cells, BTreeMap data), so equal strings mean
    /// equal snapshots.
    json: String,
}

/// Bounded snapshot stack with a cursor.
///
/// `undo`/`redo` move the cursor and return the document at it without
/// applying; applying is the caller's job, wrapped in
/// [`HistoryService::restore`] so the application itself is not re-recorded.
pub struct HistoryService {
    snapshots: Vec<Snapshot>,
    cursor: Option<usize>,
    limit: usize,
    suspended: bool,
}

impl HistoryService {
    /// `limit` bounds the stack depth (≥ 1); the oldest snapshot is dropped
    /// on overflow.
    pub fn new(limit: usize) -> Self {
        Self {
            snapshots: Vec::new(),
            cursor: None,
            limit: limit.max(1),
            suspended: false,
        }
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Position of the current snapshot, if any.
    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    /// True while a snapshot is being applied through [`HistoryService::restore`].
    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    /// Snapshot the model. Returns false when suspended or when the state is
    /// identical to the snapshot at the cursor. Recording from a mid-stack
    /// cursor truncates the redo tail first.
    pub fn record(&mut self, model: &TableModel) -> bool {
        if self.suspended {
            return false;
        }
        let doc = model.to_document();
        let json = serde_json::to_string(&doc).expect("document serialization is infallible");

        if let Some(i) = self.cursor {
            if self.snapshots[i].json == json {
                return false;
            }
            self.snapshots.truncate(i + 1);
        } else {
            self.snapshots.clear();
        }

        self.snapshots.push(Snapshot { doc, json });
        if self.snapshots.len() > self.limit {
            self.snapshots.remove(0);
        }
        self.cursor = Some(self.snapshots.len() - 1);
        true
    }

    pub fn can_undo(&self) -> bool {
        matches!(self.cursor, Some(i) if i > 0)
    }

    pub fn can_redo(&self) -> bool {
        self.cursor
            .is_some_and(|i| i + 1 < self.snapshots.len())
    }

    /// Step the cursor back and return that document (not applied).
    pub fn undo(&mut self) -> Option<TableDocument> {
        if !self.can_undo() {
            return None;
        }
        let i = self.cursor.unwrap() - 1;
        self.cursor = Some(i);
        Some(self.snapshots[i].doc.clone())
    }

    /// Step the cursor forward and return that document (not applied).
    pub fn redo(&mut self) -> Option<TableDocument> {
        if !self.can_redo() {
            return None;
        }
        let i = self.cursor.unwrap() + 1;
        self.cursor = Some(i);
        Some(self.snapshots[i].doc.clone())
    }

    /// Apply a snapshot through `apply` with recording suspended. The flag is
    /// cleared even when `apply` fails.
    pub fn restore<E>(
        &mut self,
        doc: TableDocument,
        apply: impl FnOnce(TableDocument) -> Result<(), E>,
    ) -> Result<(), E> {
        self.suspended = true;
        let result = apply(doc);
        self.suspended = false;
        result
    }

    /// Drop every snapshot.
    pub fn clear(&mut self) {
        self.snapshots.clear();
        self.cursor = None;
    }
}

/// Groups rapid changes into one snapshot.
///
/// `schedule` (re-)arms a deadline `delay` from now; the host calls `poll`
/// from its loop. A completed bus batch raises a flag through the handler
/// registered by [`HistoryDebouncer::attach`], which makes the next `poll`
/// record immediately — so a batch yields at most one snapshot regardless of
/// how many events it buffered.
pub struct HistoryDebouncer {
    delay: Duration,
    deadline: Option<Instant>,
    batch_flushed: Rc<Cell<bool>>,
}

impl HistoryDebouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
            batch_flushed: Rc::new(Cell::new(false)),
        }
    }

    /// Arm (or re-arm) the quiet-period timer.
    pub fn schedule(&mut self) {
        self.deadline = Some(Instant::now() + self.delay);
    }

    /// Discard any pending recording.
    pub fn cancel(&mut self) {
        self.deadline = None;
        self.batch_flushed.set(false);
    }

    /// True if a recording is due now or in the future.
    pub fn pending(&self) -> bool {
        self.deadline.is_some() || self.batch_flushed.get()
    }

    /// Subscribe to `bus` so that a completed batch triggers an immediate
    /// snapshot on the next [`HistoryDebouncer::poll`].
    pub fn attach(&self, bus: &mut EventBus) -> HandlerId {
        let flag = Rc::clone(&self.batch_flushed);
        bus.on(move |event| {
            if matches!(event, TableEvent::BatchFlush { .. }) {
                flag.set(true);
            }
        })
    }

    /// Record immediately if anything is pending. Never records while the
    /// history is suspended; the pending state is consumed either way.
    pub fn flush(&mut self, history: &mut HistoryService, model: &TableModel) -> bool {
        if !self.pending() {
            return false;
        }
        self.deadline = None;
        self.batch_flushed.set(false);
        if history.is_suspended() {
            return false;
        }
        history.record(model)
    }

    /// Record if a batch completed or the quiet period elapsed.
    pub fn poll(&mut self, history: &mut HistoryService, model: &TableModel) -> bool {
        self.poll_at(Instant::now(), history, model)
    }

    /// Deterministic variant of [`HistoryDebouncer::poll`] for host loops
    /// that carry their own clock.
    pub fn poll_at(
        &mut self,
        now: Instant,
        history: &mut HistoryService,
        model: &TableModel,
    ) -> bool {
        if self.batch_flushed.get() {
            return self.flush(history, model);
        }
        match self.deadline {
            Some(deadline) if now >= deadline => self.flush(history, model),
            _ => false,
        }
    }
}
