//! Publish/subscribe channel between the document core and its embedders.
//!
//! Delivery is synchronous and single-threaded. While the bus is paused,
//! emitted events are buffered in insertion order; the transition back to
//! zero pause depth flushes the buffer and then delivers a single
//! [`TableEvent::BatchFlush`] carrying the buffered payload count.

use std::any::Any;
use std::panic::{catch_unwind, resume_unwind, AssertUnwindSafe};

use crate::{Cell, ColumnSize, DataMap};

/// Which field of a cell changed, with before/after values.
#[derive(Clone, Debug, PartialEq)]
pub enum CellField {
    Value { old: String, new: String },
    Classes { old: Vec<String>, new: Vec<String> },
    Data { old: DataMap, new: DataMap },
}

/// Structural mutations of the grid.
#[derive(Clone, Debug, PartialEq)]
pub enum StructureChange {
    Resize { rows: u32, cols: u32 },
    HeaderRows { old: u32, new: u32 },
    Meta { name: String },
    ApplyDocument,
    InsertRows { index: u32, count: u32 },
    InsertColumns { index: u32, count: u32 },
    DeleteRows { start: u32, count: u32 },
    DeleteColumns { start: u32, count: u32 },
    ColumnSizes { sizes: Option<Vec<ColumnSize>> },
    Import,
}

/// Events published by the core.
///
/// The variants and their payloads are the public contract between the
/// document model and any UI or persistence layer. The `Edit*` variants are
/// emitted by the inline editor collaborator, not by the core itself.
#[derive(Clone, Debug, PartialEq)]
pub enum TableEvent {
    CellChange {
        r: u32,
        c: u32,
        field: CellField,
    },
    StructureChange(StructureChange),
    Paste {
        start_r: u32,
        start_c: u32,
        rows: u32,
        cols: u32,
        html: bool,
    },
    Merge {
        r1: u32,
        c1: u32,
        r2: u32,
        c2: u32,
        row_span: u32,
        col_span: u32,
    },
    Split {
        r: u32,
        c: u32,
        row_span: u32,
        col_span: u32,
    },
    SelectionChange {
        r: u32,
        c: u32,
        cell: Option<Cell>,
    },
    SelectionRange {
        r1: u32,
        c1: u32,
        r2: u32,
        c2: u32,
        cells: Vec<Cell>,
    },
    EditStart {
        r: u32,
        c: u32,
        old_value: String,
    },
    EditCommit {
        r: u32,
        c: u32,
        old_value: String,
        new_value: String,
    },
    EditCancel {
        r: u32,
        c: u32,
    },
    BatchFlush {
        buffered_event_count: usize,
    },
}

impl From<StructureChange> for TableEvent {
    fn from(change: StructureChange) -> Self {
        TableEvent::StructureChange(change)
    }
}

/// Identifier returned by [`EventBus::on`]; pass it to [`EventBus::off`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

type Handler = Box<dyn FnMut(&TableEvent)>;

/// Synchronous pub/sub with pausable, reference-counted batch delivery.
///
/// A handler that panics does not abort delivery to its peers; the failure
/// is recorded and can be drained with [`EventBus::take_delivery_failures`].
#[derive(Default)]
pub struct EventBus {
    handlers: Vec<(HandlerId, Handler)>,
    next_id: u64,
    pause_depth: u32,
    buffer: Vec<TableEvent>,
    delivery_failures: Vec<String>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to all events.
    pub fn on(&mut self, handler: impl FnMut(&TableEvent) + 'static) -> HandlerId {
        let id = HandlerId(self.next_id);
        self.next_id += 1;
        self.handlers.push((id, Box::new(handler)));
        id
    }

    /// Unsubscribe. Returns false if the id is unknown.
    pub fn off(&mut self, id: HandlerId) -> bool {
        let before = self.handlers.len();
        self.handlers.retain(|(handler_id, _)| *handler_id != id);
        self.handlers.len() != before
    }

    /// Returns true while at least one [`EventBus::pause`] is outstanding.
    pub fn is_paused(&self) -> bool {
        self.pause_depth > 0
    }

    /// Deliver immediately, or buffer while paused.
    pub fn emit(&mut self, event: TableEvent) {
        if self.pause_depth > 0 {
            self.buffer.push(event);
            return;
        }
        self.deliver(&event);
    }

    /// Increase the pause depth; emitted events are buffered until the
    /// matching [`EventBus::resume`].
    pub fn pause(&mut self) {
        self.pause_depth += 1;
    }

    /// Decrease the pause depth. On the transition to zero, buffered events
    /// are delivered in their original order, followed by one
    /// [`TableEvent::BatchFlush`].
    pub fn resume(&mut self) {
        if self.pause_depth == 0 {
            return;
        }
        self.pause_depth -= 1;
        if self.pause_depth > 0 {
            return;
        }
        let buffered = std::mem::take(&mut self.buffer);
        let buffered_event_count = buffered.len();
        for event in &buffered {
            self.deliver(event);
        }
        self.deliver(&TableEvent::BatchFlush {
            buffered_event_count,
        });
    }

    /// Run `f` between `pause` and `resume`, resuming even on unwind.
    pub fn batch<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        self.pause();
        let result = catch_unwind(AssertUnwindSafe(|| f(self)));
        self.resume();
        match result {
            Ok(value) => value,
            Err(payload) => resume_unwind(payload),
        }
    }

    /// Drain failures recorded while delivering events.
    pub fn take_delivery_failures(&mut self) -> Vec<String> {
        std::mem::take(&mut self.delivery_failures)
    }

    fn deliver(&mut self, event: &TableEvent) {
        for (_, handler) in &mut self.handlers {
            if let Err(payload) = catch_unwind(AssertUnwindSafe(|| handler(event))) {
                self.delivery_failures.push(panic_message(payload));
            }
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "event handler panicked".to_string()
    }
}
