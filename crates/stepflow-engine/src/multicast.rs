//! Fan-out from one source-capable step to any number of consumers.
//!
//! A job owns a single [`ConnectorArena`]. Every source-capable step gets a
//! [`MulticastOutput`] in the arena at assembly time and every consumer gets
//! its own branch [`Connector`]; steps only ever hold the opaque ids.

use stepflow_types::Record;

use crate::connector::{Connector, ConnectorId};

/// Opaque handle to a [`MulticastOutput`] in a [`ConnectorArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OutputId(pub(crate) usize);

/// Ordered set of branch connectors fed by one producer.
#[derive(Debug, Default)]
pub struct MulticastOutput {
    branches: Vec<ConnectorId>,
    discard: bool,
}

impl MulticastOutput {
    /// Branch connectors in registration order.
    #[must_use]
    pub fn branches(&self) -> &[ConnectorId] {
        &self.branches
    }

    /// `true` once a branch or the discard sink is attached.
    #[must_use]
    pub fn is_consumed(&self) -> bool {
        self.discard || !self.branches.is_empty()
    }

    #[must_use]
    pub fn is_discarding(&self) -> bool {
        self.discard
    }
}

/// Storage for every connector and multicast output of one job.
#[derive(Debug, Default)]
pub struct ConnectorArena {
    connectors: Vec<Connector>,
    outputs: Vec<MulticastOutput>,
}

impl ConnectorArena {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate an output with no branches.
    pub fn add_output(&mut self) -> OutputId {
        self.outputs.push(MulticastOutput::default());
        OutputId(self.outputs.len() - 1)
    }

    /// Create a new connector and register it as the last branch of `output`.
    pub fn add_branch(&mut self, output: OutputId) -> ConnectorId {
        self.connectors.push(Connector::new());
        let id = ConnectorId(self.connectors.len() - 1);
        self.outputs[output.0].branches.push(id);
        id
    }

    /// Terminate `output` with a sink that drops everything emitted into it.
    pub fn attach_discard(&mut self, output: OutputId) {
        self.outputs[output.0].discard = true;
    }

    #[must_use]
    pub fn output(&self, id: OutputId) -> &MulticastOutput {
        &self.outputs[id.0]
    }

    #[must_use]
    pub fn connector(&self, id: ConnectorId) -> &Connector {
        &self.connectors[id.0]
    }

    pub fn connector_mut(&mut self, id: ConnectorId) -> &mut Connector {
        &mut self.connectors[id.0]
    }

    /// Move a connector out for exclusive use by its consumer. The slot is
    /// left empty until [`ConnectorArena::restore`] puts it back.
    pub(crate) fn take(&mut self, id: ConnectorId) -> Connector {
        std::mem::take(&mut self.connectors[id.0])
    }

    pub(crate) fn restore(&mut self, id: ConnectorId, connector: Connector) {
        self.connectors[id.0] = connector;
    }

    /// Deliver `record` to every branch of `output`, in registration order.
    ///
    /// Each branch receives its own copy, so a consumer mutating its record
    /// never affects another branch. With no branches the record is dropped.
    pub fn emit(&mut self, output: OutputId, record: Record) {
        let branches = &self.outputs[output.0].branches;
        let Some((last, rest)) = branches.split_last() else {
            tracing::trace!(record = %record, "Discard");
            return;
        };
        for branch in rest {
            self.connectors[branch.0].enqueue(record.clone());
        }
        self.connectors[last.0].enqueue(record);
    }
}

/// Write half handed to a step while it executes.
#[derive(Debug)]
pub struct OutputWriter<'a> {
    arena: &'a mut ConnectorArena,
    output: OutputId,
    emitted: u64,
}

impl<'a> OutputWriter<'a> {
    pub(crate) fn new(arena: &'a mut ConnectorArena, output: OutputId) -> Self {
        Self {
            arena,
            output,
            emitted: 0,
        }
    }

    pub fn emit(&mut self, record: Record) {
        self.arena.emit(self.output, record);
        self.emitted += 1;
    }

    #[must_use]
    pub fn emitted(&self) -> u64 {
        self.emitted
    }
}
