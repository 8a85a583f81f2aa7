//! Sub-networks: independently authored node/link domains that run standalone or folded into a
//! [`SuperNetwork`](crate::SuperNetwork).

mod base;
#[cfg(test)]
mod tests;

pub use self::base::{NetworkCore, Placement};
pub(crate) use self::base::SolverPhase;

use crate::{isolate, lock, NetworkError, Node};

/// A network of nodes and links.
///
/// Implementors provide the two construction hooks, [`SubNetwork::init_nodes`] and
/// [`SubNetwork::init_network`], plus access to their [`NetworkCore`]. The lifecycle methods
/// (`initialize`, `restart`, `update`) are provided and never propagate a failure: errors and
/// panics raised by the hooks are reported through `log` and the call can simply be retried.
pub trait SubNetwork: Send {
    type Node: Node;

    fn core(&self) -> &NetworkCore<Self::Node>;

    fn core_mut(&mut self) -> &mut NetworkCore<Self::Node>;

    /// Number of nodes this network defines, not counting the boundary node.
    fn num_local_nodes(&self) -> usize;

    /// Create exactly [`num_local_nodes`](SubNetwork::num_local_nodes) named nodes starting at
    /// the network's node offset, plus the boundary node when standalone.
    ///
    /// [`NetworkCore::init_local_nodes`] does this for the common case.
    fn init_nodes(&mut self, scope: &str) -> Result<(), NetworkError>;

    /// Build the links against the node list and, when standalone, the solver
    /// ([`NetworkCore::build_solver`]).
    fn init_network(&mut self) -> Result<(), NetworkError>;

    /// Reset the network's non-checkpointed state. The default restarts every link.
    fn restart_model(&mut self) -> Result<(), NetworkError> {
        self.core_mut().restart_links();
        Ok(())
    }

    fn name(&self) -> &str {
        self.core().name()
    }

    /// Build the network's nodes and links.
    ///
    /// Does nothing while the network waits for its composite to assign a node offset.
    fn initialize(&mut self) {
        if self.core().awaiting_registration() {
            log::debug!(
                "{}: waiting for {} to register its nodes",
                self.name(),
                self.core().super_network().map_or("<none>", |id| id.name())
            );
            return;
        }

        let num_local_nodes = self.num_local_nodes();
        self.core_mut().prepare_initialization(num_local_nodes);
        let scope = self.core().scope_name();
        match isolate(|| {
            self.init_nodes(&scope)?;
            self.init_network()
        }) {
            Ok(()) => {
                self.core_mut().set_initialized(true);
                log::info!(
                    "{}: initialized {num_local_nodes} nodes at offset {}",
                    self.name(),
                    self.core().node_offset()
                );
            }
            Err(fault) => fault.report(self.name(), "initialize"),
        }
    }

    /// Restart after a checkpoint load. Does nothing while folded into a composite.
    fn restart(&mut self) {
        if self.core().is_sub_network() {
            return;
        }
        if let Err(fault) = isolate(|| self.restart_model()) {
            fault.report(self.name(), "restart");
        }
    }

    /// Advance the network by one frame. Does nothing while folded into a composite.
    fn update(&mut self, dt: f64) {
        if self.core().is_sub_network() {
            return;
        }
        let mutex = self.core().mutex();
        let _guard = self.core().mutex_enabled().then(|| lock(&mutex));

        if !self.core().is_initialized() {
            log::debug!("{}: not initialized, skipping update", self.name());
            return;
        }
        if let Err(fault) = isolate(|| {
            self.step_pre_solver(dt)?;
            self.core_mut().step_solver(dt)?;
            self.step_post_solver(dt)
        }) {
            fault.report(self.name(), "update");
        }
    }

    /// Step the network's spotters and connectors ahead of the solver.
    fn step_pre_solver(&mut self, dt: f64) -> Result<(), NetworkError> {
        self.core_mut().step_spotters(dt, SolverPhase::Pre)
    }

    /// Step the network's spotters after the solver.
    fn step_post_solver(&mut self, dt: f64) -> Result<(), NetworkError> {
        self.core_mut().step_spotters(dt, SolverPhase::Post)
    }
}
