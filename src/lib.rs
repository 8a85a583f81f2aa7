//! The `gunns` crate composes independently authored node/link simulation networks into a single
//! combined network that is solved each frame.
//!
//! A [`SubNetwork`] owns a slice of nodes, its links and (when standalone) a solver. A
//! [`SuperNetwork`] gathers sub-networks, freezes one combined node list for all of them and steps
//! their links together through a shared [`Solver`]. Pairs of [`Connector`] locations living in
//! different sub-networks can be wired together at runtime through auto-created joint networks.
//!
//! ## Examples
//!
//! ```rust,no_run
//! use gunns::{BasicFlavor, BasicNode, BasicSuperNetwork, SharedSubNetwork};
//! # fn network(_: &str) -> SharedSubNetwork<BasicNode> { unimplemented!() }
//!
//! let mut composite = BasicSuperNetwork::new("S", BasicFlavor::default());
//! composite.add_sub_network(network("A"));
//! composite.add_sub_network(network("B"));
//! composite.register_super_nodes();
//! composite.initialize();
//! for _ in 0..10 {
//!     composite.update(0.1);
//! }
//! ```
#![doc = document_features::document_features!()]
#![deny(clippy::all)]

use std::{
    fmt,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

mod fault;
#[cfg(feature = "fluid")]
pub mod fluid;
pub mod link;
pub mod network;
pub mod node;
pub mod solver;
pub mod spotter;
pub mod super_network;

pub use fault::{isolate, Fault};
pub use link::Link;
pub use network::{NetworkCore, Placement, SubNetwork};
pub use node::{BasicNode, Node, NodeList, SharedNodeList};
pub use solver::{GroupFault, PassThroughSolver, Solver, SolverConfig};
pub use spotter::{
    Connector, ConnectorConfig, ConnectorInput, MonitorConfig, MonitorInput, NetworkSpotter,
    PotentialMonitor, SpotterConfig, SpotterContext, SpotterInput,
};
pub use super_network::{
    BasicFlavor, BasicSuperNetwork, JointNetwork, JointPlan, JointRecord, JointRegistry,
    NetworkFlavor, SuperNetwork, SuperNetworkId,
};

/// A sub-network shared between its caller and the composite that folds it in.
pub type SharedSubNetwork<N> = Arc<Mutex<dyn SubNetwork<Node = N>>>;

/// A connector shared between its owning network and the composite joining it.
pub type SharedConnector<N> = Arc<Mutex<Connector<N>>>;

/// A spotter stepped by its owning network.
pub type SharedSpotter<N> = Arc<Mutex<dyn NetworkSpotter<N>>>;

/// Wrap a concrete sub-network into a [`SharedSubNetwork`] handle.
pub fn shared<S>(network: S) -> SharedSubNetwork<S::Node>
where
    S: SubNetwork + 'static,
{
    Arc::new(Mutex::new(network))
}

/// Lock a shared handle, recovering the data if a previous holder panicked.
///
/// Sub-network hooks run inside `catch_unwind`, so a poisoned lock only means that one member
/// faulted; its siblings and the composite keep going.
pub fn lock<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// The kind of joint a [`Connector`] location accepts. Only locations of the same type can be
/// joined.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct JointType(pub u32);

impl fmt::Display for JointType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    #[error("{network}: initialization error: {message}")]
    Initialization { network: String, message: String },

    #[error("{network}: {message}")]
    Runtime { network: String, message: String },

    #[error("Cannot join `{first}` (type {first_type}) to `{second}` (type {second_type})")]
    JointTypeMismatch {
        first: String,
        first_type: JointType,
        second: String,
        second_type: JointType,
    },

    #[error("Locations `{first}` and `{second}` are already joined")]
    AlreadyJoined { first: String, second: String },

    #[error("{network}: nodes are registered, cannot join `{location}`")]
    JoinAfterRegistration { network: String, location: String },

    #[error("Unknown joint location: {name}")]
    UnknownJointLocation { name: String },

    #[error("{connector}: no joint network has been set")]
    NoJointNetwork { connector: String },

    #[error("{connector}: joint network index is unassigned")]
    UnassignedJointIndex { connector: String },

    #[error("{network}: node {index} is out of range for {len} nodes")]
    NodeOutOfRange {
        network: String,
        index: usize,
        len: usize,
    },

    #[error("{network}: link {index} is out of range for {len} links")]
    LinkOutOfRange {
        network: String,
        index: usize,
        len: usize,
    },

    #[error("{link}: port {port} is out of range")]
    PortOutOfRange { link: String, port: usize },

    #[error("{network}: fluid configuration mismatch: {message}")]
    FluidConfigMismatch { network: String, message: String },
}

impl NetworkError {
    /// Shorthand for [`NetworkError::Initialization`].
    pub fn init(network: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Initialization {
            network: network.into(),
            message: message.into(),
        }
    }

    /// Shorthand for [`NetworkError::Runtime`].
    pub fn runtime(network: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Runtime {
            network: network.into(),
            message: message.into(),
        }
    }
}
