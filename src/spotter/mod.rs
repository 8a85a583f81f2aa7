//! Network spotters: helpers a network steps before and after its solver.

mod connector;
mod monitor;

pub use connector::{Connection, Connector};
pub use monitor::PotentialMonitor;

use crate::{Link, NetworkError, Node, NodeList};

/// Configuration data for a [`Connector`].
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConnectorConfig {
    pub name: String,
}

/// Input data for a [`Connector`]: the first deferred port binding.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ConnectorInput {
    /// Index of the link in its owning network.
    pub link: usize,
    pub port: usize,
    /// Node index local to the joint network.
    pub node: usize,
}

/// Configuration data for a [`PotentialMonitor`].
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MonitorConfig {
    pub name: String,
    /// Node index local to the owning network.
    pub node: usize,
}

/// Input data for a [`PotentialMonitor`].
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MonitorInput {
    pub active: bool,
}

/// The closed set of spotter configurations.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SpotterConfig {
    Connector(ConnectorConfig),
    Monitor(MonitorConfig),
}

/// The closed set of spotter inputs.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SpotterInput {
    Connector(ConnectorInput),
    Monitor(MonitorInput),
}

impl SpotterConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            SpotterConfig::Connector(_) => "connector",
            SpotterConfig::Monitor(_) => "monitor",
        }
    }
}

impl SpotterInput {
    pub fn kind(&self) -> &'static str {
        match self {
            SpotterInput::Connector(_) => "connector",
            SpotterInput::Monitor(_) => "monitor",
        }
    }
}

/// What a spotter can see of its owning network during a step.
pub struct SpotterContext<'a, N> {
    pub dt: f64,
    /// First global index of the owning network's nodes.
    pub node_offset: usize,
    pub links: &'a mut Vec<Box<dyn Link>>,
    pub nodes: &'a NodeList<N>,
}

pub trait NetworkSpotter<N: Node>: Send {
    fn name(&self) -> &str;

    /// Validate and apply the spotter's configuration and input data.
    ///
    /// A missing config or input, or one meant for another kind of spotter, is an
    /// initialization error.
    fn initialize(
        &mut self,
        config: Option<&SpotterConfig>,
        input: Option<&SpotterInput>,
    ) -> Result<(), NetworkError>;

    fn step_pre_solver(&mut self, ctx: &mut SpotterContext<'_, N>) -> Result<(), NetworkError>;

    fn step_post_solver(&mut self, ctx: &mut SpotterContext<'_, N>) -> Result<(), NetworkError>;
}
