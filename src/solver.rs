use crate::{isolate, Fault, Link, NetworkError, Node, NodeList};

/// Configuration handed to a [`Solver`] when it is attached to a network.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct SolverConfig {
    pub name: String,
    /// Convergence tolerance on node potentials.
    pub tolerance: f64,
    /// Upper bound on minor steps per major step.
    pub max_minor_steps: u32,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            name: String::from("solver"),
            tolerance: 1.0e-6,
            max_minor_steps: 10,
        }
    }
}

/// A link group that faulted during [`Solver::step`]. The rest of that group was skipped for the
/// step; other groups were still stepped.
#[derive(Debug)]
pub struct GroupFault {
    /// Position of the group in the groups handed to the solver.
    pub group: usize,
    pub fault: Fault,
}

/// The network solver.
///
/// Links are presented as groups, one per network that owns them, in the same order as the
/// networks were registered.
pub trait Solver<N: Node>: Send {
    /// Attach the solver to the node list it will solve for.
    fn initialize_nodes(&mut self, nodes: &NodeList<N>) -> Result<(), NetworkError>;

    /// Attach the solver to the links it will step.
    fn initialize(
        &mut self,
        config: &SolverConfig,
        links: &mut [&mut Vec<Box<dyn Link>>],
    ) -> Result<(), NetworkError>;

    /// Perform a single major step.
    ///
    /// A link that fails or panics only stops its own group. Such faults are returned, and an
    /// `Err` is kept for failures of the solver itself.
    fn step(
        &mut self,
        dt: f64,
        links: &mut [&mut Vec<Box<dyn Link>>],
        nodes: &mut NodeList<N>,
    ) -> Result<Vec<GroupFault>, NetworkError>;

    /// Node potentials as of the last step.
    fn potential_vector(&self) -> &[f64];

    fn major_step_count(&self) -> u64;
}

/// A solver that steps every link and tracks node potentials, without building a system of
/// equations.
#[derive(Debug, Default)]
pub struct PassThroughSolver {
    name: String,
    num_nodes: usize,
    potentials: Vec<f64>,
    major_steps: u64,
}

impl<N: Node> Solver<N> for PassThroughSolver {
    fn initialize_nodes(&mut self, nodes: &NodeList<N>) -> Result<(), NetworkError> {
        self.num_nodes = nodes.len();
        self.potentials = nodes.potentials();
        Ok(())
    }

    fn initialize(
        &mut self,
        config: &SolverConfig,
        links: &mut [&mut Vec<Box<dyn Link>>],
    ) -> Result<(), NetworkError> {
        self.name = config.name.clone();
        for link in links.iter().flat_map(|group| group.iter()) {
            if let Some(&node) = link.node_map().iter().find(|&&n| n >= self.num_nodes) {
                return Err(NetworkError::NodeOutOfRange {
                    network: format!("{}/{}", self.name, link.name()),
                    index: node,
                    len: self.num_nodes,
                });
            }
        }
        self.major_steps = 0;
        log::debug!(
            "{}: attached to {} nodes and {} links",
            self.name,
            self.num_nodes,
            links.iter().map(|group| group.len()).sum::<usize>()
        );
        Ok(())
    }

    fn step(
        &mut self,
        dt: f64,
        links: &mut [&mut Vec<Box<dyn Link>>],
        nodes: &mut NodeList<N>,
    ) -> Result<Vec<GroupFault>, NetworkError> {
        let mut faults = Vec::new();
        for (group, links) in links.iter_mut().enumerate() {
            if let Err(fault) = isolate(|| links.iter_mut().try_for_each(|link| link.step(dt))) {
                faults.push(GroupFault { group, fault });
            }
        }
        self.potentials = nodes.potentials();
        self.major_steps += 1;
        Ok(faults)
    }

    fn potential_vector(&self) -> &[f64] {
        &self.potentials
    }

    fn major_step_count(&self) -> u64 {
        self.major_steps
    }
}
