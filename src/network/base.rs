use std::sync::{Arc, Mutex};

use crate::{
    lock, GroupFault, Link, NetworkError, Node, NodeList, SharedNodeList, SharedSpotter, Solver,
    SolverConfig, SpotterContext, SuperNetworkId,
};

/// Where a sub-network sits relative to a composite.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Placement {
    /// Runs on its own node list and solver.
    #[default]
    Standalone,
    /// Added to a composite that has not registered its nodes yet.
    Claimed(SuperNetworkId),
    /// Given a slice of the composite's node list starting at `offset`.
    Placed {
        offset: usize,
        owner: SuperNetworkId,
    },
}

impl Placement {
    pub fn owner(&self) -> Option<&SuperNetworkId> {
        match self {
            Placement::Standalone => None,
            Placement::Claimed(owner) | Placement::Placed { owner, .. } => Some(owner),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum SolverPhase {
    Pre,
    Post,
}

/// State shared by every [`SubNetwork`](crate::SubNetwork) implementation.
pub struct NetworkCore<N: Node> {
    name: String,
    nodes: Option<SharedNodeList<N>>,
    links: Option<Vec<Box<dyn Link>>>,
    solver: Option<Box<dyn Solver<N>>>,
    placement: Placement,
    joint_index: Option<usize>,
    node_config: Option<N::Config>,
    spotters: Vec<SharedSpotter<N>>,
    mutex: Arc<Mutex<()>>,
    mutex_enabled: bool,
    initialized: bool,
}

impl<N: Node> std::fmt::Debug for NetworkCore<N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetworkCore")
            .field("name", &self.name)
            .field("placement", &self.placement)
            .field("links", &self.links.as_ref().map(Vec::len))
            .field("joint_index", &self.joint_index)
            .field("spotters", &self.spotters.len())
            .field("initialized", &self.initialized)
            .finish()
    }
}

impl<N: Node> NetworkCore<N> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: None,
            links: None,
            solver: None,
            placement: Placement::Standalone,
            joint_index: None,
            node_config: None,
            spotters: Vec::new(),
            mutex: Arc::new(Mutex::new(())),
            mutex_enabled: false,
            initialized: false,
        }
    }

    /// Set the node configuration this network's nodes are built with.
    pub fn with_node_config(mut self, config: N::Config) -> Self {
        self.node_config = Some(config);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn placement(&self) -> &Placement {
        &self.placement
    }

    /// Whether this network is (or is about to be) folded into a composite.
    pub fn is_sub_network(&self) -> bool {
        !matches!(self.placement, Placement::Standalone)
    }

    /// Folded into a composite that has not yet assigned a node offset.
    pub fn awaiting_registration(&self) -> bool {
        matches!(self.placement, Placement::Claimed(_))
    }

    /// First index of this network's nodes in the node list it writes to.
    pub fn node_offset(&self) -> usize {
        self.placed_offset().unwrap_or(0)
    }

    /// The node offset assigned by the owning composite, if any.
    pub fn placed_offset(&self) -> Option<usize> {
        match self.placement {
            Placement::Placed { offset, .. } => Some(offset),
            _ => None,
        }
    }

    /// The composite this network belongs to.
    pub fn super_network(&self) -> Option<&SuperNetworkId> {
        self.placement.owner()
    }

    /// Record this network's position within `owner`'s combined node list.
    pub fn set_node_offset(&mut self, offset: usize, owner: SuperNetworkId) {
        log::trace!("{}: node offset {offset} in {owner}", self.name);
        self.placement = Placement::Placed { offset, owner };
    }

    /// Point this network at its composite's combined node list.
    ///
    /// Only a network claimed by a composite can share a node list; a standalone network keeps
    /// its own.
    pub(crate) fn set_node_list(&mut self, nodes: SharedNodeList<N>) {
        if !self.is_sub_network() {
            log::warn!("{}: standalone, keeping its own node list", self.name);
            return;
        }
        self.nodes = Some(nodes);
    }

    /// Mark this network as claimed by `owner`.
    ///
    /// A network already claimed by a different composite is left alone and that composite's id
    /// is returned.
    pub(crate) fn claim(&mut self, owner: &SuperNetworkId) -> Result<(), SuperNetworkId> {
        match self.placement.owner() {
            Some(current) if current != owner => Err(current.clone()),
            Some(_) => Ok(()),
            None => {
                self.placement = Placement::Claimed(owner.clone());
                Ok(())
            }
        }
    }

    /// Hand this network over to `owner`; its node offset is reassigned on `owner`'s registration.
    pub(crate) fn transfer(&mut self, owner: &SuperNetworkId) {
        self.placement = Placement::Claimed(owner.clone());
    }

    pub fn node_list(&self) -> Result<&SharedNodeList<N>, NetworkError> {
        self.nodes
            .as_ref()
            .ok_or_else(|| NetworkError::init(&self.name, "node list has not been set"))
    }

    pub fn node_config(&self) -> Option<&N::Config> {
        self.node_config.as_ref()
    }

    pub fn set_node_config(&mut self, config: Option<N::Config>) {
        self.node_config = config;
    }

    pub fn links(&self) -> Result<&[Box<dyn Link>], NetworkError> {
        self.links
            .as_deref()
            .ok_or_else(|| NetworkError::init(&self.name, "links have not been created"))
    }

    pub(crate) fn links_mut(&mut self) -> Option<&mut Vec<Box<dyn Link>>> {
        self.links.as_mut()
    }

    /// Add a link and return its index within this network.
    pub fn add_link(&mut self, link: Box<dyn Link>) -> Result<usize, NetworkError> {
        let links = self
            .links
            .as_mut()
            .ok_or_else(|| NetworkError::init(&self.name, "links have not been created"))?;
        links.push(link);
        Ok(links.len() - 1)
    }

    pub fn joint_index(&self) -> Option<usize> {
        self.joint_index
    }

    pub fn set_joint_index(&mut self, index: usize) {
        self.joint_index = Some(index);
    }

    pub fn add_spotter(&mut self, spotter: SharedSpotter<N>) {
        self.spotters.push(spotter);
    }

    pub fn spotters(&self) -> &[SharedSpotter<N>] {
        &self.spotters
    }

    pub fn solver(&self) -> Option<&dyn Solver<N>> {
        self.solver.as_deref()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub(crate) fn set_initialized(&mut self, initialized: bool) {
        self.initialized = initialized;
    }

    pub fn set_mutex_enabled(&mut self, enabled: bool) {
        self.mutex_enabled = enabled;
    }

    pub fn mutex_enabled(&self) -> bool {
        self.mutex_enabled
    }

    pub fn mutex(&self) -> Arc<Mutex<()>> {
        Arc::clone(&self.mutex)
    }

    /// Global index of local node `local`.
    pub fn global_node(&self, local: usize) -> usize {
        self.node_offset() + local
    }

    /// Global index of the boundary node of the node list this network writes to.
    pub fn ground_node(&self) -> Result<usize, NetworkError> {
        lock(self.node_list()?)
            .ground_index()
            .ok_or_else(|| NetworkError::init(&self.name, "node list is empty"))
    }

    /// The name nodes are initialized under: the owning composite's name when folded.
    pub(crate) fn scope_name(&self) -> String {
        match self.placement.owner() {
            Some(owner) => owner.name().to_owned(),
            None => self.name.clone(),
        }
    }

    /// Reset per-initialization state and make sure a node list exists.
    pub(crate) fn prepare_initialization(&mut self, num_local_nodes: usize) {
        if !self.is_sub_network() {
            let stale = self
                .nodes
                .as_ref()
                .map_or(true, |nodes| lock(nodes).len() != num_local_nodes + 1);
            if stale {
                self.nodes = Some(Arc::new(Mutex::new(NodeList::with_len(num_local_nodes + 1))));
            }
            self.solver = None;
        }
        self.links = Some(Vec::new());
        self.initialized = false;
    }

    /// Name and configure this network's `potentials.len()` local nodes, plus the boundary node
    /// when standalone.
    ///
    /// Nodes are named `{scope}.Node_{i}` with `i` their global index; the boundary node is
    /// `{scope}.GROUND`.
    pub fn init_local_nodes(&self, scope: &str, potentials: &[f64]) -> Result<(), NetworkError> {
        let offset = self.node_offset();
        let mut nodes = lock(self.node_list()?);
        let end = offset + potentials.len();
        let available = nodes.ground_index().unwrap_or(0);
        if end > available {
            return Err(NetworkError::NodeOutOfRange {
                network: self.name.clone(),
                index: end.saturating_sub(1),
                len: available,
            });
        }

        for (i, &potential) in potentials.iter().enumerate() {
            let node = &mut nodes[offset + i];
            node.initialize(&format!("{scope}.Node_{}", offset + i), potential);
            if let Some(config) = &self.node_config {
                node.configure(config);
            }
        }

        if !self.is_sub_network() {
            let ground = nodes.len() - 1;
            nodes[ground].initialize(&format!("{scope}.GROUND"), 0.0);
            if let Some(config) = &self.node_config {
                nodes[ground].configure(config);
            }
        }
        log::trace!("{}: initialized nodes [{offset}, {end})", self.name);
        Ok(())
    }

    /// Attach `solver` to this network's own nodes and links. Folded networks use their
    /// composite's solver, so nothing is attached.
    pub fn build_solver(
        &mut self,
        mut solver: Box<dyn Solver<N>>,
        config: &SolverConfig,
    ) -> Result<(), NetworkError> {
        if self.is_sub_network() {
            log::trace!("{}: folded, skipping solver", self.name);
            return Ok(());
        }
        let nodes = Arc::clone(self.node_list()?);
        solver.initialize_nodes(&lock(&nodes))?;
        let links = self
            .links
            .as_mut()
            .ok_or_else(|| NetworkError::init(&self.name, "links have not been created"))?;
        solver.initialize(config, &mut [links])?;
        self.solver = Some(solver);
        Ok(())
    }

    /// Step the network's own solver.
    pub(crate) fn step_solver(&mut self, dt: f64) -> Result<(), NetworkError> {
        let (Some(solver), Some(links), Some(nodes)) =
            (self.solver.as_mut(), self.links.as_mut(), self.nodes.as_ref())
        else {
            return Err(NetworkError::runtime(&self.name, "no solver has been built"));
        };
        match solver.step(dt, &mut [links], &mut lock(nodes))?.pop() {
            Some(GroupFault { fault, .. }) => {
                Err(NetworkError::runtime(&self.name, fault.to_string()))
            }
            None => Ok(()),
        }
    }

    pub(crate) fn step_spotters(
        &mut self,
        dt: f64,
        phase: SolverPhase,
    ) -> Result<(), NetworkError> {
        let (Some(nodes), Some(links)) = (self.nodes.as_ref(), self.links.as_mut()) else {
            return Ok(());
        };
        let node_offset = match self.placement {
            Placement::Placed { offset, .. } => offset,
            _ => 0,
        };
        let nodes = lock(nodes);
        let mut ctx = SpotterContext {
            dt,
            node_offset,
            links,
            nodes: &nodes,
        };
        for spotter in &self.spotters {
            let mut spotter = lock(spotter);
            match phase {
                SolverPhase::Pre => spotter.step_pre_solver(&mut ctx)?,
                SolverPhase::Post => spotter.step_post_solver(&mut ctx)?,
            }
        }
        Ok(())
    }

    pub(crate) fn restart_links(&mut self) {
        for link in self.links.iter_mut().flatten() {
            link.restart_model();
        }
    }
}
