//! Composites of sub-networks over one combined node list.

mod flavor;
mod joints;

use std::{
    fmt,
    hash::{Hash, Hasher},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, MutexGuard,
    },
};

pub use flavor::{BasicFlavor, JointNetwork, NetworkFlavor};
pub use joints::{JointPlan, JointRecord, JointRegistry};

use crate::{
    isolate, lock, network::SolverPhase, GroupFault, Link, NetworkError, Node, NodeList,
    PassThroughSolver, SharedConnector, SharedNodeList, SharedSubNetwork, Solver, SolverConfig,
    SubNetwork,
};

/// A [`SuperNetwork`] over [`BasicNode`](crate::BasicNode)s.
pub type BasicSuperNetwork = SuperNetwork<BasicFlavor>;

static NEXT_ID: AtomicU64 = AtomicU64::new(0);

/// Non-owning handle a member holds on the composite it has been folded into.
///
/// Two ids are equal only if they were handed out by the same composite.
#[derive(Clone, Debug)]
pub struct SuperNetworkId {
    id: u64,
    name: Arc<str>,
}

impl SuperNetworkId {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            name: Arc::from(name),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl PartialEq for SuperNetworkId {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for SuperNetworkId {}

impl Hash for SuperNetworkId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for SuperNetworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.name, self.id)
    }
}

enum Registration<N> {
    /// Members may still be added.
    Composing,
    /// The combined node list is frozen.
    Registered { nodes: SharedNodeList<N> },
    /// The flavor rejected the members' node configurations. The node list is frozen but left
    /// unbuilt, and the composite never runs.
    Rejected { nodes: SharedNodeList<N> },
}

/// A composite owning zero or more sub-networks over one combined node list and solver.
///
/// Members are added while composing, then [`register_super_nodes`](Self::register_super_nodes)
/// freezes the combined node list: each member gets a contiguous slice of it, in insertion order,
/// and the last node is the shared boundary node. From then on the composite drives its members
/// through `initialize`, `restart` and `update`, containing any member failure.
///
/// The flavor `F` decides the node type, how members' node configurations are reconciled and
/// what a joint network looks like.
pub struct SuperNetwork<F: NetworkFlavor> {
    id: SuperNetworkId,
    flavor: F,
    subnets: Vec<SharedSubNetwork<F::Node>>,
    registration: Registration<F::Node>,
    solver: Box<dyn Solver<F::Node>>,
    solver_config: SolverConfig,
    solver_ready: bool,
    joints: JointRegistry<F::Node>,
    mutex: Arc<Mutex<()>>,
    mutex_enabled: bool,
}

impl<F: NetworkFlavor> fmt::Debug for SuperNetwork<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SuperNetwork")
            .field("id", &self.id)
            .field("subnets", &self.subnets.len())
            .field("registered", &self.is_registered())
            .field("joints", &self.joints.len())
            .field("mutex_enabled", &self.mutex_enabled)
            .finish()
    }
}

impl<F: NetworkFlavor> SuperNetwork<F> {
    /// Create an empty composite stepped by a [`PassThroughSolver`].
    pub fn new(name: &str, flavor: F) -> Self {
        Self {
            id: SuperNetworkId::new(name),
            flavor,
            subnets: Vec::new(),
            registration: Registration::Composing,
            solver: Box::new(PassThroughSolver::default()),
            solver_config: SolverConfig {
                name: format!("{name}.solver"),
                ..Default::default()
            },
            solver_ready: false,
            joints: JointRegistry::default(),
            mutex: Arc::new(Mutex::new(())),
            mutex_enabled: false,
        }
    }

    /// Replace the shared solver and its configuration.
    pub fn with_solver(
        mut self,
        solver: impl Solver<F::Node> + 'static,
        config: SolverConfig,
    ) -> Self {
        self.solver = Box::new(solver);
        self.solver_config = config;
        self
    }

    pub fn name(&self) -> &str {
        self.id.name()
    }

    pub fn id(&self) -> &SuperNetworkId {
        &self.id
    }

    /// The members, in registration order.
    pub fn subnets(&self) -> &[SharedSubNetwork<F::Node>] {
        &self.subnets
    }

    /// Whether [`register_super_nodes`](Self::register_super_nodes) has run, whatever its
    /// outcome.
    pub fn is_registered(&self) -> bool {
        !matches!(self.registration, Registration::Composing)
    }

    /// Whether registration found the members' node configurations incompatible. A rejected
    /// composite ignores `initialize`, `restart` and `update`.
    pub fn is_rejected(&self) -> bool {
        matches!(self.registration, Registration::Rejected { .. })
    }

    /// The combined node list, once registered.
    pub fn node_list(&self) -> Option<&SharedNodeList<F::Node>> {
        match &self.registration {
            Registration::Composing => None,
            Registration::Registered { nodes } | Registration::Rejected { nodes } => Some(nodes),
        }
    }

    /// The combined node list of a composite that may run.
    fn runnable_nodes(&self, operation: &str) -> Option<SharedNodeList<F::Node>> {
        match &self.registration {
            Registration::Registered { nodes } => Some(Arc::clone(nodes)),
            Registration::Composing => {
                log::debug!("{}: nodes not registered, skipping {operation}", self.name());
                None
            }
            Registration::Rejected { .. } => {
                log::debug!("{}: node configuration rejected, skipping {operation}", self.name());
                None
            }
        }
    }

    /// Number of nodes in the combined node list, boundary node included. Zero until registered.
    pub fn num_nodes(&self) -> usize {
        self.node_list().map_or(0, |nodes| lock(nodes).len())
    }

    /// Number of links across all members.
    pub fn num_links(&self) -> usize {
        self.subnets
            .iter()
            .map(|net| lock(net).core().links().map_or(0, |links| links.len()))
            .sum()
    }

    pub fn joints(&self) -> &JointRegistry<F::Node> {
        &self.joints
    }

    pub fn flavor(&self) -> &F {
        &self.flavor
    }

    pub fn flavor_mut(&mut self) -> &mut F {
        &mut self.flavor
    }

    pub fn solver(&self) -> &dyn Solver<F::Node> {
        self.solver.as_ref()
    }

    pub fn set_mutex_enabled(&mut self, enabled: bool) {
        self.mutex_enabled = enabled;
    }

    pub fn mutex_enabled(&self) -> bool {
        self.mutex_enabled
    }

    /// The mutex guarding [`update`](Self::update), [`join_locations`](Self::join_locations) and
    /// [`joint_index`](Self::joint_index) while enabled.
    pub fn mutex(&self) -> Arc<Mutex<()>> {
        Arc::clone(&self.mutex)
    }

    fn contains(&self, network: &SharedSubNetwork<F::Node>) -> bool {
        self.subnets.iter().any(|net| Arc::ptr_eq(net, network))
    }

    /// Add a member.
    ///
    /// `None`, a member already present, a member claimed by another composite and any add after
    /// registration are ignored.
    pub fn add_sub_network(&mut self, network: impl Into<Option<SharedSubNetwork<F::Node>>>) {
        let Some(network) = network.into() else {
            log::debug!("{}: ignoring empty sub-network", self.name());
            return;
        };
        if self.is_registered() {
            log::warn!(
                "{}: nodes are registered, ignoring sub-network {}",
                self.name(),
                lock(&network).name()
            );
            return;
        }
        if self.contains(&network) {
            log::debug!(
                "{}: {} is already a member",
                self.name(),
                lock(&network).name()
            );
            return;
        }

        let mut net = lock(&network);
        if let Err(owner) = net.core_mut().claim(&self.id) {
            log::warn!(
                "{}: {} already belongs to {owner}, not adding it",
                self.name(),
                net.name()
            );
            return;
        }
        log::trace!("{}: added {}", self.name(), net.name());
        drop(net);
        self.subnets.push(network);
    }

    /// Flatten `child` into this composite: its members move over, in order, and `child` is left
    /// empty.
    pub fn adopt<G>(&mut self, child: &mut SuperNetwork<G>)
    where
        G: NetworkFlavor<Node = F::Node>,
    {
        if self.is_registered() {
            log::warn!(
                "{}: nodes are registered, not adopting {}",
                self.name(),
                child.name()
            );
            return;
        }
        let count = child.subnets.len();
        for network in child.subnets.drain(..) {
            if self.contains(&network) {
                continue;
            }
            lock(&network).core_mut().transfer(&self.id);
            self.subnets.push(network);
        }
        log::debug!(
            "{}: adopted {count} members of {}",
            self.name(),
            child.name()
        );
    }

    /// Freeze the combined node list and give every member its slice of it.
    ///
    /// Only the first call has any effect. If the flavor rejects the members' node
    /// configurations the nodes are left unnamed, including the boundary node, and the composite
    /// is marked rejected: members are still placed but never run.
    pub fn register_super_nodes(&mut self) {
        if self.is_registered() {
            log::debug!("{}: nodes already registered", self.name());
            return;
        }

        let mut num_nodes = 1;
        let mut configs = Vec::with_capacity(self.subnets.len());
        for network in &self.subnets {
            let net = lock(network);
            num_nodes += net.num_local_nodes();
            configs.push((net.name().to_owned(), net.core().node_config().cloned()));
        }

        let mut list = NodeList::<F::Node>::with_len(num_nodes);
        let accepted = match self.flavor.common_config(self.name(), &configs) {
            Ok(config) => {
                let ground = num_nodes - 1;
                for (i, node) in list.as_mut_slice().iter_mut().enumerate() {
                    let name = if i == ground {
                        format!("{}.GROUND", self.name())
                    } else {
                        format!("{}.Node_{i}", self.name())
                    };
                    node.initialize(&name, 0.0);
                    if let Some(config) = &config {
                        node.configure(config);
                    }
                }
                true
            }
            Err(err) => {
                log::error!("{}: not building nodes: {err}", self.name());
                false
            }
        };

        let nodes = Arc::new(Mutex::new(list));
        let mut offset = 0;
        for network in &self.subnets {
            let mut net = lock(network);
            let core = net.core_mut();
            core.set_node_offset(offset, self.id.clone());
            core.set_node_list(Arc::clone(&nodes));
            offset += net.num_local_nodes();
        }
        self.registration = if accepted {
            Registration::Registered { nodes }
        } else {
            Registration::Rejected { nodes }
        };
        log::info!(
            "{}: registered {num_nodes} nodes across {} members",
            self.name(),
            self.subnets.len()
        );
    }

    /// Initialize every member, then attach the shared solver.
    ///
    /// Does nothing before registration or without members. A failing member is reported and
    /// does not keep its siblings from initializing.
    pub fn initialize(&mut self) {
        let Some(nodes) = self.runnable_nodes("initialize") else {
            return;
        };
        if self.subnets.is_empty() {
            log::debug!("{}: no members to initialize", self.name());
            return;
        }

        for network in &self.subnets {
            if let Err(fault) = isolate(|| {
                lock(network).initialize();
                Ok(())
            }) {
                fault.report(self.id.name(), "initialize");
            }
        }

        self.solver_ready = false;
        let mut members: Vec<_> = self.subnets.iter().map(|net| lock(net)).collect();
        let (_, mut links) = link_groups(&mut members);
        let num_links = links.iter().map(|group| group.len()).sum::<usize>();
        let solver = &mut self.solver;
        let config = &self.solver_config;
        match isolate(|| {
            solver.initialize_nodes(&lock(&nodes))?;
            solver.initialize(config, &mut links)
        }) {
            Ok(()) => {
                self.solver_ready = true;
                log::info!(
                    "{}: initialized {} members, {num_links} links",
                    self.id.name(),
                    self.subnets.len()
                );
            }
            Err(fault) => fault.report(self.id.name(), "initialize"),
        }
    }

    /// Restart every member's model after a checkpoint load.
    pub fn restart(&mut self) {
        if self.runnable_nodes("restart").is_none() {
            return;
        }
        for network in &self.subnets {
            if let Err(fault) = isolate(|| lock(network).restart_model()) {
                fault.report(self.id.name(), "restart");
            }
        }
    }

    /// Advance every member and the shared solver by one frame.
    pub fn update(&mut self, dt: f64) {
        let mutex = Arc::clone(&self.mutex);
        let _guard = self.mutex_enabled.then(|| lock(&mutex));

        let Some(nodes) = self.runnable_nodes("update") else {
            return;
        };
        if !self.solver_ready {
            log::debug!("{}: not initialized, skipping update", self.name());
            return;
        }

        self.step_members(dt, SolverPhase::Pre);

        let mut members: Vec<_> = self.subnets.iter().map(|net| lock(net)).collect();
        let (owners, mut links) = link_groups(&mut members);
        let solver = &mut self.solver;
        match isolate(|| solver.step(dt, &mut links, &mut lock(&nodes))) {
            Ok(faults) => {
                for GroupFault { group, fault } in faults {
                    let owner = owners.get(group).map_or(self.id.name(), String::as_str);
                    fault.report(owner, "update");
                }
            }
            Err(fault) => fault.report(self.id.name(), "update"),
        }
        drop(links);
        drop(members);

        self.step_members(dt, SolverPhase::Post);
    }

    fn step_members(&self, dt: f64, phase: SolverPhase) {
        for network in &self.subnets {
            if let Err(fault) = isolate(|| {
                let mut net = lock(network);
                if !net.core().is_initialized() {
                    return Ok(());
                }
                match phase {
                    SolverPhase::Pre => net.step_pre_solver(dt),
                    SolverPhase::Post => net.step_post_solver(dt),
                }
            }) {
                fault.report(lock(network).name(), "update");
            }
        }
    }

    /// Join two connector locations through a joint network.
    ///
    /// If one of them already belongs to a joint the other is attached to that joint; otherwise
    /// the flavor creates a new joint network, which becomes a member of this composite. Once
    /// the nodes are registered no joint network can be added, and the call fails with
    /// [`NetworkError::JoinAfterRegistration`].
    pub fn join_locations(
        &mut self,
        first: &SharedConnector<F::Node>,
        second: &SharedConnector<F::Node>,
    ) -> Result<(), NetworkError> {
        let mutex = Arc::clone(&self.mutex);
        let _guard = self.mutex_enabled.then(|| lock(&mutex));

        let (first_name, first_type) = {
            let conn = lock(first);
            (conn.name().to_owned(), conn.joint_type())
        };
        if self.is_registered() {
            log::warn!(
                "{}: nodes are registered, not joining {first_name}",
                self.name()
            );
            return Err(NetworkError::JoinAfterRegistration {
                network: self.name().to_owned(),
                location: first_name,
            });
        }
        if Arc::ptr_eq(first, second) {
            return Err(NetworkError::AlreadyJoined {
                second: first_name.clone(),
                first: first_name,
            });
        }
        let (second_name, second_type) = {
            let conn = lock(second);
            (conn.name().to_owned(), conn.joint_type())
        };
        if first_type != second_type {
            return Err(NetworkError::JointTypeMismatch {
                first: first_name,
                first_type,
                second: second_name,
                second_type,
            });
        }

        match (self.joints.find(first), self.joints.find(second)) {
            (Some(_), Some(_)) => Err(NetworkError::AlreadyJoined {
                first: first_name,
                second: second_name,
            }),
            (Some(joint), None) => {
                self.joints.attach(joint, second);
                log::debug!("{}: attached {second_name} to joint {joint}", self.name());
                Ok(())
            }
            (None, Some(joint)) => {
                self.joints.attach(joint, first);
                log::debug!("{}: attached {first_name} to joint {joint}", self.name());
                Ok(())
            }
            (None, None) => {
                let joint = self.joints.len();
                let name = format!("{}.Joint_{joint}", self.name());
                let network = self.flavor.create_joint_network(&name, first_type)?;
                lock(&network).core_mut().set_joint_index(joint);
                self.joints.push(JointRecord::new(
                    Arc::clone(&network),
                    vec![Arc::clone(first), Arc::clone(second)],
                ));
                self.add_sub_network(network);
                log::info!(
                    "{}: joined {first_name} and {second_name} through {name}",
                    self.name()
                );
                Ok(())
            }
        }
    }

    /// Join every location pair the flavor has planned.
    ///
    /// Every pair is tried. A pair that cannot be joined is logged and skipped, and the first
    /// such error is returned once the plan has been worked through.
    pub fn register_joints(&mut self) -> Result<(), NetworkError> {
        let mut first_err = None;
        for (first, second) in self.flavor.register_joints() {
            if let Err(err) = self.join_locations(&first, &second) {
                log::error!("{}: planned joint skipped: {err}", self.name());
                first_err.get_or_insert(err);
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    /// Index of the joint that the connector location `name` belongs to.
    ///
    /// The first lookup for a name resolves it through the connector; later ones are served from
    /// a memo.
    pub fn joint_index(&mut self, name: &str) -> Result<usize, NetworkError> {
        let mutex = Arc::clone(&self.mutex);
        let _guard = self.mutex_enabled.then(|| lock(&mutex));
        self.joints.resolve(name)
    }
}

/// Each member's link group, with the name of the member that owns it. Members without links
/// have no group.
fn link_groups<'a, N: Node>(
    members: &'a mut [MutexGuard<'_, dyn SubNetwork<Node = N> + 'static>],
) -> (Vec<String>, Vec<&'a mut Vec<Box<dyn Link>>>) {
    let mut owners = Vec::with_capacity(members.len());
    let mut links = Vec::with_capacity(members.len());
    for net in members.iter_mut() {
        let name = net.name().to_owned();
        if let Some(group) = net.core_mut().links_mut() {
            owners.push(name);
            links.push(group);
        }
    }
    (owners, links)
}
