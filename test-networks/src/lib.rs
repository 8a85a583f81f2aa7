//! Sub-networks for exercising composites in tests.
//!
//! [`TestNetwork`] is a strip of nodes with a single link across its first two nodes and a
//! connector on that link's second port. Its [`Tally`] counts what the network went through and
//! injects faults into its hooks.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

use gunns::{
    fluid::{FluidConfig, FluidNode},
    lock, shared, BasicNode, Connector, ConnectorConfig, ConnectorInput, JointType, Link,
    MonitorConfig, MonitorInput, NetworkCore, NetworkError, NetworkSpotter, Node,
    PassThroughSolver, PotentialMonitor, SharedConnector, SharedSubNetwork, SolverConfig,
    SpotterConfig, SpotterInput, SubNetwork,
};

/// How a hook misbehaves.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FaultMode {
    #[default]
    None,
    /// Return an error.
    Error,
    /// Panic.
    Panic,
}

#[derive(Debug, Default)]
struct TallyState {
    init_attempts: AtomicUsize,
    initialized: AtomicUsize,
    link_steps: AtomicUsize,
    restarts: AtomicUsize,
    init_fault: Mutex<FaultMode>,
    step_fault: Mutex<FaultMode>,
}

/// Counters and fault switches shared with a [`TestNetwork`] after it has been handed off.
#[derive(Clone, Debug, Default)]
pub struct Tally {
    state: Arc<TallyState>,
}

impl Tally {
    /// Number of times node initialization started.
    pub fn init_attempts(&self) -> usize {
        self.state.init_attempts.load(Ordering::SeqCst)
    }

    /// Number of times network initialization completed.
    pub fn initialized(&self) -> usize {
        self.state.initialized.load(Ordering::SeqCst)
    }

    pub fn link_steps(&self) -> usize {
        self.state.link_steps.load(Ordering::SeqCst)
    }

    pub fn restarts(&self) -> usize {
        self.state.restarts.load(Ordering::SeqCst)
    }

    /// Make network initialization fail.
    pub fn set_init_fault(&self, mode: FaultMode) {
        *lock(&self.state.init_fault) = mode;
    }

    /// Make the network's link fail when stepped.
    pub fn set_step_fault(&self, mode: FaultMode) {
        *lock(&self.state.step_fault) = mode;
    }

    fn init_fault(&self) -> FaultMode {
        *lock(&self.state.init_fault)
    }

    fn step_fault(&self) -> FaultMode {
        *lock(&self.state.step_fault)
    }
}

/// A two-port link that counts its steps.
#[derive(Debug)]
pub struct TestLink {
    name: String,
    ports: [usize; 2],
    tally: Tally,
}

impl TestLink {
    pub fn new(name: impl Into<String>, ports: [usize; 2], tally: Tally) -> Self {
        Self {
            name: name.into(),
            ports,
            tally,
        }
    }
}

impl Link for TestLink {
    fn name(&self) -> &str {
        &self.name
    }

    fn node_map(&self) -> &[usize] {
        &self.ports
    }

    fn set_port(&mut self, port: usize, node: usize) -> Result<(), NetworkError> {
        let slot = self
            .ports
            .get_mut(port)
            .ok_or_else(|| NetworkError::PortOutOfRange {
                link: self.name.clone(),
                port,
            })?;
        *slot = node;
        Ok(())
    }

    fn step(&mut self, _dt: f64) -> Result<(), NetworkError> {
        match self.tally.step_fault() {
            FaultMode::None => {}
            FaultMode::Error => return Err(NetworkError::runtime(&self.name, "injected error")),
            FaultMode::Panic => panic!("{}: injected panic", self.name),
        }
        self.tally.state.link_steps.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn restart_model(&mut self) {
        self.tally.state.restarts.fetch_add(1, Ordering::SeqCst);
    }
}

/// A strip of nodes with potentials `1, 2, ..`, a [`TestLink`] across its first two nodes and a
/// connector binding the link's second port to a joint node.
pub struct TestNetwork<N: Node = BasicNode> {
    core: NetworkCore<N>,
    num_nodes: usize,
    connector: SharedConnector<N>,
    monitor: Option<(usize, Arc<Mutex<PotentialMonitor>>)>,
    tally: Tally,
}

impl<N: Node> TestNetwork<N> {
    pub fn new(name: &str, num_nodes: usize) -> Self {
        Self::with_joint_type(name, num_nodes, JointType(1))
    }

    pub fn with_joint_type(name: &str, num_nodes: usize, joint_type: JointType) -> Self {
        let connector = Connector::shared(format!("{name}.conn"), name, joint_type);
        let mut core = NetworkCore::new(name);
        core.add_spotter(connector.clone());
        Self {
            core,
            num_nodes,
            connector,
            monitor: None,
            tally: Tally::default(),
        }
    }

    pub fn with_node_config(mut self, config: N::Config) -> Self {
        self.core.set_node_config(Some(config));
        self
    }

    /// Sample the potential of local `node` after every solver step.
    pub fn with_monitor(mut self, node: usize) -> Self {
        let monitor = Arc::new(Mutex::new(PotentialMonitor::new(format!(
            "{}.monitor",
            self.core.name()
        ))));
        self.core.add_spotter(monitor.clone());
        self.monitor = Some((node, monitor));
        self
    }

    pub fn with_mutex(mut self) -> Self {
        self.core.set_mutex_enabled(true);
        self
    }

    pub fn tally(&self) -> Tally {
        self.tally.clone()
    }

    pub fn connector(&self) -> SharedConnector<N> {
        self.connector.clone()
    }

    pub fn monitor(&self) -> Option<Arc<Mutex<PotentialMonitor>>> {
        self.monitor.as_ref().map(|(_, monitor)| monitor.clone())
    }

    pub fn into_shared(self) -> SharedSubNetwork<N> {
        shared(self)
    }
}

impl<N: Node> SubNetwork for TestNetwork<N> {
    type Node = N;

    fn core(&self) -> &NetworkCore<N> {
        &self.core
    }

    fn core_mut(&mut self) -> &mut NetworkCore<N> {
        &mut self.core
    }

    fn num_local_nodes(&self) -> usize {
        self.num_nodes
    }

    fn init_nodes(&mut self, scope: &str) -> Result<(), NetworkError> {
        self.tally
            .state
            .init_attempts
            .fetch_add(1, Ordering::SeqCst);
        let potentials: Vec<f64> = (1..=self.num_nodes).map(|i| i as f64).collect();
        self.core.init_local_nodes(scope, &potentials)
    }

    fn init_network(&mut self) -> Result<(), NetworkError> {
        match self.tally.init_fault() {
            FaultMode::None => {}
            FaultMode::Error => {
                return Err(NetworkError::init(self.core.name(), "injected error"));
            }
            FaultMode::Panic => panic!("{}: injected panic", self.core.name()),
        }
        if self.num_nodes < 2 {
            return Err(NetworkError::init(
                self.core.name(),
                "needs at least two nodes",
            ));
        }

        let ports = [self.core.global_node(0), self.core.global_node(1)];
        let link = self.core.add_link(Box::new(TestLink::new(
            format!("{}.link", self.core.name()),
            ports,
            self.tally.clone(),
        )))?;
        lock(&self.connector).initialize(
            Some(&SpotterConfig::Connector(ConnectorConfig::default())),
            Some(&SpotterInput::Connector(ConnectorInput {
                link,
                port: 1,
                node: 0,
            })),
        )?;
        if let Some((node, monitor)) = &self.monitor {
            NetworkSpotter::<N>::initialize(
                &mut *lock(monitor),
                Some(&SpotterConfig::Monitor(MonitorConfig {
                    name: String::new(),
                    node: *node,
                })),
                Some(&SpotterInput::Monitor(MonitorInput { active: true })),
            )?;
        }

        let config = SolverConfig {
            name: format!("{}.solver", self.core.name()),
            ..Default::default()
        };
        self.core
            .build_solver(Box::new(PassThroughSolver::default()), &config)?;
        self.tally.state.initialized.fetch_add(1, Ordering::SeqCst);
        log::debug!("{}: test network built", self.core.name());
        Ok(())
    }
}

/// A [`TestNetwork`] of fluid nodes built with `config`.
pub fn fluid_loop(name: &str, num_nodes: usize, config: FluidConfig) -> TestNetwork<FluidNode> {
    TestNetwork::new(name, num_nodes).with_node_config(config)
}
