use std::sync::{Arc, Mutex};

use super::*;
use crate::{BasicNode, Link, NodeList, PassThroughSolver, SolverConfig, SuperNetworkId};

struct Resistor {
    name: String,
    ports: [usize; 2],
    steps: usize,
}

impl Link for Resistor {
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
        self.steps += 1;
        Ok(())
    }

    fn restart_model(&mut self) {
        self.steps = 0;
    }
}

/// A chain of `num_nodes` nodes with one resistor across the first two.
struct Strip {
    core: NetworkCore<BasicNode>,
    num_nodes: usize,
    fail: bool,
}

impl Strip {
    fn new(name: &str, num_nodes: usize) -> Self {
        Self {
            core: NetworkCore::new(name),
            num_nodes,
            fail: false,
        }
    }
}

impl SubNetwork for Strip {
    type Node = BasicNode;

    fn core(&self) -> &NetworkCore<BasicNode> {
        &self.core
    }

    fn core_mut(&mut self) -> &mut NetworkCore<BasicNode> {
        &mut self.core
    }

    fn num_local_nodes(&self) -> usize {
        self.num_nodes
    }

    fn init_nodes(&mut self, scope: &str) -> Result<(), NetworkError> {
        let potentials: Vec<f64> = (0..self.num_nodes).map(|i| i as f64).collect();
        self.core.init_local_nodes(scope, &potentials)
    }

    fn init_network(&mut self) -> Result<(), NetworkError> {
        if self.fail {
            return Err(NetworkError::init(self.core.name(), "bad link config"));
        }
        let ports = [self.core.global_node(0), self.core.global_node(1)];
        self.core.add_link(Box::new(Resistor {
            name: format!("{}.R1", self.core.name()),
            ports,
            steps: 0,
        }))?;
        self.core.build_solver(
            Box::new(PassThroughSolver::default()),
            &SolverConfig::default(),
        )
    }
}

fn node_names(network: &Strip) -> Vec<String> {
    let nodes = network.core().node_list().unwrap();
    let nodes = lock(nodes);
    nodes.iter().map(|node| node.name().to_owned()).collect()
}

#[test_log::test]
fn test_standalone_initialize() {
    let mut network = Strip::new("A", 3);
    network.initialize();

    assert!(network.core().is_initialized());
    assert_eq!(
        node_names(&network),
        ["A.Node_0", "A.Node_1", "A.Node_2", "A.GROUND"]
    );
    let links = network.core().links().unwrap();
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].node_map(), &[0, 1]);
    assert!(network.core().solver().is_some());
}

#[test_log::test]
fn test_links_before_initialize() {
    let network = Strip::new("A", 3);
    assert!(matches!(
        network.core().links(),
        Err(NetworkError::Initialization { .. })
    ));
}

#[test_log::test]
fn test_failed_initialize_is_retryable() {
    let mut network = Strip::new("A", 2);
    network.fail = true;
    network.initialize();
    assert!(!network.core().is_initialized());

    network.fail = false;
    network.initialize();
    assert!(network.core().is_initialized());
    assert_eq!(network.core().links().unwrap().len(), 1);
}

#[test_log::test]
fn test_initialize_waits_for_registration() {
    let owner = SuperNetworkId::new("S");
    let mut network = Strip::new("A", 2);
    network.core_mut().claim(&owner).unwrap();

    network.initialize();
    assert!(network.core().awaiting_registration());
    assert!(!network.core().is_initialized());
    assert!(network.core().node_list().is_err());
}

#[test_log::test]
fn test_claim_refuses_second_owner() {
    let first = SuperNetworkId::new("S");
    let second = SuperNetworkId::new("T");
    let mut network = Strip::new("A", 2);

    network.core_mut().claim(&first).unwrap();
    assert_eq!(network.core_mut().claim(&second), Err(first.clone()));
    assert_eq!(network.core().super_network(), Some(&first));

    network.core_mut().transfer(&second);
    assert_eq!(network.core().super_network(), Some(&second));
}

#[test_log::test]
fn test_folded_network_uses_scope_and_offset() {
    let owner = SuperNetworkId::new("S");
    let nodes = Arc::new(Mutex::new(NodeList::<BasicNode>::with_len(6)));
    let mut network = Strip::new("B", 2);
    network.core_mut().claim(&owner).unwrap();
    network.core_mut().set_node_offset(3, owner);
    network.core_mut().set_node_list(Arc::clone(&nodes));

    network.initialize();
    assert!(network.core().is_initialized());
    assert!(network.core().solver().is_none());
    assert_eq!(network.core().links().unwrap()[0].node_map(), &[3, 4]);

    let nodes = lock(&nodes);
    assert_eq!(nodes[3].name(), "S.Node_3");
    assert_eq!(nodes[4].name(), "S.Node_4");
    assert_eq!(nodes[5].name(), "");
}

#[test_log::test]
fn test_folded_network_ignores_update() {
    let owner = SuperNetworkId::new("S");
    let mut network = Strip::new("A", 2);
    network.core_mut().claim(&owner).unwrap();
    network.core_mut().set_node_offset(0, owner);
    network
        .core_mut()
        .set_node_list(Arc::new(Mutex::new(NodeList::with_len(3))));
    network.initialize();

    network.update(0.1);
    network.restart();
    assert!(network.core().solver().is_none());
}

#[test_log::test]
fn test_update_steps_solver() {
    let mut network = Strip::new("A", 2);
    network.update(0.1);
    assert!(network.core().solver().is_none());

    network.initialize();
    network.update(0.1);
    network.update(0.1);
    let solver = network.core().solver().unwrap();
    assert_eq!(solver.major_step_count(), 2);
    assert_eq!(solver.potential_vector(), &[0.0, 1.0, 0.0]);
}

#[test_log::test]
fn test_update_releases_mutex() {
    let mut network = Strip::new("A", 2);
    network.core_mut().set_mutex_enabled(true);
    let mutex = network.core().mutex();

    // Not initialized yet: early return.
    network.update(0.1);
    assert!(mutex.try_lock().is_ok());

    network.initialize();
    network.update(0.1);
    assert!(mutex.try_lock().is_ok());
}

#[test_log::test]
fn test_init_local_nodes_out_of_range() {
    let mut network = Strip::new("A", 2);
    network.core_mut().prepare_initialization(2);
    assert!(matches!(
        network.core().init_local_nodes("A", &[0.0; 3]),
        Err(NetworkError::NodeOutOfRange { .. })
    ));
}

#[test_log::test]
fn test_standalone_keeps_own_node_list() {
    let shared = Arc::new(Mutex::new(NodeList::<BasicNode>::with_len(3)));
    let mut network = Strip::new("A", 2);
    network.core_mut().set_node_list(Arc::clone(&shared));
    assert!(!network.core().is_sub_network());

    network.initialize();
    let own = network.core().node_list().unwrap();
    assert!(!Arc::ptr_eq(own, &shared));
    assert_eq!(lock(own)[0].name(), "A.Node_0");
    assert_eq!(lock(&shared)[0].name(), "");
}
