use super::JointPlan;
use crate::{
    shared, BasicNode, JointType, NetworkCore, NetworkError, Node, PassThroughSolver,
    SharedConnector, SharedSubNetwork, SolverConfig, SubNetwork,
};

/// What distinguishes one kind of composite from another.
pub trait NetworkFlavor: Send + 'static {
    type Node: Node;

    /// Reconcile the members' node configurations into the one the combined nodes are built
    /// with. `configs` pairs each member's name with its configuration, in registration order.
    ///
    /// An error leaves the combined nodes unbuilt.
    fn common_config(
        &self,
        network: &str,
        configs: &[(String, Option<<Self::Node as Node>::Config>)],
    ) -> Result<Option<<Self::Node as Node>::Config>, NetworkError>;

    /// Build the network that joins locations of `joint_type`. It must own exactly one node.
    fn create_joint_network(
        &mut self,
        name: &str,
        joint_type: JointType,
    ) -> Result<SharedSubNetwork<Self::Node>, NetworkError>;

    /// Location pairs to join when the composite registers its joints.
    fn register_joints(
        &mut self,
    ) -> Vec<(SharedConnector<Self::Node>, SharedConnector<Self::Node>)> {
        Vec::new()
    }
}

/// A one-node network with no links that stands in for the junction of joined locations.
#[derive(Debug)]
pub struct JointNetwork<N: Node> {
    core: NetworkCore<N>,
    joint_type: JointType,
}

impl<N: Node> JointNetwork<N> {
    pub fn new(name: &str, joint_type: JointType, node_config: Option<N::Config>) -> Self {
        let mut core = NetworkCore::new(name);
        core.set_node_config(node_config);
        Self { core, joint_type }
    }

    pub fn joint_type(&self) -> JointType {
        self.joint_type
    }
}

impl<N: Node> SubNetwork for JointNetwork<N> {
    type Node = N;

    fn core(&self) -> &NetworkCore<N> {
        &self.core
    }

    fn core_mut(&mut self) -> &mut NetworkCore<N> {
        &mut self.core
    }

    fn num_local_nodes(&self) -> usize {
        1
    }

    fn init_nodes(&mut self, scope: &str) -> Result<(), NetworkError> {
        self.core.init_local_nodes(scope, &[0.0])
    }

    fn init_network(&mut self) -> Result<(), NetworkError> {
        let config = SolverConfig {
            name: format!("{}.solver", self.core.name()),
            ..Default::default()
        };
        self.core
            .build_solver(Box::new(PassThroughSolver::default()), &config)
    }
}

/// The flavor for networks of [`BasicNode`]s, which carry no node configuration.
#[derive(Debug, Default)]
pub struct BasicFlavor {
    plan: JointPlan<BasicNode>,
}

impl BasicFlavor {
    /// Plan a joint between two locations, made on the next
    /// [`register_joints`](crate::SuperNetwork::register_joints).
    pub fn join(
        &mut self,
        first: &SharedConnector<BasicNode>,
        second: &SharedConnector<BasicNode>,
    ) {
        self.plan.push(first, second);
    }

    pub fn plan(&self) -> &JointPlan<BasicNode> {
        &self.plan
    }
}

impl NetworkFlavor for BasicFlavor {
    type Node = BasicNode;

    fn common_config(
        &self,
        _network: &str,
        _configs: &[(String, Option<()>)],
    ) -> Result<Option<()>, NetworkError> {
        Ok(None)
    }

    fn create_joint_network(
        &mut self,
        name: &str,
        joint_type: JointType,
    ) -> Result<SharedSubNetwork<BasicNode>, NetworkError> {
        Ok(shared(JointNetwork::<BasicNode>::new(name, joint_type, None)))
    }

    fn register_joints(
        &mut self,
    ) -> Vec<(SharedConnector<BasicNode>, SharedConnector<BasicNode>)> {
        self.plan.take()
    }
}
