use itertools::Itertools;

use super::{FluidConfig, FluidNode};
use crate::{
    shared, JointNetwork, JointPlan, JointType, NetworkError, NetworkFlavor, SharedConnector,
    SharedSubNetwork, SuperNetwork,
};

/// A [`SuperNetwork`] over [`FluidNode`]s.
pub type FluidSuperNetwork = SuperNetwork<FluidFlavor>;

/// The flavor for fluid networks.
///
/// Every member, joint networks included, must carry the same fluid configuration: the same
/// species in the same order and the same trace compounds (or none). Joint networks are built
/// with the flavor's own configuration.
#[derive(Debug)]
pub struct FluidFlavor {
    config: FluidConfig,
    plan: JointPlan<FluidNode>,
}

impl FluidFlavor {
    pub fn new(config: FluidConfig) -> Self {
        Self {
            config,
            plan: JointPlan::default(),
        }
    }

    pub fn config(&self) -> &FluidConfig {
        &self.config
    }

    /// Plan a joint between two locations, made on the next
    /// [`register_joints`](crate::SuperNetwork::register_joints).
    pub fn join(
        &mut self,
        first: &SharedConnector<FluidNode>,
        second: &SharedConnector<FluidNode>,
    ) {
        self.plan.push(first, second);
    }

    pub fn plan(&self) -> &JointPlan<FluidNode> {
        &self.plan
    }
}

fn mismatch(network: &str, message: String) -> NetworkError {
    NetworkError::FluidConfigMismatch {
        network: network.to_owned(),
        message,
    }
}

impl NetworkFlavor for FluidFlavor {
    type Node = FluidNode;

    fn common_config(
        &self,
        network: &str,
        configs: &[(String, Option<FluidConfig>)],
    ) -> Result<Option<FluidConfig>, NetworkError> {
        let missing = configs
            .iter()
            .filter(|(_, config)| config.is_none())
            .map(|(name, _)| name)
            .join(", ");
        if !missing.is_empty() {
            return Err(mismatch(network, format!("no fluid config for {missing}")));
        }

        let mut present = configs
            .iter()
            .filter_map(|(name, config)| config.as_ref().map(|config| (name, config)));
        let Some((first_name, first)) = present.next() else {
            return Ok(Some(self.config.clone()));
        };
        match present.find(|(_, config)| *config != first) {
            None => Ok(Some(first.clone())),
            Some((name, config)) if config.species != first.species => Err(mismatch(
                network,
                format!(
                    "{name} species [{}] differ from {first_name} species [{}]",
                    config.species.iter().join(", "),
                    first.species.iter().join(", ")
                ),
            )),
            Some((name, _)) => Err(mismatch(
                network,
                format!("{name} trace compounds differ from {first_name}"),
            )),
        }
    }

    fn create_joint_network(
        &mut self,
        name: &str,
        joint_type: JointType,
    ) -> Result<SharedSubNetwork<FluidNode>, NetworkError> {
        Ok(shared(JointNetwork::<FluidNode>::new(
            name,
            joint_type,
            Some(self.config.clone()),
        )))
    }

    fn register_joints(
        &mut self,
    ) -> Vec<(SharedConnector<FluidNode>, SharedConnector<FluidNode>)> {
        self.plan.take()
    }
}
