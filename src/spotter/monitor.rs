use super::{NetworkSpotter, SpotterConfig, SpotterContext, SpotterInput};
use crate::{NetworkError, Node};

/// Samples the potential of one of its network's nodes after every solver step.
#[derive(Debug, Default)]
pub struct PotentialMonitor {
    name: String,
    node: usize,
    active: bool,
    last: Option<f64>,
    peak: Option<f64>,
    samples: u64,
}

impl PotentialMonitor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Potential seen on the most recent sample.
    pub fn last(&self) -> Option<f64> {
        self.last
    }

    /// Largest potential seen since initialization.
    pub fn peak(&self) -> Option<f64> {
        self.peak
    }

    pub fn samples(&self) -> u64 {
        self.samples
    }
}

impl<N: Node> NetworkSpotter<N> for PotentialMonitor {
    fn name(&self) -> &str {
        &self.name
    }

    fn initialize(
        &mut self,
        config: Option<&SpotterConfig>,
        input: Option<&SpotterInput>,
    ) -> Result<(), NetworkError> {
        let Some(SpotterConfig::Monitor(config)) = config else {
            return Err(NetworkError::init(&self.name, "missing or invalid config data"));
        };
        let Some(SpotterInput::Monitor(input)) = input else {
            return Err(NetworkError::init(&self.name, "missing or invalid input data"));
        };

        if !config.name.is_empty() {
            self.name.clone_from(&config.name);
        }
        self.node = config.node;
        self.active = input.active;
        self.last = None;
        self.peak = None;
        self.samples = 0;
        Ok(())
    }

    fn step_pre_solver(&mut self, _ctx: &mut SpotterContext<'_, N>) -> Result<(), NetworkError> {
        Ok(())
    }

    fn step_post_solver(&mut self, ctx: &mut SpotterContext<'_, N>) -> Result<(), NetworkError> {
        if !self.active {
            return Ok(());
        }
        let index = ctx.node_offset + self.node;
        let node = ctx.nodes.get(index).ok_or_else(|| NetworkError::NodeOutOfRange {
            network: self.name.clone(),
            index,
            len: ctx.nodes.len(),
        })?;
        let potential = node.potential();
        self.last = Some(potential);
        self.peak = Some(self.peak.map_or(potential, |peak| peak.max(potential)));
        self.samples += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BasicNode, Link, MonitorConfig, MonitorInput, NodeList};

    #[test]
    fn test_samples_offset_node() {
        let mut monitor = PotentialMonitor::new("mon");
        let config = SpotterConfig::Monitor(MonitorConfig {
            name: String::new(),
            node: 1,
        });
        let input = SpotterInput::Monitor(MonitorInput { active: true });
        NetworkSpotter::<BasicNode>::initialize(&mut monitor, Some(&config), Some(&input))
            .unwrap();

        let mut nodes = NodeList::<BasicNode>::with_len(4);
        nodes[3].set_potential(2.0);
        let mut links: Vec<Box<dyn Link>> = Vec::new();
        let mut ctx = SpotterContext {
            dt: 0.1,
            node_offset: 2,
            links: &mut links,
            nodes: &nodes,
        };
        monitor.step_post_solver(&mut ctx).unwrap();
        assert_eq!(monitor.last(), Some(2.0));

        nodes[3].set_potential(1.0);
        let mut ctx = SpotterContext {
            dt: 0.1,
            node_offset: 2,
            links: &mut links,
            nodes: &nodes,
        };
        monitor.step_post_solver(&mut ctx).unwrap();
        assert_eq!(monitor.last(), Some(1.0));
        assert_eq!(monitor.peak(), Some(2.0));
        assert_eq!(monitor.samples(), 2);
    }

    #[test]
    fn test_rejects_connector_config() {
        let mut monitor = PotentialMonitor::new("mon");
        let config = SpotterConfig::Connector(Default::default());
        let input = SpotterInput::Monitor(MonitorInput { active: true });
        assert!(
            NetworkSpotter::<BasicNode>::initialize(&mut monitor, Some(&config), Some(&input))
                .is_err()
        );
    }
}
