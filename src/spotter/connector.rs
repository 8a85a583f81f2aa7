use std::sync::{Arc, Mutex};

use super::{NetworkSpotter, SpotterConfig, SpotterContext, SpotterInput};
use crate::{lock, JointType, Link, NetworkError, Node, SharedConnector, SharedSubNetwork};

/// A pending link port binding, applied once the joint node offset is known.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Connection {
    pub link: usize,
    pub port: usize,
    pub node: usize,
}

/// A connection location within a network that a composite can join to locations in other
/// networks.
///
/// The connector records which of its owner's link ports should land on the joint node and
/// defers the re-mapping until the joint network has been given its place in the combined node
/// list.
pub struct Connector<N: Node> {
    name: String,
    owner: String,
    joint_type: JointType,
    connections: Vec<Connection>,
    joint_network: Option<SharedSubNetwork<N>>,
    connected: bool,
    initialized: bool,
}

impl<N: Node> std::fmt::Debug for Connector<N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connector")
            .field("name", &self.name)
            .field("owner", &self.owner)
            .field("joint_type", &self.joint_type)
            .field("connections", &self.connections)
            .field("joined", &self.joint_network.is_some())
            .field("connected", &self.connected)
            .finish()
    }
}

impl<N: Node> Connector<N> {
    pub fn new(name: impl Into<String>, owner: impl Into<String>, joint_type: JointType) -> Self {
        Self {
            name: name.into(),
            owner: owner.into(),
            joint_type,
            connections: Vec::new(),
            joint_network: None,
            connected: false,
            initialized: false,
        }
    }

    /// Create a connector already wrapped in a [`SharedConnector`] handle.
    pub fn shared(
        name: impl Into<String>,
        owner: impl Into<String>,
        joint_type: JointType,
    ) -> SharedConnector<N> {
        Arc::new(Mutex::new(Self::new(name, owner, joint_type)))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the owning network.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn joint_type(&self) -> JointType {
        self.joint_type
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Whether the pending connections have been applied.
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    /// Queue a binding of `port` of the owner's `link` onto joint-local `node`.
    pub fn add_connection(&mut self, link: usize, port: usize, node: usize) {
        self.connections.push(Connection { link, port, node });
        self.connected = false;
    }

    /// Re-map every pending binding onto `node + node_offset`.
    pub fn connect(
        &mut self,
        links: &mut [Box<dyn Link>],
        node_offset: usize,
    ) -> Result<(), NetworkError> {
        let len = links.len();
        for connection in &self.connections {
            let link = links
                .get_mut(connection.link)
                .ok_or_else(|| NetworkError::LinkOutOfRange {
                    network: self.owner.clone(),
                    index: connection.link,
                    len,
                })?;
            link.set_port(connection.port, connection.node + node_offset)?;
            log::trace!(
                "{}: {} port {} -> node {}",
                self.name,
                link.name(),
                connection.port,
                connection.node + node_offset
            );
        }
        self.connected = true;
        Ok(())
    }

    pub fn set_joint_network(&mut self, network: SharedSubNetwork<N>) {
        self.joint_network = Some(network);
        self.connected = false;
    }

    pub fn joint_network(&self) -> Option<&SharedSubNetwork<N>> {
        self.joint_network.as_ref()
    }

    /// Index of the joint this location belongs to, as reported by its joint network.
    pub fn joint_index(&self) -> Result<usize, NetworkError> {
        let network = self
            .joint_network
            .as_ref()
            .ok_or_else(|| NetworkError::NoJointNetwork {
                connector: self.name.clone(),
            })?;
        let index = lock(network).core().joint_index();
        index.ok_or_else(|| NetworkError::UnassignedJointIndex {
            connector: self.name.clone(),
        })
    }

    /// Offset of the joint network's nodes, once its composite has registered.
    fn joint_offset(&self) -> Option<usize> {
        self.joint_network
            .as_ref()
            .and_then(|network| lock(network).core().placed_offset())
    }
}

impl<N: Node> NetworkSpotter<N> for Connector<N> {
    fn name(&self) -> &str {
        &self.name
    }

    fn initialize(
        &mut self,
        config: Option<&SpotterConfig>,
        input: Option<&SpotterInput>,
    ) -> Result<(), NetworkError> {
        self.initialized = false;
        let config = match config {
            Some(SpotterConfig::Connector(config)) => config,
            Some(other) => {
                return Err(NetworkError::init(
                    &self.name,
                    format!("expected connector config, got {} config", other.kind()),
                ))
            }
            None => return Err(NetworkError::init(&self.name, "missing config data")),
        };
        let input = match input {
            Some(SpotterInput::Connector(input)) => input,
            Some(other) => {
                return Err(NetworkError::init(
                    &self.name,
                    format!("expected connector input, got {} input", other.kind()),
                ))
            }
            None => return Err(NetworkError::init(&self.name, "missing input data")),
        };

        if !config.name.is_empty() {
            self.name.clone_from(&config.name);
        }
        self.connections.clear();
        self.add_connection(input.link, input.port, input.node);
        self.initialized = true;
        Ok(())
    }

    fn step_pre_solver(&mut self, ctx: &mut SpotterContext<'_, N>) -> Result<(), NetworkError> {
        if self.connected || self.connections.is_empty() {
            return Ok(());
        }
        match self.joint_offset() {
            Some(offset) => {
                self.connect(ctx.links, offset)?;
                log::debug!("{}: connected to joint nodes at offset {offset}", self.name);
            }
            None => log::trace!("{}: waiting for joint node offset", self.name),
        }
        Ok(())
    }

    fn step_post_solver(&mut self, _ctx: &mut SpotterContext<'_, N>) -> Result<(), NetworkError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BasicNode, ConnectorConfig, ConnectorInput, MonitorConfig, MonitorInput};

    struct Wire {
        ports: Vec<usize>,
    }

    impl Link for Wire {
        fn name(&self) -> &str {
            "wire"
        }

        fn node_map(&self) -> &[usize] {
            &self.ports
        }

        fn set_port(&mut self, port: usize, node: usize) -> Result<(), NetworkError> {
            let slot = self
                .ports
                .get_mut(port)
                .ok_or_else(|| NetworkError::PortOutOfRange {
                    link: "wire".to_owned(),
                    port,
                })?;
            *slot = node;
            Ok(())
        }

        fn step(&mut self, _dt: f64) -> Result<(), NetworkError> {
            Ok(())
        }
    }

    fn connector() -> Connector<BasicNode> {
        Connector::new("A.conn", "A", JointType(1))
    }

    #[test]
    fn test_initialize_rejects_missing_data() {
        let mut conn = connector();
        let input = SpotterInput::Connector(ConnectorInput::default());
        assert!(matches!(
            conn.initialize(None, Some(&input)),
            Err(NetworkError::Initialization { .. })
        ));

        let config = SpotterConfig::Connector(ConnectorConfig::default());
        assert!(conn.initialize(Some(&config), None).is_err());
        assert!(!conn.is_initialized());
    }

    #[test]
    fn test_initialize_rejects_wrong_kind() {
        let mut conn = connector();
        let config = SpotterConfig::Monitor(MonitorConfig::default());
        let input = SpotterInput::Connector(ConnectorInput::default());
        assert!(conn.initialize(Some(&config), Some(&input)).is_err());

        let config = SpotterConfig::Connector(ConnectorConfig::default());
        let input = SpotterInput::Monitor(MonitorInput::default());
        assert!(conn.initialize(Some(&config), Some(&input)).is_err());
        assert!(!conn.is_initialized());
    }

    #[test]
    fn test_initialize_queues_input_binding() {
        let mut conn = connector();
        let config = SpotterConfig::Connector(ConnectorConfig {
            name: "A.port".to_owned(),
        });
        let input = SpotterInput::Connector(ConnectorInput {
            link: 0,
            port: 1,
            node: 0,
        });
        conn.initialize(Some(&config), Some(&input)).unwrap();
        assert!(conn.is_initialized());
        assert_eq!(NetworkSpotter::name(&conn), "A.port");
        assert_eq!(
            conn.connections(),
            &[Connection {
                link: 0,
                port: 1,
                node: 0
            }]
        );
    }

    #[test]
    fn test_connect_applies_offset() {
        let mut conn = connector();
        conn.add_connection(0, 1, 0);
        let mut links: Vec<Box<dyn Link>> = vec![Box::new(Wire { ports: vec![0, 1] })];
        conn.connect(&mut links, 6).unwrap();
        assert_eq!(links[0].node_map(), &[0, 6]);
        assert!(conn.is_connected());
    }

    #[test]
    fn test_connect_rejects_unknown_link() {
        let mut conn = connector();
        conn.add_connection(3, 0, 0);
        let mut links: Vec<Box<dyn Link>> = Vec::new();
        assert!(matches!(
            conn.connect(&mut links, 0),
            Err(NetworkError::LinkOutOfRange { index: 3, .. })
        ));
    }

    #[test]
    fn test_joint_index_requires_joint_network() {
        let conn = connector();
        assert!(matches!(
            conn.joint_index(),
            Err(NetworkError::NoJointNetwork { .. })
        ));
    }
}
