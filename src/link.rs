use crate::NetworkError;

/// A port-bindable network element (conductor, source, capacitor, ...).
///
/// The physics behind a link is not this crate's concern. A network builds its links during
/// [`SubNetwork::init_network`](crate::SubNetwork::init_network) with their ports mapped to
/// global node indices; a [`Connector`](crate::Connector) may later re-map a port onto a joint
/// node.
pub trait Link: Send {
    fn name(&self) -> &str;

    /// Global node index each port is currently bound to.
    fn node_map(&self) -> &[usize];

    /// Bind `port` to the global node index `node`.
    fn set_port(&mut self, port: usize, node: usize) -> Result<(), NetworkError>;

    /// Advance the link by one frame of `dt` seconds.
    fn step(&mut self, dt: f64) -> Result<(), NetworkError>;

    /// Reset non-checkpointed state after a restart.
    fn restart_model(&mut self) {}
}
