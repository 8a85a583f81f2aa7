use std::{
    fmt::Debug,
    ops::{Index, IndexMut},
    sync::{Arc, Mutex},
};

/// A network node: one element of the node list that links bind their ports to.
///
/// Nodes are created in bulk by [`NodeList::with_len`] and given their identity afterwards through
/// [`Node::initialize`].
pub trait Node: Debug + Default + Send + 'static {
    /// Per-network node configuration that every member of a composite must agree on.
    ///
    /// Basic nodes carry none (`()`); fluid nodes carry their constituent species.
    type Config: Clone + PartialEq + Debug + Send + Sync + 'static;

    /// Name the node and set its initial potential.
    fn initialize(&mut self, name: &str, initial_potential: f64);

    /// Apply the network's node configuration.
    fn configure(&mut self, _config: &Self::Config) {}

    fn name(&self) -> &str;

    fn potential(&self) -> f64;

    fn set_potential(&mut self, potential: f64);
}

/// A node with a name and a scalar potential.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BasicNode {
    name: String,
    potential: f64,
}

impl Node for BasicNode {
    type Config = ();

    fn initialize(&mut self, name: &str, initial_potential: f64) {
        self.name = name.to_owned();
        self.potential = initial_potential;
    }

    #[inline]
    fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    fn potential(&self) -> f64 {
        self.potential
    }

    fn set_potential(&mut self, potential: f64) {
        self.potential = potential;
    }
}

/// An ordered array of nodes. The last node is the boundary ("ground") node.
#[derive(Debug, Default)]
pub struct NodeList<N> {
    nodes: Vec<N>,
}

/// A node list shared by every member of a composite once it has been registered.
pub type SharedNodeList<N> = Arc<Mutex<NodeList<N>>>;

impl<N: Node> NodeList<N> {
    /// Create `len` default (unnamed) nodes.
    pub fn with_len(len: usize) -> Self {
        let mut nodes = Vec::with_capacity(len);
        nodes.resize_with(len, N::default);
        Self { nodes }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&N> {
        self.nodes.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut N> {
        self.nodes.get_mut(index)
    }

    /// The trailing boundary node.
    pub fn ground(&self) -> Option<&N> {
        self.nodes.last()
    }

    /// Index of the trailing boundary node.
    pub fn ground_index(&self) -> Option<usize> {
        self.nodes.len().checked_sub(1)
    }

    pub fn iter(&self) -> impl Iterator<Item = &N> + '_ {
        self.nodes.iter()
    }

    pub fn as_slice(&self) -> &[N] {
        &self.nodes
    }

    pub fn as_mut_slice(&mut self) -> &mut [N] {
        &mut self.nodes
    }

    /// Current potential of every node, in index order.
    pub fn potentials(&self) -> Vec<f64> {
        self.nodes.iter().map(Node::potential).collect()
    }
}

impl<N> Index<usize> for NodeList<N> {
    type Output = N;

    fn index(&self, index: usize) -> &Self::Output {
        &self.nodes[index]
    }
}

impl<N> IndexMut<usize> for NodeList<N> {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.nodes[index]
    }
}
