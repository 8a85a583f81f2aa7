use std::{collections::HashMap, fmt, sync::Arc};

use crate::{lock, NetworkError, Node, SharedConnector, SharedSubNetwork};

/// A joint network and the connector locations it joins.
pub struct JointRecord<N: Node> {
    network: SharedSubNetwork<N>,
    locations: Vec<SharedConnector<N>>,
}

impl<N: Node> JointRecord<N> {
    pub(crate) fn new(network: SharedSubNetwork<N>, locations: Vec<SharedConnector<N>>) -> Self {
        Self { network, locations }
    }

    pub fn network(&self) -> &SharedSubNetwork<N> {
        &self.network
    }

    /// The joined locations, in the order they were joined.
    pub fn locations(&self) -> &[SharedConnector<N>] {
        &self.locations
    }

    fn contains(&self, location: &SharedConnector<N>) -> bool {
        self.locations.iter().any(|loc| Arc::ptr_eq(loc, location))
    }
}

impl<N: Node> fmt::Debug for JointRecord<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let locations: Vec<String> = self
            .locations
            .iter()
            .map(|loc| lock(loc).name().to_owned())
            .collect();
        f.debug_struct("JointRecord")
            .field("network", &lock(&self.network).name())
            .field("locations", &locations)
            .finish()
    }
}

/// The joints created by a composite and a memo of location name to joint index.
pub struct JointRegistry<N: Node> {
    records: Vec<JointRecord<N>>,
    indices: HashMap<String, usize>,
}

impl<N: Node> Default for JointRegistry<N> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            indices: HashMap::new(),
        }
    }
}

impl<N: Node> fmt::Debug for JointRegistry<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JointRegistry")
            .field("records", &self.records)
            .field("indices", &self.indices)
            .finish()
    }
}

impl<N: Node> JointRegistry<N> {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[JointRecord<N>] {
        &self.records
    }

    pub fn joint_networks(&self) -> impl Iterator<Item = &SharedSubNetwork<N>> + '_ {
        self.records.iter().map(JointRecord::network)
    }

    /// Number of location names resolved so far.
    pub fn memoized(&self) -> usize {
        self.indices.len()
    }

    /// The joint `location` belongs to.
    pub(crate) fn find(&self, location: &SharedConnector<N>) -> Option<usize> {
        self.records
            .iter()
            .position(|record| record.contains(location))
    }

    /// Append a joint and point each of its locations at the joint network.
    pub(crate) fn push(&mut self, record: JointRecord<N>) {
        for location in &record.locations {
            lock(location).set_joint_network(Arc::clone(&record.network));
        }
        self.records.push(record);
    }

    /// Add `location` to an existing joint.
    pub(crate) fn attach(&mut self, joint: usize, location: &SharedConnector<N>) {
        let Some(record) = self.records.get_mut(joint) else {
            return;
        };
        lock(location).set_joint_network(Arc::clone(&record.network));
        record.locations.push(Arc::clone(location));
    }

    /// Index of the joint that location `name` belongs to, memoized after the first lookup.
    pub(crate) fn resolve(&mut self, name: &str) -> Result<usize, NetworkError> {
        if let Some(&index) = self.indices.get(name) {
            return Ok(index);
        }
        let location = self
            .records
            .iter()
            .flat_map(|record| record.locations.iter())
            .find(|loc| lock(loc).name() == name)
            .ok_or_else(|| NetworkError::UnknownJointLocation {
                name: name.to_owned(),
            })?;
        let index = lock(location).joint_index()?;
        self.indices.insert(name.to_owned(), index);
        log::trace!("{name}: joint index {index}");
        Ok(index)
    }
}

/// Location pairs a flavor wants joined when its composite registers its joints.
pub struct JointPlan<N: Node> {
    pairs: Vec<(SharedConnector<N>, SharedConnector<N>)>,
}

impl<N: Node> Default for JointPlan<N> {
    fn default() -> Self {
        Self { pairs: Vec::new() }
    }
}

impl<N: Node> fmt::Debug for JointPlan<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JointPlan")
            .field("pairs", &self.pairs.len())
            .finish()
    }
}

impl<N: Node> JointPlan<N> {
    pub fn push(&mut self, first: &SharedConnector<N>, second: &SharedConnector<N>) {
        self.pairs.push((Arc::clone(first), Arc::clone(second)));
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Take every planned pair, leaving the plan empty.
    pub fn take(&mut self) -> Vec<(SharedConnector<N>, SharedConnector<N>)> {
        std::mem::take(&mut self.pairs)
    }
}
