//! Test joining connector locations across sub-networks.

use std::sync::Arc;

use gunns::{
    lock, BasicFlavor, BasicNode, BasicSuperNetwork, JointType, NetworkError, Node,
    SharedConnector, SharedSubNetwork,
};
use gunns_test_networks::TestNetwork;

fn composite(name: &str) -> BasicSuperNetwork {
    BasicSuperNetwork::new(name, BasicFlavor::default())
}

fn member(
    s: &mut BasicSuperNetwork,
    name: &str,
    joint_type: JointType,
) -> (SharedSubNetwork<BasicNode>, SharedConnector<BasicNode>) {
    let network: TestNetwork = TestNetwork::with_joint_type(name, 2, joint_type);
    let connector = network.connector();
    let network = network.into_shared();
    s.add_sub_network(network.clone());
    (network, connector)
}

#[test_log::test]
fn test_mismatched_joint_types_rejected() {
    let mut s = composite("S");
    let (_, a) = member(&mut s, "A", JointType(1));
    let (_, b) = member(&mut s, "B", JointType(2));

    let err = s.join_locations(&a, &b).unwrap_err();
    assert!(matches!(
        err,
        NetworkError::JointTypeMismatch {
            first_type: JointType(1),
            second_type: JointType(2),
            ..
        }
    ));
    assert!(s.joints().is_empty());
    assert_eq!(s.subnets().len(), 2);
}

#[test_log::test]
fn test_third_location_attaches_to_joint() {
    let mut s = composite("S");
    let (_, a) = member(&mut s, "A", JointType(1));
    let (_, b) = member(&mut s, "B", JointType(1));
    let (_, c) = member(&mut s, "C", JointType(1));

    s.join_locations(&a, &b).unwrap();
    s.join_locations(&a, &c).unwrap();
    assert_eq!(s.joints().len(), 1);
    assert_eq!(s.joints().records()[0].locations().len(), 3);
    assert_eq!(s.subnets().len(), 4);

    let joint = s.joints().records()[0].network().clone();
    for location in [&a, &b, &c] {
        assert!(Arc::ptr_eq(lock(location).joint_network().unwrap(), &joint));
    }
    assert_eq!(lock(&c).joint_index().unwrap(), 0);
}

#[test_log::test]
fn test_rejoin_rejected() {
    let mut s = composite("S");
    let (_, a) = member(&mut s, "A", JointType(1));
    let (_, b) = member(&mut s, "B", JointType(1));
    let (_, c) = member(&mut s, "C", JointType(1));
    let (_, d) = member(&mut s, "D", JointType(1));
    s.join_locations(&a, &b).unwrap();
    s.join_locations(&a, &c).unwrap();

    assert!(matches!(
        s.join_locations(&a, &c),
        Err(NetworkError::AlreadyJoined { .. })
    ));
    assert!(matches!(
        s.join_locations(&c, &b),
        Err(NetworkError::AlreadyJoined { .. })
    ));

    s.join_locations(&c, &d).unwrap();
    assert_eq!(s.joints().len(), 1);

    let (_, e) = member(&mut s, "E", JointType(1));
    let (_, f) = member(&mut s, "F", JointType(1));
    s.join_locations(&e, &f).unwrap();
    assert_eq!(s.joints().len(), 2);
    assert!(matches!(
        s.join_locations(&a, &e),
        Err(NetworkError::AlreadyJoined { .. })
    ));
}

#[test_log::test]
fn test_joint_index_memoized() {
    let mut s = composite("S");
    let (_, a) = member(&mut s, "A", JointType(1));
    let (_, b) = member(&mut s, "B", JointType(1));
    let (_, c) = member(&mut s, "C", JointType(1));
    let (_, d) = member(&mut s, "D", JointType(1));
    s.join_locations(&a, &b).unwrap();
    s.join_locations(&c, &d).unwrap();

    assert_eq!(s.joint_index("C.conn").unwrap(), 1);
    assert_eq!(s.joints().memoized(), 1);
    assert_eq!(s.joint_index("C.conn").unwrap(), 1);
    assert_eq!(s.joints().memoized(), 1);
    assert_eq!(s.joint_index("A.conn").unwrap(), 0);
    assert_eq!(s.joints().memoized(), 2);

    assert!(matches!(
        s.joint_index("nowhere"),
        Err(NetworkError::UnknownJointLocation { .. })
    ));
    assert_eq!(s.joints().memoized(), 2);
}

#[test_log::test]
fn test_unjoined_connector_has_no_index() {
    let mut s = composite("S");
    let (_, a) = member(&mut s, "A", JointType(1));
    assert!(matches!(
        lock(&a).joint_index(),
        Err(NetworkError::NoJointNetwork { .. })
    ));
}

#[test_log::test]
fn test_joint_nodes_trail_members() {
    let mut s = composite("S");
    let (a, a_conn) = member(&mut s, "A", JointType(1));
    let (b, b_conn) = member(&mut s, "B", JointType(1));
    let (c, c_conn) = member(&mut s, "C", JointType(1));
    s.join_locations(&a_conn, &b_conn).unwrap();
    // Added after the first joint network, so its nodes follow it.
    let (d, d_conn) = member(&mut s, "D", JointType(1));
    s.join_locations(&c_conn, &d_conn).unwrap();

    s.register_super_nodes();
    assert_eq!(s.num_nodes(), 2 * 4 + 2 + 1);
    let joints: Vec<_> = s.joints().joint_networks().cloned().collect();
    assert_eq!(lock(&joints[0]).core().placed_offset(), Some(6));
    assert_eq!(lock(&d).core().placed_offset(), Some(7));
    assert_eq!(lock(&joints[1]).core().placed_offset(), Some(9));

    s.initialize();
    s.update(0.1);
    let ports = |network: &SharedSubNetwork<BasicNode>| {
        lock(network).core().links().unwrap()[0].node_map().to_vec()
    };
    assert_eq!(ports(&a), [0, 6]);
    assert_eq!(ports(&b), [2, 6]);
    assert_eq!(ports(&c), [4, 9]);
    assert_eq!(ports(&d), [7, 9]);
    assert!(lock(&d_conn).is_connected());

    let nodes = lock(s.node_list().unwrap());
    assert_eq!(nodes[9].name(), "S.Node_9");
    assert_eq!(nodes[10].name(), "S.GROUND");
}

#[test_log::test]
fn test_join_after_registration_rejected() {
    let mut s = composite("S");
    let (_, a) = member(&mut s, "A", JointType(1));
    let (_, b) = member(&mut s, "B", JointType(1));
    s.register_super_nodes();

    let err = s.join_locations(&a, &b).unwrap_err();
    assert!(matches!(
        &err,
        NetworkError::JoinAfterRegistration { network, location }
            if network == "S" && location == "A.conn"
    ));
    assert!(s.joints().is_empty());
    assert!(lock(&a).joint_network().is_none());
}

#[test_log::test]
fn test_planned_joints_registered() {
    let mut s = composite("S");
    let (_, a) = member(&mut s, "A", JointType(3));
    let (_, b) = member(&mut s, "B", JointType(3));
    let (_, c) = member(&mut s, "C", JointType(4));
    let (_, d) = member(&mut s, "D", JointType(3));
    let (_, e) = member(&mut s, "E", JointType(3));
    s.flavor_mut().join(&a, &b);
    s.flavor_mut().join(&b, &c);
    s.flavor_mut().join(&d, &e);

    assert!(matches!(
        s.register_joints(),
        Err(NetworkError::JointTypeMismatch { .. })
    ));
    // The pair after the failing one is still joined.
    assert_eq!(s.joints().len(), 2);
    assert!(lock(&e).joint_network().is_some());
    assert!(lock(&c).joint_network().is_none());
    assert!(s.flavor().plan().is_empty());
}
