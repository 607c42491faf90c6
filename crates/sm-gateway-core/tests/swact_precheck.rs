//! Swact pre-check scenarios over the in-memory state store.

use sm_gateway_core::{SwactPreCheck, SwactRefusal};
use sm_state::{
    MemoryStateStore, Node, RedundancyModel, ServiceDomainMember, ServiceGroupAssignment,
    StateError, StateSnapshot,
};

const ORIGIN: &str = "controller-0";
const PEER: &str = "controller-1";

fn node(name: &str, admin: &str, oper: &str) -> Node {
    Node {
        name: name.to_string(),
        administrative_state: admin.to_string(),
        operational_state: oper.to_string(),
        availability_status: "available".to_string(),
        ready_state: String::new(),
    }
}

fn assignment(node_name: &str, group: &str, state: &str) -> ServiceGroupAssignment {
    ServiceGroupAssignment {
        domain: "controller".to_string(),
        node_name: node_name.to_string(),
        service_group_name: group.to_string(),
        desired_state: state.to_string(),
        state: state.to_string(),
        status: String::new(),
        condition: String::new(),
    }
}

fn member(group: &str, model: RedundancyModel, n_active: u32) -> ServiceDomainMember {
    ServiceDomainMember {
        domain: "controller".to_string(),
        service_group_name: group.to_string(),
        redundancy_model: model,
        n_active,
        m_standby: 0,
    }
}

/// Two healthy controllers sharing one N+M group.
fn healthy_pair() -> MemoryStateStore {
    let store = MemoryStateStore::new();
    store.add_node(node(ORIGIN, "unlocked", "enabled"));
    store.add_node(node(PEER, "unlocked", "enabled"));
    store.add_assignment(assignment(ORIGIN, "controller-services", "active"));
    store.add_assignment(assignment(PEER, "controller-services", "standby"));
    store.add_domain_member(member("controller-services", RedundancyModel::NPlusM, 1));
    store
}

async fn check(store: &MemoryStateStore) -> Option<SwactRefusal> {
    SwactPreCheck::new(store).check(ORIGIN).await.unwrap()
}

#[tokio::test]
async fn healthy_standby_peer_allows_swact() {
    assert_eq!(check(&healthy_pair()).await, None);
}

#[tokio::test]
async fn no_peer_rows_means_no_peer_available() {
    let store = MemoryStateStore::new();
    store.add_node(node(ORIGIN, "unlocked", "enabled"));
    store.add_assignment(assignment(ORIGIN, "controller-services", "active"));
    store.add_assignment(assignment(ORIGIN, "web-services", "active"));

    let refusal = check(&store).await.unwrap();
    assert_eq!(refusal, SwactRefusal::NoPeerAvailable);
    assert_eq!(refusal.to_string(), "no peer available");
}

#[tokio::test]
async fn empty_store_means_no_peer_available() {
    assert_eq!(
        check(&MemoryStateStore::new()).await,
        Some(SwactRefusal::NoPeerAvailable)
    );
}

#[tokio::test]
async fn locked_peer_blocks_swact() {
    let store = MemoryStateStore::from_snapshot(StateSnapshot {
        nodes: vec![
            node(ORIGIN, "unlocked", "enabled"),
            node(PEER, "locked", "enabled"),
        ],
        assignments: vec![
            assignment(ORIGIN, "controller-services", "active"),
            assignment(PEER, "controller-services", "standby"),
        ],
        ..Default::default()
    });

    let refusal = check(&store).await.unwrap();
    assert_eq!(
        refusal.to_string(),
        "controller-1 is not ready to take service, controller-1 is locked"
    );
}

#[tokio::test]
async fn disabled_peer_blocks_swact() {
    let store = MemoryStateStore::new();
    store.add_node(node(ORIGIN, "unlocked", "enabled"));
    store.add_node(node(PEER, "unlocked", "disabled"));
    store.add_assignment(assignment(ORIGIN, "controller-services", "active"));
    store.add_assignment(assignment(PEER, "controller-services", "standby"));

    assert!(matches!(
        check(&store).await,
        Some(SwactRefusal::PeerDisabled { ref peer }) if peer == PEER
    ));
}

#[tokio::test]
async fn peer_without_node_row_passes_node_checks() {
    let store = MemoryStateStore::new();
    store.add_assignment(assignment(ORIGIN, "controller-services", "active"));
    store.add_assignment(assignment(PEER, "controller-services", "standby"));

    assert_eq!(check(&store).await, None);
}

#[tokio::test]
async fn degraded_active_active_group_does_not_block() {
    let store = healthy_pair();
    let mut degraded = assignment(PEER, "storage-services", "active");
    degraded.status = "degraded".to_string();
    degraded.condition = "data-inconsistent".to_string();
    store.add_assignment(assignment(ORIGIN, "storage-services", "active"));
    store.add_assignment(degraded);
    store.add_domain_member(member("storage-services", RedundancyModel::N, 2));

    assert_eq!(check(&store).await, None);
}

#[tokio::test]
async fn degraded_group_with_three_actives_still_blocks() {
    let store = healthy_pair();
    let mut degraded = assignment(PEER, "storage-services", "active");
    degraded.status = "degraded".to_string();
    store.add_assignment(degraded);
    store.add_domain_member(member("storage-services", RedundancyModel::N, 3));

    assert!(matches!(
        check(&store).await,
        Some(SwactRefusal::Degraded { .. })
    ));
}

#[tokio::test]
async fn transitioning_peer_blocks_swact() {
    let store = healthy_pair();
    let mut moving = assignment(PEER, "web-services", "standby");
    moving.desired_state = "active".to_string();
    store.add_assignment(moving);

    let refusal = check(&store).await.unwrap();
    assert_eq!(
        refusal.to_string(),
        "web-services on controller-1 is not ready to take service, services transitioning state"
    );
}

#[tokio::test]
async fn failed_peer_group_blocks_swact() {
    let store = healthy_pair();
    let mut failed = assignment(PEER, "web-services", "standby");
    failed.status = "failed".to_string();
    store.add_assignment(failed);

    assert!(matches!(
        check(&store).await,
        Some(SwactRefusal::Failed { ref group, .. }) if group == "web-services"
    ));
}

#[tokio::test]
async fn syncing_peer_group_blocks_swact() {
    let store = healthy_pair();
    let mut syncing = assignment(PEER, "drbd-services", "standby");
    syncing.status = "degraded".to_string();
    syncing.condition = "data-syncing".to_string();
    store.add_assignment(syncing);

    let refusal = check(&store).await.unwrap();
    assert!(refusal.to_string().ends_with("service is syncing data"));
}

#[tokio::test]
async fn unsettled_state_differing_from_origin_blocks_swact() {
    let store = healthy_pair();
    store.add_assignment(assignment(ORIGIN, "vim-services", "active"));
    store.add_assignment(assignment(PEER, "vim-services", "disabled"));

    let refusal = check(&store).await.unwrap();
    assert_eq!(
        refusal.to_string(),
        "vim-services on controller-1 is not ready to take service, \
         service not in the active or standby state"
    );
}

#[tokio::test]
async fn first_failing_group_in_name_order_wins() {
    let store = healthy_pair();
    let mut zeta = assignment(PEER, "zeta-services", "standby");
    zeta.status = "failed".to_string();
    let mut alpha = assignment(PEER, "alpha-services", "standby");
    alpha.desired_state = "active".to_string();
    store.add_assignment(zeta);
    store.add_assignment(alpha);

    assert!(matches!(
        check(&store).await,
        Some(SwactRefusal::Transitioning { ref group, .. }) if group == "alpha-services"
    ));
}

#[tokio::test]
async fn store_failure_is_an_error() {
    let store = healthy_pair();
    store.set_unavailable(true);

    let result = SwactPreCheck::new(&store).check(ORIGIN).await;
    assert!(matches!(result, Err(StateError::Unavailable(_))));
}
