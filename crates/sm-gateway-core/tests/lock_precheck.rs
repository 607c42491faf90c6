//! Lock pre-check scenarios with a static peer probe.

use sm_gateway_core::fakes::StaticPeerProbe;
use sm_gateway_core::{LockPreCheck, PeerServiceState, RequestContext};
use sm_state::{
    FailureImpact, MemoryStateStore, RedundancyModel, Service, ServiceDomainMember,
    ServiceGroupAssignment, ServiceGroupMember, StateError,
};

const LOCAL: &str = "controller-0";
const TARGET: &str = "compute-0";
const OTHER: &str = "compute-1";
const GROUP: &str = "storage-services";
const SERVICE: &str = "ceph-osd";

fn assignment(node_name: &str, group: &str) -> ServiceGroupAssignment {
    ServiceGroupAssignment {
        domain: "storage".to_string(),
        node_name: node_name.to_string(),
        service_group_name: group.to_string(),
        desired_state: "active".to_string(),
        state: "active".to_string(),
        status: String::new(),
        condition: String::new(),
    }
}

fn group_member(service: &str, impact: FailureImpact) -> ServiceGroupMember {
    ServiceGroupMember {
        service_group_name: GROUP.to_string(),
        service_name: service.to_string(),
        service_failure_impact: impact,
        provisioned: "yes".to_string(),
    }
}

fn ill_service(name: &str) -> Service {
    Service {
        name: name.to_string(),
        desired_state: "enabled-active".to_string(),
        state: "disabled".to_string(),
        status: String::new(),
    }
}

/// An N/2 group on three nodes with one critical ill member.
fn storage_cluster() -> MemoryStateStore {
    let store = MemoryStateStore::new();
    store.add_domain_member(ServiceDomainMember {
        domain: "storage".to_string(),
        service_group_name: GROUP.to_string(),
        redundancy_model: RedundancyModel::N,
        n_active: 2,
        m_standby: 0,
    });
    store.add_group_member(group_member(SERVICE, FailureImpact::Critical));
    store.add_service(ill_service(SERVICE));
    store.add_assignment(assignment(LOCAL, GROUP));
    store.add_assignment(assignment(TARGET, GROUP));
    store.add_assignment(assignment(OTHER, GROUP));
    store
}

async fn check(store: &MemoryStateStore, probe: &StaticPeerProbe) -> Option<Vec<String>> {
    LockPreCheck::new(store, probe, LOCAL)
        .check(TARGET, &RequestContext::default())
        .await
        .unwrap()
}

#[tokio::test]
async fn sole_provider_blocks_lock() {
    let store = storage_cluster();
    let probe = StaticPeerProbe::new();
    probe.set_enabled_active(TARGET, SERVICE);

    assert_eq!(check(&store, &probe).await, Some(vec![SERVICE.to_string()]));
}

#[tokio::test]
async fn service_in_two_groups_is_reported_once_in_first_seen_order() {
    const BACKUP_GROUP: &str = "backup-services";
    const GATEWAY: &str = "rados-gw";

    let store = MemoryStateStore::new();
    for group in [BACKUP_GROUP, GROUP] {
        store.add_domain_member(ServiceDomainMember {
            domain: "storage".to_string(),
            service_group_name: group.to_string(),
            redundancy_model: RedundancyModel::N,
            n_active: 2,
            m_standby: 0,
        });
        store.add_group_member(ServiceGroupMember {
            service_group_name: group.to_string(),
            service_name: GATEWAY.to_string(),
            service_failure_impact: FailureImpact::Critical,
            provisioned: "yes".to_string(),
        });
        store.add_assignment(assignment(TARGET, group));
    }
    store.add_group_member(group_member(SERVICE, FailureImpact::Critical));
    store.add_service(ill_service(GATEWAY));
    store.add_service(ill_service(SERVICE));

    let probe = StaticPeerProbe::new();
    probe.set_enabled_active(TARGET, GATEWAY);
    probe.set_enabled_active(TARGET, SERVICE);

    assert_eq!(
        check(&store, &probe).await,
        Some(vec![GATEWAY.to_string(), SERVICE.to_string()])
    );
}

#[tokio::test]
async fn redundant_provider_elsewhere_allows_lock() {
    let store = storage_cluster();
    let probe = StaticPeerProbe::new();
    probe.set_enabled_active(TARGET, SERVICE);
    probe.set_enabled_active(OTHER, SERVICE);

    assert_eq!(check(&store, &probe).await, None);
}

#[tokio::test]
async fn local_host_is_not_counted_as_alternate() {
    let store = storage_cluster();
    let probe = StaticPeerProbe::new();
    probe.set_enabled_active(TARGET, SERVICE);
    probe.set_enabled_active(LOCAL, SERVICE);

    assert_eq!(check(&store, &probe).await, Some(vec![SERVICE.to_string()]));
    assert!(probe.calls().iter().all(|call| call.node_name != LOCAL));
}

#[tokio::test]
async fn unavailable_target_is_skipped() {
    let store = storage_cluster();
    let probe = StaticPeerProbe::new();

    assert_eq!(check(&store, &probe).await, None);
    let targets: Vec<String> = probe.calls().into_iter().map(|c| c.node_name).collect();
    assert_eq!(targets, vec![OTHER.to_string(), TARGET.to_string()]);
}

#[tokio::test]
async fn standby_on_target_is_not_at_risk() {
    let store = storage_cluster();
    let probe = StaticPeerProbe::new();
    probe.set(
        TARGET,
        SERVICE,
        PeerServiceState::Found {
            desired_state: "enabled-active".to_string(),
            state: "enabled-standby".to_string(),
        },
    );

    assert_eq!(check(&store, &probe).await, None);
}

#[tokio::test]
async fn healthy_services_never_probe() {
    let store = storage_cluster();
    store.replace(sm_state::StateSnapshot {
        services: vec![Service {
            name: SERVICE.to_string(),
            desired_state: "enabled-active".to_string(),
            state: "enabled-active".to_string(),
            status: String::new(),
        }],
        ..Default::default()
    });
    let probe = StaticPeerProbe::new();

    assert_eq!(check(&store, &probe).await, None);
    assert!(probe.calls().is_empty());
}

#[tokio::test]
async fn non_critical_members_are_ignored() {
    let store = MemoryStateStore::new();
    store.add_domain_member(ServiceDomainMember {
        domain: "storage".to_string(),
        service_group_name: GROUP.to_string(),
        redundancy_model: RedundancyModel::N,
        n_active: 2,
        m_standby: 0,
    });
    store.add_group_member(group_member(SERVICE, FailureImpact::Major));
    store.add_service(ill_service(SERVICE));
    store.add_assignment(assignment(TARGET, GROUP));
    let probe = StaticPeerProbe::new();
    probe.set_enabled_active(TARGET, SERVICE);

    assert_eq!(check(&store, &probe).await, None);
    assert!(probe.calls().is_empty());
}

#[tokio::test]
async fn groups_outside_the_n_model_are_ignored() {
    let store = MemoryStateStore::new();
    store.add_domain_member(ServiceDomainMember {
        domain: "storage".to_string(),
        service_group_name: GROUP.to_string(),
        redundancy_model: RedundancyModel::NPlusM,
        n_active: 2,
        m_standby: 1,
    });
    store.add_group_member(group_member(SERVICE, FailureImpact::Critical));
    store.add_service(ill_service(SERVICE));
    store.add_assignment(assignment(TARGET, GROUP));
    let probe = StaticPeerProbe::new();
    probe.set_enabled_active(TARGET, SERVICE);

    assert_eq!(check(&store, &probe).await, None);
}

#[tokio::test]
async fn auth_token_is_forwarded_to_probes() {
    let store = storage_cluster();
    let probe = StaticPeerProbe::new();
    probe.set_enabled_active(TARGET, SERVICE);

    LockPreCheck::new(&store, &probe, LOCAL)
        .check(TARGET, &RequestContext::with_auth_token("token-123"))
        .await
        .unwrap();

    let calls = probe.calls();
    assert!(!calls.is_empty());
    assert!(calls
        .iter()
        .all(|call| call.auth_token.as_deref() == Some("token-123")));
}

#[tokio::test]
async fn store_failure_is_an_error() {
    let store = storage_cluster();
    store.set_unavailable(true);
    let probe = StaticPeerProbe::new();

    let result = LockPreCheck::new(&store, &probe, LOCAL)
        .check(TARGET, &RequestContext::default())
        .await;
    assert!(matches!(result, Err(StateError::Unavailable(_))));
}
