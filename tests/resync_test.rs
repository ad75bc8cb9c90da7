// File: tests/resync_test.rs

mod common;

use common::{argv, HarnessBuilder, RecordingAgent, HOST};
use ovsnet::types::{Pod, TenantMode};
use tracing_test::traced_test;

fn local_pods(builder: HarnessBuilder) -> HarnessBuilder {
    builder
        .pod(Pod::new("proj1", "web", "c1", HOST))
        .pod(Pod::new("proj2", "api", "c2", HOST))
        .pod(Pod::new("proj1", "db", "c3", HOST))
        .pod(Pod::new("proj1", "remote", "c4", "node-2"))
}

#[tokio::test]
async fn test_unchanged_network_updates_nothing() {
    let h = local_pods(HarnessBuilder::new(TenantMode::SingleTenant)).build();
    h.plugin.start_node(1450).await.unwrap();
    assert!(h.agent.invocations().is_empty());
}

#[tokio::test]
async fn test_changed_network_updates_every_local_pod() {
    let h = local_pods(HarnessBuilder::new(TenantMode::MultiTenant))
        .subnet(|s| s.network_changed = true)
        .namespace("proj1", 7)
        .namespace("proj2", 9)
        .build();

    h.plugin.start_node(1450).await.unwrap();

    assert_eq!(
        h.agent.invocations(),
        vec![
            argv(&["update", "c1", "7"]),
            argv(&["update", "c2", "9"]),
            argv(&["update", "c3", "7"]),
        ]
    );
}

#[tokio::test]
#[traced_test]
async fn test_resync_failures_are_logged_not_returned() {
    let h = local_pods(HarnessBuilder::new(TenantMode::MultiTenant))
        .subnet(|s| s.network_changed = true)
        .namespace("proj1", 7)
        .agent(RecordingAgent::failing_for(&["c1"]))
        .build();

    // c1 fails in the agent, c2 has no VNID; neither stops the pass.
    h.plugin.start_node(1450).await.unwrap();

    assert_eq!(
        h.agent.invocations(),
        vec![argv(&["update", "c1", "7"]), argv(&["update", "c3", "7"])]
    );
    assert!(logs_contain("Could not update pod \"web\" (c1)"));
    assert!(logs_contain("Could not update pod \"api\" (c2)"));
    assert!(logs_contain("error fetching VNID for namespace: proj2"));
    assert!(logs_contain("updated=1"));
    assert!(logs_contain("failed=2"));
}

#[tokio::test]
async fn test_single_tenant_resync_uses_global_vnid() {
    let h = local_pods(HarnessBuilder::new(TenantMode::SingleTenant))
        .subnet(|s| s.network_changed = true)
        .build();

    h.plugin.start_node(1450).await.unwrap();

    let invocations = h.agent.invocations();
    assert_eq!(invocations.len(), 3);
    assert!(invocations.iter().all(|argv| argv[0] == "update" && argv[2] == "0"));
    assert!(h.calls().iter().all(|call| !call.starts_with("vnid.")));
}

#[tokio::test]
async fn test_pod_listing_failure_aborts_node_start() {
    let h = local_pods(HarnessBuilder::new(TenantMode::SingleTenant))
        .subnet(|s| s.network_changed = true)
        .registry(|r| r.fail_list = true)
        .build();

    let err = h.plugin.start_node(1450).await.unwrap_err();
    assert_eq!(err.to_string(), "registry unavailable");
    assert!(h.agent.invocations().is_empty());
}
