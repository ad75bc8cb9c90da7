use anyhow::{Context, Result};
use std::sync::Arc;

use crate::agent::ProcessAgent;
use crate::config::PluginConfig;
use crate::local::{LocalPodRegistry, LocalState, StaticSubnetController, StaticVnidController};
use crate::plugin::{Collaborators, OvsPlugin};
use crate::vnid::VnidMap;

/// Pod operations the host can request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PodAction {
    Setup,
    Teardown,
    Update,
    Status,
}

/// Build a plugin backed by the local state file and the process agent.
///
/// `network_changed` is what node start will report for the node subnet.
pub fn build_plugin(config: &PluginConfig, state: LocalState, network_changed: bool) -> OvsPlugin {
    let (writer, vnid_map) = VnidMap::new();

    let collaborators = Collaborators {
        subnet: Arc::new(StaticSubnetController::new(network_changed)),
        vnids: Arc::new(StaticVnidController::new(writer, state.namespaces)),
        registry: Arc::new(LocalPodRegistry::new(&config.hostname, state.pods)),
    };

    OvsPlugin::new(
        config.mode(),
        &config.hostname,
        collaborators,
        vnid_map,
        Arc::new(ProcessAgent::new(config.agent_timeout())),
    )
}

/// Start the node, then run one pod operation
pub async fn run_pod_action(
    plugin: &OvsPlugin,
    config: &PluginConfig,
    action: PodAction,
    namespace: &str,
    name: &str,
    container_id: &str,
) -> Result<()> {
    plugin
        .start_node(config.mtu)
        .await
        .context("Failed to start node")?;

    match action {
        PodAction::Setup => plugin
            .set_up_pod(namespace, name, container_id)
            .await
            .with_context(|| format!("Failed to set up pod {namespace}/{name}"))?,
        PodAction::Teardown => plugin
            .tear_down_pod(namespace, name, container_id)
            .await
            .with_context(|| format!("Failed to tear down pod {namespace}/{name}"))?,
        PodAction::Update => plugin
            .update_pod(namespace, name, container_id)
            .await
            .with_context(|| format!("Failed to update pod {namespace}/{name}"))?,
        PodAction::Status => {
            let status = plugin.status(namespace, name, container_id).await?;
            match status {
                Some(status) => println!("{}", serde_json::to_string_pretty(&status)?),
                None => println!("{}: network status not reported", plugin.name()),
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::{MULTI_TENANT_PLUGIN_NAME, SINGLE_TENANT_PLUGIN_NAME};
    use crate::types::TenantMode;

    #[test]
    fn test_build_plugin_follows_config_mode() {
        let single = build_plugin(&PluginConfig::default(), LocalState::default(), false);
        assert_eq!(single.mode(), TenantMode::SingleTenant);
        assert_eq!(single.name(), SINGLE_TENANT_PLUGIN_NAME);

        let config = PluginConfig {
            multitenant: true,
            ..PluginConfig::default()
        };
        let multi = build_plugin(&config, LocalState::default(), false);
        assert_eq!(multi.name(), MULTI_TENANT_PLUGIN_NAME);
    }

    #[tokio::test]
    async fn test_status_needs_no_agent() {
        let config = PluginConfig::default();
        let plugin = build_plugin(&config, LocalState::default(), false);
        run_pod_action(&plugin, &config, PodAction::Status, "proj1", "web", "c1")
            .await
            .unwrap();
        assert_eq!(plugin.mtu(), Some(config.mtu));
    }
}
