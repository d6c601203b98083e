pub mod deploy;
pub mod status;
pub mod template;
pub mod validate;

use armflow_cloud::{
    ArmClient, CredentialStore, DeploymentTemplateBuilder, ImageSpec, LoginCredentials,
    NodeMetadata, NodeSpec, NodeStatus, PollConfig, Provisioner, StatusReconciler,
};
use armflow_cloud_azure::{AzureConfig, AzureTransport};
use armflow_config::Settings;
use colored::Colorize;

/// 設定ファイルの node セクションから NodeSpec を組み立てる
pub fn node_spec(
    settings: &Settings,
    node: &str,
    admin_password: Option<String>,
    vm_size: Option<String>,
) -> NodeSpec {
    let password = admin_password
        .or_else(|| settings.default_login.password.clone())
        .unwrap_or_default();

    NodeSpec::new(node, &settings.default_login.user, password)
        .with_vm_size(vm_size.unwrap_or_else(|| settings.node.vm_size.clone()))
        .with_image(ImageSpec {
            publisher: settings.node.image_publisher.clone(),
            offer: settings.node.image_offer.clone(),
            sku: settings.node.image_sku.clone(),
        })
}

pub fn template_builder(settings: &Settings) -> DeploymentTemplateBuilder {
    match &settings.location {
        Some(location) => DeploymentTemplateBuilder::new().with_location(location),
        None => DeploymentTemplateBuilder::new(),
    }
}

pub fn default_login(settings: &Settings) -> LoginCredentials {
    LoginCredentials::new(
        &settings.default_login.user,
        settings.default_login.password.clone(),
    )
}

/// AZURE_ACCESS_TOKEN を使う Provisioner
pub fn provisioner(
    settings: &Settings,
    credentials: CredentialStore,
) -> anyhow::Result<Provisioner<AzureTransport>> {
    let config = AzureConfig::from_env_or(settings.subscription_id.as_deref())?;
    let client = ArmClient::new(AzureTransport::new(config), &settings.resource_group)
        .with_api_version(&settings.api_version);

    Ok(Provisioner::new(
        client,
        StatusReconciler::new(default_login(settings)),
        credentials,
    )
    .with_builder(template_builder(settings))
    .with_poll_config(PollConfig::new(
        settings.polling.interval(),
        settings.polling.deadline(),
    )))
}

pub fn print_node(node: &NodeMetadata) {
    let status = match node.status {
        NodeStatus::Running => node.status.to_string().green(),
        NodeStatus::Pending => node.status.to_string().yellow(),
        NodeStatus::Suspended => node.status.to_string().blue(),
        NodeStatus::Error | NodeStatus::Terminated => node.status.to_string().red(),
        NodeStatus::Unrecognized => node.status.to_string().dimmed(),
    };

    println!("{}", node.name.cyan().bold());
    println!("  ステータス: {}", status);
    println!(
        "  グループ:   {}",
        node.group.as_deref().unwrap_or("(なし)")
    );
    match node.public_addresses.first() {
        Some(address) => println!("  パブリックIP: {}", address),
        None => println!("  パブリックIP: {}", "(未割り当て)".dimmed()),
    }
    println!("  ログイン:   {}", node.credentials.user);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_spec_from_settings() {
        let mut settings = Settings::default();
        settings.default_login.password = Some("from-file".to_string());
        settings.node.vm_size = "Standard_D1".to_string();

        let spec = node_spec(&settings, "web-01a", None, None);
        assert_eq!(spec.name, "web-01a");
        assert_eq!(spec.admin_username, "azureuser");
        assert_eq!(spec.admin_password, "from-file");
        assert_eq!(spec.vm_size, "Standard_D1");
        assert_eq!(spec.image.sku, "12.04.5-LTS");
    }

    #[test]
    fn test_node_spec_flags_override_settings() {
        let mut settings = Settings::default();
        settings.default_login.password = Some("from-file".to_string());

        let spec = node_spec(
            &settings,
            "web-01a",
            Some("from-flag".to_string()),
            Some("Standard_A1".to_string()),
        );
        assert_eq!(spec.admin_password, "from-flag");
        assert_eq!(spec.vm_size, "Standard_A1");
    }
}
