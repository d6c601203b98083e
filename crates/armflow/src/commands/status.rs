use armflow_cloud::CredentialStore;
use armflow_config::Settings;

pub async fn handle(settings: &Settings, deployment: &str, json: bool) -> anyhow::Result<()> {
    let provisioner = super::provisioner(settings, CredentialStore::new())?;
    let node = provisioner.status(deployment).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&node)?);
    } else {
        super::print_node(&node);
    }
    Ok(())
}
