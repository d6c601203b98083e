use armflow_config::Settings;

pub async fn handle(settings: &Settings, node: &str, vm_size: Option<String>) -> anyhow::Result<()> {
    let spec = super::node_spec(settings, node, None, vm_size);
    let body = super::template_builder(settings).build_body(&spec)?;

    // stdout にはボディのみを出力 (パイプ用)
    println!("{}", serde_json::to_string_pretty(&body)?);
    Ok(())
}
