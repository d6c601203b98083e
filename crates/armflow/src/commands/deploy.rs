use armflow_cloud::{CredentialStore, LoginCredentials, credential_key};
use armflow_config::Settings;
use colored::Colorize;
use tokio_util::sync::CancellationToken;

pub async fn handle(
    settings: &Settings,
    node: &str,
    admin_password: Option<String>,
    vm_size: Option<String>,
    no_wait: bool,
) -> anyhow::Result<()> {
    let spec = super::node_spec(settings, node, admin_password, vm_size);
    if spec.admin_password.is_empty() {
        anyhow::bail!(
            "管理者パスワードが未指定です。--admin-password か default_login.password を設定してください"
        );
    }

    // このノードのログインは作成時の管理者アカウント
    let credentials = CredentialStore::new();
    credentials.insert(
        credential_key(&spec.name),
        LoginCredentials::new(&spec.admin_username, Some(spec.admin_password.clone())),
    );

    let provisioner = super::provisioner(settings, credentials)?;

    println!(
        "{} {} → {}",
        "デプロイ中:".blue(),
        spec.name.cyan().bold(),
        settings.resource_group
    );

    if no_wait {
        let handle = provisioner.deploy(&spec).await?;
        let state = handle
            .initial_state
            .map(|s| s.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{} {} (状態: {})",
            "✓ 受理されました:".green(),
            handle.name,
            state
        );
        return Ok(());
    }

    // Ctrl-C でポーリングを中断 (リモートのデプロイメントはそのまま)
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            trigger.cancel();
        }
    });

    match provisioner.provision(&spec, &cancel).await {
        Ok(node) => {
            println!("{}", "✓ デプロイ完了".green().bold());
            super::print_node(&node);
            Ok(())
        }
        Err(e) if e.is_timeout() => {
            eprintln!("{}", "✗ タイムアウト".red().bold());
            eprintln!("  {}", e);
            eprintln!("  デプロイメントは継続している可能性があります: armflow status {}", spec.name);
            std::process::exit(2);
        }
        Err(e) => Err(e.into()),
    }
}
