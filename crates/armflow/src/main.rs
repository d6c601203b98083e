mod commands;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "armflow")]
#[command(about = "ARM デプロイメントでノードをプロビジョニング", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// デプロイメントテンプレート (リクエストボディ) を出力
    Template {
        /// ノード名 (デプロイメント名を兼ねる)
        node: String,
        /// VM サイズ (省略時は設定ファイルの値)
        #[arg(long)]
        vm_size: Option<String>,
    },
    /// テンプレートの参照整合性を検証
    Validate {
        /// ノード名
        node: String,
    },
    /// ノードをデプロイ
    Deploy {
        /// ノード名
        node: String,
        /// 管理者パスワード (省略時は default_login.password)
        #[arg(long, env = "ARMFLOW_ADMIN_PASSWORD", hide_env_values = true)]
        admin_password: Option<String>,
        /// VM サイズ (省略時は設定ファイルの値)
        #[arg(long)]
        vm_size: Option<String>,
        /// 受理されたら完了を待たずに終了
        #[arg(long)]
        no_wait: bool,
    },
    /// デプロイメントの状態を表示
    Status {
        /// デプロイメント名
        deployment: String,
        /// JSON で出力
        #[arg(long)]
        json: bool,
    },
    /// バージョン情報を表示
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    // Versionコマンドは設定ファイル不要
    if matches!(cli.command, Commands::Version) {
        println!("armflow {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let settings = armflow_config::load_settings()?;
    tracing::debug!(resource_group = %settings.resource_group, "Settings loaded");

    match cli.command {
        Commands::Template { node, vm_size } => {
            commands::template::handle(&settings, &node, vm_size).await?;
        }
        Commands::Validate { node } => {
            commands::validate::handle(&settings, &node).await?;
        }
        Commands::Deploy {
            node,
            admin_password,
            vm_size,
            no_wait,
        } => {
            commands::deploy::handle(&settings, &node, admin_password, vm_size, no_wait).await?;
        }
        Commands::Status { deployment, json } => {
            commands::status::handle(&settings, &deployment, json).await?;
        }
        Commands::Version => {
            unreachable!("Version is handled before settings loading");
        }
    }

    Ok(())
}
