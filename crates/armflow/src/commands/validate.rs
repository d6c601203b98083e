use armflow_config::Settings;
use colored::Colorize;

pub async fn handle(settings: &Settings, node: &str) -> anyhow::Result<()> {
    println!("{}", "テンプレートを検証中...".blue());

    let spec = super::node_spec(settings, node, None, None);
    match super::template_builder(settings).build(&spec) {
        Ok(template) => {
            println!("{}", "✓ テンプレートは正常です！".green().bold());
            println!();
            println!("サマリー:");
            println!("  リソース: {}個", template.resources.len());
            for resource in &template.resources {
                let depends = if resource.depends_on.is_empty() {
                    String::new()
                } else {
                    format!(" (依存: {}個)", resource.depends_on.len())
                };
                println!("    - {}{}", resource.resource_type.cyan(), depends);
            }
            println!("  変数: {}個", template.variables.len());
        }
        Err(e) => {
            eprintln!();
            eprintln!("{}", "✗ テンプレートエラー".red().bold());
            eprintln!("  {}", e);
            std::process::exit(1);
        }
    }

    Ok(())
}
