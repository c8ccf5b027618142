use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::de::DeserializeOwned;
use tracing::info;

use inspector_config::AppConfig;
use inspector_domain::{InspectTask, Node, Rule};
use kube_inspector::{init_logging, plan};

/// 巡检编排引擎命令行工具
#[derive(Parser, Debug)]
#[command(name = "inspector")]
#[command(version = "1.0.0")]
#[command(about = "Kubernetes集群巡检编排引擎")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 离线计算任务的Job计划
    Plan(PlanArgs),
    /// 配置管理
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Args, Debug)]
struct PlanArgs {
    /// 规则列表 (JSON数组)
    #[arg(long)]
    rules: PathBuf,
    /// 巡检任务 (JSON)
    #[arg(long)]
    task: PathBuf,
    /// 节点列表 (JSON数组)
    #[arg(long)]
    nodes: PathBuf,
    /// 配置文件路径
    #[arg(short, long)]
    config: Option<String>,
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// 验证并打印生效的配置
    Check {
        /// 配置文件路径
        #[arg(short, long)]
        config: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Plan(args) => run_plan(args),
        Commands::Config {
            action: ConfigAction::Check { config },
        } => check_config(config.as_deref()),
    }
}

fn run_plan(args: PlanArgs) -> Result<()> {
    let config = AppConfig::load(args.config.as_deref()).context("加载配置失败")?;
    init_logging(&config.observability)?;

    let rules: Vec<Rule> = read_json(&args.rules)?;
    let task: InspectTask = read_json(&args.task)?;
    let nodes: Vec<Node> = read_json(&args.nodes)?;
    info!(
        "任务 {}: {} 条规则，{} 个节点",
        task.name(),
        rules.len(),
        nodes.len()
    );

    let plan = plan(&rules, &task, &nodes).context("计算Job计划失败")?;
    println!("{}", serde_json::to_string_pretty(&plan)?);
    Ok(())
}

fn check_config(path: Option<&str>) -> Result<()> {
    let config = AppConfig::load(path).context("配置验证失败")?;
    println!("配置有效");
    println!("{}", config.to_toml()?);
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let data = std::fs::read(path).with_context(|| format!("读取文件失败: {}", path.display()))?;
    serde_json::from_slice(&data).with_context(|| format!("解析JSON失败: {}", path.display()))
}
