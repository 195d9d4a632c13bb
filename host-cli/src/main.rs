//! vn-play - 无界面脚本播放器
//!
//! 读取 `.vns` 文本脚本，以固定帧长驱动引擎，把事件流逐行输出为 JSON。
//! 日志写到 stderr，stdout 只有事件。

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use host_cli::{FileSaveStore, HostConfig, InputSource, Player};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use vn_engine::{AssetManifest, Director, SaveStore, Script};

#[derive(Parser)]
#[command(name = "vn-play")]
#[command(about = "无界面脚本播放器 - 以 JSON 行输出事件流")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// 配置文件路径（默认：config.json）
    #[arg(short, long, default_value = "config.json", global = true)]
    config: PathBuf,

    /// 日志级别，RUST_LOG 优先
    #[arg(long, default_value = "info", global = true)]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// 播放脚本
    Run(RunArgs),

    /// 列出存档槽位
    Saves,
}

#[derive(Args)]
struct RunArgs {
    /// 脚本路径（默认取配置文件中的 script_path）
    script: Option<PathBuf>,

    /// 输入轨迹文件（JSON 数组），不指定时自动推进
    #[arg(short, long)]
    inputs: Option<PathBuf>,

    /// 结束时保存到该槽位
    #[arg(long)]
    save_slot: Option<u32>,

    /// 从该槽位读档后继续播放
    #[arg(long)]
    load_slot: Option<u32>,

    /// 最大帧数
    #[arg(long, default_value = "100000")]
    max_frames: u64,

    /// 快进模式（覆盖配置文件）
    #[arg(long)]
    skip: bool,
}

fn init_tracing(level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        )
        .with_writer(io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    if let Err(e) = real_main(cli) {
        error!("{e:#}");
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn real_main(cli: Cli) -> anyhow::Result<()> {
    let config = HostConfig::load(&cli.config)?;

    match cli.command {
        Commands::Run(args) => run(&config, args),
        Commands::Saves => {
            let store = FileSaveStore::new(&config.saves_dir);
            for slot in store.list_slots() {
                let data = store.load(slot)?;
                println!(
                    "slot {:03}  label={}  time={}",
                    slot,
                    data.metadata.label.as_deref().unwrap_or("-"),
                    data.metadata.timestamp.as_deref().unwrap_or("-")
                );
            }
            Ok(())
        }
    }
}

fn load_script(path: &Path) -> anyhow::Result<Arc<Script<()>>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("无法读取脚本: {}", path.display()))?;
    let script_id = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "main".to_string());

    let mut parser = vn_engine::Parser::new();
    let script: Script<()> = parser
        .parse(&script_id, &text)
        .with_context(|| format!("脚本解析失败: {}", path.display()))?;
    for warning in parser.warnings() {
        warn!(script = %script_id, "{warning}");
    }

    info!(script = %script_id, instructions = script.len(), "脚本加载成功");
    Ok(Arc::new(script))
}

fn run(config: &HostConfig, args: RunArgs) -> anyhow::Result<()> {
    let script_path = args
        .script
        .or_else(|| config.script_path.clone())
        .context("未指定脚本路径（命令行参数或配置文件 script_path）")?;
    let script = load_script(&script_path)?;

    let mut store = FileSaveStore::new(&config.saves_dir);
    let mut director = match args.load_slot {
        Some(slot) => {
            let data = store.load(slot)?;
            Director::restore(Arc::clone(&script), &data, config.engine.clone())?
        }
        None => {
            let settings = config.settings.clone();
            match &config.asset_manifest {
                Some(path) => {
                    let json = fs::read_to_string(path)
                        .with_context(|| format!("无法读取资源清单: {}", path.display()))?;
                    let manifest = AssetManifest::from_json(&json)
                        .with_context(|| format!("无法解析资源清单: {}", path.display()))?;
                    Director::with_validation(
                        Arc::clone(&script),
                        (),
                        &manifest,
                        settings,
                        config.engine.clone(),
                    )?
                }
                None => Director::with_config(
                    Arc::clone(&script),
                    (),
                    settings,
                    config.engine.clone(),
                ),
            }
        }
    };
    if args.skip {
        director.set_skip_mode(true);
    }

    let mut inputs = match &args.inputs {
        Some(path) => InputSource::from_trace_file(path)?,
        None => InputSource::Auto {
            default_text: config.default_text.clone(),
        },
    };

    let mut player = Player::new(config.frame_ms, args.max_frames, io::stdout().lock());
    let outcome = player.play(&mut director, &mut inputs)?;
    info!(frames = outcome.frames, reason = ?outcome.reason, "播放完成");

    if let Some(slot) = args.save_slot {
        store.save(&director.save(slot))?;
    }
    Ok(())
}
