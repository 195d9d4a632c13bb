//! # xtask - 开发辅助工具
//!
//! 提供本地质量门禁与开发辅助命令。
//!
//! ## 命令
//!
//! - `check-all`: 运行 fmt、clippy、test
//! - `script-check`: 检查脚本文件（语法、label、可达性、资源引用）

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use vn_engine::{AssetManifest, DiagnosticResult, analyze_assets, analyze_script};
use walkdir::WalkDir;
use xshell::{Shell, cmd};

/// 脚本文件扩展名
const SCRIPT_EXTENSION: &str = "vns";

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "开发辅助工具")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 运行 fmt、clippy、test 门禁检查
    CheckAll,

    /// 检查脚本文件
    ///
    /// 不带参数：检查 scripts/ 下所有 .vns 文件
    ScriptCheck {
        /// 指定文件或目录
        path: Option<PathBuf>,

        /// 资源清单（默认：scripts/manifest.json，存在时才检查）
        #[arg(short, long)]
        manifest: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    if let Err(e) = real_main() {
        eprintln!("xtask error: {e:#}");
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn real_main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::CheckAll => check_all(),
        Commands::ScriptCheck { path, manifest } => {
            script_check(path.as_deref(), manifest.as_deref())
        }
    }
}

fn check_all() -> anyhow::Result<()> {
    let sh = Shell::new()?;

    eprintln!("\n==> cargo fmt --all -- --check");
    cmd!(sh, "cargo fmt --all -- --check").run()?;

    eprintln!("\n==> cargo clippy --workspace --all-targets");
    cmd!(sh, "cargo clippy --workspace --all-targets").run()?;

    eprintln!("\n==> cargo test --workspace");
    cmd!(sh, "cargo test --workspace").run()?;

    Ok(())
}

//=============================================================================
// script-check 命令实现
//=============================================================================

/// 默认脚本目录（相对于 workspace root）
const DEFAULT_SCRIPTS_DIR: &str = "scripts";

/// 默认资源清单
const DEFAULT_MANIFEST: &str = "scripts/manifest.json";

/// 脚本检查结果
#[derive(Default)]
struct ScriptCheckResult {
    /// 检查的脚本数量
    scripts_checked: usize,
    /// 解析错误数量
    parse_errors: usize,
    /// 解析警告数量
    parse_warnings: usize,
    /// 诊断结果
    diagnostics: DiagnosticResult,
}

/// 执行脚本检查
fn script_check(path: Option<&Path>, manifest: Option<&Path>) -> anyhow::Result<()> {
    let root = path.unwrap_or_else(|| Path::new(DEFAULT_SCRIPTS_DIR));
    if !root.exists() {
        anyhow::bail!(
            "路径不存在: {}\n请在 workspace 根目录运行，或指定脚本路径",
            root.display()
        );
    }

    let files = collect_script_files(root);
    if files.is_empty() {
        eprintln!("未找到脚本文件（.{SCRIPT_EXTENSION}）");
        return Ok(());
    }

    let manifest = load_manifest(manifest)?;

    eprintln!("==> 检查 {} 个脚本文件...\n", files.len());

    let mut result = ScriptCheckResult::default();
    for file in &files {
        check_script_file(file, manifest.as_ref(), &mut result);
    }

    print_check_result(&result);

    if result.parse_errors > 0 || result.diagnostics.has_errors() {
        anyhow::bail!("脚本检查发现错误");
    }
    Ok(())
}

/// 显式指定的清单必须存在；默认清单不存在时跳过资源检查
fn load_manifest(path: Option<&Path>) -> anyhow::Result<Option<AssetManifest>> {
    let path = match path {
        Some(p) => p,
        None if Path::new(DEFAULT_MANIFEST).exists() => Path::new(DEFAULT_MANIFEST),
        None => return Ok(None),
    };

    let json = fs::read_to_string(path)
        .with_context(|| format!("无法读取资源清单: {}", path.display()))?;
    let manifest = AssetManifest::from_json(&json)
        .with_context(|| format!("无法解析资源清单: {}", path.display()))?;
    Ok(Some(manifest))
}

/// 收集脚本文件（单个文件直接返回）
fn collect_script_files(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|e| e.into_path())
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == SCRIPT_EXTENSION))
        .collect();
    files.sort();
    files
}

/// 检查单个脚本文件
fn check_script_file(
    file: &Path,
    manifest: Option<&AssetManifest>,
    result: &mut ScriptCheckResult,
) {
    let script_id = file.display().to_string();
    result.scripts_checked += 1;

    let content = match fs::read_to_string(file) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("[ERROR] {}: 无法读取文件 - {}", script_id, e);
            result.parse_errors += 1;
            return;
        }
    };

    let mut parser = vn_engine::Parser::new();
    let script = match parser.parse::<()>(&script_id, &content) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("[ERROR] {}: {}", script_id, e);
            result.parse_errors += 1;
            return;
        }
    };

    for warning in parser.warnings() {
        eprintln!("[WARN] {}: {}", script_id, warning);
        result.parse_warnings += 1;
    }

    result.diagnostics.merge(analyze_script(&script));
    if let Some(manifest) = manifest {
        result.diagnostics.merge(analyze_assets(&script, manifest));
    }
}

/// 输出检查结果
fn print_check_result(result: &ScriptCheckResult) {
    eprintln!("─────────────────────────────────────────────────────");
    eprintln!("检查完成: {} 个脚本", result.scripts_checked);
    eprintln!();

    for diag in &result.diagnostics.diagnostics {
        eprintln!("{}", diag);
    }

    let error_count = result.parse_errors + result.diagnostics.error_count();
    let warn_count = result.parse_warnings + result.diagnostics.warn_count();

    eprintln!();
    if error_count > 0 {
        eprintln!("❌ {} 个错误, {} 个警告", error_count, warn_count);
    } else if warn_count > 0 {
        eprintln!("⚠️  0 个错误, {} 个警告", warn_count);
    } else {
        eprintln!("✅ 检查通过，无错误");
    }
}
