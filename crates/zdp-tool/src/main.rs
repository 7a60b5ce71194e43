//! ZDP 桌面工具命令行入口。
//!
//! 职责：
//! - 每个子命令对应界面层的一个操作（服务状态、服务详情、防篡改、混淆、分类器、版本等）
//! - 读取 `--config` 指定的 JSON 配置（缺省为标准安装路径），显式传入各控制器
//! - 结果输出到 stdout，日志输出到 stderr
//!
//! 权限要求：
//! - 防篡改切换与解除混淆需要管理员权限（由辅助程序自身校验）
//!
//! 作者：ZDP 工具项目组
//! 创建时间：2026-10-19
//! 修改时间：2026-10-19

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Deserialize;
use tracing::warn;
use zdp_core::antitamper::AntiTamperController;
use zdp_core::classifier::{ClassifierController, ClassifyRequest};
use zdp_core::config::ToolConfig;
use zdp_core::details::{self, Transport};
use zdp_core::helper::{ExtractingRunner, HelperSource};
use zdp_core::obfuscation::{ObfuscationController, ProtectedFile};
use zdp_core::otp::SystemHostIdentity;
use zdp_core::versions;

/// 命令行参数。
#[derive(Debug, Parser)]
#[command(name = "zdp-tool", version)]
struct Cli {
    /// 工具配置文件（JSON）；缺省使用标准安装路径。
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// 服务是否在运行（true/false）。
    ServiceStatus,
    /// 获取服务详情（默认 HTTPS）。
    Details {
        /// 使用明文 HTTP。
        #[arg(long, default_value_t = false)]
        plain: bool,
    },
    /// 查询防篡改状态。
    AtStatus,
    /// 启用防篡改。
    AtEnable,
    /// 禁用防篡改。
    AtDisable,
    /// 受保护文件是否处于混淆状态。
    IsObfuscated {
        #[arg(value_enum)]
        target: Target,
    },
    /// 解除受保护文件的混淆。
    Deobfuscate {
        #[arg(value_enum)]
        target: Target,
    },
    /// 调用分类器扫描文件，输出 JSON。
    Classify {
        #[arg(long)]
        file: PathBuf,
        /// default / last_modified / custom
        #[arg(long)]
        config_option: String,
        /// `custom` 时使用的配置文件。
        #[arg(long)]
        config_path: Option<PathBuf>,
        #[arg(long, default_value_t = false)]
        ocr: bool,
        #[arg(long, default_value_t = false)]
        text: bool,
    },
    /// 查询 DLP SDK 版本。
    DlpVersion,
    /// 查询 ZDP/ZCC/ZEP 版本，输出 JSON。
    Versions,
    /// 读取应用清单中的名称。
    AppName {
        #[arg(long, default_value = "wails.json")]
        manifest: PathBuf,
    },
    /// 输出文件内容。
    ReadFile { path: PathBuf },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Target {
    /// zdp_endpoint_settings_ootb.json
    Settings,
    /// zdp_modes.json
    Modes,
}

impl From<Target> for ProtectedFile {
    fn from(t: Target) -> Self {
        match t {
            Target::Settings => ProtectedFile::OotbSettings,
            Target::Modes => ProtectedFile::ZdpModes,
        }
    }
}

/// 程序入口：初始化日志、加载配置并分发子命令。
///
/// 异常处理：
/// - 子命令失败时返回 `Err`，进程以非零状态退出
fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("info".parse().unwrap()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => ToolConfig::load(path)?,
        None => ToolConfig::default(),
    };

    match cli.command {
        Commands::ServiceStatus => {
            println!("{}", service_status(&config));
            Ok(())
        }
        Commands::Details { plain } => {
            let transport = if plain { Transport::Http } else { Transport::Https };
            let rt = tokio::runtime::Runtime::new().context("创建 tokio runtime 失败")?;
            let body = rt.block_on(details::fetch_details(&config.api, transport))?;
            println!("{body}");
            Ok(())
        }
        Commands::AtStatus => {
            let runner = helper_runner(&config)?;
            let status = AntiTamperController::new(&runner, &SystemHostIdentity).status()?;
            println!("{status}");
            Ok(())
        }
        Commands::AtEnable => set_at_mode(&config, true),
        Commands::AtDisable => set_at_mode(&config, false),
        Commands::IsObfuscated { target } => {
            let runner = helper_runner(&config)?;
            let obfuscated =
                ObfuscationController::new(&runner, &config).is_file_obfuscated(target.into())?;
            println!("{obfuscated}");
            Ok(())
        }
        Commands::Deobfuscate { target } => {
            let runner = helper_runner(&config)?;
            let message = ObfuscationController::new(&runner, &config).deobfuscate(target.into())?;
            println!("{message}");
            Ok(())
        }
        Commands::Classify {
            file,
            config_option,
            config_path,
            ocr,
            text,
        } => {
            let source = HelperSource::from_config(&config)?;
            let request = ClassifyRequest {
                file,
                config_option,
                config_path: config_path.unwrap_or_default(),
                use_ocr: ocr,
                use_text: text,
            };
            let run = ClassifierController::new(&config, &source).classify(&request)?;
            println!("{}", serde_json::to_string_pretty(&run.output)?);
            match run.failure {
                Some(err) => Err(anyhow::Error::new(err).context("分类器执行失败")),
                None => Ok(()),
            }
        }
        Commands::DlpVersion => {
            let source = HelperSource::from_config(&config)?;
            let version = ClassifierController::new(&config, &source).dlp_sdk_version()?;
            println!("{version}");
            Ok(())
        }
        Commands::Versions => {
            let all = versions::collect_versions(
                &config.product_binaries,
                zdp_windows::version::product_version,
            );
            println!("{}", serde_json::to_string_pretty(&all)?);
            Ok(())
        }
        Commands::AppName { manifest } => {
            println!("{}", app_name(&manifest)?);
            Ok(())
        }
        Commands::ReadFile { path } => {
            print!("{}", read_file(&path)?);
            Ok(())
        }
    }
}

fn helper_runner(config: &ToolConfig) -> Result<ExtractingRunner> {
    let source = HelperSource::from_config(config)?;
    Ok(ExtractingRunner::new(source, config.temp_root()))
}

fn set_at_mode(config: &ToolConfig, enable: bool) -> Result<()> {
    let runner = helper_runner(config)?;
    AntiTamperController::new(&runner, &SystemHostIdentity).set_mode(enable)?;
    println!("{}", if enable { "Enabled" } else { "Disabled" });
    Ok(())
}

/// 服务是否在运行；查询失败视为未运行。
fn service_status(config: &ToolConfig) -> bool {
    match zdp_windows::service::service_running(&config.service_name) {
        Ok(running) => running,
        Err(e) => {
            warn!("查询服务状态失败: {e:#}");
            false
        }
    }
}

/// 应用清单（只关心名称）。
#[derive(Debug, Deserialize)]
struct AppManifest {
    name: String,
}

/// 读取应用清单中的 `name` 字段。
///
/// 异常处理：
/// - 文件读取失败或 JSON 解析失败返回错误
fn app_name(manifest: &Path) -> Result<String> {
    let bytes = std::fs::read(manifest)
        .with_context(|| format!("读取应用清单失败: {}", manifest.display()))?;
    let parsed: AppManifest = serde_json::from_slice(&bytes)
        .with_context(|| format!("解析应用清单 JSON 失败: {}", manifest.display()))?;
    Ok(parsed.name)
}

/// 读取文件内容；非 UTF-8 字节按替换字符输出，不视为错误。
fn read_file(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path).with_context(|| format!("读取文件失败: {}", path.display()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
