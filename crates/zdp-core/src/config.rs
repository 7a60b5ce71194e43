//! 工具配置与固定路径约定。
//!
//! 说明：
//! - 默认值即产品在 Windows 上的固定安装/数据路径，正常部署无需任何配置文件
//! - 可通过 JSON 配置文件覆盖任意字段（未出现的字段取默认值），用于排障与测试
//! - 配置值在入口处解析一次，随后显式传入各控制器
//!
//! 作者：ZDP 工具项目组
//! 创建时间：2026-10-19
//! 修改时间：2026-10-19

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// ZDP 服务名（服务管理器中的名称）。
pub const SERVICE_NAME: &str = "zdpservice";

/// 本机管理 API 监听端口。
pub const API_PORT: u16 = 9861;

/// 本机管理 API 详情接口路径。
pub const API_DETAILS_PATH: &str = "/api/v1.0/get-zdpe-details";

/// 解除混淆使用的密钥文件。
pub const DEFAULT_KEY_FILE: &str = r"C:\ProgramData\Zscaler\ZDP\Settings\zdp_endpoint_id";

/// OOTB 设置文件。
pub const OOTB_SETTINGS_FILE: &str =
    r"C:\ProgramData\Zscaler\ZDP\Settings\zdp_endpoint_settings_ootb.json";

/// 模式文件。
pub const ZDP_MODES_FILE: &str = r"C:\ProgramData\Zscaler\ZDP\Settings\zdp_modes.json";

/// 分类器安装路径。
pub const CLASSIFIER_EXE: &str = r"C:\Program Files\Zscaler\ZDP\ZDPClassifier.exe";

/// 服务下发的分类器配置目录。
pub const CLASSIFIER_CONFIG_DIR: &str = r"C:\ProgramData\Zscaler\ZDP\Config";

/// 用于探测 DLP SDK 版本的输入文件（服务安装日志）。
pub const INSTALL_LOG: &str = r"C:\ProgramData\Zscaler\ZDP\Logs\zdp_install.log";

/// 辅助程序目录名（相对于当前可执行文件所在目录）。
pub const HELPER_DIR_NAME: &str = "executables";

/// 工具配置根对象。
///
/// 字段说明：
/// - `helper_dir`：辅助程序与默认分类器配置所在目录；为空时取 `<exe 目录>\executables`
/// - `temp_root`：辅助程序临时释放目录的父目录；为空时取系统临时目录
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolConfig {
    pub service_name: String,
    pub api: ApiConfig,
    pub key_file: PathBuf,
    pub ootb_settings_file: PathBuf,
    pub zdp_modes_file: PathBuf,
    pub classifier_exe: PathBuf,
    pub classifier_config_dir: PathBuf,
    pub install_log: PathBuf,
    pub product_binaries: ProductBinaries,
    pub helper_dir: Option<PathBuf>,
    pub temp_root: Option<PathBuf>,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            service_name: SERVICE_NAME.to_string(),
            api: ApiConfig::default(),
            key_file: PathBuf::from(DEFAULT_KEY_FILE),
            ootb_settings_file: PathBuf::from(OOTB_SETTINGS_FILE),
            zdp_modes_file: PathBuf::from(ZDP_MODES_FILE),
            classifier_exe: PathBuf::from(CLASSIFIER_EXE),
            classifier_config_dir: PathBuf::from(CLASSIFIER_CONFIG_DIR),
            install_log: PathBuf::from(INSTALL_LOG),
            product_binaries: ProductBinaries::default(),
            helper_dir: None,
            temp_root: None,
        }
    }
}

impl ToolConfig {
    /// 从 JSON 文件读取配置。
    ///
    /// 参数：
    /// - `path`：配置文件路径
    ///
    /// 异常处理：
    /// - 文件读取失败或 JSON 解析失败返回错误
    pub fn load(path: &Path) -> Result<Self> {
        let bytes =
            std::fs::read(path).with_context(|| format!("读取配置文件失败: {}", path.display()))?;
        serde_json::from_slice(&bytes)
            .with_context(|| format!("解析配置文件 JSON 失败: {}", path.display()))
    }

    /// 解析辅助程序目录。
    ///
    /// 返回值：
    /// - 配置了 `helper_dir`：原样返回
    /// - 否则：当前可执行文件所在目录下的 `executables`
    ///
    /// 异常处理：
    /// - 无法获取当前 exe 路径时返回错误
    pub fn resolve_helper_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.helper_dir {
            return Ok(dir.clone());
        }
        let exe = std::env::current_exe().context("读取当前可执行文件路径失败")?;
        let dir = exe.parent().unwrap_or_else(|| Path::new("."));
        Ok(dir.join(HELPER_DIR_NAME))
    }

    /// 临时释放目录的父目录。
    pub fn temp_root(&self) -> PathBuf {
        self.temp_root.clone().unwrap_or_else(std::env::temp_dir)
    }
}

/// 本机管理 API 地址与超时。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: API_PORT,
            timeout_secs: 5,
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// 版本汇总所读取的三个产品主程序。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductBinaries {
    pub zdp: PathBuf,
    pub zcc: PathBuf,
    pub zep: PathBuf,
}

impl Default for ProductBinaries {
    fn default() -> Self {
        Self {
            zdp: PathBuf::from(r"C:\Program Files\Zscaler\ZDP\ZDPService.exe"),
            zcc: PathBuf::from(r"C:\Program Files\Zscaler\ZSATray\ZSATray.exe"),
            zep: PathBuf::from(r"C:\Program Files\Zscaler\ZEP\ZEPService.exe"),
        }
    }
}
