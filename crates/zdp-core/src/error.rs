//! 统一错误类型。
//!
//! 分类（见 [`ErrorKind`]）：
//! - 前置条件错误：缺少分类器、无效配置选项、配置目录为空，立即返回，不调用任何辅助程序
//! - 传输错误：本机管理 API 不可达/超时
//! - 辅助程序执行错误：携带退出原因与捕获的输出文本，调用方可继续从输出中提取信息
//! - 语义错误：辅助程序可运行但结果不可用（空 OTP）或输出表明密钥文件受保护
//! - IO 错误：读取受保护文件签名、扫描目录、写临时文件失败
//!
//! 作者：ZDP 工具项目组
//! 创建时间：2026-10-19
//! 修改时间：2026-10-19

use std::path::PathBuf;

use thiserror::Error;

/// 本库的 `Result` 别名。
pub type Result<T> = std::result::Result<T, ZdpError>;

/// 核心库错误。
///
/// 注意：
/// - `HelperFailed` 的显示文本总是包含辅助程序输出，密钥文件错误的识别依赖这一点
/// - 错误文本不会包含 OTP 明文
#[derive(Debug, Error)]
pub enum ZdpError {
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
    #[error("获取本机标识失败: {0}")]
    HostIdentity(String),
    #[error("释放辅助程序失败 ({helper}): {source}")]
    HelperExtract {
        helper: String,
        #[source]
        source: std::io::Error,
    },
    #[error("辅助程序 '{helper}' 执行失败: {reason}\nOutput: {output}")]
    HelperFailed {
        helper: String,
        reason: String,
        output: String,
    },
    #[error("生成 OTP 失败: {0}")]
    OtpGeneration(#[source] Box<ZdpError>),
    #[error("{helper} 返回了空 OTP")]
    EmptyOtp { helper: String },
    #[error("密钥文件读取失败（key file read error）：防篡改已启用，请先禁用防篡改后再解除混淆")]
    KeyFileLocked,
    #[error("解除混淆失败 ({target}): {source}")]
    Deobfuscate {
        target: String,
        #[source]
        source: Box<ZdpError>,
    },
    #[error("未找到分类器可执行文件: {}", .0.display())]
    ClassifierNotFound(PathBuf),
    #[error("无效的配置选项: {0}")]
    InvalidConfigOption(String),
    #[error("获取最新配置文件失败: {0}")]
    LatestConfig(#[source] Box<ZdpError>),
    #[error("目录中未找到 json 文件: {}", .0.display())]
    NoConfigFiles(PathBuf),
    #[error("输出中未找到 DLP SDK 版本，且分类器执行失败: {0}")]
    VersionNotFound(#[source] Box<ZdpError>),
    #[error("{transport} 请求失败 ({url}): {source}")]
    Transport {
        transport: &'static str,
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// 错误大类，供入口层决定提示方式。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Precondition,
    Transport,
    HelperExecution,
    Semantic,
    Io,
}

impl ZdpError {
    /// 构造带上下文的 IO 错误。
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// 辅助程序失败时捕获到的输出文本（穿透包装层）。
    pub fn captured_output(&self) -> Option<&str> {
        match self {
            Self::HelperFailed { output, .. } => Some(output),
            Self::OtpGeneration(inner)
            | Self::Deobfuscate { source: inner, .. }
            | Self::VersionNotFound(inner) => inner.captured_output(),
            _ => None,
        }
    }

    /// 返回错误所属大类。包装类错误按其被包装的原因归类。
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ClassifierNotFound(_) | Self::InvalidConfigOption(_) | Self::NoConfigFiles(_) => {
                ErrorKind::Precondition
            }
            Self::Transport { .. } => ErrorKind::Transport,
            Self::HelperExtract { .. } | Self::HelperFailed { .. } => ErrorKind::HelperExecution,
            Self::EmptyOtp { .. } | Self::KeyFileLocked | Self::HostIdentity(_) => {
                ErrorKind::Semantic
            }
            Self::Io { .. } => ErrorKind::Io,
            Self::OtpGeneration(inner)
            | Self::Deobfuscate { source: inner, .. }
            | Self::LatestConfig(inner)
            | Self::VersionNotFound(inner) => inner.kind(),
        }
    }
}
