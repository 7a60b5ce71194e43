//! 受保护配置文件的混淆检测与解除混淆。
//!
//! 文件格式：
//! - 前 4 字节为 ASCII `ZDPU`：已混淆
//! - 其他：明文 JSON
//!
//! 解除混淆：
//! - 文件已是明文时直接返回成功提示，不调用任何辅助程序（重复调用幂等）
//! - 否则调用 `ZDPObfuscate.exe -d <密钥文件> <目标文件>`，由辅助程序原地改写文件
//! - 防篡改启用时密钥文件本身受保护，辅助程序输出 `key file read error`；该情况单独归类为
//!   [`ZdpError::KeyFileLocked`]，提示操作员先禁用防篡改
//!
//! 注意：
//! - 密钥文件错误的识别依赖辅助程序输出的字面文本，辅助程序改动输出会导致归类失效
//! - 本模块只读取文件签名，从不写入受保护文件
//!
//! 作者：ZDP 工具项目组
//! 创建时间：2026-10-19
//! 修改时间：2026-10-19

use std::fs::File;
use std::io::Read;
use std::path::Path;

use tracing::info;

use crate::config::ToolConfig;
use crate::error::{Result, ZdpError};
use crate::helper::{Helper, HelperRunner};

/// 混淆文件签名。
pub const OBFUSCATION_SIGNATURE: &[u8; 4] = b"ZDPU";

/// 辅助程序在无法读取密钥文件时输出的文本。
pub const KEY_FILE_ERROR_MARKER: &str = "key file read error";

/// 文件已是明文时的提示。
pub const ALREADY_DEOBFUSCATED: &str = "File is already de-obfuscated.";

/// 受保护的配置文件。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtectedFile {
    /// `zdp_endpoint_settings_ootb.json`
    OotbSettings,
    /// `zdp_modes.json`
    ZdpModes,
}

impl ProtectedFile {
    /// 配置中的文件路径。
    pub fn path(self, config: &ToolConfig) -> &Path {
        match self {
            ProtectedFile::OotbSettings => &config.ootb_settings_file,
            ProtectedFile::ZdpModes => &config.zdp_modes_file,
        }
    }

    /// 用于错误信息的名称。
    pub fn label(self) -> &'static str {
        match self {
            ProtectedFile::OotbSettings => "ootb-settings",
            ProtectedFile::ZdpModes => "zdp-modes",
        }
    }
}

/// 判断文件是否处于混淆状态。
///
/// 返回值：
/// - `Ok(true)`：前 4 字节等于 `ZDPU`
/// - `Ok(false)`：其他内容
///
/// 异常处理：
/// - 打开失败或不足 4 字节时返回 [`ZdpError::Io`]，不会当作“未混淆”
pub fn is_obfuscated(path: &Path) -> Result<bool> {
    let mut file = File::open(path)
        .map_err(|e| ZdpError::io(format!("打开文件失败: {}", path.display()), e))?;
    let mut signature = [0u8; 4];
    file.read_exact(&mut signature)
        .map_err(|e| ZdpError::io(format!("读取文件失败: {}", path.display()), e))?;
    Ok(&signature == OBFUSCATION_SIGNATURE)
}

/// 混淆控制器。
pub struct ObfuscationController<'a> {
    runner: &'a dyn HelperRunner,
    config: &'a ToolConfig,
}

impl<'a> ObfuscationController<'a> {
    pub fn new(runner: &'a dyn HelperRunner, config: &'a ToolConfig) -> Self {
        Self { runner, config }
    }

    /// 查询受保护文件是否处于混淆状态。
    pub fn is_file_obfuscated(&self, file: ProtectedFile) -> Result<bool> {
        is_obfuscated(file.path(self.config))
    }

    /// 解除受保护文件的混淆。
    ///
    /// 返回值：
    /// - 已是明文：[`ALREADY_DEOBFUSCATED`]
    /// - 解除成功：`File '<path>' de-obfuscated successfully.`
    ///
    /// 异常处理：
    /// - 签名读取失败：[`ZdpError::Io`]
    /// - 辅助程序输出包含 `key file read error`：[`ZdpError::KeyFileLocked`]
    /// - 其他辅助程序失败：[`ZdpError::Deobfuscate`]
    pub fn deobfuscate(&self, file: ProtectedFile) -> Result<String> {
        let path = file.path(self.config);
        if !is_obfuscated(path)? {
            return Ok(ALREADY_DEOBFUSCATED.to_string());
        }

        let key = self.config.key_file.to_string_lossy();
        let target = path.to_string_lossy();
        info!("解除混淆: {}", path.display());
        self.runner
            .run(Helper::ZdpObfuscate, &["-d", &*key, &*target])
            .map_err(|e| classify_failure(file, e))?;
        info!("解除混淆完成: {}", path.display());
        Ok(format!("File '{}' de-obfuscated successfully.", path.display()))
    }
}

fn classify_failure(file: ProtectedFile, err: ZdpError) -> ZdpError {
    if err.to_string().contains(KEY_FILE_ERROR_MARKER) {
        return ZdpError::KeyFileLocked;
    }
    ZdpError::Deobfuscate {
        target: file.label().to_string(),
        source: Box::new(err),
    }
}
