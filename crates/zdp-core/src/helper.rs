//! 内置辅助程序的释放与执行。
//!
//! 执行模型：
//! - 每次调用创建独立的临时目录，将辅助程序载荷写入 `<dir>\<文件名>` 后执行
//! - 标准输出与标准错误写入同一个匿名捕获文件，按实际写入顺序合并
//! - 临时目录由 [`tempfile::TempDir`] 持有，任何返回路径（成功/辅助程序失败/释放失败）都会删除
//! - 单次同步调用，无超时、无重试，依赖辅助程序自行退出
//!
//! 载荷来源：
//! - 构建时设置 `ZDP_BUNDLE_DIR`：载荷嵌入二进制（见 `build.rs`）
//! - 否则运行时从辅助程序目录读取
//!
//! 作者：ZDP 工具项目组
//! 创建时间：2026-10-19
//! 修改时间：2026-10-19

use std::borrow::Cow;
use std::fmt;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::{debug, warn};

use crate::config::ToolConfig;
use crate::error::{Result, ZdpError};

/// 默认分类器配置文件名（与辅助程序放在同一目录）。
pub const DEFAULT_CLASSIFIER_CONFIG: &str = "dlp_config_dlp_sdk.json";

/// 嵌入式载荷（由 `build.rs` 生成的常量填充）。
#[allow(dead_code)]
struct EmbeddedBundle {
    otp_generator: &'static [u8],
    zep_sdk_invoke_otp: &'static [u8],
    zdp_obfuscate: &'static [u8],
    default_classifier_config: &'static [u8],
}

include!(concat!(env!("OUT_DIR"), "/bundle.rs"));

/// 内置辅助程序。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Helper {
    /// 以本机标识生成 OTP。
    OtpGenerator,
    /// 查询/设置防篡改模式。
    ZepSdkInvokeOtp,
    /// 配置文件混淆/解除混淆。
    ZdpObfuscate,
}

impl Helper {
    /// 释放到临时目录时使用的文件名。
    pub fn file_name(self) -> &'static str {
        match self {
            Helper::OtpGenerator => "OTPGenerator.exe",
            Helper::ZepSdkInvokeOtp => "ZEPSdkInvokeOTP.exe",
            Helper::ZdpObfuscate => "ZDPObfuscate.exe",
        }
    }
}

impl fmt::Display for Helper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name())
    }
}

/// 辅助程序执行能力。
///
/// 控制器只依赖该 trait，测试中可替换为假实现。
pub trait HelperRunner {
    /// 执行辅助程序并返回合并后的输出文本。
    ///
    /// 异常处理：
    /// - 释放失败：[`ZdpError::HelperExtract`]
    /// - 启动失败或退出码非 0：[`ZdpError::HelperFailed`]，携带已捕获的输出
    fn run(&self, helper: Helper, args: &[&str]) -> Result<String>;
}

/// 载荷来源。
#[derive(Debug, Clone)]
pub struct HelperSource {
    kind: SourceKind,
}

#[derive(Debug, Clone)]
enum SourceKind {
    Embedded,
    Directory(PathBuf),
}

impl HelperSource {
    /// 从目录读取载荷。
    pub fn directory(dir: impl Into<PathBuf>) -> Self {
        Self {
            kind: SourceKind::Directory(dir.into()),
        }
    }

    /// 嵌入式载荷；构建时未嵌入则返回 `None`。
    pub fn embedded() -> Option<Self> {
        EMBEDDED.as_ref().map(|_| Self {
            kind: SourceKind::Embedded,
        })
    }

    /// 按配置选择来源：显式配置的 `helper_dir` 优先，其次嵌入式，最后默认辅助程序目录。
    ///
    /// 异常处理：
    /// - 需要解析默认辅助程序目录但无法获取当前 exe 路径时返回错误
    pub fn from_config(config: &ToolConfig) -> anyhow::Result<Self> {
        if let Some(dir) = &config.helper_dir {
            return Ok(Self::directory(dir.clone()));
        }
        if let Some(source) = Self::embedded() {
            return Ok(source);
        }
        Ok(Self::directory(config.resolve_helper_dir()?))
    }

    /// 读取辅助程序载荷。
    ///
    /// 异常处理：
    /// - 目录来源下文件不存在/不可读时返回 [`ZdpError::Io`]
    pub fn payload(&self, helper: Helper) -> Result<Cow<'static, [u8]>> {
        self.load(helper.file_name(), |bundle| match helper {
            Helper::OtpGenerator => bundle.otp_generator,
            Helper::ZepSdkInvokeOtp => bundle.zep_sdk_invoke_otp,
            Helper::ZdpObfuscate => bundle.zdp_obfuscate,
        })
    }

    /// 读取默认分类器配置。
    pub fn default_classifier_config(&self) -> Result<Cow<'static, [u8]>> {
        self.load(DEFAULT_CLASSIFIER_CONFIG, |bundle| {
            bundle.default_classifier_config
        })
    }

    fn load(
        &self,
        file_name: &str,
        pick: impl FnOnce(&'static EmbeddedBundle) -> &'static [u8],
    ) -> Result<Cow<'static, [u8]>> {
        match &self.kind {
            SourceKind::Embedded => match EMBEDDED.as_ref() {
                Some(bundle) => Ok(Cow::Borrowed(pick(bundle))),
                None => Err(ZdpError::io(
                    format!("嵌入式载荷不可用: {file_name}"),
                    std::io::ErrorKind::NotFound.into(),
                )),
            },
            SourceKind::Directory(dir) => {
                let path = dir.join(file_name);
                std::fs::read(&path)
                    .map(Cow::Owned)
                    .map_err(|e| ZdpError::io(format!("读取载荷失败: {}", path.display()), e))
            }
        }
    }
}

/// 释放载荷到私有临时目录后执行的 [`HelperRunner`] 实现。
#[derive(Debug, Clone)]
pub struct ExtractingRunner {
    source: HelperSource,
    temp_root: PathBuf,
}

impl ExtractingRunner {
    /// 参数：
    /// - `source`：载荷来源
    /// - `temp_root`：临时目录的父目录
    pub fn new(source: HelperSource, temp_root: impl Into<PathBuf>) -> Self {
        Self {
            source,
            temp_root: temp_root.into(),
        }
    }

    pub fn source(&self) -> &HelperSource {
        &self.source
    }
}

impl HelperRunner for ExtractingRunner {
    fn run(&self, helper: Helper, args: &[&str]) -> Result<String> {
        let payload = self.source.payload(helper)?;
        run_embedded(&self.temp_root, &payload, helper.file_name(), args)
    }
}

/// 将载荷写入新建的临时目录并执行。
///
/// 参数：
/// - `temp_root`：临时目录的父目录
/// - `payload`：可执行文件字节
/// - `name`：释放后的文件名
/// - `args`：命令行参数
///
/// 返回值：
/// - 成功：合并后的输出文本
///
/// 注意：
/// - 参数可能包含 OTP，日志只记录参数个数
pub fn run_embedded(temp_root: &Path, payload: &[u8], name: &str, args: &[&str]) -> Result<String> {
    let dir = tempfile::Builder::new()
        .prefix("zdp-helper-")
        .tempdir_in(temp_root)
        .map_err(|source| ZdpError::HelperExtract {
            helper: name.to_string(),
            source,
        })?;
    let exe = dir.path().join(name);
    write_executable(&exe, payload).map_err(|source| ZdpError::HelperExtract {
        helper: name.to_string(),
        source,
    })?;

    debug!(helper = name, argc = args.len(), "执行辅助程序");
    let mut cmd = Command::new(&exe);
    cmd.args(args);
    let result = combined_output(&mut cmd, name);
    drop(cmd);

    let dir_path = dir.path().to_path_buf();
    if let Err(e) = dir.close() {
        warn!("删除临时目录失败: {}: {e}", dir_path.display());
    }
    result
}

/// 执行命令并以单一流捕获 stdout 与 stderr。
///
/// 参数：
/// - `cmd`：已设置程序与参数的命令
/// - `name`：用于错误信息的程序名
///
/// 异常处理：
/// - 捕获文件创建/读取失败：[`ZdpError::Io`]
/// - 启动失败或退出码非 0：[`ZdpError::HelperFailed`]
pub fn combined_output(cmd: &mut Command, name: &str) -> Result<String> {
    let mut capture =
        tempfile::tempfile().map_err(|e| ZdpError::io("创建输出捕获文件失败", e))?;
    let stdout = capture
        .try_clone()
        .map_err(|e| ZdpError::io("复制输出捕获句柄失败", e))?;
    let stderr = capture
        .try_clone()
        .map_err(|e| ZdpError::io("复制输出捕获句柄失败", e))?;
    cmd.stdin(Stdio::null())
        .stdout(Stdio::from(stdout))
        .stderr(Stdio::from(stderr));
    hide_window(cmd);

    let status = cmd.status();
    let output = read_capture(&mut capture)?;
    match status {
        Err(e) => Err(ZdpError::HelperFailed {
            helper: name.to_string(),
            reason: format!("启动失败: {e}"),
            output,
        }),
        Ok(status) if status.success() => Ok(output),
        Ok(status) => Err(ZdpError::HelperFailed {
            helper: name.to_string(),
            reason: status.to_string(),
            output,
        }),
    }
}

fn read_capture(capture: &mut File) -> Result<String> {
    let mut bytes = Vec::new();
    capture
        .seek(SeekFrom::Start(0))
        .and_then(|_| capture.read_to_end(&mut bytes))
        .map_err(|e| ZdpError::io("读取输出捕获文件失败", e))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn write_executable(path: &Path, payload: &[u8]) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(payload)?;
    file.sync_all()?;
    drop(file);
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))?;
    }
    Ok(())
}

/// 不为子进程创建控制台窗口。
#[cfg(windows)]
fn hide_window(cmd: &mut Command) {
    use std::os::windows::process::CommandExt;
    const CREATE_NO_WINDOW: u32 = 0x0800_0000;
    cmd.creation_flags(CREATE_NO_WINDOW);
}

#[cfg(not(windows))]
fn hide_window(_cmd: &mut Command) {}
