//! 防篡改（Anti-Tampering）模式查询与切换。
//!
//! 说明：
//! - 切换：先生成 OTP，再调用 `ZEPSdkInvokeOTP.exe SetATModeEx <0|1> <otp>`，错误原样返回，不重试
//! - 查询：调用 `ZEPSdkInvokeOTP.exe GetATMode`，不携带 OTP
//! - 查询输出既不含 `Enabled` 也不含 `Disabled` 时结果为 `Unknown`，不是错误
//!
//! 作者：ZDP 工具项目组
//! 创建时间：2026-10-19
//! 修改时间：2026-10-19

use std::fmt;

use serde::Serialize;
use tracing::info;

use crate::error::Result;
use crate::helper::{Helper, HelperRunner};
use crate::otp::{HostIdentity, OtpProvider};

/// 观测到的防篡改状态。`Unknown` 只是观测结果，不能作为设置目标。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AtStatus {
    Enabled,
    Disabled,
    Unknown,
}

impl AtStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AtStatus::Enabled => "Enabled",
            AtStatus::Disabled => "Disabled",
            AtStatus::Unknown => "Unknown",
        }
    }

    /// 按 `Enabled` 优先、`Disabled` 其次的顺序匹配查询输出。
    pub fn from_output(output: &str) -> Self {
        if output.contains("Enabled") {
            AtStatus::Enabled
        } else if output.contains("Disabled") {
            AtStatus::Disabled
        } else {
            AtStatus::Unknown
        }
    }
}

impl fmt::Display for AtStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 防篡改控制器。
pub struct AntiTamperController<'a> {
    runner: &'a dyn HelperRunner,
    otp: OtpProvider<'a>,
}

impl<'a> AntiTamperController<'a> {
    pub fn new(runner: &'a dyn HelperRunner, identity: &'a dyn HostIdentity) -> Self {
        Self {
            runner,
            otp: OtpProvider::new(runner, identity),
        }
    }

    pub fn enable(&self) -> Result<()> {
        self.set_mode(true)
    }

    pub fn disable(&self) -> Result<()> {
        self.set_mode(false)
    }

    /// 设置防篡改模式。
    ///
    /// 参数：
    /// - `enable`：`true` 启用（模式码 `1`），`false` 禁用（模式码 `0`）
    ///
    /// 异常处理：
    /// - OTP 生成失败：返回错误，且不会调用模式设置程序
    /// - 模式设置程序失败：原样返回
    pub fn set_mode(&self, enable: bool) -> Result<()> {
        let otp = self.otp.get_otp()?;
        let mode = if enable { "1" } else { "0" };
        info!("设置防篡改模式: {}", if enable { "启用" } else { "禁用" });
        self.runner
            .run(Helper::ZepSdkInvokeOtp, &["SetATModeEx", mode, otp.as_str()])?;
        info!("防篡改模式设置完成");
        Ok(())
    }

    /// 查询当前防篡改状态。
    ///
    /// 异常处理：
    /// - 查询程序执行失败返回错误；输出无法识别时返回 `Unknown`
    pub fn status(&self) -> Result<AtStatus> {
        // 查询不经 OTP 授权，与设置路径不对称；沿用现有辅助程序行为。
        let output = self.runner.run(Helper::ZepSdkInvokeOtp, &["GetATMode"])?;
        Ok(AtStatus::from_output(&output))
    }
}
