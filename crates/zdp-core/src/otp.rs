//! 一次性口令（OTP）生成。
//!
//! 流程：
//! - 读取本机标识（主机名），失败原样返回
//! - 以本机标识为唯一参数调用 `OTPGenerator.exe`，期望输出 `OTP:<value>`
//! - 去掉前缀与首尾空白后为空，视为“辅助程序可运行但结果不可用”，与执行失败区分
//!
//! 安全注意：
//! - OTP 仅用于当次特权操作，不缓存、不落盘、不写日志
//!
//! 作者：ZDP 工具项目组
//! 创建时间：2026-10-19
//! 修改时间：2026-10-19

use sysinfo::System;
use tracing::debug;

use crate::error::{Result, ZdpError};
use crate::helper::{Helper, HelperRunner};

/// 生成器输出前缀。
pub const OTP_PREFIX: &str = "OTP:";

/// 本机标识来源。
pub trait HostIdentity {
    fn host_identity(&self) -> Result<String>;
}

/// 以系统主机名作为本机标识。
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemHostIdentity;

impl HostIdentity for SystemHostIdentity {
    fn host_identity(&self) -> Result<String> {
        System::host_name()
            .filter(|name| !name.is_empty())
            .ok_or_else(|| ZdpError::HostIdentity("系统未返回主机名".to_string()))
    }
}

/// OTP 提供者。每次调用都重新读取本机标识并重新生成。
pub struct OtpProvider<'a> {
    runner: &'a dyn HelperRunner,
    identity: &'a dyn HostIdentity,
}

impl<'a> OtpProvider<'a> {
    pub fn new(runner: &'a dyn HelperRunner, identity: &'a dyn HostIdentity) -> Self {
        Self { runner, identity }
    }

    /// 生成 OTP。
    ///
    /// 异常处理：
    /// - 本机标识读取失败：原样返回
    /// - 生成器执行失败：[`ZdpError::OtpGeneration`]
    /// - 生成器输出为空：[`ZdpError::EmptyOtp`]
    pub fn get_otp(&self) -> Result<String> {
        let host = self.identity.host_identity()?;
        let output = self
            .runner
            .run(Helper::OtpGenerator, &[host.as_str()])
            .map_err(|e| ZdpError::OtpGeneration(Box::new(e)))?;
        let otp = parse_otp(&output).ok_or_else(|| ZdpError::EmptyOtp {
            helper: Helper::OtpGenerator.file_name().to_string(),
        })?;
        debug!("OTP 已生成");
        Ok(otp)
    }
}

/// 从生成器输出中取出 OTP。
///
/// 返回值：
/// - 去掉 `OTP:` 前缀并修剪空白后的值；为空时返回 `None`
pub fn parse_otp(output: &str) -> Option<String> {
    let value = output.strip_prefix(OTP_PREFIX).unwrap_or(output).trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}
