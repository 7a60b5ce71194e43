//! Windows 服务运行状态查询（基于 `windows-service` crate）。
//!
//! 权限要求：
//! - 仅需 `SERVICE_QUERY_STATUS`，普通用户即可查询
//!
//! 作者：ZDP 工具项目组
//! 创建时间：2026-10-19
//! 修改时间：2026-10-19

use anyhow::Result;

/// 查询服务是否处于运行状态。
///
/// 返回值：
/// - `Ok(true)`：当前状态为 Running
/// - `Ok(false)`：已安装但处于其他状态（停止、启动中等）
///
/// 异常处理：
/// - 打开服务管理器/服务失败（服务不存在、权限不足）或查询失败时返回错误
#[cfg(windows)]
pub fn service_running(service_name: &str) -> Result<bool> {
    use anyhow::Context;
    use windows_service::service::{ServiceAccess, ServiceState};
    use windows_service::service_manager::{ServiceManager, ServiceManagerAccess};

    let service_manager = ServiceManager::local_computer(None::<&str>, ServiceManagerAccess::CONNECT)
        .context("打开 ServiceManager 失败")?;
    let service = service_manager
        .open_service(service_name, ServiceAccess::QUERY_STATUS)
        .with_context(|| format!("打开服务失败: {service_name}"))?;
    let status = service
        .query_status()
        .with_context(|| format!("查询服务状态失败: {service_name}"))?;
    tracing::debug!("服务 {service_name} 状态: {:?}", status.current_state);
    Ok(status.current_state == ServiceState::Running)
}

#[cfg(not(windows))]
pub fn service_running(service_name: &str) -> Result<bool> {
    anyhow::bail!("当前平台不支持查询 Windows 服务: {service_name}")
}
