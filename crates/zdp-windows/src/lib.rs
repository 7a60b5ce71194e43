//! Windows 平台能力封装（服务状态查询、可执行文件版本资源读取）。
//!
//! 目标：
//! - 将 Win32 细节集中封装，核心库与入口层只看到 `anyhow::Result`
//! - 非 Windows 目标同样可编译：对应函数返回“平台不支持”错误
//!
//! 作者：ZDP 工具项目组
//! 创建时间：2026-10-19
//! 修改时间：2026-10-19

pub mod service;
pub mod version;
