//! ZDP 本机管理工具核心库（跨平台）。
//!
//! 功能：
//! - 内置辅助程序（helper）的临时释放与执行，合并捕获输出
//! - 基于本机标识生成一次性口令（OTP），并以 OTP 授权防篡改模式切换
//! - 受保护配置文件的混淆检测与解除混淆（错误分类）
//! - 分类器（ZDPClassifier）调用：配置来源解析、输出路径推导、DLP SDK 版本提取
//! - 本机管理 API 查询与产品版本汇总
//!
//! 约定：
//! - 所有控制器通过构造参数接收 [`config::ToolConfig`] 与 [`helper::HelperRunner`]，不使用全局状态
//! - 所有特权修改均委托外部辅助程序完成，本库不直接写入受保护文件
//!
//! 作者：ZDP 工具项目组
//! 创建时间：2026-10-19
//! 修改时间：2026-10-19

pub mod antitamper;
pub mod classifier;
pub mod config;
pub mod details;
pub mod error;
pub mod helper;
pub mod obfuscation;
pub mod otp;
pub mod versions;

pub use error::{Result, ZdpError};

#[cfg(test)]
pub(crate) mod test_support;
