//! 产品版本汇总。单个产品读取失败时记为 `Not Found`，汇总本身从不失败。
//!
//! 作者：ZDP 工具项目组
//! 创建时间：2026-10-19
//! 修改时间：2026-10-19

use std::path::Path;

use serde::Serialize;
use tracing::warn;

use crate::config::ProductBinaries;

/// 无法读取版本时的占位值。
pub const NOT_FOUND: &str = "Not Found";

/// 三个产品的版本。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AllVersions {
    pub zdp: String,
    pub zcc: String,
    pub zep: String,
}

/// 读取三个产品主程序的版本。
///
/// 参数：
/// - `binaries`：产品主程序路径
/// - `reader`：读取单个可执行文件版本的函数（Windows 下为版本资源读取）
pub fn collect_versions<F>(binaries: &ProductBinaries, reader: F) -> AllVersions
where
    F: Fn(&Path) -> anyhow::Result<String>,
{
    let read = |product: &str, path: &Path| match reader(path) {
        Ok(version) => version,
        Err(e) => {
            warn!("读取 {product} 版本失败 ({}): {e:#}", path.display());
            NOT_FOUND.to_string()
        }
    };
    AllVersions {
        zdp: read("ZDP", &binaries.zdp),
        zcc: read("ZCC", &binaries.zcc),
        zep: read("ZEP", &binaries.zep),
    }
}
