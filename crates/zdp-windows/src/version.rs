//! 可执行文件版本资源读取（`version.dll`）。
//!
//! 读取 `VS_FIXEDFILEINFO` 中的产品版本（不是文件版本），格式化为 `major.minor.patch.build`。
//!
//! 作者：ZDP 工具项目组
//! 创建时间：2026-10-19
//! 修改时间：2026-10-19

use std::path::Path;

use anyhow::Result;

/// 将产品版本的高低两个 DWORD 格式化为四段版本号。
pub fn format_product_version(ms: u32, ls: u32) -> String {
    format!("{}.{}.{}.{}", ms >> 16, ms & 0xffff, ls >> 16, ls & 0xffff)
}

/// 读取可执行文件的产品版本。
///
/// 参数：
/// - `path`：可执行文件路径
///
/// 异常处理：
/// - 文件不存在、没有版本资源、资源中无根块时返回错误
///
/// 内存说明：
/// - `VerQueryValueW` 返回的指针指向 `data` 缓冲区内部，读取完成前 `data` 必须存活
#[cfg(windows)]
pub fn product_version(path: &Path) -> Result<String> {
    use anyhow::{bail, Context};
    use windows::core::{w, HSTRING};
    use windows::Win32::Storage::FileSystem::{
        GetFileVersionInfoSizeW, GetFileVersionInfoW, VerQueryValueW, VS_FIXEDFILEINFO,
    };

    let file = HSTRING::from(path.as_os_str());
    unsafe {
        let size = GetFileVersionInfoSizeW(&file, None);
        if size == 0 {
            bail!(
                "获取版本信息大小失败 ({}): {}",
                path.display(),
                std::io::Error::last_os_error()
            );
        }

        let mut data = vec![0u8; size as usize];
        GetFileVersionInfoW(&file, 0, size, data.as_mut_ptr().cast())
            .with_context(|| format!("读取版本信息失败: {}", path.display()))?;

        let mut info: *mut core::ffi::c_void = std::ptr::null_mut();
        let mut len = 0u32;
        let found = VerQueryValueW(data.as_ptr().cast(), w!("\\"), &mut info, &mut len);
        if !found.as_bool() || info.is_null() || (len as usize) < std::mem::size_of::<VS_FIXEDFILEINFO>() {
            bail!("版本资源中缺少固定版本信息: {}", path.display());
        }
        let fixed = &*(info as *const VS_FIXEDFILEINFO);
        Ok(format_product_version(fixed.dwProductVersionMS, fixed.dwProductVersionLS))
    }
}

#[cfg(not(windows))]
pub fn product_version(path: &Path) -> Result<String> {
    anyhow::bail!("当前平台不支持读取版本资源: {}", path.display())
}
