//! 构建脚本：按需将辅助程序与默认分类器配置嵌入二进制。
//!
//! 说明：
//! - 设置环境变量 `ZDP_BUNDLE_DIR` 指向包含四个载荷文件的目录时，生成 `include_bytes!` 代码
//! - 未设置时生成空常量，运行时改为从配置的辅助程序目录读取
//!
//! 作者：ZDP 工具项目组
//! 创建时间：2026-10-19
//! 修改时间：2026-10-19

use std::env;
use std::fs;
use std::path::Path;

/// (字段名, 文件名)
const PAYLOADS: [(&str, &str); 4] = [
    ("otp_generator", "OTPGenerator.exe"),
    ("zep_sdk_invoke_otp", "ZEPSdkInvokeOTP.exe"),
    ("zdp_obfuscate", "ZDPObfuscate.exe"),
    ("default_classifier_config", "dlp_config_dlp_sdk.json"),
];

fn main() {
    println!("cargo:rerun-if-env-changed=ZDP_BUNDLE_DIR");
    let out_dir = env::var("OUT_DIR").expect("OUT_DIR is set by cargo");
    let dest = Path::new(&out_dir).join("bundle.rs");

    let code = match env::var_os("ZDP_BUNDLE_DIR") {
        Some(dir) => {
            let mut code = String::from("static EMBEDDED: Option<EmbeddedBundle> = Some(EmbeddedBundle {\n");
            for (field, file) in PAYLOADS {
                let path = Path::new(&dir).join(file);
                if !path.is_file() {
                    panic!("ZDP_BUNDLE_DIR 缺少载荷文件: {}", path.display());
                }
                println!("cargo:rerun-if-changed={}", path.display());
                code.push_str(&format!(
                    "    {field}: include_bytes!({:?}),\n",
                    path.display().to_string()
                ));
            }
            code.push_str("});\n");
            code
        }
        None => String::from("static EMBEDDED: Option<EmbeddedBundle> = None;\n"),
    };

    fs::write(&dest, code).expect("write bundle.rs");
}
