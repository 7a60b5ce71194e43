//! 分类器（ZDPClassifier.exe）调用。
//!
//! 流程：
//! 1) 前置检查：分类器必须存在于安装路径，否则立即失败，不做任何调用
//! 2) 解析配置来源：
//!    - `default`：将内置默认配置写入新建临时目录，调用结束后删除
//!    - `last_modified`：扫描配置目录中修改时间最新的 `*.json`
//!    - `custom`：原样使用调用方给出的路径
//! 3) 组装 `-config <path> -file <path> [-ocr] [-text]` 并直接执行已安装的分类器
//! 4) 按标志推导 OCR/提取文本输出路径（仅推导，不检查是否存在）
//!
//! 分类器失败时仍返回命令行与输出文本（见 [`ClassifierRun`]），DLP SDK 版本提取依赖这一点。
//!
//! 作者：ZDP 工具项目组
//! 创建时间：2026-10-19
//! 修改时间：2026-10-19

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::OnceLock;
use std::time::SystemTime;

use regex::Regex;
use serde::Serialize;
use tempfile::TempDir;
use tracing::{debug, info, warn};

use crate::config::ToolConfig;
use crate::error::{Result, ZdpError};
use crate::helper::{combined_output, HelperSource, DEFAULT_CLASSIFIER_CONFIG};

/// 从分类器输出中提取 DLP SDK 版本的模式。
pub const VERSION_PATTERN: &str = r"DLP SDK version: (.*)";

/// 未能得到版本时的占位值。
pub const UNKNOWN_VERSION: &str = "Unknown";

/// OCR 文本输出后缀。
pub const OCR_TEXT_SUFFIX: &str = ".ocr_text.txt";

/// 提取文本输出后缀。
pub const EXTRACTED_TEXT_SUFFIX: &str = ".extracted_text.txt";

/// 配置来源。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    Default,
    LastModified,
    Custom(PathBuf),
}

impl ConfigSource {
    /// 解析配置选项。
    ///
    /// 参数：
    /// - `option`：`default` / `last_modified` / `custom`
    /// - `custom_path`：`custom` 时使用的路径，不做校验
    ///
    /// 异常处理：
    /// - 其他取值返回 [`ZdpError::InvalidConfigOption`]
    pub fn parse(option: &str, custom_path: &Path) -> Result<Self> {
        match option {
            "default" => Ok(ConfigSource::Default),
            "last_modified" => Ok(ConfigSource::LastModified),
            "custom" => Ok(ConfigSource::Custom(custom_path.to_path_buf())),
            other => Err(ZdpError::InvalidConfigOption(other.to_string())),
        }
    }
}

/// 一次分类请求。
#[derive(Debug, Clone, Default)]
pub struct ClassifyRequest {
    pub file: PathBuf,
    pub config_option: String,
    pub config_path: PathBuf,
    pub use_ocr: bool,
    pub use_text: bool,
}

/// 分类结果（字段名与界面层约定一致）。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifierOutput {
    /// 实际执行的命令行（用于排障）。
    pub command: String,
    /// 合并后的输出文本。
    pub output: String,
    pub ocr_text_path: Option<PathBuf>,
    pub extracted_text_path: Option<PathBuf>,
}

/// 一次分类调用的完整结果：无论分类器成功与否都带有输出。
#[derive(Debug)]
pub struct ClassifierRun {
    pub output: ClassifierOutput,
    pub failure: Option<ZdpError>,
}

impl ClassifierRun {
    /// 分类器失败时返回错误，丢弃输出。
    pub fn into_result(self) -> Result<ClassifierOutput> {
        match self.failure {
            Some(err) => Err(err),
            None => Ok(self.output),
        }
    }
}

/// 已解析的配置文件。`default` 来源的临时目录随该值一起释放。
#[derive(Debug)]
pub struct ResolvedConfig {
    pub path: PathBuf,
    _temp: Option<TempDir>,
}

/// 分类器控制器。
pub struct ClassifierController<'a> {
    config: &'a ToolConfig,
    source: &'a HelperSource,
}

impl<'a> ClassifierController<'a> {
    /// 参数：
    /// - `config`：工具配置（分类器路径、配置目录、临时目录）
    /// - `source`：内置默认分类器配置的来源
    pub fn new(config: &'a ToolConfig, source: &'a HelperSource) -> Self {
        Self { config, source }
    }

    /// 执行一次分类。
    ///
    /// 返回值：
    /// - `Ok(run)`：分类器已执行；`run.failure` 记录分类器自身的失败
    ///
    /// 异常处理：
    /// - 分类器不存在：[`ZdpError::ClassifierNotFound`]
    /// - 配置选项无效：[`ZdpError::InvalidConfigOption`]
    /// - 配置解析失败（临时文件写入失败/目录中无 json）：对应错误
    pub fn classify(&self, request: &ClassifyRequest) -> Result<ClassifierRun> {
        let exe = &self.config.classifier_exe;
        if !exe.exists() {
            return Err(ZdpError::ClassifierNotFound(exe.clone()));
        }

        let source = ConfigSource::parse(&request.config_option, &request.config_path)?;
        let resolved = self.resolve_config(&source)?;
        debug!("分类器配置: {}", resolved.path.display());

        let mut args = vec![
            "-config".to_string(),
            resolved.path.to_string_lossy().into_owned(),
            "-file".to_string(),
            request.file.to_string_lossy().into_owned(),
        ];
        if request.use_ocr {
            args.push("-ocr".to_string());
        }
        if request.use_text {
            args.push("-text".to_string());
        }
        let command = format!("{} {}", exe.display(), args.join(" "));

        let name = exe
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| exe.display().to_string());
        let mut cmd = Command::new(exe);
        cmd.args(&args);
        let (output, failure) = match combined_output(&mut cmd, &name) {
            Ok(text) => (text, None),
            Err(err) => {
                warn!("分类器执行失败: {err}");
                (err.captured_output().unwrap_or_default().to_string(), Some(err))
            }
        };
        drop(resolved);

        Ok(ClassifierRun {
            output: ClassifierOutput {
                command,
                output,
                ocr_text_path: request
                    .use_ocr
                    .then(|| with_suffix(&request.file, OCR_TEXT_SUFFIX)),
                extracted_text_path: request
                    .use_text
                    .then(|| with_suffix(&request.file, EXTRACTED_TEXT_SUFFIX)),
            },
            failure,
        })
    }

    /// 将配置来源解析为具体文件。
    pub fn resolve_config(&self, source: &ConfigSource) -> Result<ResolvedConfig> {
        match source {
            ConfigSource::Default => {
                let dir = tempfile::Builder::new()
                    .prefix("zdp-tool-")
                    .tempdir_in(self.config.temp_root())
                    .map_err(|e| ZdpError::io("创建临时目录失败", e))?;
                let path = dir.path().join(DEFAULT_CLASSIFIER_CONFIG);
                let bytes = self.source.default_classifier_config()?;
                std::fs::write(&path, &*bytes)
                    .map_err(|e| ZdpError::io("写入默认分类器配置失败", e))?;
                Ok(ResolvedConfig {
                    path,
                    _temp: Some(dir),
                })
            }
            ConfigSource::LastModified => {
                let path = latest_config_file(&self.config.classifier_config_dir)
                    .map_err(|e| ZdpError::LatestConfig(Box::new(e)))?;
                Ok(ResolvedConfig { path, _temp: None })
            }
            ConfigSource::Custom(path) => Ok(ResolvedConfig {
                path: path.clone(),
                _temp: None,
            }),
        }
    }

    /// 查询 DLP SDK 版本：以默认配置分类服务安装日志并从输出中提取版本。
    ///
    /// 返回值：
    /// - 输出中有版本行：版本号
    /// - 无版本行且分类器成功：[`UNKNOWN_VERSION`]
    ///
    /// 异常处理：
    /// - 分类前置条件失败：原样返回
    /// - 无版本行且分类器失败：[`ZdpError::VersionNotFound`]
    pub fn dlp_sdk_version(&self) -> Result<String> {
        info!("查询 DLP SDK 版本");
        let run = self.classify(&ClassifyRequest {
            file: self.config.install_log.clone(),
            config_option: "default".to_string(),
            ..ClassifyRequest::default()
        })?;
        debug!(command = %run.output.command, "分类器命令");
        extract_version(run)
    }
}

/// 在目录中查找修改时间最新的 `*.json` 文件。
///
/// 异常处理：
/// - 目录读取失败：[`ZdpError::Io`]
/// - 没有匹配文件：[`ZdpError::NoConfigFiles`]
pub fn latest_config_file(dir: &Path) -> Result<PathBuf> {
    let read_err = |e| ZdpError::io(format!("读取目录失败: {}", dir.display()), e);
    let mut latest: Option<(SystemTime, PathBuf)> = None;
    for entry in std::fs::read_dir(dir).map_err(read_err)? {
        let entry = entry.map_err(read_err)?;
        let meta = entry.metadata().map_err(read_err)?;
        if meta.is_dir() || !entry.file_name().to_string_lossy().ends_with(".json") {
            continue;
        }
        let modified = meta.modified().map_err(read_err)?;
        if latest.as_ref().map_or(true, |(t, _)| modified > *t) {
            latest = Some((modified, entry.path()));
        }
    }
    latest
        .map(|(_, path)| path)
        .ok_or_else(|| ZdpError::NoConfigFiles(dir.to_path_buf()))
}

/// 从输出中提取 DLP SDK 版本（修剪空白）。
pub fn parse_sdk_version(output: &str) -> Option<String> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let re = PATTERN.get_or_init(|| Regex::new(VERSION_PATTERN).expect("valid version pattern"));
    re.captures(output)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
}

/// 按“找到即返回，找不到时看分类器是否失败”的规则得出版本。
pub fn extract_version(run: ClassifierRun) -> Result<String> {
    if let Some(version) = parse_sdk_version(&run.output.output) {
        info!("DLP SDK 版本: {version}");
        return Ok(version);
    }
    match run.failure {
        Some(err) => Err(ZdpError::VersionNotFound(Box::new(err))),
        None => Ok(UNKNOWN_VERSION.to_string()),
    }
}

fn with_suffix(file: &Path, suffix: &str) -> PathBuf {
    let mut s = OsString::from(file.as_os_str());
    s.push(suffix);
    PathBuf::from(s)
}

#[cfg(test)]
mod tests {
    use std::fs::File;
    use std::time::Duration;

    use super::*;

    fn touch_at(path: &Path, content: &str, modified: SystemTime) {
        std::fs::write(path, content).expect("write");
        File::options()
            .write(true)
            .open(path)
            .and_then(|f| f.set_modified(modified))
            .expect("set mtime");
    }

    fn run_with(output: &str, failure: Option<ZdpError>) -> ClassifierRun {
        ClassifierRun {
            output: ClassifierOutput {
                command: "ZDPClassifier.exe".to_string(),
                output: output.to_string(),
                ocr_text_path: None,
                extracted_text_path: None,
            },
            failure,
        }
    }

    #[test]
    fn parse_config_options() {
        let custom = Path::new("/tmp/custom.json");
        assert_eq!(ConfigSource::parse("default", custom).expect("default"), ConfigSource::Default);
        assert_eq!(
            ConfigSource::parse("last_modified", custom).expect("last"),
            ConfigSource::LastModified
        );
        assert_eq!(
            ConfigSource::parse("custom", custom).expect("custom"),
            ConfigSource::Custom(custom.to_path_buf())
        );
        let err = ConfigSource::parse("latest", custom).expect_err("invalid");
        assert!(matches!(err, ZdpError::InvalidConfigOption(ref o) if o == "latest"));
    }

    #[test]
    fn latest_config_picks_newest_json() {
        let dir = tempfile::tempdir().expect("tempdir");
        let base = SystemTime::now() - Duration::from_secs(3600);
        touch_at(&dir.path().join("a.json"), "{}", base);
        touch_at(&dir.path().join("c.json"), "{}", base + Duration::from_secs(300));
        touch_at(&dir.path().join("b.json"), "{}", base + Duration::from_secs(100));
        touch_at(&dir.path().join("notes.txt"), "x", base + Duration::from_secs(900));
        std::fs::create_dir(dir.path().join("newer.json")).expect("mkdir");

        let latest = latest_config_file(dir.path()).expect("latest");
        assert_eq!(latest, dir.path().join("c.json"));
    }

    #[test]
    fn latest_config_in_empty_dir_fails() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("readme.txt"), "x").expect("write");
        let err = latest_config_file(dir.path()).expect_err("no json");
        assert!(matches!(err, ZdpError::NoConfigFiles(_)));

        let err = latest_config_file(&dir.path().join("missing")).expect_err("missing dir");
        assert!(matches!(err, ZdpError::Io { .. }));
    }

    #[test]
    fn version_extraction_rules() {
        assert_eq!(
            parse_sdk_version("init\nDLP SDK version: 3.2.1\nscan done\n").as_deref(),
            Some("3.2.1")
        );
        assert_eq!(parse_sdk_version("DLP SDK version: 4.0.7 \r\n").as_deref(), Some("4.0.7"));
        assert_eq!(parse_sdk_version("no version here"), None);

        assert_eq!(
            extract_version(run_with("DLP SDK version: 3.2.1\n", None)).expect("version"),
            "3.2.1"
        );
        assert_eq!(extract_version(run_with("clean run\n", None)).expect("unknown"), UNKNOWN_VERSION);
    }

    #[test]
    fn version_found_despite_classifier_failure() {
        let failure = ZdpError::HelperFailed {
            helper: "ZDPClassifier.exe".to_string(),
            reason: "exit status: 2".to_string(),
            output: "DLP SDK version: 5.1.0\nfile locked\n".to_string(),
        };
        let run = run_with("DLP SDK version: 5.1.0\nfile locked\n", Some(failure));
        assert_eq!(extract_version(run).expect("version"), "5.1.0");
    }

    #[test]
    fn missing_version_with_failure_surfaces_error() {
        let failure = ZdpError::HelperFailed {
            helper: "ZDPClassifier.exe".to_string(),
            reason: "exit status: 2".to_string(),
            output: "crash".to_string(),
        };
        let err = extract_version(run_with("crash", Some(failure))).expect_err("no version");
        assert!(matches!(err, ZdpError::VersionNotFound(_)));
        assert!(err.to_string().contains("crash"));
    }

    #[test]
    fn missing_classifier_is_checked_first() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = ToolConfig {
            classifier_exe: dir.path().join("ZDPClassifier.exe"),
            ..ToolConfig::default()
        };
        let source = HelperSource::directory(dir.path());
        let request = ClassifyRequest {
            file: dir.path().join("input.docx"),
            config_option: "bogus".to_string(),
            ..ClassifyRequest::default()
        };
        let err = ClassifierController::new(&config, &source)
            .classify(&request)
            .expect_err("missing classifier");
        assert!(matches!(err, ZdpError::ClassifierNotFound(_)));
    }

    #[test]
    fn invalid_option_with_installed_classifier() {
        let dir = tempfile::tempdir().expect("tempdir");
        let exe = dir.path().join("ZDPClassifier.exe");
        std::fs::write(&exe, b"placeholder").expect("write");
        let config = ToolConfig {
            classifier_exe: exe,
            ..ToolConfig::default()
        };
        let source = HelperSource::directory(dir.path());
        let request = ClassifyRequest {
            file: dir.path().join("input.docx"),
            config_option: "newest".to_string(),
            ..ClassifyRequest::default()
        };
        let err = ClassifierController::new(&config, &source)
            .classify(&request)
            .expect_err("invalid option");
        assert!(matches!(err, ZdpError::InvalidConfigOption(_)));
    }

    #[test]
    fn derived_paths_append_suffixes() {
        assert_eq!(
            with_suffix(Path::new("/data/report.pdf"), OCR_TEXT_SUFFIX),
            PathBuf::from("/data/report.pdf.ocr_text.txt")
        );
        assert_eq!(
            with_suffix(Path::new("/data/report.pdf"), EXTRACTED_TEXT_SUFFIX),
            PathBuf::from("/data/report.pdf.extracted_text.txt")
        );
    }

    #[cfg(unix)]
    mod process {
        use std::time::Duration;

        use tempfile::TempDir;

        use super::*;
        use crate::test_support::{spawn_guard, write_script};

        struct Fixture {
            dir: TempDir,
            config: ToolConfig,
            source: HelperSource,
        }

        fn fixture(script: &str) -> Fixture {
            let dir = tempfile::tempdir().expect("tempdir");
            let exe = dir.path().join("ZDPClassifier.exe");
            write_script(&exe, script);
            let bundle = dir.path().join("bundle");
            let temp_root = dir.path().join("tmp");
            let config_dir = dir.path().join("Config");
            std::fs::create_dir_all(&bundle).expect("bundle dir");
            std::fs::create_dir_all(&temp_root).expect("temp root");
            std::fs::create_dir_all(&config_dir).expect("config dir");
            std::fs::write(bundle.join(DEFAULT_CLASSIFIER_CONFIG), "{\"bundled\":true}").expect("write");
            let config = ToolConfig {
                classifier_exe: exe,
                classifier_config_dir: config_dir,
                install_log: dir.path().join("zdp_install.log"),
                temp_root: Some(temp_root),
                ..ToolConfig::default()
            };
            let source = HelperSource::directory(bundle);
            Fixture { dir, config, source }
        }

        #[test]
        fn custom_config_builds_command_and_paths() {
            let _guard = spawn_guard();
            let fx = fixture("echo \"args: $*\"");
            let file = fx.dir.path().join("input.docx");
            let request = ClassifyRequest {
                file: file.clone(),
                config_option: "custom".to_string(),
                config_path: PathBuf::from("/etc/zdp/custom.json"),
                use_ocr: true,
                use_text: true,
            };

            let out = ClassifierController::new(&fx.config, &fx.source)
                .classify(&request)
                .expect("classify")
                .into_result()
                .expect("classifier ok");
            let expected_args = format!("-config /etc/zdp/custom.json -file {} -ocr -text", file.display());
            assert_eq!(
                out.command,
                format!("{} {}", fx.config.classifier_exe.display(), expected_args)
            );
            assert_eq!(out.output, format!("args: {expected_args}\n"));
            assert_eq!(out.ocr_text_path, Some(with_suffix(&file, OCR_TEXT_SUFFIX)));
            assert_eq!(out.extracted_text_path, Some(with_suffix(&file, EXTRACTED_TEXT_SUFFIX)));
        }

        #[test]
        fn default_config_is_written_then_removed() {
            let _guard = spawn_guard();
            let fx = fixture("cat \"$2\"");
            let request = ClassifyRequest {
                file: fx.dir.path().join("input.docx"),
                config_option: "default".to_string(),
                ..ClassifyRequest::default()
            };

            let out = ClassifierController::new(&fx.config, &fx.source)
                .classify(&request)
                .expect("classify")
                .into_result()
                .expect("classifier ok");
            assert_eq!(out.output, "{\"bundled\":true}");
            assert_eq!(out.ocr_text_path, None);
            assert_eq!(out.extracted_text_path, None);
            let temp_root = fx.config.temp_root();
            assert!(std::fs::read_dir(&temp_root).expect("temp root").next().is_none());
        }

        #[test]
        fn last_modified_resolves_from_config_dir() {
            let _guard = spawn_guard();
            let fx = fixture("echo \"$2\"");
            let dir = &fx.config.classifier_config_dir;
            let base = SystemTime::now() - Duration::from_secs(600);
            touch_at(&dir.join("old.json"), "{}", base);
            touch_at(&dir.join("new.json"), "{}", base + Duration::from_secs(60));
            let request = ClassifyRequest {
                file: fx.dir.path().join("input.docx"),
                config_option: "last_modified".to_string(),
                ..ClassifyRequest::default()
            };

            let out = ClassifierController::new(&fx.config, &fx.source)
                .classify(&request)
                .expect("classify")
                .into_result()
                .expect("classifier ok");
            assert_eq!(out.output.trim(), dir.join("new.json").display().to_string());
        }

        #[test]
        fn last_modified_with_empty_dir_fails_before_spawn() {
            let _guard = spawn_guard();
            let fx = fixture("touch \"$4.ran\"");
            let file = fx.dir.path().join("input.docx");
            let request = ClassifyRequest {
                file: file.clone(),
                config_option: "last_modified".to_string(),
                ..ClassifyRequest::default()
            };
            let err = ClassifierController::new(&fx.config, &fx.source)
                .classify(&request)
                .expect_err("no configs");
            assert!(matches!(err, ZdpError::LatestConfig(_)));
            assert!(!with_suffix(&file, ".ran").exists());
        }

        #[test]
        fn failing_classifier_still_reports_output() {
            let _guard = spawn_guard();
            let fx = fixture("echo 'DLP SDK version: 3.2.1'\necho 'cannot open input' 1>&2\nexit 4");
            let run = ClassifierController::new(&fx.config, &fx.source)
                .classify(&ClassifyRequest {
                    file: fx.dir.path().join("missing.docx"),
                    config_option: "default".to_string(),
                    ..ClassifyRequest::default()
                })
                .expect("classify");
            assert!(run.failure.is_some());
            assert!(run.output.output.contains("cannot open input"));
            assert_eq!(extract_version(run).expect("version"), "3.2.1");
        }

        #[test]
        fn dlp_sdk_version_without_version_line() {
            let _guard = spawn_guard();
            let fx = fixture("echo 'scan complete'");
            let version = ClassifierController::new(&fx.config, &fx.source)
                .dlp_sdk_version()
                .expect("version");
            assert_eq!(version, UNKNOWN_VERSION);
        }

        #[test]
        fn dlp_sdk_version_uses_install_log_and_default_config() {
            let _guard = spawn_guard();
            let fx = fixture("echo \"DLP SDK version: 9.9.$#\"\necho \"$4\" 1>&2");
            let version = ClassifierController::new(&fx.config, &fx.source)
                .dlp_sdk_version()
                .expect("version");
            assert_eq!(version, "9.9.4");
        }
    }
}
