use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::error::ConfigError;
use crate::services::selector_registry::{SelectorRegistry, Target};

/// 小红书创作者平台图文发布页
pub const DEFAULT_TARGET_URL: &str =
    "https://creator.xiaohongshu.com/publish/publish?from=menu&target=image";

/// 程序配置
#[derive(Clone, Debug)]
pub struct Config {
    /// 发布页 URL
    pub target_url: String,
    /// 专用 Chrome Profile 目录
    pub profile_dir: PathBuf,
    /// 设置后连接到已开启调试端口的浏览器，而不是自己启动
    pub browser_debug_port: Option<u16>,
    /// Chrome 可执行文件路径，未设置时由 chromiumoxide 自动查找
    pub chrome_executable: Option<PathBuf>,
    pub viewport_width: u32,
    pub viewport_height: u32,
    /// 流程结束后保持浏览器打开，直到 Ctrl+C 或窗口被关闭
    pub keep_open: bool,
    /// 成功后播放提示音
    pub notify: bool,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    pub timings: Timings,
    pub selectors: SelectorRegistry,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            target_url: DEFAULT_TARGET_URL.to_string(),
            profile_dir: default_profile_dir(),
            browser_debug_port: None,
            chrome_executable: None,
            viewport_width: 1280,
            viewport_height: 800,
            keep_open: true,
            notify: true,
            verbose_logging: false,
            timings: Timings::default(),
            selectors: SelectorRegistry::defaults(),
        }
    }
}

fn default_profile_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".redbook-publisher")
        .join("chrome-profile")
}

impl Config {
    /// 默认值 + 环境变量
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// 默认值 → 设置文件（可选）→ 环境变量，启动时调用一次
    pub fn load(settings_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(path) = settings_path {
            let settings = SettingsFile::read(path)?;
            config.apply_settings(settings)?;
        }
        config.apply_env();
        Ok(config)
    }

    fn apply_settings(&mut self, settings: SettingsFile) -> Result<(), ConfigError> {
        if let Some(url) = settings.target_url {
            self.target_url = url;
        }
        if let Some(dir) = settings.profile_dir {
            self.profile_dir = dir;
        }
        if settings.browser_debug_port.is_some() {
            self.browser_debug_port = settings.browser_debug_port;
        }
        if settings.chrome_executable.is_some() {
            self.chrome_executable = settings.chrome_executable;
        }
        if let Some(w) = settings.viewport_width {
            self.viewport_width = w;
        }
        if let Some(h) = settings.viewport_height {
            self.viewport_height = h;
        }
        if let Some(v) = settings.keep_open {
            self.keep_open = v;
        }
        if let Some(v) = settings.notify {
            self.notify = v;
        }
        if let Some(v) = settings.verbose_logging {
            self.verbose_logging = v;
        }
        if let Some(timings) = settings.timings {
            self.timings = timings;
        }
        for (key, exprs) in settings.selectors {
            let target = Target::from_key(&key).ok_or(ConfigError::UnknownTarget { key })?;
            self.selectors.replace(target, &exprs);
        }
        Ok(())
    }

    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var("REDBOOK_CREATOR_URL") {
            self.target_url = url;
        }
        if let Ok(dir) = std::env::var("REDBOOK_PROFILE_DIR") {
            self.profile_dir = PathBuf::from(dir);
        }
        if let Some(port) = env_parse("BROWSER_DEBUG_PORT") {
            self.browser_debug_port = Some(port);
        }
        if let Ok(exe) = std::env::var("CHROME_EXECUTABLE") {
            self.chrome_executable = Some(PathBuf::from(exe));
        }
        self.keep_open = env_parse("KEEP_BROWSER_OPEN").unwrap_or(self.keep_open);
        self.notify = env_parse("COMPLETION_SOUND").unwrap_or(self.notify);
        self.verbose_logging = env_parse("VERBOSE_LOGGING").unwrap_or(self.verbose_logging);
        if let Some(secs) = env_parse::<u64>("AUTH_TIMEOUT_SECS") {
            self.timings.auth_budget = Duration::from_secs(secs);
        }
        self.selectors.apply_env_overrides();
        debug!("配置加载完成: url={}, profile={}", self.target_url, self.profile_dir.display());
    }
}

/// 解析失败时返回 None，由调用方回落到默认值
fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

/// 固定等待时间
///
/// 目标页面没有可观察的完成事件，只能用固定等待；测试中全部置零。
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Timings {
    /// 页面加载后的稳定等待
    #[serde(rename = "page_settle_ms", with = "millis")]
    pub page_settle: Duration,
    /// 提交文件后的等待
    #[serde(rename = "upload_settle_ms", with = "millis")]
    pub upload_settle: Duration,
    /// 等待缩略图生成
    #[serde(rename = "media_processing_ms", with = "millis")]
    pub media_processing: Duration,
    #[serde(rename = "title_keystroke_ms", with = "millis")]
    pub title_keystroke: Duration,
    #[serde(rename = "title_settle_ms", with = "millis")]
    pub title_settle: Duration,
    #[serde(rename = "editor_focus_ms", with = "millis")]
    pub editor_focus: Duration,
    #[serde(rename = "body_keystroke_ms", with = "millis")]
    pub body_keystroke: Duration,
    #[serde(rename = "body_settle_ms", with = "millis")]
    pub body_settle: Duration,
    #[serde(rename = "tag_keystroke_ms", with = "millis")]
    pub tag_keystroke: Duration,
    /// 输入标签后、回车确认前的等待
    #[serde(rename = "tag_commit_ms", with = "millis")]
    pub tag_commit: Duration,
    /// 两个标签之间的间隔
    #[serde(rename = "tag_gap_ms", with = "millis")]
    pub tag_gap: Duration,
    #[serde(rename = "pre_submit_ms", with = "millis")]
    pub pre_submit: Duration,
    #[serde(rename = "post_submit_ms", with = "millis")]
    pub post_submit: Duration,
    #[serde(rename = "auth_poll_interval_ms", with = "millis")]
    pub auth_poll_interval: Duration,
    /// 登录检测总预算
    #[serde(rename = "auth_budget_ms", with = "millis")]
    pub auth_budget: Duration,
    #[serde(rename = "navigation_timeout_ms", with = "millis")]
    pub navigation_timeout: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            page_settle: Duration::from_secs(2),
            upload_settle: Duration::from_secs(3),
            media_processing: Duration::from_secs(5),
            title_keystroke: Duration::from_millis(50),
            title_settle: Duration::from_millis(500),
            editor_focus: Duration::from_millis(300),
            body_keystroke: Duration::from_millis(20),
            body_settle: Duration::from_millis(500),
            tag_keystroke: Duration::from_millis(30),
            tag_commit: Duration::from_secs(1),
            tag_gap: Duration::from_millis(200),
            pre_submit: Duration::from_secs(1),
            post_submit: Duration::from_secs(3),
            auth_poll_interval: Duration::from_secs(1),
            auth_budget: Duration::from_secs(20),
            navigation_timeout: Duration::from_secs(30),
        }
    }
}

impl Timings {
    /// 所有等待为零，导航超时保留
    pub fn zero() -> Self {
        Self {
            page_settle: Duration::ZERO,
            upload_settle: Duration::ZERO,
            media_processing: Duration::ZERO,
            title_keystroke: Duration::ZERO,
            title_settle: Duration::ZERO,
            editor_focus: Duration::ZERO,
            body_keystroke: Duration::ZERO,
            body_settle: Duration::ZERO,
            tag_keystroke: Duration::ZERO,
            tag_commit: Duration::ZERO,
            tag_gap: Duration::ZERO,
            pre_submit: Duration::ZERO,
            post_submit: Duration::ZERO,
            auth_poll_interval: Duration::ZERO,
            auth_budget: Duration::ZERO,
            navigation_timeout: Duration::from_secs(30),
        }
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let ms = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(ms))
    }
}

/// TOML 设置文件
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SettingsFile {
    target_url: Option<String>,
    profile_dir: Option<PathBuf>,
    browser_debug_port: Option<u16>,
    chrome_executable: Option<PathBuf>,
    viewport_width: Option<u32>,
    viewport_height: Option<u32>,
    keep_open: Option<bool>,
    notify: Option<bool>,
    verbose_logging: Option<bool>,
    timings: Option<Timings>,
    selectors: HashMap<String, Vec<String>>,
}

impl SettingsFile {
    fn read(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(path, &content)
    }

    fn parse(path: &Path, content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::SettingsParse {
            path: path.to_path_buf(),
            source,
        })
    }
}
