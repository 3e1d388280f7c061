use std::path::PathBuf;

use thiserror::Error;

use crate::services::selector_registry::Target;
use crate::workflow::publish_step::Step;

/// 发布流程错误
///
/// 除 `NotifyError` 外都是致命错误，会在顶层被捕获并转换为退出码 1
#[derive(Debug, Error)]
pub enum PublishError {
    /// 任务描述或配置有误，浏览器尚未启动
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),

    /// 浏览器或 Profile 无法启动
    #[error("浏览器启动失败: {reason}")]
    Launch {
        reason: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// 预算时间内未检测到登录状态
    #[error("{waited_secs} 秒内未检测到上传控件，登录失败，请手动打开 {url} 登录后重新执行")]
    AuthTimeout { waited_secs: u64, url: String },

    /// 某一步的目标元素未找到，或操作本身失败
    #[error("{step} 失败{}: {reason}", target_suffix(.target))]
    StepFailure {
        step: Step,
        target: Option<Target>,
        reason: String,
    },
}

impl PublishError {
    /// 进程退出码，所有中止情况统一为 1
    pub fn exit_code(&self) -> u8 {
        1
    }

    /// 创建浏览器启动错误
    pub fn launch(
        reason: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        PublishError::Launch {
            reason: reason.into(),
            source: source.into(),
        }
    }

    /// 创建步骤失败错误
    pub fn step(step: Step, target: Option<Target>, reason: impl Into<String>) -> Self {
        PublishError::StepFailure {
            step,
            target,
            reason: reason.into(),
        }
    }
}

fn target_suffix(target: &Option<Target>) -> String {
    match target {
        Some(t) => format!(" (目标: {})", t.label()),
        None => String::new(),
    }
}

/// 任务描述 / 设置文件错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 描述文件不存在
    #[error("配置文件不存在: {}", .path.display())]
    DescriptorNotFound { path: PathBuf },

    /// 读取失败
    #[error("读取文件失败 ({}): {source}", .path.display())]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON 格式错误
    #[error("配置文件格式错误 ({}): {source}", .path.display())]
    DescriptorParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// 必填字段缺失或为空
    #[error("配置文件缺少必要字段: {field}")]
    MissingField { field: &'static str },

    /// cover 和 images 都为空
    #[error("配置文件缺少图片（cover 或 images 至少提供一项）")]
    EmptyMedia,

    /// 图片文件不存在
    #[error("图片文件不存在: {}", .path.display())]
    MediaNotFound { path: PathBuf },

    /// 设置文件 TOML 解析失败
    #[error("设置文件解析失败 ({}): {source}", .path.display())]
    SettingsParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// 设置文件中出现未知的目标名
    #[error("未知的选择器目标: {key}")]
    UnknownTarget { key: String },

    /// 无法确定当前目录或用户目录
    #[error("无法解析路径: {reason}")]
    PathResolution { reason: String },
}

/// 完成提示音错误，只在通知器内部产生并被吞掉
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("无法执行提示音命令 {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("提示音命令 {program} 退出码异常: {code:?}")]
    Status { program: String, code: Option<i32> },
}

/// 应用程序结果类型
pub type AppResult<T> = Result<T, PublishError>;
