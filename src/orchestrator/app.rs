use std::path::PathBuf;
use std::time::Duration;

use tracing::info;

use crate::browser::Session;
use crate::config::Config;
use crate::error::{AppResult, PublishError};
use crate::models::{load_publish_job, PublishJob};
use crate::services::selector_registry::Target;
use crate::services::{CompletionNotifier, LoginPoller, LoginState};
use crate::utils::logging::{log_startup, print_failure, print_summary, truncate_text};
use crate::workflow::editor_plan::{plan_editor_inputs, EditorInput};
use crate::workflow::{PublishAck, PublishFlow};

/// 登录模式的默认等待时间
pub const DEFAULT_LOGIN_TIMEOUT: Duration = Duration::from_secs(300);

/// 运行模式
#[derive(Debug, Clone)]
pub enum Mode {
    /// 读取描述文件并发布
    Publish { descriptor: PathBuf },
    /// 只校验描述文件并打印计划，不启动浏览器
    DryRun { descriptor: PathBuf },
    /// 打开发布页等待人工登录
    Login { timeout: Duration },
}

/// 主应用结构
pub struct App {
    config: Config,
    notifier: CompletionNotifier,
}

impl App {
    pub fn new(config: Config) -> Self {
        let notifier = CompletionNotifier::new(config.notify);
        Self { config, notifier }
    }

    /// 执行一次运行
    ///
    /// 发布成功返回 `Some(ack)`，演练和登录模式返回 `None`；
    /// 失败信息在这里统一输出一次
    pub async fn run(&self, mode: Mode) -> AppResult<Option<PublishAck>> {
        let result = self.run_mode(mode).await;
        if let Err(e) = &result {
            print_failure(&e.to_string());
        }
        result
    }

    async fn run_mode(&self, mode: Mode) -> AppResult<Option<PublishAck>> {
        match mode {
            Mode::Publish { descriptor } => {
                let job = load_publish_job(&descriptor).await?;
                self.publish(&job).await.map(Some)
            }
            Mode::DryRun { descriptor } => {
                let job = load_publish_job(&descriptor).await?;
                self.print_plan(&job);
                Ok(None)
            }
            Mode::Login { timeout } => self.login(timeout).await.map(|_| None),
        }
    }

    async fn publish(&self, job: &PublishJob) -> Result<PublishAck, PublishError> {
        log_startup(job.title(), job.media().len(), job.tags().len());

        let mut session = Session::open(&self.config).await?;

        let flow = PublishFlow::new(
            session.page(),
            &self.config.selectors,
            &self.config.timings,
            &self.config.target_url,
        );
        let result = flow.publish(job).await;

        if let Ok(ack) = &result {
            print_summary(&ack.reports, ack.confirmed);
            self.notifier.notify().await;
        }

        if self.config.keep_open && !session.is_attached() {
            session.wait_until_closed().await;
        }
        session.close().await;

        result
    }

    async fn login(&self, budget: Duration) -> Result<(), PublishError> {
        info!("{}", "=".repeat(60));
        info!("🔐 登录模式：请在打开的浏览器中登录小红书");
        info!("{}", "=".repeat(60));

        let session = Session::open(&self.config).await?;
        let timings = &self.config.timings;
        let poller = LoginPoller::new(budget, timings.auth_poll_interval);

        let state = poller
            .await_login(
                session.page(),
                &self.config.selectors,
                &self.config.target_url,
                timings.navigation_timeout,
                timings.page_settle,
            )
            .await;
        session.close().await;

        match state {
            Ok(LoginState::LoggedIn) => {
                info!("✅ 登录状态已保存到 {}", self.config.profile_dir.display());
                Ok(())
            }
            Ok(LoginState::TimedOut) => Err(PublishError::AuthTimeout {
                waited_secs: budget.as_secs(),
                url: self.config.target_url.clone(),
            }),
            Err(e) => Err(PublishError::launch("无法打开发布页", e)),
        }
    }

    fn print_plan(&self, job: &PublishJob) {
        info!("{}", "=".repeat(60));
        info!("📋 演练模式（不启动浏览器）");
        info!("{}", "=".repeat(60));
        info!("📄 标题: {}", job.title());

        info!("🖼️  上传顺序:");
        for (i, path) in job.media().iter().enumerate() {
            let role = if i == 0 && job.cover().is_some() { " (封面)" } else { "" };
            info!("   {}. {}{}", i + 1, path.display(), role);
        }

        let inputs = plan_editor_inputs(job.body(), job.tags());
        let mut paragraphs = 0;
        let mut tags = Vec::new();
        for input in &inputs {
            match input {
                EditorInput::Paragraph(text) => {
                    paragraphs += 1;
                    info!("   ¶{} {}", paragraphs, truncate_text(text, 40));
                }
                EditorInput::Tag(tag) => tags.push(tag.as_str()),
                EditorInput::ParagraphBreak | EditorInput::TagSeparator => {}
            }
        }
        info!("📝 正文: {} 段", paragraphs);
        info!("🏷️  标签: {}", if tags.is_empty() { "无".to_string() } else { tags.join(" ") });

        info!("🎯 选择器:");
        for target in Target::ALL {
            let candidates: Vec<String> = self
                .config
                .selectors
                .candidates(target)
                .iter()
                .map(|c| c.to_string())
                .collect();
            info!("   {} ({}): {}", target.label(), target.key(), candidates.join(" | "));
        }
        info!("{}", "=".repeat(60));
    }
}
