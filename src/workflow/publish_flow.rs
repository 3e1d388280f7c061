//! 发布流程 - 流程层
//!
//! 核心职责：定义"发布一篇图文"的完整流水线
//!
//! 流程顺序：
//! 1. 打开创作者平台并检测登录
//! 2. 一次性上传全部图片（封面在前）
//! 3. 填写标题
//! 4. 逐段填写正文，再逐个输入标签
//! 5. 点击发布
//!
//! 每一步先通过选择器注册表解析目标，解析失败或操作失败立即中止，后续步骤不再执行。
//! 除登录检测外没有任何自动重试。

use std::path::{Path, PathBuf};

use anyhow::Result;
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::config::Timings;
use crate::error::PublishError;
use crate::infrastructure::PageDriver;
use crate::models::PublishJob;
use crate::services::selector_registry::{Locator, SelectorRegistry, Target};
use crate::services::{LoginPoller, LoginState};
use crate::utils::logging::{log_step, truncate_text};
use crate::workflow::editor_plan::{plan_editor_inputs, EditorInput};
use crate::workflow::publish_step::{Step, StepOutcome, StepReport};

/// 发布结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishAck {
    /// 上传的图片数量
    pub media_count: usize,
    /// 已回车确认的标签数量
    pub tags_committed: usize,
    /// 点击发布后是否检测到成功提示
    pub confirmed: bool,
    /// 按执行顺序的步骤报告
    pub reports: Vec<StepReport>,
}

/// 发布流程
///
/// - 不持有 page，只借用调用方的页面驱动
/// - 所有固定等待都来自 `Timings`
pub struct PublishFlow<'a, D: PageDriver + ?Sized> {
    driver: &'a D,
    registry: &'a SelectorRegistry,
    timings: &'a Timings,
    target_url: &'a str,
}

impl<'a, D: PageDriver + ?Sized> PublishFlow<'a, D> {
    pub fn new(
        driver: &'a D,
        registry: &'a SelectorRegistry,
        timings: &'a Timings,
        target_url: &'a str,
    ) -> Self {
        Self {
            driver,
            registry,
            timings,
            target_url,
        }
    }

    /// 执行完整流水线
    pub async fn publish(&self, job: &PublishJob) -> Result<PublishAck, PublishError> {
        let mut reports = Vec::with_capacity(Step::TOTAL);

        log_step(Step::Open);
        reports.push(self.open().await?);

        let media = job.media();
        log_step(Step::UploadMedia);
        reports.push(finish(self.upload_media(&media).await)?);

        log_step(Step::FillTitle);
        reports.push(finish(self.fill_title(job.title()).await)?);

        log_step(Step::FillBody);
        let (report, tags_committed) = self.fill_body(job).await;
        reports.push(finish(report)?);

        log_step(Step::Submit);
        let (report, confirmed) = self.submit().await;
        reports.push(finish(report)?);

        Ok(PublishAck {
            media_count: media.len(),
            tags_committed,
            confirmed,
            reports,
        })
    }

    /// 步骤 1：打开页面并等待登录
    async fn open(&self) -> Result<StepReport, PublishError> {
        info!("   URL: {}", self.target_url);

        let poller = LoginPoller::new(self.timings.auth_budget, self.timings.auth_poll_interval);
        let state = poller
            .await_login(
                self.driver,
                self.registry,
                self.target_url,
                self.timings.navigation_timeout,
                self.timings.page_settle,
            )
            .await
            .map_err(|e| PublishError::step(Step::Open, None, format!("打开失败: {}", e)))?;

        match state {
            LoginState::LoggedIn => {
                info!("   ✅ 页面加载成功");
                Ok(StepReport::succeeded(Step::Open, "页面加载成功，已登录"))
            }
            LoginState::TimedOut => {
                info!("   💡 建议：");
                info!("      1. 手动打开 {}", self.target_url);
                info!("      2. 登录小红书账号");
                info!("      3. 重新执行自动上传");
                Err(PublishError::AuthTimeout {
                    waited_secs: poller.budget().as_secs(),
                    url: self.target_url.to_string(),
                })
            }
        }
    }

    /// 步骤 2：批量上传图片
    async fn upload_media(&self, media: &[PathBuf]) -> StepReport {
        let step = Step::UploadMedia;
        info!("   图片数量: {} 张", media.len());
        if let Some(cover) = media.first() {
            info!("   封面图: {} (第一张)", file_name(cover));
        }

        let Some(input) = self.resolve(step).await else {
            return StepReport::unresolved(step);
        };

        info!("   上传中...");
        // 一次性提交全部文件，顺序由我们决定，不交给页面重排
        if let Err(e) = self.driver.set_input_files(&input, media).await {
            return StepReport::failed(step, format!("上传失败: {}", e));
        }
        sleep(self.timings.upload_settle).await;

        for path in media {
            info!("   ✅ {} 上传成功", file_name(path));
        }

        info!("   ⏳ 等待图片处理...");
        sleep(self.timings.media_processing).await;
        self.check_uploaded_items(media.len()).await;

        info!("   ✅ 所有图片上传完成");
        StepReport::succeeded(step, format!("已上传 {} 张图片", media.len()))
    }

    /// 缩略图数量只做提示，不影响流程
    async fn check_uploaded_items(&self, expected: usize) {
        let Some(marker) = self.registry.resolve(self.driver, Target::ImageItem).await else {
            warn!("   ⚠️  未检测到图片缩略图，请在浏览器中确认图片是否上传成功");
            return;
        };
        match self.driver.count(&marker).await {
            Ok(n) if n < expected => {
                warn!("   ⚠️  仅检测到 {}/{} 张缩略图，部分图片可能仍在处理", n, expected)
            }
            Ok(n) => info!("   检测到 {} 张缩略图", n),
            Err(e) => warn!("   ⚠️  缩略图统计失败: {}", e),
        }
    }

    /// 步骤 3：填写标题
    async fn fill_title(&self, title: &str) -> StepReport {
        let step = Step::FillTitle;
        info!("   标题内容: {}", title);

        let Some(input) = self.resolve(step).await else {
            return StepReport::unresolved(step);
        };

        let result: Result<()> = async {
            self.driver.click(&input).await?;
            self.driver.clear(&input).await?;
            // 编辑器只在离散按键事件上触发变更检测，不能整段粘贴
            self.driver
                .type_text(&input, title, self.timings.title_keystroke)
                .await?;
            Ok(())
        }
        .await;

        if let Err(e) = result {
            return StepReport::failed(step, format!("填写失败: {}", e));
        }
        sleep(self.timings.title_settle).await;

        info!("   ✅ 标题填写完成");
        StepReport::succeeded(step, format!("标题: {}", title))
    }

    /// 步骤 4：填写正文和标签，返回报告和已确认的标签数
    async fn fill_body(&self, job: &PublishJob) -> (StepReport, usize) {
        let step = Step::FillBody;
        info!("   正文字数: {} 字", job.body().chars().count());

        let Some(editor) = self.resolve(step).await else {
            return (StepReport::unresolved(step), 0);
        };

        let inputs = plan_editor_inputs(job.body(), job.tags());
        match self.fill_editor(&editor, &inputs).await {
            Ok(tags) => {
                let paragraphs = inputs
                    .iter()
                    .filter(|i| matches!(i, EditorInput::Paragraph(_)))
                    .count();
                (
                    StepReport::succeeded(step, format!("{} 段正文, {} 个标签", paragraphs, tags)),
                    tags,
                )
            }
            Err(e) => (StepReport::failed(step, format!("填写失败: {}", e)), 0),
        }
    }

    async fn fill_editor(&self, editor: &Locator, inputs: &[EditorInput]) -> Result<usize> {
        self.driver.click(editor).await?;
        sleep(self.timings.editor_focus).await;

        let mut body_settled = false;
        let mut tags_committed = 0;

        for (i, input) in inputs.iter().enumerate() {
            match input {
                EditorInput::Paragraph(text) => {
                    self.driver
                        .type_text(editor, text, self.timings.body_keystroke)
                        .await?;
                }
                EditorInput::ParagraphBreak => {
                    self.double_enter().await?;
                }
                EditorInput::TagSeparator => {
                    sleep(self.timings.body_settle).await;
                    body_settled = true;
                    info!("   ✅ 正文填写完成");
                    info!("   📋 输入标签...");
                    self.double_enter().await?;
                }
                EditorInput::Tag(tag) => {
                    self.driver
                        .type_text(editor, tag, self.timings.tag_keystroke)
                        .await?;
                    // 等待编辑器把输入识别为话题，再回车确认
                    sleep(self.timings.tag_commit).await;
                    self.driver.press_key("Enter").await?;
                    tags_committed += 1;
                    info!("   输入: {} ⏎", tag);

                    if matches!(inputs.get(i + 1), Some(EditorInput::Tag(_))) {
                        sleep(self.timings.tag_gap).await;
                    }
                }
            }
        }

        if !body_settled {
            sleep(self.timings.body_settle).await;
            info!("   ✅ 正文填写完成");
        } else {
            info!("   ✅ 所有标签输入完成");
        }

        Ok(tags_committed)
    }

    async fn double_enter(&self) -> Result<()> {
        self.driver.press_key("Enter").await?;
        self.driver.press_key("Enter").await?;
        Ok(())
    }

    /// 步骤 5：点击发布，返回报告和是否检测到成功提示
    async fn submit(&self) -> (StepReport, bool) {
        let step = Step::Submit;

        let Some(button) = self.resolve(step).await else {
            return (StepReport::unresolved(step), false);
        };

        // 等待前面填写的内容稳定
        sleep(self.timings.pre_submit).await;

        if let Err(e) = self.driver.click(&button).await {
            return (StepReport::failed(step, format!("发布失败: {}", e)), false);
        }
        info!("   ✅ 已点击发布按钮");

        info!("   ⏳ 等待发布完成...");
        sleep(self.timings.post_submit).await;

        let confirmed = self
            .registry
            .resolve(self.driver, Target::PublishSuccess)
            .await
            .is_some();
        if confirmed {
            info!("   ✅ 检测到发布成功提示");
        } else {
            warn!("   ⚠️  未检测到发布成功提示，请在浏览器中确认发布结果");
        }

        info!("   ✅ 发布成功！");
        let detail = if confirmed {
            "已点击发布，平台已确认"
        } else {
            "已点击发布，未检测到确认提示"
        };
        (StepReport::succeeded(step, detail), confirmed)
    }

    /// 解析步骤目标，失败时列出尝试过的全部候选
    async fn resolve(&self, step: Step) -> Option<Locator> {
        let target = step.target()?;
        let resolved = self.registry.resolve(self.driver, target).await;
        if resolved.is_none() {
            error!("   ❌ 未找到{}，尝试的选择器：", target.label());
            for candidate in self.registry.candidates(target) {
                error!("      - {}", candidate);
            }
        }
        resolved
    }
}

/// 把步骤报告转换为继续 / 中止
fn finish(report: StepReport) -> Result<StepReport, PublishError> {
    match &report.outcome {
        StepOutcome::Succeeded => Ok(report),
        StepOutcome::Failed(reason) => {
            error!("   ❌ {}", reason);
            Err(PublishError::step(
                report.step,
                report.step.target(),
                reason.clone(),
            ))
        }
        StepOutcome::Unresolved => Err(PublishError::step(
            report.step,
            report.step.target(),
            report.detail,
        )),
    }
}

fn file_name(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    truncate_text(&name, 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::fake::{Action, FakePage};

    const UPLOAD: &str = "#upload";
    const TITLE: &str = "#title";
    const EDITOR: &str = "#editor";
    const PUBLISH: &str = "#publish";

    fn registry() -> SelectorRegistry {
        let mut registry = SelectorRegistry::defaults();
        registry.replace(Target::UploadInput, &[UPLOAD.to_string()]);
        registry.replace(Target::TitleInput, &[TITLE.to_string()]);
        registry.replace(Target::ContentEditor, &[EDITOR.to_string()]);
        registry.replace(Target::PublishButton, &[PUBLISH.to_string()]);
        registry.replace(Target::ImageItem, &[".thumb".to_string()]);
        registry.replace(Target::PublishSuccess, &[".done".to_string()]);
        registry
    }

    fn cooperative_page() -> FakePage {
        FakePage::new()
            .with_element(UPLOAD)
            .with_element(TITLE)
            .with_element(EDITOR)
            .with_element(PUBLISH)
    }

    fn job(body: &str, tags: &[&str]) -> PublishJob {
        PublishJob::new(
            "T",
            body,
            tags.iter().map(|t| t.to_string()).collect(),
            Some(PathBuf::from("/m/c.png")),
            vec![PathBuf::from("/m/a.png"), PathBuf::from("/m/b.png")],
        )
        .unwrap()
    }

    fn enter() -> Action {
        Action::Key("Enter".to_string())
    }

    #[tokio::test]
    async fn test_full_pipeline_action_order() {
        let page = cooperative_page();
        let registry = registry();
        let timings = Timings::zero();
        let flow = PublishFlow::new(&page, &registry, &timings, "https://example.test/p");

        let ack = flow.publish(&job("P1\n\nP2", &["x", "#y"])).await.unwrap();

        assert_eq!(ack.media_count, 3);
        assert_eq!(ack.tags_committed, 2);
        assert!(!ack.confirmed);
        assert_eq!(
            ack.reports.iter().map(|r| r.step).collect::<Vec<_>>(),
            Step::ALL.to_vec()
        );

        assert_eq!(
            page.actions(),
            vec![
                Action::Goto("https://example.test/p".to_string()),
                Action::SetFiles(
                    UPLOAD.to_string(),
                    vec![
                        PathBuf::from("/m/c.png"),
                        PathBuf::from("/m/a.png"),
                        PathBuf::from("/m/b.png")
                    ]
                ),
                Action::Click(TITLE.to_string()),
                Action::Clear(TITLE.to_string()),
                Action::Type(TITLE.to_string(), "T".to_string()),
                Action::Click(EDITOR.to_string()),
                Action::Type(EDITOR.to_string(), "P1".to_string()),
                enter(),
                enter(),
                Action::Type(EDITOR.to_string(), "P2".to_string()),
                enter(),
                enter(),
                Action::Type(EDITOR.to_string(), "#x".to_string()),
                enter(),
                Action::Type(EDITOR.to_string(), "#y".to_string()),
                enter(),
                Action::Click(PUBLISH.to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_confirmed_when_success_marker_present() {
        let page = cooperative_page().with_element(".done").with_element(".thumb");
        let registry = registry();
        let timings = Timings::zero();
        let flow = PublishFlow::new(&page, &registry, &timings, "https://example.test/p");

        let ack = flow.publish(&job("Body", &[])).await.unwrap();
        assert!(ack.confirmed);
        assert_eq!(ack.tags_committed, 0);
    }

    #[tokio::test]
    async fn test_auth_timeout_stops_before_upload() {
        let page = FakePage::new().with_element(TITLE);
        let registry = registry();
        let timings = Timings::zero();
        let flow = PublishFlow::new(&page, &registry, &timings, "https://example.test/p");

        let err = flow.publish(&job("Body", &[])).await.unwrap_err();
        assert!(matches!(err, PublishError::AuthTimeout { .. }));
        assert_eq!(
            page.actions(),
            vec![Action::Goto("https://example.test/p".to_string())]
        );
    }

    #[tokio::test]
    async fn test_unresolved_title_short_circuits() {
        let page = FakePage::new()
            .with_element(UPLOAD)
            .with_element(EDITOR)
            .with_element(PUBLISH);
        let registry = registry();
        let timings = Timings::zero();
        let flow = PublishFlow::new(&page, &registry, &timings, "https://example.test/p");

        let err = flow.publish(&job("Body", &["x"])).await.unwrap_err();
        match err {
            PublishError::StepFailure { step, target, .. } => {
                assert_eq!(step, Step::FillTitle);
                assert_eq!(target, Some(Target::TitleInput));
            }
            other => panic!("unexpected error: {other}"),
        }

        // 标题之后的步骤一个都没有执行
        let actions = page.actions();
        assert!(!actions.iter().any(|a| matches!(a, Action::Click(s) if s == EDITOR || s == PUBLISH)));
        assert!(!page.queried().iter().any(|q| q == EDITOR || q == PUBLISH));
    }

    #[tokio::test]
    async fn test_action_failure_is_step_failure() {
        let page = FakePage::new()
            .with_element(UPLOAD)
            .with_element(TITLE)
            .with_failing(EDITOR)
            .with_element(PUBLISH);
        let registry = registry();
        let timings = Timings::zero();
        let flow = PublishFlow::new(&page, &registry, &timings, "https://example.test/p");

        let err = flow.publish(&job("Body", &[])).await.unwrap_err();
        assert!(matches!(
            err,
            PublishError::StepFailure {
                step: Step::FillBody,
                ..
            }
        ));
        assert!(!page.queried().iter().any(|q| q == PUBLISH));
    }

    #[tokio::test]
    async fn test_paragraph_breaks_never_trail() {
        let page = cooperative_page();
        let registry = registry();
        let timings = Timings::zero();
        let flow = PublishFlow::new(&page, &registry, &timings, "https://example.test/p");

        flow.publish(&job("P1\n\nP2\n\nP3", &[])).await.unwrap();

        let actions = page.actions();
        let enters = actions.iter().filter(|a| **a == enter()).count();
        assert_eq!(enters, 4);
        let last_type = actions
            .iter()
            .rposition(|a| matches!(a, Action::Type(s, t) if s == EDITOR && t == "P3"))
            .unwrap();
        assert_eq!(actions[last_type + 1], Action::Click(PUBLISH.to_string()));
    }
}
