use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use tempfile::TempDir;

use redbook_publisher::utils::logging;
use redbook_publisher::{
    load_publish_job, App, Config, Locator, Mode, PageDriver, PublishError, PublishFlow,
    SelectorRegistry, Step, StepOutcome, Target, Timings,
};

/// 模拟发布页：只认识给定的选择器，记录每一次操作
struct StubPage {
    present: HashSet<String>,
    log: Mutex<Vec<String>>,
}

impl StubPage {
    fn new(present: &[&str]) -> Self {
        Self {
            present: present.iter().map(|s| s.to_string()).collect(),
            log: Mutex::new(Vec::new()),
        }
    }

    fn log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    fn push(&self, entry: String) {
        self.log.lock().unwrap().push(entry);
    }

    fn ensure(&self, locator: &Locator) -> Result<()> {
        if !self.present.contains(locator.as_str()) {
            bail!("元素不存在: {}", locator);
        }
        Ok(())
    }
}

#[async_trait]
impl PageDriver for StubPage {
    async fn goto(&self, url: &str, _timeout: Duration) -> Result<()> {
        self.push(format!("goto {}", url));
        Ok(())
    }

    async fn count(&self, locator: &Locator) -> Result<usize> {
        Ok(usize::from(self.present.contains(locator.as_str())))
    }

    async fn set_input_files(&self, locator: &Locator, files: &[PathBuf]) -> Result<()> {
        self.ensure(locator)?;
        let names: Vec<String> = files
            .iter()
            .filter_map(|f| f.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .collect();
        self.push(format!("upload {}", names.join(",")));
        Ok(())
    }

    async fn click(&self, locator: &Locator) -> Result<()> {
        self.ensure(locator)?;
        self.push(format!("click {}", locator));
        Ok(())
    }

    async fn clear(&self, locator: &Locator) -> Result<()> {
        self.ensure(locator)?;
        self.push(format!("clear {}", locator));
        Ok(())
    }

    async fn type_text(&self, locator: &Locator, text: &str, _delay: Duration) -> Result<()> {
        self.ensure(locator)?;
        self.push(format!("type {} {}", locator, text));
        Ok(())
    }

    async fn press_key(&self, key: &str) -> Result<()> {
        self.push(format!("key {}", key));
        Ok(())
    }
}

fn stub_registry() -> SelectorRegistry {
    let mut registry = SelectorRegistry::defaults();
    registry.replace(Target::UploadInput, &["#upload".to_string()]);
    registry.replace(Target::TitleInput, &["#title".to_string()]);
    registry.replace(Target::ContentEditor, &["#editor".to_string()]);
    registry.replace(Target::PublishButton, &["#publish".to_string()]);
    registry
}

fn write_descriptor(dir: &Path, json: &str, media: &[&str]) -> PathBuf {
    for name in media {
        std::fs::write(dir.join(name), b"fake image").unwrap();
    }
    let path = dir.join("config.json");
    std::fs::write(&path, json).unwrap();
    path
}

#[tokio::test]
async fn test_publish_single_cover_end_to_end() {
    logging::init(false);

    let dir = TempDir::new().unwrap();
    let descriptor = write_descriptor(
        dir.path(),
        r#"{"title":"T","content":"Body","tags":["x"],"cover":"c.png","images":[]}"#,
        &["c.png"],
    );
    let job = load_publish_job(&descriptor).await.unwrap();

    let page = StubPage::new(&["#upload", "#title", "#editor", "#publish"]);
    let registry = stub_registry();
    let timings = Timings::zero();
    let flow = PublishFlow::new(&page, &registry, &timings, "https://creator.example/publish");

    let ack = flow.publish(&job).await.unwrap();

    assert_eq!(ack.media_count, 1);
    assert_eq!(ack.tags_committed, 1);
    assert_eq!(ack.reports.len(), Step::TOTAL);
    for (report, step) in ack.reports.iter().zip(Step::ALL) {
        assert_eq!(report.step, step);
        assert_eq!(report.outcome, StepOutcome::Succeeded);
    }

    assert_eq!(
        page.log(),
        vec![
            "goto https://creator.example/publish",
            "upload c.png",
            "click #title",
            "clear #title",
            "type #title T",
            "click #editor",
            "type #editor Body",
            "key Enter",
            "key Enter",
            "type #editor #x",
            "key Enter",
            "click #publish",
        ]
    );
}

#[tokio::test]
async fn test_missing_publish_button_fails_at_submit() {
    let dir = TempDir::new().unwrap();
    let descriptor = write_descriptor(
        dir.path(),
        r#"{"title":"T","content":"Body","tags":[],"cover":"c.png","images":["a.png"]}"#,
        &["c.png", "a.png"],
    );
    let job = load_publish_job(&descriptor).await.unwrap();

    let page = StubPage::new(&["#upload", "#title", "#editor"]);
    let registry = stub_registry();
    let timings = Timings::zero();
    let flow = PublishFlow::new(&page, &registry, &timings, "https://creator.example/publish");

    let err = flow.publish(&job).await.unwrap_err();
    match err {
        PublishError::StepFailure { step, target, .. } => {
            assert_eq!(step, Step::Submit);
            assert_eq!(target, Some(Target::PublishButton));
        }
        other => panic!("意外的错误: {other}"),
    }

    let log = page.log();
    assert_eq!(log[1], "upload c.png,a.png");
    assert!(!log.iter().any(|entry| entry.starts_with("click #publish")));
}

#[tokio::test]
async fn test_env_override_wins_over_defaults() {
    let mut registry = stub_registry();
    registry.override_top(Target::TitleInput, "#new-title");

    let page = StubPage::new(&["#new-title", "#title"]);
    let resolved = registry.resolve(&page, Target::TitleInput).await;
    assert_eq!(resolved.map(|l| l.to_string()), Some("#new-title".to_string()));
}

#[tokio::test]
async fn test_missing_media_rejected_before_browser() {
    let dir = TempDir::new().unwrap();
    let descriptor = write_descriptor(
        dir.path(),
        r#"{"title":"T","content":"Body","cover":"gone.png"}"#,
        &[],
    );

    let err = App::new(Config::default())
        .run(Mode::Publish { descriptor })
        .await
        .unwrap_err();
    assert!(matches!(err, PublishError::Config(_)));
    assert_eq!(err.exit_code(), 1);
}

#[tokio::test]
#[ignore] // 默认忽略，需要手动运行：cargo test -- --ignored
async fn test_login_with_real_browser() {
    // 初始化日志
    logging::init(true);

    // 加载配置
    let config = Config::from_env();

    let result = App::new(config)
        .run(Mode::Login {
            timeout: Duration::from_secs(120),
        })
        .await;

    assert!(result.is_ok(), "应该能够在 120 秒内完成登录");
}
