//! 选择器注册表 - 业务能力层
//!
//! 每个逻辑目标（上传控件、标题框、正文编辑器……）对应一组按优先级排列的候选定位表达式。
//! 解析时按顺序逐个查询当前页面，第一个能匹配到元素的候选即为结果。
//!
//! 本模块不做任何等待，重试/轮询由调用方决定。

use std::collections::HashMap;
use std::fmt;

use tracing::debug;

use crate::infrastructure::PageDriver;

/// 逻辑目标
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    /// 图片上传控件（同时作为"已登录"信号）
    UploadInput,
    /// 标题输入框
    TitleInput,
    /// 正文富文本编辑器
    ContentEditor,
    /// 发布按钮
    PublishButton,
    /// 已上传图片的缩略图
    ImageItem,
    /// 发布成功提示
    PublishSuccess,
}

impl Target {
    pub const ALL: [Target; 6] = [
        Target::UploadInput,
        Target::TitleInput,
        Target::ContentEditor,
        Target::PublishButton,
        Target::ImageItem,
        Target::PublishSuccess,
    ];

    /// 设置文件中使用的键名
    pub fn key(self) -> &'static str {
        match self {
            Target::UploadInput => "upload_input",
            Target::TitleInput => "title_input",
            Target::ContentEditor => "content_container",
            Target::PublishButton => "publish_button",
            Target::ImageItem => "image_item",
            Target::PublishSuccess => "publish_success",
        }
    }

    /// 覆盖最高优先级候选的环境变量名
    pub fn env_var(self) -> &'static str {
        match self {
            Target::UploadInput => "UPLOAD_INPUT_SELECTOR",
            Target::TitleInput => "TITLE_INPUT_SELECTOR",
            Target::ContentEditor => "CONTENT_CONTAINER_SELECTOR",
            Target::PublishButton => "PUBLISH_BUTTON_SELECTOR",
            Target::ImageItem => "IMAGE_ITEM_SELECTOR",
            Target::PublishSuccess => "PUBLISH_SUCCESS_SELECTOR",
        }
    }

    /// 日志中显示的名称
    pub fn label(self) -> &'static str {
        match self {
            Target::UploadInput => "上传控件",
            Target::TitleInput => "标题输入框",
            Target::ContentEditor => "正文编辑器",
            Target::PublishButton => "发布按钮",
            Target::ImageItem => "图片缩略图",
            Target::PublishSuccess => "发布成功提示",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Target::ALL.into_iter().find(|t| t.key() == key)
    }

    /// 内置的候选列表
    fn default_candidates(self) -> &'static [&'static str] {
        match self {
            Target::UploadInput => &[
                r#"input[type="file"]"#,
                r#"input[type="file"][accept*="image"]"#,
                r#".upload-wrapper input[type="file"]"#,
                "input.upload-input",
            ],
            Target::TitleInput => &[
                r#"input[placeholder*="标题"]"#,
                r#".c-input_inner input[type="text"]"#,
                "input.title-input",
                "#post-textarea",
            ],
            Target::ContentEditor => &[
                r#"div[contenteditable="true"]"#,
                r#"[data-slate-editor="true"]"#,
                ".publish-container textarea",
                r#"div[role="textbox"]"#,
                "#post-textarea",
                ".ql-editor",
                ".content-input",
                r#"textarea[placeholder*="正文"]"#,
            ],
            Target::PublishButton => &[
                r#"button:has-text("发布")"#,
                ".css-k405vo",
                ".publish-btn",
                "button.publishBtn",
            ],
            Target::ImageItem => &[".upload-list-item", ".image-item", ".upload-card"],
            Target::PublishSuccess => &["text=发布成功", ".publish-success", ".success-container"],
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// 定位表达式
///
/// 支持三种写法：
/// - 普通 CSS 选择器
/// - `xpath=...` 或以 `//` 开头的 XPath
/// - `css:has-text("文字")`：CSS 匹配后再按可见文字包含过滤
/// - `text=文字`，转换为 XPath 文本匹配
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    Css(String),
    XPath(String),
    CssText { css: String, text: String },
}

impl Locator {
    pub fn parse(expr: &str) -> Self {
        let expr = expr.trim();

        if let Some(xpath) = expr.strip_prefix("xpath=") {
            return Locator::XPath(xpath.to_string());
        }
        if expr.starts_with("//") || expr.starts_with("(//") {
            return Locator::XPath(expr.to_string());
        }
        if let Some(text) = expr.strip_prefix("text=") {
            return Locator::XPath(format!(
                "//*[normalize-space(text())={}]",
                xpath_literal(strip_quotes(text))
            ));
        }
        if let Some((css, rest)) = expr.split_once(":has-text(") {
            if let Some(text) = rest.strip_suffix(')') {
                let css = css.trim();
                return Locator::CssText {
                    css: if css.is_empty() { "*" } else { css }.to_string(),
                    text: strip_quotes(text).to_string(),
                };
            }
        }

        Locator::Css(expr.to_string())
    }

    /// 底层选择器，文字过滤的定位只返回 CSS 部分
    pub fn as_str(&self) -> &str {
        match self {
            Locator::Css(s) | Locator::XPath(s) => s,
            Locator::CssText { css, .. } => css,
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Css(s) => write!(f, "{}", s),
            Locator::XPath(s) => write!(f, "xpath={}", s),
            Locator::CssText { css, text } => write!(f, "{}:has-text({:?})", css, text),
        }
    }
}

fn strip_quotes(text: &str) -> &str {
    let text = text.trim();
    for quote in ['"', '\''] {
        if let Some(inner) = text
            .strip_prefix(quote)
            .and_then(|t| t.strip_suffix(quote))
        {
            return inner;
        }
    }
    text
}

/// XPath 字符串字面量，同时含有单双引号时用 concat() 拼接
fn xpath_literal(text: &str) -> String {
    if !text.contains('"') {
        format!("\"{}\"", text)
    } else if !text.contains('\'') {
        format!("'{}'", text)
    } else {
        let parts: Vec<String> = text
            .split('"')
            .map(|p| format!("\"{}\"", p))
            .collect();
        format!("concat({})", parts.join(", '\"', "))
    }
}

/// 选择器注册表
///
/// 启动时构建一次，之后只读
#[derive(Debug, Clone)]
pub struct SelectorRegistry {
    table: HashMap<Target, Vec<Locator>>,
}

impl SelectorRegistry {
    /// 内置候选列表
    pub fn defaults() -> Self {
        let table = Target::ALL
            .into_iter()
            .map(|t| {
                let candidates = t.default_candidates().iter().map(|e| Locator::parse(e)).collect();
                (t, candidates)
            })
            .collect();
        Self { table }
    }

    /// 用给定表达式整体替换某个目标的候选列表
    pub fn replace(&mut self, target: Target, exprs: &[String]) {
        let candidates = exprs.iter().map(|e| Locator::parse(e)).collect();
        self.table.insert(target, candidates);
    }

    /// 把一个表达式放到最高优先级，原列表中相同的候选会被去掉
    pub fn override_top(&mut self, target: Target, expr: &str) {
        let top = Locator::parse(expr);
        let list = self.table.entry(target).or_default();
        list.retain(|l| *l != top);
        list.insert(0, top);
    }

    /// 读取 `Target::env_var()` 对应的环境变量作为最高优先级候选
    pub fn apply_env_overrides(&mut self) {
        for target in Target::ALL {
            if let Ok(expr) = std::env::var(target.env_var()) {
                if !expr.trim().is_empty() {
                    debug!("{} 使用环境变量选择器: {}", target.label(), expr);
                    self.override_top(target, &expr);
                }
            }
        }
    }

    pub fn candidates(&self, target: Target) -> &[Locator] {
        self.table.get(&target).map(Vec::as_slice).unwrap_or(&[])
    }

    /// 解析目标：返回第一个在当前页面能匹配到元素的候选
    ///
    /// 查询出错视为未匹配，继续尝试下一个候选；命中后不再查询后面的候选。
    pub async fn resolve<D>(&self, driver: &D, target: Target) -> Option<Locator>
    where
        D: PageDriver + ?Sized,
    {
        for locator in self.candidates(target) {
            debug!("尝试选择器 [{}]: {}", target.label(), locator);
            match driver.count(locator).await {
                Ok(n) if n > 0 => {
                    debug!("✓ 找到{} ({} 个匹配): {}", target.label(), n, locator);
                    return Some(locator.clone());
                }
                Ok(_) => {}
                Err(e) => {
                    debug!("选择器查询失败 {}: {}", locator, e);
                }
            }
        }
        None
    }
}

impl Default for SelectorRegistry {
    fn default() -> Self {
        Self::defaults()
    }
}
