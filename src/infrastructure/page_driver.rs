//! 页面驱动 - 基础设施层
//!
//! 持有唯一的 page 资源，只暴露"查询 / 点击 / 输入 / 按键 / 上传"这些原子能力

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::dom::SetFileInputFilesParams;
use chromiumoxide::cdp::browser_protocol::input::{
    DispatchKeyEventParams, DispatchKeyEventType, InsertTextParams,
};
use chromiumoxide::element::Element;
use chromiumoxide::keys::get_key_definition;
use chromiumoxide::Page;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use tokio::time::sleep;
use tracing::debug;

use crate::services::selector_registry::Locator;

/// 页面能力
///
/// 职责：
/// - 不认识 PublishJob
/// - 不处理业务流程
/// - 不做任何重试
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// 导航到 URL 并等待页面加载完成
    async fn goto(&self, url: &str, timeout: Duration) -> Result<()>;

    /// 当前页面中匹配定位表达式的元素个数
    async fn count(&self, locator: &Locator) -> Result<usize>;

    /// 一次性把全部文件交给文件输入控件
    async fn set_input_files(&self, locator: &Locator, files: &[PathBuf]) -> Result<()>;

    async fn click(&self, locator: &Locator) -> Result<()>;

    /// 清空输入框 / 可编辑区域的已有内容
    async fn clear(&self, locator: &Locator) -> Result<()>;

    /// 逐字符输入，每个字符之间间隔 `delay`
    async fn type_text(&self, locator: &Locator, text: &str, delay: Duration) -> Result<()>;

    /// 在当前焦点上按下并释放一个键
    async fn press_key(&self, key: &str) -> Result<()>;
}

/// 修饰键位掩码（CDP Input.dispatchKeyEvent）
const MODIFIER_CTRL: i64 = 2;
const MODIFIER_META: i64 = 4;

/// 全选使用的修饰键：macOS 为 Command，其余为 Ctrl
fn select_all_modifier(os: &str) -> i64 {
    if os == "macos" {
        MODIFIER_META
    } else {
        MODIFIER_CTRL
    }
}

/// 单个字符的输入方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Keystroke {
    /// 换行按 Enter 键处理
    Enter,
    /// 键盘布局中存在的字符，发送完整的按键事件
    Key(char),
    /// 中文、emoji 等没有对应按键的字符，直接插入文本
    Insert(char),
}

fn plan_keystrokes(text: &str) -> Vec<Keystroke> {
    text.chars()
        .filter(|&ch| ch != '\r')
        .map(|ch| {
            if ch == '\n' {
                Keystroke::Enter
            } else if get_key_definition(ch.to_string().as_str()).is_some() {
                Keystroke::Key(ch)
            } else {
                Keystroke::Insert(ch)
            }
        })
        .collect()
}

/// 基于 chromiumoxide 的页面驱动
pub struct ChromePage {
    page: Page,
}

impl ChromePage {
    pub fn new(page: Page) -> Self {
        Self { page }
    }

    /// 执行 JS 代码并返回 JSON 结果
    pub async fn eval(&self, js_code: impl Into<String>) -> Result<JsonValue> {
        let result = self.page.evaluate(js_code.into()).await?;
        let json_value = result.into_value()?;
        Ok(json_value)
    }

    /// 执行 JS 代码并反序列化为指定类型
    pub async fn eval_as<T: DeserializeOwned>(&self, js_code: impl Into<String>) -> Result<T> {
        let json_value = self.eval(js_code).await?;
        let typed_value = serde_json::from_value(json_value)?;
        Ok(typed_value)
    }

    async fn element(&self, locator: &Locator) -> Result<Element> {
        match locator {
            Locator::Css(css) => self
                .page
                .find_element(css.as_str())
                .await
                .with_context(|| format!("未找到元素: {}", locator)),
            Locator::XPath(xpath) => self
                .page
                .find_xpath(xpath.as_str())
                .await
                .with_context(|| format!("未找到元素: {}", locator)),
            Locator::CssText { css, text } => {
                let elements = self
                    .page
                    .find_elements(css.as_str())
                    .await
                    .with_context(|| format!("未找到元素: {}", locator))?;
                for element in elements {
                    let inner = element.inner_text().await?.unwrap_or_default();
                    if inner.contains(text.as_str()) {
                        return Ok(element);
                    }
                }
                Err(anyhow!("未找到元素: {}", locator))
            }
        }
    }

    async fn dispatch_key(&self, event: DispatchKeyEventType, key: &str) -> Result<()> {
        let mut builder = DispatchKeyEventParams::builder().r#type(event.clone()).key(key);

        if let Some((code, vk, text)) = key_definition(key) {
            builder = builder
                .code(code)
                .windows_virtual_key_code(vk)
                .native_virtual_key_code(vk);
            if let (DispatchKeyEventType::KeyDown, Some(text)) = (event, text) {
                builder = builder.text(text);
            }
        }

        let params = builder
            .build()
            .map_err(|e| anyhow!("构造按键事件失败: {}", e))?;
        self.page.execute(params).await?;
        Ok(())
    }

    /// Ctrl+A / Command+A 全选当前焦点元素的内容
    async fn select_all(&self) -> Result<()> {
        let modifiers = select_all_modifier(std::env::consts::OS);
        for event in [DispatchKeyEventType::KeyDown, DispatchKeyEventType::KeyUp] {
            let is_down = matches!(event, DispatchKeyEventType::KeyDown);
            let mut params = DispatchKeyEventParams::builder()
                .r#type(event)
                .key("a")
                .code("KeyA")
                .windows_virtual_key_code(65)
                .native_virtual_key_code(65)
                .modifiers(modifiers)
                .build()
                .map_err(|e| anyhow!("构造按键事件失败: {}", e))?;
            if is_down {
                params.commands = Some(vec!["selectAll".to_string()]);
            }
            self.page.execute(params).await?;
        }
        Ok(())
    }
}

/// 常用按键的 code / 虚拟键码 / 输入文本
fn key_definition(key: &str) -> Option<(&'static str, i64, Option<&'static str>)> {
    match key {
        "Enter" => Some(("Enter", 13, Some("\r"))),
        "Tab" => Some(("Tab", 9, Some("\t"))),
        "Backspace" => Some(("Backspace", 8, None)),
        "Escape" => Some(("Escape", 27, None)),
        _ => None,
    }
}

#[async_trait]
impl PageDriver for ChromePage {
    async fn goto(&self, url: &str, timeout: Duration) -> Result<()> {
        debug!("导航到: {}", url);
        let navigation = async {
            self.page.goto(url).await?;
            self.page.wait_for_navigation().await?;
            Ok::<_, anyhow::Error>(())
        };
        tokio::time::timeout(timeout, navigation)
            .await
            .map_err(|_| anyhow!("导航超时 ({} 秒): {}", timeout.as_secs(), url))??;
        Ok(())
    }

    async fn count(&self, locator: &Locator) -> Result<usize> {
        let js_code = match locator {
            Locator::Css(css) => format!(
                "document.querySelectorAll({}).length",
                serde_json::to_string(css)?
            ),
            Locator::XPath(xpath) => format!(
                "document.evaluate({}, document, null, XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null).snapshotLength",
                serde_json::to_string(xpath)?
            ),
            Locator::CssText { css, text } => format!(
                "Array.from(document.querySelectorAll({})).filter(e => (e.innerText || '').includes({})).length",
                serde_json::to_string(css)?,
                serde_json::to_string(text)?
            ),
        };
        let count: u64 = self.eval_as(js_code).await?;
        Ok(count as usize)
    }

    async fn set_input_files(&self, locator: &Locator, files: &[PathBuf]) -> Result<()> {
        let element = self.element(locator).await?;
        let files: Vec<String> = files
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect();

        let params = SetFileInputFilesParams::builder()
            .files(files)
            .backend_node_id(element.backend_node_id.clone())
            .build()
            .map_err(|e| anyhow!("构造上传参数失败: {}", e))?;
        self.page.execute(params).await?;
        Ok(())
    }

    async fn click(&self, locator: &Locator) -> Result<()> {
        let element = self.element(locator).await?;
        element.click().await?;
        Ok(())
    }

    async fn clear(&self, locator: &Locator) -> Result<()> {
        let element = self.element(locator).await?;
        element.focus().await?;
        // 与手动删除一致，让编辑器收到真实的按键事件
        self.select_all().await?;
        self.press_key("Backspace").await?;
        Ok(())
    }

    async fn type_text(&self, locator: &Locator, text: &str, delay: Duration) -> Result<()> {
        let element = self.element(locator).await?;
        element.focus().await?;

        for stroke in plan_keystrokes(text) {
            match stroke {
                Keystroke::Enter => self.press_key("Enter").await?,
                Keystroke::Key(ch) => {
                    element.type_str(ch.to_string()).await?;
                }
                Keystroke::Insert(ch) => {
                    self.page.execute(InsertTextParams::new(ch.to_string())).await?;
                }
            }
            if !delay.is_zero() {
                sleep(delay).await;
            }
        }
        Ok(())
    }

    async fn press_key(&self, key: &str) -> Result<()> {
        self.dispatch_key(DispatchKeyEventType::KeyDown, key).await?;
        self.dispatch_key(DispatchKeyEventType::KeyUp, key).await?;
        Ok(())
    }
}
