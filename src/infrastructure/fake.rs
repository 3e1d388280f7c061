//! 内存中的假页面，单元测试用

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;

use crate::infrastructure::PageDriver;
use crate::services::selector_registry::Locator;

/// 假页面上发生过的操作
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Goto(String),
    SetFiles(String, Vec<PathBuf>),
    Click(String),
    Clear(String),
    Type(String, String),
    Key(String),
}

#[derive(Default)]
pub struct FakePage {
    elements: HashSet<String>,
    broken: HashSet<String>,
    failing: HashSet<String>,
    /// 选择器在被查询超过 n 次之后才出现
    appear_after: HashMap<String, usize>,
    query_counts: Mutex<HashMap<String, usize>>,
    queried: Mutex<Vec<String>>,
    actions: Mutex<Vec<Action>>,
}

impl FakePage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_element(mut self, selector: &str) -> Self {
        self.elements.insert(selector.to_string());
        self
    }

    /// 查询该选择器会返回错误
    pub fn with_broken(mut self, selector: &str) -> Self {
        self.broken.insert(selector.to_string());
        self
    }

    /// 元素存在，但对它的操作会失败
    pub fn with_failing(mut self, selector: &str) -> Self {
        self.elements.insert(selector.to_string());
        self.failing.insert(selector.to_string());
        self
    }

    pub fn with_element_after(mut self, selector: &str, queries: usize) -> Self {
        self.appear_after.insert(selector.to_string(), queries);
        self
    }

    pub fn queried(&self) -> Vec<String> {
        self.queried.lock().unwrap().clone()
    }

    pub fn actions(&self) -> Vec<Action> {
        self.actions.lock().unwrap().clone()
    }

    fn record(&self, action: Action) {
        self.actions.lock().unwrap().push(action);
    }

    fn check_action(&self, locator: &Locator) -> Result<()> {
        let key = locator.as_str();
        if self.failing.contains(key) {
            bail!("操作失败: {}", key);
        }
        if !self.elements.contains(key) && !self.appear_after.contains_key(key) {
            bail!("未找到元素: {}", key);
        }
        Ok(())
    }
}

#[async_trait]
impl PageDriver for FakePage {
    async fn goto(&self, url: &str, _timeout: Duration) -> Result<()> {
        self.record(Action::Goto(url.to_string()));
        Ok(())
    }

    async fn count(&self, locator: &Locator) -> Result<usize> {
        let key = locator.as_str().to_string();
        self.queried.lock().unwrap().push(key.clone());

        if self.broken.contains(&key) {
            bail!("非法选择器: {}", key);
        }
        if self.elements.contains(&key) {
            return Ok(1);
        }
        if let Some(&after) = self.appear_after.get(&key) {
            let mut counts = self.query_counts.lock().unwrap();
            let n = counts.entry(key).or_insert(0);
            *n += 1;
            return Ok(if *n > after { 1 } else { 0 });
        }
        Ok(0)
    }

    async fn set_input_files(&self, locator: &Locator, files: &[PathBuf]) -> Result<()> {
        self.check_action(locator)?;
        self.record(Action::SetFiles(locator.as_str().to_string(), files.to_vec()));
        Ok(())
    }

    async fn click(&self, locator: &Locator) -> Result<()> {
        self.check_action(locator)?;
        self.record(Action::Click(locator.as_str().to_string()));
        Ok(())
    }

    async fn clear(&self, locator: &Locator) -> Result<()> {
        self.check_action(locator)?;
        self.record(Action::Clear(locator.as_str().to_string()));
        Ok(())
    }

    async fn type_text(&self, locator: &Locator, text: &str, _delay: Duration) -> Result<()> {
        self.check_action(locator)?;
        self.record(Action::Type(locator.as_str().to_string(), text.to_string()));
        Ok(())
    }

    async fn press_key(&self, key: &str) -> Result<()> {
        self.record(Action::Key(key.to_string()));
        Ok(())
    }
}
