//! # RedBook Publisher
//!
//! 通过真实浏览器把一篇图文笔记发布到小红书创作者平台
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源（Page），只暴露能力
//! - `PageDriver` - 页面能力抽象（导航、查询、点击、输入、上传）
//! - `ChromePage` - 基于 chromiumoxide 的实现
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"
//! - `SelectorRegistry` - 每个页面目标的候选选择器，按顺序解析
//! - `LoginPoller` - 有界轮询的登录检测
//! - `CompletionNotifier` - 完成提示音
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"发布一篇图文"的完整流程
//! - `PublishFlow` - 五个步骤（打开 → 上传 → 标题 → 正文标签 → 发布）
//! - `editor_plan` - 正文段落与标签的按键计划
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/app` - 一次运行：加载任务、管理浏览器会话、选择模式
//!
//! ## 模块结构

pub mod browser;
pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use browser::Session;
pub use config::{Config, Timings};
pub use error::{AppResult, ConfigError, PublishError};
pub use infrastructure::{ChromePage, PageDriver};
pub use models::{load_publish_job, JobDescriptor, PublishJob};
pub use orchestrator::{App, Mode};
pub use services::{Locator, SelectorRegistry, Target};
pub use workflow::{PublishAck, PublishFlow, Step, StepOutcome, StepReport};
