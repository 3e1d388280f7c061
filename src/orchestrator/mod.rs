//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责一次运行的完整生命周期，是整个系统的"指挥中心"。
//!
//! ### `app` - 运行入口
//! - 加载任务描述文件
//! - 管理浏览器会话（打开、保持、关闭）
//! - 选择运行模式（发布 / 演练 / 登录）
//! - 成功后播放提示音，输出汇总
//!
//! ## 层次关系
//!
//! ```text
//! app (一次运行)
//!     ↓
//! workflow::PublishFlow (五个步骤)
//!     ↓
//! services (能力层：selector_registry / auth_poller / notifier)
//!     ↓
//! infrastructure (基础设施：PageDriver)
//! ```
//!
//! 只有编排层持有 Session；下层只借用页面驱动。

pub mod app;

pub use app::{App, Mode, DEFAULT_LOGIN_TIMEOUT};
