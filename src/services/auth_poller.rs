//! 登录检测 - 业务能力层
//!
//! 平台没有"已登录"接口，只能通过登录后才会出现的上传控件来判断。
//! 检测策略是有界轮询：立即探测一次，之后每个间隔探测一次，预算耗尽后再做最后一次探测。

use std::future::Future;
use std::time::Duration;

use anyhow::Result;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::infrastructure::PageDriver;
use crate::services::selector_registry::{SelectorRegistry, Target};

/// 登录检测的最终状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginState {
    LoggedIn,
    TimedOut,
}

/// 有界轮询策略
#[derive(Debug, Clone, Copy)]
pub struct LoginPoller {
    budget: Duration,
    interval: Duration,
}

impl LoginPoller {
    pub fn new(budget: Duration, interval: Duration) -> Self {
        Self { budget, interval }
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    /// 轮询探测函数直到返回 true 或预算耗尽
    ///
    /// 首次探测成功时不做任何等待；预算耗尽后恰好再探测一次。
    pub async fn poll<F, Fut>(&self, mut probe: F) -> LoginState
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = bool>,
    {
        if probe().await {
            return LoginState::LoggedIn;
        }
        self.poll_after_miss(probe).await
    }

    /// 首次探测已经失败后的轮询部分
    async fn poll_after_miss<F, Fut>(&self, mut probe: F) -> LoginState
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = bool>,
    {
        let started = Instant::now();
        let deadline = started + self.budget;
        let mut last_reported = u64::MAX;

        loop {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            let remaining = deadline - now;
            let secs_left = remaining.as_secs_f64().ceil() as u64;
            if secs_left != last_reported {
                info!("   ⏳ 倒计时: {} 秒...", secs_left);
                last_reported = secs_left;
            }

            // 间隔为零时也至少让出一次调度，避免空转
            sleep(self.interval.min(remaining)).await;
            if self.interval.is_zero() {
                tokio::task::yield_now().await;
            }

            if Instant::now() >= deadline {
                break;
            }
            if probe().await {
                debug!("第 {:?} 检测到登录信号", started.elapsed());
                return LoginState::LoggedIn;
            }
        }

        info!("   🔍 最后检测...");
        if probe().await {
            LoginState::LoggedIn
        } else {
            LoginState::TimedOut
        }
    }

    /// 打开目标页面并等待登录
    ///
    /// 1. 导航并等待页面加载，再固定等待 `settle`
    /// 2. 用上传控件是否存在作为登录信号进行有界轮询
    pub async fn await_login<D>(
        &self,
        driver: &D,
        registry: &SelectorRegistry,
        url: &str,
        navigation_timeout: Duration,
        settle: Duration,
    ) -> Result<LoginState>
    where
        D: PageDriver + ?Sized,
    {
        driver.goto(url, navigation_timeout).await?;
        sleep(settle).await;

        info!("   🔍 检测登录状态...");
        if registry.resolve(driver, Target::UploadInput).await.is_some() {
            info!("   ✅ 已登录，可以开始上传");
            return Ok(LoginState::LoggedIn);
        }

        warn!("   ⚠️  未检测到上传控件，您可能需要登录");
        info!("   ⏰ 请在 {} 秒内完成登录...", self.budget.as_secs());
        info!("   💡 如果已经登录，请刷新页面");

        let state = self
            .poll_after_miss(|| async move {
                registry.resolve(driver, Target::UploadInput).await.is_some()
            })
            .await;

        match state {
            LoginState::LoggedIn => info!("   ✅ 检测到上传控件，登录成功！"),
            LoginState::TimedOut => warn!("   ❌ 未检测到上传控件，登录失败"),
        }
        Ok(state)
    }
}
