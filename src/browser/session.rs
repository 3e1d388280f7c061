//! 浏览器会话
//!
//! 会话持有 Browser、事件处理任务和唯一的工作页面，运行期间只打开一个页面。
//! 自己启动的浏览器在结束时关闭；连接到的外部浏览器永远不关闭。

use std::path::Path;
use std::time::Duration;

use chromiumoxide::error::CdpError;
use chromiumoxide::{Browser, Handler};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

use crate::browser::connection::{connect_to_browser, pick_page};
use crate::browser::launcher::launch_persistent_browser;
use crate::config::Config;
use crate::error::PublishError;
use crate::infrastructure::ChromePage;

const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);
const PAGE_HOST_HINT: &str = "xiaohongshu.com";

pub struct Session {
    browser: Browser,
    page: ChromePage,
    handler_task: JoinHandle<()>,
    attached: bool,
}

impl Session {
    /// 启动（或连接）浏览器并准备工作页面
    pub async fn open(config: &Config) -> Result<Self, PublishError> {
        let attached = config.browser_debug_port.is_some();

        let (browser, handler) = match config.browser_debug_port {
            Some(port) => connect_to_browser(port)
                .await
                .map_err(|e| PublishError::launch(format!("无法连接端口 {}", port), e))?,
            None => {
                prepare_profile_dir(&config.profile_dir)?;
                launch_persistent_browser(config)
                    .await
                    .map_err(|e| PublishError::launch("浏览器启动失败", e))?
            }
        };

        let handler_task = spawn_handler(handler);

        // 添加短暂延迟以等待浏览器状态同步
        sleep(Duration::from_millis(300)).await;

        let page = pick_page(&browser, Some(PAGE_HOST_HINT))
            .await
            .map_err(|e| PublishError::launch("无法获取页面", e))?;

        info!("✅ 浏览器已就绪");
        Ok(Self {
            browser,
            page: ChromePage::new(page),
            handler_task,
            attached,
        })
    }

    pub fn page(&self) -> &ChromePage {
        &self.page
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    /// 等待用户按 Ctrl+C 或关闭浏览器窗口
    pub async fn wait_until_closed(&mut self) {
        info!("🖥️  浏览器保持打开，按 Ctrl+C 退出");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => info!("收到 Ctrl+C"),
            _ = &mut self.handler_task => info!("浏览器窗口已关闭"),
        }
    }

    /// 结束会话，失败只记录日志
    pub async fn close(mut self) {
        if self.attached {
            info!("🔌 断开外部浏览器连接（浏览器保持打开）");
            self.handler_task.abort();
            return;
        }

        info!("🧹 关闭浏览器...");
        if let Err(e) = self.browser.close().await {
            debug!("关闭浏览器失败: {}", e);
        }
        match timeout(CLOSE_TIMEOUT, self.browser.wait()).await {
            Ok(Ok(_)) => debug!("浏览器进程已退出"),
            Ok(Err(e)) => debug!("等待浏览器退出失败: {}", e),
            Err(_) => {
                warn!("⚠️  浏览器未在 {} 秒内退出，强制结束", CLOSE_TIMEOUT.as_secs());
                let _ = self.browser.kill().await;
            }
        }
        self.handler_task.abort();
    }
}

/// 在后台处理浏览器事件，连接断开时结束
fn spawn_handler(mut handler: Handler) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = handler.next().await {
            match event {
                Ok(()) => {}
                Err(CdpError::Ws(e)) => {
                    debug!("浏览器连接断开: {}", e);
                    break;
                }
                Err(e) => debug!("浏览器事件处理出错: {}", e),
            }
        }
    })
}

/// 创建 Profile 目录，首次运行时给出登录提示
fn prepare_profile_dir(dir: &Path) -> Result<(), PublishError> {
    if is_first_run(dir) {
        info!("{}", "─".repeat(60));
        info!("🆕 首次运行：将使用新的浏览器 Profile");
        info!("   目录: {}", dir.display());
        info!("   请在打开的浏览器中登录小红书，登录状态会被保存");
        info!("{}", "─".repeat(60));
    }
    std::fs::create_dir_all(dir)
        .map_err(|e| PublishError::launch(format!("无法创建 Profile 目录 {}", dir.display()), e))
}

/// Chrome 首次使用 Profile 时才会创建 `Default` 子目录
pub fn is_first_run(dir: &Path) -> bool {
    !dir.join("Default").is_dir()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_first_run_detection() {
        let tmp = TempDir::new().unwrap();
        let profile = tmp.path().join("profile");
        assert!(is_first_run(&profile));

        prepare_profile_dir(&profile).unwrap();
        assert!(profile.is_dir());
        assert!(is_first_run(&profile));

        std::fs::create_dir(profile.join("Default")).unwrap();
        assert!(!is_first_run(&profile));
    }
}
