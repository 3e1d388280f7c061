use std::path::Path;

use anyhow::{anyhow, Result};
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::{Browser, BrowserConfig, Handler};
use tracing::{debug, error, info};

use crate::config::Config;

/// 启动带界面的浏览器，使用专用 Profile 保存登录状态
pub async fn launch_persistent_browser(config: &Config) -> Result<(Browser, Handler)> {
    info!("🚀 启动浏览器...");
    debug!("Profile 目录: {}", config.profile_dir.display());

    let browser_config = build_browser_config(config, &config.profile_dir).map_err(|e| {
        error!("配置浏览器失败: {}", e);
        anyhow!("配置浏览器失败: {}", e)
    })?;

    let (browser, handler) = Browser::launch(browser_config).await.map_err(|e| {
        error!("启动浏览器失败: {}", e);
        anyhow!("启动浏览器失败: {}", e)
    })?;
    debug!("浏览器启动成功");

    Ok((browser, handler))
}

fn build_browser_config(config: &Config, profile_dir: &Path) -> Result<BrowserConfig, String> {
    let viewport = Viewport {
        width: config.viewport_width,
        height: config.viewport_height,
        ..Default::default()
    };

    let mut builder = BrowserConfig::builder()
        .with_head()
        .user_data_dir(profile_dir)
        .viewport(Some(viewport))
        .window_size(config.viewport_width, config.viewport_height)
        .args(vec![
            "--start-maximized",
            // 隐藏 navigator.webdriver 自动化标记
            "--disable-blink-features=AutomationControlled",
            "--no-first-run",
            "--no-default-browser-check",
        ]);

    if let Some(exe) = &config.chrome_executable {
        builder = builder.chrome_executable(exe);
    }

    builder.build()
}
