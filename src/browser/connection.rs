use anyhow::Result;
use chromiumoxide::{Browser, Handler, Page};
use tracing::{debug, error, info};

/// 连接到已开启远程调试端口的浏览器
pub async fn connect_to_browser(port: u16) -> Result<(Browser, Handler)> {
    let browser_url = format!("http://localhost:{}", port);
    info!("正在连接到浏览器: {}", browser_url);

    let (browser, handler) = Browser::connect(&browser_url).await.map_err(|e| {
        error!("连接浏览器失败: {}", e);
        e
    })?;
    debug!("浏览器连接成功");

    Ok((browser, handler))
}

/// 选择工作页面
///
/// 优先复用 URL 包含 `url_hint` 的已有标签页，其次复用第一个标签页，都没有时新建空白页
pub async fn pick_page(browser: &Browser, url_hint: Option<&str>) -> Result<Page> {
    let pages = browser.pages().await?;
    debug!("获取到 {} 个页面", pages.len());

    if let Some(hint) = url_hint {
        debug!("正在查找 URL 包含 '{}' 的页面", hint);
        for p in pages.iter() {
            if let Ok(Some(url)) = p.url().await {
                debug!("检查页面: {}", url);
                if url.contains(hint) {
                    info!("✓ 复用已有页面: {}", url);
                    return Ok(p.clone());
                }
            }
        }
        debug!("未找到匹配的页面");
    }

    if let Some(first) = pages.into_iter().next() {
        return Ok(first);
    }

    debug!("创建空白页面");
    let page = browser.new_page("about:blank").await.map_err(|e| {
        error!("创建空白页面失败: {}", e);
        e
    })?;
    Ok(page)
}
