/// 日志工具模块
///
/// 提供日志初始化和输出格式的辅助函数
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::workflow::publish_step::{Step, StepReport};

/// 初始化日志
///
/// `RUST_LOG` 优先；否则 verbose 时为 debug，默认 info
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,redbook_publisher={}", default_level)));

    // 重复初始化（如测试中）直接忽略
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 记录程序启动信息
pub fn log_startup(title: &str, media_count: usize, tag_count: usize) {
    info!("{}", "=".repeat(60));
    info!("🚀 小红书图文自动发布");
    info!("🕐 {}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S"));
    info!("{}", "=".repeat(60));
    info!("📄 标题: {}", truncate_text(title, 40));
    info!("🖼️  图片: {} 张", media_count);
    info!("🏷️  标签: {} 个", tag_count);
}

/// 步骤标题
pub fn log_step(step: Step) {
    info!("\n{} 步骤 {}/{}: {}", step.icon(), step.number(), Step::TOTAL, step.label());
}

/// 打印最终汇总
pub fn print_summary(reports: &[StepReport], confirmed: bool) {
    info!("\n{}", "=".repeat(60));
    info!("🎉 发布完成");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    for report in reports {
        info!("{}", report);
    }
    if !confirmed {
        info!("💡 未检测到平台确认提示，请在浏览器中核对发布结果");
    }
    info!("{}", "=".repeat(60));
}

/// 打印失败信息
pub fn print_failure(reason: &str) {
    info!("\n{}", "=".repeat(60));
    error!("❌ 失败: {}", reason);
    info!("{}", "=".repeat(60));
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度（按字符计）
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_counts_chars() {
        assert_eq!(truncate_text("小红书发布", 3), "小红书...");
        assert_eq!(truncate_text("short", 10), "short");
        assert_eq!(truncate_text("", 0), "");
    }

    #[test]
    fn test_init_twice_is_harmless() {
        init(false);
        init(true);
    }
}
