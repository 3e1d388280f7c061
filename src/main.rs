use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tracing::error;

use redbook_publisher::orchestrator::DEFAULT_LOGIN_TIMEOUT;
use redbook_publisher::utils::logging;
use redbook_publisher::{App, Config, Mode};

/// 小红书图文自动发布
#[derive(Parser, Debug)]
#[command(name = "redbook-publisher", version, about)]
struct Cli {
    /// 任务描述文件（config.json）
    #[arg(short, long, required_unless_present = "login")]
    config: Option<PathBuf>,

    /// 设置文件（TOML）
    #[arg(long, env = "REDBOOK_SETTINGS")]
    settings: Option<PathBuf>,

    /// 显示详细日志
    #[arg(short, long)]
    verbose: bool,

    /// 只校验并打印计划，不启动浏览器
    #[arg(long, conflicts_with = "login")]
    dry_run: bool,

    /// 结束后不等待，立即关闭浏览器
    #[arg(long)]
    no_wait: bool,

    /// 打开发布页等待人工登录，保存登录状态
    #[arg(long)]
    login: bool,

    /// 登录模式的等待秒数
    #[arg(long, requires = "login")]
    login_timeout: Option<u64>,
}

impl Cli {
    fn mode(&self) -> Option<Mode> {
        if self.login {
            let timeout = self
                .login_timeout
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_LOGIN_TIMEOUT);
            return Some(Mode::Login { timeout });
        }
        let descriptor = self.config.clone()?;
        Some(if self.dry_run {
            Mode::DryRun { descriptor }
        } else {
            Mode::Publish { descriptor }
        })
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // 加载配置
    let config = match Config::load(cli.settings.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            logging::init(cli.verbose);
            error!("❌ 配置错误: {}", e);
            return ExitCode::FAILURE;
        }
    };

    // 初始化日志
    logging::init(cli.verbose || config.verbose_logging);

    let mut config = config;
    if cli.no_wait {
        config.keep_open = false;
    }

    let Some(mode) = cli.mode() else {
        error!("❌ 缺少 --config 参数");
        return ExitCode::FAILURE;
    };

    // 初始化并运行应用，失败信息已由 App 输出
    match App::new(config).run(mode).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => ExitCode::from(e.exit_code()),
    }
}
