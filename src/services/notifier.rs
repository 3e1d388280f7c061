//! 完成提示音
//!
//! 尽力而为：任何失败都降级为终端铃声，绝不向上抛出错误

use std::io::Write;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::debug;

use crate::error::NotifyError;

const SOUND_TIMEOUT: Duration = Duration::from_secs(5);

/// 各系统的提示音命令
pub fn sound_command(os: &str) -> Option<(&'static str, &'static [&'static str])> {
    match os {
        "macos" => Some(("afplay", &["/System/Library/Sounds/Glass.aiff"])),
        "windows" => Some(("rundll32", &["user32.dll,MessageBeep"])),
        "linux" => Some((
            "paplay",
            &["/usr/share/sounds/freedesktop/stereo/complete.oga"],
        )),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CompletionNotifier {
    enabled: bool,
}

impl CompletionNotifier {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    /// 播放完成提示音
    pub async fn notify(&self) {
        if !self.enabled {
            return;
        }
        debug!("🔔 播放完成提示音");

        let result = match sound_command(std::env::consts::OS) {
            Some((program, args)) => play(program, args).await,
            None => {
                ring_bell();
                Ok(())
            }
        };

        if let Err(e) = result {
            debug!("提示音播放失败，改用终端铃声: {}", e);
            ring_bell();
        }
    }
}

async fn play(program: &str, args: &[&str]) -> Result<(), NotifyError> {
    let child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .status();

    let status = match tokio::time::timeout(SOUND_TIMEOUT, child).await {
        Ok(status) => status.map_err(|source| NotifyError::Spawn {
            program: program.to_string(),
            source,
        })?,
        // 超时不算失败，声音可能已经在播放
        Err(_) => return Ok(()),
    };

    if status.success() {
        Ok(())
    } else {
        Err(NotifyError::Status {
            program: program.to_string(),
            code: status.code(),
        })
    }
}

fn ring_bell() {
    let mut stdout = std::io::stdout();
    let _ = stdout.write_all(b"\x07");
    let _ = stdout.flush();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sound_command_per_os() {
        assert_eq!(sound_command("macos").map(|(p, _)| p), Some("afplay"));
        assert_eq!(sound_command("windows").map(|(p, _)| p), Some("rundll32"));
        assert_eq!(sound_command("linux").map(|(p, _)| p), Some("paplay"));
        assert!(sound_command("freebsd").is_none());
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let err = play("definitely-not-a-real-sound-player", &[]).await.unwrap_err();
        assert!(matches!(err, NotifyError::Spawn { .. }));
    }

    #[tokio::test]
    async fn test_notify_never_fails() {
        CompletionNotifier::new(true).notify().await;
        CompletionNotifier::new(false).notify().await;
    }
}
