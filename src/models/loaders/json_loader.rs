use std::path::{Path, PathBuf};

use tokio::fs;

use crate::error::ConfigError;
use crate::models::job::{JobDescriptor, PublishJob};

/// 读取任务描述文件并转换为 PublishJob
///
/// 图片路径相对于描述文件所在目录解析为绝对路径，并检查文件是否存在。
/// 任何一项失败都在启动浏览器之前返回。
pub async fn load_publish_job(descriptor_path: &Path) -> Result<PublishJob, ConfigError> {
    let descriptor_path = absolutize(descriptor_path)?;

    if !fs::try_exists(&descriptor_path).await.unwrap_or(false) {
        return Err(ConfigError::DescriptorNotFound {
            path: descriptor_path,
        });
    }

    let content = fs::read_to_string(&descriptor_path)
        .await
        .map_err(|source| ConfigError::ReadFailed {
            path: descriptor_path.clone(),
            source,
        })?;

    let descriptor: JobDescriptor =
        serde_json::from_str(&content).map_err(|source| ConfigError::DescriptorParse {
            path: descriptor_path.clone(),
            source,
        })?;

    let base_dir = descriptor_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    let job = PublishJob::from_descriptor(descriptor, &base_dir)?;

    for path in job.media() {
        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Err(ConfigError::MediaNotFound { path });
        }
    }

    tracing::info!(
        "成功加载任务: {} 张图片, {} 个标签",
        job.media().len(),
        job.tags().len()
    );

    Ok(job)
}

fn absolutize(path: &Path) -> Result<PathBuf, ConfigError> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().map_err(|e| ConfigError::PathResolution {
        reason: e.to_string(),
    })?;
    Ok(cwd.join(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs as std_fs;
    use tokio_test::{assert_err, assert_ok};

    fn write_job(dir: &Path, json: &str) -> PathBuf {
        let path = dir.join("config.json");
        std_fs::write(&path, json).unwrap();
        path
    }

    #[tokio::test]
    async fn test_load_resolves_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        std_fs::create_dir(dir.path().join("imgs")).unwrap();
        for name in ["imgs/c.png", "imgs/a.png", "imgs/b.png"] {
            std_fs::write(dir.path().join(name), b"png").unwrap();
        }
        let path = write_job(
            dir.path(),
            r#"{"title": "标题", "content": "P1\n\nP2", "tags": ["旅行"], "cover": "imgs/c.png", "images": ["imgs/a.png", "imgs/b.png"]}"#,
        );

        let job = assert_ok!(load_publish_job(&path).await);
        let media = job.media();
        assert_eq!(media.len(), 3);
        assert!(media.iter().all(|p| p.is_absolute()));
        assert!(media[0].ends_with("imgs/c.png"));
        assert!(media[1].ends_with("imgs/a.png"));
        assert!(media[2].ends_with("imgs/b.png"));
    }

    #[tokio::test]
    async fn test_load_missing_media() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_job(
            dir.path(),
            r#"{"title": "T", "content": "Body", "cover": "missing.png"}"#,
        );

        let err = assert_err!(load_publish_job(&path).await);
        assert!(matches!(err, ConfigError::MediaNotFound { .. }));
    }

    #[tokio::test]
    async fn test_load_missing_descriptor() {
        let dir = tempfile::tempdir().unwrap();
        let err = assert_err!(load_publish_job(&dir.path().join("nope.json")).await);
        assert!(matches!(err, ConfigError::DescriptorNotFound { .. }));
    }

    #[tokio::test]
    async fn test_load_malformed_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_job(dir.path(), "{ not json");
        let err = assert_err!(load_publish_job(&path).await);
        assert!(matches!(err, ConfigError::DescriptorParse { .. }));
    }

    #[tokio::test]
    async fn test_load_missing_title() {
        let dir = tempfile::tempdir().unwrap();
        std_fs::write(dir.path().join("c.png"), b"png").unwrap();
        let path = write_job(dir.path(), r#"{"content": "Body", "cover": "c.png"}"#);
        let err = assert_err!(load_publish_job(&path).await);
        assert!(matches!(err, ConfigError::MissingField { field: "title" }));
    }
}
