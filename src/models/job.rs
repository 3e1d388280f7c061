use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ConfigError;

/// 任务描述文件（config.json）的原始内容
///
/// 路径相对于描述文件所在目录；字段缺失或为 null 都按空值处理
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobDescriptor {
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub content: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub cover: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub images: Vec<String>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// 一次发布任务，运行期间只读
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishJob {
    title: String,
    body: String,
    tags: Vec<String>,
    cover: Option<PathBuf>,
    images: Vec<PathBuf>,
}

impl PublishJob {
    /// 校验必填字段：标题、正文不能为空，封面和图片至少一张
    pub fn new(
        title: impl Into<String>,
        body: impl Into<String>,
        tags: Vec<String>,
        cover: Option<PathBuf>,
        images: Vec<PathBuf>,
    ) -> Result<Self, ConfigError> {
        let title = title.into();
        let body = body.into();

        if title.trim().is_empty() {
            return Err(ConfigError::MissingField { field: "title" });
        }
        if body.trim().is_empty() {
            return Err(ConfigError::MissingField { field: "content" });
        }
        if cover.is_none() && images.is_empty() {
            return Err(ConfigError::EmptyMedia);
        }

        Ok(Self {
            title,
            body,
            tags,
            cover,
            images,
        })
    }

    /// 由描述文件构造，相对路径基于 `base_dir`
    pub fn from_descriptor(descriptor: JobDescriptor, base_dir: &Path) -> Result<Self, ConfigError> {
        let cover = Some(descriptor.cover.trim())
            .filter(|c| !c.is_empty())
            .map(|c| base_dir.join(c));
        let images = descriptor
            .images
            .iter()
            .map(|img| img.trim())
            .filter(|img| !img.is_empty())
            .map(|img| base_dir.join(img))
            .collect();

        Self::new(descriptor.title, descriptor.content, descriptor.tags, cover, images)
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn cover(&self) -> Option<&Path> {
        self.cover.as_deref()
    }

    /// 上传顺序：封面永远在第一位，其后按 images 原顺序
    pub fn media(&self) -> Vec<PathBuf> {
        self.cover
            .iter()
            .chain(self.images.iter())
            .cloned()
            .collect()
    }
}
