//! 正文编辑器输入计划
//!
//! 把正文和标签展开成一串有序的编辑器输入，流程层按顺序执行。
//! 该编辑器中一次回车只是段内换行，两次回车才是新段落。

/// 编辑器输入
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorInput {
    /// 输入一段正文
    Paragraph(String),
    /// 段落之间的两次回车
    ParagraphBreak,
    /// 正文与标签之间的两次回车
    TagSeparator,
    /// 输入一个标签（已带 `#`），等待后回车确认
    Tag(String),
}

/// 按空行拆分段落，纯空白段落被丢弃
pub fn split_paragraphs(body: &str) -> Vec<&str> {
    body.split("\n\n")
        .map(|p| p.trim_matches(|c| c == '\r' || c == '\n'))
        .filter(|p| !p.trim().is_empty())
        .collect()
}

/// 标签统一加 `#` 前缀，已有前缀的保持不变
pub fn normalize_tag(tag: &str) -> Option<String> {
    let tag = tag.trim();
    if tag.is_empty() || tag == "#" {
        return None;
    }
    if tag.starts_with('#') {
        Some(tag.to_string())
    } else {
        Some(format!("#{}", tag))
    }
}

/// 生成完整的输入序列
///
/// 段落之间插入 `ParagraphBreak`，最后一段之后不插入；
/// 有标签时先插入 `TagSeparator`，再按原顺序逐个输入标签。
pub fn plan_editor_inputs(body: &str, tags: &[String]) -> Vec<EditorInput> {
    let body = body.replace("\r\n", "\n");
    let paragraphs = split_paragraphs(&body);

    let mut inputs = Vec::with_capacity(paragraphs.len() * 2 + tags.len() + 1);
    for (i, paragraph) in paragraphs.iter().enumerate() {
        inputs.push(EditorInput::Paragraph(paragraph.to_string()));
        if i + 1 < paragraphs.len() {
            inputs.push(EditorInput::ParagraphBreak);
        }
    }

    let tags: Vec<String> = tags.iter().filter_map(|t| normalize_tag(t)).collect();
    if !tags.is_empty() {
        inputs.push(EditorInput::TagSeparator);
        inputs.extend(tags.into_iter().map(EditorInput::Tag));
    }

    inputs
}
