//! 发布步骤与步骤结果

use std::fmt::{self, Display};

use crate::services::selector_registry::Target;

/// 发布流水线的五个步骤
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    Open,
    UploadMedia,
    FillTitle,
    FillBody,
    Submit,
}

impl Step {
    pub const ALL: [Step; 5] = [
        Step::Open,
        Step::UploadMedia,
        Step::FillTitle,
        Step::FillBody,
        Step::Submit,
    ];

    pub const TOTAL: usize = Self::ALL.len();

    /// 步骤序号（从 1 开始）
    pub fn number(self) -> usize {
        match self {
            Step::Open => 1,
            Step::UploadMedia => 2,
            Step::FillTitle => 3,
            Step::FillBody => 4,
            Step::Submit => 5,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Step::Open => "打开创作者平台",
            Step::UploadMedia => "上传图片",
            Step::FillTitle => "填写标题",
            Step::FillBody => "填写正文和标签",
            Step::Submit => "点击发布",
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            Step::Open => "🌐",
            Step::UploadMedia => "🖼️",
            Step::FillTitle => "✍️",
            Step::FillBody => "📝",
            Step::Submit => "🚀",
        }
    }

    /// 该步骤操作的目标，Open 步骤由登录检测负责
    pub fn target(self) -> Option<Target> {
        match self {
            Step::Open => None,
            Step::UploadMedia => Some(Target::UploadInput),
            Step::FillTitle => Some(Target::TitleInput),
            Step::FillBody => Some(Target::ContentEditor),
            Step::Submit => Some(Target::PublishButton),
        }
    }
}

impl Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// 单步结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// 目标找到且操作成功
    Succeeded,
    /// 目标找到但操作失败
    Failed(String),
    /// 所有候选选择器都没有匹配
    Unresolved,
}

impl StepOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, StepOutcome::Succeeded)
    }
}

/// 单步结果 + 诊断信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    pub step: Step,
    pub outcome: StepOutcome,
    pub detail: String,
}

impl StepReport {
    pub fn succeeded(step: Step, detail: impl Into<String>) -> Self {
        Self {
            step,
            outcome: StepOutcome::Succeeded,
            detail: detail.into(),
        }
    }

    pub fn failed(step: Step, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self {
            step,
            outcome: StepOutcome::Failed(reason.clone()),
            detail: reason,
        }
    }

    pub fn unresolved(step: Step) -> Self {
        let detail = match step.target() {
            Some(target) => format!("未找到{}，已尝试全部候选选择器", target.label()),
            None => "目标页面不可用".to_string(),
        };
        Self {
            step,
            outcome: StepOutcome::Unresolved,
            detail,
        }
    }
}

impl Display for StepReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mark = if self.outcome.is_success() { "✅" } else { "❌" };
        write!(
            f,
            "{} 步骤 {}/{} {}: {}",
            mark,
            self.step.number(),
            Step::TOTAL,
            self.step.label(),
            self.detail
        )
    }
}
