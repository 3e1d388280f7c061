pub mod editor_plan;
pub mod publish_flow;
pub mod publish_step;

pub use editor_plan::{plan_editor_inputs, EditorInput};
pub use publish_flow::{PublishAck, PublishFlow};
pub use publish_step::{Step, StepOutcome, StepReport};
