pub mod job;
pub mod loaders;

pub use job::{JobDescriptor, PublishJob};
pub use loaders::load_publish_job;
