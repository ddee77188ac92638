//! 工作流模块
//!
//! 提供高层 API 封装完整的中继流程

pub mod relay;

pub use relay::{Collaborators, Relay, RelayOutcome, http_client};
