//! 核心数据模型模块
//!
//! 定义偏好引擎的核心数据结构：AttributeKey, Profile, WeightStore, ProbeResult 等。

pub mod attribute;
pub mod probe;
pub mod profile;
pub mod weights;

pub use attribute::AttributeKey;
pub use probe::{Hotspot, InsightReport, ProbeOutcome, ProbeResult};
pub use profile::{Profile, ProfileRecord};
pub use weights::{WeightPolicy, WeightSnapshot, WeightStore};
