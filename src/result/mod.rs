pub mod descriptor;
pub mod heuristic;
pub mod section;

pub use descriptor::{FileRef, FlatSection, Milestones, ResolvedHeuristic, ResponseInfo, ResultBody, ResultDescriptor};
pub use heuristic::Heuristic;
pub use section::{BodyFormat, ResultSection, ServiceResult};
