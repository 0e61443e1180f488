//! Services bundled for exercising the SDK end-to-end.

pub mod extra_feature;
pub mod result_sample;

pub use extra_feature::ExtraFeature;
pub use result_sample::ResultSample;
