pub mod merge;
pub mod reshape;

pub use merge::merge_record;
pub use reshape::reshape;
