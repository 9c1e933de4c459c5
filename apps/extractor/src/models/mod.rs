pub mod dates;
pub mod job_posting;

pub use job_posting::{JobPostingsContainer, SchemaError};
