//! Library side of the `lis-extract` CLI: logging setup and the extraction pipeline.

pub mod logging;
pub mod pipeline;
