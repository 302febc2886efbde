//! Differential action models.

mod free_body;
mod lqr;

pub use free_body::FreeBodyModel;
pub use lqr::LqrModel;
