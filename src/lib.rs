//! Recon
//!
//! Umbrella crate for the demo programs under `demos/`. Re-exports the data
//! model and the pipeline so a demo only needs one dependency.

pub use recon_data as data;
pub use recon_pipeline as pipeline;
