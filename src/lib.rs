pub mod config;
pub mod sgs;
pub mod shaders;
pub mod splitter;
pub mod util;

pub use shaders::build_tasks;
