pub mod consensus;
pub mod model;
pub mod pipeline;
pub mod processes;
pub mod state;
pub mod test_helpers;
