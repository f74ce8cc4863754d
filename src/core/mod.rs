pub mod config;
pub mod dispatcher;
pub mod evaluator;
pub mod playback;
pub mod stage;
pub mod store;
