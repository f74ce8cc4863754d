pub mod line;
pub mod sequence;
pub mod trigger;
