pub mod clock;
pub mod core;
pub mod error;
pub mod model;
pub mod parsing;
pub mod sys;
