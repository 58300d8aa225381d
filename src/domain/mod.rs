// Domain layer - Core business logic

pub mod errors;
pub mod marks;
pub mod model;
pub mod pairs;
pub mod rules;
