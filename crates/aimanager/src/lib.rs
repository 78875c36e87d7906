pub mod agent;
pub mod blocking;
pub mod errors;
pub mod memory;
pub mod models;
pub mod parser;
pub mod prompt_template;
pub mod providers;
pub mod tools;
