pub mod assess;
pub mod attempt;
pub mod card;
pub mod commands;
pub mod config;
pub mod palette;
pub mod scheduler;
pub mod sm2;
pub mod stats;
pub mod store;
pub mod streaks;
pub mod tasks;
pub mod tui;
pub mod utils;
