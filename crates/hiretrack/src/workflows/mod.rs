pub mod applications;
pub mod bot_mimic;
