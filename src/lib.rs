pub mod config;
pub mod control;
pub mod gimbal;
pub mod predict;
pub mod runner;
pub mod sim;
pub mod site;
pub mod time;
pub mod tracker;
