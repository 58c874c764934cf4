//! Command-line front end of `cv-updater`: work.ua steps, the browser actor,
//! and the `login` / `update` / `status` commands.

pub mod browser;
pub mod cmd;
pub mod output;
pub mod site;
pub mod steps;
