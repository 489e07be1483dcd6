#![deny(warnings)]

pub mod audio;
pub mod config;
pub mod diff;
pub mod manifest;
pub mod provider;
pub mod reference;
pub mod report;
pub mod runner;
pub mod score;
pub mod silence;
pub mod text;
pub mod transcript;
pub mod util;
