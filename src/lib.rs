pub mod bench;
pub mod config;
pub mod path_utils;
pub mod report;
pub mod system_info;
