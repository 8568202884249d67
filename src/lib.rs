pub mod arguments;
pub mod config;
pub mod errors;
pub mod logger;
pub mod paths;
pub mod registers;
pub mod run;
pub mod storage;
pub mod telemetry;
pub mod webserver;
pub mod windows;
