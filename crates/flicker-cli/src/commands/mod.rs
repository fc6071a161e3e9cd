pub mod run;
pub mod selftest;
pub mod serve;
pub mod status;

/// Command-level error: engine failures plus file I/O around export/import.
pub type CommandError = Box<dyn std::error::Error>;
