mod config_errors;
mod fs_abstraction;
