pub mod export;
mod progress;
mod runner;
mod summary;


pub use runner::run_local;
