pub mod cli;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

pub fn run() {
    if let Err(error) = try_run() {
        eprintln!("oratoria failed: {error}");
        std::process::exit(1);
    }
}

fn try_run() -> Result<(), Box<dyn std::error::Error>> {
    crate::cli::run_from_args()?;
    Ok(())
}
