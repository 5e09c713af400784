mod cli;
mod infra;
mod report;

use underwriting_engine::error::AppError;

pub fn run() -> Result<(), AppError> {
    cli::run()
}
