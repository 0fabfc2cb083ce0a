use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    match auto_auth::run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            eprintln!("auto-auth: {e}");
            ExitCode::FAILURE
        }
    }
}
