#[tokio::main]
async fn main() {
    let code = match intake_lib::run().await {
        Ok(()) => 0,
        Err(e) => {
            tracing::error!(error = %e, "intake exited with an error");
            eprintln!("intake: {e}");
            1
        }
    };
    // stdin reads may still be parked on a blocking thread; skip runtime teardown.
    std::process::exit(code);
}
