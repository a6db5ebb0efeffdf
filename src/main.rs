#[tokio::main]
async fn main() {
    if let Err(e) = salesboard_lib::run().await {
        log::error!("{e}");
        eprintln!("salesboard: {e}");
        std::process::exit(1);
    }
}
