mod app;
mod capture;
mod commands;
mod config;
mod episode;
mod error;
mod history;
mod logging;
mod media;
mod source;
mod transcode;
mod upload;
mod util;

#[tokio::main]
async fn main() {
    if let Err(e) = app::run().await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
