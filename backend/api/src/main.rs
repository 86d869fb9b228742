mod config;
mod handlers;
mod server;

#[tokio::main]
async fn main() {
    if let Err(e) = server::start_server().await {
        eprintln!("semchunk-server failed: {e:#}");
        std::process::exit(1);
    }
}
