mod api;
mod server;
mod state;

use state::AppState;

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let port = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(5000u16);

    let state = AppState::new();
    if let Err(e) = server::serve(state, port).await {
        log::error!("Server exited with error: {}", e);
        std::process::exit(1);
    }
}
