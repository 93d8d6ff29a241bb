use facility_reservation::{app, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    app::init_tracing();

    let app_state = AppState::init().await?;
    tracing::info!("database connection established");

    let addr = app_state.config.listen_addr();
    let app = app::build_app(app_state);
    app::serve(app, &addr).await
}
