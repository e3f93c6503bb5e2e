// self
use spotify_session_broker::{config::Settings, error::Result, obs, web};

#[tokio::main]
async fn main() -> Result<()> {
	obs::init_tracing();

	let settings = Settings::load();

	if settings.client_id.is_empty() {
		tracing::warn!("No client id configured; login will be rejected until one is set.");
	}

	web::serve(settings).await
}
