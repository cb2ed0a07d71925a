use std::env;
use std::sync::Arc;

use axum::{
	extract::DefaultBodyLimit,
	routing::{delete, get, post},
	Router
};
use http::Method;
use log::info;
use tower_http::cors::{Any, CorsLayer};

mod api;
mod config;
mod constants;
mod errors;
mod id_factory;
mod manager;
mod models;
mod registry;
mod state_store;
mod storage;

use config::Config;
use manager::UploadManager;
use registry::UploadRegistry;
use state_store::StateStore;
use storage::chunk_store::ChunkStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	// Get config
	let config = Config::initialise()?;

	// Initialise logger (configured with the RUST_LOG environment variable)
	env_logger::init();

	// Print working directory
	let working_dir = env::current_dir()?;
	info!("Working directory: {}", working_dir.into_os_string().into_string().unwrap());

	// Initialise missing directories defined in the config
	config.initialise_directories()?;

	// Open the state store (empty if no state document exists yet)
	let state_store = StateStore::load(config.state_file_path.clone()).await?;
	let registry = UploadRegistry::new();
	let chunk_store = ChunkStore::new(config.scratch_dir.clone(), config.output_dir.clone());

	let manager = Arc::new(UploadManager::new(state_store, registry, chunk_store));

	// Re-drive assembly for any upload whose crash window left it fully-marked but
	// not yet finalized, before accepting any client request.
	manager.recover_on_startup().await?;

	// Create the CORS layer
	let cors = CorsLayer::new()
		.allow_methods([Method::GET, Method::POST, Method::DELETE])
		.allow_origin(Any);

	let router = Router::new()
		.route("/api/users/identify", post(api::uploads::identify_user_api))
		.route("/api/uploads", get(api::uploads::get_snapshot_api).post(api::uploads::create_upload_api))
		.route("/api/uploads/history", delete(api::uploads::clear_history_api))
		.route("/api/uploads/:id", get(api::uploads::get_upload_api))
		.route("/api/uploads/:id/chunk", post(api::uploads::upload_chunk_api)
			.layer(DefaultBodyLimit::max(constants::MAX_CHUNK_BODY_SIZE)))
		.route("/api/uploads/:id/state", post(api::uploads::update_upload_state_api))
		.route("/api/network/probe", post(api::network::probe_api)
			.layer(DefaultBodyLimit::max(constants::MAX_PROBE_BODY_SIZE)))
		.with_state(manager)
		.layer(cors);

	// Create listener
	let listener = tokio::net::TcpListener::bind(format!("{}:{}", config.ip_address, config.port)).await?;

	// Start server
	info!("Server listening on {}:{}", config.ip_address, config.port);

	axum::serve(listener, router)
		.with_graceful_shutdown(async {
			let _ = tokio::signal::ctrl_c().await;
		})
		.await?;

	Ok(())
}
