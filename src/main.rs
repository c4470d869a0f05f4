#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use socialbridge::{
    configure_services, BridgeServiceFactory, BridgeSettings, TokenExchangeService,
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load configuration from Settings.toml and environment variables
    // This also loads .env file and initializes the logger
    let settings = BridgeSettings::load()
        .map_err(|e| std::io::Error::other(format!("Failed to load settings: {e}")))?;

    let service = BridgeServiceFactory::create_exchange_service(&settings)
        .map_err(|e| std::io::Error::other(format!("Failed to initialize token bridge: {e:#}")))?;

    start_server(service, &settings).await
}

/// Start the HTTP server
///
/// # Errors
///
/// Returns an error if:
/// - Server binding fails
/// - Server fails to start
async fn start_server(
    service: TokenExchangeService,
    settings: &BridgeSettings,
) -> std::io::Result<()> {
    let bind_address = settings.get_bind_address();
    print_startup_info(&bind_address, settings);

    let service = web::Data::new(service);
    let cors_origins = settings.get_cors_origins();

    HttpServer::new(move || {
        let cors_origins = cors_origins.clone();
        let cors = Cors::default()
            .allowed_origin_fn(move |origin, _| {
                cors_origins
                    .iter()
                    .any(|allowed| allowed == "*" || allowed == origin.to_str().unwrap_or(""))
            })
            .allowed_methods(vec!["GET", "POST", "OPTIONS"])
            .allowed_headers(vec!["Content-Type", "Accept"])
            .max_age(3600);

        App::new()
            .app_data(service.clone())
            .wrap(cors)
            .wrap(Logger::default())
            .configure(configure_services)
    })
    .bind(&bind_address)?
    .run()
    .await
}

fn print_startup_info(bind_address: &str, settings: &BridgeSettings) {
    println!(
        "Starting {} token bridge on http://{bind_address}",
        settings.provider.kind
    );
    println!("Identity backend: {:?}", settings.identity.backend);
    println!("Key scheme: {:?}", settings.provider.effective_key_scheme());
    println!();
    println!("Endpoints:");
    println!("  GET  /             - Liveness message");
    println!("  POST /verifyToken  - Exchange a provider token for a Firebase custom token");
}
