use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use log::info;

use shelfware::api;
use shelfware::config::Config;
use shelfware::db::Database;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = Config::load();

    let db = Database::new(&config.database_path)
        .map_err(|e| std::io::Error::other(format!("failed to open database: {e}")))?;
    db.create_schema()
        .await
        .map_err(|e| std::io::Error::other(format!("failed to create schema: {e}")))?;

    let addr = ("0.0.0.0", config.port);
    info!("listening on http://{}:{}", addr.0, addr.1);

    let client_url = config.client_url.clone();
    HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin(&client_url)
            .allow_any_method()
            .allow_any_header()
            .supports_credentials();

        App::new()
            .wrap(cors)
            .app_data(web::Data::new(db.clone()))
            .app_data(web::Data::new(config.clone()))
            .configure(api::configure)
    })
    .bind(addr)?
    .run()
    .await
}
