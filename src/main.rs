#[macro_use]
extern crate rocket;

use rocket::data::{Limits, ToByteUnit};
use rocket::fs::{FileServer, Options};
use rocket::http::Status;
use rocket::{Build, Request, Rocket};
use serde_json::Value;
use std::sync::Arc;

mod boot;
mod codes;
mod config;
mod db;
mod export;
mod models;
mod poster;
mod response;
mod routes;
mod store;
mod tasks;
mod validation;


use codes::Code;
use config::AppConfig;
use response::ApiResponse;
use store::sqlite::SqliteStore;
use store::Store;

#[catch(404)]
fn not_found() -> ApiResponse {
    ApiResponse::new(Status::NotFound, Code::NotFound, Value::Null)
}

#[catch(400)]
fn bad_request() -> ApiResponse {
    ApiResponse::invalid_params()
}

#[catch(422)]
fn unprocessable() -> ApiResponse {
    ApiResponse::invalid_params()
}

#[catch(500)]
fn server_error() -> ApiResponse {
    ApiResponse::server_error(Code::Error)
}

/// Any other status still answers with the JSON envelope.
#[catch(default)]
fn fallback(status: Status, _req: &Request<'_>) -> ApiResponse {
    let code = if status.class().is_client_error() {
        Code::InvalidParams
    } else {
        Code::Error
    };
    ApiResponse::new(status, code, Value::Null)
}

/// Assemble the application around an already-migrated store.
pub fn build(config: AppConfig, store: Arc<dyn Store>) -> Rocket<Build> {
    let upload = config.max_upload_mb.mebibytes();
    // urlencoded article content may reach 65535 chars, percent-encoded
    let limits = Limits::default()
        .limit("form", 1.mebibytes())
        .limit("string", 256.kibibytes())
        .limit("file", upload)
        .limit("data-form", upload);
    let figment = rocket::Config::figment().merge(("limits", limits));

    let export_dir = config.export_dir();
    let qrcode_dir = config.qrcode_dir();

    rocket::custom(figment)
        .manage(store)
        .manage(config)
        .attach(tasks::BackgroundTasks)
        .mount("/export", FileServer::new(export_dir, Options::Missing))
        .mount("/qrcode", FileServer::new(qrcode_dir, Options::Missing))
        .mount("/api/v1", routes::routes())
        .register(
            "/",
            catchers![not_found, bad_request, unprocessable, server_error, fallback],
        )
}

#[launch]
fn rocket() -> _ {
    env_logger::init();

    let config = AppConfig::load().expect("Failed to load configuration");

    // Boot check: create runtime directories, warn about a missing poster background
    boot::run(&config);

    let store = SqliteStore::new_at(&config.database_path).expect("Failed to initialize database pool");
    store.run_migrations().expect("Failed to run database migrations");

    build(config, Arc::new(store))
}
