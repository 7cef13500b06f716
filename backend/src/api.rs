use std::sync::Mutex;

use actix_cors::Cors;
use actix_web::{
    get,
    http::header::{self, ContentType},
    middleware::{Condition, Logger},
    post,
    web::{self, Data},
    App, HttpRequest, HttpResponse, HttpServer, Responder,
};
use common::req::NewReading;
use log::info;

use crate::config::{Backend, Config};
use crate::db::Db;
use crate::docs::Docs;
use crate::error::Result;
use crate::registry::{ReadingLog, StationRegistry, StationStore};
use crate::req::{Fields, FromFields};
use crate::shelf::Shelf;

#[get("/")]
async fn index(docs: web::Data<Docs>) -> Result<impl Responder> {
    let html = docs.render().await?;
    Ok(HttpResponse::Ok().content_type(ContentType::html()).body(html))
}

#[get("/init/")]
async fn init(db: web::Data<Mutex<Db>>) -> Result<impl Responder> {
    db.registry()?.init_schema()?;
    info!("Schema initialized");
    Ok(HttpResponse::Ok().body("OK"))
}

async fn list_devices<S: StationStore>(store: web::Data<S>) -> Result<HttpResponse> {
    let mut registry = store.registry()?;
    let stations = registry.list()?;
    S::release(registry)?;

    Ok(HttpResponse::Ok().json(stations))
}

async fn get_device<S: StationStore>(
    id: web::Path<String>,
    store: web::Data<S>,
) -> Result<HttpResponse> {
    let mut registry = store.registry()?;
    let station = registry.get(&id.into_inner())?;
    S::release(registry)?;

    Ok(HttpResponse::Ok().json(station))
}

async fn create_device<S: StationStore>(
    req: HttpRequest,
    body: web::Bytes,
    store: web::Data<S>,
) -> Result<HttpResponse> {
    let input = <S::Input as FromFields>::from_fields(&Fields::from_request(&req, &body)?)?;

    let mut registry = store.registry()?;
    let station = registry.create(&input)?;
    S::release(registry)?;

    Ok(HttpResponse::Created().json(station))
}

async fn update_device<S: StationStore>(
    req: HttpRequest,
    id: web::Path<String>,
    body: web::Bytes,
    store: web::Data<S>,
) -> Result<HttpResponse> {
    let input = <S::Input as FromFields>::from_fields(&Fields::from_request(&req, &body)?)?;

    let mut registry = store.registry()?;
    let station = registry.update(&id.into_inner(), &input)?;
    S::release(registry)?;

    Ok(HttpResponse::Ok().json(station))
}

async fn delete_device<S: StationStore>(
    id: web::Path<String>,
    store: web::Data<S>,
) -> Result<HttpResponse> {
    let mut registry = store.registry()?;
    registry.delete(&id.into_inner())?;
    S::release(registry)?;

    Ok(HttpResponse::NoContent().finish())
}

#[get("/readings")]
async fn list_readings(db: web::Data<Mutex<Db>>) -> Result<impl Responder> {
    let readings = db.registry()?.list_readings()?;
    Ok(web::Json(readings))
}

#[post("/reading")]
async fn append_reading(
    req: HttpRequest,
    body: web::Bytes,
    db: web::Data<Mutex<Db>>,
) -> Result<impl Responder> {
    let new = NewReading::from_fields(&Fields::from_request(&req, &body)?)?;
    let reading = db.registry()?.append(&new)?;
    Ok(HttpResponse::Created().json(reading))
}

#[get("/device/{id}/readings")]
async fn station_readings(
    id: web::Path<String>,
    db: web::Data<Mutex<Db>>,
) -> Result<impl Responder> {
    let readings = db.registry()?.station_readings(&id.into_inner())?;
    Ok(web::Json(readings))
}

pub fn configure_docs(cfg: &mut web::ServiceConfig) {
    cfg.service(index);
}

/// Station routes, for any store.
pub fn configure_stations<S: StationStore>(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/devices")
            .route(web::get().to(list_devices::<S>))
            .route(web::post().to(create_device::<S>)),
    )
    .service(web::resource("/device").route(web::post().to(create_device::<S>)))
    .service(
        web::resource("/device/{id}")
            .route(web::get().to(get_device::<S>))
            .route(web::put().to(update_device::<S>))
            .route(web::delete().to(delete_device::<S>)),
    );
}

/// Reading and schema routes, only backed by the database.
pub fn configure_readings(cfg: &mut web::ServiceConfig) {
    cfg.service(init)
        .service(list_readings)
        .service(append_reading)
        .service(station_readings);
}

fn cors(origin: Option<&str>) -> Cors {
    let cors = Cors::default()
        .allowed_methods(vec!["GET", "POST", "PUT", "DELETE"])
        .allowed_headers(vec![header::AUTHORIZATION, header::ACCEPT])
        .allowed_header(header::CONTENT_TYPE)
        .max_age(3600);

    match origin {
        Some(origin) => cors.allowed_origin(origin),
        None => cors,
    }
}

pub async fn new_http_server(config: &Config) -> anyhow::Result<()> {
    match config.backend {
        Backend::Sqlite => {
            let mut db = Db::connect(&config.database_url)?;
            if config.init_schema {
                db.init_schema()?;
                info!("Schema initialized");
            }
            run(config, Data::new(Mutex::new(db)), configure_readings).await
        }
        Backend::Shelf => {
            let shelf = Shelf::new(&config.shelf_path);
            info!("Keeping stations in {}", shelf.path().display());
            run(config, Data::new(shelf), |_| {}).await
        }
    }
}

async fn run<S: StationStore + Send + Sync>(
    config: &Config,
    store: Data<S>,
    extra_routes: fn(&mut web::ServiceConfig),
) -> anyhow::Result<()> {
    let docs = Data::new(Docs::new(&config.readme_path));
    let cors_origin = config.cors_origin.clone();

    info!(
        "Listening on {}:{} with {:?} store",
        config.bind_addr, config.port, config.backend
    );

    HttpServer::new(move || {
        App::new()
            .app_data(store.clone())
            .app_data(docs.clone())
            .configure(configure_docs)
            .configure(configure_stations::<S>)
            .configure(extra_routes)
            .wrap(Condition::new(
                cors_origin.is_some(),
                cors(cors_origin.as_deref()),
            ))
            .wrap(Logger::default())
    })
    .bind((config.bind_addr.as_str(), config.port))?
    .run()
    .await?;

    Ok(())
}
