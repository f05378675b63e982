mod handlers;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{extract::Extension, routing::get, Router};

use crate::db::{PgSession, PgStore};
use crate::error::{server_error, Error};
use crate::external::{events::EventPublisher, geocoder::LocationLookup};
use crate::server::handlers::places;
use crate::service::PlacesService;

/// Collaborators shared by every request.
#[derive(Clone)]
pub struct Context {
    pub store: PgStore,
    pub locator: Arc<dyn LocationLookup>,
    pub publisher: Arc<dyn EventPublisher>,
    pub queue_name: String,
}

impl Context {
    /// Service bound to a fresh session for the current request.
    pub fn places(&self) -> PlacesService<PgSession> {
        PlacesService::new(
            self.store.session(),
            self.locator.clone(),
            self.publisher.clone(),
            self.queue_name.clone(),
        )
    }
}

pub async fn serve(ctx: Context, addr: SocketAddr) -> Result<(), Error> {
    let app = Router::new()
        .route("/api/v1/places", get(places::list).post(places::create))
        .route(
            "/api/v1/places/:id",
            get(places::find).patch(places::update).delete(places::delete),
        )
        .layer(Extension(ctx));

    tracing::info!("listening on {}", addr);

    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await
        .map_err(server_error)
}
