use axum::extract::{Extension, Json, Path};
use axum::http::StatusCode;

use crate::entities::{Place, PlaceUpdate};
use crate::error::{not_found_error, unresolved_location_error, Error};
use crate::server::Context;
use crate::service::UpdateOutcome;

#[axum_macros::debug_handler]
pub async fn list(Extension(ctx): Extension<Context>) -> Result<Json<Vec<Place>>, Error> {
    let places = ctx.places().list_places().await?;

    Ok(places.into())
}

#[axum_macros::debug_handler]
pub async fn find(
    Extension(ctx): Extension<Context>,
    Path(id): Path<i32>,
) -> Result<Json<Place>, Error> {
    let place = ctx
        .places()
        .get_place(id)
        .await?
        .ok_or_else(not_found_error)?;

    Ok(place.into())
}

#[axum_macros::debug_handler]
pub async fn create(
    Extension(ctx): Extension<Context>,
    Json(params): Json<PlaceUpdate>,
) -> Result<(StatusCode, Json<Place>), Error> {
    let mut places = ctx.places();

    let id = places
        .create_place(params)
        .await?
        .ok_or_else(unresolved_location_error)?;

    let place = places.get_place(id).await?.ok_or_else(not_found_error)?;

    Ok((StatusCode::CREATED, place.into()))
}

#[axum_macros::debug_handler]
pub async fn update(
    Extension(ctx): Extension<Context>,
    Path(id): Path<i32>,
    Json(params): Json<PlaceUpdate>,
) -> Result<Json<Place>, Error> {
    let mut places = ctx.places();

    check_updated(places.update_place(id, params).await?)?;

    let place = places.get_place(id).await?.ok_or_else(not_found_error)?;

    Ok(place.into())
}

#[axum_macros::debug_handler]
pub async fn delete(
    Extension(ctx): Extension<Context>,
    Path(id): Path<i32>,
) -> Result<StatusCode, Error> {
    match ctx.places().delete_place(id).await? {
        0 => Err(not_found_error()),
        _ => Ok(StatusCode::NO_CONTENT),
    }
}

fn check_updated(outcome: UpdateOutcome) -> Result<(), Error> {
    match outcome {
        UpdateOutcome::Updated(0) | UpdateOutcome::NotFound => Err(not_found_error()),
        UpdateOutcome::LocationUnresolved => Err(unresolved_location_error()),
        UpdateOutcome::Updated(_) => Ok(()),
    }
}

#[test]
fn update_outcomes_map_to_errors() {
    assert_eq!(check_updated(UpdateOutcome::Updated(1)), Ok(()));
    assert_eq!(check_updated(UpdateOutcome::Updated(0)), Err(not_found_error()));
    assert_eq!(check_updated(UpdateOutcome::NotFound), Err(not_found_error()));
    assert_eq!(
        check_updated(UpdateOutcome::LocationUnresolved),
        Err(unresolved_location_error())
    );
}
