use std::sync::Arc;

use crate::{
    db::{PlacesRepository, UnitOfWork},
    entities::{CountryCityDto, Place, PlaceChanges, PlaceUpdate},
    error::Error,
    external::{events::EventPublisher, geocoder::LocationLookup},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The change set was written; carries the matched row count.
    Updated(u64),
    NotFound,
    LocationUnresolved,
}

/// Favorite places use cases over a single request-scoped session.
///
/// Every write is committed before the countries informer is notified, and
/// a notification that cannot be built never fails the write.
pub struct PlacesService<S> {
    session: S,
    locator: Arc<dyn LocationLookup>,
    publisher: Arc<dyn EventPublisher>,
    queue_name: String,
}

impl<S: PlacesRepository + UnitOfWork> PlacesService<S> {
    pub fn new(
        session: S,
        locator: Arc<dyn LocationLookup>,
        publisher: Arc<dyn EventPublisher>,
        queue_name: impl Into<String>,
    ) -> Self {
        Self {
            session,
            locator,
            publisher,
            queue_name: queue_name.into(),
        }
    }

    #[tracing::instrument(skip(self))]
    pub async fn list_places(&mut self) -> Result<Vec<Place>, Error> {
        self.session.find_all().await
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_place(&mut self, id: i32) -> Result<Option<Place>, Error> {
        self.session.find(id).await
    }

    /// Resolves the coordinates of `data` into an unsaved place. Both
    /// coordinates are required.
    #[tracing::instrument(skip(locator))]
    pub async fn build_place_from_update(
        locator: &dyn LocationLookup,
        data: &PlaceUpdate,
    ) -> Result<Option<Place>, Error> {
        let (latitude, longitude) = match data.coordinates() {
            Some(coordinates) => coordinates,
            None => {
                tracing::info!("both coordinates are needed to resolve a location");
                return Ok(None);
            }
        };

        let place = locator
            .resolve(latitude, longitude)
            .await?
            .map(|location| Place::new(location, data.description.clone()));

        Ok(place)
    }

    #[tracing::instrument(skip(self))]
    pub async fn create_place(&mut self, data: PlaceUpdate) -> Result<Option<i32>, Error> {
        let locator = self.locator.as_ref();

        let mut place = match Self::build_place_from_update(locator, &data).await? {
            Some(place) => place,
            None => return Ok(None),
        };

        let id = self.session.create(&place).await?;
        self.session.commit().await?;

        place.id = Some(id);
        Self::publish_event(self.publisher.as_ref(), &self.queue_name, &place).await;

        Ok(Some(id))
    }

    #[tracing::instrument(skip(self))]
    pub async fn update_place(
        &mut self,
        id: i32,
        data: PlaceUpdate,
    ) -> Result<UpdateOutcome, Error> {
        let locator = self.locator.as_ref();

        let (place, changes) = if data.changes_location() {
            match Self::build_place_from_update(locator, &data).await? {
                Some(place) => {
                    let changes = place.to_changes();
                    (place, changes)
                }
                None => return Ok(UpdateOutcome::LocationUnresolved),
            }
        } else {
            match self.session.find(id).await? {
                Some(mut place) => {
                    place.description = data.description.clone();
                    (place, PlaceChanges::description(data.description))
                }
                None => return Ok(UpdateOutcome::NotFound),
            }
        };

        let matched_rows = self.session.update(id, &changes).await?;
        self.session.commit().await?;

        if matched_rows > 0 {
            Self::publish_event(self.publisher.as_ref(), &self.queue_name, &place).await;
        }

        Ok(UpdateOutcome::Updated(matched_rows))
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete_place(&mut self, id: i32) -> Result<u64, Error> {
        let matched_rows = self.session.delete(id).await?;
        self.session.commit().await?;

        Ok(matched_rows)
    }

    async fn publish_event(publisher: &dyn EventPublisher, queue_name: &str, place: &Place) {
        let body = CountryCityDto::from_place(place)
            .map_err(|errors| errors.to_string())
            .and_then(|dto| serde_json::to_string(&dto).map_err(|err| err.to_string()));

        match body {
            Ok(body) => publisher.publish(queue_name, body).await,
            Err(reason) => tracing::warn!(
                place_id = ?place.id,
                country = ?place.country,
                city = ?place.city,
                %reason,
                "The message was not well-formed during publishing event."
            ),
        }
    }

    #[cfg(test)]
    fn session(&self) -> &S {
        &self.session
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::MemorySession;
    use crate::entities::ResolvedLocation;
    use crate::external::events::ChannelPublisher;
    use crate::external::geocoder::MockLocationLookup;
    use async_channel::Receiver;
    use mockall::predicate::*;

    const QUEUE: &str = "places_import";

    fn springfield() -> ResolvedLocation {
        ResolvedLocation {
            latitude: 39.78,
            longitude: -89.65,
            alpha2code: "US".into(),
            city: Some("Springfield".into()),
            locality: Some("Downtown".into()),
        }
    }

    fn stored_place(id: i32) -> Place {
        let mut place = Place::new(springfield(), Some("capitol".into()));
        place.id = Some(id);
        place
    }

    fn request(latitude: Option<f64>, longitude: Option<f64>, description: &str) -> PlaceUpdate {
        PlaceUpdate {
            latitude,
            longitude,
            description: Some(description.into()),
        }
    }

    fn service(
        session: MemorySession,
        lookup: MockLocationLookup,
    ) -> (PlacesService<MemorySession>, Receiver<String>) {
        let mut publisher = ChannelPublisher::new();
        let events = publisher.declare(QUEUE);

        let service = PlacesService::new(session, Arc::new(lookup), Arc::new(publisher), QUEUE);

        (service, events)
    }

    fn received(events: &Receiver<String>) -> Vec<serde_json::Value> {
        let mut messages = Vec::new();
        while let Ok(body) = events.try_recv() {
            messages.push(serde_json::from_str(&body).unwrap());
        }
        messages
    }

    #[tokio::test]
    async fn create_persists_resolved_location() {
        let mut lookup = MockLocationLookup::new();
        lookup
            .expect_resolve()
            .with(eq(39.78), eq(-89.65))
            .times(1)
            .returning(|_, _| Ok(Some(springfield())));

        let (mut service, events) = service(MemorySession::default(), lookup);

        let id = service
            .create_place(request(Some(39.78), Some(-89.65), "capitol"))
            .await
            .unwrap()
            .unwrap();

        let place = service.get_place(id).await.unwrap().unwrap();
        assert_eq!(place.country.as_deref(), Some("US"));
        assert_eq!(place.city.as_deref(), Some("Springfield"));
        assert_eq!(place.locality.as_deref(), Some("Downtown"));
        assert_eq!(place.description.as_deref(), Some("capitol"));
        assert_eq!(service.session().commits, 1);

        assert_eq!(
            received(&events),
            vec![serde_json::json!({"city": "Springfield", "alpha2code": "US"})]
        );
    }

    #[tokio::test]
    async fn create_with_unresolved_location_writes_nothing() {
        let mut lookup = MockLocationLookup::new();
        lookup.expect_resolve().times(1).returning(|_, _| Ok(None));

        let (mut service, events) = service(MemorySession::default(), lookup);

        let id = service
            .create_place(request(Some(0.0), Some(-160.0), "ocean"))
            .await
            .unwrap();

        assert_eq!(id, None);
        assert_eq!(service.session().writes, 0);
        assert_eq!(service.session().commits, 0);
        assert!(received(&events).is_empty());
    }

    #[tokio::test]
    async fn create_without_coordinates_skips_lookup() {
        let mut lookup = MockLocationLookup::new();
        lookup.expect_resolve().never();

        let (mut service, events) = service(MemorySession::default(), lookup);

        let id = service
            .create_place(request(Some(39.78), None, "capitol"))
            .await
            .unwrap();

        assert_eq!(id, None);
        assert_eq!(service.session().writes, 0);
        assert!(received(&events).is_empty());
    }

    #[tokio::test]
    async fn create_propagates_lookup_errors() {
        let mut lookup = MockLocationLookup::new();
        lookup
            .expect_resolve()
            .returning(|_, _| {
                Err(Error {
                    code: 3,
                    message: "reqwest error".into(),
                })
            });

        let (mut service, events) = service(MemorySession::default(), lookup);

        let result = service
            .create_place(request(Some(39.78), Some(-89.65), "capitol"))
            .await;

        assert!(result.is_err());
        assert_eq!(service.session().writes, 0);
        assert!(received(&events).is_empty());
    }

    #[tokio::test]
    async fn malformed_event_does_not_fail_create() {
        let mut lookup = MockLocationLookup::new();
        lookup.expect_resolve().returning(|_, _| {
            Ok(Some(ResolvedLocation {
                alpha2code: "USA".into(),
                ..springfield()
            }))
        });

        let (mut service, events) = service(MemorySession::default(), lookup);

        let id = service
            .create_place(request(Some(39.78), Some(-89.65), "capitol"))
            .await
            .unwrap();

        assert!(id.is_some());
        assert_eq!(service.session().commits, 1);
        assert!(received(&events).is_empty());
    }

    #[tokio::test]
    async fn update_without_coordinates_changes_description_only() {
        let mut lookup = MockLocationLookup::new();
        lookup.expect_resolve().never();

        let session = MemorySession::with_places(vec![stored_place(7)]);
        let (mut service, events) = service(session, lookup);

        let outcome = service
            .update_place(7, request(None, None, "favorite bench"))
            .await
            .unwrap();

        assert_eq!(outcome, UpdateOutcome::Updated(1));

        let place = service.get_place(7).await.unwrap().unwrap();
        assert_eq!(
            place,
            Place {
                description: Some("favorite bench".into()),
                ..stored_place(7)
            }
        );
        assert_eq!(received(&events).len(), 1);
    }

    #[tokio::test]
    async fn update_of_missing_place_is_not_found() {
        let lookup = MockLocationLookup::new();
        let (mut service, events) = service(MemorySession::default(), lookup);

        let outcome = service
            .update_place(42, request(None, None, "nowhere"))
            .await
            .unwrap();

        assert_eq!(outcome, UpdateOutcome::NotFound);
        assert_eq!(service.session().writes, 0);
        assert!(received(&events).is_empty());
    }

    #[tokio::test]
    async fn update_with_coordinates_applies_resolved_location() {
        let mut lookup = MockLocationLookup::new();
        lookup
            .expect_resolve()
            .with(eq(48.85), eq(2.35))
            .times(1)
            .returning(|_, _| {
                Ok(Some(ResolvedLocation {
                    latitude: 48.85,
                    longitude: 2.35,
                    alpha2code: "FR".into(),
                    city: Some("Paris".into()),
                    locality: None,
                }))
            });

        let session = MemorySession::with_places(vec![stored_place(3)]);
        let (mut service, events) = service(session, lookup);

        let outcome = service
            .update_place(3, request(Some(48.85), Some(2.35), "cafe"))
            .await
            .unwrap();

        assert_eq!(outcome, UpdateOutcome::Updated(1));

        let place = service.get_place(3).await.unwrap().unwrap();
        assert_eq!(place.id, Some(3));
        assert_eq!(place.latitude, 48.85);
        assert_eq!(place.country.as_deref(), Some("FR"));
        assert_eq!(place.city.as_deref(), Some("Paris"));
        assert_eq!(place.locality, None);
        assert_eq!(place.description.as_deref(), Some("cafe"));

        assert_eq!(
            received(&events),
            vec![serde_json::json!({"city": "Paris", "alpha2code": "FR"})]
        );
    }

    #[tokio::test]
    async fn update_with_zero_coordinates_resolves_location() {
        let mut lookup = MockLocationLookup::new();
        lookup
            .expect_resolve()
            .with(eq(0.0), eq(0.0))
            .times(1)
            .returning(|_, _| Ok(None));

        let session = MemorySession::with_places(vec![stored_place(1)]);
        let (mut service, events) = service(session, lookup);

        let outcome = service
            .update_place(1, request(Some(0.0), Some(0.0), "null island"))
            .await
            .unwrap();

        assert_eq!(outcome, UpdateOutcome::LocationUnresolved);
        assert_eq!(service.session().writes, 0);
        assert_eq!(service.get_place(1).await.unwrap(), Some(stored_place(1)));
        assert!(received(&events).is_empty());
    }

    #[tokio::test]
    async fn update_with_coordinates_of_missing_place_matches_nothing() {
        let mut lookup = MockLocationLookup::new();
        lookup
            .expect_resolve()
            .returning(|_, _| Ok(Some(springfield())));

        let (mut service, events) = service(MemorySession::default(), lookup);

        let outcome = service
            .update_place(9, request(Some(39.78), Some(-89.65), "capitol"))
            .await
            .unwrap();

        assert_eq!(outcome, UpdateOutcome::Updated(0));
        assert!(received(&events).is_empty());
    }

    #[tokio::test]
    async fn delete_reports_matched_rows_and_never_publishes() {
        let lookup = MockLocationLookup::new();
        let session = MemorySession::with_places(vec![stored_place(5)]);
        let (mut service, events) = service(session, lookup);

        assert_eq!(service.delete_place(5).await.unwrap(), 1);
        assert_eq!(service.get_place(5).await.unwrap(), None);
        assert_eq!(service.delete_place(5).await.unwrap(), 0);
        assert_eq!(service.session().commits, 2);
        assert!(received(&events).is_empty());
    }

    #[tokio::test]
    async fn list_returns_every_place() {
        let lookup = MockLocationLookup::new();
        let session = MemorySession::with_places(vec![stored_place(1), stored_place(2)]);
        let (mut service, _events) = service(session, lookup);

        let ids: Vec<_> = service
            .list_places()
            .await
            .unwrap()
            .into_iter()
            .map(|place| place.id)
            .collect();

        assert_eq!(ids, vec![Some(1), Some(2)]);
    }
}
