use std::collections::BTreeMap;

use async_trait::async_trait;

use super::{PlacesRepository, UnitOfWork};
use crate::entities::{Place, PlaceChanges};
use crate::error::Error;

/// In-memory session used in tests. Writes are applied immediately and
/// counted so tests can tell whether anything touched the store.
#[derive(Default)]
pub struct MemorySession {
    pub places: BTreeMap<i32, Place>,
    pub writes: usize,
    pub commits: usize,
    next_id: i32,
}

impl MemorySession {
    pub fn with_places(places: Vec<Place>) -> Self {
        let mut session = Self::default();

        for mut place in places {
            let id = place.id.unwrap_or(session.next_id + 1);
            session.next_id = session.next_id.max(id);
            place.id = Some(id);
            session.places.insert(id, place);
        }

        session
    }
}

#[async_trait]
impl PlacesRepository for MemorySession {
    async fn find_all(&mut self) -> Result<Vec<Place>, Error> {
        Ok(self.places.values().cloned().collect())
    }

    async fn find(&mut self, id: i32) -> Result<Option<Place>, Error> {
        Ok(self.places.get(&id).cloned())
    }

    async fn create(&mut self, place: &Place) -> Result<i32, Error> {
        self.writes += 1;
        self.next_id += 1;

        let mut place = place.clone();
        place.id = Some(self.next_id);
        self.places.insert(self.next_id, place);

        Ok(self.next_id)
    }

    async fn update(&mut self, id: i32, changes: &PlaceChanges) -> Result<u64, Error> {
        self.writes += 1;

        match self.places.get_mut(&id) {
            Some(place) => {
                place.apply(changes);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn delete(&mut self, id: i32) -> Result<u64, Error> {
        self.writes += 1;

        Ok(self.places.remove(&id).map_or(0, |_| 1))
    }
}

#[async_trait]
impl UnitOfWork for MemorySession {
    async fn commit(&mut self) -> Result<(), Error> {
        self.commits += 1;
        Ok(())
    }
}
