#[cfg(test)]
pub mod memory;

use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, Executor, Pool, Postgres, QueryBuilder, Transaction};

use crate::entities::{Place, PlaceChanges};
use crate::error::Error;

const SELECT_PLACES: &str = "SELECT id, latitude, longitude, description, country, city, locality, created_at, updated_at FROM places";

/// Storage operations on places. Every call joins the transaction of the
/// session it is made on; nothing is durable until
/// [`UnitOfWork::commit`].
#[async_trait]
pub trait PlacesRepository: Send {
    async fn find_all(&mut self) -> Result<Vec<Place>, Error>;
    async fn find(&mut self, id: i32) -> Result<Option<Place>, Error>;
    async fn create(&mut self, place: &Place) -> Result<i32, Error>;
    /// Writes only the columns set in `changes`, returns the matched row count.
    async fn update(&mut self, id: i32, changes: &PlaceChanges) -> Result<u64, Error>;
    async fn delete(&mut self, id: i32) -> Result<u64, Error>;
}

#[async_trait]
pub trait UnitOfWork: Send {
    async fn commit(&mut self) -> Result<(), Error>;
}

#[derive(Clone)]
pub struct PgStore {
    pool: Pool<Postgres>,
}

impl PgStore {
    pub async fn new(db_uri: &str, max_connections: u32) -> Result<Self, Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(db_uri)
            .await?;

        // TODO: move this to migrations
        pool.execute(
            "CREATE TABLE IF NOT EXISTS places (
                id SERIAL PRIMARY KEY,
                latitude DOUBLE PRECISION NOT NULL,
                longitude DOUBLE PRECISION NOT NULL,
                description TEXT,
                country VARCHAR(2),
                city VARCHAR(255),
                locality VARCHAR(255),
                created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )",
        )
        .await?;

        Ok(Self { pool })
    }

    pub fn session(&self) -> PgSession {
        PgSession {
            pool: self.pool.clone(),
            tx: None,
        }
    }
}

/// Request-scoped unit of work. A transaction is opened on first use and
/// rolled back if the session is dropped without committing.
pub struct PgSession {
    pool: Pool<Postgres>,
    tx: Option<Transaction<'static, Postgres>>,
}

impl PgSession {
    async fn tx(&mut self) -> Result<&mut Transaction<'static, Postgres>, Error> {
        let tx = match self.tx.take() {
            Some(tx) => tx,
            None => self.pool.begin().await?,
        };

        Ok(self.tx.insert(tx))
    }
}

#[async_trait]
impl PlacesRepository for PgSession {
    #[tracing::instrument(skip(self))]
    async fn find_all(&mut self) -> Result<Vec<Place>, Error> {
        let tx = self.tx().await?;

        let places = sqlx::query_as::<_, Place>(&format!("{} ORDER BY id", SELECT_PLACES))
            .fetch_all(&mut *tx)
            .await?;

        Ok(places)
    }

    #[tracing::instrument(skip(self))]
    async fn find(&mut self, id: i32) -> Result<Option<Place>, Error> {
        let tx = self.tx().await?;

        let place = sqlx::query_as::<_, Place>(&format!("{} WHERE id = $1", SELECT_PLACES))
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;

        Ok(place)
    }

    #[tracing::instrument(skip(self))]
    async fn create(&mut self, place: &Place) -> Result<i32, Error> {
        let tx = self.tx().await?;

        let (id,): (i32,) = sqlx::query_as(
            "INSERT INTO places (latitude, longitude, description, country, city, locality) VALUES ($1, $2, $3, $4, $5, $6) RETURNING id",
        )
        .bind(place.latitude)
        .bind(place.longitude)
        .bind(&place.description)
        .bind(&place.country)
        .bind(&place.city)
        .bind(&place.locality)
        .fetch_one(&mut *tx)
        .await?;

        Ok(id)
    }

    #[tracing::instrument(skip(self))]
    async fn update(&mut self, id: i32, changes: &PlaceChanges) -> Result<u64, Error> {
        let tx = self.tx().await?;

        let mut query = QueryBuilder::<Postgres>::new("UPDATE places SET updated_at = now()");

        if let Some(latitude) = changes.latitude {
            query.push(", latitude = ").push_bind(latitude);
        }
        if let Some(longitude) = changes.longitude {
            query.push(", longitude = ").push_bind(longitude);
        }
        if let Some(description) = &changes.description {
            query.push(", description = ").push_bind(description.clone());
        }
        if let Some(country) = &changes.country {
            query.push(", country = ").push_bind(country.clone());
        }
        if let Some(city) = &changes.city {
            query.push(", city = ").push_bind(city.clone());
        }
        if let Some(locality) = &changes.locality {
            query.push(", locality = ").push_bind(locality.clone());
        }

        query.push(" WHERE id = ").push_bind(id);

        let result = query.build().execute(&mut *tx).await?;

        Ok(result.rows_affected())
    }

    #[tracing::instrument(skip(self))]
    async fn delete(&mut self, id: i32) -> Result<u64, Error> {
        let tx = self.tx().await?;

        let result = sqlx::query("DELETE FROM places WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        Ok(result.rows_affected())
    }
}

#[async_trait]
impl UnitOfWork for PgSession {
    #[tracing::instrument(skip(self))]
    async fn commit(&mut self) -> Result<(), Error> {
        if let Some(tx) = self.tx.take() {
            tx.commit().await?;
        }

        Ok(())
    }
}

#[test]
#[ignore = "requires a running PostgreSQL, see DATABASE_URL"]
fn session_round_trip() {
    use crate::entities::ResolvedLocation;
    use tokio_test::block_on;

    let db_uri = std::env::var("DATABASE_URL").unwrap();
    let store = block_on(PgStore::new(&db_uri, 1)).unwrap();
    let mut session = store.session();

    let place = Place::new(
        ResolvedLocation {
            latitude: 39.78,
            longitude: -89.65,
            alpha2code: "US".into(),
            city: Some("Springfield".into()),
            locality: None,
        },
        Some("state capitol".into()),
    );

    let id = block_on(session.create(&place)).unwrap();
    block_on(session.commit()).unwrap();

    let matched = block_on(session.update(id, &PlaceChanges::description(None))).unwrap();
    assert_eq!(matched, 1);
    block_on(session.commit()).unwrap();

    let stored = block_on(session.find(id)).unwrap().unwrap();
    assert_eq!(stored.description, None);
    assert_eq!(stored.city.as_deref(), Some("Springfield"));

    assert_eq!(block_on(session.delete(id)).unwrap(), 1);
    assert_eq!(block_on(session.delete(id)).unwrap(), 0);
    block_on(session.commit()).unwrap();
}
