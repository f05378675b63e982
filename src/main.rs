use std::sync::Arc;

use futures::StreamExt;

use favorite_places::config::Settings;
use favorite_places::db::PgStore;
use favorite_places::error::Error;
use favorite_places::external::events::{ChannelPublisher, EventPublisher, RabbitPublisher};
use favorite_places::external::geocoder::GeocoderClient;
use favorite_places::server::{serve, Context};
use favorite_places::telemetry;

#[tokio::main]
async fn main() -> Result<(), Error> {
    let settings = Settings::from_env()?;

    telemetry::init(settings.log_level);

    let store = PgStore::new(&settings.database_url, settings.database_max_connections).await?;
    let queue_name = settings.rabbitmq.queue.places_import.clone();

    let publisher: Arc<dyn EventPublisher> = match &settings.rabbitmq.api_url {
        Some(api_url) => Arc::new(RabbitPublisher::new(
            api_url.as_str(),
            settings.rabbitmq.vhost.as_str(),
            settings.rabbitmq.user.as_str(),
            settings.rabbitmq.password.as_str(),
        )),
        None => {
            tracing::warn!("RABBITMQ_API_URL is not set, events are only logged");

            let mut publisher = ChannelPublisher::new();
            let events = publisher.declare(&queue_name);

            tokio::spawn(events.for_each(|body| async move {
                tracing::info!(%body, "places import event");
            }));

            Arc::new(publisher)
        }
    };

    let ctx = Context {
        store,
        locator: Arc::new(GeocoderClient::new(
            settings.geocoder.base_url.as_str(),
            settings.geocoder.language.as_str(),
        )),
        publisher,
        queue_name,
    };

    serve(ctx, settings.server_addr).await
}
