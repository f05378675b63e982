mod event;
mod location;
mod place;

pub use event::CountryCityDto;
pub use location::ResolvedLocation;
pub use place::{Place, PlaceChanges, PlaceUpdate};
