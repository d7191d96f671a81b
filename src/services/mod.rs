//! Side effects that run alongside store writes: slugs, geocoding, mail,
//! cascade deletes and derived averages.

pub mod aggregates;
pub mod bootcamps;
pub mod geocoder;
pub mod mailer;
pub mod slug;

pub use geocoder::{GeoLocation, GeocodeError, Geocoder, MapQuestGeocoder, StaticGeocoder};
pub use mailer::{Email, LogMailer, MailError, Mailer, OutboxMailer, RelayMailer};
