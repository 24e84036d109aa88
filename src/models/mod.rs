mod event;

pub use event::{AccessEvent, GeoInfo, LogStats, TrackingLink};
