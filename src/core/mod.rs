//! Core trip logic and the abstractions the providers implement

pub mod cache;
pub mod clock;
pub mod config;
pub mod currency;
pub mod itinerary;
pub mod log;
pub mod places;
pub mod schedule;
pub mod weather;

// Re-export main types for cleaner imports
pub use clock::Clock;
pub use currency::{CurrencyQuote, ExchangeRateProvider};
pub use itinerary::ItineraryStore;
pub use places::PlacesProvider;
pub use weather::WeatherProvider;
