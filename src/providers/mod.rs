pub mod amap;
pub mod bank_of_taiwan;
pub mod notion;
pub mod qweather;
pub mod util;

pub use amap::AmapProvider;
pub use bank_of_taiwan::BankOfTaiwanProvider;
pub use notion::NotionStore;
pub use qweather::QWeatherProvider;
