// Library for tests to access modules

pub mod config;
pub mod history;
pub mod models;
pub mod monitor;
pub mod rates;
pub mod routes;
pub mod sampler;
pub mod version;
