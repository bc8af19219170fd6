pub mod auth;
pub mod cities;
pub mod comments;
pub mod customers;
pub mod enclosures;
pub mod health;
pub mod ports;
pub mod routes;
pub mod splices;
pub mod users;
