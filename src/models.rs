pub mod auth;
pub mod city;
pub mod comment;
pub mod customer;
pub mod enclosure;
pub mod route;
pub mod splice;
