pub mod auth;
pub mod territory;

pub mod layout;
pub mod port_state;
pub mod tray_packer;

pub mod city_service;
pub mod comment_service;
pub mod customer_service;
pub mod enclosure_service;
pub mod port_service;
pub mod route_service;
pub mod splice_service;
pub mod tray_service;
pub mod user_service;
