pub mod user_repo;
pub use user_repo::UserRepository;
pub mod territory_repo;
pub use territory_repo::TerritoryRepository;
pub mod city_repo;
pub use city_repo::CityRepository;
pub mod route_repo;
pub use route_repo::RouteRepository;
pub mod enclosure_repo;
pub use enclosure_repo::EnclosureRepository;
pub mod port_repo;
pub use port_repo::PortRepository;
pub mod tray_repo;
pub use tray_repo::TrayRepository;
pub mod splice_repo;
pub use splice_repo::SpliceRepository;
pub mod customer_repo;
pub use customer_repo::CustomerRepository;
pub mod comment_repo;
pub use comment_repo::CommentRepository;
