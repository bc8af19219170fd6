// src/config.rs

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::{env, sync::Arc, time::Duration};

use crate::{
    db::{
        CityRepository, CommentRepository, CustomerRepository, EnclosureRepository, PortRepository,
        RouteRepository, SpliceRepository, TerritoryRepository, TrayRepository, UserRepository,
    },
    services::{
        auth::AuthService, city_service::CityService, comment_service::CommentService,
        customer_service::CustomerService, enclosure_service::EnclosureService,
        port_service::PortService, route_service::RouteService, splice_service::SpliceService,
        territory::TerritoryAuthorizer, tray_service::TrayService, user_service::UserService,
    },
};

const DEFAULT_SERVER_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_JWT_EXPIRATION_HOURS: i64 = 168;

/// Configuração lida do ambiente (e do `.env`, se existir).
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_addr: String,
    pub max_connections: u32,
    pub jwt_expiration_hours: i64,
    // E-mail e senha do primeiro Gerente, usados só com a base vazia
    pub bootstrap_manager: Option<(String, String)>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").context("DATABASE_URL deve ser definida")?;
        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET deve ser definido")?;

        let server_addr = env::var("SERVER_ADDR").unwrap_or_else(|_| DEFAULT_SERVER_ADDR.to_string());

        let max_connections = match env::var("DATABASE_MAX_CONNECTIONS") {
            Ok(raw) => raw.parse().context("DATABASE_MAX_CONNECTIONS deve ser um inteiro positivo")?,
            Err(_) => DEFAULT_MAX_CONNECTIONS,
        };

        let jwt_expiration_hours = match env::var("JWT_EXPIRATION_HOURS") {
            Ok(raw) => raw.parse().context("JWT_EXPIRATION_HOURS deve ser um inteiro")?,
            Err(_) => DEFAULT_JWT_EXPIRATION_HOURS,
        };

        let bootstrap_manager = match (
            env::var("BOOTSTRAP_MANAGER_EMAIL"),
            env::var("BOOTSTRAP_MANAGER_PASSWORD"),
        ) {
            (Ok(email), Ok(password)) => Some((email, password)),
            _ => None,
        };

        Ok(Self {
            database_url,
            jwt_secret,
            server_addr,
            max_connections,
            jwt_expiration_hours,
            bootstrap_manager,
        })
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub config: Arc<Config>,

    pub auth_service: AuthService,
    pub user_service: UserService,
    pub city_service: CityService,
    pub route_service: RouteService,
    pub enclosure_service: EnclosureService,
    pub port_service: PortService,
    pub tray_service: TrayService,
    pub splice_service: SpliceService,
    pub customer_service: CustomerService,
    pub comment_service: CommentService,
}

impl AppState {
    pub async fn new() -> anyhow::Result<Self> {
        let config = Config::from_env()?;

        // Conecta ao banco de dados, usando '?' para propagar erros
        let db_pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&config.database_url)
            .await?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        Ok(Self::from_parts(db_pool, config))
    }

    // --- Monta o gráfico de dependências ---
    pub fn from_parts(db_pool: PgPool, config: Config) -> Self {
        let territory = TerritoryAuthorizer::new(TerritoryRepository::new());

        let user_repo = UserRepository::new(db_pool.clone());
        let city_repo = CityRepository::new(db_pool.clone());
        let route_repo = RouteRepository::new(db_pool.clone());
        let enclosure_repo = EnclosureRepository::new(db_pool.clone());
        let port_repo = PortRepository::new(db_pool.clone());
        let tray_repo = TrayRepository::new(db_pool.clone());
        let splice_repo = SpliceRepository::new(db_pool.clone());
        let customer_repo = CustomerRepository::new(db_pool.clone());
        let comment_repo = CommentRepository::new(db_pool.clone());

        let auth_service = AuthService::new(
            user_repo.clone(),
            config.jwt_secret.clone(),
            config.jwt_expiration_hours,
            db_pool.clone(),
        );
        let user_service = UserService::new(user_repo, db_pool.clone());
        let city_service = CityService::new(city_repo, territory.clone(), db_pool.clone());
        let route_service = RouteService::new(route_repo.clone(), territory.clone(), db_pool.clone());
        let enclosure_service = EnclosureService::new(
            enclosure_repo.clone(),
            port_repo.clone(),
            tray_repo.clone(),
            route_repo,
            territory.clone(),
            db_pool.clone(),
        );
        let port_service = PortService::new(
            port_repo.clone(),
            enclosure_repo.clone(),
            customer_repo.clone(),
            territory.clone(),
            db_pool.clone(),
        );
        let tray_service = TrayService::new(
            tray_repo.clone(),
            enclosure_repo.clone(),
            splice_repo.clone(),
            territory.clone(),
            db_pool.clone(),
        );
        let splice_service = SpliceService::new(
            splice_repo,
            enclosure_repo.clone(),
            tray_repo,
            territory.clone(),
            db_pool.clone(),
        );
        let customer_service = CustomerService::new(
            customer_repo,
            port_repo,
            enclosure_repo,
            territory.clone(),
            db_pool.clone(),
        );
        let comment_service = CommentService::new(comment_repo, territory, db_pool.clone());

        Self {
            db_pool,
            config: Arc::new(config),
            auth_service,
            user_service,
            city_service,
            route_service,
            enclosure_service,
            port_service,
            tray_service,
            splice_service,
            customer_service,
            comment_service,
        }
    }
}
