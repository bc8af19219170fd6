// src/test_support.rs

// Cenários montados sobre um banco real. Os testes que usam estas funções
// rodam com `cargo test -- --ignored` e DATABASE_URL apontando para um Postgres.

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    config::{AppState, Config},
    models::{
        auth::{CreateUserPayload, Principal, Role},
        city::{CreateCityPayload, City},
        enclosure::{CreateEnclosurePayload, EnclosureDetail, EnclosureKind},
        route::{CreateRoutePayload, Fiber, Route},
    },
};

pub fn state(pool: PgPool) -> AppState {
    let config = Config {
        database_url: String::new(),
        jwt_secret: "segredo-de-teste".into(),
        server_addr: "127.0.0.1:0".into(),
        max_connections: 1,
        jwt_expiration_hours: 1,
        bootstrap_manager: None,
    };
    AppState::from_parts(pool, config)
}

fn short_tag() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}

pub async fn user(state: &AppState, role: Role, city_ids: Vec<Uuid>) -> Principal {
    let created = state
        .user_service
        .create_user(&CreateUserPayload {
            name: "Usuário de teste".into(),
            email: format!("{}@teste.com", short_tag()),
            password: "senha-de-teste".into(),
            role,
            city_ids,
        })
        .await
        .unwrap();
    Principal { user_id: created.user.id, role }
}

pub async fn manager(state: &AppState) -> Principal {
    user(state, Role::Manager, Vec::new()).await
}

pub async fn city(state: &AppState) -> City {
    state
        .city_service
        .create_city(&CreateCityPayload {
            name: format!("Cidade {}", short_tag()),
            state: "PB".into(),
            latitude: None,
            longitude: None,
        })
        .await
        .unwrap()
}

pub async fn route(state: &AppState, principal: &Principal, city_id: Uuid, fiber_count: i32) -> Route {
    state
        .route_service
        .create_route(
            principal,
            &CreateRoutePayload {
                city_id,
                name: format!("Rota {}", short_tag()),
                cable_type: "AS80".into(),
                fiber_count,
                length_meters: None,
            },
        )
        .await
        .unwrap()
}

/// Capilares de uma rota, na ordem dos tubos.
pub async fn fibers(state: &AppState, principal: &Principal, route_id: Uuid) -> Vec<Fiber> {
    state
        .route_service
        .list_tubes(principal, route_id)
        .await
        .unwrap()
        .into_iter()
        .flat_map(|t| t.fibers)
        .collect()
}

pub async fn enclosure(
    state: &AppState,
    principal: &Principal,
    city_id: Uuid,
    kind: EnclosureKind,
    capacity: i32,
) -> EnclosureDetail {
    state
        .enclosure_service
        .create_enclosure(
            principal,
            &CreateEnclosurePayload {
                city_id,
                name: format!("Caixa {}", short_tag()),
                kind,
                capacity,
                latitude: None,
                longitude: None,
                notes: None,
                route_ids: Vec::new(),
            },
        )
        .await
        .unwrap()
}
