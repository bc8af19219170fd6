// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health::health,

        // --- Auth ---
        handlers::auth::login,
        handlers::auth::get_me,

        // --- Users ---
        handlers::users::list_users,
        handlers::users::get_user,
        handlers::users::create_user,
        handlers::users::update_user,
        handlers::users::assign_cities,

        // --- Cidades ---
        handlers::cities::list_cities,
        handlers::cities::get_city,
        handlers::cities::create_city,
        handlers::cities::update_city,
        handlers::cities::delete_city,

        // --- Rotas ---
        handlers::routes::list_routes,
        handlers::routes::get_route,
        handlers::routes::list_tubes,
        handlers::routes::create_route,
        handlers::routes::update_route,
        handlers::routes::delete_route,

        // --- Caixas ---
        handlers::enclosures::list_enclosures,
        handlers::enclosures::get_enclosure,
        handlers::enclosures::create_enclosure,
        handlers::enclosures::update_enclosure,
        handlers::enclosures::delete_enclosure,
        handlers::enclosures::list_ports,
        handlers::enclosures::bulk_update_ports,
        handlers::enclosures::list_trays,
        handlers::enclosures::bulk_update_trays,
        handlers::enclosures::list_maintenances,
        handlers::enclosures::create_maintenance,

        // --- Portas e Bandejas ---
        handlers::ports::update_port,
        handlers::ports::delete_port,
        handlers::ports::update_tray,

        // --- Fusões ---
        handlers::splices::list_splices,
        handlers::splices::create_splices,
        handlers::splices::delete_splice,

        // --- Clientes ---
        handlers::customers::list_customers,
        handlers::customers::get_customer,
        handlers::customers::create_customer,
        handlers::customers::update_customer,
        handlers::customers::delete_customer,

        // --- Comentários ---
        handlers::comments::list_comments,
        handlers::comments::create_comment,
        handlers::comments::delete_comment,
    ),
    components(
        schemas(
            crate::common::pagination::Paginacao,

            // --- Auth ---
            models::auth::Role,
            models::auth::User,
            models::auth::UserWithCities,
            models::auth::LoginUserPayload,
            models::auth::AuthResponse,
            models::auth::CreateUserPayload,
            models::auth::UpdateUserPayload,
            models::auth::AssignCitiesPayload,

            // --- Território ---
            models::city::City,
            models::city::CreateCityPayload,
            models::city::UpdateCityPayload,

            // --- Rotas ---
            models::route::Route,
            models::route::Tube,
            models::route::Fiber,
            models::route::TubeWithFibers,
            models::route::CreateRoutePayload,
            models::route::UpdateRoutePayload,

            // --- Caixas ---
            models::enclosure::EnclosureKind,
            models::enclosure::PortStatus,
            models::enclosure::Enclosure,
            models::enclosure::EnclosureDetail,
            models::enclosure::EnclosureUsage,
            models::enclosure::Port,
            models::enclosure::PortWithCustomer,
            models::enclosure::Tray,
            models::enclosure::TrayWithUsage,
            models::enclosure::Maintenance,
            models::enclosure::CreateEnclosurePayload,
            models::enclosure::UpdateEnclosurePayload,
            models::enclosure::CreateMaintenancePayload,
            models::enclosure::UpdatePortPayload,
            models::enclosure::BulkPortUpdate,
            models::enclosure::BulkPortsPayload,
            models::enclosure::UpdateTrayPayload,
            models::enclosure::BulkTrayUpdate,
            models::enclosure::BulkTraysPayload,

            // --- Fusões ---
            models::splice::Splice,
            models::splice::CreateSplicePayload,
            models::splice::CreateSpliceBatchPayload,
            models::splice::SplicePayload,

            // --- Clientes e Comentários ---
            models::customer::Customer,
            models::customer::CreateCustomerPayload,
            models::customer::UpdateCustomerPayload,
            models::comment::Comment,
            models::comment::CreateCommentPayload,
        )
    ),
    tags(
        (name = "Saúde", description = "Verificação de disponibilidade"),
        (name = "Auth", description = "Autenticação"),
        (name = "Usuários", description = "Gestão de usuários, cargos e territórios"),
        (name = "Cidades", description = "Cidades atendidas (territórios)"),
        (name = "Rotas", description = "Cabos, tubos e capilares"),
        (name = "Caixas", description = "CTOs e CEOs com seus recursos"),
        (name = "Portas", description = "Status das portas de CTO"),
        (name = "Bandejas", description = "Capacidade das bandejas de CEO"),
        (name = "Fusões", description = "Fusões de fibra nas CEOs"),
        (name = "Clientes", description = "Clientes e atribuição de portas"),
        (name = "Comentários", description = "Anotações em caixas e rotas")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_core_paths_and_bearer_scheme() {
        let doc = ApiDoc::openapi();
        for path in ["/api/enclosures/{id}/ports", "/api/splices", "/api/trays/{id}", "/api/customers/{id}"] {
            assert!(doc.paths.paths.contains_key(path), "faltando {}", path);
        }
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("api_jwt"));
    }
}
