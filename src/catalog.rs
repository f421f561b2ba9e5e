use crate::{
    models::{Module, Role},
    policy::{MenuDefinition, RouteRule},
};

// --- Route Table ---

/// The console's navigable pages and the constraint guarding each of them.
///
/// Dashboard variants are role-gated so that every role's landing path is open to that
/// role (an unauthorized navigation is redirected there, so it must never bounce).
pub static ROUTES: &[RouteRule<'static>] = &[
    RouteRule {
        path: "/",
        required_roles: &[],
        required_modules: &[],
    },
    RouteRule {
        path: "/dashboard",
        required_roles: &[],
        required_modules: &[],
    },
    RouteRule {
        path: "/dashboard/vendas",
        required_roles: &[Role::Vendas, Role::Diretoria, Role::Admin],
        required_modules: &[],
    },
    RouteRule {
        path: "/dashboard/cs",
        required_roles: &[Role::CsCx, Role::Dataops, Role::Diretoria, Role::Admin],
        required_modules: &[],
    },
    RouteRule {
        path: "/dashboard/executivo",
        required_roles: &[Role::Diretoria, Role::Financeiro, Role::Admin],
        required_modules: &[],
    },
    RouteRule {
        path: "/dashboard/admin",
        required_roles: &[Role::Admin],
        required_modules: &[],
    },
    RouteRule {
        path: "/clientes",
        required_roles: &[],
        required_modules: &[Module::Clientes],
    },
    RouteRule {
        path: "/vendas",
        required_roles: &[],
        required_modules: &[
            Module::Vendas,
            Module::VendasDashboard,
            Module::VendasRegistro,
            Module::VendasVendedores,
            Module::VendasDados,
        ],
    },
    RouteRule {
        path: "/vendas/dashboard",
        required_roles: &[],
        required_modules: &[Module::Vendas, Module::VendasDashboard],
    },
    RouteRule {
        path: "/vendas/registro",
        required_roles: &[],
        required_modules: &[Module::Vendas, Module::VendasRegistro],
    },
    RouteRule {
        path: "/vendas/vendedores",
        required_roles: &[],
        required_modules: &[Module::Vendas, Module::VendasVendedores],
    },
    RouteRule {
        path: "/vendas/dados",
        required_roles: &[],
        required_modules: &[Module::Vendas, Module::VendasDados],
    },
    RouteRule {
        path: "/contratos",
        required_roles: &[],
        required_modules: &[Module::Contratos],
    },
    RouteRule {
        path: "/health-score",
        required_roles: &[],
        required_modules: &[Module::HealthScore],
    },
    RouteRule {
        path: "/csat",
        required_roles: &[],
        required_modules: &[Module::Csat],
    },
    RouteRule {
        path: "/ml/churn",
        required_roles: &[],
        required_modules: &[Module::MlChurn],
    },
    RouteRule {
        path: "/usuarios",
        required_roles: &[Role::Admin],
        required_modules: &[],
    },
    RouteRule {
        path: "/configuracoes",
        required_roles: &[],
        required_modules: &[Module::Configuracoes],
    },
    RouteRule {
        path: "/perfil",
        required_roles: &[],
        required_modules: &[],
    },
];

// --- Side Menu ---

pub static MENU: &[MenuDefinition<'static>] = &[
    MenuDefinition {
        key: "dashboard",
        label: "Dashboard",
        icon: "DashboardOutlined",
        target_path: "/dashboard",
        modules: &[],
        admin_only: false,
    },
    MenuDefinition {
        key: "clientes",
        label: "Clientes",
        icon: "UserOutlined",
        target_path: "/clientes",
        modules: &[Module::Clientes],
        admin_only: false,
    },
    MenuDefinition {
        key: "vendas",
        label: "Vendas",
        icon: "ShoppingCartOutlined",
        target_path: "/vendas",
        modules: &[
            Module::Vendas,
            Module::VendasDashboard,
            Module::VendasRegistro,
            Module::VendasVendedores,
            Module::VendasDados,
        ],
        admin_only: false,
    },
    MenuDefinition {
        key: "contratos",
        label: "Contratos",
        icon: "FileTextOutlined",
        target_path: "/contratos",
        modules: &[Module::Contratos],
        admin_only: false,
    },
    MenuDefinition {
        key: "health-score",
        label: "Health Score",
        icon: "HeartOutlined",
        target_path: "/health-score",
        modules: &[Module::HealthScore],
        admin_only: false,
    },
    MenuDefinition {
        key: "csat",
        label: "CSAT",
        icon: "SmileOutlined",
        target_path: "/csat",
        modules: &[Module::Csat],
        admin_only: false,
    },
    MenuDefinition {
        key: "ml-churn",
        label: "ML - Churn",
        icon: "RobotOutlined",
        target_path: "/ml/churn",
        modules: &[Module::MlChurn],
        admin_only: false,
    },
    MenuDefinition {
        key: "usuarios",
        label: "Usuários",
        icon: "TeamOutlined",
        target_path: "/usuarios",
        modules: &[],
        admin_only: true,
    },
    MenuDefinition {
        key: "configuracoes",
        label: "Configurações",
        icon: "SettingOutlined",
        target_path: "/configuracoes",
        modules: &[Module::Configuracoes],
        admin_only: false,
    },
];

/// route_for
///
/// Looks up the rule guarding a console path. Trailing slashes and query strings are
/// ignored; paths outside the table yield `None` (the caller answers 404).
pub fn route_for(path: &str) -> Option<&'static RouteRule<'static>> {
    let normalized = normalize_path(path);
    ROUTES.iter().find(|rule| rule.path == normalized)
}

/// Strips the query/fragment and any trailing slash, keeping `/` for the root.
pub fn normalize_path(path: &str) -> &str {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() { "/" } else { trimmed }
}

/// Human label for a console path, taken from the menu when the path has an entry.
pub fn page_title(path: &str) -> &'static str {
    let normalized = normalize_path(path);
    MENU.iter()
        .find(|definition| definition.target_path == normalized)
        .map(|definition| definition.label)
        .unwrap_or(match normalized {
            "/" | "/dashboard" | "/dashboard/vendas" | "/dashboard/cs"
            | "/dashboard/executivo" | "/dashboard/admin" => "Dashboard",
            "/perfil" => "Meu Perfil",
            _ => "HubControl",
        })
}
