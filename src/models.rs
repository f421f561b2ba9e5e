use std::{collections::BTreeSet, fmt};

use serde::{Deserialize, Deserializer, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;

// --- Access Vocabulary (Compiled-In) ---

/// Role
///
/// The coarse-grained job function assigned to exactly one user. Drives the default
/// landing page, the dashboard variant and any role-gated route.
///
/// Roles the console does not know about (e.g. a role added to the backend before the
/// gateway is redeployed) deserialize into `Role::Other` instead of failing, so a user
/// with such a role still signs in and lands on the generic dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    Admin,
    Diretoria,
    CsCx,
    Financeiro,
    Vendas,
    Dataops,
    Other(String),
}

impl Role {
    /// Every role the console was built for, in the order the backend lists them.
    pub const KNOWN: [Role; 6] = [
        Role::Admin,
        Role::Diretoria,
        Role::CsCx,
        Role::Financeiro,
        Role::Vendas,
        Role::Dataops,
    ];

    /// The wire value used by the backend (`"cs_cx"`, `"vendas"`, ...).
    pub fn as_str(&self) -> &str {
        match self {
            Role::Admin => "admin",
            Role::Diretoria => "diretoria",
            Role::CsCx => "cs_cx",
            Role::Financeiro => "financeiro",
            Role::Vendas => "vendas",
            Role::Dataops => "dataops",
            Role::Other(raw) => raw,
        }
    }

    /// Human-friendly role name shown in the header badge and the user list.
    pub fn display_name(&self) -> &str {
        match self {
            Role::Admin => "Administrador",
            Role::Diretoria => "Diretoria",
            Role::CsCx => "Customer Success/Experience",
            Role::Financeiro => "Financeiro",
            Role::Vendas => "Vendas",
            Role::Dataops => "DataOps",
            Role::Other(raw) => raw,
        }
    }

    /// Console title rendered at the top of the side menu.
    pub fn console_title(&self) -> &'static str {
        match self {
            Role::Vendas => "HubControl Sales",
            Role::CsCx => "HubControl CS",
            Role::Diretoria => "HubControl Executive",
            Role::Admin => "HubControl Admin",
            _ => "HubControl",
        }
    }
}

impl From<String> for Role {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "admin" => Role::Admin,
            "diretoria" => Role::Diretoria,
            "cs_cx" => Role::CsCx,
            "financeiro" => Role::Financeiro,
            "vendas" => Role::Vendas,
            "dataops" => Role::Dataops,
            _ => Role::Other(raw),
        }
    }
}

impl From<&str> for Role {
    fn from(raw: &str) -> Self {
        Role::from(raw.to_string())
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        match role {
            Role::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Module
///
/// A fine-grained feature area. A user holds zero or more modules independently of
/// their role. The set is closed: extending it means redeploying the gateway.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum Module {
    Dashboard,
    Clientes,
    Vendas,
    VendasDashboard,
    VendasRegistro,
    VendasVendedores,
    VendasDados,
    Contratos,
    HealthScore,
    Csat,
    MlChurn,
    Usuarios,
    Configuracoes,
}

impl Module {
    pub const ALL: [Module; 13] = [
        Module::Dashboard,
        Module::Clientes,
        Module::Vendas,
        Module::VendasDashboard,
        Module::VendasRegistro,
        Module::VendasVendedores,
        Module::VendasDados,
        Module::Contratos,
        Module::HealthScore,
        Module::Csat,
        Module::MlChurn,
        Module::Usuarios,
        Module::Configuracoes,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Module::Dashboard => "dashboard",
            Module::Clientes => "clientes",
            Module::Vendas => "vendas",
            Module::VendasDashboard => "vendas_dashboard",
            Module::VendasRegistro => "vendas_registro",
            Module::VendasVendedores => "vendas_vendedores",
            Module::VendasDados => "vendas_dados",
            Module::Contratos => "contratos",
            Module::HealthScore => "health_score",
            Module::Csat => "csat",
            Module::MlChurn => "ml_churn",
            Module::Usuarios => "usuarios",
            Module::Configuracoes => "configuracoes",
        }
    }

    /// Resolves a backend module key. Unknown keys yield `None`.
    pub fn parse(key: &str) -> Option<Module> {
        Module::ALL.into_iter().find(|module| module.key() == key)
    }
}

/// Deserializes the backend's module list, silently dropping keys the console does not
/// know. An unknown module grants nothing; it is never an error.
fn known_modules<'de, D>(deserializer: D) -> Result<BTreeSet<Module>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Vec::<String>::deserialize(deserializer)?;
    Ok(raw.iter().filter_map(|key| Module::parse(key)).collect())
}

// --- Principal ---

/// Permissions
///
/// The grants attached to a user by the backend. `actions` gate individual buttons and
/// features (e.g. `export`, `manage_users`); they never gate a route.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct Permissions {
    #[serde(default, deserialize_with = "known_modules")]
    pub modules: BTreeSet<Module>,
    #[serde(default)]
    pub actions: BTreeSet<String>,
    /// Data scope label reported by the backend (`all`, `cs_data`, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_access: Option<String>,
}

/// User
///
/// The authenticated principal as returned by the backend `/auth/signin` and `/auth/me`
/// endpoints. This is also the shape cached in a `Session`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub full_name: String,
    #[ts(type = "string")]
    #[schema(value_type = String, example = "vendas")]
    pub role: Role,
    #[serde(default)]
    pub permissions: Permissions,
}

impl User {
    pub fn has_module(&self, module: Module) -> bool {
        self.permissions.modules.contains(&module)
    }

    /// Feature-level gate used by buttons (export, import, manage_users, ...).
    pub fn has_action(&self, action: &str) -> bool {
        self.permissions.actions.contains(action)
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// DashboardVariant
///
/// Which dashboard a role sees when opening the console home.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum DashboardVariant {
    Vendas,
    Cs,
    Executivo,
    Admin,
}

/// MenuEntry
///
/// A navigation item ready to render. Derived on every request from the static menu
/// definitions and the current user; never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct MenuEntry {
    pub key: String,
    pub label: String,
    pub icon: String,
    pub target_path: String,
}

/// PageView
///
/// The envelope returned for an allowed console navigation: everything the shell needs
/// to draw the frame around the requested page.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct PageView {
    pub path: String,
    pub title: String,
    pub role_name: String,
    /// Heading of the side menu, e.g. `HubControl Sales`.
    pub console_title: String,
    pub user: User,
    pub menu: Vec<MenuEntry>,
    /// Set only for the console home, where the role picks the dashboard.
    pub dashboard: Option<DashboardVariant>,
}

// --- Authentication Payloads ---

/// SignInRequest
///
/// Credentials forwarded to the backend `POST /auth/signin`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

/// SignUpRequest
///
/// Registration payload forwarded to the backend `POST /auth/signup`.
/// The backend defaults the role to `cs_cx` when it is omitted.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    pub full_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

/// Backend reply to a successful sign-in.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BackendAuthResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: String,
    #[serde(default)]
    pub expires_in: u64,
    pub user: User,
}

/// Backend reply to a successful sign-up.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SignUpResponse {
    #[serde(default)]
    pub message: String,
    pub user: User,
}

/// Backend reply to `GET /auth/me`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeResponse {
    pub user: User,
}

/// LoginResponse
///
/// Returned by the gateway after a successful login. `landing_path` is where the
/// console should navigate first.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LoginResponse {
    pub access_token: String,
    pub user: User,
    pub landing_path: String,
}
