use crate::models::{DashboardVariant, MenuEntry, Module, Role, User};

/// Shared empty constraint lists, so rules without a constraint can still borrow a
/// `'static` slice.
pub const ANY_ROLE: &[Role] = &[];
pub const ANY_MODULE: &[Module] = &[];

/// The landing page for roles the console does not recognise.
pub const FALLBACK_LANDING_PATH: &str = "/dashboard";

/// RouteRule
///
/// A static access constraint attached to a navigable console path.
///
/// * An empty `required_roles` or `required_modules` list means that constraint is not
///   checked.
/// * Within one list the values are alternatives (the user needs ANY of them).
/// * Across the two lists the constraints are combined with AND.
#[derive(Debug, Clone, Copy)]
pub struct RouteRule<'a> {
    pub path: &'a str,
    pub required_roles: &'a [Role],
    pub required_modules: &'a [Module],
}

impl<'a> RouteRule<'a> {
    pub fn new(path: &'a str, required_roles: &'a [Role], required_modules: &'a [Module]) -> Self {
        let rule = Self {
            path,
            required_roles,
            required_modules,
        };
        rule.assert_well_formed();
        rule
    }

    /// Open to any authenticated user.
    pub fn open(path: &'a str) -> Self {
        Self::new(path, ANY_ROLE, ANY_MODULE)
    }

    pub fn for_roles(path: &'a str, roles: &'a [Role]) -> Self {
        Self::new(path, roles, ANY_MODULE)
    }

    pub fn for_modules(path: &'a str, modules: &'a [Module]) -> Self {
        Self::new(path, ANY_ROLE, modules)
    }

    /// A malformed rule is a programming error in the compiled-in table, never a
    /// condition to recover from at runtime.
    pub fn assert_well_formed(&self) {
        assert!(
            self.path.starts_with('/'),
            "route rule path must be absolute: {:?}",
            self.path
        );
        assert!(
            !self.required_roles.iter().any(|role| matches!(role, Role::Other(_))),
            "route rule {:?} references a role outside the compiled-in enumeration",
            self.path
        );
    }
}

/// MenuDefinition
///
/// A static side-menu item. The entry is visible when the user holds ANY of `modules`
/// (an empty list means no module is needed) and, for `admin_only` entries, when the
/// user is an administrator.
#[derive(Debug, Clone, Copy)]
pub struct MenuDefinition<'a> {
    pub key: &'a str,
    pub label: &'a str,
    pub icon: &'a str,
    pub target_path: &'a str,
    pub modules: &'a [Module],
    pub admin_only: bool,
}

impl MenuDefinition<'_> {
    fn is_visible_to(&self, user: &User) -> bool {
        let module_ok = self.modules.is_empty()
            || self.modules.iter().any(|module| user.has_module(*module));
        let role_ok = !self.admin_only || user.is_admin();
        module_ok && role_ok
    }

    fn to_entry(self) -> MenuEntry {
        MenuEntry {
            key: self.key.to_string(),
            label: self.label.to_string(),
            icon: self.icon.to_string(),
            target_path: self.target_path.to_string(),
        }
    }
}

/// can_access
///
/// Decides whether `user` may open a route guarded by `rule`. Pure and total: no I/O,
/// no panics for any user.
///
/// The role check and the module check are independent gates. A user holding a
/// required module but not a required role (or the reverse) is refused.
pub fn can_access(user: Option<&User>, rule: &RouteRule<'_>) -> bool {
    let Some(user) = user else {
        return false;
    };

    if !rule.required_roles.is_empty() && !rule.required_roles.contains(&user.role) {
        return false;
    }

    if !rule.required_modules.is_empty()
        && !rule
            .required_modules
            .iter()
            .any(|module| user.has_module(*module))
    {
        return false;
    }

    true
}

/// visible_menu_entries
///
/// Filters the menu definitions down to what `user` may see, keeping the definition
/// order. No user means no menu.
pub fn visible_menu_entries(user: Option<&User>, definitions: &[MenuDefinition<'_>]) -> Vec<MenuEntry> {
    let Some(user) = user else {
        return Vec::new();
    };

    definitions
        .iter()
        .filter(|definition| definition.is_visible_to(user))
        .map(|definition| definition.to_entry())
        .collect()
}

/// default_landing_path
///
/// Where a role lands after login and where an authenticated but unauthorized
/// navigation is sent. Total over `Role`; unknown roles get the generic dashboard.
pub fn default_landing_path(role: &Role) -> &'static str {
    match role {
        Role::Admin => "/dashboard/admin",
        Role::Diretoria | Role::Financeiro => "/dashboard/executivo",
        Role::CsCx | Role::Dataops => "/dashboard/cs",
        Role::Vendas => "/dashboard/vendas",
        Role::Other(_) => FALLBACK_LANDING_PATH,
    }
}

/// dashboard_variant
///
/// Which dashboard the console home renders for a role. Finance shares the executive
/// view and DataOps shares the CS view; unknown roles get the executive view.
pub fn dashboard_variant(role: &Role) -> DashboardVariant {
    match role {
        Role::Vendas => DashboardVariant::Vendas,
        Role::CsCx | Role::Dataops => DashboardVariant::Cs,
        Role::Admin => DashboardVariant::Admin,
        Role::Diretoria | Role::Financeiro | Role::Other(_) => DashboardVariant::Executivo,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[should_panic(expected = "must be absolute")]
    fn relative_rule_path_is_rejected() {
        RouteRule::open("clientes");
    }

    #[test]
    #[should_panic(expected = "outside the compiled-in enumeration")]
    fn unknown_role_in_rule_is_rejected() {
        let roles = [Role::Other("auditor".to_string())];
        RouteRule::for_roles("/auditoria", &roles);
    }
}
