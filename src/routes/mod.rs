/// Router Module Index
///
/// Organizes the gateway's routing into access-segregated modules, so that access
/// control is applied explicitly at the module level (via Axum layers).

/// Routes accessible to anyone: health, the login/signup/logout flow and the
/// navigation decision endpoint.
pub mod public;

/// JSON routes protected by the `AuthUser` middleware. Answer 401 without a session.
pub mod api;

/// Console pages protected by the route guard. Answer with the page envelope or a
/// redirect; never with an error status for auth failures.
pub mod console;
