/// Router Module Index
///
/// Splits the portal into public pages and gated pages. Every protected router is
/// wrapped by `access::gated` with a static `RouteRequirement` declared next to its
/// routes, so no protected page can be mounted without a gate in front of it.

/// Pages reachable without a session (sign-in, pending notice, home).
pub mod public;

/// Pages for any signed-in role and the role-specific brand, buyer and sales views.
pub mod protected;

/// Administrator pages: user approval, stats, booking assignment.
pub mod admin;

/// Paths the portal mounts itself, as prefixes. The configurable gate destinations
/// (sign-in, pending, home) must stay clear of them: a destination under a gated
/// prefix would send denials back into the gate.
pub const RESERVED_PATHS: [&str; 12] = [
    "/dashboard",
    "/profile",
    "/bookings",
    "/sales",
    "/brand",
    "/buyer",
    "/admin",
    "/health",
    "/auth/sign-in",
    "/auth/sign-out",
    "/swagger-ui",
    "/api-docs",
];

/// True when `path` equals a reserved path or lies beneath one.
pub fn is_reserved(path: &str) -> bool {
    RESERVED_PATHS.iter().any(|reserved| {
        path == *reserved
            || path
                .strip_prefix(reserved)
                .is_some_and(|rest| rest.starts_with('/'))
    })
}
