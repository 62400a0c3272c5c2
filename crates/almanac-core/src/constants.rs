/// Route component constants shared across crates
pub const API_ROUTE_COMPONENT: &str = "api";
pub const API_ROUTE_PREFIX: &str = const_str::concat!("/", API_ROUTE_COMPONENT);

pub const CALENDAR_ROUTE_COMPONENT: &str = "calendar";
pub const CALENDAR_ROUTE_PREFIX: &str =
    const_str::concat!(API_ROUTE_PREFIX, "/", CALENDAR_ROUTE_COMPONENT);

pub const ADMIN_ROUTE_COMPONENT: &str = "admin";
pub const ADMIN_ROUTE_PREFIX: &str =
    const_str::concat!(API_ROUTE_PREFIX, "/", ADMIN_ROUTE_COMPONENT);

/// Path segment under an event detail page that serves its JSON export.
pub const EVENT_JSON_ROUTE_COMPONENT: &str = "json";

/// Record discriminator namespace written by the previous calendar schema.
pub const LEGACY_NAMESPACE: &str = "calendar";
/// Record discriminator namespace of the current schema.
pub const CURRENT_NAMESPACE: &str = "events";

/// Header carrying the requesting user id when a proxy authenticates upstream.
pub const REMOTE_USER_HEADER: &str = "x-remote-user";
