//! Mapping between gRPC method identifiers and broker-facing HTTP routes.
//!
//! A gRPC method `/pkg.sub.UserService/GetUser` becomes the route
//! `/<prefix>/Pkg_Sub/get_user?service=UserService&request=<RequestType>`:
//!
//! - the package segments are camelized and joined with `_` to form the service
//!   path segment (a service without a package uses its own name instead),
//! - the action is converted to snake_case,
//! - the service leaf name and the request message leaf name travel as the
//!   `service` and `request` query discriminators.
//!
//! The mapping is a pure function of its input. It is not injective: `GetUser` and
//! `getUser` both map to `get_user`.

use url::form_urlencoded;

use crate::error::BridgeError;
use crate::service_id::ServiceId;

/// Query parameter carrying the service leaf name.
pub const SERVICE_QUERY: &str = "service";
/// Query parameter carrying the request message leaf name.
pub const REQUEST_QUERY: &str = "request";

/// A parsed fully-qualified gRPC method name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodIdentifier {
    package_path: Vec<String>,
    service_name: String,
    action_name: String,
}

impl MethodIdentifier {
    /// Parse a method string of the form `/package.sub.Service/Action`.
    ///
    /// The leading slash is optional.
    pub fn parse(method: &str) -> Result<Self, BridgeError> {
        let invalid = || BridgeError::InvalidMethodPath(method.to_string());

        let trimmed = method.strip_prefix('/').unwrap_or(method);
        let (service, action) = trimmed.split_once('/').ok_or_else(invalid)?;
        if action.is_empty() || action.contains('/') {
            return Err(invalid());
        }

        let mut segments: Vec<&str> = service.split('.').collect();
        if segments.iter().any(|segment| segment.is_empty()) {
            return Err(invalid());
        }
        let service_name = segments.pop().ok_or_else(invalid)?;

        Ok(Self {
            package_path: segments.into_iter().map(str::to_string).collect(),
            service_name: service_name.to_string(),
            action_name: action.to_string(),
        })
    }

    /// Build an identifier from a service id and an action name.
    pub fn from_service(service: &ServiceId, action: impl Into<String>) -> Self {
        Self {
            package_path: service.package().into_iter().map(str::to_string).collect(),
            service_name: service.leaf().to_string(),
            action_name: action.into(),
        }
    }

    pub fn package_path(&self) -> &[String] {
        &self.package_path
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    pub fn action_name(&self) -> &str {
        &self.action_name
    }

    /// The dot-joined service name, e.g. `pkg.sub.UserService`.
    pub fn service_id(&self) -> ServiceId {
        if self.package_path.is_empty() {
            return ServiceId::from(self.service_name.as_str());
        }
        ServiceId::from(format!(
            "{}.{}",
            self.package_path.join("."),
            self.service_name
        ))
    }

    /// The gRPC request path, e.g. `/pkg.sub.UserService/GetUser`.
    pub fn grpc_path(&self) -> String {
        format!("/{}/{}", self.service_id(), self.action_name)
    }
}

impl std::fmt::Display for MethodIdentifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.grpc_path())
    }
}

/// The HTTP-facing encoding of a [`MethodIdentifier`].
///
/// Only constructed by [`to_route`] and [`parse_request_path`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BridgeRoute {
    service_path_segment: String,
    action_segment: String,
    service_query: Option<String>,
    request_type_query: Option<String>,
}

impl BridgeRoute {
    pub fn service_path_segment(&self) -> &str {
        &self.service_path_segment
    }

    pub fn action_segment(&self) -> &str {
        &self.action_segment
    }

    pub fn service_query(&self) -> Option<&str> {
        self.service_query.as_deref()
    }

    pub fn request_type_query(&self) -> Option<&str> {
        self.request_type_query.as_deref()
    }

    /// The path below the bridge prefix, e.g. `/pact/Pkg_Sub/get_user`.
    pub fn path(&self, prefix: &str) -> String {
        format!(
            "/{}/{}/{}",
            prefix, self.service_path_segment, self.action_segment
        )
    }

    /// The query discriminators in emission order (`service`, then `request`).
    pub fn query_pairs(&self) -> Vec<(&'static str, &str)> {
        let mut pairs = Vec::with_capacity(2);
        if let Some(service) = &self.service_query {
            pairs.push((SERVICE_QUERY, service.as_str()));
        }
        if let Some(request) = &self.request_type_query {
            pairs.push((REQUEST_QUERY, request.as_str()));
        }
        pairs
    }
}

impl std::fmt::Display for BridgeRoute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.service_path_segment, self.action_segment)?;
        let pairs = self.query_pairs();
        if !pairs.is_empty() {
            let query = form_urlencoded::Serializer::new(String::new())
                .extend_pairs(pairs)
                .finish();
            write!(f, "?{query}")?;
        }
        Ok(())
    }
}

/// Compute the broker route for a method, optionally discriminating the request type.
///
/// `request_type` may be fully qualified; only its leaf name is emitted.
pub fn to_route(method: &MethodIdentifier, request_type: Option<&str>) -> BridgeRoute {
    BridgeRoute {
        service_path_segment: service_path_segment(method.package_path(), method.service_name()),
        action_segment: snake_case(method.action_name()),
        service_query: Some(method.service_name().to_string()),
        request_type_query: request_type.map(|name| leaf_name(name).to_string()),
    }
}

/// Best-effort inverse of [`to_route`].
///
/// Requires the `service` discriminator: the path segment alone does not carry the
/// service name. Package casing is lost in the segment, so the recovered package is
/// always lowercase (`Pkg_Sub` gives `pkg.sub` even for `pkg.Sub`). The result maps
/// back to the same route but may name a different service. Registry-backed
/// resolution matches in route space instead.
pub fn from_route(route: &BridgeRoute) -> Result<MethodIdentifier, BridgeError> {
    let service_name = route.service_query().ok_or_else(|| {
        BridgeError::UnresolvableRoute(format!("{route} carries no {SERVICE_QUERY}= discriminator"))
    })?;

    let package_path = if route.service_path_segment == service_name {
        Vec::new()
    } else {
        route
            .service_path_segment
            .split('_')
            .map(snake_case)
            .collect()
    };

    Ok(MethodIdentifier {
        package_path,
        service_name: service_name.to_string(),
        action_name: camelize(&route.action_segment),
    })
}

/// Whether `path` lies under the bridge prefix.
pub fn is_bridged(prefix: &str, path: &str) -> bool {
    path.strip_prefix('/')
        .and_then(|rest| rest.split('/').next())
        .is_some_and(|first| first == prefix)
}

/// Parse an inbound `/<prefix>/<segment>/<action>` path and its query string.
pub fn parse_request_path(
    prefix: &str,
    path: &str,
    query: Option<&str>,
) -> Result<BridgeRoute, BridgeError> {
    let unresolvable = || BridgeError::UnresolvableRoute(path.to_string());

    let trimmed = path.trim_end_matches('/');
    let mut segments = trimmed.strip_prefix('/').ok_or_else(unresolvable)?.split('/');

    if segments.next() != Some(prefix) {
        return Err(unresolvable());
    }
    let (Some(segment), Some(action), None) = (segments.next(), segments.next(), segments.next())
    else {
        return Err(unresolvable());
    };
    if segment.is_empty() || action.is_empty() {
        return Err(unresolvable());
    }

    let mut service_query = None;
    let mut request_type_query = None;
    for (key, value) in form_urlencoded::parse(query.unwrap_or_default().as_bytes()) {
        if value.is_empty() {
            continue;
        }
        match key.as_ref() {
            SERVICE_QUERY => service_query = Some(value.into_owned()),
            REQUEST_QUERY => request_type_query = Some(value.into_owned()),
            _ => {}
        }
    }

    Ok(BridgeRoute {
        service_path_segment: segment.to_string(),
        action_segment: action.to_string(),
        service_query,
        request_type_query,
    })
}

/// The service path segment for a package path, e.g. `["pkg", "sub"]` → `Pkg_Sub`.
pub fn service_path_segment(package_path: &[String], service_name: &str) -> String {
    if package_path.is_empty() {
        return service_name.to_string();
    }
    package_path
        .iter()
        .map(|segment| camelize(segment))
        .collect::<Vec<_>>()
        .join("_")
}

/// `GetUser` → `get_user`. Idempotent on snake_case input; never emits a leading underscore.
pub fn snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for ch in name.chars() {
        if ch.is_ascii_uppercase() {
            out.push('_');
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    match out.strip_prefix('_') {
        Some(stripped) => stripped.to_string(),
        None => out,
    }
}

/// `get_user` → `GetUser`, `pkg` → `Pkg`.
pub fn camelize(name: &str) -> String {
    name.split('_')
        .map(|piece| {
            let mut chars = piece.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

/// The last dot-segment of a possibly qualified name.
pub fn leaf_name(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route_for(method: &str, request: Option<&str>) -> BridgeRoute {
        to_route(&MethodIdentifier::parse(method).unwrap(), request)
    }

    #[test]
    fn test_parse_method() {
        let id = MethodIdentifier::parse("/pkg.sub.UserService/GetUser").unwrap();
        assert_eq!(id.package_path(), ["pkg", "sub"]);
        assert_eq!(id.service_name(), "UserService");
        assert_eq!(id.action_name(), "GetUser");
        assert_eq!(id.service_id().as_str(), "pkg.sub.UserService");
        assert_eq!(id.grpc_path(), "/pkg.sub.UserService/GetUser");
    }

    #[test]
    fn test_parse_without_leading_slash_or_package() {
        let id = MethodIdentifier::parse("UserService/GetUser").unwrap();
        assert!(id.package_path().is_empty());
        assert_eq!(id.service_id().as_str(), "UserService");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for bad in ["", "/", "/pkg.Service", "/pkg.Service/", "/pkg..Service/Get", "/a/b/c", "//Get"] {
            assert!(
                matches!(MethodIdentifier::parse(bad), Err(BridgeError::InvalidMethodPath(_))),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_to_route() {
        let route = route_for("/pkg.sub.UserService/GetUser", Some("pkg.sub.GetUserRequest"));
        assert_eq!(route.service_path_segment(), "Pkg_Sub");
        assert_eq!(route.action_segment(), "get_user");
        assert_eq!(route.service_query(), Some("UserService"));
        assert_eq!(route.request_type_query(), Some("GetUserRequest"));
        assert_eq!(route.path("pact"), "/pact/Pkg_Sub/get_user");
        assert_eq!(
            route.to_string(),
            "Pkg_Sub/get_user?service=UserService&request=GetUserRequest"
        );
    }

    #[test]
    fn test_to_route_is_deterministic() {
        let first = route_for("/example.ExampleService/ExampleMethod", Some("ExampleRequest"));
        for _ in 0..16 {
            assert_eq!(
                route_for("/example.ExampleService/ExampleMethod", Some("ExampleRequest")),
                first
            );
        }
    }

    #[test]
    fn test_unqualified_service_uses_its_own_name() {
        let route = route_for("/UserService/GetUser", None);
        assert_eq!(route.service_path_segment(), "UserService");
        assert_eq!(route.request_type_query(), None);
    }

    #[test]
    fn test_snake_case() {
        assert_eq!(snake_case("GetUser"), "get_user");
        assert_eq!(snake_case("get_user"), "get_user");
        assert_eq!(snake_case("A"), "a");
        assert_eq!(snake_case("getUserById"), "get_user_by_id");
        assert_eq!(snake_case(""), "");
    }

    #[test]
    fn test_colliding_actions_are_accepted() {
        assert_eq!(snake_case("GetUser"), snake_case("getUser"));
    }

    #[test]
    fn test_camelize() {
        assert_eq!(camelize("get_user"), "GetUser");
        assert_eq!(camelize("pkg"), "Pkg");
        assert_eq!(camelize("my_pkg"), "MyPkg");
    }

    #[test]
    fn test_round_trip_with_service_query() {
        for method in [
            "/pkg.sub.UserService/GetUser",
            "/example.ExampleService/ExampleMethod",
            "/my_pkg.v1.Billing/Charge",
            "/UserService/GetUser",
        ] {
            let original = MethodIdentifier::parse(method).unwrap();
            let recovered = from_route(&to_route(&original, None)).unwrap();
            assert_eq!(recovered.service_id(), original.service_id(), "{method}");
            assert_eq!(recovered.action_name(), original.action_name(), "{method}");
        }
    }

    #[test]
    fn test_mixed_case_package_round_trips_in_route_space() {
        let original = MethodIdentifier::parse("/pkg.Sub.Service/Action").unwrap();
        let route = to_route(&original, None);
        assert_eq!(route.service_path_segment(), "Pkg_Sub");

        let recovered = from_route(&route).unwrap();
        assert_eq!(recovered.service_id().as_str(), "pkg.sub.Service");
        assert_eq!(to_route(&recovered, None), route);
    }

    #[test]
    fn test_from_route_requires_service_query() {
        let route = parse_request_path("pact", "/pact/User/get_user", None).unwrap();
        assert!(matches!(from_route(&route), Err(BridgeError::UnresolvableRoute(_))));
    }

    #[test]
    fn test_is_bridged() {
        assert!(is_bridged("pact", "/pact/User/get_user"));
        assert!(is_bridged("pact", "/pact"));
        assert!(!is_bridged("pact", "/health"));
        assert!(!is_bridged("pact", "/pactual/User/get_user"));
        assert!(!is_bridged("pact", "/"));
    }

    #[test]
    fn test_parse_request_path() {
        let route = parse_request_path(
            "pact",
            "/pact/User/get_user",
            Some("service=UserService&request=GetUserRequest"),
        )
        .unwrap();
        assert_eq!(route.service_path_segment(), "User");
        assert_eq!(route.action_segment(), "get_user");
        assert_eq!(route.service_query(), Some("UserService"));
        assert_eq!(route.request_type_query(), Some("GetUserRequest"));
    }

    #[test]
    fn test_parse_request_path_ignores_empty_and_unknown_params() {
        let route =
            parse_request_path("pact", "/pact/User/get_user/", Some("service=&debug=1")).unwrap();
        assert_eq!(route.service_query(), None);
        assert_eq!(route.request_type_query(), None);
    }

    #[test]
    fn test_parse_request_path_rejects_wrong_shape() {
        for path in ["/pact", "/pact/User", "/pact/User/get_user/extra", "/pact//get_user"] {
            assert!(
                matches!(
                    parse_request_path("pact", path, None),
                    Err(BridgeError::UnresolvableRoute(_))
                ),
                "{path} should be rejected"
            );
        }
    }
}
