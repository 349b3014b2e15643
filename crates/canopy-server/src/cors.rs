use canopy_config::{AnyOrArray, CorsConfig};
use http::header::HeaderName;
use http::{HeaderValue, Method};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};

/// Build a Tower CORS layer from configuration
///
/// Entries that do not parse are skipped.
pub fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let layer = match &config.origins {
        AnyOrArray::Any => CorsLayer::new().allow_origin(AllowOrigin::any()),
        AnyOrArray::List(origins) => CorsLayer::new().allow_origin(parse_all::<HeaderValue>(origins)),
    };

    let layer = match &config.methods {
        AnyOrArray::Any => layer.allow_methods(AllowMethods::any()),
        AnyOrArray::List(methods) => layer.allow_methods(parse_all::<Method>(methods)),
    };

    let layer = match &config.headers {
        AnyOrArray::Any => layer.allow_headers(AllowHeaders::any()),
        AnyOrArray::List(headers) => layer.allow_headers(parse_all::<HeaderName>(headers)),
    };

    match config.max_age_duration() {
        Some(max_age) => layer.max_age(max_age),
        None => layer,
    }
}

fn parse_all<T: std::str::FromStr>(values: &[String]) -> Vec<T> {
    values.iter().filter_map(|v| v.parse().ok()).collect()
}
