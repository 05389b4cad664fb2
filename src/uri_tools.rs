use hyper::http::{Error, Uri};

/// Appends `path` to the path of `base_uri` and `query` to its query string.
pub fn compose_uri(base_uri: &Uri, path: &str, query: &str) -> Result<Uri, Error> {
    let mut new_path = [base_uri.path().trim_end_matches('/'), path].concat();
    if new_path.is_empty() {
        new_path.push('/');
    }
    let path_and_query = match base_uri.query() {
        Some(base_query) if !base_query.is_empty() => format!("{new_path}?{base_query}&{query}"),
        _ => format!("{new_path}?{query}"),
    };

    let mut builder = Uri::builder();
    if let Some(scheme) = base_uri.scheme() {
        builder = builder.scheme(scheme.clone());
    }
    if let Some(authority) = base_uri.authority() {
        builder = builder.authority(authority.clone());
    }
    builder.path_and_query(path_and_query).build()
}

pub fn is_absolute(uri: &Uri) -> bool {
    uri.scheme().is_some() && uri.authority().is_some()
}
