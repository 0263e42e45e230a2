//! Working out where to send a user after they log in.

use axum::{extract::Request, http::Uri};

use crate::endpoints;

/// Only local paths are followed, and never back to the log-in or log-out routes.
fn is_safe_redirect_path(path_and_query: &str) -> bool {
    if !path_and_query.starts_with('/') || path_and_query.starts_with("//") {
        return false;
    }

    let path = path_and_query
        .split_once('?')
        .map_or(path_and_query, |(path, _)| path);

    path != endpoints::LOG_IN_VIEW && path != endpoints::LOG_OUT
}

/// The path and query of `raw_url` if it is safe to redirect to.
///
/// With `allow_origin`, absolute URLs such as the `HX-Current-URL` header
/// are accepted and reduced to their path.
fn local_path(raw_url: &str, allow_origin: bool) -> Option<String> {
    let uri = raw_url.parse::<Uri>().ok()?;
    if !allow_origin && (uri.scheme().is_some() || uri.authority().is_some()) {
        return None;
    }
    let path_and_query = uri.path_and_query()?.as_str();

    is_safe_redirect_path(path_and_query).then(|| path_and_query.to_owned())
}

/// Check a `redirect_url` supplied by the client, logging and discarding unsafe ones.
pub fn parse_redirect_url(raw_url: Option<&str>, source: &str) -> Option<String> {
    let raw_url = raw_url?;
    let redirect_url = local_path(raw_url, false);

    if redirect_url.is_none() {
        tracing::warn!("Invalid redirect URL from {source}: {raw_url}");
    }

    redirect_url
}

/// The log-in page URL with a `redirect_url` pointing back at `target`.
pub fn log_in_url_with_redirect(target: &str) -> String {
    match serde_urlencoded::to_string([("redirect_url", target)]) {
        Ok(query) => format!("{}?{}", endpoints::LOG_IN_VIEW, query),
        Err(error) => {
            tracing::error!("Could not encode redirect URL {target}: {error}");
            endpoints::LOG_IN_VIEW.to_owned()
        }
    }
}

/// The log-in page URL for a request that has no valid session.
///
/// Pages redirect back to themselves. Requests under `/api` come from htmx,
/// so they redirect back to the page named in `HX-Current-URL`. The
/// dashboard is used when neither is usable.
pub fn log_in_url_for(request: &Request) -> String {
    let target = if request.uri().path().starts_with("/api") {
        target_from_hx_request(request)
    } else {
        request
            .uri()
            .path_and_query()
            .and_then(|path| local_path(path.as_str(), false))
    };

    let target = target.unwrap_or_else(|| {
        tracing::warn!(
            "No usable redirect target for {}, falling back to dashboard.",
            request.uri().path()
        );
        endpoints::DASHBOARD_VIEW.to_owned()
    });

    log_in_url_with_redirect(&target)
}

fn target_from_hx_request(request: &Request) -> Option<String> {
    let headers = request.headers();
    let is_hx_request = headers
        .get("hx-request")
        .and_then(|header| header.to_str().ok())
        .is_some_and(|header| header.eq_ignore_ascii_case("true"));

    if !is_hx_request {
        tracing::warn!("Missing HX-Request header for /api request.");
        return None;
    }

    let Some(current_url) = headers
        .get("hx-current-url")
        .and_then(|header| header.to_str().ok())
    else {
        tracing::warn!("Missing HX-Current-URL header for /api request.");
        return None;
    };

    let target = local_path(current_url, true);
    if target.is_none() {
        tracing::warn!("Invalid HX-Current-URL header value: {current_url}");
    }

    target
}

#[cfg(test)]
mod tests {
    use axum::{body::Body, http::Request};

    use crate::endpoints;

    use super::{log_in_url_for, log_in_url_with_redirect, parse_redirect_url};

    #[test]
    fn accepts_local_paths_with_query() {
        assert_eq!(
            parse_redirect_url(Some("/dashboard?refresh=true"), "test"),
            Some("/dashboard?refresh=true".to_owned())
        );
    }

    #[test]
    fn rejects_external_and_looping_urls() {
        for url in [
            "https://evil.example.com/dashboard",
            "//evil.example.com",
            "dashboard",
            endpoints::LOG_IN_VIEW,
            endpoints::LOG_OUT,
        ] {
            assert_eq!(parse_redirect_url(Some(url), "test"), None, "{url}");
        }
    }

    #[test]
    fn page_request_redirects_back_to_itself() {
        let request = Request::get("/transactions/new").body(Body::empty()).unwrap();

        assert_eq!(
            log_in_url_for(&request),
            "/log_in?redirect_url=%2Ftransactions%2Fnew"
        );
    }

    #[test]
    fn api_request_redirects_to_current_page() {
        let request = Request::get(endpoints::TRANSACTIONS_TABLE)
            .header("HX-Request", "true")
            .header("HX-Current-URL", "http://localhost:3000/dashboard?name=cof")
            .body(Body::empty())
            .unwrap();

        assert_eq!(
            log_in_url_for(&request),
            log_in_url_with_redirect("/dashboard?name=cof")
        );
    }

    #[test]
    fn api_request_without_htmx_headers_falls_back_to_dashboard() {
        let request = Request::delete("/api/transactions/1")
            .body(Body::empty())
            .unwrap();

        assert_eq!(
            log_in_url_for(&request),
            log_in_url_with_redirect(endpoints::DASHBOARD_VIEW)
        );
    }
}
