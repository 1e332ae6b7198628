//! Calls into the transaction coordinator.
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use std::error::Error as _;
use std::io;
use std::sync::Arc;
use surge_core::CallReport;

pub type Call = BoxFuture<'static, CallReport>;

/// Target that sends `POST {base_url}/process` for every call.
pub fn coordinator_target(
    client: reqwest::Client,
    base_url: &str,
) -> impl Fn() -> Call + Clone + Send + Sync + 'static {
    let url: Arc<str> = format!("{}/process", base_url.trim_end_matches('/')).into();
    move || {
        let client = client.clone();
        let url = url.clone();
        async move { post_process(&client, &url).await }.boxed()
    }
}

async fn post_process(client: &reqwest::Client, url: &str) -> CallReport {
    let res = match client.post(url).send().await {
        Ok(res) => res,
        Err(err) => return CallReport::failed(0, describe(&err)),
    };

    let status = res.status();
    match res.text().await {
        Ok(_) if status.is_success() => CallReport::status(status.as_u16()),
        Ok(body) if body.is_empty() => CallReport::failed(status.as_u16(), status.to_string()),
        Ok(body) => CallReport::failed(status.as_u16(), body),
        Err(err) => CallReport::failed(status.as_u16(), describe(&err)),
    }
}

/// Flatten a client error and its sources into one line, prefixed with the
/// failure class when the client can tell what happened.
fn describe(err: &reqwest::Error) -> String {
    let mut message = err.to_string();
    let mut refused = false;

    let mut source = err.source();
    while let Some(inner) = source {
        if let Some(io_err) = inner.downcast_ref::<io::Error>() {
            refused |= io_err.kind() == io::ErrorKind::ConnectionRefused;
        }
        let text = inner.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = inner.source();
    }

    if err.is_timeout() {
        format!("timeout: {message}")
    } else if refused {
        format!("connection refused: {message}")
    } else {
        message
    }
}
