//! Demo of svcwrap-generated wrappers.
//!
//! `build.rs` generates one `*DslExtensions` trait per `#[remote_service]`
//! trait in [`api`]; the units are included next to the traits they wrap.

pub mod api;
pub mod models;

use std::sync::Arc;
use svcwrap::{service_dsl, ServiceClient, ServiceDsl};

pub use api::{ExampleService, ExampleServiceDslExtensions, GithubService, GithubServiceDslExtensions};

/// A DSL with `github` bound, reporting busy state to `busy`
pub fn github_dsl<F>(github: Arc<dyn GithubService>, busy: F) -> ServiceDsl
where
    F: Fn(bool) + Send + Sync + 'static,
{
    let dsl = ServiceDsl::new().with_busy_sink(busy);
    bind(&dsl, ServiceClient::builder().bind::<dyn GithubService>(github).build());
    dsl
}

/// Fetch `owner/repo` and render the outcome as the text a view would show
pub fn describe_repo<F>(dsl: &ServiceDsl, owner: &str, repo: &str, show: F)
where
    F: Fn(String) + Send + Sync + 'static,
{
    let show = Arc::new(show);
    let on_fail = Arc::clone(&show);
    dsl.get_repo(owner.to_string(), repo.to_string(), move |result| {
        result
            .on_success(move |repo| show(repo.to_string()))
            .on_fail(move |error| on_fail(error.to_string()));
    });
}

/// Build the context the way an application would at startup
pub fn app_dsl(client: ServiceClient) -> ServiceDsl {
    service_dsl(|dsl| bind(dsl, client))
}

fn bind(dsl: &ServiceDsl, client: ServiceClient) {
    if let Err(err) = dsl.client(client) {
        tracing::warn!(%err, "Service client was already bound");
    }
}
