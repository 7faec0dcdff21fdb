//! Service traits. Their wrappers are generated by `build.rs`.

use crate::models::{GithubRepo, Item};
use svcwrap::{remote_service, Call, Response};

#[remote_service]
pub trait GithubService: Send + Sync {
    /// `GET /repos/{owner}/{repo}`
    fn get_repo(&self, owner: String, repo: String) -> Call<GithubRepo>;
}

/// One operation per result shape
#[remote_service]
#[async_trait::async_trait]
pub trait ExampleService: Send + Sync {
    fn fetch(&self, id: String) -> Call<Item>;

    fn fetch_now(&self, id: String) -> Response<Item>;

    fn fetch_bare(&self) -> Item;

    async fn fetch_later(&self, id: u32) -> Item;

    /// Default methods are not operations
    fn describe(&self) -> String {
        "example".to_string()
    }
}

svcwrap::include_dsl!("api/github_service_dsl_extensions.rs");
svcwrap::include_dsl!("api/example_service_dsl_extensions.rs");
