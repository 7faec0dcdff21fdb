use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: u64,
    pub login: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GithubRepo {
    pub id: u64,
    pub name: String,
    pub full_name: Option<String>,
    pub description: Option<String>,
    pub open_issues_count: u32,
    pub stargazers_count: u32,
    pub owner: User,
}

impl fmt::Display for GithubRepo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({} stars)",
            self.full_name.as_deref().unwrap_or(&self.name),
            self.stargazers_count
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Item(pub u32);
