mod client;

pub use client::GitHubRestClient;
