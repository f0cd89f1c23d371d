pub mod gitlab;

pub use gitlab::GitlabClient;
