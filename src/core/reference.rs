//! Install reference parsing.
//!
//! Accepts `alias`, `owner/repo`, and `provider/owner/repo`, each with an
//! optional `@version`. `github.com/...`-style hosts are accepted as
//! provider prefixes.

use thiserror::Error;

use crate::VERSION_LATEST;

#[derive(Debug, Error, PartialEq)]
pub enum ReferenceError {
    #[error("invalid install source, expected format of owner/repo or owner/repo@version")]
    Invalid(String),

    #[error("unknown provider: {0}")]
    UnknownProvider(String),
}

/// Release source provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Github,
    Gitlab,
    Homebrew,
    Hashicorp,
    Kubernetes,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Github => "github",
            Provider::Gitlab => "gitlab",
            Provider::Homebrew => "homebrew",
            Provider::Hashicorp => "hashicorp",
            Provider::Kubernetes => "kubernetes",
        }
    }

    fn from_token(token: &str) -> Option<Self> {
        // `github` and `github.com` both name the provider.
        if token.starts_with("github") {
            return Some(Provider::Github);
        }
        if token.starts_with("gitlab") {
            return Some(Provider::Gitlab);
        }
        match token {
            "homebrew" => Some(Provider::Homebrew),
            "hashicorp" => Some(Provider::Hashicorp),
            "kubernetes" => Some(Provider::Kubernetes),
            _ => None,
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed install reference.
#[derive(Debug, Clone, PartialEq)]
pub struct Reference {
    pub provider: Provider,
    pub owner: String,
    pub repo: String,
    pub version: String,
}

impl Reference {
    /// Parse a raw reference. `default_provider` decides single- and
    /// two-component references that do not name a provider.
    pub fn parse(raw: &str, default_provider: Provider) -> Result<Self, ReferenceError> {
        if raw.trim().is_empty() {
            return Err(ReferenceError::Invalid(raw.to_string()));
        }

        let (path, version) = match raw.split_once('@') {
            Some((path, version)) if !version.is_empty() => (path, version.to_string()),
            Some((_, _)) => return Err(ReferenceError::Invalid(raw.to_string())),
            None => (raw, VERSION_LATEST.to_string()),
        };

        let parts: Vec<&str> = path.split('/').filter(|p| !p.is_empty()).collect();

        match parts.as_slice() {
            [] => Err(ReferenceError::Invalid(raw.to_string())),
            [name] => Ok(Self {
                provider: default_provider,
                owner: name.to_string(),
                repo: name.to_string(),
                version,
            }),
            [first, second] => match Provider::from_token(first) {
                // Single-name providers: `homebrew/jq`, `hashicorp/terraform`.
                Some(p @ (Provider::Homebrew | Provider::Hashicorp | Provider::Kubernetes)) => {
                    Ok(Self {
                        provider: p,
                        owner: second.to_string(),
                        repo: second.to_string(),
                        version,
                    })
                }
                _ => Ok(Self {
                    provider: default_provider,
                    owner: first.to_string(),
                    repo: second.to_string(),
                    version,
                }),
            },
            [first, owner, repo] => {
                let provider = Provider::from_token(first)
                    .ok_or_else(|| ReferenceError::UnknownProvider(first.to_string()))?;
                Ok(Self {
                    provider,
                    owner: owner.to_string(),
                    repo: repo.to_string(),
                    version,
                })
            }
            _ => Err(ReferenceError::Invalid(raw.to_string())),
        }
    }

    /// The `owner/repo` display form.
    pub fn app(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }

    pub fn is_latest(&self) -> bool {
        self.version == VERSION_LATEST
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owner_repo_defaults_to_github() {
        let r = Reference::parse("ekristen/aws-nuke", Provider::Github).unwrap();
        assert_eq!(r.provider, Provider::Github);
        assert_eq!(r.owner, "ekristen");
        assert_eq!(r.repo, "aws-nuke");
        assert_eq!(r.version, "latest");
    }

    #[test]
    fn version_suffix() {
        let r = Reference::parse("ekristen/aws-nuke@3.1.1", Provider::Github).unwrap();
        assert_eq!(r.version, "3.1.1");
        assert!(!r.is_latest());
    }

    #[test]
    fn provider_prefix() {
        let r = Reference::parse("github/ekristen/aws-nuke", Provider::Github).unwrap();
        assert_eq!(r.provider, Provider::Github);
        assert_eq!(r.owner, "ekristen");

        let r = Reference::parse("github.com/ekristen/aws-nuke@3.1.1", Provider::Github).unwrap();
        assert_eq!(r.provider, Provider::Github);
        assert_eq!(r.version, "3.1.1");

        let r = Reference::parse("gitlab/gitlab-org/gitlab-runner", Provider::Github).unwrap();
        assert_eq!(r.provider, Provider::Gitlab);
        assert_eq!(r.owner, "gitlab-org");
    }

    #[test]
    fn single_name_providers() {
        let r = Reference::parse("homebrew/jq", Provider::Github).unwrap();
        assert_eq!(r.provider, Provider::Homebrew);
        assert_eq!(r.owner, "jq");
        assert_eq!(r.repo, "jq");

        let r = Reference::parse("hashicorp/terraform@1.9.0", Provider::Github).unwrap();
        assert_eq!(r.provider, Provider::Hashicorp);
        assert_eq!(r.repo, "terraform");

        let r = Reference::parse("kubernetes/kubectl", Provider::Github).unwrap();
        assert_eq!(r.provider, Provider::Kubernetes);
        assert_eq!(r.repo, "kubectl");
    }

    #[test]
    fn single_component_uses_default_provider() {
        let r = Reference::parse("jq", Provider::Homebrew).unwrap();
        assert_eq!(r.provider, Provider::Homebrew);
        assert_eq!(r.repo, "jq");
    }

    #[test]
    fn invalid_references() {
        assert!(Reference::parse("", Provider::Github).is_err());
        assert!(Reference::parse("a/b@", Provider::Github).is_err());
        assert!(Reference::parse("a/b/c/d", Provider::Github).is_err());
        assert!(matches!(
            Reference::parse("sourceforge/a/b", Provider::Github),
            Err(ReferenceError::UnknownProvider(_))
        ));
    }
}
