use std::process::Command;

pub fn get_current_repo() -> Option<(String, String)> {
    let output = Command::new("git")
        .args(["remote", "get-url", "origin"])
        .output()
        .ok()?;

    if !output.status.success() {
        return None;
    }

    let url = String::from_utf8_lossy(&output.stdout).trim().to_string();
    parse_bitbucket_url(&url)
}

pub fn parse_bitbucket_url(url: &str) -> Option<(String, String)> {
    // Handle SSH: git@bitbucket.org:owner/repo.git
    if let Some(path) = url.strip_prefix("git@bitbucket.org:") {
        return split_owner_repo(path);
    }

    // Handle HTTPS, with or without a user: https://user@bitbucket.org/owner/repo.git
    // and ssh://git@bitbucket.org/owner/repo.git
    if url.contains("bitbucket.org") {
        let path = url.split("bitbucket.org").nth(1)?;
        let path = path.trim_start_matches(':').trim_start_matches('/');
        return split_owner_repo(path);
    }

    None
}

fn split_owner_repo(path: &str) -> Option<(String, String)> {
    let path = path.trim_end_matches('/');
    let path = path.strip_suffix(".git").unwrap_or(path);
    let mut parts = path.split('/');
    let owner = parts.next().filter(|s| !s.is_empty())?;
    let repo = parts.next().filter(|s| !s.is_empty())?;
    Some((owner.to_string(), repo.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(owner: &str, repo: &str) -> Option<(String, String)> {
        Some((owner.to_string(), repo.to_string()))
    }

    #[test]
    fn parses_remote_forms() {
        assert_eq!(parse_bitbucket_url("git@bitbucket.org:team/app.git"), pair("team", "app"));
        assert_eq!(
            parse_bitbucket_url("https://alice@bitbucket.org/team/app.git"),
            pair("team", "app")
        );
        assert_eq!(
            parse_bitbucket_url("ssh://git@bitbucket.org/team/app"),
            pair("team", "app")
        );
        assert_eq!(parse_bitbucket_url("https://bitbucket.org/team/app/"), pair("team", "app"));
    }

    #[test]
    fn rejects_other_hosts_and_short_paths() {
        assert_eq!(parse_bitbucket_url("git@github.com:team/app.git"), None);
        assert_eq!(parse_bitbucket_url("https://bitbucket.org/team"), None);
    }
}
