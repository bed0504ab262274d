use anyhow::Result;
use clap::Parser;

/// depbump - bump one dependency of a hosted repository
///
/// Reads the manifest on the main branch, rewrites the version of one
/// package and opens a pull request with the change.
///
/// Everything else is configured through the environment:
///   HOST_TOKEN, WORKSPACE_NAME, REPOSITORY_NAME, TARGET_BRANCH,
///   PACKAGE_NAME, PACKAGE_VERSION (required)
///   PACKAGE_JSON_PATH, UPDATE_BRANCH, COMMIT_AUTHOR, COMMIT_MESSAGE,
///   PR_TITLE, MANIFEST_FORMAT (optional)
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Hosting service API URL (defaults to https://api.bitbucket.org/2.0)
    #[arg(long = "api-url", env = "HOST_API_URL", value_name = "URL")]
    pub api_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    let runtime = depbump::runtime::RealRuntime;

    let outcome = depbump::run(&runtime, cli.api_url).await?;
    println!("{}", outcome);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_cli_api_url_parsing() {
        let cli = Cli::try_parse_from(["depbump", "--api-url", "http://localhost:1234"]).unwrap();
        assert_eq!(cli.api_url, Some("http://localhost:1234".to_string()));
    }

    #[test]
    fn test_cli_rejects_positional_arguments() {
        assert!(Cli::try_parse_from(["depbump", "acme/portal"]).is_err());
    }
}
