use std::time::Duration;

use anyhow::{Result, bail};
use clap::{ArgMatches, CommandFactory, FromArgMatches, parser::ValueSource};
use offliner_core::{HttpClient, RepositoryLocation, RetryPolicy, RunConfig};
use url::Url;

use crate::app_config::FileConfig;
use crate::cli::Args;

/// Which arguments were given explicitly on the command line.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct CliValueSources {
    pub(crate) downloads: bool,
    pub(crate) repositories: bool,
    pub(crate) threads: bool,
    pub(crate) max_attempts: bool,
    pub(crate) backoff_ms: bool,
    pub(crate) timeout_secs: bool,
    pub(crate) connect_timeout_secs: bool,
    pub(crate) checksums: bool,
    pub(crate) verbose: bool,
    pub(crate) quiet: bool,
}

pub(crate) fn parse_cli_with_sources() -> (Args, CliValueSources) {
    let matches = Args::command().get_matches();
    let args = Args::from_arg_matches(&matches).unwrap_or_else(|err| err.exit());
    let sources = sources_from_matches(&matches);
    (args, sources)
}

fn sources_from_matches(matches: &ArgMatches) -> CliValueSources {
    CliValueSources {
        downloads: is_commandline_value(matches, "downloads"),
        repositories: is_commandline_value(matches, "repositories"),
        threads: is_commandline_value(matches, "threads"),
        max_attempts: is_commandline_value(matches, "max_attempts"),
        backoff_ms: is_commandline_value(matches, "backoff_ms"),
        timeout_secs: is_commandline_value(matches, "timeout_secs"),
        connect_timeout_secs: is_commandline_value(matches, "connect_timeout_secs"),
        checksums: is_commandline_value(matches, "checksums"),
        verbose: is_commandline_value(matches, "verbose"),
        quiet: is_commandline_value(matches, "quiet"),
    }
}

fn is_commandline_value(matches: &ArgMatches, id: &str) -> bool {
    matches.value_source(id) == Some(ValueSource::CommandLine)
}

/// Fills every argument not given on the command line from the file config.
pub(crate) fn apply_config_defaults(
    mut args: Args,
    cli_sources: &CliValueSources,
    file_config: Option<&FileConfig>,
) -> Args {
    let Some(file_config) = file_config else {
        return args;
    };

    if !cli_sources.downloads
        && let Some(downloads) = &file_config.downloads
    {
        args.downloads = downloads.clone();
    }
    if !cli_sources.repositories
        && let Some(repositories) = &file_config.repositories
    {
        args.repositories = repositories.clone();
    }
    if !cli_sources.threads
        && let Some(threads) = file_config.threads
    {
        args.threads = threads;
    }
    if !cli_sources.max_attempts
        && let Some(max_attempts) = file_config.max_attempts
    {
        args.max_attempts = max_attempts;
    }
    if !cli_sources.backoff_ms
        && let Some(backoff_ms) = file_config.backoff_ms
    {
        args.backoff_ms = backoff_ms;
    }
    if !cli_sources.timeout_secs
        && let Some(timeout_secs) = file_config.timeout_secs
    {
        args.timeout_secs = timeout_secs;
    }
    if !cli_sources.connect_timeout_secs
        && let Some(connect_timeout_secs) = file_config.connect_timeout_secs
    {
        args.connect_timeout_secs = connect_timeout_secs;
    }
    if !cli_sources.checksums
        && let Some(checksums) = &file_config.checksums
    {
        args.checksums = checksums.clone();
    }
    args
}

pub(crate) fn resolve_default_log_level(args: &Args) -> &'static str {
    if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

pub(crate) fn should_force_cli_log_level(cli_sources: &CliValueSources) -> bool {
    cli_sources.verbose || cli_sources.quiet
}

/// Parses the `[id=]url` default repository entries.
pub(crate) fn parse_default_repositories(entries: &[String]) -> Result<Vec<RepositoryLocation>> {
    let mut repositories = Vec::with_capacity(entries.len());
    for (index, entry) in entries.iter().enumerate() {
        let rank = u32::try_from(index).unwrap_or(u32::MAX);
        let location = RepositoryLocation::parse_entry(entry, &format!("default-{index}"), rank);
        let parsed = match Url::parse(location.base_uri()) {
            Ok(url) => url,
            Err(e) => bail!("Invalid repository '{entry}': {e}"),
        };
        if !matches!(parsed.scheme(), "http" | "https") {
            bail!(
                "Invalid repository '{entry}': unsupported scheme '{}'",
                parsed.scheme()
            );
        }
        repositories.push(location);
    }
    Ok(repositories)
}

/// Builds the library run configuration from resolved arguments.
pub(crate) fn build_run_config(args: &Args) -> Result<RunConfig> {
    let mut config = RunConfig::new(args.downloads.clone(), args.locations.clone());
    config.concurrency = usize::from(args.threads);
    config.retry_policy = RetryPolicy::with_max_attempts(u32::from(args.max_attempts))
        .with_base_delay(Duration::from_millis(args.backoff_ms));
    config.attempt_timeout = Duration::from_secs(args.timeout_secs);
    config.default_repositories = parse_default_repositories(&args.repositories)?;
    if !args.checksums.is_empty() {
        config.checksum_kinds.clone_from(&args.checksums);
    }
    Ok(config)
}

pub(crate) fn build_http_client(args: &Args) -> HttpClient {
    HttpClient::new_with_timeouts(args.connect_timeout_secs, args.timeout_secs)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::path::PathBuf;

    use offliner_core::ChecksumKind;

    use super::*;

    fn parse(argv: &[&str]) -> (Args, CliValueSources) {
        let matches = Args::command().try_get_matches_from(argv).unwrap();
        let args = Args::from_arg_matches(&matches).unwrap();
        (args, sources_from_matches(&matches))
    }

    fn file_config() -> FileConfig {
        FileConfig {
            downloads: Some(PathBuf::from("/srv/mirror")),
            threads: Some(4),
            max_attempts: Some(5),
            backoff_ms: Some(10),
            repositories: Some(vec!["central=https://repo.example.org/".to_string()]),
            checksums: Some(vec![ChecksumKind::Sha256]),
            ..FileConfig::default()
        }
    }

    #[test]
    fn test_file_config_fills_defaulted_values() {
        let (args, sources) = parse(&["offliner"]);
        let args = apply_config_defaults(args, &sources, Some(&file_config()));
        assert_eq!(args.downloads, PathBuf::from("/srv/mirror"));
        assert_eq!(args.threads, 4);
        assert_eq!(args.max_attempts, 5);
        assert_eq!(args.backoff_ms, 10);
        assert_eq!(args.repositories.len(), 1);
        assert_eq!(args.checksums, vec![ChecksumKind::Sha256]);
        assert_eq!(args.timeout_secs, 300);
    }

    #[test]
    fn test_commandline_values_beat_file_config() {
        let (args, sources) = parse(&["offliner", "-t", "10", "-d", "here", "--checksum", "md5"]);
        assert!(sources.threads);
        let args = apply_config_defaults(args, &sources, Some(&file_config()));
        assert_eq!(args.threads, 10);
        assert_eq!(args.downloads, PathBuf::from("here"));
        assert_eq!(args.checksums, vec![ChecksumKind::Md5]);
        assert_eq!(args.max_attempts, 5);
    }

    #[test]
    fn test_no_file_config_keeps_args() {
        let (args, sources) = parse(&["offliner", "-t", "7"]);
        let args = apply_config_defaults(args, &sources, None);
        assert_eq!(args.threads, 7);
        assert_eq!(args.downloads, PathBuf::from("downloads"));
    }

    #[test]
    fn test_log_level_from_flags() {
        assert_eq!(resolve_default_log_level(&parse(&["offliner"]).0), "info");
        assert_eq!(resolve_default_log_level(&parse(&["offliner", "-v"]).0), "debug");
        assert_eq!(resolve_default_log_level(&parse(&["offliner", "-vvv"]).0), "trace");
        assert_eq!(resolve_default_log_level(&parse(&["offliner", "-q"]).0), "error");
    }

    #[test]
    fn test_force_cli_log_level_only_when_flag_given() {
        assert!(!should_force_cli_log_level(&parse(&["offliner"]).1));
        assert!(should_force_cli_log_level(&parse(&["offliner", "-q"]).1));
    }

    #[test]
    fn test_build_run_config_maps_arguments() {
        let (args, _) = parse(&[
            "offliner",
            "deps.txt",
            "-d",
            "mirror",
            "-t",
            "3",
            "--max-attempts",
            "2",
            "--backoff-ms",
            "0",
            "--timeout-secs",
            "9",
            "-r",
            "https://repo.example.org/maven2",
        ]);
        let config = build_run_config(&args).unwrap();
        assert_eq!(config.mirror_dir, PathBuf::from("mirror"));
        assert_eq!(config.locations, vec![PathBuf::from("deps.txt")]);
        assert_eq!(config.concurrency, 3);
        assert_eq!(config.retry_policy.max_attempts(), 2);
        assert_eq!(config.retry_policy.base_delay(), Duration::ZERO);
        assert_eq!(config.attempt_timeout, Duration::from_secs(9));
        assert_eq!(config.default_repositories.len(), 1);
        assert_eq!(config.default_repositories[0].id(), "default-0");
        assert_eq!(
            config.checksum_kinds,
            vec![ChecksumKind::Md5, ChecksumKind::Sha1]
        );
    }

    #[test]
    fn test_repository_ids_parse_entry() {
        let repos = parse_default_repositories(&[
            "central=https://repo.example.org/maven2".to_string(),
            "http://mirror.example.org".to_string(),
        ])
        .unwrap();
        assert_eq!(repos[0].id(), "central");
        assert_eq!(repos[0].base_uri(), "https://repo.example.org/maven2/");
        assert_eq!(repos[1].id(), "default-1");
    }

    #[test]
    fn test_invalid_repository_rejected() {
        let err = parse_default_repositories(&["not a url".to_string()]).unwrap_err();
        assert!(err.to_string().contains("not a url"));

        let err = parse_default_repositories(&["ftp://repo.example.org/".to_string()]).unwrap_err();
        assert!(err.to_string().contains("ftp"));
    }
}
