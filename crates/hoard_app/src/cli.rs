use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Parser;
use hoard_core::HarvestConfig;
use hoard_engine::{AjaxGallerySite, SiteApi, Target};
use hoard_logging::LogDestination;
use log::LevelFilter;
use url::Url;

#[derive(Debug, Parser)]
#[command(
    name = "hoard",
    about = "Discover every item of a gallery and download the originals",
    version
)]
pub struct Cli {
    /// What to harvest, processed in order: a numeric user id, a
    /// `/users/{id}` URL, an `/artworks/{id}` URL, or any page linking to items.
    #[arg(required = true, num_args = 1..)]
    pub targets: Vec<String>,

    /// RON configuration file. Defaults apply when omitted.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Site origin, e.g. a mirror or a local test server.
    #[arg(long)]
    pub origin: Option<String>,

    /// JSON array of browser cookies (`name`, `value`, `domain`, `path`).
    #[arg(long)]
    pub cookies: Option<PathBuf>,

    /// Output root; overrides the configuration file.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Also write the log to this file.
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Log at debug level.
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    pub fn log_destination(&self) -> LogDestination {
        match &self.log_file {
            Some(path) => LogDestination::Both(path.clone()),
            None => LogDestination::Terminal,
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        if self.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        }
    }

    pub fn site(&self) -> anyhow::Result<AjaxGallerySite> {
        match &self.origin {
            Some(origin) => {
                let origin =
                    Url::parse(origin).with_context(|| format!("invalid origin {origin}"))?;
                Ok(AjaxGallerySite::with_origin(origin))
            }
            None => Ok(AjaxGallerySite::default()),
        }
    }

    /// Every positional input classified, or an error naming the ones the
    /// site cannot harvest.
    pub fn parsed_targets(&self, site: &dyn SiteApi) -> anyhow::Result<Vec<Target>> {
        let mut targets = Vec::with_capacity(self.targets.len());
        let mut rejected = Vec::new();
        for input in &self.targets {
            match site.parse_target(input) {
                Some(target) => targets.push(target),
                None => rejected.push(input.as_str()),
            }
        }
        if !rejected.is_empty() {
            bail!("not a gallery, item or page: {}", rejected.join(", "));
        }
        Ok(targets)
    }

    /// Configuration file (or defaults) with command-line overrides applied.
    pub fn harvest_config(&self) -> anyhow::Result<HarvestConfig> {
        let mut config = match &self.config {
            Some(path) => HarvestConfig::load(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => HarvestConfig::default(),
        };
        if let Some(output) = &self.output {
            config.output_root = output.clone();
        }
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use hoard_core::{ItemId, StrategyName};

    #[test]
    fn output_flag_overrides_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("hoard.ron");
        std::fs::write(
            &config_path,
            "(strategies: [bulk_listing], output_root: \"from-file\", concurrency: 1)",
        )
        .unwrap();

        let cli = Cli::parse_from([
            "hoard",
            "123",
            "--config",
            config_path.to_str().unwrap(),
            "--output",
            "from-flag",
        ]);
        let config = cli.harvest_config().unwrap();

        assert_eq!(config.output_root, PathBuf::from("from-flag"));
        assert_eq!(config.strategies, BTreeSet::from([StrategyName::BulkListing]));
        assert_eq!(config.concurrency, 1);
    }

    #[test]
    fn defaults_without_config_file() {
        let cli = Cli::parse_from(["hoard", "https://www.pixiv.net/users/123"]);

        assert_eq!(cli.harvest_config().unwrap(), HarvestConfig::default());
        assert_eq!(cli.log_destination(), LogDestination::Terminal);
        assert_eq!(cli.log_level(), LevelFilter::Info);
    }

    #[test]
    fn log_file_also_logs_to_terminal() {
        let cli = Cli::parse_from(["hoard", "1", "--log-file", "run.log", "-v"]);

        assert_eq!(cli.log_destination(), LogDestination::Both("run.log".into()));
        assert_eq!(cli.log_level(), LevelFilter::Debug);
    }

    #[test]
    fn several_targets_of_every_kind() {
        let cli = Cli::parse_from([
            "hoard",
            "123",
            "https://www.pixiv.net/en/users/7/illustrations",
            "https://www.pixiv.net/en/artworks/99?ref=x",
            "https://www.pixiv.net/bookmark_new_illust.php",
        ]);
        let site = cli.site().unwrap();

        assert_eq!(
            cli.parsed_targets(&site).unwrap(),
            vec![
                Target::Gallery("123".into()),
                Target::Gallery("7".into()),
                Target::Item(ItemId::from("99")),
                Target::Page("https://www.pixiv.net/bookmark_new_illust.php".into()),
            ]
        );
    }

    #[test]
    fn unrecognised_targets_are_all_reported() {
        let cli = Cli::parse_from(["hoard", "123", "someone", "ftp://x.test/a"]);
        let site = cli.site().unwrap();

        let err = cli.parsed_targets(&site).unwrap_err().to_string();

        assert!(err.contains("someone"));
        assert!(err.contains("ftp://x.test/a"));
    }

    #[test]
    fn at_least_one_target_is_required() {
        assert!(Cli::try_parse_from(["hoard"]).is_err());
    }

    #[test]
    fn origin_flag_moves_the_site() {
        let cli = Cli::parse_from(["hoard", "--origin", "http://127.0.0.1:8080/", "1"]);
        let site = cli.site().unwrap();

        assert_eq!(site.gallery_url("1"), "http://127.0.0.1:8080/users/1/artworks");
        assert!(Cli::parse_from(["hoard", "--origin", "not a url", "1"]).site().is_err());
    }

    #[test]
    fn broken_config_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("hoard.ron");
        std::fs::write(&config_path, "(max_retries: \"many\")").unwrap();

        let cli = Cli::parse_from(["hoard", "1", "--config", config_path.to_str().unwrap()]);

        assert!(cli.harvest_config().is_err());
    }
}
