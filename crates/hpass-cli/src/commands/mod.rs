//! CLI commands and argument parsing.

pub mod log;
pub mod log_cos;
pub mod read;
pub mod setup;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use hpass_gdpr::{
    AuditOutcome, GdprLogger, RequestContext, TracingBackend, WriterBackend, AUDIT_COLLECTION,
};
use hpass_logging::{LogConfig, LoggingError, ENV_LOG_FORMAT, ENV_LOG_LEVEL};
use hpass_store::{
    CloudantClient, StoreAuth, StoreConfig, StoreError, ENV_IAM_KEY, ENV_IAM_URL, ENV_STORE_URL,
};
use tracing::warn;

/// hpass-gdpr - GDPR audit logging for the health-pass backend
#[derive(Parser)]
#[command(name = "hpass-gdpr")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Log level: trace, debug, info, warn, error (overrides `LOG_LEVEL`)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Log format: text, json (overrides `LOG_FORMAT`)
    #[arg(long, global = true)]
    pub log_format: Option<String>,

    #[command(flatten)]
    pub store: StoreArgs,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Builds the logging configuration.
    ///
    /// `--log-level` and `--log-format` take precedence over the environment
    /// read through `env`; an overridden variable is never parsed.
    pub fn log_config(
        &self,
        name: &str,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<LogConfig, LoggingError> {
        LogConfig::from_lookup(name, |key| match key {
            ENV_LOG_LEVEL => self.log_level.clone().or_else(|| env(key)),
            ENV_LOG_FORMAT => self.log_format.clone().or_else(|| env(key)),
            _ => env(key),
        })
    }
}

/// Available commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Connect to the document store and provision collections
    Setup(setup::SetupArgs),

    /// Audit an operation on a known subject
    Log(log::LogArgs),

    /// Audit an operation on a stored object, resolving its holder first
    LogCos(log_cos::LogCosArgs),

    /// Read a document
    Read(read::ReadArgs),

    /// Print version information
    Version,
}

impl Commands {
    /// Returns the transaction id given on the command line, if any.
    pub fn transaction_id(&self) -> Option<&str> {
        match self {
            Self::Log(args) => args.context.transaction_id.as_deref(),
            Self::LogCos(args) => args.context.transaction_id.as_deref(),
            _ => None,
        }
    }
}

/// Document store connection arguments.
#[derive(Args)]
pub struct StoreArgs {
    /// Document store URL
    #[arg(id = "store_url", long = "store-url", env = ENV_STORE_URL, global = true)]
    pub url: Option<String>,

    /// IAM API key for the document store
    #[arg(long, env = ENV_IAM_KEY, hide_env_values = true, global = true)]
    pub iam_key: Option<String>,

    /// IAM token endpoint
    #[arg(long, env = ENV_IAM_URL, global = true)]
    pub iam_url: Option<String>,

    /// Username for basic authentication (local CouchDB)
    #[arg(long, env = "COUCHDB_USER", global = true, requires = "password")]
    pub username: Option<String>,

    /// Password for basic authentication
    #[arg(
        long,
        env = "COUCHDB_PASSWORD",
        hide_env_values = true,
        global = true,
        requires = "username"
    )]
    pub password: Option<String>,

    /// Request timeout in seconds
    #[arg(long, default_value = "30", global = true)]
    pub timeout: u64,
}

impl StoreArgs {
    /// Builds the store configuration.
    ///
    /// Basic credentials take precedence; otherwise the URL and IAM key are
    /// both required.
    pub fn config(&self) -> Result<StoreConfig> {
        let config = match (&self.username, &self.password) {
            (Some(username), Some(password)) => {
                let url = self
                    .url
                    .clone()
                    .filter(|u| !u.is_empty())
                    .ok_or(StoreError::MissingConfig {
                        vars: vec![ENV_STORE_URL],
                    })?;
                StoreConfig::new(url).with_auth(StoreAuth::basic(username, password))
            }
            _ => StoreConfig::from_values(
                self.url.clone(),
                self.iam_key.clone(),
                self.iam_url.clone(),
            )?,
        };

        Ok(config.with_timeout(Duration::from_secs(self.timeout)))
    }

    /// Creates an unconnected client.
    pub fn client(&self) -> Result<Arc<CloudantClient>> {
        let client =
            CloudantClient::new(self.config()?).context("Failed to create document store client")?;
        Ok(Arc::new(client))
    }
}

/// Request context arguments shared by the audit commands.
#[derive(Args)]
pub struct ContextArgs {
    /// Transaction id of the audited request (generated when absent)
    #[arg(long)]
    pub transaction_id: Option<String>,

    /// IP address of the caller
    #[arg(long)]
    pub caller_ip: Option<String>,

    /// URL of the audited request
    #[arg(id = "request_url", long = "url")]
    pub url: Option<String>,
}

impl ContextArgs {
    /// Builds the request context, falling back to `correlation_id` for the
    /// transaction id.
    pub fn context(&self, correlation_id: &str) -> RequestContext {
        RequestContext {
            transaction_id: Some(
                self.transaction_id
                    .clone()
                    .unwrap_or_else(|| correlation_id.to_string()),
            ),
            caller_ip: self.caller_ip.clone(),
            request_url: self.url.clone(),
        }
    }
}

/// Where audit lines are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LineOutput {
    /// As structured events through the process logger
    Tracing,
    /// Flat JSON lines on standard output
    Stdout,
    /// Both destinations
    Both,
}

/// Arguments selecting where audit lines go.
#[derive(Args)]
pub struct RecorderArgs {
    /// Destination of the local audit line
    #[arg(long, value_enum, default_value = "stdout")]
    pub lines: LineOutput,
}

/// Connects the store and builds the recorder.
///
/// A store that cannot be set up disables auditing instead of failing the
/// command; the setup error has already been logged by the client.
pub async fn recorder(store: &StoreArgs, args: &RecorderArgs) -> Result<GdprLogger> {
    let client = store.client()?;
    let enabled = client.setup(AUDIT_COLLECTION).await.is_ok();
    if !enabled {
        warn!("Document store setup failed, auditing is disabled");
    }

    let mut builder = GdprLogger::builder(client).enabled(enabled);
    if matches!(args.lines, LineOutput::Tracing | LineOutput::Both) {
        builder = builder.with_sink(Arc::new(TracingBackend::new()));
    }
    if matches!(args.lines, LineOutput::Stdout | LineOutput::Both) {
        builder = builder.with_sink(Arc::new(WriterBackend::stdout()));
    }

    Ok(builder.build())
}

/// Prints the outcome of an audit call.
pub fn print_outcome(outcome: &AuditOutcome) {
    match outcome {
        AuditOutcome::Recorded => println!("Audit record written"),
        AuditOutcome::Disabled => println!("Auditing disabled, nothing recorded"),
        AuditOutcome::SubjectUnresolved { reason } => {
            println!("Subject unresolved, nothing recorded: {reason}");
        }
        AuditOutcome::PersistFailed { status, message } => match status {
            Some(status) => println!("Audit record rejected ({status}): {message}"),
            None => println!("Audit record not written: {message}"),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use hpass_gdpr::CrudOperation;

    fn store_args(url: Option<&str>, iam_key: Option<&str>) -> StoreArgs {
        StoreArgs {
            url: url.map(str::to_string),
            iam_key: iam_key.map(str::to_string),
            iam_url: None,
            username: None,
            password: None,
            timeout: 30,
        }
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_log_command() {
        let cli = Cli::try_parse_from([
            "hpass-gdpr",
            "log",
            "--subject",
            "subject-42",
            "--operation",
            "create",
            "--transaction-id",
            "T1",
            "--caller-ip",
            "1.2.3.4",
            "--url",
            "/x",
        ])
        .unwrap();

        assert_eq!(cli.command.transaction_id(), Some("T1"));
        let Commands::Log(args) = cli.command else {
            panic!("expected log command");
        };
        assert_eq!(args.operation, Some(CrudOperation::Create));
        assert_eq!(args.recorder.lines, LineOutput::Stdout);

        let context = args.context.context("generated");
        assert_eq!(context.transaction_id.as_deref(), Some("T1"));
        assert_eq!(context.caller_ip.as_deref(), Some("1.2.3.4"));
        assert_eq!(context.request_url.as_deref(), Some("/x"));
    }

    #[test]
    fn test_store_url_and_request_url_are_separate() {
        for args in [
            [
                "hpass-gdpr",
                "--store-url",
                "https://acct.cloudant.com",
                "log",
                "--subject",
                "s",
                "--operation",
                "read",
                "--url",
                "/x",
            ],
            [
                "hpass-gdpr",
                "log",
                "--subject",
                "s",
                "--operation",
                "read",
                "--url",
                "/x",
                "--store-url",
                "https://acct.cloudant.com",
            ],
        ] {
            let cli = Cli::try_parse_from(args).unwrap();
            assert_eq!(cli.store.url.as_deref(), Some("https://acct.cloudant.com"));

            let Commands::Log(log) = cli.command else {
                panic!("expected log command");
            };
            assert_eq!(log.context.url.as_deref(), Some("/x"));
        }
    }

    #[test]
    fn test_basic_credentials_require_each_other() {
        let password_only = Cli::try_parse_from([
            "hpass-gdpr",
            "--password",
            "secret",
            "read",
            "--collection",
            "c",
            "--id",
            "d",
        ]);
        assert!(password_only.is_err());

        let username_only = Cli::try_parse_from([
            "hpass-gdpr",
            "--username",
            "admin",
            "read",
            "--collection",
            "c",
            "--id",
            "d",
        ]);
        assert!(username_only.is_err());
    }

    #[test]
    fn test_cli_log_options_override_environment() {
        let env = |key: &str| match key {
            ENV_LOG_LEVEL => Some("loud".to_string()),
            ENV_LOG_FORMAT => Some("xml".to_string()),
            _ => None,
        };

        let plain = Cli::try_parse_from(["hpass-gdpr", "version"]).unwrap();
        assert!(plain.log_config("hpass-gdpr", env).is_err());

        let cli = Cli::try_parse_from([
            "hpass-gdpr",
            "--log-level",
            "debug",
            "--log-format",
            "json",
            "version",
        ])
        .unwrap();
        let config = cli.log_config("hpass-gdpr", env).unwrap();
        assert_eq!(config.level, hpass_logging::LogLevel::Debug);
        assert_eq!(config.format, hpass_logging::LogFormat::Json);
        assert_eq!(config.name, "hpass-gdpr");
    }

    #[test]
    fn test_log_requires_operation_or_message() {
        assert!(Cli::try_parse_from(["hpass-gdpr", "log", "--subject", "s"]).is_err());
        assert!(Cli::try_parse_from([
            "hpass-gdpr",
            "log",
            "--subject",
            "s",
            "--operation",
            "read",
            "--message",
            "exported",
        ])
        .is_err());
        assert!(
            Cli::try_parse_from(["hpass-gdpr", "log", "--subject", "s", "--message", "exported"])
                .is_ok()
        );
    }

    #[test]
    fn test_parse_log_cos_command() {
        let cli = Cli::try_parse_from([
            "hpass-gdpr",
            "log-cos",
            "--key",
            "file.json",
            "--entity",
            "entityA",
            "--operation",
            "READ",
            "--lines",
            "both",
        ])
        .unwrap();

        assert_eq!(cli.command.transaction_id(), None);
        let Commands::LogCos(args) = cli.command else {
            panic!("expected log-cos command");
        };
        assert_eq!(args.operation, CrudOperation::Read);
        assert_eq!(args.recorder.lines, LineOutput::Both);
    }

    #[test]
    fn test_context_falls_back_to_correlation_id() {
        let args = ContextArgs {
            transaction_id: None,
            caller_ip: None,
            url: None,
        };
        let context = args.context("corr-1");
        assert_eq!(context.transaction_id.as_deref(), Some("corr-1"));
        assert!(context.caller_ip.is_none());
    }

    #[test]
    fn test_store_config_requires_url_and_key() {
        let err = store_args(None, None).config().unwrap_err();
        let message = err.to_string();
        assert!(message.contains(ENV_STORE_URL));
        assert!(message.contains(ENV_IAM_KEY));

        let config = store_args(Some("https://acct.cloudant.com"), Some("key"))
            .config()
            .unwrap();
        assert!(matches!(config.auth, StoreAuth::Iam { .. }));
        assert_eq!(config.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_store_config_basic_auth() {
        let mut args = store_args(Some("http://localhost:5984"), None);
        args.username = Some("admin".to_string());
        args.password = Some("secret".to_string());
        args.timeout = 5;

        let config = args.config().unwrap();
        assert!(matches!(config.auth, StoreAuth::Basic { .. }));
        assert_eq!(config.timeout, Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_recorder_disabled_when_store_unreachable() {
        let mut store = store_args(Some("http://127.0.0.1:9"), Some("key"));
        store.iam_url = Some("http://127.0.0.1:9".to_string());
        store.timeout = 2;

        let logger = recorder(
            &store,
            &RecorderArgs {
                lines: LineOutput::Tracing,
            },
        )
        .await
        .unwrap();

        assert!(!logger.is_enabled());
        let outcome = logger
            .log(&RequestContext::new(), "subject-1", CrudOperation::Delete)
            .await;
        assert_eq!(outcome, AuditOutcome::Disabled);
    }
}
