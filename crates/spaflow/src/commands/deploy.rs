use crate::prompt::TerminalConfirm;
use clap::Args;
use colored::Colorize;
use spaflow_cloud::model::{BucketAccessMode, EdgeEventType};
use spaflow_cloud::{ActionType, AutoConfirm, Confirm, DeployReport, DomainSpec, Settings};
use spaflow_cloud_aws::deploy::validate_local_assets;
use spaflow_cloud_aws::{BasicAuth, Context, DeployOptions, Deployer};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub struct DeployArgs {
    /// Target, e.g. `www.example.com` or `example.com/feature-1`
    #[arg(value_name = "DOMAIN[/SUBFOLDER]")]
    pub domain: String,

    /// Wait for the cache invalidation to complete
    #[arg(long)]
    pub wait: bool,

    /// Folder holding the built SPA
    #[arg(short, long, default_value = "build")]
    pub directory: PathBuf,

    /// Comma separated paths to invalidate, relative to the subfolder
    #[arg(long, default_value = "/*")]
    pub cache_invalidation: String,

    /// Files under this prefix get a one year immutable cache
    #[arg(long)]
    pub cache_busted_prefix: Option<String>,

    /// Protect the site with basic auth (`user:password`)
    #[arg(long, env = "SPAFLOW_CREDENTIALS", hide_env_values = true)]
    pub credentials: Option<String>,

    /// Skip the pre-deploy confirmation (implied by CI=true)
    #[arg(long)]
    pub no_prompt: bool,

    /// Answer yes to every question
    #[arg(short = 'y', long)]
    pub auto_approve: bool,

    /// Lock the bucket and serve it through an origin access control
    #[arg(long)]
    pub private_bucket: bool,

    /// Do not set `index.html` as the distribution's default root object
    #[arg(long)]
    pub no_default_root_object: bool,

    /// Serve `/index.html` with a 200 when the origin answers 403
    #[arg(long)]
    pub redirect_403_to_root: bool,

    /// Expire objects after this many days
    #[arg(long, value_parser = clap::value_parser!(i32).range(1..))]
    pub object_expiration_days: Option<i32>,

    /// Additional domain served by the distribution (repeatable)
    #[arg(long = "alias")]
    pub aliases: Vec<String>,

    /// Published CloudFront function to run on viewer requests (repeatable)
    #[arg(long = "viewer-request-function")]
    pub viewer_request_functions: Vec<String>,

    /// Published CloudFront function to run on viewer responses (repeatable)
    #[arg(long = "viewer-response-function")]
    pub viewer_response_functions: Vec<String>,
}

impl DeployArgs {
    fn into_options(self, target: DomainSpec, no_prompt: bool) -> anyhow::Result<DeployOptions> {
        let basic_auth = self
            .credentials
            .as_deref()
            .map(BasicAuth::parse)
            .transpose()?;

        let mut functions = BTreeMap::new();
        if !self.viewer_request_functions.is_empty() {
            functions.insert(EdgeEventType::ViewerRequest, self.viewer_request_functions);
        }
        if !self.viewer_response_functions.is_empty() {
            functions.insert(EdgeEventType::ViewerResponse, self.viewer_response_functions);
        }

        let mut options = DeployOptions::new(target, self.directory);
        options.wait = self.wait;
        options.cache_invalidation = self.cache_invalidation;
        options.cache_busted_prefix = self.cache_busted_prefix;
        options.basic_auth = basic_auth;
        options.no_prompt = no_prompt;
        options.access_mode = if self.private_bucket {
            BucketAccessMode::PrivateOac
        } else {
            BucketAccessMode::PublicWebsite
        };
        options.no_default_root_object = self.no_default_root_object;
        options.redirect_403_to_root = self.redirect_403_to_root;
        options.object_expiration_days = self.object_expiration_days;
        options.aliases = self.aliases;
        options.functions = functions;
        Ok(options)
    }
}

fn is_ci() -> bool {
    std::env::var("CI").is_ok_and(|v| v == "true")
}

/// How ownership questions get answered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfirmMode {
    /// Fixed answer, stdin is never read
    Auto(bool),
    Terminal,
}

impl ConfirmMode {
    /// `--auto-approve` answers yes. Otherwise a non-interactive run answers
    /// no instead of waiting on stdin.
    fn select(auto_approve: bool, no_prompt: bool) -> Self {
        if auto_approve {
            Self::Auto(true)
        } else if no_prompt {
            Self::Auto(false)
        } else {
            Self::Terminal
        }
    }

    fn into_confirm(self) -> Arc<dyn Confirm> {
        match self {
            Self::Auto(answer) => Arc::new(AutoConfirm { answer }),
            Self::Terminal => Arc::new(TerminalConfirm),
        }
    }
}

pub async fn handle(args: DeployArgs) -> anyhow::Result<()> {
    let target = DomainSpec::parse(&args.domain)?;

    println!(
        "{}",
        format!(
            "🚀 Deploying \"{}\" on \"{}\"",
            args.directory.display(),
            target
        )
        .blue()
        .bold()
    );

    // fail before touching AWS
    validate_local_assets(&args.directory)?;

    let settings = Settings::load(&std::env::current_dir()?)?;
    let no_prompt = args.no_prompt || is_ci();
    if no_prompt && !args.no_prompt {
        tracing::info!("CI=true, running without prompts");
    }
    let confirm = ConfirmMode::select(args.auto_approve, no_prompt).into_confirm();
    let options = args.into_options(target, no_prompt)?;

    let ctx = Context::from_env(settings, confirm).await;
    let report = Deployer::new(&ctx).deploy(&options).await?;

    print_report(&report);
    println!();
    println!(
        "{}",
        format!("✅ Deployed on https://{}", options.target).green().bold()
    );
    Ok(())
}

fn print_report(report: &DeployReport) {
    println!();
    for step in &report.steps {
        let action = match step.action_type {
            ActionType::Create => step.action_type.to_string().green(),
            ActionType::Update => step.action_type.to_string().yellow(),
            ActionType::Delete => step.action_type.to_string().red(),
            ActionType::NoOp => step.action_type.to_string().dimmed(),
        };
        println!(
            "  {:<8} {:<22} {} {}",
            action,
            step.resource_type,
            step.resource_id.cyan(),
            format!("({})", step.description).dimmed()
        );
    }
    println!();
    println!("{}", report.summary().to_string().bold());
}
