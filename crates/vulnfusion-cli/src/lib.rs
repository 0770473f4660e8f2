//! The `vulnfusion` binary: a terminal rendering of the console controllers.
//! All state and concurrency rules live in `vulnfusion-app-state`; this crate
//! only forwards operator input and prints controller state.

use std::sync::Arc;

use anyhow::{Context, bail};
use clap::Parser;

use vulnfusion_app_state::{
    CatalogController, ConfigFormController, DingBotEndpoint, FilterEdit, GuardDecision,
    NoticeCatalog, RouteGuard, SyncTaskEndpoint, VulnCatalog,
};
use vulnfusion_client_core::{
    ConsoleApi, ConsoleClient, ConsoleError, FileTokenStore, MemoryTokenStore, SessionStore,
    TokenStore, normalize_base_url, resolve_base_url,
};

#[derive(Debug, Parser)]
#[command(name = "vulnfusion")]
#[command(about = "Admin console for the vulnfusion vulnerability feed service")]
pub struct ConsoleCli {
    /// Backend base url; falls back to VULNFUSION_BASE_URL, then localhost
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Keep the session in memory only, do not touch the session file
    #[arg(long, global = true)]
    pub no_persist: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, clap::Subcommand)]
pub enum Commands {
    /// Log in and store the bearer credential
    Login {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
    },
    /// Discard the stored session
    Logout,
    /// Browse the vulnerability catalog
    Vulns {
        #[command(subcommand)]
        command: VulnsCommand,
    },
    /// Browse the security-notice catalog
    Notices {
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        pushed: Option<bool>,
        #[arg(long)]
        source: Option<String>,
        #[arg(long)]
        page: Option<u32>,
    },
    /// Periodic data-sync task configuration
    SyncTask {
        #[command(subcommand)]
        command: SyncTaskCommand,
    },
    /// Push-notification bot configuration
    DingBot {
        #[command(subcommand)]
        command: DingBotCommand,
    },
    /// List vulnerability-source adapters
    Plugins,
    /// List notice-source adapters
    NoticeSources,
}

#[derive(Debug, clap::Subcommand)]
pub enum VulnsCommand {
    /// List vulnerabilities with structured filters
    List {
        #[arg(long)]
        cve: Option<String>,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        pushed: Option<bool>,
        #[arg(long)]
        source: Option<String>,
        #[arg(long)]
        page: Option<u32>,
    },
    /// Show one vulnerability by id
    Show { id: i64 },
}

#[derive(Debug, clap::Subcommand)]
pub enum SyncTaskCommand {
    /// Show the current sync-task configuration
    Show,
    /// Create or update the sync-task configuration
    Set {
        #[arg(long)]
        name: String,
        /// Minutes between runs, clamped to 1..=1440
        #[arg(long)]
        interval: u32,
        #[arg(long)]
        enabled: bool,
    },
}

#[derive(Debug, clap::Subcommand)]
pub enum DingBotCommand {
    /// Show the current bot configuration (secrets masked)
    Show,
    /// Create or update the bot configuration
    Set {
        #[arg(long)]
        access_token: String,
        #[arg(long)]
        secret_token: String,
        #[arg(long)]
        enabled: bool,
    },
}

pub async fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = ConsoleCli::parse();

    let (base_url, source) = match &cli.base_url {
        Some(raw) => (normalize_base_url(raw)?, "--base-url"),
        None => resolve_base_url()?,
    };
    tracing::debug!(base_url, source, "resolved backend url");

    let store: Box<dyn TokenStore> = if cli.no_persist {
        Box::new(MemoryTokenStore::new())
    } else {
        let path = FileTokenStore::default_path().context("no usable config directory")?;
        Box::new(FileTokenStore::new(path))
    };
    let session = Arc::new(SessionStore::open(store));
    session.set_on_cleared(|| {
        eprintln!("session cleared; log in again with `vulnfusion login`");
    });

    let client = ConsoleClient::new(&base_url, session.clone())?;

    if protected(&cli.command) {
        let mut guard = RouteGuard::new();
        guard.resolve(&session);
        if guard.decision() == GuardDecision::RedirectToLogin {
            bail!("not logged in; run `vulnfusion login` first");
        }
    }

    match cli.command {
        Commands::Login { username, password } => login(&client, &session, &username, &password).await,
        Commands::Logout => {
            session.clear();
            Ok(())
        }
        Commands::Vulns { command } => match command {
            VulnsCommand::List {
                cve,
                title,
                pushed,
                source,
                page,
            } => list_vulns(&client, cve, title, pushed, source, page).await,
            VulnsCommand::Show { id } => show_vuln(&client, id).await,
        },
        Commands::Notices {
            title,
            pushed,
            source,
            page,
        } => list_notices(&client, title, pushed, source, page).await,
        Commands::SyncTask { command } => match command {
            SyncTaskCommand::Show => show_sync_task(&client).await,
            SyncTaskCommand::Set {
                name,
                interval,
                enabled,
            } => set_sync_task(&client, name, interval, enabled).await,
        },
        Commands::DingBot { command } => match command {
            DingBotCommand::Show => show_ding_bot(&client).await,
            DingBotCommand::Set {
                access_token,
                secret_token,
                enabled,
            } => set_ding_bot(&client, access_token, secret_token, enabled).await,
        },
        Commands::Plugins => list_adapters(&client, AdapterKind::Plugins).await,
        Commands::NoticeSources => list_adapters(&client, AdapterKind::NoticeSources).await,
    }
}

fn protected(command: &Commands) -> bool {
    !matches!(command, Commands::Login { .. } | Commands::Logout)
}

async fn login(
    client: &ConsoleClient,
    session: &SessionStore,
    username: &str,
    password: &str,
) -> anyhow::Result<()> {
    match client.authenticate(username, password).await {
        Ok(response) => {
            session
                .set_token(response.token)
                .context("failed to persist session")?;
            println!("logged in as user {}", response.user_id);
            Ok(())
        }
        Err(ConsoleError::AuthExpired) => bail!("invalid username or password"),
        Err(err) => bail!("{}", err.user_message()),
    }
}

fn apply_filters(
    controller: &mut CatalogController<impl vulnfusion_app_state::Catalog>,
    cve: Option<String>,
    title: Option<String>,
    pushed: Option<bool>,
    source: Option<String>,
    page: Option<u32>,
) {
    if let Some(cve) = cve {
        controller.edit(FilterEdit::Cve(cve));
    }
    if let Some(title) = title {
        controller.edit(FilterEdit::Title(title));
    }
    if let Some(pushed) = pushed {
        controller.edit(FilterEdit::Pushed(Some(pushed)));
    }
    if let Some(source) = source {
        controller.edit(FilterEdit::Source(source));
    }
    if let Some(page) = page {
        controller.edit(FilterEdit::Page(page));
    }
}

async fn list_vulns(
    client: &ConsoleClient,
    cve: Option<String>,
    title: Option<String>,
    pushed: Option<bool>,
    source: Option<String>,
    page: Option<u32>,
) -> anyhow::Result<()> {
    let mut controller = CatalogController::<VulnCatalog>::new();
    apply_filters(&mut controller, cve, title, pushed, source, page);
    let ticket = controller.refresh();
    controller.run(client, ticket).await;

    if let Some(message) = controller.error() {
        bail!("{message}");
    }
    for vuln in controller.rows() {
        let cve = if vuln.cve.is_empty() { "-" } else { &vuln.cve };
        println!(
            "{:>6}  {:<8}  {:<18}  {:<10}  {}",
            vuln.id,
            vuln.severity.to_string(),
            cve,
            if vuln.pushed { "pushed" } else { "unpushed" },
            vuln.title
        );
    }
    print_page_line(
        controller.filter().page_no,
        controller.total_pages(),
        controller.total_count(),
        controller.can_prev(),
        controller.can_next(),
    );
    Ok(())
}

async fn list_notices(
    client: &ConsoleClient,
    title: Option<String>,
    pushed: Option<bool>,
    source: Option<String>,
    page: Option<u32>,
) -> anyhow::Result<()> {
    let mut controller = CatalogController::<NoticeCatalog>::new();
    apply_filters(&mut controller, None, title, pushed, source, page);
    let ticket = controller.refresh();
    controller.run(client, ticket).await;

    if let Some(message) = controller.error() {
        bail!("{message}");
    }
    for notice in controller.rows() {
        println!(
            "{:>6}  {:<10}  {:<14}  {:<10}  {}",
            notice.id,
            notice.risk_level,
            notice.source_name,
            if notice.pushed { "pushed" } else { "unpushed" },
            notice.title
        );
    }
    print_page_line(
        controller.filter().page_no,
        controller.total_pages(),
        controller.total_count(),
        controller.can_prev(),
        controller.can_next(),
    );
    Ok(())
}

fn print_page_line(page_no: u32, total_pages: u32, total_count: i64, can_prev: bool, can_next: bool) {
    println!(
        "page {page_no}/{total_pages} ({total_count} records){}{}",
        if can_prev { "" } else { "  [first page]" },
        if can_next { "" } else { "  [last page]" },
    );
}

async fn show_vuln(client: &ConsoleClient, id: i64) -> anyhow::Result<()> {
    let detail = match client.get_vulnerability(id).await {
        Ok(detail) => detail,
        // an explicit view state, not an error banner
        Err(ConsoleError::NotFound) => {
            println!("no record with id {id}");
            return Ok(());
        }
        Err(err) => bail!("{}", err.user_message()),
    };

    println!("{} ({})", detail.title, detail.severity);
    if !detail.cve.is_empty() {
        println!("cve:        {}", detail.cve);
    }
    println!("source:     {}", detail.source);
    if !detail.disclosure.is_empty() {
        println!("disclosed:  {}", detail.disclosure);
    }
    println!("pushed:     {}", detail.pushed);
    if !detail.tags.is_empty() {
        println!("tags:       {}", detail.tags.join(", "));
    }
    if !detail.description.is_empty() {
        println!("\n{}", detail.description);
    }
    if !detail.solutions.is_empty() {
        println!("\nsolutions:\n{}", detail.solutions);
    }
    if !detail.reasons.is_empty() {
        println!("\nreasons:");
        for reason in &detail.reasons {
            println!("  - {reason}");
        }
    }
    if !detail.reference_links.is_empty() {
        println!("\nreferences:");
        for link in &detail.reference_links {
            println!("  {link}");
        }
    }
    println!("\nupdated {}", detail.updated_at);
    Ok(())
}

async fn show_sync_task(client: &ConsoleClient) -> anyhow::Result<()> {
    let mut form = ConfigFormController::<SyncTaskEndpoint>::new();
    form.load(client).await;
    if let Some(message) = form.error() {
        bail!("{message}");
    }
    let draft = form.draft();
    if draft.name.is_empty() {
        println!("no sync task configured yet");
        return Ok(());
    }
    println!("name:      {}", draft.name);
    println!("interval:  {} minutes", draft.interval_minutes);
    println!("enabled:   {}", draft.status);
    Ok(())
}

async fn set_sync_task(
    client: &ConsoleClient,
    name: String,
    interval: u32,
    enabled: bool,
) -> anyhow::Result<()> {
    let mut form = ConfigFormController::<SyncTaskEndpoint>::new();
    form.load(client).await;
    if let Some(message) = form.error() {
        bail!("{message}");
    }
    form.draft_mut().name = name;
    form.draft_mut().interval_minutes = interval;
    form.draft_mut().status = enabled;
    form.submit(client).await;

    if let Some(message) = form.error() {
        bail!("{message}");
    }
    println!(
        "saved: {} every {} minutes, enabled={}",
        form.draft().name,
        form.draft().interval_minutes,
        form.draft().status
    );
    Ok(())
}

async fn show_ding_bot(client: &ConsoleClient) -> anyhow::Result<()> {
    let mut form = ConfigFormController::<DingBotEndpoint>::new();
    form.load(client).await;
    if let Some(message) = form.error() {
        bail!("{message}");
    }
    let draft = form.draft();
    if draft.access_token.is_empty() && draft.secret_token.is_empty() {
        println!("no bot configured yet");
        return Ok(());
    }
    println!("access token:  {}", mask_secret(&draft.access_token));
    println!("secret token:  {}", mask_secret(&draft.secret_token));
    println!("enabled:       {}", draft.status);
    Ok(())
}

async fn set_ding_bot(
    client: &ConsoleClient,
    access_token: String,
    secret_token: String,
    enabled: bool,
) -> anyhow::Result<()> {
    let mut form = ConfigFormController::<DingBotEndpoint>::new();
    form.load(client).await;
    if let Some(message) = form.error() {
        bail!("{message}");
    }
    form.draft_mut().access_token = access_token;
    form.draft_mut().secret_token = secret_token;
    form.draft_mut().status = enabled;
    form.submit(client).await;

    if let Some(message) = form.error() {
        bail!("{message}");
    }
    println!("saved, enabled={}", form.draft().status);
    Ok(())
}

enum AdapterKind {
    Plugins,
    NoticeSources,
}

async fn list_adapters(client: &ConsoleClient, kind: AdapterKind) -> anyhow::Result<()> {
    let adapters = match kind {
        AdapterKind::Plugins => client.list_plugins().await,
        AdapterKind::NoticeSources => client.list_notice_sources().await,
    };
    let adapters = adapters.map_err(|err| anyhow::anyhow!("{}", err.user_message()))?;
    for adapter in adapters {
        println!("{:<16}  {:<24}  {}", adapter.name, adapter.display_name, adapter.link);
    }
    Ok(())
}

/// Secrets are never echoed in full; keep the tail for recognition.
fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 4 {
        return "****".to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("****{tail}")
}
