//! Mailbridge CLI - drive a linked Gmail or Outlook mailbox from the shell
//!
//! Accounts live in a SQLite credential store; every mailbox command
//! resolves the account, refreshes its token when needed and prints the
//! result as JSON.

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use log::{error, info};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

use mailbridge::{
    AccountCredentials, CredentialStore, EmailAddress, EmailBody, EmailService,
    EmailServiceFactory, ForwardParams, ListEmailsParams, MailSettings, Provider, ReplyParams,
    SendEmailParams, SqliteCredentialStore, UreqClient,
};

#[derive(Parser)]
#[command(name = "mailbridge")]
#[command(about = "Provider-agnostic access to Gmail and Outlook mailboxes", long_about = None)]
struct Cli {
    /// Credential database (defaults to ~/.config/mailbridge/accounts.db)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Account id to operate on
    #[arg(long, global = true)]
    account: Option<String>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Store or replace a credential record
    Link {
        /// google | microsoft-entra-id (aliases: gmail, outlook, azure-ad)
        #[arg(long)]
        provider: Provider,
        #[arg(long)]
        access_token: String,
        #[arg(long)]
        refresh_token: Option<String>,
        /// Access token expiry, unix seconds
        #[arg(long, default_value_t = 0)]
        expires_at: i64,
    },

    /// List linked accounts
    Accounts,

    /// Remove a linked account
    Unlink,

    /// Ensure the access token is valid, refreshing it if needed
    Token,

    /// List one page of messages
    List {
        #[arg(long)]
        folder: Option<String>,
        #[arg(long, default_value_t = mailbridge::models::DEFAULT_PAGE_SIZE)]
        max: u32,
        #[arg(long)]
        page_token: Option<String>,
        /// Provider-native search query
        #[arg(long)]
        query: Option<String>,
    },

    /// Show one message
    Show { id: String },

    /// Show a conversation, oldest first
    Thread { id: String },

    Folders,

    Send {
        #[arg(long, required = true)]
        to: Vec<String>,
        #[arg(long)]
        cc: Vec<String>,
        #[arg(long)]
        bcc: Vec<String>,
        #[arg(long)]
        subject: String,
        #[command(flatten)]
        body: BodyArgs,
    },

    Read { id: String },
    Unread { id: String },
    Star { id: String },
    Unstar { id: String },
    Delete { id: String },

    Move {
        id: String,
        #[arg(long)]
        folder: String,
    },

    Attachments { id: String },

    /// Fetch one attachment (base64 content)
    Attachment { id: String, attachment_id: String },

    Reply {
        id: String,
        #[arg(long)]
        all: bool,
        #[command(flatten)]
        body: BodyArgs,
    },

    Forward {
        id: String,
        #[arg(long, required = true)]
        to: Vec<String>,
        #[command(flatten)]
        body: BodyArgs,
    },
}

#[derive(clap::Args)]
struct BodyArgs {
    /// Plain text body
    #[arg(long)]
    text: Option<String>,
    /// HTML body
    #[arg(long)]
    html: Option<String>,
}

impl BodyArgs {
    fn into_body(self) -> Option<EmailBody> {
        let body = EmailBody {
            text: self.text,
            html: self.html,
        };
        (!body.is_empty()).then_some(body)
    }
}

/// Account listing without token material
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AccountSummary<'a> {
    id: &'a str,
    provider: &'a str,
    expires_at: Option<i64>,
    has_refresh_token: bool,
}

impl<'a> From<&'a AccountCredentials> for AccountSummary<'a> {
    fn from(account: &'a AccountCredentials) -> Self {
        Self {
            id: &account.id,
            provider: account.provider.as_str(),
            expires_at: account.expires_at,
            has_refresh_token: account.usable_refresh_token().is_some(),
        }
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    if let Err(e) = run(Cli::parse()) {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let db_path = match cli.db {
        Some(path) => path,
        None => config::credentials_db_path()?,
    };
    let store: Arc<dyn CredentialStore> = Arc::new(
        SqliteCredentialStore::new(&db_path)
            .with_context(|| format!("Failed to open credential store: {}", db_path.display()))?,
    );

    match cli.cmd {
        Command::Accounts => {
            let accounts = store.list_accounts()?;
            let summaries: Vec<AccountSummary> = accounts.iter().map(AccountSummary::from).collect();
            return print_json(&summaries);
        }
        Command::Link {
            provider,
            access_token,
            refresh_token,
            expires_at,
        } => {
            let id = require_account(cli.account)?;
            let mut account = AccountCredentials::new(&id, provider).with_access_token(access_token, expires_at);
            account.refresh_token = refresh_token;
            store.save_account(&account)?;
            info!("Linked {} account {}", provider, id);
            return print_json(&AccountSummary::from(&account));
        }
        Command::Unlink => {
            let id = require_account(cli.account)?;
            if !store.delete_account(&id)? {
                bail!("No account with id {}", id);
            }
            info!("Unlinked account {}", id);
            return Ok(());
        }
        _ => {}
    }

    let account_id = require_account(cli.account)?;
    let settings = MailSettings::load().context("Failed to load mail settings")?;
    let http = Arc::new(UreqClient::new(settings.request_timeout));
    let factory = EmailServiceFactory::new(Arc::clone(&store), http, settings);

    if let Command::Token = cli.cmd {
        factory.token_manager().get_valid_access_token(account_id.as_str())?;
        let account = store
            .find_account(&account_id)?
            .with_context(|| format!("Account {} disappeared", account_id))?;
        return print_json(&AccountSummary::from(&account));
    }

    let service = factory.create_email_service_from_account(account_id.as_str())?;
    run_mailbox_command(service.as_ref(), cli.cmd)
}

fn run_mailbox_command(service: &dyn EmailService, cmd: Command) -> Result<()> {
    match cmd {
        Command::List {
            folder,
            max,
            page_token,
            query,
        } => print_json(&service.list_emails(&ListEmailsParams {
            folder_id: folder,
            max_results: max,
            page_token,
            query,
        })?),
        Command::Show { id } => print_json(&service.get_email(&id)?),
        Command::Thread { id } => print_json(&service.get_thread(&id)?),
        Command::Folders => print_json(&service.list_folders()?),
        Command::Send {
            to,
            cc,
            bcc,
            subject,
            body,
        } => {
            let params = SendEmailParams {
                to: parse_addresses(&to),
                cc: parse_addresses(&cc),
                bcc: parse_addresses(&bcc),
                subject,
                body: body.into_body().context("Provide --text and/or --html")?,
            };
            print_json(&service.send_email(&params)?)
        }
        Command::Read { id } => service.mark_as_read(&id).map_err(Into::into),
        Command::Unread { id } => service.mark_as_unread(&id).map_err(Into::into),
        Command::Star { id } => service.star(&id).map_err(Into::into),
        Command::Unstar { id } => service.unstar(&id).map_err(Into::into),
        Command::Delete { id } => service.delete_email(&id).map_err(Into::into),
        Command::Move { id, folder } => service.move_to_folder(&id, &folder).map_err(Into::into),
        Command::Attachments { id } => print_json(&service.list_attachments(&id)?),
        Command::Attachment { id, attachment_id } => {
            print_json(&service.get_attachment(&id, &attachment_id)?)
        }
        Command::Reply { id, all, body } => {
            let params = ReplyParams {
                body: body.into_body().context("Provide --text and/or --html")?,
                reply_all: all,
            };
            print_json(&service.reply(&id, &params)?)
        }
        Command::Forward { id, to, body } => {
            let params = ForwardParams {
                to: parse_addresses(&to),
                body: body.into_body(),
            };
            print_json(&service.forward(&id, &params)?)
        }
        Command::Link { .. } | Command::Accounts | Command::Unlink | Command::Token => {
            unreachable!("account commands are handled before a service is built")
        }
    }
}

fn require_account(account: Option<String>) -> Result<String> {
    account.context("--account is required for this command")
}

fn parse_addresses(values: &[String]) -> Vec<EmailAddress> {
    values.iter().map(|v| EmailAddress::parse(v)).collect()
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to encode output")?;
    println!("{}", json);
    Ok(())
}
