use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::io;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
mod auth;
use pwcrypt::{
    Bcrypt, BsdiCrypt, Cost, DesCrypt, GrubPbkdf2, HashOptions, HashRecord, NtHash,
    PasswordHash, Pbkdf2,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SchemeArg {
    Bcrypt,
    Pbkdf2Sha1,
    Pbkdf2Sha256,
    Pbkdf2Sha512,
    GrubPbkdf2Sha512,
    BsdiCrypt,
    DesCrypt,
    Nthash,
}

impl SchemeArg {
    fn build(self) -> Box<dyn PasswordHash> {
        match self {
            SchemeArg::Bcrypt => Box::new(Bcrypt::new()),
            SchemeArg::Pbkdf2Sha1 => Box::new(Pbkdf2::sha1()),
            SchemeArg::Pbkdf2Sha256 => Box::new(Pbkdf2::sha256()),
            SchemeArg::Pbkdf2Sha512 => Box::new(Pbkdf2::sha512()),
            SchemeArg::GrubPbkdf2Sha512 => Box::new(GrubPbkdf2::new()),
            SchemeArg::BsdiCrypt => Box::new(BsdiCrypt::new()),
            SchemeArg::DesCrypt => Box::new(DesCrypt),
            SchemeArg::Nthash => Box::new(NtHash),
        }
    }
}

/// Picks the named scheme, or the first one that recognizes `hash`.
fn resolve_scheme(scheme: Option<SchemeArg>, hash: &str) -> Result<Box<dyn PasswordHash>> {
    match scheme {
        Some(arg) => Ok(arg.build()),
        None => pwcrypt::identify(hash).context("unrecognized hash format"),
    }
}

#[derive(Debug, Parser)]
#[command(name = "pwcrypt")]
#[command(version, about = "Create and check password hashes.")]
struct Cli {
    /// Log filter, e.g. `warn` or `pwcrypt=debug`
    #[arg(long, global = true, value_name = "FILTER", env = "PWCRYPT_LOG", default_value = "warn")]
    log: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Hashes a password
    Hash {
        #[arg(long, value_enum, env = "PWCRYPT_SCHEME", default_value = "bcrypt")]
        scheme: SchemeArg,

        /// Round count, or one of fast / medium / slow
        #[arg(long, env = "PWCRYPT_ROUNDS")]
        rounds: Option<String>,
    },

    /// Checks a password against a hash
    #[command(arg_required_else_help = true)]
    Verify {
        hash: String,

        #[arg(long, value_enum)]
        scheme: Option<SchemeArg>,
    },

    /// Names the schemes that recognize a hash
    #[command(arg_required_else_help = true)]
    Identify { hash: String },

    /// Prints the fields of a hash as JSON
    #[command(arg_required_else_help = true)]
    Inspect {
        hash: String,

        #[arg(long, value_enum)]
        scheme: Option<SchemeArg>,
    },

    /// Lists supported schemes and their cost tiers
    Schemes,
}

#[derive(Debug, Serialize)]
struct Inspection<'a> {
    scheme: &'a str,
    ident: &'a str,
    rounds: Option<u32>,
    salt: String,
    checksum: Option<String>,
}

impl<'a> From<&'a HashRecord> for Inspection<'a> {
    fn from(record: &'a HashRecord) -> Self {
        Self {
            scheme: record.scheme(),
            ident: record.ident(),
            rounds: record.rounds(),
            salt: hex::encode(record.salt()),
            checksum: record.checksum().map(hex::encode),
        }
    }
}

fn init_logging(filter: &str) {
    let filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(io::stderr))
        .init();
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_logging(&args.log);
    pwcrypt::backend::init();

    match args.command {
        Commands::Hash { scheme, rounds } => {
            let password = auth::read_new_password_with_confirmation()?;
            let mut options = HashOptions::new();
            if let Some(rounds) = rounds.as_deref() {
                options = options.with_cost(Cost::from(rounds));
            }
            let hash = scheme.build().encrypt(password.as_bytes(), &options)?;
            println!("{hash}");
        }
        Commands::Verify { hash, scheme } => {
            let scheme = resolve_scheme(scheme, &hash)?;
            let password = auth::read_password()?;
            if !scheme.verify(password.as_bytes(), &hash)? {
                bail!("password does not match");
            }
            println!("password matches");
        }
        Commands::Identify { hash } => {
            let names: Vec<_> = pwcrypt::schemes()
                .into_iter()
                .filter(|s| s.identify(&hash))
                .map(|s| s.name())
                .collect();
            if names.is_empty() {
                bail!("unrecognized hash format");
            }
            for name in names {
                println!("{name}");
            }
        }
        Commands::Inspect { hash, scheme } => {
            let scheme = resolve_scheme(scheme, &hash)?;
            let record = scheme.parse(&hash)?;
            println!("{}", serde_json::to_string_pretty(&Inspection::from(&record))?);
        }
        Commands::Schemes => {
            for scheme in pwcrypt::schemes() {
                match scheme.cost_tiers() {
                    Some(t) => println!(
                        "{:<20} fast={} medium={} slow={} range={}..={}",
                        scheme.name(),
                        t.fast(),
                        t.medium(),
                        t.slow(),
                        t.min(),
                        t.max()
                    ),
                    None => println!("{}", scheme.name()),
                }
            }
        }
    }

    Ok(())
}
