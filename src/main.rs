use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
mod auth;
use scryptkit::{Budget, Scrypt, Storage};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Debug, clap::Args)]
struct BudgetArgs {
    /// Maximum seconds to spend deriving the key
    #[arg(long = "maxtime", env = "SCRYPTKIT_MAXTIME")]
    max_time: Option<f64>,

    /// Maximum bytes of memory for key derivation (0 = default ceiling)
    #[arg(long = "maxmem", env = "SCRYPTKIT_MAXMEM")]
    max_mem: Option<usize>,

    /// Maximum fraction of system memory for key derivation
    #[arg(long = "maxmemfrac", env = "SCRYPTKIT_MAXMEMFRAC")]
    max_mem_frac: Option<f64>,
}

impl BudgetArgs {
    fn to_budget(&self, default: Budget) -> Budget {
        Budget::new(
            self.max_time.unwrap_or(default.max_time),
            self.max_mem.unwrap_or(default.max_mem),
            self.max_mem_frac.unwrap_or(default.max_mem_frac),
        )
    }
}

#[derive(Debug, Parser)]
#[command(name = "scryptkit")]
#[command(
    version,
    about = "Password-based encryption and scrypt hashing with bounded cost."
)]
struct Cli {
    /// Log derivation decisions to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Encrypts a file
    #[command(arg_required_else_help = true)]
    Enc {
        input: PathBuf,
        output: PathBuf,
        #[command(flatten)]
        budget: BudgetArgs,
    },

    /// Decrypts a file
    #[command(arg_required_else_help = true)]
    Dec {
        input: PathBuf,
        output: PathBuf,
        #[command(flatten)]
        budget: BudgetArgs,
    },

    /// Prints the hex scrypt hash of the password
    #[command(arg_required_else_help = true)]
    Hash {
        #[arg(long)]
        salt: String,

        /// CPU/memory cost, a power of two > 1
        #[arg(short = 'N', long = "cost", default_value_t = 16384)]
        n: u64,

        /// Block size
        #[arg(short, default_value_t = 8)]
        r: u32,

        /// Parallelism
        #[arg(short, default_value_t = 1)]
        p: u32,
    },

    /// Shows the cost parameters of an encrypted file
    #[command(arg_required_else_help = true)]
    Info { input: PathBuf },
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("scryptkit=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

fn read_file(storage: &Storage) -> Result<Vec<u8>> {
    storage
        .load()
        .with_context(|| format!("failed to read {}", storage.path().display()))
}

fn write_file(storage: &Storage, bytes: &[u8]) -> Result<()> {
    storage
        .save(bytes)
        .with_context(|| format!("failed to write {}", storage.path().display()))
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.verbose);
    let scrypt = Scrypt::new();

    match args.command {
        Commands::Enc {
            input,
            output,
            budget,
        } => {
            let plaintext = read_file(&Storage::new(input))?;
            let password = auth::read_new_password_with_confirmation()?;

            let budget = budget.to_budget(Budget::ENCRYPT);
            let sealed = scrypt.encrypt(&plaintext, password.as_bytes(), &budget)?;
            drop(password);

            write_file(&Storage::new(output), &sealed)?;
            println!("encrypted {} bytes", plaintext.len());
        }
        Commands::Dec {
            input,
            output,
            budget,
        } => {
            let sealed = read_file(&Storage::new(input))?;
            let password = auth::read_password()?;

            let budget = budget.to_budget(Budget::DECRYPT);
            let plaintext = scrypt.decrypt(&sealed, password.as_bytes(), &budget)?;
            drop(password);

            write_file(&Storage::new(output), &plaintext)?;
            println!("decrypted {} bytes", plaintext.len());
        }
        Commands::Hash { salt, n, r, p } => {
            let password = auth::read_password()?;
            let hashed = scrypt.hash(password.as_bytes(), salt.as_bytes(), n, r, p)?;
            println!("{}", to_hex(&hashed));
        }
        Commands::Info { input } => {
            let sealed = read_file(&Storage::new(input))?;
            let info = scryptkit::inspect(&sealed)?;
            println!("{}", serde_json::to_string_pretty(&info)?);
        }
    }

    Ok(())
}
