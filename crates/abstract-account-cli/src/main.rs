//! Abstract account CLI: the `aa` command.
//!
//! Developer tooling around the authentication engine: predict account
//! addresses, generate issuer keys, issue transaction-bound credentials, and
//! inspect or verify them offline.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};

use abstract_account::address::{self, AccountId, CodeFingerprint};
use abstract_account::anchor::{AnchorKey, KeySet, StaticKeySource, TrustAnchorResolver};
use abstract_account::crypto::keys::Ed25519KeyPair;
use abstract_account::time::{now_secs, secs_to_rfc3339};
use abstract_account::verify::{verify_claims, ExpectedClaims};
use abstract_account::{CredentialBuilder, CredentialParser, EngineConfig};

const SECRET_KEY_FILE: &str = "issuer.key";
const KEY_SET_FILE: &str = "jwks.json";

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Parse a duration string like "5m", "1h30m", "2d", or plain seconds.
/// Returns the duration in seconds.
fn parse_duration_secs(s: &str) -> Result<u64> {
    let s = s.trim();

    if let Ok(n) = s.parse::<u64>() {
        if n == 0 {
            bail!("duration must be > 0");
        }
        return Ok(n);
    }

    let mut total: u64 = 0;
    let mut current = String::new();

    for ch in s.chars() {
        if ch.is_ascii_digit() {
            current.push(ch);
        } else {
            let val: u64 = current
                .parse()
                .map_err(|_| anyhow!("invalid duration: {s}"))?;
            current.clear();
            let unit = match ch {
                'd' => 86_400,
                'h' => 3_600,
                'm' => 60,
                's' => 1,
                _ => bail!("unknown duration unit '{ch}' in '{s}'"),
            };
            total = total.saturating_add(val.saturating_mul(unit));
        }
    }

    if !current.is_empty() {
        bail!("duration '{s}' is missing a unit (d/h/m/s)");
    }
    if total == 0 {
        bail!("duration must be > 0");
    }
    Ok(total)
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    let config = match path {
        Some(p) => EngineConfig::load(p)
            .with_context(|| format!("failed to load config {}", p.display()))?,
        None => EngineConfig::default(),
    };
    log::debug!("engine config: {config:?}");
    Ok(config)
}

/// A token argument of `-` is read from stdin.
fn read_token(arg: &str) -> Result<String> {
    if arg != "-" {
        return Ok(arg.trim().to_string());
    }
    let mut buf = String::new();
    std::io::stdin()
        .read_to_string(&mut buf)
        .context("failed to read token from stdin")?;
    Ok(buf.trim().to_string())
}

fn decode_hex(what: &str, value: &str) -> Result<Vec<u8>> {
    hex::decode(value.trim()).with_context(|| format!("{what} is not valid hex"))
}

// ── CLI structure ─────────────────────────────────────────────────────────────

/// Abstract account CLI: predict addresses and work with
/// transaction-bound credentials.
#[derive(Parser, Debug)]
#[command(
    name = "aa",
    about = "Abstract account CLI",
    version,
    long_about = "aa: abstract account CLI\n\nPredict account addresses, generate issuer keys, and issue,\ninspect and verify transaction-bound credentials."
)]
struct Cli {
    /// Engine configuration file (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Predict the address an account registration will produce
    Predict {
        /// SHA-256 fingerprint of the account code (hex)
        #[arg(long)]
        code_hash: String,

        /// Creator account id (hex)
        #[arg(long)]
        creator: String,

        /// Registration salt
        #[arg(long)]
        salt: String,

        /// Instantiation arguments folded into the address
        #[arg(long, default_value = "")]
        init_args: String,
    },

    /// Generate an issuer key pair and its published key set
    Keygen {
        /// Output directory
        #[arg(long)]
        out: PathBuf,

        /// Rotation epoch recorded in the key set
        #[arg(long, default_value_t = 0)]
        epoch: u64,
    },

    /// Issue a signed credential bound to one transaction
    Issue {
        /// Issuer secret key file (as written by `aa keygen`)
        #[arg(long)]
        key: PathBuf,

        /// Issuer identifier (iss)
        #[arg(long)]
        issuer: String,

        /// Subject (sub)
        #[arg(long)]
        sub: String,

        /// Audience (aud); repeat for several
        #[arg(long, required = true)]
        aud: Vec<String>,

        /// Transaction binding (hex)
        #[arg(long)]
        binding: String,

        /// Validity after issuance (e.g. 5m, 1h)
        #[arg(long, default_value = "5m")]
        valid_for: String,

        /// Validity before issuance, for clock skew (e.g. 5m)
        #[arg(long)]
        skew: Option<String>,
    },

    /// Print the claims of a credential without making a trust decision
    Inspect {
        /// Credential, or `-` to read stdin
        token: String,
    },

    /// Verify a credential against a key set
    Verify {
        /// Credential, or `-` to read stdin
        token: String,

        /// Key set file of the trusted issuer
        #[arg(long)]
        jwks: PathBuf,

        /// Trusted issuer identifier
        #[arg(long)]
        issuer: String,

        /// Expected subject
        #[arg(long)]
        sub: String,

        /// Expected audience
        #[arg(long)]
        aud: String,

        /// Expected transaction binding (hex)
        #[arg(long)]
        binding: String,
    },
}

// ── Main ──────────────────────────────────────────────────────────────────────

fn main() {
    env_logger::init();

    let cli = Cli::parse();
    let verbose = cli.verbose;

    let result = load_config(cli.config.as_deref()).and_then(|config| match cli.command {
        Commands::Predict {
            code_hash,
            creator,
            salt,
            init_args,
        } => cmd_predict(&code_hash, &creator, &salt, &init_args, &config, verbose),
        Commands::Keygen { out, epoch } => cmd_keygen(&out, epoch, verbose),
        Commands::Issue {
            key,
            issuer,
            sub,
            aud,
            binding,
            valid_for,
            skew,
        } => cmd_issue(
            &key,
            &issuer,
            &sub,
            &aud,
            &binding,
            &valid_for,
            skew.as_deref(),
        ),
        Commands::Inspect { token } => cmd_inspect(&token, &config, verbose),
        Commands::Verify {
            token,
            jwks,
            issuer,
            sub,
            aud,
            binding,
        } => cmd_verify(&token, &jwks, &issuer, &sub, &aud, &binding, &config, verbose),
    });

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

// ── Command implementations ───────────────────────────────────────────────────

/// `aa predict --code-hash HEX --creator HEX --salt STR [--init-args STR]`
fn cmd_predict(
    code_hash: &str,
    creator: &str,
    salt: &str,
    init_args: &str,
    config: &EngineConfig,
    verbose: bool,
) -> Result<()> {
    let code = CodeFingerprint::from_hex(code_hash).context("invalid --code-hash")?;
    let creator = AccountId::from_hex(creator).context("invalid --creator")?;
    if salt.is_empty() || salt.len() > config.max_salt_bytes {
        bail!("salt must be 1..={} bytes", config.max_salt_bytes);
    }

    let addr = address::derive(&code, &creator, salt.as_bytes(), init_args.as_bytes());
    println!("{addr}");

    if verbose {
        eprintln!("  Code:    {code}");
        eprintln!("  Creator: {}", hex::encode(creator.as_bytes()));
        eprintln!("  Salt:    {salt:?}");
    }
    Ok(())
}

/// `aa keygen --out DIR [--epoch N]`
fn cmd_keygen(out: &Path, epoch: u64, verbose: bool) -> Result<()> {
    let secret_path = out.join(SECRET_KEY_FILE);
    if secret_path.exists() {
        bail!("{} already exists", secret_path.display());
    }
    std::fs::create_dir_all(out)
        .with_context(|| format!("failed to create {}", out.display()))?;

    let pair = Ed25519KeyPair::generate();
    let set = KeySet::new(vec![AnchorKey::new(*pair.verifying_key())], epoch);

    std::fs::write(&secret_path, pair.secret_base64())
        .with_context(|| format!("failed to write {}", secret_path.display()))?;
    let set_path = out.join(KEY_SET_FILE);
    std::fs::write(&set_path, set.to_jwks_json())
        .with_context(|| format!("failed to write {}", set_path.display()))?;

    println!("Generated issuer key {}", pair.key_id());
    println!("  Secret:  {}", secret_path.display());
    println!("  Key set: {}", set_path.display());
    if verbose {
        println!("  Public:  {}", pair.public_key_base64());
        println!("  Epoch:   {epoch}");
    }
    Ok(())
}

/// `aa issue --key FILE --issuer ISS --sub SUB --aud AUD --binding HEX`
fn cmd_issue(
    key: &Path,
    issuer: &str,
    sub: &str,
    aud: &[String],
    binding: &str,
    valid_for: &str,
    skew: Option<&str>,
) -> Result<()> {
    let secret = std::fs::read_to_string(key)
        .with_context(|| format!("failed to read {}", key.display()))?;
    let pair = Ed25519KeyPair::from_secret_base64(&secret).context("invalid issuer key")?;

    let ttl = parse_duration_secs(valid_for).context("invalid --valid-for")?;
    let skew = match skew {
        Some(s) => parse_duration_secs(s).context("invalid --skew")?,
        None => 0,
    };

    let mut builder = CredentialBuilder::new(issuer, sub)
        .valid_around(now_secs(), skew, ttl)
        .transaction_binding(decode_hex("--binding", binding)?);
    for a in aud {
        builder = builder.audience(a);
    }
    let token = builder.sign(&pair).context("failed to sign credential")?;
    println!("{token}");
    Ok(())
}

/// `aa inspect TOKEN`
fn cmd_inspect(token: &str, config: &EngineConfig, verbose: bool) -> Result<()> {
    let token = read_token(token)?;
    let claims = CredentialParser::new(config.max_credential_bytes)
        .parse(token.as_bytes())
        .context("failed to parse credential")?;

    println!("Credential:");
    println!("  Algorithm:  {}", claims.algorithm);
    if let Some(ref kid) = claims.key_id {
        println!("  Key ID:     {kid}");
    }
    println!("  Issuer:     {}", claims.issuer);
    println!("  Subject:    {}", claims.subject);
    println!("  Audience:   {}", claims.audience.join(", "));
    println!("  Not before: {}", secs_to_rfc3339(claims.not_before));
    println!("  Expires:    {}", secs_to_rfc3339(claims.expiry));
    if let Some(iat) = claims.issued_at {
        println!("  Issued at:  {}", secs_to_rfc3339(iat));
    }
    println!("  Binding:    {}", hex::encode(&claims.transaction_binding));

    if verbose {
        let now = now_secs();
        let state = if now < claims.not_before {
            "not yet valid"
        } else if now > claims.expiry {
            "expired"
        } else {
            "within validity window"
        };
        println!("  Now:        {} ({state})", secs_to_rfc3339(now));
    }
    Ok(())
}

/// `aa verify TOKEN --jwks FILE --issuer ISS --sub SUB --aud AUD --binding HEX`
#[allow(clippy::too_many_arguments)]
fn cmd_verify(
    token: &str,
    jwks: &Path,
    issuer: &str,
    sub: &str,
    aud: &str,
    binding: &str,
    config: &EngineConfig,
    verbose: bool,
) -> Result<()> {
    let token = read_token(token)?;
    let binding = decode_hex("--binding", binding)?;
    let doc = std::fs::read_to_string(jwks)
        .with_context(|| format!("failed to read {}", jwks.display()))?;
    let set = KeySet::from_jwks_json(&doc).context("invalid key set")?;

    let source = Arc::new(StaticKeySource::new());
    source.publish(issuer, set);
    let resolver = TrustAnchorResolver::new(source, config);

    let now = now_secs();
    let outcome = CredentialParser::new(config.max_credential_bytes)
        .parse(token.as_bytes())
        .and_then(|claims| {
            let anchor = resolver.resolve_at(&claims.issuer, now)?;
            let expected = ExpectedClaims {
                subject: sub,
                audience: aud,
                transaction_binding: &binding,
            };
            verify_claims(&claims, &anchor, &expected, now)
        });

    match outcome {
        Ok(verified) => {
            println!("Result: ACCEPTED");
            if verbose {
                println!("  Issuer:  {}", verified.issuer);
                println!("  Subject: {}", verified.subject);
                println!("  Key ID:  {}", verified.key_id);
                println!("  Expires: {}", secs_to_rfc3339(verified.expiry));
            }
            Ok(())
        }
        Err(e) => {
            println!("Result: REJECTED ({})", e.kind());
            Err(anyhow!(e))
        }
    }
}
