mod cli;

use scribeflow::{app, config, transcode};
use scribeflow_keys::{CredentialRegistry, LeaseCoordinator, RotationCursor};

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "scribeflow=trace,scribeflow_pipeline=trace,scribeflow_keys=trace,scribeflow_common=debug"
                .to_string()
        } else {
            "scribeflow=info,scribeflow_pipeline=info,scribeflow_keys=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Run { input } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(run(input.as_deref(), cli.config.as_deref()))
        }
        Commands::Keys => show_keys(cli.config.as_deref()),
        Commands::CheckTools => check_tools(cli.config.as_deref()),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("scribeflow {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

async fn run(input: Option<&std::path::Path>, config_path: Option<&std::path::Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;

    match app::run(&config, input).await? {
        app::RunSummary::Idle => {
            println!("Nothing to process.");
            Ok(())
        }
        app::RunSummary::Completed {
            entry,
            output_dir,
            written,
        } => {
            println!("Processed {}", entry.name);
            println!("Output: {}", output_dir.display());
            for path in written {
                println!("  {}", path.display());
            }
            Ok(())
        }
        app::RunSummary::Aborted {
            entry,
            stage,
            reason,
        } => {
            anyhow::bail!("Processing {} aborted at {}: {}", entry.name, stage, reason)
        }
    }
}

fn show_keys(config_path: Option<&std::path::Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let registry = CredentialRegistry::from_env(&config.credentials.env_prefix);
    let cursor = RotationCursor::new(&config.credentials.cursor_path);
    let last = cursor.load(registry.len());

    println!(
        "Keys under {}*: {}",
        config.credentials.env_prefix,
        registry.len()
    );
    for (i, credential) in registry.iter().enumerate() {
        println!("  [{}] {}", i, credential.hint());
    }

    println!("Cursor file: {}", cursor.path().display());
    let coordinator = LeaseCoordinator::new(registry, last);
    println!("Last used: {}", coordinator.last_used());
    if coordinator.pool_size() > 0 {
        let next = last.map_or(0, |i| (i + 1) % coordinator.pool_size());
        println!("Next key: index {}", next);
    } else {
        println!("Next key: none (set {})", config.credentials.env_prefix);
    }

    Ok(())
}

fn check_tools(config_path: Option<&std::path::Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    println!("Checking external tools...\n");

    let tools = transcode::check_tools(&config.transcode);
    let mut all_ok = true;

    for tool in &tools {
        let status = if tool.available {
            "✓"
        } else {
            all_ok = false;
            "✗"
        };

        print!("{} {}", status, tool.name);
        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }
        println!();
    }

    println!();
    if all_ok {
        println!("All required tools are available!");
    } else {
        println!("Some tools are missing. Install them to enable all features.");
    }

    Ok(())
}

fn validate_config(path: Option<&std::path::Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            config
        }
        None => {
            println!("No config file specified, using defaults");
            config::Config::default()
        }
    };

    println!("  Key prefix: {}", config.credentials.env_prefix);
    println!("  Cursor file: {}", config.credentials.cursor_path.display());
    println!("  Model: {}", config.inference.model);
    println!("  Concurrency: {}", config.pipeline.concurrency);
    println!(
        "  Retries: {} attempts, {}s apart",
        config.pipeline.max_attempts, config.pipeline.retry_delay_secs
    );
    println!("  Segment length: {}s", config.transcode.segment_secs);
    println!("  Inbox: {}", config.workspace.inbox.display());
    println!("  Stages: {}", config.stages.len());
    for (i, stage) in config.stages.iter().enumerate() {
        println!("    {}. {} -> {}", i + 1, stage.name, stage.output_file);
    }

    Ok(())
}
