use anyhow::Context;
use clap::Parser;
use enrollment_address::domain::ports::Store;
use enrollment_address::utils::{logger, validation::Validate};
use enrollment_address::{
    CliArgs, Command, EnrollmentError, EnrollmentService, EnrollmentWithAddressPayload,
    LocalStore, OwnerId, PostalCodeResolver,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    let config = match args.load_config() {
        Ok(config) => config,
        Err(e) => exit_with(&e),
    };

    // 初始化日誌
    if config.json_logs() {
        logger::init_json_logger(config.log_level());
    } else {
        logger::init_cli_logger(args.verbose);
    }

    tracing::info!("Starting enrollment-address CLI");
    if args.verbose {
        tracing::debug!("CLI args: {:?}", args);
    }

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        exit_with(&e);
    }

    let resolver = PostalCodeResolver::new(config.resolver_config())
        .context("failed to build postal directory client")?;
    tracing::debug!("Postal directory: {}", resolver.config().base_url);

    let store = match config.data_path() {
        Some(path) => LocalStore::open(path)
            .await
            .with_context(|| format!("failed to open data file '{}'", path))?,
        None => {
            tracing::warn!("No storage.data_path configured, changes will not be persisted");
            LocalStore::in_memory()
        }
    };

    if let Some(path) = store.snapshot_path() {
        tracing::info!("📁 Using data file {}", path.display());
    }

    let service = EnrollmentService::new(store, resolver);

    match run(&service, &args.command).await {
        Ok(output) => {
            println!("{}", output);
            Ok(())
        }
        Err(e) => {
            tracing::error!("❌ Command failed: {}", e);
            exit_with(&e)
        }
    }
}

async fn run<S: Store>(
    service: &EnrollmentService<S, PostalCodeResolver>,
    command: &Command,
) -> enrollment_address::Result<String> {
    match command {
        Command::Lookup { code } => {
            let fragment = service.resolve_postal_code(code).await?;
            Ok(serde_json::to_string_pretty(&fragment)?)
        }
        Command::Show { owner_id } => {
            let view = service
                .get_one_with_address_by_owner(OwnerId::new(*owner_id)?)
                .await?;
            Ok(serde_json::to_string_pretty(&view)?)
        }
        Command::Upsert { owner_id, payload } => {
            let owner_id = OwnerId::new(*owner_id)?;
            let content = tokio::fs::read_to_string(payload).await?;

            // 檔案內容不含 ownerId，由命令列參數提供
            let mut value: serde_json::Value = serde_json::from_str(&content)?;
            if let Some(object) = value.as_object_mut() {
                object.insert("ownerId".to_string(), serde_json::json!(owner_id.get()));
            }
            let payload: EnrollmentWithAddressPayload = serde_json::from_value(value)?;

            service
                .create_or_update_enrollment_with_address(payload)
                .await?;
            Ok(format!("✅ Enrollment saved for owner {}", owner_id))
        }
    }
}

fn exit_with(e: &EnrollmentError) -> ! {
    eprintln!("❌ {}", e.user_friendly_message());
    if let Some(reason) = e.not_found_reason() {
        eprintln!("   {}", reason);
    }
    eprintln!("💡 Suggestion: {}", e.recovery_suggestion());
    std::process::exit(e.exit_code());
}
