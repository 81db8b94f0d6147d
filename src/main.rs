use anyhow::Context;
use campaign_dash::core::ConfigProvider;
use campaign_dash::utils::error::ErrorSeverity;
use campaign_dash::utils::logger::LogFormat;
use campaign_dash::utils::validation::Validate;
use campaign_dash::{CliConfig, Dashboard, DashboardError, Logger, OutputFormat, TomlConfig};
use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    let exit_code = match &cli.config {
        Some(path) => {
            let mut config = TomlConfig::from_file(path)
                .with_context(|| format!("Failed to load config file '{}'", path))?;
            // 命令列參數覆蓋設定檔
            cli.apply_to(&mut config);
            let logger = Logger::new(config.logging.format(), config.logging.verbose);
            let format = config.output.format;
            run(config, &cli, format, logger).await?
        }
        None => {
            let logger = if cli.json_logs {
                Logger::new(LogFormat::Json, cli.verbose)
            } else {
                Logger::cli(cli.verbose)
            };
            run(cli.clone(), &cli, cli.output_format(), logger).await?
        }
    };

    if exit_code > 0 {
        std::process::exit(exit_code);
    }
    Ok(())
}

async fn run<C: ConfigProvider + Validate>(
    config: C,
    cli: &CliConfig,
    format: OutputFormat,
    logger: Logger,
) -> anyhow::Result<i32> {
    logger.in_scope(|| tracing::info!("🚀 Starting campaign-dash"));

    if let Err(e) = config.validate().and_then(|_| cli.validate()) {
        report(&logger, "Configuration validation failed", &e);
        return Ok(1);
    }

    let dashboard = match Dashboard::new(config, logger.clone()) {
        Ok(dashboard) => dashboard,
        Err(e) => {
            report(&logger, "Failed to set up the dashboard", &e);
            return Ok(1);
        }
    };

    let has_api = dashboard.config().api_endpoint().is_some();
    if !has_api && cli.csv.is_none() {
        eprintln!("Nothing to do: pass --api-endpoint and/or --csv");
        return Ok(1);
    }

    let mut worst: Option<ErrorSeverity> = None;

    // API 與 CSV 兩條路徑互不影響
    if has_api {
        match dashboard.load_api_data().await {
            Ok(data) => println!("{}", serde_json::to_string_pretty(&data)?),
            Err(e) => {
                report(&logger, "API request failed", &e);
                worst = worst.max(Some(e.severity()));
            }
        }
    }

    if let Some(path) = &cli.csv {
        let result = std::fs::read(path)
            .map_err(DashboardError::from)
            .and_then(|bytes| dashboard.process_upload(&bytes, cli.start, cli.end));

        match result {
            Ok(view) => match format {
                OutputFormat::Csv => print!("{}", view.table.to_csv()?),
                OutputFormat::Json => {
                    let output = serde_json::json!({
                        "range": view.range,
                        "rows_read": view.rows_read,
                        "table": view.table.table().to_records(),
                        "chart": view.table.chart_series(),
                    });
                    println!("{}", serde_json::to_string_pretty(&output)?);
                }
            },
            Err(e) => {
                report(&logger, "CSV processing failed", &e);
                worst = worst.max(Some(e.severity()));
            }
        }
    }

    // 根據錯誤嚴重程度決定退出碼
    Ok(match worst {
        None | Some(ErrorSeverity::Low) => 0,
        Some(ErrorSeverity::Medium) => 2,
        Some(ErrorSeverity::High) => 1,
        Some(ErrorSeverity::Critical) => 3,
    })
}

fn report(logger: &Logger, context: &str, e: &DashboardError) {
    logger.in_scope(|| {
        tracing::error!(
            "❌ {}: {} (Category: {:?}, Severity: {:?})",
            context,
            e,
            e.category(),
            e.severity()
        );
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
    });
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 Suggestion: {}", e.recovery_suggestion());
}
