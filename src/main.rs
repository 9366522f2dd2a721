// ==========================================
// CityCatalyst eCRF 导入 - 命令行入口
// ==========================================
// 用法:
//   citycatalyst-ecrf [--db <path>] [--locale <en|zh-CN>] [--log-json] <command> [args]
// 命令:
//   init-db
//   validate <file>
//   extract <file>
//   import <file> <inventory_id>
//   create-inventory <inventory_id> <name> <city> [year]
//   values <inventory_id>
// 结果以 JSON 输出到 stdout，日志输出到 stderr
// ==========================================

use anyhow::{anyhow, bail, Context, Result};
use citycatalyst_ecrf::api::ImportApi;
use citycatalyst_ecrf::db::default_db_path;
use citycatalyst_ecrf::domain::UploadedFile;
use citycatalyst_ecrf::{i18n, logging};
use serde::Serialize;
use std::path::Path;

const USAGE: &str = "usage: citycatalyst-ecrf [--db <path>] [--locale <en|zh-CN>] [--log-json] <command> [args]

commands:
  init-db
  validate <file>
  extract <file>
  import <file> <inventory_id>
  create-inventory <inventory_id> <name> <city> [year]
  values <inventory_id>";

struct CliArgs {
    db_path: String,
    locale: Option<String>,
    log_json: bool,
    command: String,
    rest: Vec<String>,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<CliArgs> {
    let mut db_path = None;
    let mut locale = None;
    let mut log_json = false;
    let mut positional = Vec::new();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--db" => db_path = Some(args.next().ok_or_else(|| anyhow!("--db needs a path"))?),
            "--locale" => locale = Some(args.next().ok_or_else(|| anyhow!("--locale needs a value"))?),
            "--log-json" => log_json = true,
            "-h" | "--help" => bail!("{}", USAGE),
            _ => positional.push(arg),
        }
    }

    if positional.is_empty() {
        bail!("{}", USAGE);
    }
    let command = positional.remove(0);
    Ok(CliArgs {
        db_path: db_path.unwrap_or_else(default_db_path),
        locale,
        log_json,
        command,
        rest: positional,
    })
}

fn arg<'a>(rest: &'a [String], index: usize, name: &str) -> Result<&'a str> {
    rest.get(index)
        .map(String::as_str)
        .ok_or_else(|| anyhow!("missing <{}>\n\n{}", name, USAGE))
}

fn read_upload(path: &str) -> Result<UploadedFile> {
    let bytes = std::fs::read(path).with_context(|| format!("failed to read {}", path))?;
    let name = Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string());
    Ok(UploadedFile::new(name, bytes))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = parse_args(std::env::args().skip(1))?;

    if cli.log_json {
        logging::init_json();
    } else {
        logging::init();
    }
    if let Some(locale) = cli.locale.as_deref() {
        i18n::set_locale(locale);
    }

    tracing::info!(
        version = citycatalyst_ecrf::VERSION,
        db = %cli.db_path,
        command = %cli.command,
        "{}",
        citycatalyst_ecrf::APP_NAME
    );

    let api = ImportApi::new(&cli.db_path)?;
    let rest = &cli.rest;

    match cli.command.as_str() {
        "init-db" => {
            api.init_schema()?;
            print_json(&serde_json::json!({ "db": cli.db_path, "initialized": true }))?;
        }
        "validate" => {
            let file = read_upload(arg(rest, 0, "file")?)?;
            let result = api.validate_file(&file).await?;
            print_json(&result)?;
        }
        "extract" => {
            let file = read_upload(arg(rest, 0, "file")?)?;
            let response = api.extract_file(&file).await?;
            print_json(&response)?;
        }
        "import" => {
            let file = read_upload(arg(rest, 0, "file")?)?;
            let inventory_id = arg(rest, 1, "inventory_id")?;
            let response = api.import_file(&file, inventory_id).await?;
            print_json(&response)?;
        }
        "create-inventory" => {
            let year = match rest.get(3) {
                Some(raw) => Some(
                    raw.trim()
                        .parse::<i32>()
                        .with_context(|| format!("invalid year: {}", raw))?,
                ),
                None => None,
            };
            let inventory = api
                .create_inventory(
                    arg(rest, 0, "inventory_id")?,
                    arg(rest, 1, "name")?,
                    arg(rest, 2, "city")?,
                    year,
                )
                .await?;
            print_json(&inventory)?;
        }
        "values" => {
            let values = api.list_inventory_values(arg(rest, 0, "inventory_id")?).await?;
            print_json(&values)?;
        }
        other => bail!("unknown command: {}\n\n{}", other, USAGE),
    }

    Ok(())
}
