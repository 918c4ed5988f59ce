use std::path::PathBuf;

#[derive(Debug, Default)]
struct CliArgs {
    null_audio: bool,
    config_dir: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let args = parse_args(std::env::args().skip(1).collect())?;

    let root = match args.config_dir {
        Some(dir) => musikipri::config::normalize_path(&dir),
        None => musikipri::config::config_root()?,
    };
    let _log_guard = musikipri::logging::init(&musikipri::config::log_dir(&root))?;
    tracing::info!(root = %root.display(), null_audio = args.null_audio, "starting");

    let settings = musikipri::config::load_settings(&root)?;
    musikipri::app::run(musikipri::app::RunOptions {
        settings,
        null_audio: args.null_audio,
    })
}

fn parse_args(args: Vec<String>) -> anyhow::Result<CliArgs> {
    let mut out = CliArgs::default();
    let mut index = 0;
    while index < args.len() {
        match args[index].as_str() {
            "--null-audio" => out.null_audio = true,
            "--config-dir" => {
                index += 1;
                let Some(value) = args.get(index) else {
                    anyhow::bail!("--config-dir requires a directory");
                };
                if value.trim().is_empty() {
                    anyhow::bail!("--config-dir cannot be empty");
                }
                out.config_dir = Some(PathBuf::from(value.trim()));
            }
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            other => anyhow::bail!("unknown argument {other}"),
        }
        index += 1;
    }
    Ok(out)
}

fn print_help() {
    println!("Musikipri");
    println!("  --null-audio        Play silently with a simulated clock");
    println!("  --config-dir <dir>  Settings and logs directory");
    println!("                      (default: $MUSIKIPRI_CONFIG_DIR or ~/.config/musikipri)");
}
