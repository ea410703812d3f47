use clap::{Parser, Subcommand};
use perch_app::logging::{self, LogConfig};
use perch_cli::CliContext;
use perch_cli::commands;
use perch_cli::readline;
use perch_types::{Dimension, InstanceId, ToolKind};
use std::io::Write;

#[tokio::main]
async fn main() -> Result<(), String> {
    let _log_guard = logging::init(&LogConfig::from_env("cli"));
    let ctx = CliContext::new()?;

    loop {
        let Some(line) = readline()? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match respond(line, &ctx).await {
            Ok(quit) => {
                if quit {
                    break;
                }
            }
            Err(err) => {
                writeln!(std::io::stdout(), "{err}").map_err(|e| e.to_string())?;
                std::io::stdout().flush().map_err(|e| e.to_string())?;
            }
        }
    }

    ctx.shutdown().await
}

#[derive(Parser)]
#[command(version, about = "perch overlay tools")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Launch a new instance of a tool
    Add { tool: ToolKind },
    Remove { tool: ToolKind, id: InstanceId },
    /// Add another instance copying an existing one
    Clone { tool: ToolKind, id: InstanceId },
    /// Set a config field (true/false, numbers and text are recognized)
    Set {
        tool: ToolKind,
        id: InstanceId,
        field: String,
        value: String,
    },
    Move {
        tool: ToolKind,
        id: InstanceId,
        #[arg(allow_negative_numbers = true)]
        dx: i32,
        #[arg(allow_negative_numbers = true)]
        dy: i32,
    },
    /// Resize to pixels or `natural`
    Resize {
        tool: ToolKind,
        id: InstanceId,
        width: Dimension,
        height: Dimension,
    },
    Lock { tool: ToolKind, id: InstanceId },
    Unlock { tool: ToolKind, id: InstanceId },
    /// Tap a screen position on an instance
    Tap {
        tool: ToolKind,
        id: InstanceId,
        x: f32,
        y: f32,
    },
    /// Drag from a screen position by an offset
    Drag {
        tool: ToolKind,
        id: InstanceId,
        x: f32,
        y: f32,
        #[arg(allow_negative_numbers = true)]
        dx: f32,
        #[arg(allow_negative_numbers = true)]
        dy: f32,
    },
    List,
    /// Bring back instances left active by an abnormal stop
    Restore,
    ResetDefault { tool: ToolKind },
    Config,
    Exit,
}

async fn respond(line: &str, ctx: &CliContext) -> Result<bool, String> {
    let mut args = shlex::split(line).ok_or("error: Invalid quoting")?;
    args.insert(0, "perch".to_string());
    let cli = Cli::try_parse_from(args).map_err(|e| e.to_string())?;

    match cli.command {
        Some(Commands::Add { tool }) => commands::add(ctx, tool).await?,
        Some(Commands::Remove { tool, id }) => commands::remove(ctx, tool, id).await?,
        Some(Commands::Clone { tool, id }) => commands::clone_instance(ctx, tool, id).await?,
        Some(Commands::Set {
            tool,
            id,
            field,
            value,
        }) => commands::set(ctx, tool, id, &field, &value).await?,
        Some(Commands::Move { tool, id, dx, dy }) => {
            commands::move_instance(ctx, tool, id, dx, dy).await?
        }
        Some(Commands::Resize {
            tool,
            id,
            width,
            height,
        }) => commands::resize(ctx, tool, id, width, height).await?,
        Some(Commands::Lock { tool, id }) => commands::lock(ctx, tool, id, true).await?,
        Some(Commands::Unlock { tool, id }) => commands::lock(ctx, tool, id, false).await?,
        Some(Commands::Tap { tool, id, x, y }) => commands::tap(ctx, tool, id, x, y).await?,
        Some(Commands::Drag {
            tool,
            id,
            x,
            y,
            dx,
            dy,
        }) => commands::drag(ctx, tool, id, (x, y), (dx, dy)).await?,
        Some(Commands::List) => commands::list(ctx).await?,
        Some(Commands::Restore) => commands::restore(ctx).await?,
        Some(Commands::ResetDefault { tool }) => commands::reset_default(ctx, tool).await?,
        Some(Commands::Config) => commands::show_settings(ctx),
        Some(Commands::Exit) => {
            commands::exit();
            return Ok(true);
        }
        None => {}
    }
    Ok(false)
}
