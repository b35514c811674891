use clap::Parser;
use miette::Result;
use qms::cli::{Cli, Commands};

fn main() -> Result<()> {
    // Reset SIGPIPE to default behavior (terminate silently) for proper Unix piping.
    // Without this, piping to `head`, `grep -q`, etc. causes a panic on broken pipe.
    #[cfg(unix)]
    {
        unsafe {
            libc::signal(libc::SIGPIPE, libc::SIG_DFL);
        }
    }
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .tab_width(4)
                .build(),
        )
    }))?;

    let cli = Cli::parse();
    let global = cli.global;
    qms::core::logging::init(global.verbose, global.quiet);

    match cli.command {
        Commands::Report(cmd) => qms::cli::commands::report::run(cmd, &global),
        Commands::Product(cmd) => qms::cli::commands::product::run(cmd, &global),
        Commands::Customer(cmd) => qms::cli::commands::customer::run(cmd, &global),
        Commands::Status(args) => qms::cli::commands::status::run(args, &global),
        Commands::Completions(args) => qms::cli::commands::completions::run(args),
    }
}
