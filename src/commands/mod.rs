// Command registry and dispatcher.
//
// Each command is a name, a one-line usage string, an optional `clap`
// flag set and a plain `fn` that runs it against the `Context`. The
// dispatcher resolves the first argument against the registry, parses
// the command's flags from the rest and runs it through the auth-retry
// wrapper in `reauth`.

pub mod keys;
pub mod login;
pub mod projects;
pub mod reauth;

use crate::context::Context;
use crate::error::{Error, Result};
use clap::ArgMatches;

/// Runs a command. Called a second time after a forced re-login.
pub type RunFn = fn(&mut Context, &ArgMatches) -> Result<()>;

pub struct Command {
    pub name: &'static str,
    pub usage: &'static str,
    /// Builds the command's flag set; `None` when it takes no flags.
    pub flags: Option<fn() -> clap::Command>,
    pub run: RunFn,
}

impl Command {
    /// Parse `args` (everything after the command name) against the flag
    /// set. Commands without flags ignore their arguments.
    pub fn parse_flags(&self, args: &[String]) -> std::result::Result<ArgMatches, clap::Error> {
        match self.flags {
            Some(build) => build().no_binary_name(true).try_get_matches_from(args),
            None => Ok(ArgMatches::default()),
        }
    }

    /// Flag-level help, if the command declares flags.
    pub fn flag_usage(&self) -> Option<String> {
        self.flags
            .map(|build| build().no_binary_name(true).render_help().to_string())
    }
}

/// Registered commands in display order. Lookups return the first match.
pub struct Registry {
    commands: Vec<Command>,
}

impl Registry {
    pub fn new(commands: Vec<Command>) -> Self {
        Registry { commands }
    }

    /// Every command `pk` ships with.
    pub fn standard() -> Self {
        Registry::new(vec![
            login::command(),
            keys::add_key(),
            keys::remove_key(),
            keys::list_keys(),
            projects::create_project(),
            projects::list_projects(),
            projects::delete_project(),
        ])
    }

    pub fn find(&self, name: &str) -> Option<&Command> {
        self.commands.iter().find(|c| c.name == name)
    }

    /// Space separated command names, for shell completion.
    pub fn names(&self) -> String {
        self.commands
            .iter()
            .map(|c| c.name)
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn usage(&self) -> String {
        let mut out = String::from("Usage: pk <command> [options]\n\nCommands:\n\n");
        for c in &self.commands {
            out.push_str(&format!("  {:>16}  {}\n", c.name, c.usage));
        }
        out.push_str("\nRun 'pk help [command]' for more information.\n");
        out
    }
}

/// What the dispatcher did with the argument vector.
#[derive(Debug)]
pub enum Outcome {
    /// Help text to show; nothing ran.
    Usage(String),
    Done,
    Failed { command: String, error: Error },
}

/// Resolve and run the command named by `args[0]`.
///
/// A non-forced authorization happens first, whatever the arguments.
/// An error is returned only when that bootstrap fails; command failures
/// come back as `Outcome::Failed`.
pub fn dispatch(ctx: &mut Context, registry: &Registry, args: &[String]) -> Result<Outcome> {
    ctx.authorize(false)?;

    let Some(name) = args.first() else {
        return Ok(Outcome::Usage(registry.usage()));
    };

    if name == "help" {
        let text = match args.get(1).and_then(|target| registry.find(target)) {
            Some(command) => command
                .flag_usage()
                .unwrap_or_else(|| format!("No usage for {}\n", command.name)),
            None => registry.usage(),
        };
        return Ok(Outcome::Usage(text));
    }

    let Some(command) = registry.find(name) else {
        return Ok(Outcome::Usage(registry.usage()));
    };

    let flags = match command.parse_flags(&args[1..]) {
        Ok(flags) => flags,
        Err(e) => {
            use clap::error::ErrorKind;
            if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) {
                return Ok(Outcome::Usage(e.to_string()));
            }
            return Ok(Outcome::Failed {
                command: command.name.to_string(),
                error: Error::Flags(flag_error_message(&e)),
            });
        }
    };

    tracing::debug!(command = command.name, "dispatching");
    Ok(match reauth::invoke(ctx, |ctx| (command.run)(ctx, &flags)) {
        Ok(()) => Outcome::Done,
        Err(error) => Outcome::Failed {
            command: command.name.to_string(),
            error,
        },
    })
}

/// First line of a clap error without its `error: ` prefix.
fn flag_error_message(e: &clap::Error) -> String {
    let rendered = e.to_string();
    let first = rendered.lines().next().unwrap_or_default();
    first.trim_start_matches("error: ").trim().to_string()
}
