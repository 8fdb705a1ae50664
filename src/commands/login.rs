// login: force a fresh interactive login, replacing any stored token.

use super::Command;
use crate::context::Context;
use crate::error::Result;
use clap::ArgMatches;

pub fn command() -> Command {
    Command {
        name: "login",
        usage: "log in and store a fresh access token",
        flags: None,
        run: run_login,
    }
}

fn run_login(ctx: &mut Context, _: &ArgMatches) -> Result<()> {
    ctx.authorize(true)
}
