// Project commands: one request each, result printed as is.

use super::Command;
use crate::context::Context;
use crate::error::{Error, Result};
use clap::{Arg, ArgMatches};

pub fn create_project() -> Command {
    Command {
        name: "create-project",
        usage: "create a new project",
        flags: Some(create_project_flags),
        run: run_create_project,
    }
}

pub fn list_projects() -> Command {
    Command {
        name: "list-projects",
        usage: "list your projects",
        flags: None,
        run: run_list_projects,
    }
}

pub fn delete_project() -> Command {
    Command {
        name: "delete-project",
        usage: "delete a project",
        flags: Some(delete_project_flags),
        run: run_delete_project,
    }
}

fn create_project_flags() -> clap::Command {
    name_flag("create-project", "name of the project to create")
}

fn delete_project_flags() -> clap::Command {
    name_flag("delete-project", "name of the project to delete")
}

fn name_flag(command: &'static str, help: &'static str) -> clap::Command {
    clap::Command::new(command).arg(
        Arg::new("name")
            .long("name")
            .value_name("NAME")
            .required(true)
            .help(help),
    )
}

fn project_name(flags: &ArgMatches) -> Result<&str> {
    flags
        .get_one::<String>("name")
        .map(String::as_str)
        .ok_or_else(|| Error::Flags("--name is required".into()))
}

fn run_create_project(ctx: &mut Context, flags: &ArgMatches) -> Result<()> {
    let project = ctx.api.create_project(project_name(flags)?)?;
    match project.url {
        Some(url) => println!("Created project '{}' at {}.", project.name, url),
        None => println!("Created project '{}'.", project.name),
    }
    Ok(())
}

fn run_list_projects(ctx: &mut Context, _: &ArgMatches) -> Result<()> {
    for project in ctx.api.list_projects()? {
        println!("{:<20}  {}", project.name, project.url.unwrap_or_default());
    }
    Ok(())
}

fn run_delete_project(ctx: &mut Context, flags: &ArgMatches) -> Result<()> {
    let name = project_name(flags)?;
    ctx.api.delete_project(name)?;
    println!("Deleted project '{}'.", name);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::FakeApi;
    use crate::context::testing::{context, RecordingAuthorizer};
    use crate::keys::inventory::testing::MemoryInventory;
    use crate::ui::testing::ScriptedPrompter;

    fn flags(command: &Command, args: &[&str]) -> ArgMatches {
        let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        command.parse_flags(&args).unwrap()
    }

    #[test]
    fn create_and_delete_use_name_flag() {
        let api = FakeApi::default();
        let calls = api.calls.clone();
        let mut ctx = context(
            api,
            RecordingAuthorizer::default(),
            ScriptedPrompter::default(),
            MemoryInventory::default(),
        );

        let create = create_project();
        run_create_project(&mut ctx, &flags(&create, &["--name", "blog"])).unwrap();
        let delete = delete_project();
        run_delete_project(&mut ctx, &flags(&delete, &["--name", "blog"])).unwrap();

        assert_eq!(calls.borrow().projects_created, vec!["blog"]);
        assert_eq!(calls.borrow().projects_deleted, vec!["blog"]);
    }

    #[test]
    fn name_is_required() {
        let err = create_project().parse_flags(&[]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }
}
